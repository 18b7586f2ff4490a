//! ROI 记录及其存储.

mod store;

use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::{AnatomicalPoint, Orientation};
use crate::provider::Slice;
use crate::stats::{roi_statistics, RoiStatistics};

pub use store::{RoiObserver, RoiStore};

/// ROI 所属序列的来源信息.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Provenance {
    /// 检查 ID (`StudyID`).
    pub study_id: String,
    /// 检查号 (`AccessionNumber` 或设备检查号).
    pub exam_number: String,
    /// 序列号 (`SeriesNumber`).
    pub series_id: String,
    /// 序列唯一标识 (`SeriesInstanceUID`).
    pub series_uid: String,
    /// 序列在磁盘上的目录.
    pub series_path: String,
}

/// 标注在某序列某切片上的一个圆形 ROI.
///
/// 该结构是不可变的值类型: 存储层只会整体替换 ROI, 不会修改其中的字段.
/// 相等性与哈希基于全部字段 (浮点数按位比较, `-0.0` 与 `0.0` 视为相同),
/// 因此可直接用于去重.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Roi {
    /// 肝段标签, 例如 `"4a"` 或 `"Left Lateral"`.
    pub segment_label: String,
    /// 1-based 段索引. 与 `series_key` 共同构成主键.
    pub segment_index: u32,
    /// 所属序列的键.
    pub series_key: String,
    /// 0-based 切片索引.
    pub slice_index: usize,
    /// 归一化中心 x, `[0, 1]`, 向右增长.
    pub center_x: f64,
    /// 归一化中心 y, `[0, 1]`, 向下增长.
    pub center_y: f64,
    /// 归一化半径, 以 `min(rows, cols)` 为单位.
    pub radius: f64,
    /// 中心的物理位置. 切片方向不可用时为 `None`.
    pub position_mm: Option<AnatomicalPoint>,
    /// 标注时切片所在的平面. 不可用时为 `None`.
    pub orientation: Option<Orientation>,
    /// 物理面积 `π·r_mm²`.
    pub area_mm2: f64,
    /// 创建 (或配准, 或导入) 时的像素统计量. 没有选中任何像素时为 `None`.
    pub stats: Option<RoiStatistics>,
    /// 来源信息.
    pub provenance: Provenance,
}

/// 将浮点数转换为可比较, 可哈希的位模式. `-0.0` 归一化为 `0.0`.
#[inline]
fn float_bits(v: f64) -> u64 {
    if v == 0.0 {
        0
    } else {
        v.to_bits()
    }
}

/// 浮点字段个数: 中心与半径 3 个, 位置 1 + 3 个, 面积 1 个, 统计量 1 + 5 个.
const FLOAT_KEY_LEN: usize = 14;

impl Roi {
    /// 由一次显示交互 (在 `slice` 上点选的归一化圆) 构建 ROI.
    ///
    /// 平面, 物理中心, 面积和统计量都在这里计算. 切片平面无法分类时,
    /// `orientation` 与 `position_mm` 为 `None`, 面积仍按像素间距计算.
    /// 本函数不检查坐标范围, 参见 [`Roi::is_acceptable`].
    #[allow(clippy::too_many_arguments)]
    pub fn from_display(
        segment_label: &str,
        segment_index: u32,
        series_key: &str,
        slice: &Slice,
        provenance: Provenance,
        center_x: f64,
        center_y: f64,
        radius: f64,
    ) -> Self {
        let geometry = slice.meta.geometry();
        let orientation = match slice.meta.orientation() {
            Ok(o) => Some(o),
            Err(e) => {
                log::warn!("序列 {series_key} 切片 {}: {e}", slice.meta.index);
                None
            }
        };
        Self {
            segment_label: segment_label.to_string(),
            segment_index,
            series_key: series_key.to_string(),
            slice_index: slice.meta.index,
            center_x,
            center_y,
            radius,
            position_mm: orientation.map(|o| geometry.display_to_physical(o, center_x, center_y)),
            orientation,
            area_mm2: geometry.radius_to_area_mm2(radius),
            stats: roi_statistics(slice.view(), center_x, center_y, radius),
            provenance,
        }
    }

    /// 主键 `(segment_index, series_key)`.
    #[inline]
    pub fn key(&self) -> (u32, &str) {
        (self.segment_index, self.series_key.as_str())
    }

    /// 是否与 `other` 具有相同主键.
    #[inline]
    pub fn same_key(&self, other: &Roi) -> bool {
        self.key() == other.key()
    }

    /// 是否位于给定序列的给定切片上.
    #[inline]
    pub fn is_on(&self, series_key: &str, slice_index: usize) -> bool {
        self.series_key == series_key && self.slice_index == slice_index
    }

    /// 检查来自显示交互的 ROI 是否合法: 中心在 `[0, 1]` 内,
    /// 半径为正且不小于 `min_radius`.
    pub fn is_acceptable(&self, min_radius: f64) -> bool {
        let unit = 0.0..=1.0;
        unit.contains(&self.center_x)
            && unit.contains(&self.center_y)
            && self.radius > 0.0
            && self.radius >= min_radius
    }

    /// 全部浮点字段的位模式. `Option` 以一个标志位加上 (缺失时为 0 的) 分量表示.
    fn float_key(&self) -> [u64; FLOAT_KEY_LEN] {
        let mut key = [0u64; FLOAT_KEY_LEN];
        key[0] = float_bits(self.center_x);
        key[1] = float_bits(self.center_y);
        key[2] = float_bits(self.radius);
        if let Some(p) = self.position_mm {
            key[3] = 1;
            key[4] = float_bits(p.lr);
            key[5] = float_bits(p.ap);
            key[6] = float_bits(p.si);
        }
        key[7] = float_bits(self.area_mm2);
        if let Some(s) = self.stats {
            key[8] = 1;
            key[9] = float_bits(s.mean);
            key[10] = float_bits(s.median);
            key[11] = float_bits(s.min);
            key[12] = float_bits(s.max);
            key[13] = s.size as u64;
        }
        key
    }
}

impl PartialEq for Roi {
    fn eq(&self, other: &Self) -> bool {
        self.segment_label == other.segment_label
            && self.segment_index == other.segment_index
            && self.series_key == other.series_key
            && self.slice_index == other.slice_index
            && self.orientation == other.orientation
            && self.provenance == other.provenance
            && self.float_key() == other.float_key()
    }
}

impl Eq for Roi {}

impl Hash for Roi {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.segment_label.hash(state);
        self.segment_index.hash(state);
        self.series_key.hash(state);
        self.slice_index.hash(state);
        self.orientation.hash(state);
        self.provenance.hash(state);
        self.float_key().hash(state);
    }
}
