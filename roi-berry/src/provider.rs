//! 切片提供者接口, 以及一个只追加的内存序列登记表.
//!
//! 图像文件的读取不属于本 crate. 外部读取器把每个序列整理成 [`Series`]
//! 登记到 [`SeriesRegistry`] 中, 或者自行实现 [`SliceProvider`].

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView2};

use crate::geometry::{classify, Orientation, OrientationResult, SliceGeometry};
use crate::roi::Provenance;
use crate::Vec3;

/// 单张切片的元数据. 只读.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SliceMeta {
    /// 切片在序列中的 0-based 索引.
    pub index: usize,
    /// `ImagePositionPatient`, mm.
    pub position: Option<Vec3>,
    /// `ImageOrientationPatient`: 行方向余弦 ⊕ 列方向余弦.
    pub orientation: Option<[f64; 6]>,
    /// `PixelSpacing`: `[行间距, 列间距]`, mm/px.
    pub pixel_spacing: Option<[f64; 2]>,
    /// 行数.
    pub rows: usize,
    /// 列数.
    pub cols: usize,
}

impl SliceMeta {
    /// 切片几何信息. 缺失的位置与间距以默认值替代.
    #[inline]
    pub fn geometry(&self) -> SliceGeometry {
        SliceGeometry::new(self.position, self.pixel_spacing, self.rows, self.cols)
    }

    /// 切片所在平面.
    #[inline]
    pub fn orientation(&self) -> OrientationResult<Orientation> {
        classify(self.orientation.as_ref())
    }
}

/// 一张切片: 元数据与原始像素值.
#[derive(Clone, Debug)]
pub struct Slice {
    /// 元数据.
    pub meta: SliceMeta,
    /// 原始像素值 `(行, 列)`, 未经过任何窗口变换.
    pub pixels: Array2<f32>,
}

impl Slice {
    /// 由像素与可能缺失的元数据构建. 行列数取自像素数组的形状.
    pub fn new(
        pixels: Array2<f32>,
        position: Option<Vec3>,
        orientation: Option<[f64; 6]>,
        pixel_spacing: Option<[f64; 2]>,
    ) -> Self {
        let (rows, cols) = pixels.dim();
        Self {
            meta: SliceMeta {
                index: 0,
                position,
                orientation,
                pixel_spacing,
                rows,
                cols,
            },
            pixels,
        }
    }

    /// 像素视图.
    #[inline]
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.pixels.view()
    }
}

/// 一个序列: 有序切片及其来源信息.
#[derive(Clone, Debug)]
pub struct Series {
    /// 序列键, 通常为序列目录路径.
    pub key: String,
    /// 来源信息.
    pub provenance: Provenance,
    /// 有序切片. `slices[i].meta.index == i`.
    pub slices: Vec<Slice>,
}

impl Series {
    /// 构建序列, 并按顺序重写每张切片的 `meta.index`.
    pub fn new(key: impl Into<String>, provenance: Provenance, mut slices: Vec<Slice>) -> Self {
        for (i, s) in slices.iter_mut().enumerate() {
            s.meta.index = i;
        }
        Self {
            key: key.into(),
            provenance,
            slices,
        }
    }

    /// 切片数.
    #[inline]
    pub fn len(&self) -> usize {
        self.slices.len()
    }

    /// 是否没有切片.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }
}

/// 解剖学位置表: 切片索引 → 物理位置.
pub type PositionTable = BTreeMap<usize, Vec3>;

/// 平面表: 切片索引 → 平面. 只包含能成功分类的切片.
pub type OrientationTable = BTreeMap<usize, Orientation>;

fn position_table<'a>(slices: impl Iterator<Item = &'a Slice>) -> PositionTable {
    slices
        .map(|s| {
            let i = s.meta.index;
            (i, s.meta.position.unwrap_or([0.0, 0.0, i as f64]))
        })
        .collect()
}

fn orientation_table<'a>(series_key: &str, slices: impl Iterator<Item = &'a Slice>) -> OrientationTable {
    slices
        .filter_map(|s| match s.meta.orientation() {
            Ok(o) => Some((s.meta.index, o)),
            Err(e) => {
                log::warn!("序列 {series_key} 切片 {}: {e}", s.meta.index);
                None
            }
        })
        .collect()
}

/// 切片提供者. 以序列键访问切片与其预计算的解剖学信息.
pub trait SliceProvider {
    /// 给定序列的第 `index` 张切片. 序列不存在或越界时返回 `None`.
    fn slice(&self, series_key: &str, index: usize) -> Option<&Slice>;

    /// 给定序列的切片数. 序列不存在时返回 `None`.
    fn slice_count(&self, series_key: &str) -> Option<usize>;

    /// 给定序列的来源信息.
    fn provenance(&self, series_key: &str) -> Option<&Provenance>;

    /// 解剖学位置表. 缺失位置的切片以 `(0, 0, index)` 代替, 以保证其仍可排序.
    fn anatomical_positions(&self, series_key: &str) -> PositionTable {
        let n = self.slice_count(series_key).unwrap_or(0);
        position_table((0..n).filter_map(|i| self.slice(series_key, i)))
    }

    /// 平面表. 无法分类的切片被记录到日志并略去.
    fn slice_orientations(&self, series_key: &str) -> OrientationTable {
        let n = self.slice_count(series_key).unwrap_or(0);
        orientation_table(series_key, (0..n).filter_map(|i| self.slice(series_key, i)))
    }

    /// 序列是否存在.
    fn contains(&self, series_key: &str) -> bool {
        self.slice_count(series_key).is_some()
    }
}

#[derive(Debug)]
struct Entry {
    series: Series,
    positions: PositionTable,
    orientations: OrientationTable,
}

/// 只追加的内存序列登记表. 登记时预计算位置表与平面表.
#[derive(Debug, Default)]
pub struct SeriesRegistry {
    entries: BTreeMap<String, Entry>,
}

impl SeriesRegistry {
    /// 创建空登记表.
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记序列. 同键序列已存在时不覆盖, 返回 `false`.
    pub fn insert(&mut self, series: Series) -> bool {
        if self.entries.contains_key(&series.key) {
            log::warn!("序列 {} 已登记, 忽略", series.key);
            return false;
        }
        let positions = position_table(series.slices.iter());
        let orientations = orientation_table(&series.key, series.slices.iter());
        log::debug!(
            "登记序列 {}: {} 张切片, {} 张可分类",
            series.key,
            series.len(),
            orientations.len()
        );
        self.entries.insert(
            series.key.clone(),
            Entry {
                series,
                positions,
                orientations,
            },
        );
        true
    }

    /// 按键获取序列.
    #[inline]
    pub fn get(&self, series_key: &str) -> Option<&Series> {
        self.entries.get(series_key).map(|e| &e.series)
    }

    /// 已登记的序列数.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SliceProvider for SeriesRegistry {
    fn slice(&self, series_key: &str, index: usize) -> Option<&Slice> {
        self.get(series_key)?.slices.get(index)
    }

    fn slice_count(&self, series_key: &str) -> Option<usize> {
        self.get(series_key).map(Series::len)
    }

    fn provenance(&self, series_key: &str) -> Option<&Provenance> {
        self.get(series_key).map(|s| &s.provenance)
    }

    fn anatomical_positions(&self, series_key: &str) -> PositionTable {
        self.entries
            .get(series_key)
            .map(|e| e.positions.clone())
            .unwrap_or_default()
    }

    fn slice_orientations(&self, series_key: &str) -> OrientationTable {
        self.entries
            .get(series_key)
            .map(|e| e.orientations.clone())
            .unwrap_or_default()
    }
}
