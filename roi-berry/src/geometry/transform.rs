//! 归一化显示坐标, 像素坐标与物理坐标 (mm) 之间的换算.
//!
//! 归一化坐标以图像左上角为原点, x 向右, y 向下, 取值范围 `[0, 1]`.
//! 物理坐标为病人坐标系 `(LR, AP, SI)`, 以毫米为单位.
//!
//! 所有换算都是全函数: 非法间距替换为默认值, 尺寸为 0 的切片按 1 处理,
//! 越界结果原样返回, 由调用方负责检查.

use std::f64::consts::PI;

use ndarray::ArrayView2;
use num::ToPrimitive;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Orientation;
use crate::consts::DEFAULT_PIXEL_SPACING_MM;
use crate::{Idx2d, Vec3};

/// 像素间距 (mm/px).
///
/// 按 DICOM `PixelSpacing` 的约定, 第一个分量为相邻行的间距 (竖直方向),
/// 第二个分量为相邻列的间距 (水平方向).
///
/// 该结构只能持有正的有限值; 其它输入在构建时被替换为 1.0 mm/px.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelSpacing {
    row: f64,
    col: f64,
}

#[inline]
fn sanitize_spacing(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        DEFAULT_PIXEL_SPACING_MM
    }
}

impl PixelSpacing {
    /// 构建像素间距. 非正数或非有限值被替换为默认值.
    #[inline]
    pub fn new(row: f64, col: f64) -> Self {
        Self {
            row: sanitize_spacing(row),
            col: sanitize_spacing(col),
        }
    }

    /// 从可能缺失的 `[行间距, 列间距]` 构建.
    #[inline]
    pub fn from_optional(spacing: Option<[f64; 2]>) -> Self {
        match spacing {
            Some([row, col]) => Self::new(row, col),
            None => Self::default(),
        }
    }

    /// 水平方向 (沿 x, 即相邻列之间) 的间距.
    #[inline]
    pub fn sx(&self) -> f64 {
        self.col
    }

    /// 竖直方向 (沿 y, 即相邻行之间) 的间距.
    #[inline]
    pub fn sy(&self) -> f64 {
        self.row
    }
}

impl Default for PixelSpacing {
    fn default() -> Self {
        Self {
            row: DEFAULT_PIXEL_SPACING_MM,
            col: DEFAULT_PIXEL_SPACING_MM,
        }
    }
}

/// 病人坐标系下的物理位置, 以毫米为单位.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnatomicalPoint {
    /// 左右 (left-right).
    pub lr: f64,
    /// 前后 (anterior-posterior).
    pub ap: f64,
    /// 上下 (superior-inferior).
    pub si: f64,
}

impl AnatomicalPoint {
    /// 直接初始化.
    #[inline]
    pub const fn new(lr: f64, ap: f64, si: f64) -> Self {
        Self { lr, ap, si }
    }
}

impl From<Vec3> for AnatomicalPoint {
    #[inline]
    fn from([lr, ap, si]: Vec3) -> Self {
        Self { lr, ap, si }
    }
}

/// 单张切片在病人坐标系中的几何信息.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliceGeometry {
    /// 切片左上角像素的物理位置 (`ImagePositionPatient`).
    pub position: AnatomicalPoint,
    /// 像素间距.
    pub spacing: PixelSpacing,
    /// 行数 (图像高).
    pub rows: usize,
    /// 列数 (图像宽).
    pub cols: usize,
}

impl SliceGeometry {
    /// 从可能缺失的元数据构建. 位置缺失时取原点, 间距缺失时取 1.0 mm/px.
    pub fn new(position: Option<Vec3>, spacing: Option<[f64; 2]>, rows: usize, cols: usize) -> Self {
        Self {
            position: position.map(AnatomicalPoint::from).unwrap_or_default(),
            spacing: PixelSpacing::from_optional(spacing),
            rows,
            cols,
        }
    }

    /// 按至少 1 行计算, 以保证换算不出现除零.
    #[inline]
    fn rows_f64(&self) -> f64 {
        self.rows.max(1) as f64
    }

    #[inline]
    fn cols_f64(&self) -> f64 {
        self.cols.max(1) as f64
    }

    /// 图像水平方向的物理跨度 (mm), 即 `sx * cols`.
    #[inline]
    pub fn width_mm(&self) -> f64 {
        self.spacing.sx() * self.cols_f64()
    }

    /// 图像竖直方向的物理跨度 (mm), 即 `sy * rows`.
    #[inline]
    pub fn height_mm(&self) -> f64 {
        self.spacing.sy() * self.rows_f64()
    }

    /// 归一化显示坐标 `(x, y)` 转换为物理坐标.
    ///
    /// - 横断面: `LR = P.LR + w·x`, `AP = P.AP + h·y`, `SI = P.SI`;
    /// - 冠状面: `LR = P.LR + w·x`, `AP = P.AP`, `SI = P.SI + h·(1 - y)`;
    /// - 矢状面: `LR = P.LR`, `AP = P.AP + h·(1 - y)`, `SI = P.SI + w·x`.
    ///
    /// 其中 `w = sx·cols`, `h = sy·rows`.
    pub fn display_to_physical(&self, orientation: Orientation, x: f64, y: f64) -> AnatomicalPoint {
        let p = self.position;
        let (w, h) = (self.width_mm(), self.height_mm());
        match orientation {
            Orientation::Axial => AnatomicalPoint::new(p.lr + w * x, p.ap + h * y, p.si),
            Orientation::Coronal => AnatomicalPoint::new(p.lr + w * x, p.ap, p.si + h * (1.0 - y)),
            Orientation::Sagittal => AnatomicalPoint::new(p.lr, p.ap + h * (1.0 - y), p.si + w * x),
        }
    }

    /// [`Self::display_to_physical`] 的逆变换: 把物理坐标投影到本切片的归一化显示坐标.
    ///
    /// 沿法向量方向的分量被忽略. 结果可能越出 `[0, 1]`.
    pub fn physical_to_display(&self, orientation: Orientation, point: &AnatomicalPoint) -> (f64, f64) {
        let p = self.position;
        let (w, h) = (self.width_mm(), self.height_mm());
        match orientation {
            Orientation::Axial => ((point.lr - p.lr) / w, (point.ap - p.ap) / h),
            Orientation::Coronal => ((point.lr - p.lr) / w, 1.0 - (point.si - p.si) / h),
            Orientation::Sagittal => ((point.si - p.si) / w, 1.0 - (point.ap - p.ap) / h),
        }
    }

    /// 由归一化半径求 ROI 物理面积 (mm²).
    ///
    /// 半径先按 `min(rows, cols)` 换算为像素, 再按水平间距换算为毫米 (假设方形像素).
    pub fn radius_to_area_mm2(&self, radius: f64) -> f64 {
        let pixel_radius = radius * self.rows.min(self.cols).max(1) as f64;
        let radius_mm = pixel_radius * self.spacing.sx();
        PI * radius_mm.powi(2)
    }

    /// 由物理面积 (mm²) 求本切片上的归一化半径 `sqrt(area / π) / (sx·cols)`.
    ///
    /// 非正面积或非有限值返回 `0.0`.
    pub fn area_to_radius(&self, area_mm2: f64) -> f64 {
        if !(area_mm2.is_finite() && area_mm2 > 0.0) {
            return 0.0;
        }
        (area_mm2 / PI).sqrt() / self.width_mm()
    }
}

/// 像素坐标 (以列为 x, 以行为 y) 转换为归一化坐标.
/// 若图像为空则返回 `None`.
#[inline]
pub fn pixel_to_normalized(px: f64, py: f64, (rows, cols): Idx2d) -> Option<(f64, f64)> {
    if rows == 0 || cols == 0 {
        return None;
    }
    Some((px / cols as f64, py / rows as f64))
}

/// 归一化坐标转换为像素坐标 `(列, 行)`, 向零取整.
/// 若图像为空, 或结果为负数/非有限值, 则返回 `None`.
#[inline]
pub fn normalized_to_pixel(x: f64, y: f64, (rows, cols): Idx2d) -> Option<(usize, usize)> {
    if rows == 0 || cols == 0 {
        return None;
    }
    let px = (x * cols as f64).trunc().to_usize()?;
    let py = (y * rows as f64).trunc().to_usize()?;
    Some((px, py))
}

/// 获取归一化坐标处的原始像素值 (不经过任何窗口变换).
///
/// 坐标不在 `[0, 1]` 内, 或落在像素网格以外时返回 `None`.
pub fn pixel_value_at<T: ToPrimitive + Copy>(pixels: ArrayView2<'_, T>, x: f64, y: f64) -> Option<f64> {
    if !((0.0..=1.0).contains(&x) && (0.0..=1.0).contains(&y)) {
        return None;
    }
    let (px, py) = normalized_to_pixel(x, y, pixels.dim())?;
    pixels.get((py, px)).and_then(|v| v.to_f64())
}
