//! 圆形 ROI 的像素统计量.
//!
//! 统计总是基于切片原始像素值 (例如 MR 信号强度或 CT HU), 与显示窗口无关.

use ndarray::{Array2, ArrayView2};
use num::ToPrimitive;
use ordered_float::NotNan;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Idx2d;

/// 一个 ROI 覆盖像素的统计量.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoiStatistics {
    /// 算术平均值.
    pub mean: f64,
    /// 中位数. 偶数个像素时取中间两个值的平均.
    pub median: f64,
    /// 最小值.
    pub min: f64,
    /// 最大值.
    pub max: f64,
    /// 参与统计的像素个数.
    pub size: usize,
}

/// 圆盘在像素网格上的参数: 中心 `(列, 行)` 与半径, 单位均为像素.
#[derive(Copy, Clone, Debug)]
struct Disk {
    cx: f64,
    cy: f64,
    r: f64,
}

impl Disk {
    /// 由归一化参数构建. 中心为 `(center_x·width, center_y·height)`,
    /// 半径为 `radius·min(width, height)`. 参数非法时返回 `None`.
    fn from_normalized((height, width): Idx2d, center_x: f64, center_y: f64, radius: f64) -> Option<Self> {
        if height == 0 || width == 0 {
            return None;
        }
        let disk = Self {
            cx: center_x * width as f64,
            cy: center_y * height as f64,
            r: radius * height.min(width) as f64,
        };
        (disk.cx.is_finite() && disk.cy.is_finite() && disk.r.is_finite() && disk.r >= 0.0)
            .then_some(disk)
    }

    #[inline]
    fn contains(&self, (py, px): Idx2d) -> bool {
        let dx = px as f64 - self.cx;
        let dy = py as f64 - self.cy;
        dx * dx + dy * dy <= self.r * self.r
    }

    /// 沿一个维度与 `[0, len)` 求交的闭区间. 空交集返回 `None`.
    fn span(center: f64, r: f64, len: usize) -> Option<(usize, usize)> {
        let lo = (center - r).ceil().max(0.0);
        let hi = (center + r).floor().min(len as f64 - 1.0);
        (lo <= hi).then(|| (lo as usize, hi as usize))
    }

    /// 以行优先顺序获取圆盘在 `(height, width)` 网格内覆盖的所有索引.
    fn positions(&self, (height, width): Idx2d) -> Vec<Idx2d> {
        let (Some((y0, y1)), Some((x0, x1))) = (
            Self::span(self.cy, self.r, height),
            Self::span(self.cx, self.r, width),
        ) else {
            return Vec::new();
        };
        (y0..=y1)
            .flat_map(move |py| (x0..=x1).map(move |px| (py, px)))
            .filter(|&p| self.contains(p))
            .collect()
    }
}

/// 获取归一化圆形 ROI 覆盖的所有像素索引 `(行, 列)`, 行优先排列.
///
/// 像素 `(py, px)` 被包含当且仅当它到 `(center_x·width, center_y·height)`
/// 的欧氏距离不大于 `radius·min(width, height)`.
pub fn disk_positions(shape: Idx2d, center_x: f64, center_y: f64, radius: f64) -> Vec<Idx2d> {
    Disk::from_normalized(shape, center_x, center_y, radius)
        .map(|d| d.positions(shape))
        .unwrap_or_default()
}

/// 构建归一化圆形 ROI 的布尔掩膜, 形状为 `shape`.
pub fn disk_mask(shape: Idx2d, center_x: f64, center_y: f64, radius: f64) -> Array2<bool> {
    let mut mask = Array2::from_elem(shape, false);
    for p in disk_positions(shape, center_x, center_y, radius) {
        mask[p] = true;
    }
    mask
}

/// 计算归一化圆形 ROI 在 `pixels` 上的统计量.
///
/// 非有限像素值 (NaN, inf) 不参与统计.
///
/// # 返回值
///
/// 掩膜没有选中任何像素时 (例如 ROI 完全在网格之外, 或半径小于一个像素且中心不在格点上)
/// 返回 `None`. 调用方应当把 `None` 与值为 0 的统计量区分开.
pub fn roi_statistics<T: ToPrimitive + Copy>(
    pixels: ArrayView2<'_, T>,
    center_x: f64,
    center_y: f64,
    radius: f64,
) -> Option<RoiStatistics> {
    let mut values: Vec<NotNan<f64>> = disk_positions(pixels.dim(), center_x, center_y, radius)
        .into_iter()
        .filter_map(|p| pixels[p].to_f64())
        .filter(|v| v.is_finite())
        .filter_map(|v| NotNan::new(v).ok())
        .collect();
    summarize(&mut values)
}

/// 对已收集的像素值求统计量. 会就地排序 `values`.
fn summarize(values: &mut [NotNan<f64>]) -> Option<RoiStatistics> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let size = values.len();
    let sum: f64 = values.iter().map(|v| v.into_inner()).sum();
    let mid = size / 2;
    let median = if size % 2 == 0 {
        (values[mid - 1].into_inner() + values[mid].into_inner()) / 2.0
    } else {
        values[mid].into_inner()
    };
    Some(RoiStatistics {
        mean: sum / size as f64,
        median,
        min: values[0].into_inner(),
        max: values[size - 1].into_inner(),
        size,
    })
}
