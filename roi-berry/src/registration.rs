//! 跨序列 ROI 配准.
//!
//! 两个序列分别独立采集 (序列类型, 时间点, 层厚, 层数都可能不同). 我们不按切片索引,
//! 而按解剖学位置寻找对应切片:
//!
//! 1. 对每张源切片, 在目标序列中寻找沿 **目标** 切片法向轴距离最小的切片,
//!   距离超过门限 (默认 5.0 mm) 则视为无对应;
//! 2. 对落在有对应切片上的源 ROI, 检查平面一致与分段方案一致;
//! 3. 把 ROI 的物理中心与面积换算到目标切片上, 重新计算统计量后插入存储.
//!
//! 不同源切片可以映射到同一张目标切片, 映射也不要求单调.

use std::collections::BTreeMap;

use ordered_float::NotNan;

use crate::consts::NOT_AVAILABLE;
use crate::provider::{OrientationTable, PositionTable, SliceProvider};
use crate::roi::{Roi, RoiStore};
use crate::segment::SegmentScheme;
use crate::stats::roi_statistics;
use crate::Vec3;

/// 源切片索引 → 目标切片索引.
pub type SliceMapping = BTreeMap<usize, usize>;

/// 在 `target` 中寻找与 `position` 最近的切片.
///
/// 比较轴由目标切片自身的平面决定; 没有平面信息的目标切片不参与比较.
/// 距离相同时取索引较小者.
fn nearest_slice(
    position: &Vec3,
    target: &PositionTable,
    target_orientations: &OrientationTable,
    max_distance_mm: f64,
) -> Option<(usize, f64)> {
    target
        .iter()
        .filter_map(|(i, p)| {
            let axis = target_orientations.get(i)?.axis();
            let d = NotNan::new((position[axis] - p[axis]).abs()).ok()?;
            Some((*i, d))
        })
        .min_by_key(|&(_, d)| d)
        .map(|(i, d)| (i, d.into_inner()))
        .filter(|&(_, d)| d <= max_distance_mm)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

        fn map_each<F>(source: &PositionTable, f: F) -> SliceMapping
        where
            F: Fn(usize, &Vec3) -> Option<usize> + Sync + Send,
        {
            source
                .par_iter()
                .filter_map(|(&i, p)| f(i, p).map(|t| (i, t)))
                .collect()
        }
    } else {
        fn map_each<F>(source: &PositionTable, f: F) -> SliceMapping
        where
            F: Fn(usize, &Vec3) -> Option<usize>,
        {
            source
                .iter()
                .filter_map(|(&i, p)| f(i, p).map(|t| (i, t)))
                .collect()
        }
    }
}

/// 计算源切片到目标切片的映射.
///
/// 没有目标切片落在 `max_distance_mm` (含) 以内的源切片不出现在结果中.
pub fn match_slices(
    source: &PositionTable,
    target: &PositionTable,
    target_orientations: &OrientationTable,
    max_distance_mm: f64,
) -> SliceMapping {
    map_each(source, |i, p| {
        match nearest_slice(p, target, target_orientations, max_distance_mm) {
            Some((t, d)) => {
                log::debug!("源切片 {i} -> 目标切片 {t}, 距离 {d:.3} mm");
                Some(t)
            }
            None => {
                log::debug!("源切片 {i} 在 {max_distance_mm} mm 内没有对应切片");
                None
            }
        }
    })
}

/// 一次配准的结果统计.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    /// 源切片到目标切片的映射.
    pub mapping: SliceMapping,
    /// 成功复制的 ROI 个数.
    pub copied: usize,
    /// 所在源切片没有对应目标切片的 ROI 个数.
    pub unmapped: usize,
    /// 平面与目标切片不一致而被拒绝的 ROI 个数.
    pub orientation_mismatch: usize,
    /// 标签不属于当前分段方案而被拒绝的 ROI 个数.
    pub scheme_mismatch: usize,
    /// 缺少物理位置 (或目标切片不可读) 而被跳过的 ROI 个数.
    pub missing_geometry: usize,
}

impl RegistrationReport {
    /// 是否至少复制了一个 ROI.
    #[inline]
    pub fn any_copied(&self) -> bool {
        self.copied > 0
    }

    /// 被拒绝或跳过的 ROI 总数.
    #[inline]
    pub fn rejected(&self) -> usize {
        self.unmapped + self.orientation_mismatch + self.scheme_mismatch + self.missing_geometry
    }
}

/// 把 `source` 序列的全部 ROI 配准到 `target` 序列, 结果插入 `store`.
///
/// 新 ROI 保留原始物理中心与面积, 但使用目标切片的索引, 归一化坐标, 平面,
/// 统计量与来源信息. 插入遵循同键替换, 之后去重, 只触发一次通知.
///
/// 没有任何 ROI 被复制不是错误; 调用方通过 [`RegistrationReport::any_copied`] 判断.
pub fn register_rois<P>(
    store: &mut RoiStore,
    provider: &P,
    source: &str,
    target: &str,
    scheme: SegmentScheme,
    max_distance_mm: f64,
) -> RegistrationReport
where
    P: SliceProvider + ?Sized,
{
    let mut report = RegistrationReport::default();
    if source == target {
        log::warn!("源序列与目标序列相同 ({source}), 不执行配准");
        return report;
    }

    let target_orientations = provider.slice_orientations(target);
    report.mapping = match_slices(
        &provider.anatomical_positions(source),
        &provider.anatomical_positions(target),
        &target_orientations,
        max_distance_mm,
    );
    let provenance = provider.provenance(target).cloned().unwrap_or_default();

    let mut produced = Vec::new();
    for roi in store.of_series(source) {
        let Some(&t) = report.mapping.get(&roi.slice_index) else {
            report.unmapped += 1;
            continue;
        };
        // 映射中的目标切片一定能分类.
        let Some(&orientation) = target_orientations.get(&t) else {
            report.missing_geometry += 1;
            continue;
        };
        if roi.orientation != Some(orientation) {
            log::warn!(
                "段 {} 标注于 {} 平面, 目标切片 {t} 为 {orientation}, 拒绝",
                roi.segment_label,
                roi.orientation.map_or(NOT_AVAILABLE.to_string(), |o| o.to_string()),
            );
            report.orientation_mismatch += 1;
            continue;
        }
        if !scheme.contains(&roi.segment_label) {
            log::warn!("段 {} 不属于 {scheme} 方案, 拒绝", roi.segment_label);
            report.scheme_mismatch += 1;
            continue;
        }
        let (Some(position), Some(slice)) = (roi.position_mm, provider.slice(target, t)) else {
            log::warn!("段 {} 缺少物理位置或目标切片 {t} 不可读, 跳过", roi.segment_label);
            report.missing_geometry += 1;
            continue;
        };

        let geometry = slice.meta.geometry();
        let (center_x, center_y) = geometry.physical_to_display(orientation, &position);
        let radius = geometry.area_to_radius(roi.area_mm2);
        produced.push(Roi {
            segment_label: roi.segment_label.clone(),
            segment_index: roi.segment_index,
            series_key: target.to_string(),
            slice_index: t,
            center_x,
            center_y,
            radius,
            position_mm: Some(position),
            orientation: Some(orientation),
            area_mm2: roi.area_mm2,
            stats: roi_statistics(slice.view(), center_x, center_y, radius),
            provenance: provenance.clone(),
        });
    }

    report.copied = store.extend(produced);
    log::info!(
        "配准 {source} -> {target}: 复制 {}, 无对应 {}, 平面不一致 {}, 方案不一致 {}, 缺少几何 {}",
        report.copied,
        report.unmapped,
        report.orientation_mismatch,
        report.scheme_mismatch,
        report.missing_geometry,
    );
    report
}
