//! 程序运行函数.

use std::f64::consts::TAU;
use std::path::PathBuf;

use roi_berry::config::RoiConfig;
use roi_berry::csv::CsvResult;
use roi_berry::registration::RegistrationReport;
use roi_berry::session::{DetailedStatistics, ImportReport};
use roi_berry::{RoiSession, SegmentScheme};

use crate::phantom::{self, PhantomSpec};

/// ROI 在源序列上的半径 (归一化).
const ROI_RADIUS: f64 = 0.04;

/// 每个段之间相隔的源切片数.
const SLICE_STRIDE: usize = 4;

/// 一次完整运行的结果.
#[derive(Debug)]
pub struct PipelineReport {
    /// 源序列上标注的 ROI 个数.
    pub annotated: usize,
    /// 配准结果.
    pub registration: RegistrationReport,
    /// 导出的文件. 没有 ROI 可导出时为 `None`.
    pub exported: Option<PathBuf>,
    /// 导入结果.
    pub imported: Option<ImportReport>,
    /// 导入后目标序列的详细统计.
    pub target_statistics: Vec<DetailedStatistics>,
}

/// 在源序列上为每个九段标签放置一个 ROI, 位置沿肝脏内圈均匀分布.
fn annotate(session: &mut RoiSession, spec: &PhantomSpec) -> usize {
    session.load_series(spec.key);
    let labels = SegmentScheme::NineSegment.segment_count();
    let mut added = 0;
    for seg in 1..=labels as u32 {
        let theta = TAU * (seg - 1) as f64 / labels as f64;
        let (x, y) = (0.5 + 0.2 * theta.cos(), 0.5 + 0.2 * theta.sin());
        let slice = (seg as usize - 1) * SLICE_STRIDE;
        if session.set_slice_index(slice) && session.set_current_segment(seg) && session.add_roi(x, y, ROI_RADIUS) {
            added += 1;
        }
    }
    log::info!("源序列标注 {added} 个 ROI");
    added
}

/// 实际运行.
pub fn run(config: RoiConfig) -> CsvResult<PipelineReport> {
    let source = phantom::source_spec();
    let target = phantom::target_spec();

    let mut session = RoiSession::in_memory(config);
    session.provider_mut().insert(source.build());
    session.provider_mut().insert(target.build());

    let annotated = annotate(&mut session, &source);

    session.load_series(target.key);
    let registration = session.copy_rois_from_series(source.key, None, None);

    let exported = session.export_default()?;
    let imported = match &exported {
        Some(path) => Some(session.import(path)?),
        None => None,
    };

    Ok(PipelineReport {
        annotated,
        registration,
        exported,
        imported,
        target_statistics: session.detailed_statistics(),
    })
}
