//! 会话层的端到端流程: 标注, 跨序列配准, CSV 导出与导入.

use ndarray::Array2;
use roi_berry::prelude::*;
use roi_berry::session::ImportReport;

const AXIAL: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
const CORONAL: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

fn f64_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

fn init_logger() {
    let _ = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init();
}

fn series(key: &str, orientation: [f64; 6], z: &[f64]) -> Series {
    let slices = z
        .iter()
        .map(|&z| {
            Slice::new(
                Array2::from_elem((256, 256), 100.0 + z as f32),
                Some([0.0, 0.0, z]),
                Some(orientation),
                Some([1.0, 1.0]),
            )
        })
        .collect();
    let provenance = Provenance {
        study_id: "STUDY-1".to_string(),
        exam_number: "E42".to_string(),
        series_id: key.rsplit('/').next().unwrap_or(key).to_string(),
        series_uid: format!("uid.{key}"),
        series_path: key.to_string(),
    };
    Series::new(key, provenance, slices)
}

fn session_with(series_list: Vec<Series>) -> RoiSession {
    let mut s = RoiSession::in_memory(RoiConfig::default());
    for x in series_list {
        assert!(s.provider_mut().insert(x));
    }
    s
}

#[test]
fn reference_roi_geometry_and_coronal_rejection() {
    init_logger();
    let mut s = session_with(vec![
        series("/d/p/s/src", AXIAL, &[0.0]),
        series("/d/p/s/cor", CORONAL, &[2.0]),
    ]);
    assert!(s.load_series("/d/p/s/src"));
    assert!(s.add_roi(0.5, 0.5, 0.05));

    let roi = s.rois_for_current_slice()[0].clone();
    assert_eq!(roi.orientation, Some(Orientation::Axial));
    let p = roi.position_mm.unwrap();
    assert!(f64_eq(p.lr, 128.0, 1e-9) && f64_eq(p.ap, 128.0, 1e-9) && f64_eq(p.si, 0.0, 1e-9));
    assert!(f64_eq(roi.area_mm2, 515.2, 1.0));

    let report = s.copy_rois_from_series("/d/p/s/src", Some("/d/p/s/cor"), None);
    assert!(!report.any_copied());
    assert_eq!(report.orientation_mismatch, 1);
    assert!(s.store().of_series("/d/p/s/cor").is_empty());
}

#[test]
fn registration_follows_anatomical_position() {
    init_logger();
    let mut s = session_with(vec![
        series("/d/p/s/t1", AXIAL, &[10.0, 50.0]),
        series("/d/p/s/t2", AXIAL, &[9.0, 16.0]),
    ]);
    s.load_series("/d/p/s/t1");
    s.set_current_segment(1);
    s.add_roi(0.4, 0.4, 0.05);
    s.next_slice();
    s.set_current_segment(2);
    s.add_roi(0.6, 0.6, 0.05);

    s.load_series("/d/p/s/t2");
    let report = s.copy_rois_from_series("/d/p/s/t1", None, Some(5.0));
    assert_eq!(report.mapping.get(&0), Some(&0));
    assert_eq!(report.mapping.get(&1), None);
    assert_eq!(report.copied, 1);
    assert_eq!(report.unmapped, 1);

    let copied = s.query("/d/p/s/t2", 0);
    assert_eq!(copied.len(), 1);
    let r = copied[0];
    assert_eq!(r.segment_label, "1");
    assert!(f64_eq(r.center_x, 0.4, 1e-9) && f64_eq(r.center_y, 0.4, 1e-9));
    assert!(f64_eq(r.radius, 0.05, 1e-9));
    assert_eq!(r.provenance.series_uid, "uid./d/p/s/t2");
    // 统计量来自目标切片 (像素值 100 + 9).
    assert_eq!(r.stats.map(|st| st.mean), Some(109.0));
}

#[test]
fn csv_round_trip_through_file() {
    init_logger();
    let mut s = session_with(vec![series("/d/p/s/t1", AXIAL, &[0.0, 3.0, 6.0])]);
    s.load_series("/d/p/s/t1");
    for seg in 1..=4 {
        s.set_current_segment(seg);
        s.set_slice_index(seg as usize % 3);
        assert!(s.add_roi(0.125 * seg as f64, 0.5, 0.05));
    }
    let before: Vec<Roi> = s.store().iter().cloned().collect();

    let tmp = tempfile::tempdir().unwrap();
    let written = s.export(tmp.path().join("rois")).unwrap().unwrap();
    assert_eq!(written, tmp.path().join("rois.csv"));

    let mut fresh = session_with(vec![series("/d/p/s/t1", AXIAL, &[0.0, 3.0, 6.0])]);
    fresh.load_series("/d/p/s/t1");
    let ImportReport { loaded, skipped } = fresh.import(&written).unwrap();
    assert_eq!(loaded, before.len());
    assert!(skipped.is_empty());

    for (a, b) in before.iter().zip(fresh.store().iter()) {
        assert_eq!(a.segment_label, b.segment_label);
        assert_eq!(a.segment_index, b.segment_index);
        assert_eq!(a.series_key, b.series_key);
        assert_eq!(a.slice_index, b.slice_index);
        assert_eq!(a.orientation, b.orientation);
        assert_eq!(a.provenance, b.provenance);
        assert!(f64_eq(a.center_x, b.center_x, 1e-4));
        assert!(f64_eq(a.center_y, b.center_y, 1e-4));
        assert!(f64_eq(a.radius, b.radius, 1e-4));
        assert!(f64_eq(a.area_mm2, b.area_mm2, 1e-4));
        let (pa, pb) = (a.position_mm.unwrap(), b.position_mm.unwrap());
        assert!(f64_eq(pa.lr, pb.lr, 1e-4) && f64_eq(pa.ap, pb.ap, 1e-4));
        assert!(f64_eq(pa.si, pb.si, 1e-4));
        let (sa, sb) = (a.stats.unwrap(), b.stats.unwrap());
        assert!(f64_eq(sa.mean, sb.mean, 1e-2));
        assert_eq!(sa.size, sb.size);
    }
}

#[test]
fn import_skips_foreign_series_and_scheme() {
    init_logger();
    let mut s = session_with(vec![
        series("/d/p/s/t1", AXIAL, &[0.0]),
        series("/d/p/s/t2", AXIAL, &[0.0]),
    ]);
    s.load_series("/d/p/s/t1");
    s.add_roi(0.5, 0.5, 0.05);
    s.load_series("/d/p/s/t2");
    s.set_current_segment(2);
    s.add_roi(0.5, 0.5, 0.05);

    let tmp = tempfile::tempdir().unwrap();
    let path = s.export(tmp.path().join("both.csv")).unwrap().unwrap();

    // 当前为 t2: t1 的行被跳过.
    let report = s.import(&path).unwrap();
    assert_eq!(report.loaded, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(s.store().get(0).map(|r| r.segment_index), Some(2));

    // 切换到四段方案: 九段标签全部被跳过, 存储被清空.
    s.set_scheme(SegmentScheme::FourSegment);
    let report = s.import(&path).unwrap();
    assert_eq!(report.loaded, 0);
    assert_eq!(report.skipped.len(), 2);
    assert!(s.store().is_empty());
}

#[test]
fn import_errors_keep_existing_rois() {
    let mut s = session_with(vec![series("/d/p/s/t1", AXIAL, &[0.0])]);
    s.load_series("/d/p/s/t1");
    s.add_roi(0.5, 0.5, 0.05);

    let tmp = tempfile::tempdir().unwrap();
    let bad = tmp.path().join("bad.csv");
    std::fs::write(&bad, "Segment Label,Mean\n1,2\n").unwrap();
    assert!(matches!(s.import(&bad), Err(CsvError::MissingColumns(_))));
    assert!(matches!(
        s.import(tmp.path().join("missing.csv")),
        Err(CsvError::Io(_))
    ));
    assert_eq!(s.store().len(), 1);
}
