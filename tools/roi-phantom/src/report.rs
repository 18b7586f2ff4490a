//! 运行结果.

use std::io::{self, Write};

use crate::runner::PipelineReport;

const SEP: &str = "--------------------------------------------------------";
const S4: &str = "    ";

#[inline]
fn opt_to_display<T: ToString>(v: Option<T>) -> String {
    match v {
        Some(v) => v.to_string(),
        None => "/".to_string(),
    }
}

/// 将 `report` 写进 `w` 中.
pub fn describe_into<W: Write>(report: &PipelineReport, w: &mut W) -> io::Result<()> {
    let reg = &report.registration;
    writeln!(w, "{SEP}")?;
    writeln!(w, "Annotated on source: {}", report.annotated)?;
    writeln!(w, "Registration:")?;
    writeln!(w, "{S4}Mapped slices: {}", reg.mapping.len())?;
    writeln!(w, "{S4}Copied: {}", reg.copied)?;
    writeln!(w, "{S4}Unmapped: {}", reg.unmapped)?;
    writeln!(w, "{S4}Orientation mismatch: {}", reg.orientation_mismatch)?;
    writeln!(w, "{S4}Scheme mismatch: {}", reg.scheme_mismatch)?;
    writeln!(w, "{S4}Missing geometry: {}", reg.missing_geometry)?;
    writeln!(
        w,
        "Exported to: {}",
        opt_to_display(report.exported.as_ref().map(|p| p.display()))
    )?;
    writeln!(
        w,
        "Imported back: {} (skipped {})",
        opt_to_display(report.imported.as_ref().map(|i| i.loaded)),
        opt_to_display(report.imported.as_ref().map(|i| i.skipped.len())),
    )?;
    writeln!(w, "{SEP}")?;
    writeln!(w, "{:<6}{:>7}{:>9}{:>9}{:>9}{:>9}{:>7}", "Seg", "Slice", "X", "Y", "Mean", "Median", "Size")?;
    for d in &report.target_statistics {
        writeln!(
            w,
            "{:<6}{:>7}{:>9.4}{:>9.4}{:>9.2}{:>9.2}{:>7}",
            d.label, d.slice_number, d.center_x, d.center_y, d.stats.mean, d.stats.median, d.stats.size
        )?;
    }
    write!(w, "{SEP}")?;
    Ok(())
}
