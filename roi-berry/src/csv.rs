//! ROI 的 CSV 导入导出.
//!
//! 文件为 UTF-8 文本, 逗号分隔, 第一行为表头, 列顺序见 [`COLUMNS`].
//! 坐标与物理量保留 4 位小数, 统计量保留 2 位小数, 缺失值写作 `N/A`.
//! 切片索引在文件中是 1-based 的.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use itertools::Itertools;
use once_cell::sync::Lazy;

use crate::consts::NOT_AVAILABLE;
use crate::geometry::{AnatomicalPoint, Orientation};
use crate::roi::{Provenance, Roi};
use crate::segment::SegmentScheme;
use crate::stats::RoiStatistics;

/// 表头, 按列顺序排列.
pub const COLUMNS: [&str; 21] = [
    "Segment Label",
    "Segment Index",
    "Slice Index(1-based)",
    "Center X",
    "Center Y",
    "Radius",
    "Center LR (mm)",
    "Center AP (mm)",
    "Center SI (mm)",
    "Orientation",
    "Area (mm2)",
    "Mean",
    "Median",
    "Min",
    "Max",
    "Size",
    "Study ID",
    "Exam Number",
    "Series ID",
    "Series UID",
    "Series Path",
];

/// 小写表头, 用于大小写不敏感的匹配.
static LOWER_COLUMNS: Lazy<Vec<String>> =
    Lazy::new(|| COLUMNS.iter().map(|c| c.to_ascii_lowercase()).collect());

// 列在 `COLUMNS` 中的位置.
const SEGMENT_LABEL: usize = 0;
const SEGMENT_INDEX: usize = 1;
const SLICE_INDEX: usize = 2;
const CENTER_X: usize = 3;
const CENTER_Y: usize = 4;
const RADIUS: usize = 5;
const CENTER_LR: usize = 6;
const CENTER_AP: usize = 7;
const CENTER_SI: usize = 8;
const ORIENTATION: usize = 9;
const AREA: usize = 10;
const MEAN: usize = 11;
const MEDIAN: usize = 12;
const MIN: usize = 13;
const MAX: usize = 14;
const SIZE: usize = 15;
const STUDY_ID: usize = 16;
const EXAM_NUMBER: usize = 17;
const SERIES_ID: usize = 18;
const SERIES_UID: usize = 19;
const SERIES_PATH: usize = 20;

/// 导入导出错误. 只有文件整体不可用时才会返回错误; 单行问题见 [`SkipReason`].
#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    /// 文件读写失败.
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    /// 文件为空, 没有表头.
    #[error("缺少表头")]
    MissingHeader,

    /// 表头缺少必需的列.
    #[error("表头缺少列: {0:?}")]
    MissingColumns(Vec<String>),

    /// 文本无法切分为记录 (例如引号未闭合).
    #[error("第 {line} 行格式错误: {reason}")]
    Malformed {
        /// 1-based 行号.
        line: usize,
        /// 原因.
        reason: String,
    },
}

/// 导入导出结果.
pub type CsvResult<T> = Result<T, CsvError>;

/// 单行被跳过的原因.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SkipReason {
    /// 字段数不足.
    #[error("字段数 {found} 少于表头要求的 {expected}")]
    ColumnCount {
        /// 需要的最少字段数.
        expected: usize,
        /// 实际字段数.
        found: usize,
    },

    /// `Series UID` 与当前序列不一致.
    #[error("Series UID `{0}` 与当前序列不一致")]
    SeriesMismatch(String),

    /// 标签不属于当前分段方案.
    #[error("标签 `{0}` 不属于当前分段方案")]
    LabelNotInScheme(String),

    /// 分段索引与标签在当前方案中的索引不一致.
    #[error("标签 `{label}` 的分段索引应为 {expected}, 文件中为 `{found}`")]
    LabelIndexMismatch {
        /// 标签.
        label: String,
        /// 方案给出的索引.
        expected: u32,
        /// 文件中的索引字段.
        found: String,
    },

    /// 字段值非法.
    #[error("列 `{column}` 的值 `{value}` 非法")]
    Invalid {
        /// 列名.
        column: &'static str,
        /// 原始值.
        value: String,
    },
}

/// 被跳过的一行.
#[derive(Clone, Debug, PartialEq)]
pub struct SkippedRow {
    /// 1-based 行号 (表头为第 1 行).
    pub line: usize,
    /// 原因.
    pub reason: SkipReason,
}

/// 导入时的筛选条件.
#[derive(Copy, Clone, Debug, Default)]
pub struct ImportFilter<'a> {
    /// 当前序列的 UID. 为 `None` 时不按 UID 筛选.
    pub series_uid: Option<&'a str>,
    /// 导入 ROI 归属的序列键. 为 `None` 时使用文件中的 `Series Path`.
    pub series_key: Option<&'a str>,
    /// 当前分段方案. 标签不属于该方案的行被跳过.
    pub scheme: SegmentScheme,
}

/// 导入结果.
#[derive(Clone, Debug, Default)]
pub struct Imported {
    /// 成功解析的 ROI, 按文件顺序排列.
    pub rois: Vec<Roi>,
    /// 被跳过的行.
    pub skipped: Vec<SkippedRow>,
}

/* ---------- 写 ---------- */

/// 按需给字段加引号.
fn quote_field(field: &str) -> Cow<'_, str> {
    let quote = field.contains([',', '"', '\n', '\r'])
        || field.starts_with(' ')
        || field.ends_with(' ');
    if quote {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[inline]
fn fixed(v: Option<f64>, digits: usize) -> String {
    match v {
        Some(v) => format!("{v:.digits$}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// 一个 ROI 对应的全部字段, 按 [`COLUMNS`] 顺序排列.
fn row_of(roi: &Roi) -> [String; 21] {
    let p = roi.position_mm;
    let s = roi.stats;
    let pv = &roi.provenance;
    [
        roi.segment_label.clone(),
        roi.segment_index.to_string(),
        (roi.slice_index + 1).to_string(),
        fixed(Some(roi.center_x), 4),
        fixed(Some(roi.center_y), 4),
        fixed(Some(roi.radius), 4),
        fixed(p.map(|p| p.lr), 4),
        fixed(p.map(|p| p.ap), 4),
        fixed(p.map(|p| p.si), 4),
        roi.orientation
            .map_or(NOT_AVAILABLE.to_string(), |o| o.code().to_string()),
        fixed(Some(roi.area_mm2), 4),
        fixed(s.map(|s| s.mean), 2),
        fixed(s.map(|s| s.median), 2),
        fixed(s.map(|s| s.min), 2),
        fixed(s.map(|s| s.max), 2),
        s.map_or(NOT_AVAILABLE.to_string(), |s| s.size.to_string()),
        pv.study_id.clone(),
        pv.exam_number.clone(),
        pv.series_id.clone(),
        pv.series_uid.clone(),
        pv.series_path.clone(),
    ]
}

fn join_fields<'a, I: IntoIterator<Item = &'a str>>(fields: I) -> String {
    fields.into_iter().map(quote_field).join(",")
}

/// 把表头与 `rois` 写入 `w`, 返回写入的 ROI 条数.
pub fn write_rois<'a, W, I>(w: &mut W, rois: I) -> io::Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Roi>,
{
    writeln!(w, "{}", join_fields(COLUMNS))?;
    let mut n = 0;
    for roi in rois {
        let row = row_of(roi);
        writeln!(w, "{}", join_fields(row.iter().map(String::as_str)))?;
        n += 1;
    }
    Ok(n)
}

/// 导出到文件 (覆盖写). 返回写入的 ROI 条数.
///
/// 写入中途失败时文件内容不保证完整.
pub fn export_to_path<'a, P, I>(path: P, rois: I) -> CsvResult<usize>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = &'a Roi>,
{
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    let n = write_rois(&mut w, rois)?;
    w.flush()?;
    log::info!("导出 {n} 个 ROI 到 {}", path.display());
    Ok(n)
}

/* ---------- 读 ---------- */

/// 把文本切分为记录. 每条记录附带其起始行号 (1-based).
///
/// 支持双引号包围的字段 (字段内可含逗号, 换行, 以及写作 `""` 的引号),
/// 以及 `\n` 或 `\r\n` 行尾. 空行被略去.
/// 未加引号的字段去掉首尾空白, 加引号的字段原样保留.
fn split_records(text: &str) -> CsvResult<Vec<(usize, Vec<String>)>> {
    #[derive(PartialEq)]
    enum State {
        FieldStart,
        Unquoted,
        Quoted,
        QuoteInQuoted,
    }

    fn unquoted(field: &mut String) -> String {
        let s = std::mem::take(field);
        let t = s.trim_end();
        if t.len() == s.len() {
            s
        } else {
            t.to_string()
        }
    }

    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = State::FieldStart;
    let mut line = 1;
    let mut record_line = 1;

    let mut finish_record = |fields: &mut Vec<String>, last: String, at: usize| {
        fields.push(last);
        let blank = fields.len() == 1 && fields[0].is_empty();
        let done = std::mem::take(fields);
        if !blank {
            records.push((at, done));
        }
    };

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            State::Quoted => match c {
                '"' => state = State::QuoteInQuoted,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            },
            State::QuoteInQuoted => match c {
                '"' => {
                    field.push('"');
                    state = State::Quoted;
                }
                ',' => {
                    fields.push(std::mem::take(&mut field));
                    state = State::FieldStart;
                }
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    finish_record(&mut fields, std::mem::take(&mut field), record_line);
                    line += 1;
                    record_line = line;
                    state = State::FieldStart;
                }
                _ => {
                    return Err(CsvError::Malformed {
                        line,
                        reason: format!("引号后出现非法字符 `{c}`"),
                    })
                }
            },
            State::FieldStart | State::Unquoted => match c {
                '"' if state == State::FieldStart => state = State::Quoted,
                ',' => {
                    fields.push(unquoted(&mut field));
                    state = State::FieldStart;
                }
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    finish_record(&mut fields, unquoted(&mut field), record_line);
                    line += 1;
                    record_line = line;
                    state = State::FieldStart;
                }
                ' ' | '\t' if state == State::FieldStart => {}
                _ => {
                    field.push(c);
                    state = State::Unquoted;
                }
            },
        }
    }

    match state {
        State::Quoted => {
            return Err(CsvError::Malformed {
                line: record_line,
                reason: "引号未闭合".to_string(),
            })
        }
        State::QuoteInQuoted => finish_record(&mut fields, field, record_line),
        _ if !(fields.is_empty() && field.trim().is_empty()) => {
            finish_record(&mut fields, unquoted(&mut field), record_line);
        }
        _ => {}
    }
    Ok(records)
}

/// 表头中每个必需列的位置.
struct ColumnIndex {
    positions: [usize; 21],
    min_len: usize,
}

impl ColumnIndex {
    fn from_header(header: &[String]) -> CsvResult<Self> {
        let lower: Vec<String> = header.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let mut positions = [0usize; 21];
        let mut missing = Vec::new();
        for (i, name) in LOWER_COLUMNS.iter().enumerate() {
            match lower.iter().position(|h| h == name) {
                Some(p) => positions[i] = p,
                None => missing.push(COLUMNS[i].to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(CsvError::MissingColumns(missing));
        }
        let min_len = positions.iter().max().map_or(0, |m| m + 1);
        Ok(Self { positions, min_len })
    }
}

/// 一行的字段, 已按列名定位.
struct Row<'r> {
    fields: &'r [String],
    index: &'r ColumnIndex,
}

impl<'r> Row<'r> {
    #[inline]
    fn raw(&self, column: usize) -> &'r str {
        &self.fields[self.index.positions[column]]
    }

    fn invalid(&self, column: usize) -> SkipReason {
        SkipReason::Invalid {
            column: COLUMNS[column],
            value: self.raw(column).to_string(),
        }
    }

    fn parse<T: std::str::FromStr>(&self, column: usize) -> Result<T, SkipReason> {
        self.raw(column).parse().map_err(|_| self.invalid(column))
    }

    /// `N/A` (或空) 解析为 `None`.
    fn optional<T: std::str::FromStr>(&self, column: usize) -> Result<Option<T>, SkipReason> {
        let raw = self.raw(column);
        if raw.is_empty() || raw.eq_ignore_ascii_case(NOT_AVAILABLE) {
            return Ok(None);
        }
        raw.parse().map(Some).map_err(|_| self.invalid(column))
    }
}

/// 三个或五个可选字段要么全部存在, 要么全部缺失.
fn all_or_none<T: Copy, const N: usize>(values: [Option<T>; N]) -> Option<Option<[T; N]>> {
    if values.iter().all(Option::is_none) {
        return Some(None);
    }
    let mut out = [values[0]?; N];
    for (o, v) in out.iter_mut().zip(values) {
        *o = v?;
    }
    Some(Some(out))
}

fn parse_row(row: &Row<'_>, filter: &ImportFilter<'_>) -> Result<Roi, SkipReason> {
    let series_uid = row.raw(SERIES_UID);
    if let Some(uid) = filter.series_uid {
        if series_uid != uid {
            return Err(SkipReason::SeriesMismatch(series_uid.to_string()));
        }
    }
    let label = row.raw(SEGMENT_LABEL);
    let expected = filter
        .scheme
        .index_of(label)
        .ok_or_else(|| SkipReason::LabelNotInScheme(label.to_string()))?;
    let segment_index: u32 = row.parse(SEGMENT_INDEX)?;
    if segment_index != expected {
        return Err(SkipReason::LabelIndexMismatch {
            label: label.to_string(),
            expected,
            found: row.raw(SEGMENT_INDEX).to_string(),
        });
    }

    let slice_index = row
        .parse::<usize>(SLICE_INDEX)?
        .checked_sub(1)
        .ok_or_else(|| row.invalid(SLICE_INDEX))?;

    let position = all_or_none([
        row.optional::<f64>(CENTER_LR)?,
        row.optional::<f64>(CENTER_AP)?,
        row.optional::<f64>(CENTER_SI)?,
    ])
    .ok_or_else(|| row.invalid(CENTER_LR))?
    .map(AnatomicalPoint::from);

    let orientation = match row.optional::<u8>(ORIENTATION)? {
        None => None,
        Some(code) => Some(Orientation::from_code(code).ok_or_else(|| row.invalid(ORIENTATION))?),
    };

    let size = row.optional::<usize>(SIZE)?;
    let stats = all_or_none([
        row.optional::<f64>(MEAN)?,
        row.optional::<f64>(MEDIAN)?,
        row.optional::<f64>(MIN)?,
        row.optional::<f64>(MAX)?,
        size.map(|s| s as f64),
    ])
    .ok_or_else(|| row.invalid(MEAN))?
    .map(|[mean, median, min, max, _]| RoiStatistics {
        mean,
        median,
        min,
        max,
        size: size.unwrap_or(0),
    });

    let series_path = row.raw(SERIES_PATH);
    Ok(Roi {
        segment_label: label.to_string(),
        segment_index,
        series_key: filter.series_key.unwrap_or(series_path).to_string(),
        slice_index,
        center_x: row.parse(CENTER_X)?,
        center_y: row.parse(CENTER_Y)?,
        radius: row.parse(RADIUS)?,
        position_mm: position,
        orientation,
        area_mm2: row.parse(AREA)?,
        stats,
        provenance: Provenance {
            study_id: row.raw(STUDY_ID).to_string(),
            exam_number: row.raw(EXAM_NUMBER).to_string(),
            series_id: row.raw(SERIES_ID).to_string(),
            series_uid: series_uid.to_string(),
            series_path: series_path.to_string(),
        },
    })
}

/// 从文本解析 ROI.
///
/// 表头缺失或缺列是错误; 单行问题只会跳过该行并记录到 [`Imported::skipped`].
pub fn parse_rois(text: &str, filter: &ImportFilter<'_>) -> CsvResult<Imported> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut records = split_records(text)?.into_iter();
    let (_, header) = records.next().ok_or(CsvError::MissingHeader)?;
    let index = ColumnIndex::from_header(&header)?;

    let mut imported = Imported::default();
    for (line, fields) in records {
        let result = if fields.len() < index.min_len {
            Err(SkipReason::ColumnCount {
                expected: index.min_len,
                found: fields.len(),
            })
        } else {
            parse_row(&Row { fields: &fields, index: &index }, filter)
        };
        match result {
            Ok(roi) => imported.rois.push(roi),
            Err(reason) => {
                log::warn!("跳过第 {line} 行: {reason}");
                imported.skipped.push(SkippedRow { line, reason });
            }
        }
    }
    Ok(imported)
}

/// 从 `reader` 读取全部文本后解析.
pub fn read_rois<R: Read>(mut reader: R, filter: &ImportFilter<'_>) -> CsvResult<Imported> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_rois(&text, filter)
}

/// 从文件导入.
pub fn import_from_path<P: AsRef<Path>>(path: P, filter: &ImportFilter<'_>) -> CsvResult<Imported> {
    let path = path.as_ref();
    let imported = read_rois(File::open(path)?, filter)?;
    log::info!(
        "从 {} 导入 {} 个 ROI, 跳过 {} 行",
        path.display(),
        imported.rois.len(),
        imported.skipped.len()
    );
    Ok(imported)
}

/// 把 ROI 渲染为一段 CSV 文本 (含表头).
pub fn to_csv_string<'a, I: IntoIterator<Item = &'a Roi>>(rois: I) -> String {
    let mut buf = Vec::new();
    if let Err(e) = write_rois(&mut buf, rois) {
        log::error!("渲染 CSV 失败: {e}");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::tests::sample_roi;

    fn filter(uid: Option<&str>) -> ImportFilter<'_> {
        ImportFilter {
            series_uid: uid,
            series_key: None,
            scheme: SegmentScheme::NineSegment,
        }
    }

    #[test]
    fn test_header_and_formatting() {
        let mut roi = sample_roi(5, "s1", 9);
        roi.segment_label = "4b".to_string();
        roi.provenance.study_id = "a,b".to_string();
        roi.stats = Some(RoiStatistics {
            mean: 10.0 / 3.0,
            median: 3.0,
            min: -1.0,
            max: 7.5,
            size: 12,
        });
        let text = to_csv_string([&roi]);
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), COLUMNS.join(","));
        let row = lines.next().unwrap();
        assert!(row.starts_with("4b,5,10,0.5000,0.2500,0.0500,128.0000,64.0000,10.0000,3,514.7185,"));
        assert!(row.contains(",3.33,3.00,-1.00,7.50,12,\"a,b\","));
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_missing_values_written_as_na() {
        let mut roi = sample_roi(1, "s1", 0);
        roi.position_mm = None;
        roi.orientation = None;
        let text = to_csv_string([&roi]);
        let row = text.lines().nth(1).unwrap();
        assert!(row.contains(",N/A,N/A,N/A,N/A,514.7185,N/A,N/A,N/A,N/A,N/A,"));

        let back = parse_rois(&text, &filter(None)).unwrap();
        assert!(back.skipped.is_empty());
        let r = &back.rois[0];
        assert!(r.position_mm.is_none() && r.orientation.is_none() && r.stats.is_none());
    }

    #[test]
    fn test_round_trip() {
        let rois: Vec<Roi> = (1..=3).map(|i| sample_roi(i, "s1", i as usize)).collect();
        let text = to_csv_string(&rois);
        let back = parse_rois(&text, &filter(Some("1.2.3.s1"))).unwrap();
        assert!(back.skipped.is_empty());
        assert_eq!(back.rois, rois);
    }

    #[test]
    fn test_header_is_case_insensitive_and_reorderable() {
        let roi = sample_roi(2, "s1", 0);
        let text = to_csv_string([&roi]);
        let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
        lines[0] = lines[0].to_uppercase();
        let back = parse_rois(&lines.join("\r\n"), &filter(None)).unwrap();
        assert_eq!(back.rois, vec![roi.clone()]);

        // 交换前两列.
        let swap = |l: &str| {
            let mut f: Vec<&str> = l.split(',').collect();
            f.swap(0, 1);
            f.join(",")
        };
        let swapped: Vec<String> = text.lines().map(swap).collect();
        let back = parse_rois(&swapped.join("\n"), &filter(None)).unwrap();
        assert_eq!(back.rois, vec![roi]);
    }

    #[test]
    fn test_missing_header_and_columns() {
        assert!(matches!(
            parse_rois("", &filter(None)),
            Err(CsvError::MissingHeader)
        ));
        assert!(matches!(
            parse_rois("\u{feff}\n\n", &filter(None)),
            Err(CsvError::MissingHeader)
        ));
        let header = COLUMNS[..20].join(",");
        match parse_rois(&header, &filter(None)) {
            Err(CsvError::MissingColumns(m)) => assert_eq!(m, vec!["Series Path".to_string()]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_rows_are_skipped_not_fatal() {
        let mut four = sample_roi(1, "s1", 0);
        four.segment_label = "Left Lateral".to_string();
        let other = sample_roi(2, "s2", 0);
        let good = sample_roi(3, "s1", 0);
        let mut text = to_csv_string([&four, &other, &good]);
        text.push_str("3,3,0,0.5,0.5,0.1\n");

        let back = parse_rois(&text, &filter(Some("1.2.3.s1"))).unwrap();
        assert_eq!(back.rois, vec![good]);
        let reasons: Vec<(usize, SkipReason)> =
            back.skipped.into_iter().map(|s| (s.line, s.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (2, SkipReason::LabelNotInScheme("Left Lateral".to_string())),
                (3, SkipReason::SeriesMismatch("1.2.3.s2".to_string())),
                (
                    5,
                    SkipReason::ColumnCount {
                        expected: 21,
                        found: 6
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_label_must_match_index() {
        let good = sample_roi(1, "s1", 0);
        let mut relabelled = good.clone();
        relabelled.segment_label = "4a".to_string();
        let text = to_csv_string([&good, &relabelled]);

        let back = parse_rois(&text, &filter(None)).unwrap();
        assert_eq!(back.rois, vec![good]);
        assert_eq!(
            back.skipped,
            vec![SkippedRow {
                line: 3,
                reason: SkipReason::LabelIndexMismatch {
                    label: "4a".to_string(),
                    expected: 4,
                    found: "1".to_string(),
                },
            }]
        );
    }

    #[test]
    fn test_string_and_writer_agree() {
        let rois: Vec<Roi> = (1..=2).map(|i| sample_roi(i, "s1", 0)).collect();
        let mut buf = Vec::new();
        assert_eq!(write_rois(&mut buf, &rois).unwrap(), 2);
        assert_eq!(to_csv_string(&rois), String::from_utf8(buf).unwrap());
    }

    #[test]
    fn test_edge_spaces_survive_quoting() {
        let mut roi = sample_roi(2, "s1", 0);
        roi.provenance.study_id = "  padded ".to_string();
        roi.provenance.exam_number = " E1".to_string();
        let text = to_csv_string([&roi]);
        assert!(text.contains(",\"  padded \",\" E1\","));

        let back = parse_rois(&text, &filter(None)).unwrap();
        assert_eq!(back.rois, vec![roi]);

        // 未加引号的字段仍去掉首尾空白.
        let records = split_records(" a , \" b \",c \n").unwrap();
        assert_eq!(records[0].1, vec!["a".to_string(), " b ".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_invalid_values() {
        let roi = sample_roi(1, "s1", 0);
        let text = to_csv_string([&roi]);
        let header = text.lines().next().unwrap();
        let row = text.lines().nth(1).unwrap();

        let zero_slice = row.replacen(",1,1,", ",1,0,", 1);
        let back = parse_rois(&format!("{header}\n{zero_slice}"), &filter(None)).unwrap();
        assert!(matches!(
            back.skipped[0].reason,
            SkipReason::Invalid { column: "Slice Index(1-based)", .. }
        ));

        let bad_orientation = row.replace(",10.0000,3,", ",10.0000,7,");
        let back = parse_rois(&format!("{header}\n{bad_orientation}"), &filter(None)).unwrap();
        assert!(matches!(
            back.skipped[0].reason,
            SkipReason::Invalid { column: "Orientation", .. }
        ));
    }

    #[test]
    fn test_quoted_fields() {
        let records = split_records("a,\"b,\"\"c\"\"\",d\r\n\"multi\nline\",x\n\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], (1, vec!["a".into(), "b,\"c\"".into(), "d".into()]));
        assert_eq!(records[1], (2, vec!["multi\nline".into(), "x".into()]));

        assert!(matches!(
            split_records("a,\"open\n"),
            Err(CsvError::Malformed { line: 1, .. })
        ));
    }

    #[test]
    fn test_series_key_override() {
        let roi = sample_roi(1, "/data/p/s/old", 0);
        let text = to_csv_string([&roi]);
        let f = ImportFilter {
            series_key: Some("new-key"),
            ..filter(None)
        };
        let back = parse_rois(&text, &f).unwrap();
        assert_eq!(back.rois[0].series_key, "new-key");
        assert_eq!(back.rois[0].provenance.series_path, "/data/p/s/old");
    }
}
