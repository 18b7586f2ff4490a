//! 面向 UI 层的会话.
//!
//! 会话是 ROI 存储的唯一写者: 当前序列, 当前切片, 分段方案和当前段都保存在这里,
//! UI 只需要把点击, 按键和文件选择转换成对会话的调用, 再通过 [`RoiSession::subscribe`]
//! 得到变更通知.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RoiConfig;
use crate::consts::CSV_EXTENSION;
use crate::csv::{self, CsvResult, ImportFilter, SkippedRow};
use crate::provider::{SeriesRegistry, Slice, SliceProvider};
use crate::registration::{register_rois, RegistrationReport};
use crate::roi::{Roi, RoiStore};
use crate::segment::SegmentScheme;
use crate::stats::{roi_statistics, RoiStatistics};

/// 当前切片统计表的一行.
#[derive(Clone, Debug, PartialEq)]
pub struct StatisticsRow {
    /// 段标签.
    pub label: String,
    /// 均值.
    pub mean: f64,
    /// 中位数.
    pub median: f64,
    /// 最小值.
    pub min: f64,
    /// 最大值.
    pub max: f64,
}

/// 详细统计表的一行.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailedStatistics {
    /// 段标签.
    pub label: String,
    /// 序列键.
    pub series_key: String,
    /// 1-based 切片索引.
    pub slice_number: usize,
    /// 归一化中心 x.
    pub center_x: f64,
    /// 归一化中心 y.
    pub center_y: f64,
    /// 归一化半径.
    pub radius: f64,
    /// 统计量 (含像素个数).
    pub stats: RoiStatistics,
}

/// 一次导入的结果.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportReport {
    /// 导入后存储中的 ROI 个数.
    pub loaded: usize,
    /// 被跳过的行.
    pub skipped: Vec<SkippedRow>,
}

/// ROI 标注会话.
pub struct RoiSession<P = SeriesRegistry> {
    provider: P,
    store: RoiStore,
    config: RoiConfig,
    active: Option<String>,
    slice_index: usize,
    scheme: SegmentScheme,
    segment: u32,
}

impl RoiSession<SeriesRegistry> {
    /// 以空的内存登记表创建会话.
    pub fn in_memory(config: RoiConfig) -> Self {
        Self::new(SeriesRegistry::new(), config)
    }
}

impl<P: SliceProvider> RoiSession<P> {
    /// 创建会话. 默认九段方案, 当前段为第 1 段, 没有加载序列.
    pub fn new(provider: P, config: RoiConfig) -> Self {
        Self {
            provider,
            store: RoiStore::new(),
            config,
            active: None,
            slice_index: 0,
            scheme: SegmentScheme::default(),
            segment: 1,
        }
    }

    /// 切片提供者.
    #[inline]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// 可变切片提供者 (例如向登记表追加序列).
    #[inline]
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// ROI 存储 (只读).
    #[inline]
    pub fn store(&self) -> &RoiStore {
        &self.store
    }

    /// 运行参数.
    #[inline]
    pub fn config(&self) -> &RoiConfig {
        &self.config
    }

    /// 注册变更通知回调.
    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(&[Roi]) + 'static,
    {
        self.store.subscribe(observer);
    }

    /* ---------- 序列与切片 ---------- */

    /// 加载序列并回到第一张切片. 序列不存在或为空时返回 `false`.
    pub fn load_series(&mut self, series_key: &str) -> bool {
        match self.provider.slice_count(series_key) {
            Some(n) if n > 0 => {
                self.active = Some(series_key.to_string());
                self.slice_index = 0;
                log::info!("加载序列 {series_key}, 共 {n} 张切片");
                true
            }
            _ => {
                log::warn!("序列 {series_key} 不存在或为空");
                false
            }
        }
    }

    /// 当前序列键.
    #[inline]
    pub fn active_series(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// 当前切片索引 (0-based).
    #[inline]
    pub fn slice_index(&self) -> usize {
        self.slice_index
    }

    /// 当前序列的切片数. 没有加载序列时为 0.
    pub fn slice_count(&self) -> usize {
        self.active
            .as_deref()
            .and_then(|k| self.provider.slice_count(k))
            .unwrap_or(0)
    }

    /// 当前切片.
    pub fn current_slice(&self) -> Option<&Slice> {
        self.provider.slice(self.active.as_deref()?, self.slice_index)
    }

    /// 前进一张切片. 已在最后一张时返回 `false`.
    pub fn next_slice(&mut self) -> bool {
        self.set_slice_index(self.slice_index + 1)
    }

    /// 后退一张切片. 已在第一张时返回 `false`.
    pub fn previous_slice(&mut self) -> bool {
        match self.slice_index.checked_sub(1) {
            Some(i) => self.set_slice_index(i),
            None => false,
        }
    }

    /// 跳转到第 `index` 张切片. 越界或没有加载序列时返回 `false`.
    pub fn set_slice_index(&mut self, index: usize) -> bool {
        if index < self.slice_count() {
            self.slice_index = index;
            true
        } else {
            false
        }
    }

    /* ---------- 分段 ---------- */

    /// 当前分段方案.
    #[inline]
    pub fn scheme(&self) -> SegmentScheme {
        self.scheme
    }

    /// 切换分段方案. 方案改变时清空全部 ROI 并回到第 1 段, 返回 `true`.
    pub fn set_scheme(&mut self, scheme: SegmentScheme) -> bool {
        if scheme == self.scheme {
            return false;
        }
        log::info!("分段方案 {} -> {scheme}, 清空全部 ROI", self.scheme);
        self.scheme = scheme;
        self.segment = 1;
        self.store.clear_all();
        true
    }

    /// 当前段的 1-based 索引与标签.
    pub fn current_segment(&self) -> (u32, &'static str) {
        (self.segment, self.scheme.label_of(self.segment).unwrap_or("?"))
    }

    /// 选择当前段. 索引不属于当前方案时返回 `false`.
    pub fn set_current_segment(&mut self, index: u32) -> bool {
        if self.scheme.label_of(index).is_some() {
            self.segment = index;
            true
        } else {
            false
        }
    }

    /* ---------- ROI ---------- */

    /// 在当前切片上为当前段添加 ROI.
    ///
    /// 中心不在 `[0, 1]` 内, 半径小于配置的最小半径, 或者没有加载序列时返回 `false`.
    /// 同一序列中该段已有的 ROI 会被替换.
    pub fn add_roi(&mut self, center_x: f64, center_y: f64, radius: f64) -> bool {
        let Some(key) = self.active.as_deref() else {
            return false;
        };
        let Some(slice) = self.provider.slice(key, self.slice_index) else {
            return false;
        };
        let (index, label) = self.current_segment();
        let provenance = self.provider.provenance(key).cloned().unwrap_or_default();
        let roi = Roi::from_display(label, index, key, slice, provenance, center_x, center_y, radius);
        if !roi.is_acceptable(self.config.min_radius) {
            log::debug!("忽略 ROI ({center_x:.4}, {center_y:.4}), 半径 {radius:.4}");
            return false;
        }
        log::debug!("段 {label} 添加 ROI 于切片 {}", self.slice_index);
        self.store.add(roi)
    }

    /// 删除当前切片上最后添加的 ROI.
    pub fn delete_last_roi(&mut self) -> Option<Roi> {
        let key = self.active.as_deref()?;
        self.store.delete_last_on_slice(key, self.slice_index)
    }

    /// 删除当前切片上的全部 ROI, 返回删除的个数.
    pub fn clear_slice_rois(&mut self) -> usize {
        match self.active.as_deref() {
            Some(key) => self.store.clear_slice(key, self.slice_index),
            None => 0,
        }
    }

    /// 删除全部 ROI.
    pub fn clear_all_rois(&mut self) -> bool {
        self.store.clear_all()
    }

    /// 给定序列给定切片上的 ROI.
    #[inline]
    pub fn query(&self, series_key: &str, slice_index: usize) -> Vec<&Roi> {
        self.store.query(series_key, slice_index)
    }

    /// 当前切片上的 ROI.
    pub fn rois_for_current_slice(&self) -> Vec<&Roi> {
        match self.active.as_deref() {
            Some(key) => self.store.query(key, self.slice_index),
            None => Vec::new(),
        }
    }

    /* ---------- 统计 ---------- */

    /// 当前切片的统计表. 没有统计量的 ROI 不出现.
    pub fn statistics_rows_for_current_slice(&self) -> Vec<StatisticsRow> {
        self.rois_for_current_slice()
            .into_iter()
            .filter_map(|r| {
                let s = r.stats?;
                Some(StatisticsRow {
                    label: r.segment_label.clone(),
                    mean: s.mean,
                    median: s.median,
                    min: s.min,
                    max: s.max,
                })
            })
            .collect()
    }

    /// 全部具有统计量的 ROI 的详细统计表, 按存储顺序排列.
    pub fn detailed_statistics(&self) -> Vec<DetailedStatistics> {
        self.store
            .iter()
            .filter_map(|r| {
                Some(DetailedStatistics {
                    label: r.segment_label.clone(),
                    series_key: r.series_key.clone(),
                    slice_number: r.slice_index + 1,
                    center_x: r.center_x,
                    center_y: r.center_y,
                    radius: r.radius,
                    stats: r.stats?,
                })
            })
            .collect()
    }

    /// 以所在切片的当前像素重新计算统计量. 切片不可读时保留原值.
    fn refreshed(&self, roi: &Roi) -> Roi {
        let mut roi = roi.clone();
        if let Some(slice) = self.provider.slice(&roi.series_key, roi.slice_index) {
            roi.stats = roi_statistics(slice.view(), roi.center_x, roi.center_y, roi.radius);
        }
        roi
    }

    /* ---------- 导入导出 ---------- */

    /// 导出全部 ROI 到 `path`, 缺少扩展名时追加 `.csv`. 统计量在导出时重新计算.
    ///
    /// 存储为空时不写文件, 返回 `Ok(None)`; 否则返回实际写入的路径.
    pub fn export<Q: AsRef<Path>>(&self, path: Q) -> CsvResult<Option<PathBuf>> {
        if self.store.is_empty() {
            log::warn!("没有 ROI 可导出");
            return Ok(None);
        }
        let mut path = path.as_ref().to_path_buf();
        let has_ext = path
            .extension()
            .map_or(false, |e| e.eq_ignore_ascii_case(CSV_EXTENSION));
        if !has_ext {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(".");
            name.push(CSV_EXTENSION);
            path.set_file_name(name);
        }
        let rois: Vec<Roi> = self.store.iter().map(|r| self.refreshed(r)).collect();
        csv::export_to_path(&path, &rois)?;
        Ok(Some(path))
    }

    /// 导出到配置的导出目录, 文件名为 `{当前序列目录名}_ROIs.csv`.
    pub fn export_default(&self) -> CsvResult<Option<PathBuf>> {
        let name = self
            .active
            .as_deref()
            .and_then(|k| Path::new(k).file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "series".to_string());
        fs::create_dir_all(&self.config.export_dir)?;
        self.export(self.config.export_dir.join(format!("{name}_ROIs.csv")))
    }

    /// 从 `path` 导入 ROI.
    ///
    /// 只接受 `Series UID` 与当前序列一致 (没有加载序列时不检查),
    /// 且标签属于当前方案的行; 导入的 ROI 归属当前序列. 文件可读且表头完整时,
    /// 原有 ROI 全部被替换, 只触发一次通知.
    pub fn import<Q: AsRef<Path>>(&mut self, path: Q) -> CsvResult<ImportReport> {
        let key = self.active.as_deref();
        let uid = key
            .and_then(|k| self.provider.provenance(k))
            .map(|p| p.series_uid.as_str());
        let filter = ImportFilter {
            series_uid: uid,
            series_key: key,
            scheme: self.scheme,
        };
        let imported = csv::import_from_path(path, &filter)?;
        let loaded = self.store.replace_all(imported.rois);
        Ok(ImportReport {
            loaded,
            skipped: imported.skipped,
        })
    }

    /* ---------- 配准 ---------- */

    /// 把 `source` 序列的 ROI 复制到 `target` (默认为当前序列).
    ///
    /// `max_distance_mm` 为 `None` 时使用配置的门限.
    pub fn copy_rois_from_series(
        &mut self,
        source: &str,
        target: Option<&str>,
        max_distance_mm: Option<f64>,
    ) -> RegistrationReport {
        let Some(target) = target.or(self.active.as_deref()).map(str::to_string) else {
            log::warn!("没有目标序列");
            return RegistrationReport::default();
        };
        register_rois(
            &mut self.store,
            &self.provider,
            source,
            &target,
            self.scheme,
            max_distance_mm.unwrap_or(self.config.max_distance_mm),
        )
    }
}
