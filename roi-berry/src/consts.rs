//! 通用常量.

/// ROI 迁移时, 源切片与目标切片沿比较轴允许的最大距离 (mm).
pub const DEFAULT_MAX_DISTANCE_MM: f64 = 5.0;

/// 通过显示交互创建 ROI 时, 允许的最小归一化半径. 用于过滤误点击.
pub const MIN_ROI_RADIUS: f64 = 0.01;

/// 缺失值在表格与 CSV 中的占位符.
pub const NOT_AVAILABLE: &str = "N/A";

/// 像素间距缺失或非法时的默认值 (mm/px).
pub const DEFAULT_PIXEL_SPACING_MM: f64 = 1.0;

/// 导出文件的扩展名.
pub const CSV_EXTENSION: &str = "csv";

/// 被视为 DICOM 文件的扩展名.
pub const DICOM_EXTENSIONS: [&str; 2] = ["dcm", "DCM"];
