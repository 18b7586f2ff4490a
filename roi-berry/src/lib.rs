#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 在体数据序列 (MR/CT) 的切片上标注圆形 ROI, 计算 ROI 像素统计量,
//! 并按照解剖学位置 (而不是切片索引) 在两个独立采集的序列之间迁移 ROI.
//!
//! 该 crate 只负责空间坐标模型与 ROI 数据本身. 图像文件读取, 渲染, 窗宽窗位,
//! 以及所有 UI 事件都由外部协作者完成, 通过 [`provider::SliceProvider`] 接入.
//!
//! # 注意
//!
//! 1. 该 crate 不会因为用户数据而 panic. 缺失的元数据以宽松默认值替代,
//!   越界操作返回 `false`/`None`, 被跳过的数据会通过 `log` 输出原因.
//! 2. 只支持三个标准解剖平面. 斜切面 (oblique) 会被显式拒绝.
//!
//! # 开发计划
//!
//! ### 切片平面分类 ✅
//!
//! 由方向余弦叉乘得到切片法向量, 取整 (半数取偶) 后定位唯一的轴.
//!
//! 实现位于 `roi-berry/src/geometry/orientation.rs`.
//!
//! ### 归一化坐标 / 像素坐标 / 物理坐标换算 ✅
//!
//! 分平面换算. 物理面积 (mm²) 是跨序列可移植的量, 归一化半径不是.
//!
//! 实现位于 `roi-berry/src/geometry/transform.rs`.
//!
//! ### ROI 存储 ✅
//!
//! `(segment_index, series_key)` 唯一; 同步观察者通知.
//!
//! 实现位于 `roi-berry/src/roi`.
//!
//! ### ROI 统计量 ✅
//!
//! 圆盘掩膜上的均值, 中位数, 最值与像素个数. 使用原始像素值, 与窗口无关.
//!
//! 实现位于 `roi-berry/src/stats.rs`.
//!
//! ### 跨序列 ROI 配准 ✅
//!
//! 按目标切片平面选择比较轴, 在距离门限内寻找最近切片.
//!
//! 实现位于 `roi-berry/src/registration.rs`.
//!
//! ### CSV 导入导出 ✅
//!
//! 实现位于 `roi-berry/src/csv.rs`.
//!
//! ### 会话 ✅
//!
//! 面向 UI 层的统一入口, 单写者持有 ROI 存储.
//!
//! 实现位于 `roi-berry/src/session.rs`.

/// 二维索引 `(行, 列)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 三维实数向量. 在病人坐标系下依次为 LR, AP, SI 分量.
pub type Vec3 = [f64; 3];

pub mod consts;
pub mod config;
pub mod csv;
pub mod directory;
pub mod geometry;
pub mod provider;
pub mod registration;
pub mod roi;
pub mod segment;
pub mod session;
pub mod stats;

pub mod prelude;

pub use geometry::{AnatomicalPoint, Orientation, OrientationError, PixelSpacing, SliceGeometry};
pub use provider::{Series, SeriesRegistry, Slice, SliceMeta, SliceProvider};
pub use roi::{Provenance, Roi, RoiStore};
pub use segment::SegmentScheme;
pub use session::RoiSession;
pub use stats::RoiStatistics;
