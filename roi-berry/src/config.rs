//! 运行参数.
//!
//! 每个参数都可以由环境变量覆盖:
//!
//! | 环境变量 | 字段 | 默认值 |
//! |---|---|---|
//! | `ROI_MAX_DISTANCE_MM` | [`RoiConfig::max_distance_mm`] | `5.0` |
//! | `ROI_MIN_RADIUS` | [`RoiConfig::min_radius`] | `0.01` |
//! | `ROI_EXPORT_DIR` | [`RoiConfig::export_dir`] | `$HOME/dataset/roi` |

use std::env;
use std::path::{Path, PathBuf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_MAX_DISTANCE_MM, MIN_ROI_RADIUS};

/// 配准距离门限的环境变量名.
pub const ENV_MAX_DISTANCE_MM: &str = "ROI_MAX_DISTANCE_MM";
/// 最小半径的环境变量名.
pub const ENV_MIN_RADIUS: &str = "ROI_MIN_RADIUS";
/// 导出目录的环境变量名.
pub const ENV_EXPORT_DIR: &str = "ROI_EXPORT_DIR";

/// 配置错误.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// 环境变量的值无法解析, 或不在合法范围内.
    #[error("环境变量 `{key}` 的值 `{value}` 非法")]
    InvalidValue {
        /// 变量名.
        key: &'static str,
        /// 原始值.
        value: String,
    },
}

/// 配置结果.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 运行参数.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoiConfig {
    /// ROI 迁移的切片距离门限 (mm), 含.
    pub max_distance_mm: f64,
    /// 显示交互创建 ROI 的最小归一化半径.
    pub min_radius: f64,
    /// 默认导出目录.
    pub export_dir: PathBuf,
}

impl Default for RoiConfig {
    fn default() -> Self {
        Self {
            max_distance_mm: DEFAULT_MAX_DISTANCE_MM,
            min_radius: MIN_ROI_RADIUS,
            export_dir: home_dataset_dir_with(["roi"])
                .unwrap_or_else(|| PathBuf::from("dataset").join("roi")),
        }
    }
}

impl RoiConfig {
    /// 从进程环境变量读取. 未设置的变量取默认值.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 以 `lookup` 代替环境变量读取. 空字符串视为未设置.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(v) = get(ENV_MAX_DISTANCE_MM) {
            config.max_distance_mm = parse_non_negative(ENV_MAX_DISTANCE_MM, &v)?;
        }
        if let Some(v) = get(ENV_MIN_RADIUS) {
            config.min_radius = parse_non_negative(ENV_MIN_RADIUS, &v)?;
        }
        if let Some(v) = get(ENV_EXPORT_DIR) {
            config.export_dir = PathBuf::from(v);
        }
        Ok(config)
    }
}

fn parse_non_negative(key: &'static str, value: &str) -> ConfigResult<f64> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}
