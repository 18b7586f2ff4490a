//! 肝脏分段方案.
//!
//! 每个 ROI 标记一个肝段. 段索引从 1 开始, 与方案中标签的位置一一对应.

use std::fmt::{self, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Couinaud 九段方案的标签, 按段索引 1..=9 排列.
pub const NINE_SEGMENT_LABELS: [&str; 9] = ["1", "2", "3", "4a", "4b", "5", "6", "7", "8"];

/// 四段方案的标签, 按段索引 1..=4 排列.
pub const FOUR_SEGMENT_LABELS: [&str; 4] = [
    "Left Lateral",
    "Left Medial",
    "Right Anterior",
    "Right Posterior",
];

/// 四段方案在图像上显示用的短标签.
const FOUR_SEGMENT_SHORT: [&str; 4] = ["LL", "LM", "RA", "RP"];

/// 分段方案.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SegmentScheme {
    /// 九段 (1, 2, 3, 4a, 4b, 5, 6, 7, 8).
    #[default]
    NineSegment,

    /// 四段 (左外, 左内, 右前, 右后).
    FourSegment,
}

impl SegmentScheme {
    /// 方案的全部标签, 按段索引排列.
    #[inline]
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Self::NineSegment => &NINE_SEGMENT_LABELS,
            Self::FourSegment => &FOUR_SEGMENT_LABELS,
        }
    }

    /// 段的个数.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.labels().len()
    }

    /// 1-based 段索引对应的标签. 越界时返回 `None`.
    #[inline]
    pub fn label_of(&self, index: u32) -> Option<&'static str> {
        let i = (index as usize).checked_sub(1)?;
        self.labels().get(i).copied()
    }

    /// 标签对应的 1-based 段索引. 标签不属于本方案时返回 `None`.
    #[inline]
    pub fn index_of(&self, label: &str) -> Option<u32> {
        self.labels()
            .iter()
            .position(|&l| l == label)
            .map(|i| i as u32 + 1)
    }

    /// 标签是否属于本方案.
    #[inline]
    pub fn contains(&self, label: &str) -> bool {
        self.index_of(label).is_some()
    }

    /// 显示用的短标签. 九段方案的标签本身已足够短, 原样返回;
    /// 不属于本方案的标签也原样返回.
    pub fn short_label<'a>(&self, label: &'a str) -> &'a str {
        match self {
            Self::NineSegment => label,
            Self::FourSegment => self
                .index_of(label)
                .map(|i| FOUR_SEGMENT_SHORT[i as usize - 1])
                .unwrap_or(label),
        }
    }
}

impl fmt::Display for SegmentScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NineSegment => f.write_str("9-segment"),
            Self::FourSegment => f.write_str("4-segment"),
        }
    }
}

impl FromStr for SegmentScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "9-segment" | "9" => Ok(Self::NineSegment),
            "4-segment" | "4" => Ok(Self::FourSegment),
            other => Err(format!("未知分段方案 `{other}`")),
        }
    }
}
