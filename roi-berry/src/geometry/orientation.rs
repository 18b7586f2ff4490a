//! 切片的解剖学平面分类.
//!
//! 输入为 DICOM `ImageOrientationPatient` 形式的 6 维向量: 行方向余弦 ⊕ 列方向余弦.
//! 两者的叉乘即切片法向量. 对标准平面而言, 法向量有且仅有一个分量的绝对值约为 1.

use std::fmt::{self, Formatter};
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::Vec3;

/// 切片所在的标准解剖平面.
///
/// 数值编码 (见 [`Orientation::code`]) 依次为 1, 2, 3, 与法向量的主轴 0, 1, 2 对应.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Orientation {
    /// 矢状面. 法向量沿 LR 轴.
    Sagittal,

    /// 冠状面. 法向量沿 AP 轴.
    Coronal,

    /// 横断面 (轴位). 法向量沿 SI 轴.
    Axial,
}

/// 平面分类错误.
#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum OrientationError {
    /// 切片没有方向信息.
    #[error("切片缺少方向信息")]
    Unavailable,

    /// 法向量不与任何坐标轴对齐 (斜切面), 或方向余弦本身退化.
    /// 参数为 `|法向量|` 的三个分量.
    #[error("不支持的斜切面, |normal| = {0:?}")]
    Oblique(Vec3),
}

/// 平面分类结果.
pub type OrientationResult<T> = Result<T, OrientationError>;

impl Orientation {
    /// 全部平面, 按编码顺序排列.
    pub const ALL: [Orientation; 3] = [Self::Sagittal, Self::Coronal, Self::Axial];

    /// 1-based 编码: 矢状面 1, 冠状面 2, 横断面 3.
    #[inline]
    pub const fn code(&self) -> u8 {
        match self {
            Self::Sagittal => 1,
            Self::Coronal => 2,
            Self::Axial => 3,
        }
    }

    /// 由 1-based 编码构建. 非法编码返回 `None`.
    #[inline]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Sagittal),
            2 => Some(Self::Coronal),
            3 => Some(Self::Axial),
            _ => None,
        }
    }

    /// 该平面法向量所在的病人坐标轴 (0: LR, 1: AP, 2: SI).
    ///
    /// 配准时沿该轴比较切片位置.
    #[inline]
    pub const fn axis(&self) -> usize {
        self.code() as usize - 1
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Sagittal => "Sagittal",
            Self::Coronal => "Coronal",
            Self::Axial => "Axial",
        };
        f.write_str(s)
    }
}

/// 接受数值编码 (`"1"`, `"2"`, `"3"`) 或名称 (大小写不敏感).
impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(o) = s.parse::<u8>().ok().and_then(Self::from_code) {
            return Ok(o);
        }
        Self::ALL
            .into_iter()
            .find(|o| o.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("未知切片方向 `{s}`"))
    }
}

#[inline]
fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 根据方向余弦对切片进行平面分类.
///
/// 算法: 行、列方向余弦叉乘得到法向量, 各分量取绝对值后取整 (恰为 0.5 时取偶数, 即 0),
/// 唯一等于 1 (其余等于 0) 的分量下标决定平面.
///
/// # 返回值
///
/// - `cosines` 为 `None` 时返回 `Err(OrientationError::Unavailable)`;
/// - 没有分量, 或有多于一个分量取整为 1 (斜切面), 或存在非有限值时,
///   返回 `Err(OrientationError::Oblique(*))`. 我们不会像 "取第一个匹配" 那样静默选择平面;
/// - 其他情况返回对应平面.
pub fn classify(cosines: Option<&[f64; 6]>) -> OrientationResult<Orientation> {
    let cosines = cosines.ok_or(OrientationError::Unavailable)?;
    let row = [cosines[0], cosines[1], cosines[2]];
    let col = [cosines[3], cosines[4], cosines[5]];
    let normal = cross(&row, &col).map(f64::abs);

    if normal.iter().any(|v| !v.is_finite()) {
        return Err(OrientationError::Oblique(normal));
    }

    let rounded = normal.map(f64::round_ties_even);
    let mut found = None;
    for (axis, &v) in rounded.iter().enumerate() {
        if v == 1.0 {
            if found.is_some() {
                return Err(OrientationError::Oblique(normal));
            }
            found = Some(axis);
        } else if v != 0.0 {
            return Err(OrientationError::Oblique(normal));
        }
    }

    match found {
        Some(axis) => Ok(Orientation::ALL[axis]),
        None => Err(OrientationError::Oblique(normal)),
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, Orientation, OrientationError};

    #[test]
    fn test_canonical_planes() {
        let axial = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let coronal = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let sagittal = [0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

        assert_eq!(classify(Some(&axial)), Ok(Orientation::Axial));
        assert_eq!(classify(Some(&coronal)), Ok(Orientation::Coronal));
        assert_eq!(classify(Some(&sagittal)), Ok(Orientation::Sagittal));
    }

    #[test]
    fn test_flipped_cosines() {
        // 负方向余弦 (例如 feet-first 采集) 不影响分类.
        let coronal = [1.0, 0.0, 0.0, 0.0, 0.0, -1.0];
        assert_eq!(classify(Some(&coronal)), Ok(Orientation::Coronal));
        let axial = [-1.0, 0.0, 0.0, 0.0, -1.0, 0.0];
        assert_eq!(classify(Some(&axial)), Ok(Orientation::Axial));
    }

    #[test]
    fn test_slightly_tilted_axial() {
        let t = 0.05f64;
        let axial = [1.0, 0.0, 0.0, 0.0, t.cos(), t.sin()];
        assert_eq!(classify(Some(&axial)), Ok(Orientation::Axial));
    }

    #[test]
    fn test_half_component_rounds_to_even() {
        // 倾斜 30 度: 法向量为 (0, 0.5, 0.866), 0.5 取整为 0.
        let half_sqrt3 = 3f64.sqrt() / 2.0;
        let tilted = [1.0, 0.0, 0.0, 0.0, half_sqrt3, 0.5];
        assert_eq!(classify(Some(&tilted)), Ok(Orientation::Axial));
    }

    #[test]
    fn test_missing_and_oblique() {
        assert_eq!(classify(None), Err(OrientationError::Unavailable));

        // 45 度斜切面: 两个分量都会取整为 1.
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let oblique = [1.0, 0.0, 0.0, 0.0, h, h];
        assert!(matches!(
            classify(Some(&oblique)),
            Err(OrientationError::Oblique(_))
        ));

        // 退化: 行列方向相同, 法向量为零.
        let degenerate = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        assert!(matches!(
            classify(Some(&degenerate)),
            Err(OrientationError::Oblique(_))
        ));

        let nan = [f64::NAN, 0.0, 0.0, 0.0, 1.0, 0.0];
        assert!(matches!(
            classify(Some(&nan)),
            Err(OrientationError::Oblique(_))
        ));
    }

    #[test]
    fn test_codes_and_parse() {
        for o in Orientation::ALL {
            assert_eq!(Orientation::from_code(o.code()), Some(o));
            assert_eq!(o.code().to_string().parse::<Orientation>(), Ok(o));
            assert_eq!(o.to_string().to_lowercase().parse::<Orientation>(), Ok(o));
        }
        assert_eq!(Orientation::Sagittal.axis(), 0);
        assert_eq!(Orientation::Coronal.axis(), 1);
        assert_eq!(Orientation::Axial.axis(), 2);
        assert!("4".parse::<Orientation>().is_err());
        assert!("N/A".parse::<Orientation>().is_err());
    }
}
