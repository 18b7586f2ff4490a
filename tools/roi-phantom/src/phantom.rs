//! 合成体模序列.
//!
//! 每张切片是一块暗背景上的明亮圆盘 ("肝脏"), 盘内像素值随 SI 位置缓慢变化,
//! 这样配准后的统计量能够反映目标切片的真实位置.

use ndarray::Array2;
use roi_berry::{Provenance, Series, Slice};

/// 横断面方向余弦.
pub const AXIAL: [f64; 6] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

/// 背景像素值.
pub const BACKGROUND: f32 = -100.0;

/// 肝脏在 SI = 0 处的像素值.
pub const LIVER_BASE: f32 = 60.0;

/// 归一化的肝脏半径.
pub const LIVER_RADIUS: f64 = 0.35;

/// 一个体模序列的采集参数.
#[derive(Clone, Debug)]
pub struct PhantomSpec {
    /// 序列键 (模拟序列目录).
    pub key: &'static str,
    /// 序列 UID.
    pub uid: &'static str,
    /// 行数 = 列数.
    pub size: usize,
    /// 像素间距 (mm/px).
    pub spacing: f64,
    /// 第一张切片的 SI 位置 (mm).
    pub z_start: f64,
    /// 层间距 (mm).
    pub z_step: f64,
    /// 切片数.
    pub count: usize,
}

impl PhantomSpec {
    /// 第 `i` 张切片的 SI 位置.
    #[inline]
    pub fn z_of(&self, i: usize) -> f64 {
        self.z_start + self.z_step * i as f64
    }

    /// 肝脏在 SI 位置 `z` 处的像素值.
    #[inline]
    pub fn liver_value(z: f64) -> f32 {
        LIVER_BASE + (z / 10.0) as f32
    }

    fn slice(&self, z: f64) -> Slice {
        let n = self.size as f64;
        let liver = Self::liver_value(z);
        let pixels = Array2::from_shape_fn((self.size, self.size), |(h, w)| {
            let dx = w as f64 / n - 0.5;
            let dy = h as f64 / n - 0.5;
            if dx * dx + dy * dy <= LIVER_RADIUS * LIVER_RADIUS {
                liver
            } else {
                BACKGROUND
            }
        });
        // 图像中心位于 LR = AP = 0.
        let half = self.spacing * n / 2.0;
        Slice::new(
            pixels,
            Some([-half, -half, z]),
            Some(AXIAL),
            Some([self.spacing, self.spacing]),
        )
    }

    /// 生成序列.
    pub fn build(&self) -> Series {
        let slices = (0..self.count).map(|i| self.slice(self.z_of(i))).collect();
        let provenance = Provenance {
            study_id: "PHANTOM".to_string(),
            exam_number: "0001".to_string(),
            series_id: self.key.rsplit('/').next().unwrap_or(self.key).to_string(),
            series_uid: self.uid.to_string(),
            series_path: self.key.to_string(),
        };
        Series::new(self.key, provenance, slices)
    }
}

/// 源序列: 细层厚, 高分辨率.
pub fn source_spec() -> PhantomSpec {
    PhantomSpec {
        key: "phantom/patient/study/t1_fine",
        uid: "2.25.1001",
        size: 160,
        spacing: 0.8,
        z_start: 0.0,
        z_step: 2.5,
        count: 40,
    }
}

/// 目标序列: 粗层厚, 低分辨率, SI 方向有偏移.
pub fn target_spec() -> PhantomSpec {
    PhantomSpec {
        key: "phantom/patient/study/t2_coarse",
        uid: "2.25.1002",
        size: 128,
        spacing: 1.0,
        z_start: 1.2,
        z_step: 4.0,
        count: 25,
    }
}
