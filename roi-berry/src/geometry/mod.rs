//! 空间坐标模型: 切片平面分类, 以及归一化 / 像素 / 物理坐标之间的换算.

pub mod orientation;
pub mod transform;

pub use orientation::{classify, Orientation, OrientationError, OrientationResult};
pub use transform::{
    normalized_to_pixel, pixel_to_normalized, pixel_value_at, AnatomicalPoint, PixelSpacing,
    SliceGeometry,
};
