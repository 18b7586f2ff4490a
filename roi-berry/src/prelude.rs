//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Vec3};

pub use crate::geometry::{
    classify, normalized_to_pixel, pixel_to_normalized, pixel_value_at, AnatomicalPoint,
    Orientation, OrientationError, PixelSpacing, SliceGeometry,
};
pub use crate::provider::{Series, SeriesRegistry, Slice, SliceMeta, SliceProvider};
pub use crate::roi::{Provenance, Roi, RoiStore};
pub use crate::segment::SegmentScheme;
pub use crate::stats::{roi_statistics, RoiStatistics};

pub use crate::registration::{match_slices, register_rois, RegistrationReport};
pub use crate::session::RoiSession;

pub use crate::config::{home_dataset_dir_with, RoiConfig};
pub use crate::consts::{DEFAULT_MAX_DISTANCE_MM, MIN_ROI_RADIUS, NOT_AVAILABLE};
pub use crate::csv::{CsvError, ImportFilter};
pub use crate::directory::{scan_directory, DirectoryNode};
