//! Tinct Core: pixel buffers and images for the color conversion core.
//!
//! This crate contains region arithmetic, row-addressed sample arrays with
//! focus windowing, pixel layouts and the image abstraction with its pixel
//! accessors. No filter graph knowledge.

pub mod array2d;
pub mod data_type;
pub mod error;
pub mod image;
pub mod profile;
pub mod rect;

// Re-exports for convenience.
pub use array2d::{Array2d, ArrayHandle, Block, FocusChange, RowCopy, RowOwnership, RowRef};
pub use data_type::DataType;
pub use error::{Array2dError, ImageError, Severity};
pub use image::{
    AllocateMethod, ChannelType, CriticalUpdate, Image, ImageHandle, PixelData, PixelLayout,
    PixelMask, Tags,
};
pub use profile::{Profile, ProfileHandle, SimpleProfile};
pub use rect::{GeoField, Rectangle};
