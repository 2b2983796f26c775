//! Images: pixel layout, profile, pixel storage and the accessor that reads it.
//!
//! Three coordinate spaces are in use:
//!
//! - **ROI** units, normalized so that the image width is `1.0` on both axes;
//! - **sample** units, where every channel of every pixel is one unit in x;
//! - **pixel** units.
//!
//! The converters on [`Image`] move rectangles between them and round at the
//! sample and pixel boundaries.

pub mod accessor;
pub mod fill;
pub mod layout;
pub mod ppm;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::array2d::{Array2d, ArrayHandle, Block};
use crate::error::ImageError;
use crate::profile::ProfileHandle;
use crate::rect::Rectangle;

pub use accessor::{
    AccessorKind, ContinuousAccessor, PixelAccessor, PixelProvider, PlanarAccessor,
    ProviderAccessor,
};
pub use fill::AllocateMethod;
pub use layout::{ChannelType, MaskInput, PixelLayout, PixelMask};
pub use ppm::{PpmFormat, PpmSummary};

/// Resolution used until a caller sets one, in pixels per inch.
pub const DEFAULT_RESOLUTION: f64 = 72.0;

/// Free-form image metadata.
pub type Tags = BTreeMap<String, serde_json::Value>;

/// Shared handle to an image.
pub type ImageHandle = Arc<RwLock<Image>>;

/// Where an image's samples live.
#[derive(Debug, Clone)]
pub enum PixelData {
    None,
    /// Samples in an array of `width * channels` by `height` samples.
    Owned(ArrayHandle),
    External(Arc<dyn PixelProvider>),
}

/// Fields replaced by [`Image::set_critical`]; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct CriticalUpdate {
    pub layout: Option<PixelLayout>,
    pub profile: Option<ProfileHandle>,
    pub tags: Option<Tags>,
    pub width: Option<usize>,
    pub height: Option<usize>,
}

#[derive(Debug)]
pub struct Image {
    width: usize,
    height: usize,
    layout: PixelLayout,
    channel_types: Vec<ChannelType>,
    profile: ProfileHandle,
    resolution: (f64, f64),
    accessor: Option<Arc<dyn PixelAccessor>>,
    pixel_data: PixelData,
    tags: Tags,
    mask: PixelMask,
}

impl Image {
    /// Create an image around `pixels`, or over fresh zeroed storage.
    ///
    /// `pixels` is strided as `height` rows of `width * channels` samples and
    /// stays shared with the caller.
    pub fn create(
        pixels: Option<Block>,
        width: usize,
        height: usize,
        layout: PixelLayout,
        profile: ProfileHandle,
    ) -> Result<Self, ImageError> {
        let samples = line_samples(width, &layout)?;
        let array = match pixels {
            Some(block) => Array2d::from_block(block, samples, height, layout.data_type)?,
            None => Array2d::new(samples, height, layout.data_type)?,
        };
        Self::with_data(
            PixelData::Owned(ArrayHandle::new(array)),
            width,
            height,
            layout,
            profile,
        )
    }

    /// Create an image whose samples come from `provider`.
    pub fn with_provider(
        provider: Arc<dyn PixelProvider>,
        width: usize,
        height: usize,
        layout: PixelLayout,
        profile: ProfileHandle,
    ) -> Result<Self, ImageError> {
        Self::with_data(PixelData::External(provider), width, height, layout, profile)
    }

    fn with_data(
        pixel_data: PixelData,
        width: usize,
        height: usize,
        layout: PixelLayout,
        profile: ProfileHandle,
    ) -> Result<Self, ImageError> {
        check_profile(&layout, &profile)?;
        let channel_types = layout::default_channel_types(&layout, profile.channel_count());
        let accessor = accessor::default_accessor(&pixel_data, &layout);
        let mask = derive_mask(
            &layout,
            width,
            height,
            (DEFAULT_RESOLUTION, DEFAULT_RESOLUTION),
            &profile,
            &channel_types,
        )?;
        let image = Self {
            width,
            height,
            layout,
            channel_types,
            profile,
            resolution: (DEFAULT_RESOLUTION, DEFAULT_RESOLUTION),
            accessor,
            pixel_data,
            tags: Tags::new(),
            mask,
        };
        image.check_storage()?;
        Ok(image)
    }

    pub fn into_handle(self) -> ImageHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn profile(&self) -> &ProfileHandle {
        &self.profile
    }

    pub fn channel_count(&self) -> usize {
        usize::from(self.layout.channels)
    }

    /// Color channels described by the profile that the layout can hold.
    pub fn color_channel_count(&self) -> usize {
        let available = self.channel_count() - usize::from(self.layout.color_offset);
        self.profile.channel_count().min(available)
    }

    pub fn channel_types(&self) -> &[ChannelType] {
        &self.channel_types
    }

    pub fn set_channel_types(&mut self, types: Vec<ChannelType>) -> Result<(), ImageError> {
        if types.len() != self.channel_count() {
            return Err(ImageError::InvalidLayout(format!(
                "{} channel types for {} channels",
                types.len(),
                self.channel_count()
            )));
        }
        self.channel_types = types;
        self.remask()
    }

    pub fn resolution(&self) -> (f64, f64) {
        self.resolution
    }

    pub fn set_resolution(&mut self, x: f64, y: f64) -> Result<(), ImageError> {
        self.resolution = (x, y);
        self.remask()
    }

    pub fn mask(&self) -> &PixelMask {
        &self.mask
    }

    /// Content identity, see [`PixelMask::identity`].
    pub fn identity(&self) -> &str {
        &self.mask.identity
    }

    pub fn pixel_data(&self) -> &PixelData {
        &self.pixel_data
    }

    pub fn accessor(&self) -> Option<&Arc<dyn PixelAccessor>> {
        self.accessor.as_ref()
    }

    /// The image's own array, if its samples live in one.
    pub fn array(&self) -> Option<&ArrayHandle> {
        match &self.pixel_data {
            PixelData::Owned(array) => Some(array),
            _ => None,
        }
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&serde_json::Value> {
        self.tags.get(key)
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.tags.insert(key.into(), value);
    }

    pub fn remove_tag(&mut self, key: &str) -> Option<serde_json::Value> {
        self.tags.remove(key)
    }

    /// Install new pixel data with `accessor`, or the default accessor for it.
    pub fn set_data(
        &mut self,
        pixel_data: PixelData,
        accessor: Option<Arc<dyn PixelAccessor>>,
    ) -> Result<(), ImageError> {
        let previous = std::mem::replace(&mut self.pixel_data, pixel_data);
        if let Err(e) = self.check_storage() {
            self.pixel_data = previous;
            return Err(e);
        }
        self.accessor = accessor.or_else(|| accessor::default_accessor(&self.pixel_data, &self.layout));
        Ok(())
    }

    /// Replace layout, profile, tags or geometry in place.
    ///
    /// The mask and identity are derived again. When the existing storage
    /// cannot hold the new geometry, fresh storage is allocated together with
    /// the default accessor. On error the image is left unchanged.
    pub fn set_critical(&mut self, update: CriticalUpdate) -> Result<(), ImageError> {
        let layout = update.layout.unwrap_or(self.layout);
        layout.validate()?;
        let profile = update.profile.unwrap_or_else(|| self.profile.clone());
        check_profile(&layout, &profile)?;
        let width = update.width.unwrap_or(self.width);
        let height = update.height.unwrap_or(self.height);

        let semantics_changed =
            layout != self.layout || profile.channel_count() != self.profile.channel_count();
        let channel_types = if semantics_changed {
            layout::default_channel_types(&layout, profile.channel_count())
        } else {
            self.channel_types.clone()
        };
        let mask = derive_mask(&layout, width, height, self.resolution, &profile, &channel_types)?;

        let fits = match &self.pixel_data {
            PixelData::Owned(array) => {
                let array = array.read();
                array.data_type() == layout.data_type
                    && array.width() >= mask.line_stride
                    && array.height() >= height
            }
            PixelData::External(_) => true,
            PixelData::None => false,
        };
        let pixel_data = if width > 0 && height > 0 && !fits {
            tracing::debug!(
                "allocating {width}x{height} {} storage for image",
                layout.data_type
            );
            let array = Array2d::new(mask.line_stride, height, layout.data_type)?;
            Some(PixelData::Owned(ArrayHandle::new(array)))
        } else {
            None
        };

        self.layout = layout;
        self.profile = profile;
        self.width = width;
        self.height = height;
        self.channel_types = channel_types;
        self.mask = mask;
        if let Some(tags) = update.tags {
            self.tags = tags;
        }
        if let Some(pixel_data) = pixel_data {
            self.pixel_data = pixel_data;
        }

        let default = accessor::default_accessor(&self.pixel_data, &self.layout);
        let matches = match (&self.accessor, &default) {
            (Some(current), Some(default)) => current.kind() == default.kind(),
            (None, None) => true,
            _ => false,
        };
        if !matches {
            self.accessor = default;
        }
        Ok(())
    }

    fn remask(&mut self) -> Result<(), ImageError> {
        self.mask = derive_mask(
            &self.layout,
            self.width,
            self.height,
            self.resolution,
            &self.profile,
            &self.channel_types,
        )?;
        Ok(())
    }

    /// Owned storage must hold `width * channels` by `height` samples of the
    /// layout's data type.
    fn check_storage(&self) -> Result<(), ImageError> {
        match &self.pixel_data {
            PixelData::None if self.width > 0 && self.height > 0 => Err(ImageError::NoPixelData),
            PixelData::None | PixelData::External(_) => Ok(()),
            PixelData::Owned(array) => {
                let array = array.read();
                if array.data_type() != self.layout.data_type {
                    return Err(ImageError::TypeMismatch {
                        expected: self.layout.data_type,
                        actual: array.data_type(),
                    });
                }
                if array.width() < self.width * self.channel_count() || array.height() < self.height
                {
                    return Err(ImageError::ArrayTooSmall {
                        region: self.pixel_bounds(),
                        width: array.width(),
                        height: array.height(),
                    });
                }
                Ok(())
            }
        }
    }

    /// The whole image in pixel units.
    pub fn pixel_bounds(&self) -> Rectangle {
        Rectangle::new(0.0, 0.0, self.width as f64, self.height as f64)
    }

    /// The whole image in sample units.
    pub fn sample_bounds(&self) -> Rectangle {
        Rectangle::new(
            0.0,
            0.0,
            (self.width * self.channel_count()) as f64,
            self.height as f64,
        )
    }

    pub fn roi_to_samples(&self, roi: &Rectangle) -> Rectangle {
        let channels = self.channel_count() as f64;
        let mut r = roi.scaled(self.width as f64);
        r.x *= channels;
        r.width *= channels;
        r.rounded()
    }

    pub fn samples_to_roi(&self, samples: &Rectangle) -> Rectangle {
        let channels = self.channel_count() as f64;
        let mut r = *samples;
        r.x /= channels;
        r.width /= channels;
        if self.width > 0 {
            r.scale(1.0 / self.width as f64);
        }
        r
    }

    pub fn samples_to_pixels(&self, samples: &Rectangle) -> Rectangle {
        let channels = self.channel_count() as f64;
        let mut r = *samples;
        r.x /= channels;
        r.width /= channels;
        r.rounded()
    }

    pub fn pixels_to_samples(&self, pixels: &Rectangle) -> Rectangle {
        let channels = self.channel_count() as f64;
        let mut r = *pixels;
        r.x *= channels;
        r.width *= channels;
        r.rounded()
    }

    pub fn roi_to_pixels(&self, roi: &Rectangle) -> Rectangle {
        roi.scaled(self.width as f64).rounded()
    }

    pub fn pixels_to_roi(&self, pixels: &Rectangle) -> Rectangle {
        if self.width == 0 {
            return *pixels;
        }
        pixels.scaled(1.0 / self.width as f64)
    }

    fn accessor_or_err(&self) -> Result<&Arc<dyn PixelAccessor>, ImageError> {
        self.accessor.as_ref().ok_or(ImageError::NoPixelData)
    }

    pub fn get_point(&self, x: usize, y: usize) -> Result<Vec<u8>, ImageError> {
        self.accessor_or_err()?.get_point(self, x, y)
    }

    pub fn get_line(&self, y: usize) -> Result<Vec<u8>, ImageError> {
        self.accessor_or_err()?.get_line(self, y)
    }

    pub fn get_tile(&self, tile: &Rectangle) -> Result<Vec<u8>, ImageError> {
        self.accessor_or_err()?.get_tile(self, tile)
    }

    pub fn set_point(&self, x: usize, y: usize, pixel: &[u8]) -> Result<(), ImageError> {
        self.accessor_or_err()?.set_point(self, x, y, pixel)
    }

    /// Overwrite scan-line `y` starting at sample `x`.
    pub fn set_line(&self, x: usize, y: usize, bytes: &[u8]) -> Result<(), ImageError> {
        self.accessor_or_err()?.set_line(self, x, y, bytes)
    }

    pub fn set_tile(&self, tile: &Rectangle, bytes: &[u8]) -> Result<(), ImageError> {
        self.accessor_or_err()?.set_tile(self, tile, bytes)
    }
}

fn check_profile(layout: &PixelLayout, profile: &ProfileHandle) -> Result<(), ImageError> {
    let available = usize::from(layout.channels) - usize::from(layout.color_offset.min(layout.channels));
    if profile.channel_count() > available {
        return Err(ImageError::InvalidLayout(format!(
            "profile {} needs {} channels, layout has {available}",
            profile.name(),
            profile.channel_count()
        )));
    }
    Ok(())
}

/// Samples per scan-line.
fn line_samples(width: usize, layout: &PixelLayout) -> Result<usize, ImageError> {
    width
        .checked_mul(usize::from(layout.channels))
        .filter(|samples| samples.checked_mul(layout.data_type.size()).is_some())
        .ok_or_else(|| {
            ImageError::InvalidLayout(format!(
                "{width} pixels of {} channels overflow a scan-line",
                layout.channels
            ))
        })
}

fn derive_mask(
    layout: &PixelLayout,
    width: usize,
    height: usize,
    resolution: (f64, f64),
    profile: &ProfileHandle,
    channel_types: &[ChannelType],
) -> Result<PixelMask, ImageError> {
    line_samples(width, layout)?;
    let profile_name = profile.name();
    PixelMask::combine(
        layout,
        &MaskInput {
            width,
            height,
            resolution,
            profile_name: &profile_name,
            color_channels: profile.channel_count(),
            channel_types,
        },
    )
}
