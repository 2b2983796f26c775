//! Pixel layout codes, channel semantics and the derived pixel mask.
//!
//! A [`PixelLayout`] packs into a single `u32`:
//!
//! ```text
//! bits  0..=7   channel count
//! bits  8..=11  offset of the first color channel
//! bits 12..=15  data type code
//! bit   16      color channels stored in reverse order (BGR)
//! bit   17      planar
//! bit   18      flavor (min-is-white for single channel data)
//! bit   19      samples byte swapped relative to the host
//! ```

use serde::{Deserialize, Serialize};

use crate::data_type::DataType;
use crate::error::ImageError;

const CHANNELS_MASK: u32 = 0xff;
const COLOR_OFFSET_SHIFT: u32 = 8;
const DATA_TYPE_SHIFT: u32 = 12;
const NIBBLE: u32 = 0xf;
const SWAP_COLOR_BIT: u32 = 1 << 16;
const PLANAR_BIT: u32 = 1 << 17;
const FLAVOR_BIT: u32 = 1 << 18;
const BYTE_SWAP_BIT: u32 = 1 << 19;

/// How the samples of one pixel are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelLayout {
    pub channels: u8,
    pub color_offset: u8,
    pub data_type: DataType,
    pub swap_color: bool,
    pub planar: bool,
    pub flavor: bool,
    pub byte_swap: bool,
}

impl PixelLayout {
    /// Interleaved layout with the color channels first.
    pub const fn new(channels: u8, data_type: DataType) -> Self {
        Self {
            channels,
            color_offset: 0,
            data_type,
            swap_color: false,
            planar: false,
            flavor: false,
            byte_swap: false,
        }
    }

    pub const fn with_planar(mut self, planar: bool) -> Self {
        self.planar = planar;
        self
    }

    pub const fn with_swap_color(mut self, swap: bool) -> Self {
        self.swap_color = swap;
        self
    }

    pub const fn with_byte_swap(mut self, swap: bool) -> Self {
        self.byte_swap = swap;
        self
    }

    pub const fn with_color_offset(mut self, offset: u8) -> Self {
        self.color_offset = offset;
        self
    }

    pub const fn with_flavor(mut self, flavor: bool) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn pack(&self) -> u32 {
        let mut code = u32::from(self.channels)
            | ((u32::from(self.color_offset) & NIBBLE) << COLOR_OFFSET_SHIFT)
            | (self.data_type.code() << DATA_TYPE_SHIFT);
        if self.swap_color {
            code |= SWAP_COLOR_BIT;
        }
        if self.planar {
            code |= PLANAR_BIT;
        }
        if self.flavor {
            code |= FLAVOR_BIT;
        }
        if self.byte_swap {
            code |= BYTE_SWAP_BIT;
        }
        code
    }

    pub fn unpack(code: u32) -> Result<Self, ImageError> {
        let data_code = (code >> DATA_TYPE_SHIFT) & NIBBLE;
        let data_type = DataType::from_code(data_code)
            .ok_or_else(|| ImageError::InvalidLayout(format!("unknown data type {data_code}")))?;
        let layout = Self {
            channels: (code & CHANNELS_MASK) as u8,
            color_offset: ((code >> COLOR_OFFSET_SHIFT) & NIBBLE) as u8,
            data_type,
            swap_color: code & SWAP_COLOR_BIT != 0,
            planar: code & PLANAR_BIT != 0,
            flavor: code & FLAVOR_BIT != 0,
            byte_swap: code & BYTE_SWAP_BIT != 0,
        };
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), ImageError> {
        if self.channels == 0 {
            return Err(ImageError::InvalidLayout("zero channels".into()));
        }
        if u32::from(self.color_offset) > NIBBLE {
            return Err(ImageError::InvalidLayout(format!(
                "color offset {} does not fit in four bits",
                self.color_offset
            )));
        }
        if self.color_offset >= self.channels {
            return Err(ImageError::InvalidLayout(format!(
                "color offset {} with {} channels",
                self.color_offset, self.channels
            )));
        }
        Ok(())
    }

    /// Bytes of one pixel, all channels.
    pub fn pixel_size(&self) -> usize {
        usize::from(self.channels) * self.data_type.size()
    }
}

/// Meaning of a single channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelType {
    Undefined,
    Other,
    Lightness,
    Color,
    ColorLightness,
    Alpha,
    Depth,
}

/// Channel semantics implied by a layout and the profile's color channels.
///
/// Channels before the color offset are `Other`, the profile's channels are
/// `Color` and whatever remains is `Alpha`.
pub fn default_channel_types(layout: &PixelLayout, color_channels: usize) -> Vec<ChannelType> {
    let offset = usize::from(layout.color_offset);
    (0..usize::from(layout.channels))
        .map(|i| {
            if i < offset {
                ChannelType::Other
            } else if i < offset + color_channels {
                ChannelType::Color
            } else {
                ChannelType::Alpha
            }
        })
        .collect()
}

/// Addressing facts derived from a layout and image geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMask {
    pub layout: PixelLayout,
    pub channels: usize,
    pub sample_size: usize,
    /// Samples between horizontally adjacent pixels.
    pub pixel_stride: usize,
    /// Samples per scan-line.
    pub line_stride: usize,
    /// Samples between two channels of the same pixel.
    pub channel_stride: usize,
    /// Byte offset of each channel relative to the pixel's first sample.
    pub channel_offsets: Vec<usize>,
    /// Content identity, equal for equal geometry, profile and layout.
    pub identity: String,
}

#[derive(Serialize)]
struct IdentityRecord<'a> {
    width: usize,
    height: usize,
    resolution: [f64; 2],
    profile: &'a str,
    layout: u32,
    channels: &'a [ChannelType],
}

/// Image facts the mask depends on besides the layout.
#[derive(Debug, Clone, Copy)]
pub struct MaskInput<'a> {
    pub width: usize,
    pub height: usize,
    pub resolution: (f64, f64),
    pub profile_name: &'a str,
    pub color_channels: usize,
    pub channel_types: &'a [ChannelType],
}

impl PixelMask {
    pub fn combine(layout: &PixelLayout, input: &MaskInput<'_>) -> Result<Self, ImageError> {
        layout.validate()?;
        let channels = usize::from(layout.channels);
        let sample_size = layout.data_type.size();

        let (pixel_stride, channel_stride) = if layout.planar {
            (1, input.width)
        } else {
            (channels, 1)
        };

        let offset = usize::from(layout.color_offset);
        let color = input.color_channels.min(channels - offset);
        let channel_offsets = (0..channels)
            .map(|i| {
                let position = if layout.swap_color && i >= offset && i < offset + color {
                    2 * offset + color - 1 - i
                } else {
                    i
                };
                position * channel_stride * sample_size
            })
            .collect();

        let record = IdentityRecord {
            width: input.width,
            height: input.height,
            resolution: [input.resolution.0, input.resolution.1],
            profile: input.profile_name,
            layout: layout.pack(),
            channels: input.channel_types,
        };
        let identity = serde_json::to_string(&record)
            .map_err(|e| ImageError::InvalidLayout(format!("identity: {e}")))?;

        Ok(Self {
            layout: *layout,
            channels,
            sample_size,
            pixel_stride,
            line_stride: input.width * channels,
            channel_stride,
            channel_offsets,
            identity,
        })
    }
}
