//! Pixel accessors: how an image reads and writes points, lines and tiles.
//!
//! Every image carries one accessor matching its pixel data. Lines are the
//! primary unit; points and tiles default to line access. Planar storage
//! keeps each scan-line as consecutive channel planes, so it supports lines
//! but not points or tiles.

use std::fmt;
use std::sync::Arc;

use crate::error::{Array2dError, ImageError};
use crate::image::layout::PixelLayout;
use crate::image::{Image, PixelData};
use crate::rect::Rectangle;

/// Pixel storage implemented outside of this crate.
pub trait PixelProvider: fmt::Debug + Send + Sync {
    /// Scan-line `y`, `samples` samples long.
    fn get_line(&self, y: usize, samples: usize) -> Result<Vec<u8>, ImageError>;

    /// Overwrite scan-line `y` starting at sample `x`.
    fn set_line(&self, x: usize, y: usize, bytes: &[u8]) -> Result<(), ImageError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessorKind {
    Continuous,
    Planar,
    External,
}

pub trait PixelAccessor: fmt::Debug + Send + Sync {
    fn kind(&self) -> AccessorKind;

    /// All samples of scan-line `y`.
    fn get_line(&self, image: &Image, y: usize) -> Result<Vec<u8>, ImageError>;

    /// Overwrite scan-line `y` starting at sample `x`.
    fn set_line(&self, image: &Image, x: usize, y: usize, bytes: &[u8])
    -> Result<(), ImageError>;

    /// Samples of the pixel at `(x, y)`.
    fn get_point(&self, image: &Image, x: usize, y: usize) -> Result<Vec<u8>, ImageError> {
        check_pixel(image, x, y)?;
        let pixel_size = image.layout().pixel_size();
        let line = self.get_line(image, y)?;
        let start = x * pixel_size;
        Ok(line[start..start + pixel_size].to_vec())
    }

    fn set_point(
        &self,
        image: &Image,
        x: usize,
        y: usize,
        pixel: &[u8],
    ) -> Result<(), ImageError> {
        check_pixel(image, x, y)?;
        self.set_line(image, x * image.channel_count(), y, pixel)
    }

    /// Row-major bytes of the pixel rectangle `tile`.
    fn get_tile(&self, image: &Image, tile: &Rectangle) -> Result<Vec<u8>, ImageError> {
        let (x, y, w, h) = tile_span(image, tile)?;
        let pixel_size = image.layout().pixel_size();
        let mut out = Vec::with_capacity(w * h * pixel_size);
        for row in y..y + h {
            let line = self.get_line(image, row)?;
            out.extend_from_slice(&line[x * pixel_size..(x + w) * pixel_size]);
        }
        Ok(out)
    }

    fn set_tile(&self, image: &Image, tile: &Rectangle, bytes: &[u8]) -> Result<(), ImageError> {
        let (x, y, w, h) = tile_span(image, tile)?;
        let row_len = w * image.layout().pixel_size();
        if bytes.len() < row_len * h {
            return Err(Array2dError::BufferTooSmall {
                expected: row_len * h,
                actual: bytes.len(),
            }
            .into());
        }
        for (i, chunk) in bytes.chunks_exact(row_len).take(h).enumerate() {
            self.set_line(image, x * image.channel_count(), y + i, chunk)?;
        }
        Ok(())
    }
}

fn check_pixel(image: &Image, x: usize, y: usize) -> Result<(), ImageError> {
    if x >= image.width() || y >= image.height() {
        return Err(ImageError::PixelOutOfBounds {
            x,
            y,
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

fn check_line(image: &Image, y: usize) -> Result<(), ImageError> {
    if y >= image.height() {
        return Err(ImageError::PixelOutOfBounds {
            x: 0,
            y,
            width: image.width(),
            height: image.height(),
        });
    }
    Ok(())
}

fn tile_span(image: &Image, tile: &Rectangle) -> Result<(usize, usize, usize, usize), ImageError> {
    let r = tile.rounded();
    let bounds = Rectangle::new(0.0, 0.0, image.width() as f64, image.height() as f64);
    if r.is_empty() {
        return Err(ImageError::EmptyRegion(*tile));
    }
    if r.x < 0.0 || r.y < 0.0 || !r.is_inside(&bounds) {
        return Err(ImageError::RegionOutOfBounds {
            region: *tile,
            bounds,
        });
    }
    Ok((r.x as usize, r.y as usize, r.width as usize, r.height as usize))
}

/// Bytes in one scan-line of `image`. The backing array may be wider.
fn line_len(image: &Image) -> usize {
    image.width() * image.layout().pixel_size()
}

fn owned_line(image: &Image, y: usize) -> Result<Vec<u8>, ImageError> {
    check_line(image, y)?;
    let PixelData::Owned(array) = image.pixel_data() else {
        return Err(ImageError::NoPixelData);
    };
    let mut line = vec![0; line_len(image)];
    array.read().read_row(y, 0, &mut line)?;
    Ok(line)
}

fn set_owned_line(image: &Image, x: usize, y: usize, bytes: &[u8]) -> Result<(), ImageError> {
    check_line(image, y)?;
    let PixelData::Owned(array) = image.pixel_data() else {
        return Err(ImageError::NoPixelData);
    };
    array.read().write_row(y, x, bytes)?;
    Ok(())
}

/// Interleaved samples in an image-owned array.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuousAccessor;

impl PixelAccessor for ContinuousAccessor {
    fn kind(&self) -> AccessorKind {
        AccessorKind::Continuous
    }

    fn get_line(&self, image: &Image, y: usize) -> Result<Vec<u8>, ImageError> {
        owned_line(image, y)
    }

    fn set_line(
        &self,
        image: &Image,
        x: usize,
        y: usize,
        bytes: &[u8],
    ) -> Result<(), ImageError> {
        set_owned_line(image, x, y, bytes)
    }

    fn get_point(&self, image: &Image, x: usize, y: usize) -> Result<Vec<u8>, ImageError> {
        check_pixel(image, x, y)?;
        let PixelData::Owned(array) = image.pixel_data() else {
            return Err(ImageError::NoPixelData);
        };
        let mut pixel = vec![0; image.layout().pixel_size()];
        array
            .read()
            .read_row(y, x * image.channel_count(), &mut pixel)?;
        Ok(pixel)
    }
}

/// Row-planar samples in an image-owned array.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanarAccessor;

impl PixelAccessor for PlanarAccessor {
    fn kind(&self) -> AccessorKind {
        AccessorKind::Planar
    }

    fn get_line(&self, image: &Image, y: usize) -> Result<Vec<u8>, ImageError> {
        owned_line(image, y)
    }

    fn set_line(
        &self,
        image: &Image,
        x: usize,
        y: usize,
        bytes: &[u8],
    ) -> Result<(), ImageError> {
        set_owned_line(image, x, y, bytes)
    }

    fn get_point(&self, _image: &Image, _x: usize, _y: usize) -> Result<Vec<u8>, ImageError> {
        Err(ImageError::Unsupported("point read from planar storage"))
    }

    fn set_point(
        &self,
        _image: &Image,
        _x: usize,
        _y: usize,
        _pixel: &[u8],
    ) -> Result<(), ImageError> {
        Err(ImageError::Unsupported("point write to planar storage"))
    }

    fn get_tile(&self, _image: &Image, _tile: &Rectangle) -> Result<Vec<u8>, ImageError> {
        Err(ImageError::Unsupported("tile read from planar storage"))
    }

    fn set_tile(&self, _image: &Image, _tile: &Rectangle, _bytes: &[u8]) -> Result<(), ImageError> {
        Err(ImageError::Unsupported("tile write to planar storage"))
    }
}

/// Delegates to the image's [`PixelProvider`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderAccessor;

impl PixelAccessor for ProviderAccessor {
    fn kind(&self) -> AccessorKind {
        AccessorKind::External
    }

    fn get_line(&self, image: &Image, y: usize) -> Result<Vec<u8>, ImageError> {
        check_line(image, y)?;
        let PixelData::External(provider) = image.pixel_data() else {
            return Err(ImageError::NoPixelData);
        };
        let samples = image.width() * image.channel_count();
        let mut line = provider.get_line(y, samples)?;
        let expected = line_len(image);
        if line.len() < expected {
            return Err(ImageError::Provider(format!(
                "line {y} has {} bytes, expected {expected}",
                line.len()
            )));
        }
        line.truncate(expected);
        Ok(line)
    }

    fn set_line(
        &self,
        image: &Image,
        x: usize,
        y: usize,
        bytes: &[u8],
    ) -> Result<(), ImageError> {
        check_line(image, y)?;
        let PixelData::External(provider) = image.pixel_data() else {
            return Err(ImageError::NoPixelData);
        };
        provider.set_line(x, y, bytes)
    }
}

/// The accessor that matches `data` stored with `layout`.
pub fn default_accessor(data: &PixelData, layout: &PixelLayout) -> Option<Arc<dyn PixelAccessor>> {
    match data {
        PixelData::None => None,
        PixelData::Owned(_) if layout.planar => Some(Arc::new(PlanarAccessor)),
        PixelData::Owned(_) => Some(Arc::new(ContinuousAccessor)),
        PixelData::External(_) => Some(Arc::new(ProviderAccessor)),
    }
}
