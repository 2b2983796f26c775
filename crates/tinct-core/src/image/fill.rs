//! Moving pixel regions between an [`Image`] and an [`Array2d`].
//!
//! Both directions stage every scan-line before the destination is touched,
//! so a failed call leaves the destination as it was. No two locks are held
//! at the same time, which keeps a copy between an image and its own array
//! from deadlocking.

use serde::{Deserialize, Serialize};

use crate::array2d::{Array2d, ArrayHandle, FocusChange};
use crate::data_type::DataType;
use crate::error::{Array2dError, ImageError};
use crate::image::Image;
use crate::rect::Rectangle;

/// How [`Image::fill_array`] allocates a missing or undersized array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocateMethod {
    /// Reference the image's own rows without copying.
    Alias,
    /// Copy into a single new allocation.
    #[default]
    Copy,
    /// Allocate zeroed rows; the caller fills them with
    /// [`Image::populate_array`].
    Reserve,
}

impl AllocateMethod {
    pub const fn code(self) -> u8 {
        match self {
            Self::Alias => 0,
            Self::Copy => 1,
            Self::Reserve => 2,
        }
    }

    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Alias),
            1 => Some(Self::Copy),
            2 => Some(Self::Reserve),
            _ => None,
        }
    }
}

/// Whole-sample span of a rounded rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    x: usize,
    y: usize,
    width: usize,
    height: usize,
}

impl Span {
    fn of(r: &Rectangle) -> Self {
        Self {
            x: r.x.max(0.0) as usize,
            y: r.y.max(0.0) as usize,
            width: r.width.max(0.0) as usize,
            height: r.height.max(0.0) as usize,
        }
    }

    /// Width and height of an array that holds the span at its offset.
    fn extent(&self, data_type: DataType) -> Result<(usize, usize), Array2dError> {
        match (self.x.checked_add(self.width), self.y.checked_add(self.height)) {
            (Some(w), Some(h)) => Ok((w, h)),
            _ => Err(Array2dError::Oversized {
                width: self.width,
                height: self.height,
                sample_size: data_type.size(),
            }),
        }
    }
}

/// `region` (logical coordinates of `array`) in reservation coordinates.
fn window_of(array: &Array2d, region: &Rectangle) -> Rectangle {
    let focus = array.focus();
    Rectangle::new(
        focus.x + region.x,
        focus.y + region.y,
        region.width,
        region.height,
    )
}

fn window_fits(array: &Array2d, region: &Rectangle) -> bool {
    let w = window_of(array, region);
    w.x >= 0.0
        && w.y >= 0.0
        && w.x + w.width <= array.reserved_width() as f64
        && w.y + w.height <= array.reserved_height() as f64
}

fn check_type(expected: DataType, actual: DataType) -> Result<(), ImageError> {
    if expected != actual {
        return Err(ImageError::TypeMismatch { expected, actual });
    }
    Ok(())
}

impl Image {
    /// Image region and array region of a fill, both in samples.
    ///
    /// The array region defaults to the image region placed at the array
    /// origin.
    fn fill_regions(
        &self,
        roi: &Rectangle,
        array_roi: Option<&Rectangle>,
    ) -> Result<(Rectangle, Rectangle), ImageError> {
        let samples = self.roi_to_samples(roi);
        let bounds = self.sample_bounds();
        if samples.is_empty() {
            return Err(ImageError::EmptyRegion(*roi));
        }
        if samples.x < 0.0
            || samples.y < 0.0
            || samples.x + samples.width > bounds.width
            || samples.y + samples.height > bounds.height
        {
            return Err(ImageError::RegionOutOfBounds {
                region: samples,
                bounds,
            });
        }
        let array_samples = match array_roi {
            Some(r) => self.roi_to_samples(r),
            None => Rectangle::new(0.0, 0.0, samples.width, samples.height),
        };
        Ok((samples, array_samples))
    }

    /// Fetch the region `roi` into an array.
    ///
    /// `roi` and `array_roi` are in ROI units. The region lands at
    /// `array_roi` inside `target` (at the array origin by default). A
    /// missing, undersized or foreign-typed target is replaced by a new
    /// array allocated with `method`. The array's focus is the same after
    /// the call as before it.
    pub fn fill_array(
        &self,
        roi: &Rectangle,
        method: AllocateMethod,
        target: Option<&ArrayHandle>,
        array_roi: Option<&Rectangle>,
    ) -> Result<ArrayHandle, ImageError> {
        let (samples, array_samples) = self.fill_regions(roi, array_roi)?;
        let data_type = self.layout().data_type;

        if let Some(target) = target {
            let usable = {
                let array = target.read();
                array.data_type() == data_type && window_fits(&array, &array_samples)
            };
            if usable {
                self.populate_array(target, roi, array_roi)?;
                return Ok(target.clone());
            }
            tracing::debug!(
                "target array cannot hold {} samples at {}, reallocating",
                data_type,
                array_samples
            );
        }

        let method = match method {
            AllocateMethod::Alias if array_samples.x != 0.0 || array_samples.y != 0.0 => {
                tracing::debug!("alias needs the array roi at the origin, copying instead");
                AllocateMethod::Copy
            }
            AllocateMethod::Alias if self.array().is_none() => {
                tracing::debug!("image has no addressable rows to alias, copying instead");
                AllocateMethod::Copy
            }
            m => m,
        };

        let (width, height) = Span::of(&array_samples).extent(data_type)?;
        match method {
            AllocateMethod::Alias => self.alias_rows(&samples),
            AllocateMethod::Copy => {
                tracing::debug!("allocating {width}x{height} {data_type} array for fill");
                let array = ArrayHandle::new(Array2d::new(width, height, data_type)?);
                self.populate_array(&array, roi, array_roi)?;
                Ok(array)
            }
            AllocateMethod::Reserve => Ok(ArrayHandle::new(Array2d::reserve_rows(
                width, height, data_type,
            )?)),
        }
    }

    /// An array whose rows point into the image's own storage.
    fn alias_rows(&self, samples: &Rectangle) -> Result<ArrayHandle, ImageError> {
        let source = self.array().ok_or(ImageError::NoPixelData)?;
        let s = Span::of(samples);
        let source = source.read();
        let rows = (s.y..s.y + s.height)
            .map(|y| source.address(y, s.x))
            .collect::<Result<Vec<_>, _>>()?;
        let array = Array2d::from_rows(rows, s.width, s.height, source.data_type())?;
        Ok(ArrayHandle::new(array))
    }

    /// Copy the region `roi` into an existing array.
    ///
    /// This is the copy phase of [`fill_array`](Self::fill_array) and
    /// completes an array allocated with [`AllocateMethod::Reserve`]. The
    /// copied span is clamped to the smaller of the two regions.
    pub fn populate_array(
        &self,
        array: &ArrayHandle,
        roi: &Rectangle,
        array_roi: Option<&Rectangle>,
    ) -> Result<(), ImageError> {
        let (samples, array_samples) = self.fill_regions(roi, array_roi)?;
        let s = Span::of(&samples);
        let a = Span::of(&array_samples);
        let width = s.width.min(a.width);
        let height = s.height.min(a.height);
        let sample_size = self.layout().data_type.size();

        let mut staged = Vec::with_capacity(height);
        for y in s.y..s.y + height {
            let line = self.get_line(y)?;
            let start = s.x * sample_size;
            let end = (s.x + width) * sample_size;
            if line.len() < end {
                return Err(Array2dError::BufferTooSmall {
                    expected: end,
                    actual: line.len(),
                }
                .into());
            }
            staged.push(line[start..end].to_vec());
        }

        let mut array = array.write();
        check_type(self.layout().data_type, array.data_type())?;
        let window = Rectangle::new(array_samples.x, array_samples.y, width as f64, height as f64);
        write_staged(&mut array, &window, &staged)
    }

    /// Write an array back into the image.
    ///
    /// `image_roi` selects the destination in ROI units; by default the
    /// array's active window is placed at the image origin. The destination
    /// is clipped to the image. `array_roi` selects where in `source` the
    /// data starts. A source too small for the destination fails before any
    /// pixel is written.
    pub fn read_array(
        &self,
        image_roi: Option<&Rectangle>,
        source: &ArrayHandle,
        array_roi: Option<&Rectangle>,
    ) -> Result<(), ImageError> {
        let bounds = self.sample_bounds();
        let mut dest = match image_roi {
            Some(r) => self.roi_to_samples(r),
            None => {
                let array = source.read();
                Rectangle::new(0.0, 0.0, array.width() as f64, array.height() as f64)
            }
        };
        dest.trim(&bounds);
        if dest.is_empty() {
            return Err(ImageError::EmptyRegion(dest));
        }
        let d = Span::of(&dest);
        let origin = match array_roi {
            Some(r) => self.roi_to_samples(r),
            None => Rectangle::new(0.0, 0.0, dest.width, dest.height),
        };
        let sample_size = self.layout().data_type.size();

        let staged = {
            let array = source.read();
            check_type(self.layout().data_type, array.data_type())?;
            if origin.x < 0.0
                || origin.y < 0.0
                || origin.x as usize + d.width > array.width()
                || origin.y as usize + d.height > array.height()
            {
                return Err(ImageError::ArrayTooSmall {
                    region: Rectangle::new(origin.x, origin.y, dest.width, dest.height),
                    width: array.width(),
                    height: array.height(),
                });
            }
            let o = Span::of(&origin);
            let mut staged = Vec::with_capacity(d.height);
            for row in 0..d.height {
                let mut line = vec![0; d.width * sample_size];
                array.read_row(o.y + row, o.x, &mut line)?;
                staged.push(line);
            }
            staged
        };

        for (row, line) in staged.iter().enumerate() {
            self.set_line(d.x, d.y + row, line)?;
        }
        Ok(())
    }
}

/// Focus `array` on `window`, write the staged rows and restore the focus.
fn write_staged(
    array: &mut Array2d,
    window: &Rectangle,
    staged: &[Vec<u8>],
) -> Result<(), ImageError> {
    let prior = array.focus();
    let change = array.set_focus(&window_of(array, window))?;
    let written = staged
        .iter()
        .enumerate()
        .try_for_each(|(row, bytes)| array.write_row(row, 0, bytes));
    if change == FocusChange::Moved {
        array.set_focus(&prior)?;
    }
    Ok(written?)
}
