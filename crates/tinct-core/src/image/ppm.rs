//! Portable map output: PGM/PPM, PFM (float and half) and PAM.
//!
//! The variant follows the image's sample type and channel count. Integer
//! gray or RGB images become `P5`/`P6` with a big-endian body. Float and half
//! gray or RGB images become `Pf`/`PF` or `Ph`/`PH`, whose scale sign carries
//! the endianness and whose rows run bottom-to-top. Everything else, planar
//! storage included, is written as `P7` with an explicit `BIGENDIAN` field.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::data_type::DataType;
use crate::error::ImageError;
use crate::image::Image;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpmFormat {
    /// `P5`, integer gray.
    Gray,
    /// `P6`, integer RGB.
    Rgb,
    /// `Pf`, float gray.
    FloatGray,
    /// `PF`, float RGB.
    FloatRgb,
    /// `Ph`, half float gray.
    HalfGray,
    /// `PH`, half float RGB.
    HalfRgb,
    /// `P7`, arbitrary channels.
    Arbitrary,
}

impl PpmFormat {
    pub const fn magic(self) -> &'static str {
        match self {
            Self::Gray => "P5",
            Self::Rgb => "P6",
            Self::FloatGray => "Pf",
            Self::FloatRgb => "PF",
            Self::HalfGray => "Ph",
            Self::HalfRgb => "PH",
            Self::Arbitrary => "P7",
        }
    }

    fn is_float_map(self) -> bool {
        matches!(
            self,
            Self::FloatGray | Self::FloatRgb | Self::HalfGray | Self::HalfRgb
        )
    }

    /// Variant used for `image`.
    pub fn select(image: &Image) -> Self {
        let layout = image.layout();
        let channels = image.channel_count();
        let plain = !layout.planar
            && layout.color_offset == 0
            && image.color_channel_count() == channels;
        if !plain {
            return Self::Arbitrary;
        }
        match (layout.data_type, channels) {
            (DataType::U8 | DataType::U16, 1) => Self::Gray,
            (DataType::U8 | DataType::U16, 3) => Self::Rgb,
            (DataType::F32 | DataType::F64, 1) => Self::FloatGray,
            (DataType::F32 | DataType::F64, 3) => Self::FloatRgb,
            (DataType::Half, 1) => Self::HalfGray,
            (DataType::Half, 3) => Self::HalfRgb,
            _ => Self::Arbitrary,
        }
    }
}

/// What [`Image::write_ppm_to`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpmSummary {
    pub format: PpmFormat,
    pub header_len: usize,
    pub body_len: usize,
}

/// Bytes per written sample; doubles are written as floats.
fn body_sample_size(data_type: DataType) -> usize {
    match data_type {
        DataType::F64 => 4,
        t => t.size(),
    }
}

fn tuple_type(image: &Image) -> Option<String> {
    let color = image.color_channel_count();
    let base = match color {
        1 => "GRAYSCALE",
        3 => "RGB",
        4 => "CMYK",
        _ => return None,
    };
    let extra = image.channel_count() - usize::from(image.layout().color_offset) - color;
    Some(if extra > 0 {
        format!("{base}_ALPHA")
    } else {
        base.to_string()
    })
}

impl Image {
    /// Byte order of the stored samples.
    fn data_is_big_endian(&self) -> bool {
        cfg!(target_endian = "big") != self.layout().byte_swap
    }

    /// Byte order of the written body.
    fn body_is_big_endian(&self) -> bool {
        match self.layout().data_type {
            DataType::F64 => cfg!(target_endian = "big"),
            _ => self.data_is_big_endian(),
        }
    }

    fn ppm_header(&self, format: PpmFormat, comment: Option<&str>) -> String {
        let mut header = String::new();
        let _ = writeln!(header, "{}", format.magic());
        if !format.is_float_map() {
            for line in comment.into_iter().flat_map(str::lines) {
                let _ = writeln!(header, "# {line}");
            }
        }
        let data_type = self.layout().data_type;
        match format {
            PpmFormat::Gray | PpmFormat::Rgb => {
                let _ = writeln!(header, "{} {}", self.width(), self.height());
                let _ = writeln!(header, "{}", data_type.max_value().unwrap_or(255));
            }
            PpmFormat::FloatGray | PpmFormat::FloatRgb | PpmFormat::HalfGray | PpmFormat::HalfRgb => {
                let _ = writeln!(header, "{} {}", self.width(), self.height());
                let scale = if self.body_is_big_endian() { "1.0" } else { "-1.0" };
                let _ = writeln!(header, "{scale}");
            }
            PpmFormat::Arbitrary => {
                let _ = writeln!(header, "WIDTH {}", self.width());
                let _ = writeln!(header, "HEIGHT {}", self.height());
                let _ = writeln!(header, "DEPTH {}", self.channel_count());
                match data_type.max_value() {
                    Some(max) => {
                        let _ = writeln!(header, "MAXVAL {max}");
                    }
                    None => {
                        let _ = writeln!(header, "MAXVAL 1.0");
                    }
                }
                if let Some(tuple) = tuple_type(self) {
                    let _ = writeln!(header, "TUPLTYPE {tuple}");
                }
                if self.layout().planar {
                    let _ = writeln!(header, "PLANAR");
                }
                let _ = writeln!(header, "BIGENDIAN {}", u8::from(self.body_is_big_endian()));
                let _ = writeln!(header, "ENDHDR");
            }
        }
        header
    }

    /// Put swapped color channels back into profile order.
    fn unswap_line(&self, line: Vec<u8>) -> Vec<u8> {
        let mask = self.mask();
        if !mask.layout.swap_color {
            return line;
        }
        let sample_size = mask.sample_size;
        let mut out = Vec::with_capacity(line.len());
        if mask.layout.planar {
            let plane = self.width() * sample_size;
            for &offset in &mask.channel_offsets {
                out.extend_from_slice(&line[offset..offset + plane]);
            }
        } else {
            let pixel_size = mask.channels * sample_size;
            for pixel in line.chunks_exact(pixel_size) {
                for &offset in &mask.channel_offsets {
                    out.extend_from_slice(&pixel[offset..offset + sample_size]);
                }
            }
        }
        out
    }

    /// Convert one stored line into body bytes.
    fn encode_line(&self, format: PpmFormat, line: Vec<u8>) -> Vec<u8> {
        let line = self.unswap_line(line);
        match self.layout().data_type {
            DataType::U16 if matches!(format, PpmFormat::Gray | PpmFormat::Rgb) => {
                if self.data_is_big_endian() {
                    line
                } else {
                    line.chunks_exact(2).flat_map(|s| [s[1], s[0]]).collect()
                }
            }
            DataType::F64 => {
                let byte_swap = self.layout().byte_swap;
                line.chunks_exact(8)
                    .flat_map(|s| {
                        let mut bits: u64 = bytemuck::pod_read_unaligned(s);
                        if byte_swap {
                            bits = bits.swap_bytes();
                        }
                        (f64::from_bits(bits) as f32).to_ne_bytes()
                    })
                    .collect()
            }
            _ => line,
        }
    }

    /// Stream the image as a portable map into `out`.
    ///
    /// `comment` is written as header comment lines where the variant allows
    /// them. 32-bit integer images are refused before anything is written.
    pub fn write_ppm_to<W: Write>(
        &self,
        out: &mut W,
        comment: Option<&str>,
    ) -> Result<PpmSummary, ImageError> {
        // PAM caps MAXVAL at 65535
        if self.layout().data_type == DataType::U32 {
            return Err(ImageError::Unsupported("32-bit integer samples in a portable map"));
        }
        let format = PpmFormat::select(self);
        let header = self.ppm_header(format, comment);
        tracing::debug!(
            "writing {} {}x{} {} image",
            format.magic(),
            self.width(),
            self.height(),
            self.layout().data_type
        );
        out.write_all(header.as_bytes())?;

        let rows: Box<dyn Iterator<Item = usize>> = if format.is_float_map() {
            Box::new((0..self.height()).rev())
        } else {
            Box::new(0..self.height())
        };
        let mut body_len = 0;
        for y in rows {
            let line = self.encode_line(format, self.get_line(y)?);
            out.write_all(&line)?;
            body_len += line.len();
        }
        Ok(PpmSummary {
            format,
            header_len: header.len(),
            body_len,
        })
    }

    /// Write the image to a file at `path`.
    pub fn write_ppm(
        &self,
        path: impl AsRef<Path>,
        comment: Option<&str>,
    ) -> Result<PpmSummary, ImageError> {
        let mut out = BufWriter::new(File::create(path)?);
        let summary = self.write_ppm_to(&mut out, comment)?;
        out.flush()?;
        Ok(summary)
    }

    /// Body length a header for this image declares:
    /// width × height × depth × written sample size.
    pub fn ppm_declared_len(&self) -> usize {
        self.width()
            .saturating_mul(self.height())
            .saturating_mul(self.channel_count())
            .saturating_mul(body_sample_size(self.layout().data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array2d::Block;
    use crate::image::{CriticalUpdate, PixelLayout};
    use crate::profile::SimpleProfile;

    fn image_from(
        bytes: Vec<u8>,
        width: usize,
        height: usize,
        layout: PixelLayout,
        profile: SimpleProfile,
    ) -> Image {
        Image::create(
            Some(Block::from_vec(bytes)),
            width,
            height,
            layout,
            profile.into_handle(),
        )
        .unwrap()
    }

    fn write(image: &Image, comment: Option<&str>) -> (Vec<u8>, PpmSummary) {
        let mut buf = Vec::new();
        let summary = image.write_ppm_to(&mut buf, comment).unwrap();
        (buf, summary)
    }

    #[test]
    fn test_rgb8_decodes_as_p6() {
        let bytes = vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 20, 30];
        let image = image_from(
            bytes,
            2,
            2,
            PixelLayout::new(3, DataType::U8),
            SimpleProfile::rgb(),
        );
        let (buf, summary) = write(&image, Some("tinct test"));
        assert_eq!(summary.format, PpmFormat::Rgb);
        assert!(buf.starts_with(b"P6\n# tinct test\n2 2\n255\n"));

        let decoded = ::image::load_from_memory_with_format(&buf, ::image::ImageFormat::Pnm)
            .unwrap()
            .to_rgb8();
        assert_eq!(decoded.dimensions(), (2, 2));
        assert_eq!(decoded.get_pixel(1, 0).0, [0, 255, 0]);
        assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30]);
    }

    #[test]
    fn test_rgb16_body_is_big_endian() {
        let values: [u16; 3] = [0x0102, 0x0304, 0xfffe];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let image = image_from(
            bytes,
            1,
            1,
            PixelLayout::new(3, DataType::U16),
            SimpleProfile::rgb(),
        );
        let (buf, summary) = write(&image, None);
        assert_eq!(&buf[summary.header_len..], &[1, 2, 3, 4, 0xff, 0xfe]);

        let decoded = ::image::load_from_memory_with_format(&buf, ::image::ImageFormat::Pnm).unwrap();
        let rgb = decoded.as_rgb16().unwrap();
        assert_eq!(rgb.get_pixel(0, 0).0, [0x0102, 0x0304, 0xfffe]);
    }

    #[test]
    fn test_gray_uses_p5() {
        let image = image_from(
            vec![1, 2, 3],
            3,
            1,
            PixelLayout::new(1, DataType::U8),
            SimpleProfile::gray(),
        );
        let (buf, summary) = write(&image, None);
        assert_eq!(summary.format, PpmFormat::Gray);
        let decoded = ::image::load_from_memory_with_format(&buf, ::image::ImageFormat::Pnm)
            .unwrap()
            .to_luma8();
        assert_eq!(decoded.into_raw(), vec![1, 2, 3]);
    }

    #[test]
    fn test_double_downcasts_to_float_map() {
        let values: [f64; 2] = [0.25, 0.75];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let image = image_from(
            bytes,
            1,
            2,
            PixelLayout::new(1, DataType::F64),
            SimpleProfile::gray(),
        );
        let (buf, summary) = write(&image, Some("dropped"));
        assert_eq!(summary.format, PpmFormat::FloatGray);
        let scale = if cfg!(target_endian = "big") { "1.0" } else { "-1.0" };
        let header = format!("Pf\n1 2\n{scale}\n");
        assert!(buf.starts_with(header.as_bytes()));
        assert_eq!(summary.body_len, 8);

        let body = &buf[summary.header_len..];
        let bottom = f32::from_ne_bytes([body[0], body[1], body[2], body[3]]);
        let top = f32::from_ne_bytes([body[4], body[5], body[6], body[7]]);
        assert!((bottom - 0.75).abs() < f32::EPSILON);
        assert!((top - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_planar_and_alpha_use_arbitrary_header() {
        let image = image_from(
            vec![0; 2 * 4],
            2,
            1,
            PixelLayout::new(4, DataType::U8).with_planar(true),
            SimpleProfile::rgb(),
        );
        let (buf, summary) = write(&image, None);
        assert_eq!(summary.format, PpmFormat::Arbitrary);
        let text = String::from_utf8_lossy(&buf[..summary.header_len]).to_string();
        let big = u8::from(cfg!(target_endian = "big"));
        assert_eq!(
            text,
            format!(
                "P7\nWIDTH 2\nHEIGHT 1\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nPLANAR\nBIGENDIAN {big}\nENDHDR\n"
            )
        );
    }

    #[test]
    fn test_swapped_color_written_in_profile_order() {
        let image = image_from(
            vec![3, 2, 1, 9],
            1,
            1,
            PixelLayout::new(4, DataType::U8).with_swap_color(true),
            SimpleProfile::rgb(),
        );
        let (buf, summary) = write(&image, None);
        assert_eq!(&buf[summary.header_len..], &[1, 2, 3, 9]);
    }

    #[test]
    fn test_declared_length_matches_body() {
        let cases = [
            (PixelLayout::new(3, DataType::U16), SimpleProfile::rgb()),
            (PixelLayout::new(4, DataType::F32), SimpleProfile::cmyk()),
            (PixelLayout::new(3, DataType::F64), SimpleProfile::rgb()),
            (PixelLayout::new(2, DataType::Half), SimpleProfile::gray()),
            (PixelLayout::new(3, DataType::U16).with_planar(true), SimpleProfile::rgb()),
        ];
        for (layout, profile) in cases {
            let image = Image::create(None, 3, 2, layout, profile.into_handle()).unwrap();
            let (buf, summary) = write(&image, Some("len"));
            assert_eq!(summary.body_len, image.ppm_declared_len());
            assert_eq!(buf.len(), summary.header_len + summary.body_len);
        }
    }

    #[test]
    fn test_u32_samples_are_refused() {
        let image = Image::create(
            None,
            2,
            1,
            PixelLayout::new(3, DataType::U32),
            SimpleProfile::rgb().into_handle(),
        )
        .unwrap();
        let mut buf = Vec::new();
        let err = image.write_ppm_to(&mut buf, None).unwrap_err();
        assert!(matches!(err, ImageError::Unsupported(_)));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_body_follows_shrunk_width() {
        let bytes: Vec<u8> = (0..12).collect();
        let mut image = Image::create(
            Some(Block::from_vec(bytes)),
            4,
            1,
            PixelLayout::new(3, DataType::U8),
            SimpleProfile::rgb().into_handle(),
        )
        .unwrap();
        image
            .set_critical(CriticalUpdate {
                width: Some(2),
                ..Default::default()
            })
            .unwrap();

        let (buf, summary) = write(&image, None);
        assert_eq!(summary.body_len, image.ppm_declared_len());
        assert_eq!(&buf[summary.header_len..], &[0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_write_ppm_file() {
        let image = Image::create(
            None,
            4,
            4,
            PixelLayout::new(3, DataType::U8),
            SimpleProfile::rgb().into_handle(),
        )
        .unwrap();
        let path = std::env::temp_dir().join("tinct_write_ppm_test.ppm");
        let summary = image.write_ppm(&path, Some("file")).unwrap();
        let written = std::fs::read(&path).unwrap();
        assert_eq!(written.len(), summary.header_len + summary.body_len);
        let _ = std::fs::remove_file(&path);
    }
}
