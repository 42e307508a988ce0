//! Image collaborators: decoding a source image into row-major pixels and
//! encoding the finished canvas as a PNG.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use rgb::RGB;

use crate::error::GrowError;

/// A source-image pixel: its coordinates and sRGB value.
#[derive(Debug, Clone, Copy)]
pub struct SourcePixel {
    pub x: u32,
    pub y: u32,
    pub rgb: RGB<u8>,
}

/// Decode an image file into row-major source pixels.
pub fn load_image(path: &Path) -> Result<Vec<SourcePixel>, GrowError> {
    let img = image::open(path)
        .map_err(|source| GrowError::Decode {
            path: path.to_owned(),
            source,
        })?
        .to_rgb8();
    let (w, h) = img.dimensions();
    let mut pixels = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            let p = img.get_pixel(x, y);
            pixels.push(SourcePixel {
                x,
                y,
                rgb: RGB {
                    r: p.0[0],
                    g: p.0[1],
                    b: p.0[2],
                },
            });
        }
    }
    Ok(pixels)
}

/// PNG compression effort, mirroring the -3..0 hint scale of the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompressionLevel {
    /// Hint 0.
    #[default]
    Default,
    /// Hint -1. The encoder has no store-only mode; maps to its fastest.
    NoCompression,
    /// Hint -2.
    BestSpeed,
    /// Hint -3.
    BestCompression,
}

impl CompressionLevel {
    /// Parse a compression hint. Valid values are -3, -2, -1 and 0.
    pub fn from_hint(hint: i32) -> Option<Self> {
        match hint {
            0 => Some(Self::Default),
            -1 => Some(Self::NoCompression),
            -2 => Some(Self::BestSpeed),
            -3 => Some(Self::BestCompression),
            _ => None,
        }
    }

    fn to_png(self) -> png::Compression {
        match self {
            Self::Default => png::Compression::Default,
            Self::NoCompression | Self::BestSpeed => png::Compression::Fast,
            Self::BestCompression => png::Compression::Best,
        }
    }
}

/// Encode a row-major RGBA buffer as an 8-bit PNG.
pub fn write_png(
    path: &Path,
    w: usize,
    h: usize,
    rgba: &[u8],
    compression: CompressionLevel,
) -> Result<(), GrowError> {
    let file = File::create(path).map_err(|source| GrowError::Io {
        path: path.to_owned(),
        source,
    })?;
    let buf = BufWriter::new(file);

    let mut encoder = png::Encoder::new(buf, w as u32, h as u32);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(compression.to_png());

    let encode_err = |source| GrowError::Encode {
        path: path.to_owned(),
        source,
    };
    let mut writer = encoder.write_header().map_err(&encode_err)?;
    writer.write_image_data(rgba).map_err(&encode_err)?;
    Ok(())
}
