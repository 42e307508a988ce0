use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GrowError {
    #[error("seeds must specify an even number of coordinates, got {0}")]
    SeedsMalformed(usize),

    #[error("seed ({x}, {y}) is out of bounds for a {width}x{height} canvas")]
    SeedOutOfBounds {
        x: i32,
        y: i32,
        width: usize,
        height: usize,
    },

    #[error("no frontier color to place against (no seed placed, or the canvas is full)")]
    Exhausted,

    #[error("error loading input image {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("error opening output image {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error writing output image {}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
}
