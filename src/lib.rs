#![forbid(unsafe_code)]

//! zengrow synthesizes a drawing by placing every pixel of a target palette
//! one at a time onto an initially empty canvas, each next to an
//! already-placed pixel whose color is most similar. The result is a
//! connected blob grown from one or more seed cells that reconstructs (or
//! stylistically transforms) a source image.
//!
//! Similarity lives in OkLab space, spatially coded as 24-bit Morton codes.
//! The frontier of growable colors sits in a zip tree that answers
//! nearest-neighbor queries; per-color position lists and a neighborhood
//! tracker decide where the next pixel can actually go.

pub mod canvas;
pub mod color;
pub mod error;
pub mod hilbert;
pub mod image_io;
pub mod morton;
pub mod neighbors;
pub mod oklab;
pub mod positions;
pub mod sample;
pub mod ziptree;

use std::path::PathBuf;

use log::debug;

pub use canvas::Canvas;
pub use error::GrowError;
pub use image_io::{load_image, CompressionLevel, SourcePixel};
pub use sample::{sample_colors, sort_by_similarity, SampledColor, SortOptions};

/// Configuration for a placement run.
#[derive(Debug, Clone)]
pub struct PlaceOptions {
    /// Output width in pixels.
    pub width: usize,
    /// Output height in pixels.
    pub height: usize,
    /// Seed positions as flat x, y pairs in source order.
    /// Empty defaults to the canvas center.
    pub seeds: Vec<i32>,
    /// Seed for the canvas rng; identical inputs and seed reproduce the
    /// output byte for byte.
    pub random_seed: u64,
    /// Output path. Empty defaults to `out.png`.
    pub output: PathBuf,
    /// Compression hint passed through to the PNG encoder.
    pub compression: CompressionLevel,
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            width: 300,
            height: 300,
            seeds: Vec::new(),
            random_seed: 0,
            output: PathBuf::new(),
            compression: CompressionLevel::Default,
        }
    }
}

impl PlaceOptions {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn seeds(mut self, seeds: Vec<i32>) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = path.into();
        self
    }

    pub fn compression(mut self, level: CompressionLevel) -> Self {
        self.compression = level;
        self
    }
}

/// Run a full placement: seed the canvas, grow the rest of the color
/// sequence, and write the output PNG.
///
/// `colors` must already be sized (see [`sample_colors`]) and ordered (see
/// [`sort_by_similarity`]).
pub fn place(colors: &[SampledColor], opts: &PlaceOptions) -> Result<(), GrowError> {
    let mut canvas = Canvas::new(opts.width, opts.height, opts.random_seed);

    // an initial seed color goes in the middle of the canvas unless the
    // caller asked otherwise
    let center;
    let seeds: &[i32] = if opts.seeds.is_empty() {
        center = [opts.width as i32 / 2, opts.height as i32 / 2];
        &center
    } else {
        &opts.seeds
    };
    let rest = canvas.place_seeds(colors, seeds)?;

    debug!(
        "growing {} colors from {} seeds",
        rest.len(),
        seeds.len() / 2
    );
    for &color in rest {
        canvas.place(color)?;
    }

    let out: PathBuf = if opts.output.as_os_str().is_empty() {
        PathBuf::from("out.png")
    } else {
        opts.output.clone()
    };
    canvas.save_image(&out, opts.compression)
}
