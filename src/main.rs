//! Command-line front end: sample a source image, sort it, and grow one or
//! more output drawings, in parallel when sweeping parameters.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use rayon::prelude::*;

use zengrow::{
    load_image, place, sample_colors, sort_by_similarity, CompressionLevel, PlaceOptions,
    SampledColor, SortOptions,
};

#[derive(Debug, Parser)]
#[command(name = "zengrow", about = "Grow a pixel-placement drawing from a source image")]
struct Args {
    /// Input image (required)
    #[arg(long = "in")]
    input: PathBuf,

    /// Output image; defaults to pix.<input stem>.png in the working directory
    #[arg(long = "out")]
    output: Option<PathBuf>,

    /// Width of the output image
    #[arg(long, default_value_t = 300)]
    width: usize,

    /// Height of the output image
    #[arg(long, default_value_t = 300)]
    height: usize,

    /// Percentage (0 to 100) of the canvas left transparent
    #[arg(long = "white-percent", default_value_t = 0)]
    white_percent: usize,

    /// Weight (0 to 100) of color similarity in the sort order. Higher values
    /// favor color similarity; lower values better preserve proximity in the
    /// source image.
    #[arg(long = "colorsort", default_value_t = 90)]
    colorsort: u32,

    /// Randomness weight for the similarity sort
    #[arg(long, default_value_t = 0)]
    random: u32,

    /// Reverse the sort order
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    reverse: bool,

    /// Sweep across {colorsort, random, reverse, seeds} presets, ignoring any
    /// explicitly set values
    #[arg(long)]
    sweep: bool,

    /// Seed positions: "x y[ x y...]"
    #[arg(long)]
    seeds: Option<String>,

    /// Random seed
    #[arg(long = "random-seed", default_value_t = 0)]
    random_seed: u64,

    /// Number of outputs to generate for each set of input parameters
    #[arg(long, default_value_t = 1)]
    variations: usize,

    /// PNG compression level: -3 (best), -2 (speed), -1 (none), 0 (default)
    #[arg(long = "compress", default_value_t = 0, allow_hyphen_values = true)]
    compress: i32,
}

struct Job {
    colors: Vec<SampledColor>,
    opts: PlaceOptions,
    status: String,
}

fn parse_seeds(s: &str) -> Result<Vec<i32>> {
    let seeds: Vec<i32> = s
        .split_whitespace()
        .map(|piece| piece.parse::<i32>().context("could not parse seed coordinate"))
        .collect::<Result<_>>()?;
    if seeds.len() % 2 == 1 {
        bail!("seeds must specify an even number of coordinates");
    }
    Ok(seeds)
}

/// Default output path: pix.<input stem>.png in the working directory.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".into());
    PathBuf::from(format!("pix.{stem}.png"))
}

/// Tag variations beyond the first with a sequence number before the
/// extension: out.png, out.2.png, out.3.png, ...
fn variation_path(output: &Path, variation: usize) -> PathBuf {
    if variation <= 1 {
        return output.to_owned();
    }
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = output
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".into());
    output.with_file_name(format!("{stem}.{variation}.{ext}"))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let compression = CompressionLevel::from_hint(args.compress)
        .context("compression level out of range (valid values: -3, -2, -1, 0)")?;
    let explicit_seeds = match &args.seeds {
        Some(s) => parse_seeds(s)?,
        None => Vec::new(),
    };

    let src = load_image(&args.input)?;
    let (w, h) = (args.width, args.height);

    if args.white_percent > 100 {
        bail!("white-percent must be between 0 and 100");
    }
    if args.colorsort > 100 {
        bail!("colorsort must be between 0 and 100");
    }
    let n_pixels = (100 - args.white_percent) * w * h / 100;
    let colors = sample_colors(&src, n_pixels);

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));

    // Parameter values to cartesian-product over. With --sweep, presets;
    // otherwise the user-provided or default values.
    let (image_sweep, random_sweep, reverse_sweep, seeds_sweep): (
        Vec<u32>,
        Vec<u32>,
        Vec<bool>,
        Vec<Vec<i32>>,
    ) = if args.sweep {
        let (wi, hi) = (w as i32, h as i32);
        (
            vec![10, 90],
            vec![0, 10],
            vec![true, false],
            vec![
                vec![wi / 2, hi / 2],
                vec![0, hi - 1],
                vec![wi / 2, 0, 0, hi / 2, wi / 2, hi - 1, wi - 1, hi / 2],
            ],
        )
    } else {
        (
            vec![100 - args.colorsort],
            vec![args.random],
            vec![args.reverse],
            vec![explicit_seeds],
        )
    };

    let mut jobs = Vec::new();
    let mut variation = 0;
    for &image in &image_sweep {
        for &random in &random_sweep {
            for &reverse in &reverse_sweep {
                // sort once per unique set of sort parameters
                let sort_opts = SortOptions {
                    image: image as f64,
                    color: (100 - image) as f64,
                    random: random as f64,
                    reverse,
                };
                let mut sorted = colors.clone();
                sort_by_similarity(&mut sorted, sort_opts);

                for seeds in &seeds_sweep {
                    for _ in 0..args.variations {
                        variation += 1;
                        let opts = PlaceOptions::new(w, h)
                            .seeds(seeds.clone())
                            .random_seed(args.random_seed + variation as u64)
                            .compression(compression)
                            .output(variation_path(&output, variation));
                        let status = format!(
                            "variation {variation}: seeds: {seeds:?}, colorsort: {}, random: {}, reverse: {}",
                            sort_opts.color, sort_opts.random, sort_opts.reverse
                        );
                        jobs.push(Job {
                            colors: sorted.clone(),
                            opts,
                            status,
                        });
                    }
                }
            }
        }
    }

    // every job owns its canvas; parallelism is by instance. A failing job
    // must not stop the others: the rest of the batch still produces output.
    let failures: Vec<String> = jobs
        .par_iter()
        .filter_map(|job| {
            info!("generating {}", job.status);
            match place(&job.colors, &job.opts) {
                Ok(()) => None,
                Err(err) => {
                    error!("error placing pixels for {}: {err}", job.status);
                    Some(job.status.clone())
                }
            }
        })
        .collect();

    if !failures.is_empty() {
        bail!("{} of {} jobs failed: {}", failures.len(), jobs.len(), failures.join("; "));
    }
    Ok(())
}
