//! Sampling a source image into a sequence of target colors, and ordering
//! that sequence by a weighted similarity score.

use rand::Rng;
use rgb::RGB;

use crate::color::{rgb_to_lab, Color};
use crate::hilbert::xy_to_hilbert;
use crate::image_io::SourcePixel;
use crate::morton::MortonCode;

const HILBERT_BITS: u32 = 16;

/// A color sample in the sRGB and OkLab color spaces, along with its Morton
/// and Hilbert codes. Computed once during sampling; only the sort score
/// changes afterwards.
#[derive(Debug, Clone, Copy)]
pub struct SampledColor {
    pub(crate) rgb: Color,
    pub(crate) lab: Color,
    pub(crate) rgb_code: MortonCode,
    pub(crate) lab_code: MortonCode,
    pub(crate) xy_code: u32,
    pub(crate) sort_score: f64,
}

impl SampledColor {
    /// Sample a single color at source position (x, y).
    pub fn new(rgb: RGB<u8>, x: u32, y: u32) -> Self {
        let rgb_color = Color::new(rgb.r, rgb.g, rgb.b);
        let lab = rgb_to_lab(rgb);
        SampledColor {
            rgb: rgb_color,
            lab,
            rgb_code: rgb_color.morton(),
            lab_code: lab.morton(),
            xy_code: xy_to_hilbert(x, y, HILBERT_BITS),
            sort_score: 0.0,
        }
    }

    pub fn rgb(&self) -> RGB<u8> {
        RGB {
            r: self.rgb.x,
            g: self.rgb.y,
            b: self.rgb.z,
        }
    }
}

/// Produce `n_pixels` color samples from a row-major source pixel list.
///
/// When fewer samples than source pixels are requested, sources are taken
/// evenly spaced by index. When more are requested, every source color is
/// replicated a whole number of times and the remainder is filled by the
/// same evenly-spaced strategy over the original source.
///
/// Hilbert indices are computed with the image centered inside its smallest
/// enclosing power-of-two square, so no corner of the image is privileged
/// over the others.
pub fn sample_colors(src: &[SourcePixel], n_pixels: usize) -> Vec<SampledColor> {
    if src.is_empty() || n_pixels == 0 {
        return Vec::new();
    }
    let n_src = src.len();

    let last = src[n_src - 1];
    let (src_w, src_h) = (last.x + 1, last.y + 1);
    let w_offset = (src_w.next_power_of_two() - src_w) / 2;
    let h_offset = (src_h.next_power_of_two() - src_h) / 2;

    let sample =
        |p: &SourcePixel| SampledColor::new(p.rgb, p.x + w_offset, p.y + h_offset);

    if n_pixels < n_src {
        // do the expensive conversions once per output sample
        (0..n_pixels)
            .map(|i| sample(&src[(i as u64 * n_src as u64 / n_pixels as u64) as usize]))
            .collect()
    } else {
        let base: Vec<SampledColor> = src.iter().map(sample).collect();
        let n_multiples = n_pixels / n_src;
        let mut out = Vec::with_capacity(n_pixels);
        for s in &base {
            for _ in 0..n_multiples {
                out.push(*s);
            }
        }
        let n_remaining = n_pixels - out.len();
        for i in 0..n_remaining {
            out.push(base[(i as u64 * n_src as u64 / n_remaining as u64) as usize]);
        }
        out
    }
}

/// Weights for the similarity sort.
#[derive(Debug, Clone, Copy)]
pub struct SortOptions {
    /// Weight of proximity in the source image (Hilbert order).
    pub image: f64,
    /// Weight of color similarity (Morton order of sRGB).
    pub color: f64,
    /// Weight of a uniform random jitter; 0 disables the draw entirely.
    pub random: f64,
    /// Sort descending instead of ascending.
    pub reverse: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        SortOptions {
            image: 10.0,
            color: 90.0,
            random: 0.0,
            reverse: true,
        }
    }
}

/// Order colors by a weighted blend of color similarity and source-image
/// proximity, with optional random jitter.
///
/// The jitter draws from a thread-local generator, not the canvas rng:
/// placement determinism is defined over the already-ordered sequence.
pub fn sort_by_similarity(colors: &mut [SampledColor], opts: SortOptions) {
    if colors.is_empty() {
        return;
    }
    let rgb_max = MortonCode::encode(255, 255, 255).bits() as f64;

    // find the smallest and largest Hilbert codes actually used, to
    // normalize the image component of the score
    let mut xy_min = u32::MAX;
    let mut xy_max = 0u32;
    for c in colors.iter() {
        xy_min = xy_min.min(c.xy_code);
        xy_max = xy_max.max(c.xy_code);
    }
    let xy_diff = (xy_max - xy_min) as f64;

    let order = if opts.reverse { -1.0 } else { 1.0 };
    let mut rng = rand::thread_rng();
    for c in colors.iter_mut() {
        let rgb = c.rgb_code.bits() as f64 / rgb_max;
        let xy = if xy_diff > 0.0 {
            (c.xy_code - xy_min) as f64 / xy_diff
        } else {
            0.0
        };
        let mut score = opts.image * xy + opts.color * rgb;
        if opts.random > 0.0 {
            score += opts.random * rng.gen::<f64>();
        }
        c.sort_score = order * score;
    }

    // stable sort plus a total order keeps equal scores in input order
    colors.sort_by(|a, b| a.sort_score.total_cmp(&b.sort_score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_source(w: u32, h: u32) -> Vec<SourcePixel> {
        let mut src = Vec::new();
        for y in 0..h {
            for x in 0..w {
                src.push(SourcePixel {
                    x,
                    y,
                    rgb: RGB {
                        r: (x * 255 / w.max(1)) as u8,
                        g: (y * 255 / h.max(1)) as u8,
                        b: 128,
                    },
                });
            }
        }
        src
    }

    #[test]
    fn downsampling_takes_evenly_spaced_pixels() {
        let src = gradient_source(10, 10);
        let out = sample_colors(&src, 25);
        assert_eq!(out.len(), 25);
        assert_eq!(out[0].rgb(), src[0].rgb);
        assert_eq!(out[24].rgb(), src[96].rgb);
    }

    #[test]
    fn upsampling_replicates_each_source_color() {
        let src = gradient_source(4, 1);
        let out = sample_colors(&src, 11);
        assert_eq!(out.len(), 11);
        // 11 / 4 = 2 contiguous copies of each source color
        for (i, s) in src.iter().enumerate() {
            assert_eq!(out[2 * i].rgb(), s.rgb);
            assert_eq!(out[2 * i + 1].rgb(), s.rgb);
        }
        // remainder drawn evenly from the source
        assert_eq!(out[8].rgb(), src[0].rgb);
    }

    #[test]
    fn zero_samples_gives_empty_sequence() {
        let src = gradient_source(4, 4);
        assert!(sample_colors(&src, 0).is_empty());
        assert!(sample_colors(&[], 16).is_empty());
    }

    #[test]
    fn color_sort_orders_by_morton_code() {
        let mut colors = vec![
            SampledColor::new(RGB { r: 255, g: 255, b: 255 }, 0, 0),
            SampledColor::new(RGB { r: 0, g: 0, b: 0 }, 1, 0),
            SampledColor::new(RGB { r: 128, g: 128, b: 128 }, 2, 0),
        ];
        let opts = SortOptions {
            image: 0.0,
            color: 100.0,
            random: 0.0,
            reverse: false,
        };
        sort_by_similarity(&mut colors, opts);
        let codes: Vec<u32> = colors.iter().map(|c| c.rgb_code.bits()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        assert_eq!(codes, sorted);
    }

    #[test]
    fn reverse_flips_the_order() {
        let mut a = vec![
            SampledColor::new(RGB { r: 10, g: 10, b: 10 }, 0, 0),
            SampledColor::new(RGB { r: 200, g: 200, b: 200 }, 1, 0),
            SampledColor::new(RGB { r: 100, g: 100, b: 100 }, 2, 0),
        ];
        let mut b = a.clone();
        let fwd = SortOptions {
            image: 0.0,
            color: 100.0,
            random: 0.0,
            reverse: false,
        };
        let rev = SortOptions { reverse: true, ..fwd };
        sort_by_similarity(&mut a, fwd);
        sort_by_similarity(&mut b, rev);
        let fwd_codes: Vec<u32> = a.iter().map(|c| c.rgb_code.bits()).collect();
        let mut rev_codes: Vec<u32> = b.iter().map(|c| c.rgb_code.bits()).collect();
        rev_codes.reverse();
        assert_eq!(fwd_codes, rev_codes);
    }

    #[test]
    fn uniform_hilbert_codes_do_not_blow_up() {
        // a single-pixel source repeated: every xy code identical
        let src = vec![SourcePixel {
            x: 0,
            y: 0,
            rgb: RGB { r: 9, g: 9, b: 9 },
        }];
        let mut colors = sample_colors(&src, 5);
        sort_by_similarity(&mut colors, SortOptions::default());
        for c in &colors {
            assert!(c.sort_score.is_finite());
        }
    }
}
