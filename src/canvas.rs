//! The canvas and the growth loop.
//!
//! A canvas owns the frontier tree, the per-color position lists, the
//! neighborhood tracker and the rng, and drives the one-pixel-at-a-time
//! placement that grows the drawing out of its seeds.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::color::{lab_code_to_rgb, Color};
use crate::error::GrowError;
use crate::image_io::{write_png, CompressionLevel};
use crate::morton::MortonCode;
use crate::neighbors::{Neighbors, Pos};
use crate::positions::PosList;
use crate::sample::SampledColor;
use crate::ziptree::ZipTree;

/// Beyond this fraction of the canvas, placements with a poor match are
/// replaced by a copy of the nearest frontier color instead.
const INPAINT_PERCENT: usize = 95;

/// Squared OkLab channel distance above which a late placement counts as a
/// poor match.
const INPAINT_MAX_DIST: u32 = 10;

pub struct Canvas {
    /// frontier colors, keyed by the Morton code of their OkLab channels
    tree: ZipTree,
    /// candidate positions for every color in the tree
    positions: HashMap<MortonCode, PosList>,
    /// rng for reproducibility; rank draws and neighbor picks consume it
    /// in placement order
    rng: StdRng,
    /// placed colors, one Lab Morton code per padded cell
    img: Vec<MortonCode>,
    /// neighborhood-tracking structure over the padded grid
    ns: Neighbors,
    /// number of real pixels placed
    n_placed: usize,
    /// placements beyond which poor matches are rejected
    inpaint_cutoff: usize,
    w: usize,
    h: usize,
    w_pad: usize,
}

impl Canvas {
    pub fn new(w: usize, h: usize, seed: u64) -> Self {
        assert!(
            w <= 1 << 15 && h <= 1 << 15,
            "canvas dimensions above 2^15 are unsupported"
        );
        let (w_pad, h_pad) = (w + 2, h + 2);
        Canvas {
            tree: ZipTree::with_capacity(w * h),
            positions: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
            img: vec![MortonCode::default(); w_pad * h_pad],
            ns: Neighbors::new(w_pad, h_pad),
            n_placed: 0,
            inpaint_cutoff: w * h * INPAINT_PERCENT / 100,
            w,
            h,
            w_pad,
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn placements(&self) -> usize {
        self.n_placed
    }

    /// Write `code` at `pos` and run the frontier upkeep cascade: the fill
    /// may saturate neighbors, which may empty their position lists, which
    /// removes their colors from the tree. If the new cell still has an
    /// empty neighbor afterwards, it joins the frontier itself.
    pub fn place_at(&mut self, code: MortonCode, pos: Pos) {
        self.img[pos as usize] = code;

        let Canvas {
            ns,
            img,
            positions,
            tree,
            ..
        } = self;
        ns.fill(pos, |saturated| {
            let c = img[saturated as usize];
            let now_empty = positions
                .get_mut(&c)
                .expect("saturated cell's color missing from the frontier")
                .delete(saturated);
            if now_empty {
                tree.delete(c);
                positions.remove(&c);
            }
        });

        if self.ns.count(pos) < 9 {
            match self.positions.entry(code) {
                Entry::Occupied(mut e) => e.get_mut().insert(pos),
                Entry::Vacant(e) => {
                    e.insert(PosList::new(pos));
                    self.tree.insert(code, &mut self.rng);
                }
            }
        }
        self.n_placed += 1;
    }

    /// The growth step: find the frontier color most similar to the sample,
    /// pick one of its sites, and fill a random empty neighbor of that site.
    ///
    /// Past the inpainting cutoff, a sample too far from the best frontier
    /// color is replaced by a copy of that color, so late-stage outliers do
    /// not degrade the drawing.
    pub fn place(&mut self, x: SampledColor) -> Result<(), GrowError> {
        let (color, mut code) = (x.lab, x.lab_code);
        let nearest = self
            .tree
            .nearest(color, code)
            .ok_or(GrowError::Exhausted)?;
        if self.n_placed > self.inpaint_cutoff {
            let nearest_color = Color::from_morton(nearest);
            if color.sq_dist(nearest_color) > INPAINT_MAX_DIST * INPAINT_MAX_DIST {
                code = nearest;
            }
        }
        let pos = self.positions[&nearest].arbitrary();
        let target = self.ns.rand_empty_neighbor(pos, &mut self.rng);
        self.place_at(code, target);
        Ok(())
    }

    /// Place a seed color at real coordinates (x, y). Bounds are the
    /// caller's responsibility; `place_seeds` is the checked entry.
    pub fn place_seed(&mut self, color: SampledColor, x: usize, y: usize) {
        let pos = ((y + 1) * self.w_pad + (x + 1)) as Pos;
        self.place_at(color.lab_code, pos);
    }

    /// Place one seed per coordinate pair in `xys`, consuming colors from
    /// the front of `colors`. Returns the unconsumed remainder.
    ///
    /// Seeds beyond the available colors are skipped, so an empty color
    /// sequence yields an untouched canvas.
    pub fn place_seeds<'a>(
        &mut self,
        colors: &'a [SampledColor],
        xys: &[i32],
    ) -> Result<&'a [SampledColor], GrowError> {
        if xys.len() % 2 == 1 {
            return Err(GrowError::SeedsMalformed(xys.len()));
        }
        let mut rest = colors;
        for pair in xys.chunks_exact(2) {
            let (x, y) = (pair[0], pair[1]);
            if x < 0 || x as usize >= self.w || y < 0 || y as usize >= self.h {
                return Err(GrowError::SeedOutOfBounds {
                    x,
                    y,
                    width: self.w,
                    height: self.h,
                });
            }
            let Some((&color, tail)) = rest.split_first() else {
                break;
            };
            self.place_seed(color, x as usize, y as usize);
            rest = tail;
        }
        debug!(
            "placed {} seeds on a {}x{} canvas",
            colors.len() - rest.len(),
            self.w,
            self.h
        );
        Ok(rest)
    }

    /// The finished drawing as a row-major RGBA buffer, 4 bytes per real
    /// pixel. Cells never placed come out fully transparent.
    pub fn image_data(&self) -> Vec<u8> {
        let mut data = vec![0u8; 4 * self.w * self.h];
        for y in 0..self.h {
            for x in 0..self.w {
                let isrc = (y + 1) * self.w_pad + (x + 1); // account for padding
                let idst = 4 * (y * self.w + x);
                if !self.ns.is_empty(isrc as Pos) {
                    // round-trip through oklab handles the general case
                    // where placed colors do not appear in the source image
                    let (r, g, b) = lab_code_to_rgb(self.img[isrc]);
                    data[idst] = r;
                    data[idst + 1] = g;
                    data[idst + 2] = b;
                    data[idst + 3] = 255;
                }
            }
        }
        data
    }

    /// Encode the canvas to a PNG file.
    pub fn save_image(&self, path: &Path, compression: CompressionLevel) -> Result<(), GrowError> {
        write_png(path, self.w, self.h, &self.image_data(), compression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rgb::RGB;

    fn sampled(r: u8, g: u8, b: u8) -> SampledColor {
        SampledColor::new(RGB { r, g, b }, 0, 0)
    }

    /// Walk the whole canvas checking the coupling invariants between the
    /// tree, the position lists, and the neighborhood tracker.
    fn check_invariants(c: &Canvas) {
        // every color in the map has a non-empty list whose members are
        // placed, unsaturated, and store that color; no position appears
        // in two lists
        let mut seen = std::collections::HashSet::new();
        for (&code, list) in &c.positions {
            for p in list.iter() {
                assert!(c.ns.count(p) < 9, "frontier site is saturated");
                assert!(!c.ns.is_empty(p), "frontier site is unplaced");
                assert_eq!(c.img[p as usize], code, "frontier site stores another color");
                assert!(seen.insert(p), "position shared between lists");
            }
        }
        // the tree and the map hold the same key set
        let tree_keys = c.tree.in_order_keys();
        assert_eq!(tree_keys.len(), c.positions.len());
        for k in &tree_keys {
            assert!(c.positions.contains_key(k));
        }
    }

    #[test]
    fn seed_then_growth_fills_small_canvas() {
        let mut canvas = Canvas::new(3, 3, 0);
        let colors: Vec<SampledColor> = (0..9).map(|_| sampled(0, 0, 0)).collect();
        let rest = canvas.place_seeds(&colors, &[1, 1]).unwrap();
        assert_eq!(rest.len(), 8);
        for &c in rest {
            canvas.place(c).unwrap();
        }
        assert_eq!(canvas.placements(), 9);
        assert!(canvas.tree.is_empty(), "frontier must drain on a full canvas");
        assert!(canvas.positions.is_empty());
    }

    #[test]
    fn invariants_hold_throughout_a_noisy_run() {
        let mut canvas = Canvas::new(8, 8, 7);
        let mut rng = StdRng::seed_from_u64(1234);
        let colors: Vec<SampledColor> = (0..64)
            .map(|_| sampled(rng.gen(), rng.gen(), rng.gen()))
            .collect();
        let rest = canvas.place_seeds(&colors, &[4, 4]).unwrap();
        for (i, &c) in rest.iter().enumerate() {
            canvas.place(c).unwrap();
            if i % 7 == 0 {
                check_invariants(&canvas);
            }
        }
        check_invariants(&canvas);
        assert_eq!(canvas.placements(), 64);
    }

    #[test]
    fn place_without_seed_is_exhausted() {
        let mut canvas = Canvas::new(4, 4, 0);
        let err = canvas.place(sampled(1, 2, 3)).unwrap_err();
        assert!(matches!(err, GrowError::Exhausted));
    }

    #[test]
    fn odd_seed_coordinates_are_malformed() {
        let mut canvas = Canvas::new(4, 4, 0);
        let colors = [sampled(1, 1, 1)];
        let err = canvas.place_seeds(&colors, &[1, 1, 2]).unwrap_err();
        assert!(matches!(err, GrowError::SeedsMalformed(3)));
    }

    #[test]
    fn out_of_bounds_seed_is_rejected_before_placement() {
        let mut canvas = Canvas::new(2, 2, 0);
        let colors = [sampled(1, 1, 1)];
        let err = canvas.place_seeds(&colors, &[2, 0]).unwrap_err();
        assert!(matches!(err, GrowError::SeedOutOfBounds { x: 2, y: 0, .. }));
        assert_eq!(canvas.placements(), 0);
    }

    #[test]
    fn seeds_beyond_colors_are_skipped() {
        let mut canvas = Canvas::new(4, 4, 0);
        let rest = canvas.place_seeds(&[], &[1, 1, 2, 2]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(canvas.placements(), 0);
    }

    #[test]
    fn inpainting_replaces_distant_late_colors() {
        let w = 10;
        let mut canvas = Canvas::new(w, w, 3);
        let black = sampled(0, 0, 0);
        let rest: Vec<SampledColor> = (0..96).map(|_| black).collect();
        canvas.place_seeds(&[black], &[5, 5]).unwrap();
        for &c in &rest {
            canvas.place(c).unwrap();
        }
        // 97 placed, past the 95-cell cutoff; a white request is far from
        // every frontier color, so its placement copies the frontier
        assert_eq!(canvas.placements(), 97);
        let white = sampled(255, 255, 255);
        canvas.place(white).unwrap();
        let data = canvas.image_data();
        let mut bright = 0;
        for px in data.chunks_exact(4) {
            if px[3] == 255 && px[0] > 128 {
                bright += 1;
            }
        }
        assert_eq!(bright, 0, "white must not appear after inpainting kicks in");
    }

    #[test]
    fn determinism_identical_runs_identical_pixels() {
        let run = || {
            let mut canvas = Canvas::new(6, 6, 99);
            let mut rng = StdRng::seed_from_u64(5);
            let colors: Vec<SampledColor> = (0..36)
                .map(|_| sampled(rng.gen(), rng.gen(), rng.gen()))
                .collect();
            let rest = canvas.place_seeds(&colors, &[3, 3]).unwrap();
            for &c in rest {
                canvas.place(c).unwrap();
            }
            canvas.image_data()
        };
        assert_eq!(run(), run());
    }
}
