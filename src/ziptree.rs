//! A zip tree over the Morton codes of frontier colors, with an
//! approximate-nearest-neighbor query in the 3D color space.
//!
//! Zip trees are randomized binary search trees in which each node carries a
//! rank drawn from a geometric distribution; insertion and deletion "unzip"
//! and "zip" paths instead of rotating. See <https://arxiv.org/abs/1806.06726>.
//!
//! Nodes live in a contiguous arena addressed by integer handles, with a free
//! list for reuse after deletions. Handle 0 is the nil sentinel; dereferencing
//! it is a broken invariant and panics.

use rand::rngs::StdRng;
use rand::Rng;

use crate::color::{sq_diff, Color};
use crate::morton::MortonCode;

/// Index of a node in the arena. Zero is nil.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Handle(u32);

impl Handle {
    pub const NIL: Handle = Handle(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One arena slot: 8-bit rank and 24-bit key packed into a single word,
/// plus the two child handles.
#[derive(Debug, Clone, Copy, Default)]
struct ZipNode {
    rank_and_key: u32,
    left: Handle,
    right: Handle,
}

// Rank comparisons take some bits from each of the key's channels to break
// ties. Tarjan calls these "fractional ranks" and suggests their use to
// improve the balance of the tree, which is otherwise right-heavy.
const RANK_MASK: u32 = 0b11111111_00000000_00000000_00111000;
const KEY_MASK: u32 = 0x00ff_ffff;

impl ZipNode {
    fn rank(self) -> u32 {
        self.rank_and_key & RANK_MASK
    }

    fn key(self) -> MortonCode {
        MortonCode::from_bits(self.rank_and_key & KEY_MASK)
    }
}

pub struct ZipTree {
    root: Handle,
    nodes: Vec<ZipNode>,
    free: Vec<Handle>,
}

impl ZipTree {
    /// An empty tree with arena capacity for `cap` live nodes.
    pub fn with_capacity(cap: usize) -> Self {
        let mut nodes = Vec::with_capacity(cap + 1);
        nodes.push(ZipNode::default()); // slot 0 stays reserved as the nil sentinel
        ZipTree {
            root: Handle::NIL,
            nodes,
            free: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.root == Handle::NIL
    }

    /// Insert `key`. Rank bits are drawn from `rng`, one coin flip per bit,
    /// so identical seeds reproduce identical tree shapes.
    pub fn insert(&mut self, key: MortonCode, rng: &mut StdRng) {
        let handle = self.alloc(key, rng);
        self.root = self.insert_rec(self.root, handle);
    }

    /// Delete `key`, which must be present.
    pub fn delete(&mut self, key: MortonCode) {
        self.root = self.delete_rec(self.root, key);
    }

    fn node(&self, handle: Handle) -> ZipNode {
        assert!(handle != Handle::NIL, "nil handle dereference");
        self.nodes[handle.index()]
    }

    fn node_mut(&mut self, handle: Handle) -> &mut ZipNode {
        assert!(handle != Handle::NIL, "nil handle dereference");
        &mut self.nodes[handle.index()]
    }

    fn alloc(&mut self, key: MortonCode, rng: &mut StdRng) -> Handle {
        let mut rank = 0u32;
        while rng.gen::<u64>() & 1 == 0 {
            rank += 1;
        }
        let rank_and_key = rank << 24 | key.bits();
        let node = ZipNode {
            rank_and_key,
            left: Handle::NIL,
            right: Handle::NIL,
        };
        match self.free.pop() {
            Some(handle) => {
                self.nodes[handle.index()] = node;
                handle
            }
            None => {
                let handle = Handle(self.nodes.len() as u32);
                self.nodes.push(node);
                handle
            }
        }
    }

    fn release(&mut self, handle: Handle) {
        self.free.push(handle);
    }

    fn insert_rec(&mut self, hroot: Handle, hx: Handle) -> Handle {
        if hroot == Handle::NIL {
            return hx;
        }
        let root = self.node(hroot);
        if self.node(hx).key() < root.key() {
            if self.insert_rec(root.left, hx) == hx {
                // re-read: the recursion below may have rewired x's children
                let x = self.node(hx);
                if x.rank() < root.rank() {
                    self.node_mut(hroot).left = hx;
                } else {
                    // unzip x up into the parent slot
                    self.node_mut(hroot).left = x.right;
                    self.node_mut(hx).right = hroot;
                    return hx;
                }
            }
        } else {
            if self.insert_rec(root.right, hx) == hx {
                let x = self.node(hx);
                // non-strict on the left path, strict here; the asymmetry
                // keeps equal-ranked nodes ordered consistently
                if x.rank() <= root.rank() {
                    self.node_mut(hroot).right = hx;
                } else {
                    self.node_mut(hroot).right = x.left;
                    self.node_mut(hx).left = hroot;
                    return hx;
                }
            }
        }
        hroot
    }

    fn delete_rec(&mut self, hroot: Handle, key: MortonCode) -> Handle {
        let root = self.node(hroot);
        if key == root.key() {
            self.release(hroot);
            return self.zip(root.left, root.right);
        }
        if key < root.key() {
            let left = self.node(root.left);
            if key == left.key() {
                self.release(root.left);
                let merged = self.zip(left.left, left.right);
                self.node_mut(hroot).left = merged;
            } else {
                self.delete_rec(root.left, key);
            }
        } else {
            let right = self.node(root.right);
            if key == right.key() {
                self.release(root.right);
                let merged = self.zip(right.left, right.right);
                self.node_mut(hroot).right = merged;
            } else {
                self.delete_rec(root.right, key);
            }
        }
        hroot
    }

    /// Merge two subtrees by repeatedly attaching the higher-ranked root and
    /// recursing on the opposite-side child.
    fn zip(&mut self, hx: Handle, hy: Handle) -> Handle {
        if hx == Handle::NIL {
            return hy;
        }
        if hy == Handle::NIL {
            return hx;
        }
        if self.node(hx).rank() < self.node(hy).rank() {
            let merged = self.zip(hx, self.node(hy).left);
            self.node_mut(hy).left = merged;
            hy
        } else {
            let merged = self.zip(self.node(hx).right, hy);
            self.node_mut(hx).right = merged;
            hx
        }
    }

    fn min_key(&self, mut node: ZipNode) -> MortonCode {
        while node.left != Handle::NIL {
            node = self.node(node.left);
        }
        node.key()
    }

    fn max_key(&self, mut node: ZipNode) -> MortonCode {
        while node.right != Handle::NIL {
            node = self.node(node.right);
        }
        node.key()
    }

    /// Keys in ascending order. Diagnostic; the growth loop never needs it.
    pub fn in_order_keys(&self) -> Vec<MortonCode> {
        fn walk(tree: &ZipTree, h: Handle, out: &mut Vec<MortonCode>) {
            if h == Handle::NIL {
                return;
            }
            let n = tree.node(h);
            walk(tree, n.left, out);
            out.push(n.key());
            walk(tree, n.right, out);
        }
        let mut out = Vec::new();
        walk(self, self.root, &mut out);
        out
    }

    /// Nearest-neighbor search in a 3D color space using an approach described
    /// in "A Minimalist's Implementation of an Approximate Nearest Neighbor
    /// Search in Fixed Dimensions": <http://cs.uwaterloo.ca/~tmchan/sss.ps>
    ///
    /// The algorithm is a variant of binary search through a Morton-ordered
    /// list of points which alternately prunes the search space in Euclidean
    /// space and along the curve. The points live in a zip tree for dynamic
    /// updates, and the search recursively traverses it.
    ///
    /// Returns `None` when the tree is empty.
    pub fn nearest(&self, q: Color, q_code: MortonCode) -> Option<MortonCode> {
        if self.root == Handle::NIL {
            return None;
        }
        let mut state = NearestState {
            r_sq: 1 << 30,
            best: MortonCode::default(),
            q_pos_code: MortonCode::default(),
            q_neg_code: MortonCode::default(),
        };
        self.nearest_rec(q, q_code, self.root, &mut state);
        Some(state.best)
    }

    fn nearest_rec(&self, q: Color, q_code: MortonCode, ah: Handle, s: &mut NearestState) {
        if ah == Handle::NIL {
            return;
        }
        let a = self.node(ah);
        let mid_code = a.key();
        let mid = Color::from_morton(mid_code);
        let d_sq = q.sq_dist(mid);
        if d_sq < s.r_sq {
            s.r_sq = d_sq;
            // the radius ceiling is the one float op in the engine
            let r = if d_sq >= 255 * 255 {
                255
            } else {
                (d_sq as f64).sqrt().ceil() as u8
            };
            s.q_pos_code = MortonCode::encode(
                q.x.saturating_add(r),
                q.y.saturating_add(r),
                q.z.saturating_add(r),
            );
            s.q_neg_code = MortonCode::encode(
                q.x.saturating_sub(r),
                q.y.saturating_sub(r),
                q.z.saturating_sub(r),
            );
            s.best = mid_code;
        }
        // a.left equals a.right only when both are nil. We stop when the
        // snug power-of-2 bounding box enclosing this subtree's interval sits
        // farther away than the best distance so far.
        if a.left == a.right
            || mid_code == q_code
            || dist_sq_to_bbox(q_code, self.min_key(a), self.max_key(a), q) >= s.r_sq
        {
            return;
        }
        // Recurse into the half containing the query first. The other half
        // only needs a visit while it remains reachable within the best
        // radius: q_pos_code and q_neg_code are the largest and smallest
        // Morton codes inside the box enclosing the best-radius ball, so any
        // code above or below them is farther from q than r.
        if q_code <= mid_code {
            self.nearest_rec(q, q_code, a.left, s);
            if s.q_pos_code >= mid_code {
                self.nearest_rec(q, q_code, a.right, s);
            }
        } else {
            self.nearest_rec(q, q_code, a.right, s);
            if s.q_neg_code <= mid_code {
                self.nearest_rec(q, q_code, a.left, s);
            }
        }
    }
}

struct NearestState {
    r_sq: u32,
    best: MortonCode,
    q_pos_code: MortonCode,
    q_neg_code: MortonCode,
}

/// Squared distance from color `c` (whose code is `q`) to the tightest
/// power-of-two axis-aligned box enclosing the Morton interval [a, b].
fn dist_sq_to_bbox(q: MortonCode, a: MortonCode, b: MortonCode, c: Color) -> u32 {
    // The most significant differing bit between the interval endpoints
    // determines the octree-aligned box containing both: clearing the bits
    // below it gives the lowest enclosed code, setting them the highest.
    let msb = 32 - (a.bits() ^ b.bits()).leading_zeros();
    let lo_bits = (a.bits() >> msb) << msb;
    let hi_bits = lo_bits + (1 << msb) - 1;
    let lo = MortonCode::from_bits(lo_bits);
    let hi = MortonCode::from_bits(hi_bits);

    let mut d_sq = 0u32;

    if q.x_lt(lo) {
        d_sq += sq_diff(c.x, lo.x());
    } else if q.x_gt(hi) {
        d_sq += sq_diff(c.x, hi.x());
    }

    if q.y_lt(lo) {
        d_sq += sq_diff(c.y, lo.y());
    } else if q.y_gt(hi) {
        d_sq += sq_diff(c.y, hi.y());
    }

    if q.z_lt(lo) {
        d_sq += sq_diff(c.z, lo.z());
    } else if q.z_gt(hi) {
        d_sq += sq_diff(c.z, hi.z());
    }

    d_sq
}
