//! Hilbert curve indices, used only as sort keys.
//!
//! The 2D index orders sampled pixels with better locality than a Morton
//! code would give. The 3D transform maps between Morton and Hilbert
//! orderings of a color cube via the multiplication tables of the
//! alternating group A4, preconvolved with the Morton/Hilbert permutation.
//!
//! Translated from this public domain C++ library:
//! <https://github.com/rawrunprotected/hilbert_curves>

use crate::morton::{spread1, MortonCode};

#[rustfmt::skip]
const MORTON_TO_HILBERT_TABLE: [u8; 96] = [
    48, 33, 27, 34, 47, 78, 28, 77,
    66, 29, 51, 52, 65, 30, 72, 63,
    76, 95, 75, 24, 53, 54, 82, 81,
    18,  3, 17, 80, 61,  4, 62, 15,
     0, 59, 71, 60, 49, 50, 86, 85,
    84, 83,  5, 90, 79, 56,  6, 89,
    32, 23,  1, 94, 11, 12,  2, 93,
    42, 41, 13, 14, 35, 88, 36, 31,
    92, 37, 87, 38, 91, 74,  8, 73,
    46, 45,  9, 10,  7, 20, 64, 19,
    70, 25, 39, 16, 69, 26, 44, 43,
    22, 55, 21, 68, 57, 40, 58, 67,
];

#[rustfmt::skip]
const HILBERT_TO_MORTON_TABLE: [u8; 96] = [
    48, 33, 35, 26, 30, 79, 77, 44,
    78, 68, 64, 50, 51, 25, 29, 63,
    27, 87, 86, 74, 72, 52, 53, 89,
    83, 18, 16,  1,  5, 60, 62, 15,
     0, 52, 53, 57, 59, 87, 86, 66,
    61, 95, 91, 81, 80,  2,  6, 76,
    32,  2,  6, 12, 13, 95, 91, 17,
    93, 41, 40, 36, 38, 10, 11, 31,
    14, 79, 77, 92, 88, 33, 35, 82,
    70, 10, 11, 23, 21, 41, 40,  4,
    19, 25, 29, 47, 46, 68, 64, 34,
    45, 60, 62, 71, 67, 18, 16, 49,
];

fn transform_curve(input: u32, bits: u32, table: &[u8; 96]) -> u32 {
    let mut transform = 0u32;
    let mut out = 0u32;
    let mut i = 3 * (bits as i32 - 1);
    while i >= 0 {
        transform = table[(transform | ((input >> i) & 7)) as usize] as u32;
        out = (out << 3) | (transform & 7);
        transform &= !7u32;
        i -= 3;
    }
    out
}

/// The `bits` parameter gives the extent of the encoded space: 1 is a
/// 2x2(x2) space, 2 is 4x4(x4), 3 is 8x8(x8), and so on.
pub fn morton_to_hilbert_3d(morton_index: u32, bits: u32) -> u32 {
    transform_curve(morton_index, bits, &MORTON_TO_HILBERT_TABLE)
}

pub fn hilbert_to_morton_3d(hilbert_index: u32, bits: u32) -> u32 {
    transform_curve(hilbert_index, bits, &HILBERT_TO_MORTON_TABLE)
}

/// Hilbert index of an 8-bit channel triple.
pub fn hilbert_code(x: u8, y: u8, z: u8) -> u32 {
    morton_to_hilbert_3d(MortonCode::encode(x, y, z).bits(), 8)
}

/// Hilbert index of a 2D point, for a 2^bits x 2^bits space (bits <= 16).
pub fn xy_to_hilbert(x: u32, y: u32, bits: u32) -> u32 {
    let x = x << (16 - bits);
    let y = y << (16 - bits);

    let mut a;
    let mut b;
    let mut c;
    let mut d;

    // Initial prefix scan round, prime with x and y
    {
        let a0 = x ^ y;
        let b0 = 0xFFFF ^ a0;
        let c0 = 0xFFFF ^ (x | y);
        let d0 = x & (y ^ 0xFFFF);

        a = a0 | (b0 >> 1);
        b = (a0 >> 1) ^ a0;

        c = ((c0 >> 1) ^ (b0 & (d0 >> 1))) ^ c0;
        d = ((a0 & (c0 >> 1)) ^ (d0 >> 1)) ^ d0;
    }

    {
        let (a0, b0, c0, d0) = (a, b, c, d);

        a = (a0 & (a0 >> 2)) ^ (b0 & (b0 >> 2));
        b = (a0 & (b0 >> 2)) ^ (b0 & ((a0 ^ b0) >> 2));

        c = c0 ^ ((a0 & (c0 >> 2)) ^ (b0 & (d0 >> 2)));
        d = d0 ^ ((b0 & (c0 >> 2)) ^ ((a0 ^ b0) & (d0 >> 2)));
    }

    {
        let (a0, b0, c0, d0) = (a, b, c, d);

        a = (a0 & (a0 >> 4)) ^ (b0 & (b0 >> 4));
        b = (a0 & (b0 >> 4)) ^ (b0 & ((a0 ^ b0) >> 4));

        c = c0 ^ ((a0 & (c0 >> 4)) ^ (b0 & (d0 >> 4)));
        d = d0 ^ ((b0 & (c0 >> 4)) ^ ((a0 ^ b0) & (d0 >> 4)));
    }

    // Final round and projection
    {
        let (a0, b0, c0, d0) = (a, b, c, d);

        c = c0 ^ ((a0 & (c0 >> 8)) ^ (b0 & (d0 >> 8)));
        d = d0 ^ ((b0 & (c0 >> 8)) ^ ((a0 ^ b0) & (d0 >> 8)));
    }

    // Undo transformation prefix scan
    let a = c ^ (c >> 1);
    let b = d ^ (d >> 1);

    // Recover index bits
    let i0 = x ^ y;
    let i1 = b | (0xFFFF ^ (i0 | a));

    ((spread1(i1) << 1) | spread1(i0)) >> (32 - 2 * bits)
}
