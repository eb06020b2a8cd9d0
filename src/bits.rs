//! Byte-per-bit conventions shared by segmentation, the LDPC codec, and rate
//! matching (spec.md §3, §6).
//!
//! Internally every "bit" that flows between components is one `u8`: `0`,
//! `1`, or a sentinel. This trades memory density for a uniform, branch-light
//! representation across scalar and SIMD back-ends (matching `simd::doubled`'s
//! byte-per-bit nodes) and is simpler to reason about than packing 8 logical
//! bits per byte at this layer; `crc.rs` is the one place that needs genuine
//! bit-packing and uses `bitvec` for it.

/// Marks a systematic position introduced purely to reach a valid `K = Z*bgK`
/// (spec.md §4.2, §6). Filler positions are masked to `0` wherever they
/// contribute to an XOR (encoder aux sums, CRC) and are never transmitted.
pub const FILLER_BIT: u8 = 2;

/// Marks a punctured or not-yet-received LLR position on the receive side
/// (spec.md §4.4): contributes no information to the decoder.
pub const NULL_BIT: u8 = 2;

/// Collapses a filler-flagged bit to its XOR-neutral value.
pub const fn effective(bit: u8) -> u8 {
    if bit == FILLER_BIT {
        0
    } else {
        bit
    }
}
