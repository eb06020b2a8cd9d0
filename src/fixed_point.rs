//! Fixed-point message representation shared by the LDPC and polar decoders
//! (spec.md §3, §4.5, §4.6).
//!
//! `Precision::quantize` (`precision.rs`) only covers the channel-LLR
//! boundary. Every arithmetic step inside the min-sum/SSC iteration must
//! itself saturate and carry the ±infinity sentinel the spec's integer
//! back-ends define, or an "int8 decoder" is really just a float decoder
//! with one rounding step bolted on. `Lane` is that per-message value,
//! tagged by precision so every `saturating_add`/`saturating_sub` re-clips
//! into the right domain instead of silently staying full-width.

use crate::precision::Precision;

/// Message/soft-bit clip for int16 (`2^14-1`, spec.md §4.5).
const I16_MSG_CLIP: i32 = (1 << 14) - 1;
/// `±∞` sentinel for int16 (`2^15-1`).
const I16_INF: i32 = i16::MAX as i32;
/// Message/soft-bit clip for int8 (`2^6-1`, spec.md §4.5).
const I8_MSG_CLIP: i32 = (1 << 6) - 1;
/// `±∞` sentinel for int8 (`2^7-1`).
const I8_INF: i32 = i8::MAX as i32;

/// A single decoder message or soft-bit value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lane {
    Float(f32),
    I16(i16),
    I8(i8),
}

impl Lane {
    pub fn zero(precision: Precision) -> Self {
        match precision {
            Precision::Float => Lane::Float(0.0),
            Precision::Int16 => Lane::I16(0),
            Precision::Int8 => Lane::I8(0),
        }
    }

    /// Wraps a raw value into this precision's domain: ordinary values clip
    /// to the message range, values already at or beyond it promote to the
    /// ±infinity sentinel (spec.md §4.4's "filler positions carry LLR = +∞",
    /// realised here rather than silently clipped to a large-but-finite
    /// message).
    pub fn new(precision: Precision, raw: f32) -> Self {
        match precision {
            Precision::Float => Lane::Float(raw),
            Precision::Int16 => Lane::I16(quantize_i32(raw, I16_MSG_CLIP, I16_INF) as i16),
            Precision::Int8 => Lane::I8(quantize_i32(raw, I8_MSG_CLIP, I8_INF) as i8),
        }
    }

    pub fn precision(self) -> Precision {
        match self {
            Lane::Float(_) => Precision::Float,
            Lane::I16(_) => Precision::Int16,
            Lane::I8(_) => Precision::Int8,
        }
    }

    pub fn is_negative(self) -> bool {
        match self {
            Lane::Float(v) => v < 0.0,
            Lane::I16(v) => v < 0,
            Lane::I8(v) => v < 0,
        }
    }

    pub fn is_infinite(self) -> bool {
        match self {
            Lane::Float(v) => v.is_infinite(),
            Lane::I16(v) => v.unsigned_abs() as i32 >= I16_INF,
            Lane::I8(v) => v.unsigned_abs() as i32 >= I8_INF,
        }
    }

    /// Magnitude as `f32`; the min-sum reduction only ever compares these,
    /// so the precision loss for int16/int8 (already integral) is none.
    pub fn magnitude(self) -> f32 {
        match self {
            Lane::Float(v) => v.abs(),
            Lane::I16(v) => v.unsigned_abs() as f32,
            Lane::I8(v) => v.unsigned_abs() as f32,
        }
    }

    /// `self - other`, saturating, infinity sticky: an already-infinite
    /// `self` keeps its value regardless of `other` (spec.md §4.5 step 1).
    pub fn saturating_sub(self, other: Lane) -> Lane {
        if self.is_infinite() {
            return self;
        }
        self.combine(other, -1)
    }

    /// `self + other`, saturating, infinity sticky either direction
    /// (spec.md §4.5 step 3's soft-bit update).
    pub fn saturating_add(self, other: Lane) -> Lane {
        if self.is_infinite() {
            return self;
        }
        if other.is_infinite() {
            return other;
        }
        self.combine(other, 1)
    }

    fn combine(self, other: Lane, sign: i32) -> Lane {
        match self {
            Lane::Float(a) => Lane::Float(a + sign as f32 * as_f32(other)),
            Lane::I16(a) => {
                let sum = a as i32 + sign * as_f32(other) as i32;
                Lane::I16(sum.clamp(-I16_MSG_CLIP, I16_MSG_CLIP) as i16)
            }
            Lane::I8(a) => {
                let sum = a as i32 + sign * as_f32(other) as i32;
                Lane::I8(sum.clamp(-I8_MSG_CLIP, I8_MSG_CLIP) as i8)
            }
        }
    }

    /// Builds a message from a sign and an already α-scaled magnitude,
    /// saturating into this lane's message range (spec.md §4.5 step 2's
    /// `c2v[n] = sign · (α · magnitude)`).
    pub fn from_signed_magnitude(precision: Precision, negative: bool, magnitude: f32) -> Lane {
        let signed = if negative { -magnitude } else { magnitude };
        Lane::new(precision, signed)
    }

    /// Scales a magnitude by α: plain multiplication for float, the
    /// spec-mandated integer-ratio realisation `(x · round(α·65535)) >> 16`
    /// for both fixed-point precisions (spec.md §4.5's int8 bullet; applied
    /// uniformly to int16 since the spec only ever describes one "store α as
    /// an integer ratio" convention).
    pub fn scale_alpha(precision: Precision, magnitude: f32, alpha: f32) -> f32 {
        match precision {
            Precision::Float => magnitude * alpha,
            Precision::Int16 | Precision::Int8 => {
                let alpha_q16 = (alpha * 65535.0).round() as i64;
                ((magnitude.round() as i64 * alpha_q16) >> 16) as f32
            }
        }
    }

    pub fn to_f32(self) -> f32 {
        as_f32(self)
    }
}

fn as_f32(lane: Lane) -> f32 {
    match lane {
        Lane::Float(v) => v,
        Lane::I16(v) => v as f32,
        Lane::I8(v) => v as f32,
    }
}

fn quantize_i32(raw: f32, msg_clip: i32, inf: i32) -> i32 {
    if raw.abs() >= msg_clip as f32 {
        if raw < 0.0 {
            -inf
        } else {
            inf
        }
    } else {
        raw.round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int8_messages_clip_within_message_range() {
        let lane = Lane::new(Precision::Int8, 50.0).saturating_add(Lane::new(Precision::Int8, 50.0));
        assert_eq!(lane, Lane::I8(I8_MSG_CLIP as i8));
    }

    #[test]
    fn int8_huge_llr_promotes_to_infinity_sentinel() {
        let lane = Lane::new(Precision::Int8, 1.0e6);
        assert!(lane.is_infinite());
        assert!(!lane.is_negative());
        let neg = Lane::new(Precision::Int8, -1.0e6);
        assert!(neg.is_infinite());
        assert!(neg.is_negative());
    }

    #[test]
    fn infinity_is_sticky_through_subtraction() {
        let inf = Lane::new(Precision::Int16, 1.0e6);
        let finite = Lane::new(Precision::Int16, 3.0);
        assert_eq!(inf.saturating_sub(finite), inf);
    }

    #[test]
    fn alpha_scaling_matches_integer_ratio_for_int8() {
        let scaled = Lane::scale_alpha(Precision::Int8, 40.0, 0.75);
        // round(0.75*65535) = 49151; (40*49151)>>16 = 29 (floor).
        assert_eq!(scaled, 29.0);
    }

    #[test]
    fn float_lane_passes_through_unquantized() {
        let lane = Lane::new(Precision::Float, 1.2345);
        assert_eq!(lane.to_f32(), 1.2345);
    }
}
