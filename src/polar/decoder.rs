//! Polar SSC (Simplified Successive Cancellation) decoder (spec.md §4.6).
//!
//! Three node types, applied recursively: a Rate-0 node (every bit frozen)
//! decodes straight to all-zero; a Rate-1 node (no bit frozen) hard-decides
//! its LLRs and re-encodes them to recover the actual message bits; a Rate-R
//! node (mixed) recurses into an `f`-domain left child and a `u`-dependent
//! `g`-domain right child, then XOR-combines. `f`/`g` use the min-sum
//! approximation of the boxplus operator. Each node returns its raw combined
//! bit estimate up the recursion (for its parent's `g`/combine) while writing
//! the decoded message bits for its own index range directly into the
//! output buffer -- these are not the same quantity above a leaf, see
//! `decode_node`'s doc comment.
//!
//! Messages are [`Lane`] values tagged by the construction-call's
//! [`Precision`]. At `Int8` precision, `f`/`g`/hard-decision dispatch to the
//! AVX2 32-lane kernels in `crate::simd` (spec.md §4.6: "the AVX2 int8
//! variant vectorises f, g, XOR, and hard-decision"); every other precision
//! runs the scalar `Lane`-based min-sum combine.

use super::PolarCode;
use crate::error::{FecError, Result};
use crate::fixed_point::Lane;
use crate::precision::Precision;
use crate::simd::Kernel;
use bitvec::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeResult {
    Converged,
    CrcFailed,
}

pub struct PolarDecoder<'a> {
    code: &'a PolarCode,
    kernel: Kernel,
}

impl<'a> PolarDecoder<'a> {
    pub fn new(code: &'a PolarCode) -> Self {
        Self::with_kernel(code, Kernel::best_available())
    }

    pub fn with_kernel(code: &'a PolarCode, kernel: Kernel) -> Self {
        PolarDecoder { code, kernel }
    }

    /// Decodes `llr` (length `N`) into `info` (length `K`).
    ///
    /// If `crc` is given, it is checked over the full `K` decoded bits
    /// (matching the convention used for CRC-aided polar decoding, where the
    /// CRC occupies the last bits of the information block) and the result
    /// reports whether it passed; without a CRC the decode is unconditional.
    pub fn decode(
        &self,
        llr: &[f32],
        info: &mut [u8],
        precision: Precision,
        crc: Option<crate::crc::CrcOracle>,
    ) -> Result<DecodeResult> {
        if llr.len() != self.code.n() {
            return Err(FecError::LengthMismatch {
                what: "polar decoder llr".into(),
                expected: self.code.n(),
                got: llr.len(),
            });
        }
        if info.len() != self.code.k() {
            return Err(FecError::LengthMismatch {
                what: "polar decoder info".into(),
                expected: self.code.k(),
                got: info.len(),
            });
        }

        let quantized: Vec<Lane> = llr.iter().map(|&v| Lane::new(precision, v)).collect();
        let mut combined = vec![0u8; self.code.n()];
        let mut message = vec![0u8; self.code.n()];
        self.decode_node(0, &quantized, &mut combined, &mut message);

        let mut info_iter = info.iter_mut();
        for (i, &bit) in message.iter().enumerate() {
            if !self.code.is_frozen(i) {
                *info_iter.next().expect("k() positions already length-checked") = bit;
            }
        }

        match crc {
            Some(oracle) => {
                let mut bits: BitVec<u8, Msb0> = BitVec::with_capacity(info.len());
                for &b in info.iter() {
                    bits.push(b != 0);
                }
                if oracle.check(&bits) {
                    Ok(DecodeResult::Converged)
                } else {
                    Ok(DecodeResult::CrcFailed)
                }
            }
            None => Ok(DecodeResult::Converged),
        }
    }

    /// `start`: the offset of this node's frozen mask within the full code
    /// (this recursion always passes same-length slices split from the top,
    /// so `start` plus `llr.len()` fully identifies the mask range).
    ///
    /// `out` carries this subtree's *combined* bit estimates -- the quantity
    /// the parent's `g`/XOR-combine needs, written in every branch including
    /// Rate-1. `message[start..start+n]` instead receives the actual decoded
    /// bits for this subtree's positions (all zero at a Rate-0 node, nothing
    /// written by a Rate-R node directly since its two recursive calls
    /// already wrote their own ranges). A Rate-1 node gets both: the raw
    /// hard decision goes to `out`, and the same bits re-encoded (spec.md §9:
    /// the SSC decoder reuses the polar encoder) go to `message`, mirroring
    /// `original_source`'s `rate_1_node` hard-decide-then-encode split.
    fn decode_node(&self, start: usize, llr: &[Lane], out: &mut [u8], message: &mut [u8]) {
        let n = llr.len();
        let frozen_here = |i: usize| self.code.is_frozen(start + i);

        if (0..n).all(frozen_here) {
            out.fill(0);
            return;
        }
        if (0..n).all(|i| !frozen_here(i)) {
            for (o, &v) in out.iter_mut().zip(llr.iter()) {
                *o = u8::from(v.is_negative());
            }
            let mut decoded = out.to_vec();
            super::encoder::encode_in_place_with_kernel(&mut decoded, self.kernel);
            message[start..start + n].copy_from_slice(&decoded);
            return;
        }

        let half = n / 2;
        let llr_l = self.f_array(llr, half);
        let mut bits_l = vec![0u8; half];
        self.decode_node(start, &llr_l, &mut bits_l, message);

        let llr_r = self.g_array(llr, &bits_l, half);
        let mut bits_r = vec![0u8; half];
        self.decode_node(start + half, &llr_r, &mut bits_r, message);

        for i in 0..half {
            out[i] = bits_l[i] ^ bits_r[i];
            out[half + i] = bits_r[i];
        }
    }

    /// `f(a,b) = sign(a)*sign(b)*min(|a|,|b|)` over the left/right halves,
    /// vectorised over AVX2 32-lane `i8` when this decoder's precision is
    /// `Int8` and an AVX2/AVX512 kernel is available; scalar `Lane` ops
    /// otherwise.
    fn f_array(&self, llr: &[Lane], half: usize) -> Vec<Lane> {
        if self.int8_simd_eligible(llr) {
            let a: Vec<i8> = (0..half).map(|i| lane_i8(llr[i])).collect();
            let b: Vec<i8> = (0..half).map(|i| lane_i8(llr[half + i])).collect();
            let mut out = vec![0i8; half];
            crate::simd::f_op_i8(self.kernel, &mut out, &a, &b);
            out.into_iter().map(Lane::I8).collect()
        } else {
            (0..half).map(|i| f_op(llr[i], llr[half + i])).collect()
        }
    }

    /// `g(a,b,u) = if u==0 { b+a } else { b-a }`, saturating; same dispatch
    /// rule as [`Self::f_array`].
    fn g_array(&self, llr: &[Lane], bits_l: &[u8], half: usize) -> Vec<Lane> {
        if self.int8_simd_eligible(llr) {
            let a: Vec<i8> = (0..half).map(|i| lane_i8(llr[i])).collect();
            let b: Vec<i8> = (0..half).map(|i| lane_i8(llr[half + i])).collect();
            let mut out = vec![0i8; half];
            crate::simd::g_op_i8(self.kernel, &mut out, &a, &b, bits_l);
            out.into_iter().map(Lane::I8).collect()
        } else {
            (0..half).map(|i| g_op(llr[i], llr[half + i], bits_l[i])).collect()
        }
    }

    fn int8_simd_eligible(&self, llr: &[Lane]) -> bool {
        matches!(self.kernel, Kernel::Avx2 | Kernel::Avx512) && matches!(llr.first(), Some(Lane::I8(_)))
    }
}

fn lane_i8(lane: Lane) -> i8 {
    match lane {
        Lane::I8(v) => v,
        _ => unreachable!("int8 SIMD path requires int8 lanes"),
    }
}

fn f_op(a: Lane, b: Lane) -> Lane {
    let precision = a.precision();
    let negative = a.is_negative() ^ b.is_negative();
    let magnitude = a.magnitude().min(b.magnitude());
    Lane::from_signed_magnitude(precision, negative, magnitude)
}

fn g_op(a: Lane, b: Lane, u: u8) -> Lane {
    if u == 0 {
        b.saturating_add(a)
    } else {
        b.saturating_sub(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polar::encoder::PolarEncoder;

    fn llr_from_codeword(codeword: &[u8]) -> Vec<f32> {
        codeword.iter().map(|&b| if b == 0 { 5.0 } else { -5.0 }).collect()
    }

    #[test]
    fn clean_channel_round_trips() {
        let code = PolarCode::new(4, &[0, 1, 2, 3, 4, 8]).unwrap();
        let enc = PolarEncoder::new(&code);
        let dec = PolarDecoder::new(&code);

        let mut info = vec![0u8; code.k()];
        for (i, b) in info.iter_mut().enumerate() {
            *b = (i % 2) as u8;
        }
        let mut codeword = vec![0u8; code.n()];
        enc.encode(&info, &mut codeword).unwrap();

        let llr = llr_from_codeword(&codeword);
        let mut decoded = vec![0u8; code.k()];
        let result = dec.decode(&llr, &mut decoded, Precision::Float, None).unwrap();
        assert_eq!(result, DecodeResult::Converged);
        assert_eq!(decoded, info);
    }

    #[test]
    fn near_rate0_code_decodes_all_zero_info_cleanly() {
        // Only index 0 is an information bit; everything else frozen.
        let frozen: Vec<usize> = (1..8).collect();
        let code = PolarCode::new(3, &frozen).unwrap();
        let enc = PolarEncoder::new(&code);
        let dec = PolarDecoder::new(&code);

        let info = vec![0u8; code.k()];
        let mut codeword = vec![0u8; code.n()];
        enc.encode(&info, &mut codeword).unwrap();

        let llr = llr_from_codeword(&codeword);
        let mut decoded = vec![0u8; code.k()];
        dec.decode(&llr, &mut decoded, Precision::Float, None).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn rate_1_subtree_larger_than_one_bit_decodes_correctly() {
        // frozen = {0}: positions 2,3 form a size-2 Rate-1 node nested under
        // the top Rate-R split, exercising the re-encode step in isolation.
        let code = PolarCode::new(2, &[0]).unwrap();
        let enc = PolarEncoder::new(&code);
        let dec = PolarDecoder::new(&code);

        let info = vec![0u8, 0, 1];
        let mut codeword = vec![0u8; code.n()];
        enc.encode(&info, &mut codeword).unwrap();

        let llr = llr_from_codeword(&codeword);
        let mut decoded = vec![0u8; code.k()];
        dec.decode(&llr, &mut decoded, Precision::Float, None).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let code = PolarCode::new(3, &[0, 1]).unwrap();
        let dec = PolarDecoder::new(&code);
        let llr = vec![0.0f32; code.n() - 1];
        let mut decoded = vec![0u8; code.k()];
        assert!(dec.decode(&llr, &mut decoded, Precision::Float, None).is_err());
    }

    #[test]
    fn int8_avx2_kernel_agrees_with_scalar() {
        let code = PolarCode::new(6, &(0..16).collect::<Vec<_>>()).unwrap();
        let enc = PolarEncoder::new(&code);
        let info: Vec<u8> = (0..code.k()).map(|i| (i % 2) as u8).collect();
        let mut codeword = vec![0u8; code.n()];
        enc.encode(&info, &mut codeword).unwrap();
        let llr = llr_from_codeword(&codeword);

        let scalar = PolarDecoder::with_kernel(&code, Kernel::Scalar);
        let avx2 = PolarDecoder::with_kernel(&code, Kernel::Avx2);

        let mut decoded_scalar = vec![0u8; code.k()];
        let mut decoded_avx2 = vec![0u8; code.k()];
        scalar.decode(&llr, &mut decoded_scalar, Precision::Int8, None).unwrap();
        avx2.decode(&llr, &mut decoded_avx2, Precision::Int8, None).unwrap();
        assert_eq!(decoded_scalar, decoded_avx2);
        assert_eq!(decoded_scalar, info);
    }
}
