//! Polar encoder: information bits -> length-`N` codeword via the iterative
//! Arikan butterfly transform `x = u * F^{⊗log2n}`, `F = [[1,0],[1,1]]`.

use super::PolarCode;
use crate::error::{FecError, Result};
use crate::simd::Kernel;

pub struct PolarEncoder<'a> {
    code: &'a PolarCode,
    kernel: Kernel,
}

impl<'a> PolarEncoder<'a> {
    pub fn new(code: &'a PolarCode) -> Self {
        Self::with_kernel(code, Kernel::best_available())
    }

    pub fn with_kernel(code: &'a PolarCode, kernel: Kernel) -> Self {
        PolarEncoder { code, kernel }
    }

    /// Encodes `info` (length `K`) into `codeword` (length `N`).
    pub fn encode(&self, info: &[u8], codeword: &mut [u8]) -> Result<()> {
        if info.len() != self.code.k() {
            return Err(FecError::LengthMismatch {
                what: "polar encoder info".into(),
                expected: self.code.k(),
                got: info.len(),
            });
        }
        if codeword.len() != self.code.n() {
            return Err(FecError::LengthMismatch {
                what: "polar encoder codeword".into(),
                expected: self.code.n(),
                got: codeword.len(),
            });
        }

        let mut info_iter = info.iter();
        for (i, slot) in codeword.iter_mut().enumerate() {
            *slot = if self.code.is_frozen(i) {
                0
            } else {
                *info_iter.next().expect("k() positions already length-checked")
            };
        }

        encode_in_place_with_kernel(codeword, self.kernel);
        Ok(())
    }
}

/// The butterfly transform alone, `x = u * F^{⊗log2n}` in place over `u`,
/// using the scalar path (the SSC decoder's recursive recomputation at
/// Rate-1 nodes runs on buffers too small to make dispatch worth the call's
/// own overhead -- see `with_kernel`/`encode_in_place_with_kernel` for the
/// dispatched form used at the top-level encode).
///
/// Exposed so the SSC decoder (`polar::decoder`) can recover a Rate-1
/// subtree's actual message bits from its raw hard LLR decisions (`F` is its
/// own inverse, so one more application of the same transform turns the
/// hard-decided combined bits back into the information bits), the way the
/// reference SSC decoder reuses its encoder at Rate-1 nodes instead of
/// recursing further.
pub(crate) fn encode_in_place(bits: &mut [u8]) {
    encode_in_place_with_kernel(bits, Kernel::Scalar);
}

/// Same transform, dispatched through `kernel` for the butterfly stage's
/// pairwise XOR (spec.md §4.6: scalar, AVX2 small/large).
pub(crate) fn encode_in_place_with_kernel(bits: &mut [u8], kernel: Kernel) {
    let n = bits.len();
    let mut m = 1;
    while m < n {
        let mut i = 0;
        while i < n {
            let (left, right) = bits.split_at_mut(i + m);
            crate::simd::xor_into(kernel, &mut left[i..i + m], &right[..m]);
            i += 2 * m;
        }
        m *= 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_info_gives_all_zero_codeword() {
        let code = PolarCode::new(3, &[0, 1, 2, 4]).unwrap();
        let enc = PolarEncoder::new(&code);
        let info = vec![0u8; code.k()];
        let mut codeword = vec![0u8; code.n()];
        enc.encode(&info, &mut codeword).unwrap();
        assert!(codeword.iter().all(|&b| b == 0));
    }

    #[test]
    fn single_info_bit_matches_hand_computed_rows() {
        // N=4, frozen={0}: info fills positions 1,2,3.
        let code = PolarCode::new(2, &[0]).unwrap();
        let enc = PolarEncoder::new(&code);
        let mut codeword = vec![0u8; code.n()];
        enc.encode(&[0, 0, 1], &mut codeword).unwrap();
        // u = [0,0,0,1]; G4 row 3 (0-indexed) is [1,1,1,1].
        assert_eq!(codeword, vec![1, 1, 1, 1]);
    }

    #[test]
    fn encode_rejects_wrong_lengths() {
        let code = PolarCode::new(3, &[0, 1]).unwrap();
        let enc = PolarEncoder::new(&code);
        let info = vec![0u8; code.k() + 1];
        let mut codeword = vec![0u8; code.n()];
        assert!(enc.encode(&info, &mut codeword).is_err());
    }
}
