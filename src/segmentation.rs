//! Code-block segmentation (C2): selects base-graph-dependent lifting size,
//! code-block count, and filler-bit count for a transport block (spec.md §4.2).

use crate::base_graph::{BaseGraphKind, LiftingSize};
use crate::error::{FecError, Result};

/// Result of segmenting one transport block for a given base graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlockSegmentation {
    pub tbs: usize,
    pub l_tb: usize,
    pub l_cb: usize,
    pub num_cb: usize,
    pub filler_bits: usize,
    pub z: LiftingSize,
    pub k: usize,
}

impl CodeBlockSegmentation {
    /// `segment(bg, tbs)` of spec.md §4.2.
    pub fn of(bg: BaseGraphKind, tbs: usize) -> Result<Self> {
        if tbs == 0 {
            return Err(FecError::InvalidParameter {
                what: "tbs must be non-zero".into(),
            });
        }

        let l_tb = if tbs <= 3824 { 16 } else { 24 };
        let k_cb = bg.max_cb_len();
        let b = tbs + l_tb;

        let (num_cb, b_prime) = if b <= k_cb {
            (1usize, b)
        } else {
            let num_cb = b.div_ceil(k_cb - 24);
            (num_cb, b + 24 * num_cb)
        };

        let l_cb = if num_cb == 1 { 0 } else { 24 };
        let k_prime = b_prime / num_cb;

        let k_b = bg.k_b(b);
        let z = LiftingSize::smallest_for(k_b, k_prime)?;

        let k = match bg {
            BaseGraphKind::Bg1 => 22 * z.value(),
            BaseGraphKind::Bg2 => 10 * z.value(),
        };
        let filler_bits = k * num_cb - b_prime;

        Ok(CodeBlockSegmentation {
            tbs,
            l_tb,
            l_cb,
            num_cb,
            filler_bits,
            z,
            k,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_cb_small_tbs() {
        // S4: tbs = 100 -> C = 1, F = K - (100 + 16).
        let seg = CodeBlockSegmentation::of(BaseGraphKind::Bg1, 100).unwrap();
        assert_eq!(seg.num_cb, 1);
        assert_eq!(seg.l_tb, 16);
        assert_eq!(seg.l_cb, 0);
        assert_eq!(seg.filler_bits, seg.k - (100 + 16));
    }

    #[test]
    fn multi_cb_large_tbs() {
        // S4: tbs = 8500 -> C = 2, F = K*C - (8500 + 24 + 2*24).
        let seg = CodeBlockSegmentation::of(BaseGraphKind::Bg1, 8500).unwrap();
        assert_eq!(seg.num_cb, 2);
        assert_eq!(seg.l_tb, 24);
        assert_eq!(seg.l_cb, 24);
        assert_eq!(seg.filler_bits, seg.k * seg.num_cb - (8500 + 24 + 2 * 24));
    }

    #[test]
    fn invariant_single_cb_means_no_cb_crc() {
        for tbs in [8, 40, 3000, 3824] {
            let seg = CodeBlockSegmentation::of(BaseGraphKind::Bg1, tbs).unwrap();
            if seg.num_cb == 1 {
                assert_eq!(seg.l_cb, 0);
            } else {
                assert_eq!(seg.l_cb, 24);
            }
        }
    }

    #[test]
    fn bg2_small_tbs() {
        let seg = CodeBlockSegmentation::of(BaseGraphKind::Bg2, 50).unwrap();
        assert_eq!(seg.num_cb, 1);
        assert_eq!(seg.k, 10 * seg.z.value());
    }
}
