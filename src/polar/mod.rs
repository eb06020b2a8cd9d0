//! 5G NR polar codec (C6): frozen-set definition, Arikan encoder, SSC decoder.
//!
//! Grounded on the Rate-0/Rate-1/Rate-R node typing `original_source`'s polar
//! decoder implements, re-expressed as an ordinary Rust recursion over
//! `&[f32]` slices instead of the reference's explicit stack-based tree walk
//! (spec.md §9 redesign flags: no manual tree/stack management).

pub mod decoder;
pub mod encoder;

pub use decoder::{DecodeResult, PolarDecoder};
pub use encoder::PolarEncoder;

use crate::error::{FecError, Result};

/// A validated polar code: block length `N = 2^log2n` and its frozen set.
#[derive(Debug, Clone)]
pub struct PolarCode {
    log2n: u32,
    /// `frozen[i]` is `true` if bit-channel `i` is frozen (fixed to `0`).
    frozen: Vec<bool>,
}

impl PolarCode {
    /// `log2n` in `1..=10` (spec.md §4.6: `N` up to 1024); `frozen_indices`
    /// must be sorted, unique, and within `0..N`.
    pub fn new(log2n: u32, frozen_indices: &[usize]) -> Result<Self> {
        if !(1..=10).contains(&log2n) {
            return Err(FecError::InvalidParameter {
                what: format!("polar log2(N)={log2n} is outside 1..=10"),
            });
        }
        let n = 1usize << log2n;
        if frozen_indices.windows(2).any(|w| w[0] >= w[1]) {
            return Err(FecError::InvalidFrozenSet {
                what: "frozen indices must be strictly sorted".into(),
            });
        }
        if frozen_indices.iter().any(|&i| i >= n) {
            return Err(FecError::InvalidFrozenSet {
                what: format!("a frozen index is out of range 0..{n}"),
            });
        }
        if frozen_indices.len() >= n {
            return Err(FecError::InvalidFrozenSet {
                what: "frozen set leaves no information bits".into(),
            });
        }

        let mut frozen = vec![false; n];
        for &i in frozen_indices {
            frozen[i] = true;
        }
        Ok(PolarCode { log2n, frozen })
    }

    pub fn n(&self) -> usize {
        1 << self.log2n
    }

    pub fn k(&self) -> usize {
        self.frozen.iter().filter(|&&f| !f).count()
    }

    pub fn is_frozen(&self, i: usize) -> bool {
        self.frozen[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsorted_frozen_set() {
        assert!(PolarCode::new(3, &[2, 1]).is_err());
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert!(PolarCode::new(3, &[8]).is_err());
    }

    #[test]
    fn rejects_fully_frozen_code() {
        let all: Vec<usize> = (0..8).collect();
        assert!(PolarCode::new(3, &all).is_err());
    }

    #[test]
    fn k_counts_non_frozen_positions() {
        let code = PolarCode::new(3, &[0, 1, 2, 4]).unwrap();
        assert_eq!(code.n(), 8);
        assert_eq!(code.k(), 4);
    }
}
