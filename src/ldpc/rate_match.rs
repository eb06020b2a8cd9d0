//! LDPC rate matching / dematching (C4): circular-buffer bit selection on
//! tx, soft combining and filler re-insertion on rx (spec.md §4.4).
//!
//! `k0`, the circular-buffer starting offset per redundancy version, is
//! given in closed form (3GPP TS 38.212 §5.4.2.1) as
//! `floor(x(rv) * (Ncb/Z) / d) * Z`, where `d` is the base graph's full
//! systematic-plus-parity row count in units of `Z` (`bg.n_punctured()`:
//! 66 for BG1, 50 for BG2) and `Ncb = min(N, Nref)` is the limited circular
//! buffer size. When `Nref` is unset (or at least as large as `N`), `Ncb = N`
//! and `Ncb/Z == d` exactly, so the formula collapses to `x(rv) * Z` -- the
//! small integer multiples below.

use crate::base_graph::{BaseGraphKind, LiftingSize};
use crate::error::{FecError, Result};
use std::ops::Range;

/// `k0(rv)` numerator as a fraction of `Ncb/Z` (3GPP TS 38.212 Table 5.4.2.1-2).
const K0_NUMERATOR_BG1: [usize; 4] = [0, 17, 33, 56];
const K0_NUMERATOR_BG2: [usize; 4] = [0, 13, 25, 43];

fn k0_numerator(bg: BaseGraphKind, rv: u8) -> Result<usize> {
    let table = match bg {
        BaseGraphKind::Bg1 => &K0_NUMERATOR_BG1,
        BaseGraphKind::Bg2 => &K0_NUMERATOR_BG2,
    };
    table.get(rv as usize).copied().ok_or(FecError::InvalidParameter {
        what: format!("redundancy version {rv} is not in 0..=3"),
    })
}

/// Modulation orders this crate's rate matcher supports: BPSK, QPSK, 16/64/256-QAM.
const SUPPORTED_QM: [u8; 5] = [1, 2, 4, 6, 8];

/// Number of check-node layers a decoder needs to cover a rate-matched
/// length `e` (spec.md §4.5), shared between rx dematching and the decoder.
pub fn n_layers_for(bg: BaseGraphKind, z: LiftingSize, e: usize) -> usize {
    let zval = z.value();
    let bg_k = bg.bg_k();
    let bg_m = bg.m();
    let raw = e.div_ceil(zval) as i64 - bg_k as i64 + 2;
    raw.clamp(4, bg_m as i64) as usize
}

/// Clamps a requested rate-matched length into the valid range for `(bg, z)`
/// and rounds it up to a multiple of `Z` (spec.md §4.3's encoder contract).
pub fn clamp_e(bg: BaseGraphKind, z: LiftingSize, e: usize) -> usize {
    let zval = z.value();
    let lower = (bg.bg_k() + 2) * zval;
    let upper = bg.n_full() * zval - 2 * zval;
    let clamped = e.clamp(lower, upper);
    clamped.div_ceil(zval) * zval
}

/// A strong positive LLR standing in for a filler bit, known with certainty
/// to be `0` (negative-is-one convention, matching `ldpc::decoder`).
pub const FILLER_LLR: f32 = 1.0e6;
/// Int16 equivalent of [`FILLER_LLR`]: the representation's own `+infinity`.
pub const FILLER_LLR_I16: i16 = i16::MAX;
/// Int8 equivalent of [`FILLER_LLR`]: the representation's own `+infinity`.
pub const FILLER_LLR_I8: i8 = i8::MAX;

/// A soft value the rate dematcher can combine across repeated
/// transmissions and seed with a filler sentinel, implemented once per LLR
/// representation (spec.md §4.4: "three LLR types -- float, int16, int8").
pub trait Combinable: Copy {
    fn filler() -> Self;
    fn zero() -> Self;
    fn combine(self, other: Self) -> Self;
}

impl Combinable for f32 {
    fn filler() -> Self {
        FILLER_LLR
    }
    fn zero() -> Self {
        0.0
    }
    fn combine(self, other: Self) -> Self {
        self + other
    }
}

impl Combinable for i16 {
    fn filler() -> Self {
        FILLER_LLR_I16
    }
    fn zero() -> Self {
        0
    }
    fn combine(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

impl Combinable for i8 {
    fn filler() -> Self {
        FILLER_LLR_I8
    }
    fn zero() -> Self {
        0
    }
    fn combine(self, other: Self) -> Self {
        self.saturating_add(other)
    }
}

pub struct RateMatcher {
    bg: BaseGraphKind,
    z: LiftingSize,
    filler_bits: usize,
    qm: u8,
    nref: Option<usize>,
}

impl RateMatcher {
    /// `qm` is the modulation order (bits per symbol: 1, 2, 4, 6, or 8);
    /// `nref` is the limited circular-buffer size `Nref`, or `None` for the
    /// unlimited buffer (`Ncb = N`). Both are immutable per spec.md §3's
    /// state list for rate matching (`E, N, K, F, Z, k0, Qm, Nref, BG`).
    pub fn new(bg: BaseGraphKind, z: LiftingSize, filler_bits: usize, qm: u8, nref: Option<usize>) -> Result<Self> {
        let k_sys = bg.bg_k() * z.value();
        if filler_bits > k_sys {
            return Err(FecError::InvalidParameter {
                what: format!("filler_bits {filler_bits} exceeds K={k_sys}"),
            });
        }
        if !SUPPORTED_QM.contains(&qm) {
            return Err(FecError::InvalidParameter {
                what: format!("unsupported modulation order Qm={qm}"),
            });
        }
        Ok(RateMatcher {
            bg,
            z,
            filler_bits,
            qm,
            nref,
        })
    }

    pub fn qm(&self) -> u8 {
        self.qm
    }

    pub fn nref(&self) -> Option<usize> {
        self.nref
    }

    /// `Ncb = min(N, Nref)`, the circular buffer's actual span.
    pub fn ncb(&self) -> usize {
        let n = self.bg.n_punctured() * self.z.value();
        match self.nref {
            Some(nref) => n.min(nref),
            None => n,
        }
    }

    fn k0(&self, rv: u8) -> Result<usize> {
        let x = k0_numerator(self.bg, rv)?;
        let zval = self.z.value() as u64;
        let d = self.bg.n_punctured() as u64;
        let ncb_over_z = self.ncb() as u64 / zval;
        let k0_multiple = (x as u64 * ncb_over_z) / d;
        Ok((k0_multiple * zval) as usize)
    }

    /// Codeword-domain index range occupied by filler bits: the last
    /// `filler_bits` systematic positions, excluding the two punctured nodes.
    fn filler_range(&self) -> Range<usize> {
        let k_sys = self.bg.bg_k() * self.z.value();
        let punctured = 2 * self.z.value();
        let start = k_sys.saturating_sub(self.filler_bits).saturating_sub(punctured);
        let end = k_sys.saturating_sub(punctured);
        start..end
    }

    fn check_qm_multiple(&self, e: usize) -> Result<()> {
        if e % self.qm as usize != 0 {
            return Err(FecError::InvalidParameter {
                what: format!("E={e} is not a multiple of Qm={}", self.qm),
            });
        }
        Ok(())
    }

    /// Selects `e` output bits from the encoder's codeword (length `N`) via
    /// the circular buffer of size `Ncb`, starting at `k0(rv)`, skipping
    /// filler positions.
    pub fn match_tx(&self, codeword: &[u8], rv: u8, e: usize) -> Result<Vec<u8>> {
        let n = self.bg.n_punctured() * self.z.value();
        if codeword.len() != n {
            return Err(FecError::LengthMismatch {
                what: "rate matcher codeword".into(),
                expected: n,
                got: codeword.len(),
            });
        }
        self.check_qm_multiple(e)?;
        let ncb = self.ncb();
        let k0 = self.k0(rv)?;
        let filler = self.filler_range();

        let mut out = Vec::with_capacity(e);
        let mut k = k0;
        let mut guard = 0usize;
        while out.len() < e {
            let idx = k % ncb;
            if !filler.contains(&idx) {
                out.push(codeword[idx]);
            }
            k += 1;
            guard += 1;
            if guard > e + ncb {
                return Err(FecError::Resource {
                    what: "rate matcher circular buffer made no progress".into(),
                });
            }
        }
        Ok(out)
    }

    /// Inverse of [`Self::match_tx`]: spreads `rx` (length `e`) back onto
    /// the codeword-domain buffer (length `N`), soft-combining repeats and
    /// re-inserting a filler sentinel at filler positions.
    pub fn match_rx_generic<T: Combinable>(&self, rx: &[T], rv: u8, e: usize) -> Result<Vec<T>> {
        let n = self.bg.n_punctured() * self.z.value();
        if rx.len() != e {
            return Err(FecError::LengthMismatch {
                what: "rate dematcher rx".into(),
                expected: e,
                got: rx.len(),
            });
        }
        self.check_qm_multiple(e)?;
        let ncb = self.ncb();
        let k0 = self.k0(rv)?;
        let filler = self.filler_range();

        let mut out = vec![T::zero(); n];
        for idx in filler.clone() {
            out[idx] = T::filler();
        }

        let mut k = k0;
        let mut i = 0usize;
        let mut guard = 0usize;
        while i < rx.len() {
            let idx = k % ncb;
            if !filler.contains(&idx) {
                out[idx] = out[idx].combine(rx[i]);
                i += 1;
            }
            k += 1;
            guard += 1;
            if guard > e + ncb {
                return Err(FecError::Resource {
                    what: "rate dematcher circular buffer made no progress".into(),
                });
            }
        }
        Ok(out)
    }

    pub fn match_rx(&self, rx_llr: &[f32], rv: u8, e: usize) -> Result<Vec<f32>> {
        self.match_rx_generic(rx_llr, rv, e)
    }

    pub fn match_rx_i16(&self, rx_llr: &[i16], rv: u8, e: usize) -> Result<Vec<i16>> {
        self.match_rx_generic(rx_llr, rv, e)
    }

    pub fn match_rx_i8(&self, rx_llr: &[i8], rv: u8, e: usize) -> Result<Vec<i8>> {
        self.match_rx_generic(rx_llr, rv, e)
    }

}
