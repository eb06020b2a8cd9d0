//! LDPC encoder (C3): message -> full-length, punctured codeword (spec.md §4.3).
//!
//! The four high-rate parity nodes are produced by the closed-form relations
//! quoted in spec.md §4.3 rather than by walking the generic protograph --
//! `aux0..aux3` are recomputed here directly from `base_graph::generator_support`
//! /`systematic_shift`, the same primitives `base_graph::expand` used to build
//! row 1 of the decoder's table, so the two agree by construction (see
//! `DESIGN.md` and the note on `base_graph`'s module doc-comment).

use crate::base_graph::{self, BaseGraphKind, HighRateCase, LiftingSize};
use crate::bits::effective;
use crate::error::{FecError, Result};
use crate::simd::{doubled, xor_rotate, Kernel};

/// Lifted 5G NR LDPC encoder for a fixed `(BaseGraphKind, LiftingSize)`.
pub struct LdpcEncoder {
    bg: BaseGraphKind,
    z: LiftingSize,
    kernel: Kernel,
}

impl LdpcEncoder {
    pub fn new(bg: BaseGraphKind, z: LiftingSize) -> Result<Self> {
        Self::with_kernel(bg, z, Kernel::best_available())
    }

    pub fn with_kernel(bg: BaseGraphKind, z: LiftingSize, kernel: Kernel) -> Result<Self> {
        Ok(LdpcEncoder { bg, z, kernel })
    }

    pub fn bg(&self) -> BaseGraphKind {
        self.bg
    }

    pub fn z(&self) -> LiftingSize {
        self.z
    }

    /// `K = bgK * Z`, the systematic message length this instance expects.
    pub fn k(&self) -> usize {
        self.bg.bg_k() * self.z.value()
    }

    /// `N = (n_full - 2) * Z`, the punctured codeword length this instance produces.
    pub fn n(&self) -> usize {
        self.bg.n_punctured() * self.z.value()
    }

    /// Encodes `message` (length `K`, one byte per bit, `FILLER_BIT` allowed)
    /// into `codeword` (length `N`, one byte per bit, `0`/`1` only).
    ///
    /// `e` is the rate-matched length the caller actually needs (spec.md
    /// §4.3/§6's `encode(msg, out, E)`): only as many extension-row parity
    /// nodes as `e` requires are computed, mirroring the reference encoder's
    /// `cdwd_rm_length` truncation (`original_source/lib/src/phy/fec/ldpc/
    /// ldpc_encoder.c`). `codeword` is still sized for the full punctured
    /// length `N`; positions beyond what `e` needs are left `0`.
    pub fn encode(&self, message: &[u8], codeword: &mut [u8], e: usize) -> Result<()> {
        let zval = self.z.value();
        let bg_k = self.bg.bg_k();
        let set_index = self.z.set_index();
        let n_layers = super::rate_match::n_layers_for(self.bg, self.z, e);

        if message.len() != self.k() {
            return Err(FecError::LengthMismatch {
                what: "ldpc encoder message".into(),
                expected: self.k(),
                got: message.len(),
            });
        }
        if codeword.len() != self.n() {
            return Err(FecError::LengthMismatch {
                what: "ldpc encoder codeword".into(),
                expected: self.n(),
                got: codeword.len(),
            });
        }
        codeword.fill(0);

        let node = |k: usize| -> &[u8] { &message[k * zval..(k + 1) * zval] };
        let rotate_into = |acc: &mut [u8], k: usize, shift: u16| {
            let src: Vec<u8> = node(k).iter().map(|&b| effective(b)).collect();
            let dbl = doubled(&src);
            xor_rotate(self.kernel, acc, &dbl, shift as usize % zval, zval);
        };

        // Systematic part of the codeword: message[2Z..K], filler collapsed to 0.
        for k in 2..bg_k {
            let out = &mut codeword[(k - 2) * zval..(k - 1) * zval];
            for (o, &b) in out.iter_mut().zip(node(k).iter()) {
                *o = effective(b);
            }
        }

        // aux0..aux3 from the two-column generator supports (base_graph's g[0..3]).
        let mut aux = [vec![0u8; zval], vec![0u8; zval], vec![0u8; zval], vec![0u8; zval]];
        for (row, aux_row) in aux.iter_mut().enumerate() {
            for &c in base_graph::generator_support(row).iter() {
                let shift = base_graph::systematic_shift(self.bg, set_index, row, c, zval as u16);
                rotate_into(aux_row, c, shift);
            }
        }

        let case = base_graph::high_rate_case(self.bg, set_index);

        // aux0^aux1^aux2^aux3, the quantity row 1 (the union row) checks against p0.
        let mut aux_sum = aux[0].clone();
        for a in &aux[1..] {
            for (s, v) in aux_sum.iter_mut().zip(a.iter()) {
                *s ^= v;
            }
        }
        let rotate = |src: &[u8], shift: u16| -> Vec<u8> {
            let mut out = vec![0u8; zval];
            let dbl = doubled(src);
            xor_rotate(self.kernel, &mut out, &dbl, shift as usize % zval, zval);
            out
        };

        // Each case solves the same 4-row cycle (rows 0..3 of base_graph), but
        // row 1's shift on p0 (direct vs. rotated) moves the rotation between
        // p0 itself and the p1/p3 terms derived from it; see DESIGN.md.
        let (p0, p1, p3) = match case {
            HighRateCase::Case1 => {
                let rc1 = base_graph::rotate_complement(1, zval as u16);
                let p0 = aux_sum;
                let t = rotate(&p0, rc1);
                let p1: Vec<u8> = aux[0].iter().zip(t.iter()).map(|(a, b)| a ^ b).collect();
                let p3: Vec<u8> = aux[3].iter().zip(t.iter()).map(|(a, b)| a ^ b).collect();
                (p0, p1, p3)
            }
            HighRateCase::Case2Bg1Set6 => {
                let rot = 105u16 % zval as u16;
                let p0 = rotate(&aux_sum, rot);
                let p1: Vec<u8> = aux[0].iter().zip(p0.iter()).map(|(a, b)| a ^ b).collect();
                let p3: Vec<u8> = aux[3].iter().zip(p0.iter()).map(|(a, b)| a ^ b).collect();
                (p0, p1, p3)
            }
            HighRateCase::Case3 => {
                let p0 = rotate(&aux_sum, 1);
                let p1: Vec<u8> = aux[0].iter().zip(p0.iter()).map(|(a, b)| a ^ b).collect();
                let p3: Vec<u8> = aux[3].iter().zip(p0.iter()).map(|(a, b)| a ^ b).collect();
                (p0, p1, p3)
            }
            HighRateCase::Case4Bg2Special => {
                let rc1 = base_graph::rotate_complement(1, zval as u16);
                let p0 = aux_sum;
                let t = rotate(&p0, rc1);
                let p1: Vec<u8> = aux[0].iter().zip(t.iter()).map(|(a, b)| a ^ b).collect();
                let p3: Vec<u8> = aux[3].iter().zip(t.iter()).map(|(a, b)| a ^ b).collect();
                (p0, p1, p3)
            }
        };

        // p2 closes the remaining cycle: through p3 for BG1 (row 2 = generator 2
        // + {p2,p3}), through p1 for BG2 (row 2 = generator 1 + {p1,p2}).
        let p2: Vec<u8> = match case {
            HighRateCase::Case1 | HighRateCase::Case2Bg1Set6 => {
                aux[2].iter().zip(p3.iter()).map(|(a, b)| a ^ b).collect()
            }
            HighRateCase::Case3 | HighRateCase::Case4Bg2Special => {
                aux[1].iter().zip(p1.iter()).map(|(a, b)| a ^ b).collect()
            }
        };

        let parity = [&p0, &p1, &p2, &p3];
        for (i, p) in parity.iter().enumerate() {
            let k = bg_k + i;
            codeword[(k - 2) * zval..(k - 1) * zval].copy_from_slice(p);
        }

        // Extension rows: parity_row = aux_row XOR p0, only as many as `e` needs.
        let p0_dbl = doubled(&p0);
        for row in 4..n_layers {
            let mut aux_row = vec![0u8; zval];
            for &c in base_graph::extension_support(self.bg, row).iter() {
                let shift = base_graph::systematic_shift(self.bg, set_index, row, c, zval as u16);
                rotate_into(&mut aux_row, c, shift);
            }
            xor_rotate(self.kernel, &mut aux_row, &p0_dbl, 0, zval);
            let k = bg_k + row;
            codeword[(k - 2) * zval..(k - 1) * zval].copy_from_slice(&aux_row);
        }

        Ok(())
    }
}
