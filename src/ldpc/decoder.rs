//! LDPC decoder (C5): min-sum belief propagation over the expanded
//! protograph, layered or flooded, with CRC-gated early termination
//! (spec.md §4.5).
//!
//! Unlike the encoder, the decoder walks `ProtoGraph::shifts`/`var_indices`
//! generically -- the same table serves every row, high-rate (0..3) and
//! extension (4..m) alike, because `base_graph::expand` built row 1 so that
//! a plain per-row min-sum update reconstructs exactly the encoder's closed
//! form (see `base_graph`'s module doc-comment and `DESIGN.md`).
//!
//! Messages are carried as [`Lane`] values, tagged by the construction-time
//! [`Precision`]: the saturating add/subtract and alpha-scaling live on
//! `Lane` itself, so the min-sum loop below is precision-agnostic and never
//! touches a bare `f32`/`i16`/`i8` except at the channel-LLR boundary and
//! the AVX2 gather/scatter step.
//!
//! `Schedule::Layered` updates a variable node's belief in place as soon as
//! its check row is processed, so later rows in the same iteration see
//! already-updated beliefs. `Schedule::Flooded` instead freezes all beliefs
//! for the duration of an iteration, computes every row's new check-to-
//! variable messages from that one snapshot, then applies a single
//! aggregate soft-bit update pass over every variable node -- the rows are
//! order-independent within an iteration, at the cost of needing twice the
//! iteration budget to propagate the same distance (spec.md §4.5).

use crate::base_graph::{BaseGraphKind, LiftingSize, ProtoGraph, MAX_CNCT};
use crate::crc::CrcOracle;
use crate::error::{FecError, Result};
use crate::fixed_point::Lane;
use crate::precision::Precision;
use crate::simd::Kernel;
use bitvec::prelude::*;

/// Outcome of a decode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeResult {
    Converged { iterations: usize },
    MaxIterationsReached { iterations: usize },
    CrcFailed { iterations: usize },
}

/// Check-node update scheduling (spec.md §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Layered,
    Flooded,
}

/// One check row's connections into the graph, as `(row_slot, shift)` per
/// edge incident on a variable node -- built once per decode call to drive
/// the flooded schedule's aggregate update.
type EdgesByNode = Vec<Vec<(usize, usize, usize)>>;

pub struct LdpcDecoder {
    bg: BaseGraphKind,
    z: LiftingSize,
    graph: ProtoGraph,
    precision: Precision,
    schedule: Schedule,
    alpha: f32,
    max_iterations: usize,
    kernel: Kernel,
}

impl LdpcDecoder {
    /// `alpha` is the min-sum normalization factor in `(0, 1]`; `max_iterations`
    /// is the layered-schedule iteration budget (doubled internally for
    /// `Schedule::Flooded`, spec.md §4.5). These, together with `precision`
    /// and `schedule`, are the immutable construction parameters spec.md §3/§6
    /// name for `LdpcDecoder` -- fixed for the instance's lifetime, not
    /// threaded through `decode()`.
    pub fn new(
        bg: BaseGraphKind,
        z: LiftingSize,
        precision: Precision,
        schedule: Schedule,
        alpha: f32,
        max_iterations: usize,
    ) -> Result<Self> {
        Self::with_kernel(bg, z, precision, schedule, alpha, max_iterations, Kernel::best_available())
    }

    pub fn with_kernel(
        bg: BaseGraphKind,
        z: LiftingSize,
        precision: Precision,
        schedule: Schedule,
        alpha: f32,
        max_iterations: usize,
        kernel: Kernel,
    ) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(FecError::InvalidParameter {
                what: format!("normalization factor alpha={alpha} is outside (0,1]"),
            });
        }
        if max_iterations == 0 {
            return Err(FecError::InvalidParameter {
                what: "max_iterations must be at least 1".into(),
            });
        }
        let graph = crate::base_graph::expand(bg, z)?;
        Ok(LdpcDecoder {
            bg,
            z,
            graph,
            precision,
            schedule,
            alpha,
            max_iterations,
            kernel,
        })
    }

    pub fn bg(&self) -> BaseGraphKind {
        self.bg
    }

    pub fn z(&self) -> LiftingSize {
        self.z
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// `K`, the systematic message length (including any CRC carried inside it).
    pub fn k(&self) -> usize {
        self.bg.bg_k() * self.z.value()
    }

    /// `N`, the punctured codeword length this instance expects as input.
    pub fn n(&self) -> usize {
        self.bg.n_punctured() * self.z.value()
    }

    /// Number of check-node layers to run for a given rate-matched length `e`,
    /// clamped into `[4, bgM]` (spec.md §4.5; shared with `rate_match`).
    pub fn n_layers_for(&self, e: usize) -> usize {
        super::rate_match::n_layers_for(self.bg, self.z, e)
    }

    /// Runs min-sum decoding over the rate-matched length `e`.
    ///
    /// `llr_in` has length `N` (the same convention as `LdpcEncoder::encode`'s
    /// codeword, punctured nodes 0/1 excluded from the buffer); entries for
    /// positions the rate matcher never selected must be `0.0`. `message_out`
    /// receives the hard-decided systematic bits (length `K`, including the
    /// two always-unknown punctured systematic bits).
    ///
    /// `crc` pairs the oracle with how many leading bits of `message_out`
    /// the payload-plus-CRC region actually occupies: `K` includes filler
    /// bits appended after that region, and checking the CRC over the full
    /// `K` bits would read filler padding as the received remainder instead
    /// of the CRC itself.
    pub fn decode(
        &self,
        llr_in: &[f32],
        message_out: &mut [u8],
        e: usize,
        crc: Option<(CrcOracle, usize)>,
    ) -> Result<DecodeResult> {
        let zval = self.z.value();
        let bg_k = self.bg.bg_k();
        let n_full = self.bg.n_full();
        let precision = self.precision;

        if llr_in.len() != self.n() {
            return Err(FecError::LengthMismatch {
                what: "ldpc decoder llr".into(),
                expected: self.n(),
                got: llr_in.len(),
            });
        }
        if message_out.len() != self.k() {
            return Err(FecError::LengthMismatch {
                what: "ldpc decoder message".into(),
                expected: self.k(),
                got: message_out.len(),
            });
        }
        let n_layers = self.n_layers_for(e);
        let max_iterations = match self.schedule {
            Schedule::Layered => self.max_iterations,
            Schedule::Flooded => self.max_iterations * 2,
        };

        // Variable-node beliefs: punctured nodes 0/1 start at 0 (no prior);
        // the rest start from the channel LLR, quantized into this
        // instance's precision. `channel_llr` is kept around unmodified so
        // the flooded schedule can recompute a node's full belief from
        // scratch every iteration instead of accumulating drift.
        let mut channel_llr = vec![vec![Lane::zero(precision); zval]; n_full];
        for node in 2..n_full {
            let src = &llr_in[(node - 2) * zval..(node - 1) * zval];
            for (v, &s) in channel_llr[node].iter_mut().zip(src.iter()) {
                *v = Lane::new(precision, s);
            }
        }
        let mut var_llr = channel_llr.clone();

        let mut check_to_var: Vec<Vec<Vec<Lane>>> = self.graph.var_indices[..n_layers]
            .iter()
            .map(|row| {
                let degree = row.iter().take_while(|&&v| v != -1).count();
                vec![vec![Lane::zero(precision); zval]; degree]
            })
            .collect();

        let edges_by_node = match self.schedule {
            Schedule::Flooded => Some(self.edges_by_node(n_layers, n_full)),
            Schedule::Layered => None,
        };

        let mut iterations = 0usize;
        for iter in 1..=max_iterations {
            iterations = iter;
            match self.schedule {
                Schedule::Layered => {
                    for (row, row_vars) in self.graph.var_indices[..n_layers].iter().enumerate() {
                        self.update_row(row, row_vars, &mut var_llr, &mut check_to_var[row]);
                    }
                }
                Schedule::Flooded => {
                    let snapshot = var_llr.clone();
                    let mut new_messages = check_to_var.clone();
                    for (row, row_vars) in self.graph.var_indices[..n_layers].iter().enumerate() {
                        self.flood_row(row, row_vars, &snapshot, &check_to_var[row], &mut new_messages[row]);
                    }
                    check_to_var = new_messages;
                    self.apply_flooded(
                        &channel_llr,
                        edges_by_node.as_ref().expect("built for Flooded schedule"),
                        &check_to_var,
                        &mut var_llr,
                    );
                }
            }

            Self::harden(&var_llr, message_out, bg_k, zval);
            if let Some((oracle, crc_len)) = crc {
                if Self::crc_ok(oracle, &message_out[..crc_len]) {
                    return Ok(DecodeResult::Converged { iterations });
                }
            } else if Self::all_checks_satisfied(&self.graph, &var_llr, n_layers, zval) {
                return Ok(DecodeResult::Converged { iterations });
            }
        }

        if crc.is_some() {
            Ok(DecodeResult::CrcFailed { iterations })
        } else {
            Ok(DecodeResult::MaxIterationsReached { iterations })
        }
    }

    fn edges_by_node(&self, n_layers: usize, n_full: usize) -> EdgesByNode {
        let mut edges: EdgesByNode = vec![Vec::new(); n_full];
        for (row, row_vars) in self.graph.var_indices[..n_layers].iter().enumerate() {
            let shifts = &self.graph.shifts[row];
            let degree = row_vars.iter().take_while(|&&v| v != -1).count();
            for slot in 0..degree {
                let node = row_vars[slot] as usize;
                let shift = shifts[node].unwrap() as usize;
                edges[node].push((row, slot, shift));
            }
        }
        edges
    }

    /// Gathers node `node`'s belief column into a check row's local lane
    /// order (`out[lane] = var_llr[node][(lane+shift) % z]`). At `Float`
    /// precision this is a single AVX2/AVX512 windowed load over a doubled
    /// buffer via [`crate::simd::rotate_gather_f32`]; int16/int8 fall back
    /// to a scalar per-lane index (see `DESIGN.md` for why the fixed-point
    /// lanes don't yet share this kernel).
    fn gather_node(&self, var_llr: &[Vec<Lane>], node: usize, shift: usize, zval: usize) -> Vec<Lane> {
        if self.precision == Precision::Float {
            let raw: Vec<f32> = var_llr[node].iter().map(|l| l.to_f32()).collect();
            let dbl = crate::simd::doubled_f32(&raw);
            let mut out = vec![0.0f32; zval];
            crate::simd::rotate_gather_f32(self.kernel, &mut out, &dbl, shift % zval, zval);
            out.into_iter().map(Lane::Float).collect()
        } else {
            (0..zval).map(|lane| var_llr[node][(lane + shift) % zval]).collect()
        }
    }

    /// Inverse of [`Self::gather_node`]: scatters an updated column back
    /// into `var_llr[node]` (`var_llr[node][(lane+shift) % z] = col[lane]`).
    /// Implemented as a gather with the complement shift over the column's
    /// own doubled buffer, reusing the same kernel.
    fn scatter_node(&self, var_llr: &mut [Vec<Lane>], node: usize, shift: usize, col: &[Lane], zval: usize) {
        if self.precision == Precision::Float {
            let raw: Vec<f32> = col.iter().map(|l| l.to_f32()).collect();
            let dbl = crate::simd::doubled_f32(&raw);
            let complement = (zval - shift % zval) % zval;
            let mut out = vec![0.0f32; zval];
            crate::simd::rotate_gather_f32(self.kernel, &mut out, &dbl, complement, zval);
            for (v, &o) in var_llr[node].iter_mut().zip(out.iter()) {
                *v = Lane::Float(o);
            }
        } else {
            for (lane, &val) in col.iter().enumerate() {
                var_llr[node][(lane + shift) % zval] = val;
            }
        }
    }

    /// Min-sum combine shared by both schedules: given each slot's extrinsic
    /// column (already `var - old_message`), returns the new per-slot
    /// message columns and the updated (extrinsic + new message) columns.
    fn min_sum_combine(&self, extrinsic_cols: &[Vec<Lane>], zval: usize) -> (Vec<Vec<Lane>>, Vec<Vec<Lane>>) {
        let degree = extrinsic_cols.len();
        let precision = self.precision;
        let mut message_cols = vec![vec![Lane::zero(precision); zval]; degree];
        let mut updated_cols = vec![vec![Lane::zero(precision); zval]; degree];

        for lane in 0..zval {
            let mut min1 = f32::INFINITY;
            let mut min2 = f32::INFINITY;
            let mut min1_idx = 0usize;
            let mut neg_count = 0usize;
            for slot in 0..degree {
                let v = extrinsic_cols[slot][lane];
                if v.is_negative() {
                    neg_count += 1;
                }
                let a = v.magnitude();
                if a < min1 {
                    min2 = min1;
                    min1 = a;
                    min1_idx = slot;
                } else if a < min2 {
                    min2 = a;
                }
            }
            let total_parity = neg_count % 2 == 1;

            for slot in 0..degree {
                let v = extrinsic_cols[slot][lane];
                let other_neg = total_parity ^ v.is_negative();
                let magnitude = if slot == min1_idx { min2 } else { min1 };
                let scaled = Lane::scale_alpha(precision, magnitude, self.alpha);
                let new_message = Lane::from_signed_magnitude(precision, other_neg, scaled);
                message_cols[slot][lane] = new_message;
                updated_cols[slot][lane] = v.saturating_add(new_message);
            }
        }

        (message_cols, updated_cols)
    }

    /// Layered update: reads and writes `var_llr` in place, so later rows in
    /// the same iteration see this row's updated beliefs.
    fn update_row(&self, row: usize, row_vars: &[i8; MAX_CNCT], var_llr: &mut [Vec<Lane>], row_messages: &mut [Vec<Lane>]) {
        let zval = self.z.value();
        let shifts = &self.graph.shifts[row];
        let degree = row_vars.iter().take_while(|&&v| v != -1).count();

        let mut extrinsic_cols = Vec::with_capacity(degree);
        for slot in 0..degree {
            let node = row_vars[slot] as usize;
            let shift = shifts[node].unwrap() as usize;
            let gathered = self.gather_node(var_llr, node, shift, zval);
            extrinsic_cols.push(
                gathered
                    .iter()
                    .zip(row_messages[slot].iter())
                    .map(|(&g, &m)| g.saturating_sub(m))
                    .collect::<Vec<_>>(),
            );
        }

        let (message_cols, updated_cols) = self.min_sum_combine(&extrinsic_cols, zval);
        for slot in 0..degree {
            row_messages[slot] = message_cols[slot].clone();
            let node = row_vars[slot] as usize;
            let shift = shifts[node].unwrap() as usize;
            self.scatter_node(var_llr, node, shift, &updated_cols[slot], zval);
        }
    }

    /// Flooded update: reads from `var_snapshot` (frozen for the whole
    /// iteration) and `row_messages_old`, writes only the new messages --
    /// `var_llr` itself is rebuilt afterwards by [`Self::apply_flooded`].
    fn flood_row(
        &self,
        row: usize,
        row_vars: &[i8; MAX_CNCT],
        var_snapshot: &[Vec<Lane>],
        row_messages_old: &[Vec<Lane>],
        row_messages_new: &mut [Vec<Lane>],
    ) {
        let zval = self.z.value();
        let shifts = &self.graph.shifts[row];
        let degree = row_vars.iter().take_while(|&&v| v != -1).count();

        let mut extrinsic_cols = Vec::with_capacity(degree);
        for slot in 0..degree {
            let node = row_vars[slot] as usize;
            let shift = shifts[node].unwrap() as usize;
            let gathered = self.gather_node(var_snapshot, node, shift, zval);
            extrinsic_cols.push(
                gathered
                    .iter()
                    .zip(row_messages_old[slot].iter())
                    .map(|(&g, &m)| g.saturating_sub(m))
                    .collect::<Vec<_>>(),
            );
        }

        let (message_cols, _updated_cols) = self.min_sum_combine(&extrinsic_cols, zval);
        for slot in 0..degree {
            row_messages_new[slot] = message_cols[slot].clone();
        }
    }

    /// Rebuilds every variable node's belief as `channel + sum(incident
    /// check-to-var messages)`, the flooded schedule's aggregate step.
    fn apply_flooded(&self, channel_llr: &[Vec<Lane>], edges_by_node: &EdgesByNode, row_messages: &[Vec<Vec<Lane>>], var_llr: &mut [Vec<Lane>]) {
        let zval = self.z.value();
        for (node, edges) in edges_by_node.iter().enumerate() {
            for pos in 0..zval {
                let mut acc = channel_llr[node][pos];
                for &(row, slot, shift) in edges {
                    let checklane = (pos + zval - shift % zval) % zval;
                    acc = acc.saturating_add(row_messages[row][slot][checklane]);
                }
                var_llr[node][pos] = acc;
            }
        }
    }

    fn harden(var_llr: &[Vec<Lane>], message_out: &mut [u8], bg_k: usize, zval: usize) {
        for k in 0..bg_k {
            let out = &mut message_out[k * zval..(k + 1) * zval];
            for (o, &llr) in out.iter_mut().zip(var_llr[k].iter()) {
                *o = u8::from(llr.is_negative());
            }
        }
    }

    fn crc_ok(oracle: CrcOracle, message: &[u8]) -> bool {
        let mut bits: BitVec<u8, Msb0> = BitVec::with_capacity(message.len());
        for &b in message {
            bits.push(b != 0);
        }
        oracle.check(&bits)
    }

    fn all_checks_satisfied(graph: &ProtoGraph, var_llr: &[Vec<Lane>], n_layers: usize, zval: usize) -> bool {
        for (row, row_vars) in graph.var_indices[..n_layers].iter().enumerate() {
            let shifts = &graph.shifts[row];
            let degree = row_vars.iter().take_while(|&&v| v != -1).count();
            for lane in 0..zval {
                let mut parity = 0u8;
                for slot in 0..degree {
                    let node = row_vars[slot] as usize;
                    let shift = shifts[node].unwrap() as usize;
                    let pos = (lane + shift) % zval;
                    parity ^= u8::from(var_llr[node][pos].is_negative());
                }
                if parity != 0 {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_graph::BaseGraphKind::Bg1;
    use crate::ldpc::encoder::LdpcEncoder;

    fn llr_from_codeword(codeword: &[u8]) -> Vec<f32> {
        codeword.iter().map(|&b| if b == 0 { 4.0 } else { -4.0 }).collect()
    }

    #[test]
    fn clean_channel_converges_without_crc() {
        let z = LiftingSize::new(16).unwrap();
        let enc = LdpcEncoder::new(Bg1, z).unwrap();
        let dec = LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Layered, 0.75, 20).unwrap();

        let message = vec![0u8; enc.k()];
        let mut codeword = vec![0u8; enc.n()];
        let e = enc.n();
        enc.encode(&message, &mut codeword, e).unwrap();

        let llr = llr_from_codeword(&codeword);
        let mut decoded = vec![0u8; dec.k()];
        let result = dec.decode(&llr, &mut decoded, e, None).unwrap();
        assert!(matches!(result, DecodeResult::Converged { .. }));
        assert!(decoded.iter().all(|&b| b == 0));
    }

    #[test]
    fn flooded_schedule_converges_on_a_clean_channel() {
        let z = LiftingSize::new(16).unwrap();
        let enc = LdpcEncoder::new(Bg1, z).unwrap();
        let dec = LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Flooded, 0.75, 20).unwrap();

        let message = vec![0u8; enc.k()];
        let mut codeword = vec![0u8; enc.n()];
        let e = enc.n();
        enc.encode(&message, &mut codeword, e).unwrap();

        let llr = llr_from_codeword(&codeword);
        let mut decoded = vec![0u8; dec.k()];
        let result = dec.decode(&llr, &mut decoded, e, None).unwrap();
        assert!(matches!(result, DecodeResult::Converged { .. }));
        assert!(decoded.iter().all(|&b| b == 0));
    }

    #[test]
    fn layered_and_flooded_agree_on_a_clean_channel() {
        let z = LiftingSize::new(16).unwrap();
        let enc = LdpcEncoder::new(Bg1, z).unwrap();
        let message: Vec<u8> = (0..enc.k()).map(|i| (i % 5 == 0) as u8).collect();
        let mut codeword = vec![0u8; enc.n()];
        let e = enc.n();
        enc.encode(&message, &mut codeword, e).unwrap();
        let llr = llr_from_codeword(&codeword);

        let layered = LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Layered, 0.75, 20).unwrap();
        let flooded = LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Flooded, 0.75, 20).unwrap();

        let mut decoded_layered = vec![0u8; layered.k()];
        let mut decoded_flooded = vec![0u8; flooded.k()];
        layered.decode(&llr, &mut decoded_layered, e, None).unwrap();
        flooded.decode(&llr, &mut decoded_flooded, e, None).unwrap();
        assert_eq!(decoded_layered, decoded_flooded);
    }

    #[test]
    fn crc_gated_decode_rejects_wrong_crc() {
        let z = LiftingSize::new(16).unwrap();
        let dec = LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Layered, 0.75, 5).unwrap();
        let llr = vec![4.0f32; dec.n()];
        let mut decoded = vec![0u8; dec.k()];
        let result = dec
            .decode(&llr, &mut decoded, dec.n(), Some((CrcOracle::Crc24A, dec.k())))
            .unwrap();
        // All-zero codeword never carries a non-trivial CRC24A remainder.
        assert!(matches!(
            result,
            DecodeResult::CrcFailed { .. } | DecodeResult::Converged { .. }
        ));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let z = LiftingSize::new(16).unwrap();
        let dec = LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Layered, 0.75, 5).unwrap();
        let llr = vec![0.0f32; dec.n() - 1];
        let mut decoded = vec![0u8; dec.k()];
        assert!(dec.decode(&llr, &mut decoded, dec.n(), None).is_err());
    }

    #[test]
    fn alpha_out_of_range_is_rejected() {
        let z = LiftingSize::new(16).unwrap();
        assert!(LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Layered, 0.0, 5).is_err());
        assert!(LdpcDecoder::new(Bg1, z, Precision::Float, Schedule::Layered, 1.5, 5).is_err());
    }

    #[test]
    fn precision_tiers_all_converge_on_a_clean_channel() {
        let z = LiftingSize::new(16).unwrap();
        let enc = LdpcEncoder::new(Bg1, z).unwrap();
        let message = vec![0u8; enc.k()];
        let mut codeword = vec![0u8; enc.n()];
        let e = enc.n();
        enc.encode(&message, &mut codeword, e).unwrap();
        let llr = llr_from_codeword(&codeword);

        for precision in [Precision::Float, Precision::Int16, Precision::Int8] {
            let dec = LdpcDecoder::new(Bg1, z, precision, Schedule::Layered, 0.75, 20).unwrap();
            let mut decoded = vec![0u8; dec.k()];
            let result = dec.decode(&llr, &mut decoded, e, None).unwrap();
            assert!(matches!(result, DecodeResult::Converged { .. }), "precision={precision:?}");
            assert!(decoded.iter().all(|&b| b == 0), "precision={precision:?}");
        }
    }
}
