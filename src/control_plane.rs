//! Reference-only control-plane trace (C7): walks a small downlink control
//! message and an uplink data transport block end-to-end through the codec,
//! logging each stage. Exists to exercise the crate the way a scheduler
//! would, not to model 3GPP RRC procedures themselves (spec.md's Non-goals
//! exclude upper-layer signalling logic).

use crate::base_graph::{BaseGraphKind, LiftingSize};
use crate::crc::CrcOracle;
use crate::error::Result;
use crate::ldpc::{LdpcDecoder, LdpcEncoder, Precision as LdpcPrecision, RateMatcher, Schedule};
use crate::polar::decoder::DecodeResult as PolarDecodeResult;
use crate::polar::{PolarCode, PolarDecoder, PolarEncoder};
use crate::segmentation::CodeBlockSegmentation;
use bitvec::prelude::*;
use tracing::{info, instrument};

/// Summary of one simulated attach-like exchange, for tests to assert on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachReport {
    pub ldpc_iterations: usize,
    pub ldpc_converged: bool,
    pub polar_converged: bool,
}

/// Runs a fixed scenario: a small uplink transport block through LDPC
/// (segmentation -> CRC -> encode -> rate match -> clean channel -> decode),
/// and a small downlink control message through polar (encode -> clean
/// channel -> SSC decode).
#[instrument(skip_all)]
pub fn run_attach_trace() -> Result<AttachReport> {
    let bg = BaseGraphKind::Bg1;
    let tbs = 100usize;

    info!(tbs, "segmenting uplink transport block");
    let seg = CodeBlockSegmentation::of(bg, tbs)?;
    info!(z = seg.z.value(), k = seg.k, num_cb = seg.num_cb, "segmentation complete");

    let mut message = vec![0u8; seg.k];
    let mut payload: BitVec<u8, Msb0> = BitVec::repeat(false, seg.tbs);
    for (i, mut bit) in payload.iter_mut().enumerate() {
        *bit = i % 3 == 0;
    }
    let oracle = if seg.l_tb == 16 { CrcOracle::Crc16 } else { CrcOracle::Crc24A };
    let mut framed = payload.clone();
    oracle.append(&payload, &mut framed);
    for (i, bit) in framed.iter().enumerate() {
        message[i] = *bit as u8;
    }
    for b in message.iter_mut().skip(framed.len()) {
        *b = crate::bits::FILLER_BIT;
    }

    let enc = LdpcEncoder::new(bg, seg.z)?;
    let mut codeword = vec![0u8; enc.n()];
    let e = crate::ldpc::rate_match::clamp_e(bg, seg.z, enc.n());
    enc.encode(&message, &mut codeword, e)?;
    info!(n = codeword.len(), "ldpc encode complete");

    let rm = RateMatcher::new(bg, seg.z, seg.filler_bits, 2, None)?;
    let tx = rm.match_tx(&codeword, 0, e)?;
    info!(e, "rate matched for transmission");

    // Identity channel: strong, correct-sign LLRs (this trace is not a link
    // simulator -- see spec.md's Non-goals).
    let rx_llr: Vec<f32> = tx.iter().map(|&b| if b == 0 { 6.0 } else { -6.0 }).collect();
    let dematched = rm.match_rx(&rx_llr, 0, e)?;

    let dec = LdpcDecoder::new(bg, seg.z, LdpcPrecision::Float, Schedule::Layered, 0.75, 30)?;
    let mut decoded = vec![0u8; dec.k()];
    let result = dec.decode(&dematched, &mut decoded, e, Some((oracle, framed.len())))?;
    let ldpc_converged = matches!(result, crate::ldpc::DecodeResult::Converged { .. });
    let ldpc_iterations = match result {
        crate::ldpc::DecodeResult::Converged { iterations }
        | crate::ldpc::DecodeResult::MaxIterationsReached { iterations }
        | crate::ldpc::DecodeResult::CrcFailed { iterations } => iterations,
    };
    info!(ldpc_converged, ldpc_iterations, "ldpc decode complete");

    info!("encoding downlink control message via polar");
    let code = PolarCode::new(5, &(0..16).collect::<Vec<_>>())?;
    let polar_enc = PolarEncoder::new(&code);
    let info_bits = vec![0u8, 1, 0, 1].into_iter().cycle().take(code.k()).collect::<Vec<_>>();
    let mut polar_codeword = vec![0u8; code.n()];
    polar_enc.encode(&info_bits, &mut polar_codeword)?;

    let polar_llr: Vec<f32> = polar_codeword
        .iter()
        .map(|&b| if b == 0 { 6.0 } else { -6.0 })
        .collect();
    let polar_dec = PolarDecoder::new(&code);
    let mut polar_decoded = vec![0u8; code.k()];
    let polar_result = polar_dec.decode(&polar_llr, &mut polar_decoded, LdpcPrecision::Float, None)?;
    let polar_converged = polar_result == PolarDecodeResult::Converged && polar_decoded == info_bits;
    info!(polar_converged, "polar decode complete");

    Ok(AttachReport {
        ldpc_iterations,
        ldpc_converged,
        polar_converged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_trace_converges_end_to_end() {
        crate::tracing_init::init_test_tracing();
        let report = run_attach_trace().unwrap();
        assert!(report.ldpc_converged);
        assert!(report.polar_converged);
    }
}
