//! Error taxonomy for the FEC core.
//!
//! Every fallible construction or call in this crate returns one of these
//! four kinds. Decoder non-convergence is not represented here: see
//! [`crate::ldpc::DecodeResult`] and [`crate::polar::DecodeResult`].

use snafu::Snafu;

#[derive(Debug, Snafu, PartialEq, Eq, Clone)]
#[snafu(visibility(pub(crate)))]
pub enum FecError {
    /// An unsupported base graph, lifting size, polar order, redundancy
    /// version, modulation order, or a TBS for which no lifting size
    /// satisfies code-block segmentation.
    #[snafu(display("invalid parameter: {what}"))]
    InvalidParameter { what: String },

    /// Buffer sizes inconsistent with the declared (BG, Z, E) or (n, K).
    #[snafu(display("length mismatch: {what}: expected {expected}, got {got}"))]
    LengthMismatch {
        what: String,
        expected: usize,
        got: usize,
    },

    /// A polar frozen set that is not sorted, out of range, or has the
    /// wrong cardinality.
    #[snafu(display("invalid frozen set: {what}"))]
    InvalidFrozenSet { what: String },

    /// Allocation failure at construction.
    #[snafu(display("resource allocation failed: {what}"))]
    Resource { what: String },
}

pub type Result<T> = core::result::Result<T, FecError>;
