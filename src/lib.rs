//! 5G NR physical-layer forward error correction: LDPC (BG1/BG2) and polar
//! codecs, rate matching, code-block segmentation, and CRC oracles, as used
//! by the PDSCH/PUSCH and PBCH/PDCCH processing chains (3GPP TS 38.212).

pub mod base_graph;
pub mod bits;
pub mod control_plane;
pub mod crc;
pub mod error;
pub mod fixed_point;
pub mod ldpc;
pub mod polar;
pub mod precision;
pub mod segmentation;
pub mod simd;
pub mod tracing_init;

pub use control_plane::{run_attach_trace, AttachReport};
pub use crc::CrcOracle;
pub use error::{FecError, Result};
pub use precision::Precision;
pub use segmentation::CodeBlockSegmentation;
