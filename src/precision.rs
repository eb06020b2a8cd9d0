//! Channel-LLR quantization profiles shared by the LDPC and polar decoders
//! (spec.md §4.5, §4.6).
//!
//! Both decoders run their min-sum/SSC update at `f32`; the three profiles
//! only change what happens at the channel-LLR boundary, so a single type
//! here keeps the two decode loops from drifting (see `DESIGN.md`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Float,
    Int16,
    Int8,
}

impl Precision {
    pub fn quantize(self, llr: f32) -> f32 {
        match self {
            Precision::Float => llr,
            Precision::Int16 => {
                let q = (llr * 256.0).round().clamp(i16::MIN as f32, i16::MAX as f32);
                q / 256.0
            }
            Precision::Int8 => {
                let q = (llr * 8.0).round().clamp(i8::MIN as f32, i8::MAX as f32);
                q / 8.0
            }
        }
    }
}
