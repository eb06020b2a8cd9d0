//! CRC oracle for transport-block and code-block CRCs (3GPP TS 38.212 §5.1).
//!
//! Generalises the teacher's fixed-width FT8 CRC-14 helper to the two
//! variable-length CRC kinds the FEC core needs: `L_tb in {16, 24}` and
//! `L_cb in {0, 24}` (spec.md §3, §4.2). The decoder's early-termination
//! check (spec.md §4.5) consumes this as `CrcOracle`.

use bitvec::prelude::*;
use crc::{Algorithm, Crc};

/// Which 3GPP CRC polynomial to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcOracle {
    /// 16-bit CRC, `D^16+D^12+D^5+1` (used for TB-CRC when `tbs <= 3824`).
    Crc16,
    /// 24-bit CRC A, `D^24+D^23+D^18+D^17+D^14+D^11+D^10+D^7+D^6+D^5+D^4+D^3+D+1`.
    Crc24A,
    /// 24-bit CRC B, `D^24+D^23+D^6+D^5+D+1` (used for code-block CRCs).
    Crc24B,
}

const CRC16_ALGO: Algorithm<u32> = Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0,
    refin: false,
    refout: false,
    xorout: 0,
    check: 0,
    residue: 0,
};

const CRC24A_ALGO: Algorithm<u32> = Algorithm {
    width: 24,
    poly: 0x86_4CFB,
    init: 0,
    refin: false,
    refout: false,
    xorout: 0,
    check: 0,
    residue: 0,
};

const CRC24B_ALGO: Algorithm<u32> = Algorithm {
    width: 24,
    poly: 0x80_0063,
    init: 0,
    refin: false,
    refout: false,
    xorout: 0,
    check: 0,
    residue: 0,
};

impl CrcOracle {
    pub const fn width(self) -> usize {
        match self {
            CrcOracle::Crc16 => 16,
            CrcOracle::Crc24A | CrcOracle::Crc24B => 24,
        }
    }

    fn algorithm(self) -> &'static Algorithm<u32> {
        match self {
            CrcOracle::Crc16 => &CRC16_ALGO,
            CrcOracle::Crc24A => &CRC24A_ALGO,
            CrcOracle::Crc24B => &CRC24B_ALGO,
        }
    }

    /// Computes the CRC remainder over an arbitrary-length bit slice.
    ///
    /// Leading zero bits are prepended to reach a byte boundary; this never
    /// changes the remainder of a non-reflected, zero-initialised CRC.
    pub fn compute(self, bits: &BitSlice<u8, Msb0>) -> u32 {
        let pad = (8 - bits.len() % 8) % 8;
        let mut padded: BitVec<u8, Msb0> = BitVec::repeat(false, pad);
        padded.extend_from_bitslice(bits);
        Crc::<u32>::new(self.algorithm()).checksum(padded.as_raw_slice())
    }

    /// Appends this CRC's bits (MSB-first) to `out` after computing it over `message`.
    pub fn append(self, message: &BitSlice<u8, Msb0>, out: &mut BitVec<u8, Msb0>) {
        let crc = self.compute(message);
        let width = self.width();
        for i in 0..width {
            out.push(((crc >> (width - 1 - i)) & 1) != 0);
        }
    }

    /// Checks a `message || crc` bit slice for validity.
    pub fn check(self, message_with_crc: &BitSlice<u8, Msb0>) -> bool {
        let width = self.width();
        if message_with_crc.len() < width {
            return false;
        }
        let split = message_with_crc.len() - width;
        let (message, received) = message_with_crc.split_at(split);
        let calculated = self.compute(message);
        let mut received_value: u32 = 0;
        for bit in received.iter() {
            received_value = (received_value << 1) | (*bit as u32);
        }
        calculated == received_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc16_zero_message_is_zero() {
        let bits = bitvec![u8, Msb0; 0; 40];
        assert_eq!(CrcOracle::Crc16.compute(&bits), 0);
    }

    #[test]
    fn crc16_round_trips_through_append_and_check() {
        let mut message = bitvec![u8, Msb0; 0; 77];
        message.set(0, true);
        message.set(10, true);
        message.set(76, true);

        let mut framed = message.clone();
        CrcOracle::Crc16.append(&message, &mut framed);
        assert!(CrcOracle::Crc16.check(&framed));

        let bit = framed.len() - 1;
        let flipped = !framed[bit];
        framed.set(bit, flipped);
        assert!(!CrcOracle::Crc16.check(&framed));
    }

    #[test]
    fn crc24a_round_trips() {
        let mut message = bitvec![u8, Msb0; 0; 200];
        for i in (0..200).step_by(7) {
            message.set(i, true);
        }
        let mut framed = message.clone();
        CrcOracle::Crc24A.append(&message, &mut framed);
        assert!(CrcOracle::Crc24A.check(&framed));
        assert_eq!(framed.len(), message.len() + 24);
    }

    #[test]
    fn crc24b_detects_single_bit_error() {
        let mut message = bitvec![u8, Msb0; 1; 91];
        let mut framed = message.clone();
        CrcOracle::Crc24B.append(&message, &mut framed);
        message.set(3, !message[3]);
        let mut corrupted = message.clone();
        CrcOracle::Crc24B.append(&message, &mut corrupted);
        assert_ne!(framed, corrupted);
    }
}
