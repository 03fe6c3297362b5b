use num_bigint_dig::BigUint;
use serde::{Deserialize, Serialize};

use crate::{
    bool::{parameters::ParameterPreset, FheBool},
    error::{FheError, FheResult},
};

/// Bit widths the integer layer accepts. The 160 and 256 entries carry
/// blockchain addresses and words; they are encoded exactly like the
/// small widths, just with more bits.
pub const SUPPORTED_WIDTHS: [usize; 9] = [1, 4, 8, 16, 32, 64, 128, 160, 256];

pub(crate) fn check_width(width: usize) -> FheResult<()> {
    if SUPPORTED_WIDTHS.contains(&width) {
        Ok(())
    } else {
        Err(FheError::UnsupportedWidth(width))
    }
}

/// An encrypted unsigned integer: an ordered little-endian array of
/// encrypted bits. The width is a property of the value; operations
/// require matching widths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FheUint {
    pub(crate) data: Vec<FheBool>,
}

impl FheUint {
    /// Wraps per-bit ciphertexts, little-endian. The width must be
    /// supported and every bit must come from the same preset.
    pub fn from_bits(data: Vec<FheBool>) -> FheResult<Self> {
        check_width(data.len())?;
        let preset = data[0].preset();
        for bit in data.iter().skip(1) {
            if bit.preset() != preset {
                return Err(FheError::ParameterMismatch {
                    left: preset,
                    right: bit.preset(),
                });
            }
        }
        Ok(FheUint { data })
    }

    pub fn width(&self) -> usize {
        self.data.len()
    }

    pub fn preset(&self) -> ParameterPreset {
        self.data[0].preset()
    }

    pub fn bits(&self) -> &[FheBool] {
        &self.data
    }

    pub(crate) fn data(&self) -> &[FheBool] {
        &self.data
    }
}

/// Splits `value` into `width` little-endian plaintext bits. Values wider
/// than the target are reduced mod 2^width, matching the modular
/// semantics of the circuit layer.
pub(crate) fn value_to_bits(value: &BigUint, width: usize) -> Vec<bool> {
    let bytes = value.to_bytes_le();
    (0..width)
        .map(|i| {
            bytes
                .get(i >> 3)
                .map(|byte| (byte >> (i & 7)) & 1 == 1)
                .unwrap_or(false)
        })
        .collect()
}

/// Recomposes little-endian plaintext bits into an integer.
pub(crate) fn bits_to_value(bits: &[bool]) -> BigUint {
    let mut bytes = vec![0u8; (bits.len() + 7) / 8];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i >> 3] |= 1 << (i & 7);
        }
    }
    BigUint::from_bytes_le(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_codec_round_trips() {
        for v in [0u64, 1, 5, 200, 255, 65535, u64::MAX] {
            let big = BigUint::from(v);
            for width in [8usize, 16, 64, 128, 160, 256] {
                let bits = value_to_bits(&big, width);
                let back = bits_to_value(&bits);
                let mask = (BigUint::from(1u8) << width) - BigUint::from(1u8);
                assert_eq!(back, big.clone() & mask);
            }
        }
    }

    #[test]
    fn unsupported_widths_are_rejected() {
        assert!(check_width(8).is_ok());
        assert!(check_width(160).is_ok());
        assert_eq!(check_width(7), Err(FheError::UnsupportedWidth(7)));
        assert_eq!(check_width(0), Err(FheError::UnsupportedWidth(0)));
        assert_eq!(check_width(512), Err(FheError::UnsupportedWidth(512)));
    }
}
