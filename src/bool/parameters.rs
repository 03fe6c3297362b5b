use serde::{Deserialize, Serialize};

use crate::backend::CiphertextModulus;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolynomialSize(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LweDimension(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionLogBase(pub usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecompositionCount(pub usize);

/// Named parameter presets. The preset id travels inside every key and
/// ciphertext, both in memory and on the wire; operations across presets
/// are rejected, never coerced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterPreset {
    /// N = 2^10, Q ~ 2^27, n = 512, q = 2^15
    PN10QP27,
    /// N = 2^9, Q ~ 2^25, n = 400, q = 2^14; smaller and faster, lower
    /// security margin
    PN9QP25,
}

impl ParameterPreset {
    pub fn id(&self) -> u8 {
        match self {
            ParameterPreset::PN10QP27 => 1,
            ParameterPreset::PN9QP25 => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(ParameterPreset::PN10QP27),
            2 => Some(ParameterPreset::PN9QP25),
            _ => None,
        }
    }

    pub fn parameters(&self) -> BoolParameters<u64> {
        match self {
            ParameterPreset::PN10QP27 => PN10QP27,
            ParameterPreset::PN9QP25 => PN9QP25,
        }
    }
}

/// Parameters of the Boolean FHE scheme, frozen for the life of a secret
/// key. All ambient contexts (modular ops, NTT tables, decomposers) are
/// derived from this value at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoolParameters<El> {
    preset: ParameterPreset,
    rlwe_q: CiphertextModulus<El>,
    lwe_q: CiphertextModulus<El>,
    br_q: usize,
    rlwe_n: PolynomialSize,
    lwe_n: LweDimension,
    rlwe_rgsw_decomposition: (DecompositionLogBase, DecompositionCount),
    lwe_decomposition: (DecompositionLogBase, DecompositionCount),
    rlwe_sigma: f64,
    lwe_sigma: f64,
    pk_pool: usize,
}

/// Default preset: 128-bit-style TFHE parameters scaled for a 2^15 LWE
/// modulus and an NTT-friendly 27-bit RLWE prime (63 * 2^21 + 1).
pub const PN10QP27: BoolParameters<u64> = BoolParameters {
    preset: ParameterPreset::PN10QP27,
    rlwe_q: CiphertextModulus::new(132120577),
    lwe_q: CiphertextModulus::new(1 << 15),
    br_q: 2048,
    rlwe_n: PolynomialSize(1024),
    lwe_n: LweDimension(512),
    rlwe_rgsw_decomposition: (DecompositionLogBase(7), DecompositionCount(4)),
    lwe_decomposition: (DecompositionLogBase(4), DecompositionCount(5)),
    rlwe_sigma: 3.2,
    lwe_sigma: 4.0,
    pk_pool: 1024,
};

/// Smaller companion preset over the 25-bit NTT prime 11 * 2^21 + 1.
pub const PN9QP25: BoolParameters<u64> = BoolParameters {
    preset: ParameterPreset::PN9QP25,
    rlwe_q: CiphertextModulus::new(23068673),
    lwe_q: CiphertextModulus::new(1 << 14),
    br_q: 1024,
    rlwe_n: PolynomialSize(512),
    lwe_n: LweDimension(400),
    rlwe_rgsw_decomposition: (DecompositionLogBase(5), DecompositionCount(5)),
    lwe_decomposition: (DecompositionLogBase(4), DecompositionCount(5)),
    rlwe_sigma: 3.2,
    lwe_sigma: 4.0,
    pk_pool: 512,
};

impl<El: Copy> BoolParameters<El> {
    pub fn preset(&self) -> ParameterPreset {
        self.preset
    }

    pub fn rlwe_q(&self) -> &CiphertextModulus<El> {
        &self.rlwe_q
    }

    pub fn lwe_q(&self) -> &CiphertextModulus<El> {
        &self.lwe_q
    }

    pub fn br_q(&self) -> usize {
        self.br_q
    }

    pub fn rlwe_n(&self) -> PolynomialSize {
        self.rlwe_n
    }

    pub fn lwe_n(&self) -> LweDimension {
        self.lwe_n
    }

    pub fn rlwe_rgsw_decomposition_params(&self) -> (DecompositionLogBase, DecompositionCount) {
        self.rlwe_rgsw_decomposition
    }

    pub fn lwe_decomposition_params(&self) -> (DecompositionLogBase, DecompositionCount) {
        self.lwe_decomposition
    }

    pub fn rlwe_sigma(&self) -> f64 {
        self.rlwe_sigma
    }

    pub fn lwe_sigma(&self) -> f64 {
        self.lwe_sigma
    }

    pub fn pk_pool(&self) -> usize {
        self.pk_pool
    }
}

impl BoolParameters<u64> {
    /// Message scale: a bit b is encoded as delta * b with delta = q/8.
    pub fn delta(&self) -> u64 {
        use crate::backend::Modulus;
        self.lwe_q.q() / 8
    }

    pub(crate) fn rlwe_rgsw_decomposer(&self) -> crate::decomposer::DefaultDecomposer<u64> {
        crate::decomposer::DefaultDecomposer::new(
            self.rlwe_q,
            self.rlwe_rgsw_decomposition.0 .0,
            self.rlwe_rgsw_decomposition.1 .0,
        )
    }

    pub(crate) fn lwe_decomposer(&self) -> crate::decomposer::DefaultDecomposer<u64> {
        crate::decomposer::DefaultDecomposer::new(
            self.rlwe_q,
            self.lwe_decomposition.0 .0,
            self.lwe_decomposition.1 .0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Modulus;

    #[test]
    fn presets_are_consistent() {
        for p in [PN10QP27, PN9QP25] {
            // blind rotation modulus is the rotation group of the ring
            assert_eq!(p.br_q(), 2 * p.rlwe_n().0);
            // NTT needs Q = 1 mod 2N
            assert_eq!((p.rlwe_q().q() - 1) % (2 * p.rlwe_n().0 as u64), 0);
            assert!(p.lwe_q().is_power_of_2());
            assert_eq!(p.delta(), p.lwe_q().q() / 8);
            assert_eq!(
                ParameterPreset::from_id(p.preset().id()),
                Some(p.preset())
            );
            assert_eq!(p.preset().parameters(), p);
        }
        assert_eq!(ParameterPreset::from_id(0), None);
    }

    #[test]
    fn preset_moduli_admit_an_ntt() {
        use crate::ntt::{NttBackendU64, NttInit};
        for p in [PN10QP27, PN9QP25] {
            // construction asserts primality and the 2N-th root
            let _ = NttBackendU64::new(p.rlwe_q(), p.rlwe_n().0);
        }
    }
}
