use serde::{Deserialize, Serialize};

use crate::{
    error::FheResult,
    random::DefaultSecureRng,
};

pub mod evaluator;
pub mod keys;
pub mod parameters;

pub use evaluator::{BoolEvaluator, BooleanGates};
pub use keys::{ClientKey, PublicKey, ServerKey, ServerKeyEvaluationDomain};

use parameters::{BoolParameters, ParameterPreset};

/// An encrypted bit: an LWE ciphertext [b, a] under the LWE secret with
/// b = <a, s> + delta * m + e and the canonical encoding false = 0,
/// true = delta. Valid while |e| < delta/2.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FheBool {
    pub(crate) data: Vec<u64>,
    pub(crate) preset: ParameterPreset,
}

impl FheBool {
    pub fn preset(&self) -> ParameterPreset {
        self.preset
    }

    pub(crate) fn data(&self) -> &[u64] {
        &self.data
    }
}

/// Generates a fresh client/server key pair for the given parameters.
/// Server key generation dominates: one RGSW ciphertext per LWE secret
/// coordinate plus the RLWE-to-LWE key switching key.
pub fn gen_keys(parameters: &BoolParameters<u64>) -> FheResult<(ClientKey, ServerKey)> {
    let mut rng = DefaultSecureRng::new();
    let ck = keys::gen_client_key(parameters, &mut rng);
    let sk = keys::gen_server_key(&ck, &mut rng)?;
    Ok((ck, sk))
}

/// Derives the public encryption key (a pool of fresh zero encryptions)
/// from the client key.
pub fn gen_public_key(client_key: &ClientKey) -> FheResult<PublicKey> {
    let mut rng = DefaultSecureRng::new();
    keys::gen_public_key_with_rng(client_key, &mut rng)
}
