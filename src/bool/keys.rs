use serde::{Deserialize, Serialize};

use crate::{
    backend::{ModInit, ModularOpsU64, Modulus, PowerOfTwoOpsU64},
    bool::{parameters::BoolParameters, FheBool},
    decomposer::Decomposer,
    error::FheResult,
    lwe::{
        decrypt_lwe, encrypt_lwe, lwe_ksk_keygen, lwe_zero_encryptions, public_key_encrypt_lwe,
        LweSecret,
    },
    ntt::{NttBackendU64, NttInit},
    pbs::{gate_test_vector, PbsKey, TestVectorArc},
    random::{DefaultSecureRng, RandomFill, RandomFillGaussianInModulus, RandomFillUniformInModulus},
    rgsw::{rgsw_rows, rgsw_to_evaluation_domain, secret_key_encrypt_rgsw, RlweSecret},
    Decryptor, Encryptor, MatrixEntity, Secret,
};

/// Client key: the LWE and RLWE secrets plus the parameters they were
/// generated under. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientKey {
    pub(crate) sk_rlwe: RlweSecret,
    pub(crate) sk_lwe: LweSecret,
    pub(crate) parameters: BoolParameters<u64>,
}

impl ClientKey {
    pub(crate) fn new(
        sk_rlwe: RlweSecret,
        sk_lwe: LweSecret,
        parameters: BoolParameters<u64>,
    ) -> Self {
        Self {
            sk_rlwe,
            sk_lwe,
            parameters,
        }
    }

    pub fn parameters(&self) -> &BoolParameters<u64> {
        &self.parameters
    }

    pub fn encrypt_bit(&self, m: bool) -> FheResult<FheBool> {
        let mut rng = DefaultSecureRng::new();
        self.encrypt_bit_with_rng(m, &mut rng)
    }

    pub(crate) fn encrypt_bit_with_rng<R>(&self, m: bool, rng: &mut R) -> FheResult<FheBool>
    where
        R: RandomFillGaussianInModulus<[u64], crate::backend::CiphertextModulus<u64>>
            + RandomFillUniformInModulus<[u64], crate::backend::CiphertextModulus<u64>>,
    {
        let modop = PowerOfTwoOpsU64::new(*self.parameters.lwe_q());
        let mut data = vec![0u64; self.parameters.lwe_n().0 + 1];
        let encoded = self.parameters.delta() * (m as u64);
        encrypt_lwe(
            &mut data,
            &encoded,
            &self.sk_lwe,
            &modop,
            self.parameters.lwe_sigma(),
            rng,
        )?;
        Ok(FheBool {
            data,
            preset: self.parameters.preset(),
        })
    }

    /// Decryption of a valid ciphertext always succeeds: round the phase
    /// to the nearest multiple of delta and read the bit.
    pub fn decrypt_bit(&self, c: &FheBool) -> bool {
        let modop = PowerOfTwoOpsU64::new(*self.parameters.lwe_q());
        let phase = decrypt_lwe(&c.data, &self.sk_lwe, &modop);
        let delta = self.parameters.delta();
        let q = self.parameters.lwe_q().q();
        ((phase + delta / 2) % q) / delta == 1
    }
}

impl Encryptor<bool, FheBool> for ClientKey {
    fn encrypt(&self, m: &bool) -> FheBool {
        self.encrypt_bit(*m).expect("fresh bit encryption failed")
    }
}

impl Decryptor<bool, FheBool> for ClientKey {
    fn decrypt(&self, c: &FheBool) -> bool {
        self.decrypt_bit(c)
    }
}

pub(crate) fn gen_client_key<R: RandomFill<[u8]>>(
    parameters: &BoolParameters<u64>,
    rng: &mut R,
) -> ClientKey {
    let sk_rlwe = RlweSecret::random(parameters.rlwe_n().0, rng);
    let sk_lwe = LweSecret::random(parameters.lwe_n().0, rng);
    ClientKey::new(sk_rlwe, sk_lwe, *parameters)
}

/// Public key: a pool of fresh LWE encryptions of zero. Encryption sums a
/// random subset of the pool and adds the encoded message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PublicKey {
    pub(crate) pool: Vec<Vec<u64>>,
    pub(crate) parameters: BoolParameters<u64>,
}

impl PublicKey {
    pub fn parameters(&self) -> &BoolParameters<u64> {
        &self.parameters
    }

    pub fn encrypt_bit(&self, m: bool) -> FheResult<FheBool> {
        let modop = PowerOfTwoOpsU64::new(*self.parameters.lwe_q());
        let mut rng = DefaultSecureRng::new();
        let mut data = vec![0u64; self.parameters.lwe_n().0 + 1];
        let encoded = self.parameters.delta() * (m as u64);
        public_key_encrypt_lwe(
            &mut data,
            &encoded,
            &self.pool,
            &modop,
            self.parameters.lwe_sigma(),
            &mut rng,
        )?;
        Ok(FheBool {
            data,
            preset: self.parameters.preset(),
        })
    }
}

impl Encryptor<bool, FheBool> for PublicKey {
    fn encrypt(&self, m: &bool) -> FheBool {
        self.encrypt_bit(*m).expect("public key encryption failed")
    }
}

pub(crate) fn gen_public_key_with_rng<R>(
    client_key: &ClientKey,
    rng: &mut R,
) -> FheResult<PublicKey>
where
    R: RandomFillGaussianInModulus<[u64], crate::backend::CiphertextModulus<u64>>
        + RandomFillUniformInModulus<[u64], crate::backend::CiphertextModulus<u64>>,
{
    let parameters = client_key.parameters;
    let modop = PowerOfTwoOpsU64::new(*parameters.lwe_q());
    let mut pool =
        <Vec<Vec<u64>> as MatrixEntity>::zeros(parameters.pk_pool(), parameters.lwe_n().0 + 1);
    lwe_zero_encryptions(
        &mut pool,
        &client_key.sk_lwe,
        &modop,
        parameters.lwe_sigma(),
        rng,
    )?;
    Ok(PublicKey { pool, parameters })
}

/// Server key in the coefficient domain: the serializable bootstrap key.
/// Holds RGSW(s_i) for every LWE secret coordinate and the key switching
/// key from the RLWE secret back to the LWE secret.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerKey {
    pub(crate) rgsw_cts: Vec<Vec<Vec<u64>>>,
    pub(crate) lwe_ksk: Vec<Vec<u64>>,
    pub(crate) parameters: BoolParameters<u64>,
}

impl ServerKey {
    pub fn parameters(&self) -> &BoolParameters<u64> {
        &self.parameters
    }
}

pub(crate) fn gen_server_key<R>(client_key: &ClientKey, rng: &mut R) -> FheResult<ServerKey>
where
    R: RandomFillGaussianInModulus<[u64], crate::backend::CiphertextModulus<u64>>
        + RandomFillUniformInModulus<[u64], crate::backend::CiphertextModulus<u64>>,
{
    let parameters = client_key.parameters;
    let rlwe_n = parameters.rlwe_n().0;
    let rlwe_modop = ModularOpsU64::new(*parameters.rlwe_q());
    let nttop = NttBackendU64::new(parameters.rlwe_q(), rlwe_n);

    let rgsw_decomposer = parameters.rlwe_rgsw_decomposer();
    let gadget = rgsw_decomposer.gadget_vector();
    let d = rgsw_decomposer.decomposition_count();

    // RGSW(s_i) for every LWE secret bit
    let mut rgsw_cts = Vec::with_capacity(parameters.lwe_n().0);
    let mut m = vec![0u64; rlwe_n];
    for s_i in client_key.sk_lwe.values() {
        m[0] = *s_i as u64;
        let mut rgsw = <Vec<Vec<u64>> as MatrixEntity>::zeros(rgsw_rows(d), rlwe_n);
        secret_key_encrypt_rgsw(
            &mut rgsw,
            &m,
            &gadget,
            &client_key.sk_rlwe,
            &rlwe_modop,
            &nttop,
            parameters.rlwe_sigma(),
            rng,
        )?;
        rgsw_cts.push(rgsw);
    }

    // key switching key from the RLWE secret to the LWE secret, at Q
    let lwe_decomposer = parameters.lwe_decomposer();
    let lwe_gadget = lwe_decomposer.gadget_vector();
    let mut lwe_ksk = <Vec<Vec<u64>> as MatrixEntity>::zeros(
        rlwe_n * lwe_decomposer.decomposition_count(),
        parameters.lwe_n().0 + 1,
    );
    lwe_ksk_keygen(
        client_key.sk_rlwe.values(),
        &client_key.sk_lwe,
        &mut lwe_ksk,
        &lwe_gadget,
        &rlwe_modop,
        parameters.rlwe_sigma(),
        rng,
    )?;

    Ok(ServerKey {
        rgsw_cts,
        lwe_ksk,
        parameters,
    })
}

/// Per-gate test polynomials, precomputed once per server key. Each arc
/// covers half the torus; the negacyclic wrap supplies the other half.
#[derive(Clone, Debug)]
pub(crate) struct GateTestVectors {
    pub(crate) and: Vec<u64>,
    pub(crate) or: Vec<u64>,
    pub(crate) xor: Vec<u64>,
    pub(crate) nand: Vec<u64>,
    pub(crate) nor: Vec<u64>,
    pub(crate) xnor: Vec<u64>,
    pub(crate) majority: Vec<u64>,
    pub(crate) identity: Vec<u64>,
}

impl GateTestVectors {
    pub(crate) fn new(parameters: &BoolParameters<u64>) -> Self {
        let delta = parameters.delta();
        let rlwe_q = parameters.rlwe_q().q();
        let lwe_q = parameters.lwe_q().q();
        let n = parameters.rlwe_n().0;
        let tv = |lo, hi| gate_test_vector(TestVectorArc::new(lo, hi), rlwe_q, lwe_q, n);

        // arcs in units of delta over [0, 8 delta):
        //   and/majority true on [1.5, 5.5), or/identity on [0.5, 4.5),
        //   xor (on the doubled sum) on [2, 6); negations are complements
        GateTestVectors {
            and: tv(3 * delta / 2, 11 * delta / 2),
            nand: tv(11 * delta / 2, 3 * delta / 2),
            or: tv(delta / 2, 9 * delta / 2),
            nor: tv(9 * delta / 2, delta / 2),
            xor: tv(2 * delta, 6 * delta),
            xnor: tv(6 * delta, 2 * delta),
            majority: tv(3 * delta / 2, 11 * delta / 2),
            identity: tv(delta / 2, 9 * delta / 2),
        }
    }
}

/// Server key in the NTT evaluation domain together with the gate test
/// vectors: the runtime form consumed by every bootstrap. Immutable after
/// construction and shareable across threads by reference.
pub struct ServerKeyEvaluationDomain {
    pub(crate) rgsw_cts: Vec<Vec<Vec<u64>>>,
    pub(crate) lwe_ksk: Vec<Vec<u64>>,
    pub(crate) test_vectors: GateTestVectors,
    pub(crate) parameters: BoolParameters<u64>,
}

impl From<&ServerKey> for ServerKeyEvaluationDomain {
    fn from(value: &ServerKey) -> Self {
        let parameters = value.parameters;
        let nttop = NttBackendU64::new(parameters.rlwe_q(), parameters.rlwe_n().0);

        let mut rgsw_cts = value.rgsw_cts.clone();
        rgsw_cts
            .iter_mut()
            .for_each(|ct| rgsw_to_evaluation_domain(ct, &nttop));

        ServerKeyEvaluationDomain {
            rgsw_cts,
            lwe_ksk: value.lwe_ksk.clone(),
            test_vectors: GateTestVectors::new(&parameters),
            parameters,
        }
    }
}

impl ServerKeyEvaluationDomain {
    pub fn parameters(&self) -> &BoolParameters<u64> {
        &self.parameters
    }
}

impl PbsKey for ServerKeyEvaluationDomain {
    type M = Vec<Vec<u64>>;

    fn rgsw_ct_lwe_si(&self, si: usize) -> &Self::M {
        &self.rgsw_cts[si]
    }

    fn lwe_ksk(&self) -> &Self::M {
        &self.lwe_ksk
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::NewWithSeed;

    #[test]
    fn client_key_round_trips_bits() {
        let mut rng = DefaultSecureRng::new_with_seed([42u8; 32]);
        let ck = gen_client_key(&crate::bool::parameters::PN10QP27, &mut rng);

        for _ in 0..16 {
            for m in [false, true] {
                let ct = ck.encrypt_bit_with_rng(m, &mut rng).unwrap();
                assert_eq!(ck.decrypt_bit(&ct), m);
            }
        }
    }

    #[test]
    fn public_key_round_trips_bits() {
        let mut rng = DefaultSecureRng::new_with_seed([43u8; 32]);
        let ck = gen_client_key(&crate::bool::parameters::PN10QP27, &mut rng);
        let pk = gen_public_key_with_rng(&ck, &mut rng).unwrap();

        for m in [false, true, true, false] {
            let ct = pk.encrypt_bit(m).unwrap();
            assert_eq!(ck.decrypt_bit(&ct), m);
        }
    }

    #[test]
    fn secrets_are_binary() {
        let mut rng = DefaultSecureRng::new_with_seed([44u8; 32]);
        let ck = gen_client_key(&crate::bool::parameters::PN10QP27, &mut rng);
        assert!(ck.sk_lwe.values().iter().all(|v| *v == 0 || *v == 1));
        assert!(ck.sk_rlwe.values().iter().all(|v| *v == 0 || *v == 1));
    }
}
