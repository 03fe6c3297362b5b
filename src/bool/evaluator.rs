use crate::{
    backend::{ArithmeticOps, CiphertextModulus, ModInit, ModularOpsU64, PowerOfTwoOpsU64, VectorOps},
    bool::{
        keys::ServerKeyEvaluationDomain,
        parameters::{BoolParameters, ParameterPreset},
        FheBool,
    },
    decomposer::DefaultDecomposer,
    error::{FheError, FheResult},
    ntt::{NttBackendU64, NttInit},
    pbs::{pbs, pbs_scratch_rows, PbsInfo},
    MatrixEntity,
};

/// Boolean gate API. The linear part of each gate is a cheap sum of LWE
/// samples; a single bootstrap with the gate's test vector then computes
/// the truth table and resets the noise, so gates compose to arbitrary
/// depth. NOT is purely linear and never bootstraps.
pub trait BooleanGates {
    type Ciphertext;
    type Key;

    fn and(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn nand(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn or(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn nor(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn xor(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn xnor(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    /// Single-bootstrap three-input majority.
    fn majority(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        c2: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    /// mux(sel, a, b) = sel ? a : b
    fn mux(
        &mut self,
        sel: &Self::Ciphertext,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn and3(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        c2: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn or3(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        c2: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn nand3(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        c2: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    fn nor3(
        &mut self,
        c0: &Self::Ciphertext,
        c1: &Self::Ciphertext,
        c2: &Self::Ciphertext,
        key: &Self::Key,
    ) -> FheResult<Self::Ciphertext>;
    /// Noise refresh with no functional change (identity test vector).
    fn refresh(&mut self, c: &Self::Ciphertext, key: &Self::Key) -> FheResult<Self::Ciphertext>;
    fn not(&self, c: &Self::Ciphertext) -> Self::Ciphertext;
    fn not_inplace(&self, c: &mut Self::Ciphertext);
}

pub(crate) struct BoolPbsInfo {
    parameters: BoolParameters<u64>,
    rlwe_modop: ModularOpsU64,
    lwe_modop: PowerOfTwoOpsU64,
    nttop: NttBackendU64,
    rlwe_rgsw_decomposer: DefaultDecomposer<u64>,
    lwe_decomposer: DefaultDecomposer<u64>,
}

impl PbsInfo for BoolPbsInfo {
    type M = Vec<Vec<u64>>;
    type Modulus = CiphertextModulus<u64>;
    type NttOp = NttBackendU64;
    type D = DefaultDecomposer<u64>;
    type RlweModOp = ModularOpsU64;
    type LweModOp = PowerOfTwoOpsU64;

    fn rlwe_q(&self) -> &Self::Modulus {
        self.parameters.rlwe_q()
    }
    fn lwe_q(&self) -> &Self::Modulus {
        self.parameters.lwe_q()
    }
    fn br_q(&self) -> usize {
        self.parameters.br_q()
    }
    fn rlwe_n(&self) -> usize {
        self.parameters.rlwe_n().0
    }
    fn lwe_n(&self) -> usize {
        self.parameters.lwe_n().0
    }
    fn rlwe_rgsw_decomposer(&self) -> &Self::D {
        &self.rlwe_rgsw_decomposer
    }
    fn lwe_decomposer(&self) -> &Self::D {
        &self.lwe_decomposer
    }
    fn modop_rlweq(&self) -> &Self::RlweModOp {
        &self.rlwe_modop
    }
    fn modop_lweq(&self) -> &Self::LweModOp {
        &self.lwe_modop
    }
    fn nttop_rlweq(&self) -> &Self::NttOp {
        &self.nttop
    }
}

/// Boolean circuit evaluator. Owns the modulus/NTT/decomposer contexts
/// derived from the parameters and the pooled per-gate scratch; key
/// material is passed in by reference, so one (immutable) server key can
/// be shared by an evaluator per thread.
pub struct BoolEvaluator {
    pbs_info: BoolPbsInfo,
    scratch_matrix: Vec<Vec<u64>>,
    scratch_lwe_big: Vec<u64>,
    scratch_lwe_small: Vec<u64>,
    scratch_lin: Vec<u64>,
}

impl BoolEvaluator {
    pub fn new(parameters: &BoolParameters<u64>) -> FheResult<Self> {
        let rlwe_rgsw_decomposer = parameters.rlwe_rgsw_decomposer();
        let lwe_decomposer = parameters.lwe_decomposer();
        let pbs_info = BoolPbsInfo {
            parameters: *parameters,
            rlwe_modop: ModularOpsU64::new(*parameters.rlwe_q()),
            lwe_modop: PowerOfTwoOpsU64::new(*parameters.lwe_q()),
            nttop: NttBackendU64::new(parameters.rlwe_q(), parameters.rlwe_n().0),
            rlwe_rgsw_decomposer,
            lwe_decomposer,
        };

        let rlwe_n = parameters.rlwe_n().0;
        let scratch_matrix = <Vec<Vec<u64>> as MatrixEntity>::zeros(
            pbs_scratch_rows(&pbs_info.rlwe_rgsw_decomposer),
            rlwe_n,
        );

        Ok(BoolEvaluator {
            scratch_matrix,
            scratch_lwe_big: vec![0u64; rlwe_n + 1],
            scratch_lwe_small: vec![0u64; parameters.lwe_n().0 + 1],
            scratch_lin: vec![0u64; parameters.lwe_n().0 + 1],
            pbs_info,
        })
    }

    pub fn parameters(&self) -> &BoolParameters<u64> {
        &self.pbs_info.parameters
    }

    /// Noiseless ciphertext of a known bit; used as circuit plumbing
    /// (zero padding, initial carries).
    pub fn trivial_bool(&self, m: bool) -> FheBool {
        let params = &self.pbs_info.parameters;
        let mut data = vec![0u64; params.lwe_n().0 + 1];
        data[0] = params.delta() * (m as u64);
        FheBool {
            data,
            preset: params.preset(),
        }
    }

    fn preset(&self) -> ParameterPreset {
        self.pbs_info.parameters.preset()
    }

    fn check_operand(&self, c: &FheBool) -> FheResult<()> {
        if c.preset != self.preset() {
            return Err(FheError::ParameterMismatch {
                left: self.preset(),
                right: c.preset,
            });
        }
        Ok(())
    }

    fn check_key(&self, key: &ServerKeyEvaluationDomain) -> FheResult<()> {
        if key.parameters.preset() != self.preset() {
            return Err(FheError::ParameterMismatch {
                left: self.preset(),
                right: key.parameters.preset(),
            });
        }
        Ok(())
    }

    /// Shared gate skeleton: sum the operands, optionally scale, run one
    /// bootstrap against `test_vector`, then lift the +-delta/2 output
    /// onto the canonical {0, delta} encoding.
    fn linear_then_pbs(
        &mut self,
        operands: &[&FheBool],
        scale: u64,
        test_vector: &Vec<u64>,
        key: &ServerKeyEvaluationDomain,
    ) -> FheResult<FheBool> {
        self.check_key(key)?;
        for c in operands {
            self.check_operand(c)?;
        }

        let lwe_modop = self.pbs_info.modop_lweq();
        self.scratch_lin.fill(0);
        for c in operands {
            lwe_modop.elwise_add_mut(&mut self.scratch_lin, c.data());
        }
        if scale != 1 {
            lwe_modop.elwise_scalar_mul_mut(&mut self.scratch_lin, &scale);
        }

        let mut out = vec![0u64; self.pbs_info.lwe_n() + 1];
        pbs(
            &self.pbs_info,
            test_vector,
            &self.scratch_lin,
            &mut out,
            key,
            &mut self.scratch_matrix,
            &mut self.scratch_lwe_big,
            &mut self.scratch_lwe_small,
        )?;

        // +-delta/2 -> {0, delta}
        let half_delta = self.pbs_info.parameters.delta() / 2;
        out[0] = ArithmeticOps::add(&self.pbs_info.lwe_modop, &out[0], &half_delta);

        Ok(FheBool {
            data: out,
            preset: self.preset(),
        })
    }
}

impl BooleanGates for BoolEvaluator {
    type Ciphertext = FheBool;
    type Key = ServerKeyEvaluationDomain;

    fn and(&mut self, c0: &FheBool, c1: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c0, c1], 1, &key.test_vectors.and, key)
    }

    fn nand(&mut self, c0: &FheBool, c1: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c0, c1], 1, &key.test_vectors.nand, key)
    }

    fn or(&mut self, c0: &FheBool, c1: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c0, c1], 1, &key.test_vectors.or, key)
    }

    fn nor(&mut self, c0: &FheBool, c1: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c0, c1], 1, &key.test_vectors.nor, key)
    }

    fn xor(&mut self, c0: &FheBool, c1: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        // the doubled sum sends (1,1) onto the negacyclic wrap; the
        // middle-band test vector reads it back as false
        self.linear_then_pbs(&[c0, c1], 4, &key.test_vectors.xor, key)
    }

    fn xnor(&mut self, c0: &FheBool, c1: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c0, c1], 4, &key.test_vectors.xnor, key)
    }

    fn majority(
        &mut self,
        c0: &FheBool,
        c1: &FheBool,
        c2: &FheBool,
        key: &Self::Key,
    ) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c0, c1, c2], 1, &key.test_vectors.majority, key)
    }

    fn mux(
        &mut self,
        sel: &FheBool,
        c0: &FheBool,
        c1: &FheBool,
        key: &Self::Key,
    ) -> FheResult<FheBool> {
        // sel ? c0 : c1 = (sel & c0) | (!sel & c1)
        let not_sel = self.not(sel);
        let sel_c0 = self.and(sel, c0, key)?;
        let not_sel_c1 = self.and(&not_sel, c1, key)?;
        self.or(&sel_c0, &not_sel_c1, key)
    }

    fn and3(
        &mut self,
        c0: &FheBool,
        c1: &FheBool,
        c2: &FheBool,
        key: &Self::Key,
    ) -> FheResult<FheBool> {
        let c01 = self.and(c0, c1, key)?;
        self.and(&c01, c2, key)
    }

    fn or3(
        &mut self,
        c0: &FheBool,
        c1: &FheBool,
        c2: &FheBool,
        key: &Self::Key,
    ) -> FheResult<FheBool> {
        let c01 = self.or(c0, c1, key)?;
        self.or(&c01, c2, key)
    }

    fn nand3(
        &mut self,
        c0: &FheBool,
        c1: &FheBool,
        c2: &FheBool,
        key: &Self::Key,
    ) -> FheResult<FheBool> {
        let c01 = self.and(c0, c1, key)?;
        self.nand(&c01, c2, key)
    }

    fn nor3(
        &mut self,
        c0: &FheBool,
        c1: &FheBool,
        c2: &FheBool,
        key: &Self::Key,
    ) -> FheResult<FheBool> {
        let c01 = self.or(c0, c1, key)?;
        self.nor(&c01, c2, key)
    }

    fn refresh(&mut self, c: &FheBool, key: &Self::Key) -> FheResult<FheBool> {
        self.linear_then_pbs(&[c], 1, &key.test_vectors.identity, key)
    }

    fn not(&self, c: &FheBool) -> FheBool {
        let mut out = c.clone();
        self.not_inplace(&mut out);
        out
    }

    fn not_inplace(&self, c: &mut FheBool) {
        let lwe_modop = &self.pbs_info.lwe_modop;
        lwe_modop.elwise_neg_mut(&mut c.data);
        let delta = self.pbs_info.parameters.delta();
        c.data[0] = ArithmeticOps::add(lwe_modop, &c.data[0], &delta);
    }
}
