use crate::{
    backend::{ArithmeticOps, GetModulus, Modulus, VectorOps},
    decomposer::Decomposer,
    error::{FheError, FheResult},
    lwe::lwe_key_switch,
    ntt::Ntt,
    rgsw::{cmux, cmux_scratch_rows, monomial_mul},
    utils::switch_modulus_round_even,
    Matrix, MatrixMut, RowMut,
};

/// Everything the bootstrap pipeline needs to know about the parameter
/// context. The Boolean evaluator implements this.
pub(crate) trait PbsInfo {
    type M: Matrix<MatElement = u64>;
    type Modulus: Modulus<Element = u64>;
    type NttOp: Ntt<Element = u64>;
    type D: Decomposer<Element = u64>;
    type RlweModOp: ArithmeticOps<Element = u64>
        + VectorOps<Element = u64>
        + GetModulus<Element = u64, M = Self::Modulus>;
    type LweModOp: ArithmeticOps<Element = u64>
        + VectorOps<Element = u64>
        + GetModulus<Element = u64, M = Self::Modulus>;

    /// RLWE ciphertext modulus Q
    fn rlwe_q(&self) -> &Self::Modulus;
    /// LWE ciphertext modulus q
    fn lwe_q(&self) -> &Self::Modulus;
    /// Blind rotation modulus 2N; rotation indices live in [0, 2N)
    fn br_q(&self) -> usize;
    /// Ring polynomial size N
    fn rlwe_n(&self) -> usize;
    /// LWE dimension n
    fn lwe_n(&self) -> usize;
    /// RLWE x RGSW decomposer
    fn rlwe_rgsw_decomposer(&self) -> &Self::D;
    /// LWE key switching decomposer
    fn lwe_decomposer(&self) -> &Self::D;
    fn modop_rlweq(&self) -> &Self::RlweModOp;
    fn modop_lweq(&self) -> &Self::LweModOp;
    fn nttop_rlweq(&self) -> &Self::NttOp;
}

/// Key material consumed by the bootstrap: one RGSW ciphertext per LWE
/// secret coordinate and the RLWE-to-LWE key switching key.
pub(crate) trait PbsKey {
    type M;

    /// RGSW ciphertext of the i-th LWE secret bit, evaluation domain
    fn rgsw_ct_lwe_si(&self, si: usize) -> &Self::M;
    /// LWE ksk to key switch from RLWE secret to LWE secret
    fn lwe_ksk(&self) -> &Self::M;
}

/// Scratch rows needed by [`pbs`]: the blind-rotation accumulator on top
/// of the CMUX scratch.
pub(crate) fn pbs_scratch_rows<D: Decomposer>(decomposer: &D) -> usize {
    2 + cmux_scratch_rows(decomposer)
}

/// Programmable bootstrap:
///
/// - modulus switch (a, b) from q down to the rotation group 2N,
/// - blind-rotate the test vector by the encrypted phase,
/// - sample extract coefficient 0,
/// - key switch back under the LWE secret,
/// - modulus switch Q down to q.
///
/// The result encrypts test_vec(phase(lwe_in)) with noise independent of
/// the input noise.
pub(crate) fn pbs<M, P, K>(
    pbs_info: &P,
    test_vec: &M::R,
    lwe_in: &M::R,
    lwe_out: &mut M::R,
    pbs_key: &K,
    scratch_matrix: &mut M,
    scratch_lwe_big: &mut M::R,
    scratch_lwe_small: &mut M::R,
) -> FheResult<()>
where
    M: MatrixMut<MatElement = u64>,
    M::R: RowMut<Element = u64>,
    P: PbsInfo<M = M>,
    K: PbsKey<M = M>,
{
    let rlwe_n = pbs_info.rlwe_n();
    let lwe_n = pbs_info.lwe_n();
    let br_q = pbs_info.br_q();
    let lwe_q = pbs_info.lwe_q().q();
    let rlwe_q = pbs_info.rlwe_q().q();

    if lwe_in.as_ref().len() != lwe_n + 1 || lwe_out.as_ref().len() != lwe_n + 1 {
        return Err(FheError::BootstrapFailed("lwe dimension mismatch"));
    }
    if test_vec.as_ref().len() != rlwe_n {
        return Err(FheError::BootstrapFailed("test vector length mismatch"));
    }
    if scratch_lwe_big.as_ref().len() != rlwe_n + 1 {
        return Err(FheError::BootstrapFailed("extract buffer length mismatch"));
    }
    if scratch_lwe_small.as_ref().len() != lwe_n + 1 {
        return Err(FheError::BootstrapFailed("key switch buffer length mismatch"));
    }
    if scratch_matrix.dimension() != (pbs_scratch_rows(pbs_info.rlwe_rgsw_decomposer()), rlwe_n) {
        return Err(FheError::BootstrapFailed("scratch shape mismatch"));
    }

    let rlwe_modop = pbs_info.modop_rlweq();

    // mod switch q -> 2N; the switched coefficients index rotations
    let b_tilde = switch_modulus_round_even(lwe_in.as_ref()[0], lwe_q, br_q as u64) as usize;
    let a_tilde: Vec<usize> = lwe_in.as_ref()[1..]
        .iter()
        .map(|a| switch_modulus_round_even(*a, lwe_q, br_q as u64) as usize)
        .collect();

    // accumulator as trivial RLWE (0, X^{-b~} * T)
    let (acc_rows, cmux_scratch) = scratch_matrix.split_at_row_mut(2);
    acc_rows[0].as_mut().fill(0);
    let neg_b_exp = (br_q - b_tilde) % br_q;
    monomial_mul(test_vec.as_ref(), acc_rows[1].as_mut(), neg_b_exp, rlwe_modop);

    // blind rotation: acc <- CMUX(BK_i, acc, X^{a~_i} * acc)
    let mut acc = RowsRef { rows: acc_rows };
    let mut cmux_scratch = RowsRef {
        rows: cmux_scratch,
    };
    for (i, a_i) in a_tilde.iter().enumerate() {
        cmux(
            &mut acc,
            pbs_key.rgsw_ct_lwe_si(i),
            *a_i,
            &mut cmux_scratch,
            pbs_info.rlwe_rgsw_decomposer(),
            pbs_info.nttop_rlweq(),
            rlwe_modop,
        );
    }

    // sample extract coefficient 0 into an LWE under the RLWE secret
    sample_extract(scratch_lwe_big, &acc, rlwe_modop, 0);

    // key switch back to the LWE secret, still at Q
    scratch_lwe_small.as_mut().fill(0);
    lwe_key_switch(
        scratch_lwe_small,
        scratch_lwe_big,
        pbs_key.lwe_ksk(),
        rlwe_modop,
        pbs_info.lwe_decomposer(),
    );

    // mod switch Q -> q
    for (out, v) in lwe_out
        .as_mut()
        .iter_mut()
        .zip(scratch_lwe_small.as_ref().iter())
    {
        *out = switch_modulus_round_even(*v, rlwe_q, lwe_q);
    }

    Ok(())
}

/// Borrowed matrix view over a row slice, so the accumulator and the CMUX
/// scratch can live side by side in one pooled allocation.
struct RowsRef<'a, R> {
    rows: &'a mut [R],
}

impl<'a, R: RowMut<Element = u64>> AsRef<[R]> for RowsRef<'a, R> {
    fn as_ref(&self) -> &[R] {
        self.rows
    }
}

impl<'a, R: RowMut<Element = u64>> AsMut<[R]> for RowsRef<'a, R> {
    fn as_mut(&mut self) -> &mut [R] {
        self.rows
    }
}

impl<'a, R: RowMut<Element = u64>> Matrix for RowsRef<'a, R> {
    type MatElement = u64;
    type R = R;

    fn dimension(&self) -> (usize, usize) {
        (
            self.rows.len(),
            self.rows.first().map(|r| r.as_ref().len()).unwrap_or(0),
        )
    }
}

impl<'a, R: RowMut<Element = u64>> MatrixMut for RowsRef<'a, R> {}

/// Converts the RLWE coefficient at `index` into an LWE sample under the
/// RLWE secret: b' = b[index], a'[i] = a[index - i] for i <= index and
/// -a[N + index - i] above, following the X^N = -1 wrap rule.
pub(crate) fn sample_extract<M, Op>(lwe_out: &mut M::R, rlwe_in: &M, mod_op: &Op, index: usize)
where
    M: Matrix<MatElement = u64>,
    M::R: RowMut<Element = u64>,
    Op: ArithmeticOps<Element = u64>,
{
    let ring_size = rlwe_in.dimension().1;
    debug_assert!(ring_size + 1 == lwe_out.as_ref().len());

    // index..=0
    let to = &mut lwe_out.as_mut()[1..];
    let from = rlwe_in.get_row_slice(0);
    for i in 0..index + 1 {
        to[i] = from[index - i];
    }

    // -(N..index)
    for i in index + 1..ring_size {
        to[i] = mod_op.neg(&from[ring_size + index - i]);
    }

    // set b
    lwe_out.as_mut()[0] = *rlwe_in.get(1, index);
}

/// Half-open true arc [lo, hi) on the torus [0, q), wrapping allowed.
/// Gate arcs span exactly half the torus, which is precisely the class of
/// tables a negacyclic polynomial can encode.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TestVectorArc {
    lo: u64,
    hi: u64,
}

impl TestVectorArc {
    pub(crate) fn new(lo: u64, hi: u64) -> Self {
        TestVectorArc { lo, hi }
    }

    fn contains(&self, x: u64) -> bool {
        if self.lo <= self.hi {
            self.lo <= x && x < self.hi
        } else {
            x >= self.lo || x < self.hi
        }
    }
}

/// Builds the test polynomial for a gate arc: coefficient j holds
/// +delta_Q/2 when rotation phase j lands in the true arc and -delta_Q/2
/// otherwise. Phases in [N, 2N) are reached through the X^N = -1 wrap,
/// which the half-torus arc keeps consistent.
pub(crate) fn gate_test_vector(
    arc: TestVectorArc,
    rlwe_q: u64,
    lwe_q: u64,
    rlwe_n: usize,
) -> Vec<u64> {
    let br_q = 2 * rlwe_n as u64;
    let half_delta = rlwe_q / 16;
    let neg_half_delta = rlwe_q - half_delta;

    (0..rlwe_n as u64)
        .map(|j| {
            // rotation index j corresponds to torus phase j * q / 2N
            let phase_q = j * lwe_q / br_q;
            if arc.contains(phase_q) {
                half_delta
            } else {
                neg_half_delta
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CiphertextModulus, ModInit, ModularOpsU64};

    #[test]
    fn arcs_wrap_around_the_torus() {
        let wrapping = TestVectorArc::new(24576, 8192);
        assert!(wrapping.contains(0));
        assert!(wrapping.contains(30000));
        assert!(!wrapping.contains(8192));
        assert!(!wrapping.contains(16384));

        let plain = TestVectorArc::new(6144, 22528);
        assert!(plain.contains(8192));
        assert!(!plain.contains(0));
        assert!(!plain.contains(22528));
    }

    #[test]
    fn test_vector_follows_its_arc() {
        let rlwe_q = 132120577u64;
        let lwe_q = 1u64 << 15;
        let n = 1024;
        let arc = TestVectorArc::new(2048, 18432);
        let tv = gate_test_vector(arc, rlwe_q, lwe_q, n);

        let half = rlwe_q / 16;
        // phase 0 is false, phase q/8 (N/8 rotations) is true
        assert_eq!(tv[0], rlwe_q - half);
        assert_eq!(tv[n / 8], half);

        for j in 0..n as u64 {
            let phase_q = j * lwe_q / (2 * n as u64);
            let want = if arc.contains(phase_q) {
                half
            } else {
                rlwe_q - half
            };
            assert_eq!(tv[j as usize], want);
        }
    }

    #[test]
    fn sample_extract_index_zero_applies_negacyclic_signs() {
        let q = CiphertextModulus::new(132120577u64);
        let modop = ModularOpsU64::new(q);

        let a = vec![1u64, 2, 3, 4];
        let b = vec![10u64, 20, 30, 40];
        let rlwe = vec![a, b];

        let mut lwe = vec![0u64; 5];
        sample_extract(&mut lwe, &rlwe, &modop, 0);

        // b' = b[0]; a' = (a[0], -a[3], -a[2], -a[1])
        assert_eq!(lwe[0], 10);
        assert_eq!(lwe[1], 1);
        assert_eq!(lwe[2], q.q() - 4);
        assert_eq!(lwe[3], q.q() - 3);
        assert_eq!(lwe[4], q.q() - 2);
    }
}
