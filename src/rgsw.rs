use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::{
    backend::{ArithmeticOps, GetModulus, VectorOps},
    decomposer::Decomposer,
    error::FheResult,
    ntt::Ntt,
    random::{RandomFill, RandomFillGaussianInModulus, RandomFillUniformInModulus},
    utils::{fill_random_binary_secret, TryConvertFrom1},
    Matrix, MatrixMut, Row, RowMut, Secret,
};

/// Binary RLWE secret polynomial of degree N.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RlweSecret {
    pub(crate) values: Vec<i32>,
}

impl Secret for RlweSecret {
    type Element = i32;
    fn values(&self) -> &[Self::Element] {
        &self.values
    }
}

impl RlweSecret {
    pub(crate) fn random<R: RandomFill<[u8]>>(n: usize, rng: &mut R) -> RlweSecret {
        let mut values = vec![0i32; n];
        fill_random_binary_secret(&mut values, rng);
        RlweSecret { values }
    }

    pub(crate) fn from_values(values: Vec<i32>) -> RlweSecret {
        RlweSecret { values }
    }
}

/// RGSW row layout. An RGSW(m) ciphertext under decomposition count d is a
/// (4d x N) matrix holding 2d RLWE samples:
///
///   rows 0..d        a parts of RLWE'(-s m) = [RLWE(-s m beta_j)]_j
///   rows d..2d       b parts of RLWE'(-s m)
///   rows 2d..3d      a parts of RLWE'(m)    = [RLWE(m beta_j)]_j
///   rows 3d..4d      b parts of RLWE'(m)
///
/// RLWE ciphertexts are (2 x N) matrices [a, b] with b = a s + e + m.
pub(crate) fn rgsw_rows(d: usize) -> usize {
    4 * d
}

/// Encrypts message polynomial `m` as RLWE(m) = [a, b = a s + e + m].
pub(crate) fn secret_key_encrypt_rlwe<
    M: MatrixMut<MatElement = u64>,
    Op: VectorOps<Element = u64> + GetModulus<Element = u64>,
    NttOp: Ntt<Element = u64>,
    R: RandomFillGaussianInModulus<[u64], Op::M> + RandomFillUniformInModulus<[u64], Op::M>,
>(
    rlwe_out: &mut M,
    m: &[u64],
    s: &RlweSecret,
    mod_op: &Op,
    ntt_op: &NttOp,
    sigma: f64,
    rng: &mut R,
) -> FheResult<()>
where
    M::R: RowMut,
{
    let ring_size = s.values().len();
    debug_assert!(rlwe_out.dimension() == (2, ring_size));
    debug_assert!(m.len() == ring_size);

    let q = mod_op.modulus();

    // sample a
    RandomFillUniformInModulus::random_fill(rng, q, rlwe_out.get_row_mut(0));

    // a * s
    let mut sa = Vec::<u64>::try_convert_from(s.values(), q);
    ntt_op.forward(sa.as_mut());
    let mut a_eval = rlwe_out.get_row_slice(0).to_vec();
    ntt_op.forward(a_eval.as_mut());
    mod_op.elwise_mul_mut(sa.as_mut(), a_eval.as_ref());
    ntt_op.backward(sa.as_mut());

    // b = a*s + e + m
    RandomFillGaussianInModulus::random_fill(rng, q, sigma, rlwe_out.get_row_mut(1))?;
    mod_op.elwise_add_mut(rlwe_out.get_row_mut(1), m);
    mod_op.elwise_add_mut(rlwe_out.get_row_mut(1), sa.as_ref());
    Ok(())
}

/// Decrypts RLWE(m) = [a, b] and writes the noisy message b - a s.
pub(crate) fn decrypt_rlwe<
    M: Matrix<MatElement = u64>,
    Ro: Row<Element = u64> + RowMut,
    Op: VectorOps<Element = u64> + GetModulus<Element = u64>,
    NttOp: Ntt<Element = u64>,
>(
    rlwe_ct: &M,
    s: &RlweSecret,
    m_out: &mut Ro,
    ntt_op: &NttOp,
    mod_op: &Op,
) {
    let ring_size = s.values().len();
    debug_assert!(rlwe_ct.dimension() == (2, ring_size));
    debug_assert!(m_out.as_ref().len() == ring_size);

    // -(s * a)
    m_out.as_mut().copy_from_slice(rlwe_ct.get_row_slice(0));
    ntt_op.forward(m_out.as_mut());
    let mut s = Vec::<u64>::try_convert_from(s.values(), mod_op.modulus());
    ntt_op.forward(s.as_mut());
    mod_op.elwise_mul_mut(m_out.as_mut(), s.as_ref());
    mod_op.elwise_neg_mut(m_out.as_mut());
    ntt_op.backward(m_out.as_mut());

    // m + e = b - s*a
    mod_op.elwise_add_mut(m_out.as_mut(), rlwe_ct.get_row_slice(1));
}

/// Returns RGSW(m) under secret `s` in the layout documented above.
///
/// RLWE'(-sm) avoids computing s*m explicitly: encrypt with fresh a_i,
/// b_i = a_i s + e, then add beta_j * m onto a_i. Decrypting such a row
/// gives b_i - (a_i + beta_j m) s = e - s m beta_j as required.
pub(crate) fn secret_key_encrypt_rgsw<
    M: MatrixMut<MatElement = u64>,
    Op: VectorOps<Element = u64> + GetModulus<Element = u64>,
    NttOp: Ntt<Element = u64>,
    R: RandomFillGaussianInModulus<[u64], Op::M> + RandomFillUniformInModulus<[u64], Op::M>,
>(
    out_rgsw: &mut M,
    m: &[u64],
    gadget: &[u64],
    s: &RlweSecret,
    mod_op: &Op,
    ntt_op: &NttOp,
    sigma: f64,
    rng: &mut R,
) -> FheResult<()>
where
    M::R: RowMut,
{
    let d = gadget.len();
    let ring_size = s.values().len();
    debug_assert!(out_rgsw.dimension() == (rgsw_rows(d), ring_size));
    debug_assert!(m.len() == ring_size);

    let q = mod_op.modulus();

    let mut s_eval = Vec::<u64>::try_convert_from(s.values(), q);
    ntt_op.forward(s_eval.as_mut());

    let mut scratch = vec![0u64; ring_size];

    // RLWE'(-sm)
    let (rlwe_dash_nsm, rlwe_dash_m) = out_rgsw.split_at_row_mut(2 * d);
    let (nsm_a, nsm_b) = rlwe_dash_nsm.split_at_mut(d);
    for (ai, bi, beta_j) in izip!(nsm_a.iter_mut(), nsm_b.iter_mut(), gadget.iter()) {
        // sample a_i
        RandomFillUniformInModulus::random_fill(rng, q, ai.as_mut());

        // a_i * s
        scratch.copy_from_slice(ai.as_ref());
        ntt_op.forward(scratch.as_mut());
        mod_op.elwise_mul_mut(scratch.as_mut(), s_eval.as_ref());
        ntt_op.backward(scratch.as_mut());

        // b_i = e_i + a_i * s
        RandomFillGaussianInModulus::random_fill(rng, q, sigma, bi.as_mut())?;
        mod_op.elwise_add_mut(bi.as_mut(), scratch.as_ref());

        // a_i + beta_j * m
        mod_op.elwise_scalar_mul(scratch.as_mut(), m, beta_j);
        mod_op.elwise_add_mut(ai.as_mut(), scratch.as_ref());
    }

    // RLWE'(m)
    let (m_a, m_b) = rlwe_dash_m.split_at_mut(d);
    for (ai, bi, beta_j) in izip!(m_a.iter_mut(), m_b.iter_mut(), gadget.iter()) {
        // sample a_i
        RandomFillUniformInModulus::random_fill(rng, q, ai.as_mut());

        // a_i * s
        scratch.copy_from_slice(ai.as_ref());
        ntt_op.forward(scratch.as_mut());
        mod_op.elwise_mul_mut(scratch.as_mut(), s_eval.as_ref());
        ntt_op.backward(scratch.as_mut());

        // b_i = e_i + a_i*s + beta_j * m
        RandomFillGaussianInModulus::random_fill(rng, q, sigma, bi.as_mut())?;
        mod_op.elwise_add_mut(bi.as_mut(), scratch.as_ref());
        mod_op.elwise_scalar_mul(scratch.as_mut(), m, beta_j);
        mod_op.elwise_add_mut(bi.as_mut(), scratch.as_ref());
    }

    Ok(())
}

/// Moves every RGSW row into the NTT evaluation domain. Server-side keys
/// stay in this form for the lifetime of the process.
pub(crate) fn rgsw_to_evaluation_domain<M: MatrixMut<MatElement = u64>, NttOp: Ntt<Element = u64>>(
    rgsw: &mut M,
    ntt_op: &NttOp,
) where
    M::R: RowMut,
{
    rgsw.iter_rows_mut()
        .for_each(|row| ntt_op.forward(row.as_mut()));
}

/// Scratch rows required by [`rlwe_by_rgsw_accumulate`] / [`cmux`]:
/// 2 diff rows, 2d digit rows, 2 evaluation-domain accumulator rows.
pub(crate) fn cmux_scratch_rows<D: Decomposer>(decomposer: &D) -> usize {
    2 * decomposer.decomposition_count() + 4
}

/// External product accumulate: rlwe_out += RGSW(m) (x) rlwe_in, where
/// `rlwe_in` arrives in the two leading scratch rows (coefficient domain)
/// and is consumed. `rgsw_eval` must be in the evaluation domain.
fn rlwe_by_rgsw_accumulate<
    M: MatrixMut<MatElement = u64>,
    Mkey: Matrix<MatElement = u64>,
    Op: ArithmeticOps<Element = u64> + VectorOps<Element = u64>,
    NttOp: Ntt<Element = u64>,
    D: Decomposer<Element = u64>,
>(
    rlwe_out: &mut M,
    rgsw_eval: &Mkey,
    scratch: &mut M,
    decomposer: &D,
    ntt_op: &NttOp,
    mod_op: &Op,
) where
    M::R: RowMut,
{
    let d = decomposer.decomposition_count();
    let ring_size = rlwe_out.dimension().1;
    debug_assert!(rgsw_eval.dimension() == (rgsw_rows(d), ring_size));
    debug_assert!(scratch.dimension().0 >= cmux_scratch_rows(decomposer));

    let mut digits = vec![0u64; d];

    // scratch rows: [0, 1] = input rlwe (diff), [2, 2 + 2d) = digit rows,
    // [2 + 2d, 4 + 2d) = eval-domain accumulators
    let (input_rows, rest) = scratch.split_at_row_mut(2);
    let (digit_rows, acc_rows) = rest.split_at_mut(2 * d);

    // decompose both input polynomials, digit rows then move to eval domain
    for (part, input) in input_rows.iter().enumerate() {
        for (k, coeff) in input.as_ref().iter().enumerate() {
            decomposer.decompose_into(coeff, &mut digits);
            for (j, digit) in digits.iter().enumerate() {
                digit_rows[part * d + j].as_mut()[k] = *digit;
            }
        }
    }
    digit_rows
        .iter_mut()
        .for_each(|row| ntt_op.forward(row.as_mut()));

    // acc_a = sum_j dig_a_j * A_j(-sm) + dig_b_j * A_j(m)
    // acc_b = sum_j dig_a_j * B_j(-sm) + dig_b_j * B_j(m)
    acc_rows.iter_mut().for_each(|row| row.as_mut().fill(0));
    for j in 0..d {
        let dig_a = digit_rows[j].as_ref();
        let dig_b = digit_rows[d + j].as_ref();
        mod_op.elwise_fma_mut(acc_rows[0].as_mut(), dig_a, rgsw_eval.get_row_slice(j));
        mod_op.elwise_fma_mut(acc_rows[1].as_mut(), dig_a, rgsw_eval.get_row_slice(d + j));
        mod_op.elwise_fma_mut(acc_rows[0].as_mut(), dig_b, rgsw_eval.get_row_slice(2 * d + j));
        mod_op.elwise_fma_mut(acc_rows[1].as_mut(), dig_b, rgsw_eval.get_row_slice(3 * d + j));
    }

    for (out_row, acc_row) in izip!(rlwe_out.iter_rows_mut(), acc_rows.iter_mut()) {
        ntt_op.backward(acc_row.as_mut());
        mod_op.elwise_add_mut(out_row.as_mut(), acc_row.as_ref());
    }
}

/// Overwriting external product, used by key generation tests and anywhere
/// a plain RLWE x RGSW product is needed.
pub(crate) fn rlwe_by_rgsw<
    M: MatrixMut<MatElement = u64>,
    Mkey: Matrix<MatElement = u64>,
    Op: ArithmeticOps<Element = u64> + VectorOps<Element = u64>,
    NttOp: Ntt<Element = u64>,
    D: Decomposer<Element = u64>,
>(
    rlwe: &mut M,
    rgsw_eval: &Mkey,
    scratch: &mut M,
    decomposer: &D,
    ntt_op: &NttOp,
    mod_op: &Op,
) where
    M::R: RowMut,
{
    {
        let (input_rows, _) = scratch.split_at_row_mut(2);
        input_rows[0].as_mut().copy_from_slice(rlwe.get_row_slice(0));
        input_rows[1].as_mut().copy_from_slice(rlwe.get_row_slice(1));
    }
    rlwe.iter_rows_mut().for_each(|row| row.as_mut().fill(0));
    rlwe_by_rgsw_accumulate(rlwe, rgsw_eval, scratch, decomposer, ntt_op, mod_op);
}

/// Monomial multiplication p(X) * X^exp in Z_q[X]/(X^N + 1) with
/// exp in [0, 2N). Exponents of N and above pick up the X^N = -1 sign.
pub(crate) fn monomial_mul<Op: ArithmeticOps<Element = u64>>(
    p_in: &[u64],
    p_out: &mut [u64],
    exp: usize,
    mod_op: &Op,
) {
    let ring_size = p_in.len();
    debug_assert!(p_out.len() == ring_size);
    debug_assert!(exp < 2 * ring_size);

    let (exp, flip) = if exp >= ring_size {
        (exp - ring_size, true)
    } else {
        (exp, false)
    };

    p_in.iter().enumerate().for_each(|(index, v)| {
        let mut to_index = index + exp;
        let mut negate = flip;
        if to_index >= ring_size {
            to_index -= ring_size;
            negate = !negate;
        }
        p_out[to_index] = if negate { mod_op.neg(v) } else { *v };
    });
}

/// CMUX step of blind rotation: acc <- acc + RGSW(s_i) (x) (X^exp * acc - acc).
/// When the encrypted selector bit is 1 this rotates acc by X^exp, when it
/// is 0 it leaves acc unchanged (up to additive noise).
pub(crate) fn cmux<
    M: MatrixMut<MatElement = u64>,
    Mkey: Matrix<MatElement = u64>,
    Op: ArithmeticOps<Element = u64> + VectorOps<Element = u64>,
    NttOp: Ntt<Element = u64>,
    D: Decomposer<Element = u64>,
>(
    acc: &mut M,
    rgsw_eval: &Mkey,
    exp: usize,
    scratch: &mut M,
    decomposer: &D,
    ntt_op: &NttOp,
    mod_op: &Op,
) where
    M::R: RowMut,
{
    if exp == 0 {
        return;
    }

    {
        let (diff_rows, _) = scratch.split_at_row_mut(2);
        for (diff, acc_row) in izip!(diff_rows.iter_mut(), acc.iter_rows()) {
            monomial_mul(acc_row.as_ref(), diff.as_mut(), exp, mod_op);
            mod_op.elwise_sub_mut(diff.as_mut(), acc_row.as_ref());
        }
    }
    rlwe_by_rgsw_accumulate(acc, rgsw_eval, scratch, decomposer, ntt_op, mod_op);
}
