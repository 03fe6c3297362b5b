use itertools::{izip, Itertools};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::{
    backend::{ArithmeticOps, GetModulus, VectorOps},
    decomposer::Decomposer,
    error::FheResult,
    random::{RandomFill, RandomFillGaussianInModulus, RandomFillUniformInModulus},
    utils::{fill_random_binary_secret, fill_random_subset_selectors, TryConvertFrom1},
    Matrix, MatrixMut, Row, RowMut, Secret,
};

/// Binary LWE secret of dimension n.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LweSecret {
    pub(crate) values: Vec<i32>,
}

impl Secret for LweSecret {
    type Element = i32;
    fn values(&self) -> &[Self::Element] {
        &self.values
    }
}

impl LweSecret {
    pub(crate) fn random<R: RandomFill<[u8]>>(n: usize, rng: &mut R) -> LweSecret {
        let mut values = vec![0i32; n];
        fill_random_binary_secret(&mut values, rng);
        LweSecret { values }
    }

    pub(crate) fn from_values(values: Vec<i32>) -> LweSecret {
        LweSecret { values }
    }
}

/// Encrypts the already-encoded message `m` (e.g. delta * bit) as an LWE
/// ciphertext laid out as [b, a_0, .., a_{n-1}] with b = <a, s> + m + e.
pub(crate) fn encrypt_lwe<
    Ro: Row<Element = u64> + RowMut,
    Op: ArithmeticOps<Element = u64> + GetModulus<Element = u64>,
    R: RandomFillGaussianInModulus<[u64], Op::M> + RandomFillUniformInModulus<[u64], Op::M>,
>(
    lwe_out: &mut Ro,
    m: &u64,
    s: &LweSecret,
    operator: &Op,
    sigma: f64,
    rng: &mut R,
) -> FheResult<()> {
    let s = Vec::<u64>::try_convert_from(s.values(), operator.modulus());
    debug_assert!(s.len() == lwe_out.as_ref().len() - 1);

    // a * s
    RandomFillUniformInModulus::random_fill(rng, operator.modulus(), &mut lwe_out.as_mut()[1..]);
    let mut sa = u64::zero();
    izip!(lwe_out.as_ref().iter().skip(1), s.iter()).for_each(|(ai, si)| {
        sa = operator.add(&sa, &operator.mul(ai, si));
    });

    // b = a*s + e + m
    let mut e = [0u64; 1];
    RandomFillGaussianInModulus::random_fill(rng, operator.modulus(), sigma, &mut e)?;
    lwe_out.as_mut()[0] = operator.add(&operator.add(&sa, &e[0]), m);
    Ok(())
}

/// Returns the noisy phase b - <a, s>.
pub(crate) fn decrypt_lwe<
    Ro: Row<Element = u64>,
    Op: ArithmeticOps<Element = u64> + GetModulus<Element = u64>,
>(
    lwe_ct: &Ro,
    s: &LweSecret,
    operator: &Op,
) -> u64 {
    let s = Vec::<u64>::try_convert_from(s.values(), operator.modulus());

    let mut sa = u64::zero();
    izip!(lwe_ct.as_ref().iter().skip(1), s.iter()).for_each(|(ai, si)| {
        sa = operator.add(&sa, &operator.mul(ai, si));
    });

    operator.sub(&lwe_ct.as_ref()[0], &sa)
}

/// Fresh encryptions of zero; summing a random subset of them is a public
/// key encryption of zero.
pub(crate) fn lwe_zero_encryptions<
    M: MatrixMut<MatElement = u64>,
    Op: ArithmeticOps<Element = u64> + GetModulus<Element = u64>,
    R: RandomFillGaussianInModulus<[u64], Op::M> + RandomFillUniformInModulus<[u64], Op::M>,
>(
    pool_out: &mut M,
    s: &LweSecret,
    operator: &Op,
    sigma: f64,
    rng: &mut R,
) -> FheResult<()>
where
    M::R: RowMut,
{
    for row in pool_out.iter_rows_mut() {
        encrypt_lwe(row, &0, s, operator, sigma, rng)?;
    }
    Ok(())
}

/// Public key encryption: sum a random subset of the zero-encryption pool,
/// add fresh noise, then the encoded message on the body.
pub(crate) fn public_key_encrypt_lwe<
    Ro: Row<Element = u64> + RowMut,
    M: Matrix<MatElement = u64>,
    Op: ArithmeticOps<Element = u64> + VectorOps<Element = u64> + GetModulus<Element = u64>,
    R: RandomFillGaussianInModulus<[u64], Op::M> + RandomFill<[u8]>,
>(
    lwe_out: &mut Ro,
    m: &u64,
    pool: &M,
    operator: &Op,
    sigma: f64,
    rng: &mut R,
) -> FheResult<()> {
    let (rows, cols) = pool.dimension();
    debug_assert!(lwe_out.as_ref().len() == cols);

    let mut selectors = vec![false; rows];
    fill_random_subset_selectors(&mut selectors, rng);

    lwe_out.as_mut().fill(0);
    izip!(selectors.iter(), pool.iter_rows()).for_each(|(selected, row)| {
        if *selected {
            operator.elwise_add_mut(lwe_out.as_mut(), row.as_ref());
        }
    });

    let mut e = [0u64; 1];
    RandomFillGaussianInModulus::random_fill(rng, operator.modulus(), sigma, &mut e)?;
    lwe_out.as_mut()[0] = operator.add(&lwe_out.as_ref()[0], &operator.add(&e[0], m));
    Ok(())
}

/// Key switching key from `from_lwe_sk` (dimension N) to `to_lwe_sk`
/// (dimension n): for every source coordinate i and gadget level j one
/// LWE encryption of -s_i * beta_j under the target secret.
pub(crate) fn lwe_ksk_keygen<
    M: MatrixMut<MatElement = u64>,
    Op: ArithmeticOps<Element = u64> + GetModulus<Element = u64>,
    R: RandomFillGaussianInModulus<[u64], Op::M> + RandomFillUniformInModulus<[u64], Op::M>,
>(
    from_lwe_sk: &[i32],
    to_lwe_sk: &LweSecret,
    ksk_out: &mut M,
    gadget: &[u64],
    operator: &Op,
    sigma: f64,
    rng: &mut R,
) -> FheResult<()>
where
    M::R: RowMut,
{
    let d = gadget.len();
    debug_assert!(ksk_out.dimension() == (from_lwe_sk.len() * d, to_lwe_sk.values().len() + 1));

    let mut neg_sk_in = Vec::<u64>::try_convert_from(from_lwe_sk, operator.modulus());
    neg_sk_in.iter_mut().for_each(|v| *v = operator.neg(v));

    for (neg_si, ksk_rows) in izip!(
        neg_sk_in.iter(),
        ksk_out.iter_rows_mut().chunks(d).into_iter()
    ) {
        for (beta_j, lwe) in izip!(gadget.iter(), ksk_rows) {
            let m = operator.mul(neg_si, beta_j);
            encrypt_lwe(lwe, &m, to_lwe_sk, operator, sigma, rng)?;
        }
    }
    Ok(())
}

/// Key switches `lwe_in` (under the source secret) into `lwe_out` (under
/// the target secret). `lwe_out` must come in zeroed.
pub(crate) fn lwe_key_switch<
    M: Matrix<MatElement = u64>,
    Ro: Row<Element = u64> + RowMut,
    Op: ArithmeticOps<Element = u64> + VectorOps<Element = u64>,
    D: Decomposer<Element = u64>,
>(
    lwe_out: &mut Ro,
    lwe_in: &Ro,
    lwe_ksk: &M,
    operator: &Op,
    decomposer: &D,
) {
    let d = decomposer.decomposition_count();
    debug_assert!(lwe_ksk.dimension().0 == (lwe_in.as_ref().len() - 1) * d);
    debug_assert!(lwe_out.as_ref().len() == lwe_ksk.dimension().1);

    let mut digits = vec![0u64; d];
    let mut row_index = 0;
    for ai in lwe_in.as_ref().iter().skip(1) {
        decomposer.decompose_into(ai, &mut digits);
        for digit in digits.iter() {
            operator.elwise_fma_scalar_mut(
                lwe_out.as_mut(),
                lwe_ksk.get_row_slice(row_index),
                digit,
            );
            row_index += 1;
        }
    }

    let out_b = operator.add(&lwe_out.as_ref()[0], &lwe_in.as_ref()[0]);
    lwe_out.as_mut()[0] = out_b;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::{CiphertextModulus, ModInit, ModularOpsU64, Modulus, PowerOfTwoOpsU64},
        decomposer::DefaultDecomposer,
        random::{DefaultSecureRng, NewWithSeed},
        MatrixEntity,
    };

    #[test]
    fn encrypt_decrypt_works() {
        let q = CiphertextModulus::new(1u64 << 15);
        let modop = PowerOfTwoOpsU64::new(q);
        let mut rng = DefaultSecureRng::new_with_seed([11u8; 32]);
        let s = LweSecret::random(512, &mut rng);
        let delta = q.q() / 8;

        for m in 0..2u64 {
            let mut lwe = vec![0u64; 513];
            encrypt_lwe(&mut lwe, &(m * delta), &s, &modop, 4.0, &mut rng).unwrap();
            let phase = decrypt_lwe(&lwe, &s, &modop);
            let noise = q.map_element_to_i64(&modop.sub(&phase, &(m * delta)));
            assert!(noise.abs() < (delta / 2) as i64);
        }
    }

    #[test]
    fn public_key_pool_encrypts_fresh_values() {
        let q = CiphertextModulus::new(1u64 << 15);
        let modop = PowerOfTwoOpsU64::new(q);
        let mut rng = DefaultSecureRng::new_with_seed([13u8; 32]);
        let s = LweSecret::random(512, &mut rng);
        let delta = q.q() / 8;

        let mut pool = <Vec<Vec<u64>> as MatrixEntity>::zeros(1024, 513);
        lwe_zero_encryptions(&mut pool, &s, &modop, 4.0, &mut rng).unwrap();

        for m in [0u64, 1] {
            let mut lwe = vec![0u64; 513];
            public_key_encrypt_lwe(&mut lwe, &(m * delta), &pool, &modop, 4.0, &mut rng).unwrap();
            let phase = decrypt_lwe(&lwe, &s, &modop);
            let noise = q.map_element_to_i64(&modop.sub(&phase, &(m * delta)));
            assert!(noise.abs() < (delta / 2) as i64, "noise {noise}");
        }
    }

    #[test]
    fn key_switch_preserves_phase() {
        let q = CiphertextModulus::new(132120577u64);
        let modop = ModularOpsU64::new(q);
        let mut rng = DefaultSecureRng::new_with_seed([17u8; 32]);

        let from_sk = LweSecret::random(1024, &mut rng);
        let to_sk = LweSecret::random(512, &mut rng);

        let decomposer = DefaultDecomposer::new(q, 4, 5);
        let gadget = decomposer.gadget_vector();
        let mut ksk = <Vec<Vec<u64>> as MatrixEntity>::zeros(1024 * 5, 513);
        lwe_ksk_keygen(
            from_sk.values(),
            &to_sk,
            &mut ksk,
            &gadget,
            &modop,
            3.2,
            &mut rng,
        )
        .unwrap();

        // encode a bit at delta = q/8 under the source key
        let delta = q.q() / 8;
        for m in 0..2u64 {
            let mut lwe_in = vec![0u64; 1025];
            encrypt_lwe(&mut lwe_in, &(m * delta), &from_sk, &modop, 3.2, &mut rng).unwrap();

            let mut lwe_out = vec![0u64; 513];
            lwe_key_switch(&mut lwe_out, &lwe_in, &ksk, &modop, &decomposer);

            let phase = decrypt_lwe(&lwe_out, &to_sk, &modop);
            let noise = q.map_element_to_i64(&modop.sub(&phase, &(m * delta)));
            assert!(noise.abs() < (delta / 2) as i64, "noise {noise}");
        }
    }
}
