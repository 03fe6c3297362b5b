use crate::{backend::Modulus, random::RandomFill};

/// Fills `out` with a uniformly random binary vector.
pub(crate) fn fill_random_binary_secret<R: RandomFill<[u8]>>(out: &mut [i32], rng: &mut R) {
    let mut bytes = vec![0u8; (out.len() + 7) / 8];
    rng.random_fill(&mut bytes);
    out.iter_mut().enumerate().for_each(|(i, v)| {
        *v = ((bytes[i >> 3] >> (i & 7)) & 1) as i32;
    });
}

/// Conversion of small signed vectors (secrets, test helpers) into the
/// representation modulo q.
pub trait TryConvertFrom1<T: ?Sized, P> {
    fn try_convert_from(value: &T, parameters: &P) -> Self;
}

impl<M: Modulus<Element = u64>> TryConvertFrom1<[i32], M> for Vec<u64> {
    fn try_convert_from(value: &[i32], parameters: &M) -> Self {
        value
            .iter()
            .map(|v| parameters.map_element_from_i64(*v as i64))
            .collect()
    }
}

impl<M: Modulus<Element = u64>> TryConvertFrom1<[u64], M> for Vec<i64> {
    fn try_convert_from(value: &[u64], parameters: &M) -> Self {
        value
            .iter()
            .map(|v| parameters.map_element_to_i64(v))
            .collect()
    }
}

/// Rescales `v` from Z_from to Z_to with nearest rounding, breaking ties
/// towards the even quotient. For odd `from` ties cannot occur; on the
/// power-of-two path they can and the even rule keeps the rescale unbiased.
pub(crate) fn switch_modulus_round_even(v: u64, from: u64, to: u64) -> u64 {
    debug_assert!(v < from);
    let num = v as u128 * to as u128;
    let quot = num / from as u128;
    let rem = num % from as u128;
    let rounded = match (rem << 1).cmp(&(from as u128)) {
        std::cmp::Ordering::Less => quot,
        std::cmp::Ordering::Greater => quot + 1,
        std::cmp::Ordering::Equal => {
            if quot & 1 == 0 {
                quot
            } else {
                quot + 1
            }
        }
    };
    (rounded % to as u128) as u64
}

/// Draws `count` distinct-enough subset selectors for the public key pool:
/// one bit per pool row.
pub(crate) fn fill_random_subset_selectors<R: RandomFill<[u8]>>(out: &mut [bool], rng: &mut R) {
    let mut bytes = vec![0u8; (out.len() + 7) / 8];
    rng.random_fill(&mut bytes);
    out.iter_mut().enumerate().for_each(|(i, v)| {
        *v = (bytes[i >> 3] >> (i & 7)) & 1 == 1;
    });
}
