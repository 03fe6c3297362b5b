use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::{
    backend::Modulus,
    error::{FheError, FheResult},
};

/// Consecutive rejections tolerated by the Gaussian sampler before it
/// reports `RngExhausted`. A sample is rejected only when its magnitude
/// reaches q/2, so with any sane sigma this bound is unreachable.
const MAX_GAUSSIAN_REJECTS: usize = 128;

pub trait NewWithSeed {
    type Seed;
    fn new_with_seed(seed: Self::Seed) -> Self;
}

pub trait RandomFill<C: ?Sized> {
    fn random_fill(&mut self, container: &mut C);
}

pub trait RandomFillUniformInModulus<C: ?Sized, M> {
    fn random_fill(&mut self, modulus: &M, container: &mut C);
}

pub trait RandomFillGaussianInModulus<C: ?Sized, M> {
    fn random_fill(&mut self, modulus: &M, sigma: f64, container: &mut C) -> FheResult<()>;
}

/// Default cryptographically strong PRG. Entropy-seeded by default,
/// seedable for deterministic tests and key derivation.
pub struct DefaultSecureRng {
    rng: ChaCha8Rng,
}

impl DefaultSecureRng {
    pub fn new() -> Self {
        let mut seed = <ChaCha8Rng as SeedableRng>::Seed::default();
        rand::thread_rng().fill_bytes(&mut seed);
        DefaultSecureRng {
            rng: ChaCha8Rng::from_seed(seed),
        }
    }
}

impl Default for DefaultSecureRng {
    fn default() -> Self {
        Self::new()
    }
}

impl NewWithSeed for DefaultSecureRng {
    type Seed = [u8; 32];
    fn new_with_seed(seed: Self::Seed) -> Self {
        DefaultSecureRng {
            rng: ChaCha8Rng::from_seed(seed),
        }
    }
}

impl RandomFill<[u8]> for DefaultSecureRng {
    fn random_fill(&mut self, container: &mut [u8]) {
        self.rng.fill_bytes(container);
    }
}

impl<M: Modulus<Element = u64>> RandomFillUniformInModulus<[u64], M> for DefaultSecureRng {
    fn random_fill(&mut self, modulus: &M, container: &mut [u64]) {
        let q = modulus.q();
        if q.is_power_of_two() {
            let mask = q - 1;
            container
                .iter_mut()
                .for_each(|v| *v = self.rng.next_u64() & mask);
        } else {
            // rejection sample the smallest power-of-two cover of q
            let mask = q.next_power_of_two() - 1;
            container.iter_mut().for_each(|v| {
                *v = loop {
                    let candidate = self.rng.next_u64() & mask;
                    if candidate < q {
                        break candidate;
                    }
                };
            });
        }
    }
}

impl<M: Modulus<Element = u64>> RandomFillGaussianInModulus<[u64], M> for DefaultSecureRng {
    fn random_fill(&mut self, modulus: &M, sigma: f64, container: &mut [u64]) -> FheResult<()> {
        let normal = Normal::new(0.0, sigma).unwrap();
        let bound = modulus.q_as_f64() / 2.0;
        for v in container.iter_mut() {
            let mut attempts = 0;
            let sample = loop {
                let s = normal.sample(&mut self.rng).round();
                if s.abs() < bound {
                    break s as i64;
                }
                attempts += 1;
                if attempts >= MAX_GAUSSIAN_REJECTS {
                    return Err(FheError::RngExhausted);
                }
            };
            *v = modulus.map_element_from_i64(sample);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CiphertextModulus;

    #[test]
    fn seeded_prg_is_deterministic() {
        let mut a = DefaultSecureRng::new_with_seed([7u8; 32]);
        let mut b = DefaultSecureRng::new_with_seed([7u8; 32]);

        let q = CiphertextModulus::new(132120577u64);
        let mut va = vec![0u64; 64];
        let mut vb = vec![0u64; 64];
        RandomFillUniformInModulus::random_fill(&mut a, &q, va.as_mut_slice());
        RandomFillUniformInModulus::random_fill(&mut b, &q, vb.as_mut_slice());
        assert_eq!(va, vb);
        assert!(va.iter().all(|v| *v < q.q()));
    }

    #[test]
    fn gaussian_samples_are_small_and_centred() {
        let mut rng = DefaultSecureRng::new_with_seed([3u8; 32]);
        let q = CiphertextModulus::new(1u64 << 15);
        let sigma = 4.0;

        let mut v = vec![0u64; 4096];
        RandomFillGaussianInModulus::random_fill(&mut rng, &q, sigma, v.as_mut_slice()).unwrap();

        let mut sum = 0i64;
        for s in v.iter() {
            let lifted = q.map_element_to_i64(s);
            assert!(lifted.abs() < (8.0 * sigma) as i64);
            sum += lifted;
        }
        let mean = sum as f64 / v.len() as f64;
        assert!(mean.abs() < 1.0, "mean {mean} too far from zero");
    }
}
