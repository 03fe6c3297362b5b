use num_bigint_dig::{prime::probably_prime, BigUint};
use serde::{Deserialize, Serialize};

/// Ciphertext modulus handle. Wraps the concrete value together with the
/// centred-lift helpers every layer above needs.
pub trait Modulus {
    type Element;

    fn q(&self) -> Self::Element;
    /// Bits required to represent an element, i.e. ceil(log2 q).
    fn log_q(&self) -> usize;
    fn q_as_f64(&self) -> f64;
    fn is_power_of_2(&self) -> bool;
    /// Lift into [-q/2, q/2)
    fn map_element_to_i64(&self, v: &Self::Element) -> i64;
    fn map_element_from_i64(&self, v: i64) -> Self::Element;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextModulus<T>(T);

impl CiphertextModulus<u64> {
    pub const fn new(q: u64) -> Self {
        Self(q)
    }
}

impl Modulus for CiphertextModulus<u64> {
    type Element = u64;

    fn q(&self) -> u64 {
        self.0
    }

    fn log_q(&self) -> usize {
        64 - (self.0 - 1).leading_zeros() as usize
    }

    fn q_as_f64(&self) -> f64 {
        self.0 as f64
    }

    fn is_power_of_2(&self) -> bool {
        self.0.is_power_of_two()
    }

    fn map_element_to_i64(&self, v: &u64) -> i64 {
        if *v >= self.0 >> 1 {
            -((self.0 - v) as i64)
        } else {
            *v as i64
        }
    }

    fn map_element_from_i64(&self, v: i64) -> u64 {
        let q = self.0 as i64;
        v.rem_euclid(q) as u64
    }
}

pub trait ModInit {
    type M;
    fn new(modulus: Self::M) -> Self;
}

pub trait GetModulus {
    type Element;
    type M: Modulus<Element = Self::Element>;
    fn modulus(&self) -> &Self::M;
}

pub trait ArithmeticOps {
    type Element;

    fn add(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn sub(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn mul(&self, a: &Self::Element, b: &Self::Element) -> Self::Element;
    fn neg(&self, a: &Self::Element) -> Self::Element;
}

pub trait VectorOps {
    type Element;

    fn elwise_add_mut(&self, a: &mut [Self::Element], b: &[Self::Element]);
    fn elwise_sub_mut(&self, a: &mut [Self::Element], b: &[Self::Element]);
    fn elwise_neg_mut(&self, a: &mut [Self::Element]);
    fn elwise_mul_mut(&self, a: &mut [Self::Element], b: &[Self::Element]);
    fn elwise_scalar_mul(&self, out: &mut [Self::Element], a: &[Self::Element], c: &Self::Element);
    fn elwise_scalar_mul_mut(&self, a: &mut [Self::Element], c: &Self::Element);
    /// out += a * b element-wise
    fn elwise_fma_mut(&self, out: &mut [Self::Element], a: &[Self::Element], b: &[Self::Element]);
    /// out += a * c element-wise
    fn elwise_fma_scalar_mut(
        &self,
        out: &mut [Self::Element],
        a: &[Self::Element],
        c: &Self::Element,
    );
}

/// Modulus operations over an odd (in practice prime) u64 modulus.
/// Products are reduced out of a u128 widening multiply.
pub struct ModularOpsU64 {
    q: CiphertextModulus<u64>,
}

impl ModularOpsU64 {
    /// The RLWE modulus must be prime for the negacyclic NTT to exist.
    pub fn is_prime(q: u64) -> bool {
        probably_prime(&BigUint::from(q), 20)
    }

    fn reduce(&self, v: u128) -> u64 {
        (v % self.q.q() as u128) as u64
    }
}

impl ModInit for ModularOpsU64 {
    type M = CiphertextModulus<u64>;
    fn new(modulus: Self::M) -> Self {
        debug_assert!(modulus.q() & 1 == 1, "modulus must be odd");
        ModularOpsU64 { q: modulus }
    }
}

impl GetModulus for ModularOpsU64 {
    type Element = u64;
    type M = CiphertextModulus<u64>;
    fn modulus(&self) -> &Self::M {
        &self.q
    }
}

impl ArithmeticOps for ModularOpsU64 {
    type Element = u64;

    fn add(&self, a: &u64, b: &u64) -> u64 {
        let q = self.q.q();
        let s = a + b;
        if s >= q {
            s - q
        } else {
            s
        }
    }

    fn sub(&self, a: &u64, b: &u64) -> u64 {
        let q = self.q.q();
        if a >= b {
            a - b
        } else {
            q + a - b
        }
    }

    fn mul(&self, a: &u64, b: &u64) -> u64 {
        self.reduce(*a as u128 * *b as u128)
    }

    fn neg(&self, a: &u64) -> u64 {
        if *a == 0 {
            0
        } else {
            self.q.q() - a
        }
    }
}

impl VectorOps for ModularOpsU64 {
    type Element = u64;

    fn elwise_add_mut(&self, a: &mut [u64], b: &[u64]) {
        a.iter_mut().zip(b.iter()).for_each(|(ai, bi)| {
            *ai = ArithmeticOps::add(self, ai, bi);
        });
    }

    fn elwise_sub_mut(&self, a: &mut [u64], b: &[u64]) {
        a.iter_mut().zip(b.iter()).for_each(|(ai, bi)| {
            *ai = ArithmeticOps::sub(self, ai, bi);
        });
    }

    fn elwise_neg_mut(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = ArithmeticOps::neg(self, ai));
    }

    fn elwise_mul_mut(&self, a: &mut [u64], b: &[u64]) {
        a.iter_mut().zip(b.iter()).for_each(|(ai, bi)| {
            *ai = ArithmeticOps::mul(self, ai, bi);
        });
    }

    fn elwise_scalar_mul(&self, out: &mut [u64], a: &[u64], c: &u64) {
        out.iter_mut().zip(a.iter()).for_each(|(oi, ai)| {
            *oi = ArithmeticOps::mul(self, ai, c);
        });
    }

    fn elwise_scalar_mul_mut(&self, a: &mut [u64], c: &u64) {
        a.iter_mut().for_each(|ai| *ai = ArithmeticOps::mul(self, ai, c));
    }

    fn elwise_fma_mut(&self, out: &mut [u64], a: &[u64], b: &[u64]) {
        out.iter_mut()
            .zip(a.iter().zip(b.iter()))
            .for_each(|(oi, (ai, bi))| {
                *oi = self.reduce(*oi as u128 + *ai as u128 * *bi as u128);
            });
    }

    fn elwise_fma_scalar_mut(&self, out: &mut [u64], a: &[u64], c: &u64) {
        out.iter_mut().zip(a.iter()).for_each(|(oi, ai)| {
            *oi = self.reduce(*oi as u128 + *ai as u128 * *c as u128);
        });
    }
}

/// Modulus operations over a power-of-two u64 modulus; everything is a
/// wrapping op followed by a mask.
pub struct PowerOfTwoOpsU64 {
    q: CiphertextModulus<u64>,
    mask: u64,
}

impl ModInit for PowerOfTwoOpsU64 {
    type M = CiphertextModulus<u64>;
    fn new(modulus: Self::M) -> Self {
        debug_assert!(modulus.q().is_power_of_two());
        PowerOfTwoOpsU64 {
            mask: modulus.q() - 1,
            q: modulus,
        }
    }
}

impl GetModulus for PowerOfTwoOpsU64 {
    type Element = u64;
    type M = CiphertextModulus<u64>;
    fn modulus(&self) -> &Self::M {
        &self.q
    }
}

impl ArithmeticOps for PowerOfTwoOpsU64 {
    type Element = u64;

    fn add(&self, a: &u64, b: &u64) -> u64 {
        a.wrapping_add(*b) & self.mask
    }

    fn sub(&self, a: &u64, b: &u64) -> u64 {
        a.wrapping_sub(*b) & self.mask
    }

    fn mul(&self, a: &u64, b: &u64) -> u64 {
        a.wrapping_mul(*b) & self.mask
    }

    fn neg(&self, a: &u64) -> u64 {
        a.wrapping_neg() & self.mask
    }
}

impl VectorOps for PowerOfTwoOpsU64 {
    type Element = u64;

    fn elwise_add_mut(&self, a: &mut [u64], b: &[u64]) {
        a.iter_mut().zip(b.iter()).for_each(|(ai, bi)| {
            *ai = ArithmeticOps::add(self, ai, bi);
        });
    }

    fn elwise_sub_mut(&self, a: &mut [u64], b: &[u64]) {
        a.iter_mut().zip(b.iter()).for_each(|(ai, bi)| {
            *ai = ArithmeticOps::sub(self, ai, bi);
        });
    }

    fn elwise_neg_mut(&self, a: &mut [u64]) {
        a.iter_mut().for_each(|ai| *ai = ArithmeticOps::neg(self, ai));
    }

    fn elwise_mul_mut(&self, a: &mut [u64], b: &[u64]) {
        a.iter_mut().zip(b.iter()).for_each(|(ai, bi)| {
            *ai = ArithmeticOps::mul(self, ai, bi);
        });
    }

    fn elwise_scalar_mul(&self, out: &mut [u64], a: &[u64], c: &u64) {
        out.iter_mut().zip(a.iter()).for_each(|(oi, ai)| {
            *oi = ArithmeticOps::mul(self, ai, c);
        });
    }

    fn elwise_scalar_mul_mut(&self, a: &mut [u64], c: &u64) {
        a.iter_mut().for_each(|ai| *ai = ArithmeticOps::mul(self, ai, c));
    }

    fn elwise_fma_mut(&self, out: &mut [u64], a: &[u64], b: &[u64]) {
        out.iter_mut()
            .zip(a.iter().zip(b.iter()))
            .for_each(|(oi, (ai, bi))| {
                *oi = oi.wrapping_add(ai.wrapping_mul(*bi)) & self.mask;
            });
    }

    fn elwise_fma_scalar_mut(&self, out: &mut [u64], a: &[u64], c: &u64) {
        out.iter_mut().zip(a.iter()).for_each(|(oi, ai)| {
            *oi = oi.wrapping_add(ai.wrapping_mul(*c)) & self.mask;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modular_ops_match_naive_arithmetic() {
        let q = 132120577u64;
        let modop = ModularOpsU64::new(CiphertextModulus::new(q));

        let a = 100_000_123u64;
        let b = 131_000_456u64;
        assert_eq!(ArithmeticOps::add(&modop, &a, &b), (a + b) % q);
        assert_eq!(ArithmeticOps::sub(&modop, &a, &b), (q + a - b) % q);
        assert_eq!(
            ArithmeticOps::mul(&modop, &a, &b),
            ((a as u128 * b as u128) % q as u128) as u64
        );
        assert_eq!(ArithmeticOps::neg(&modop, &a), q - a);
        assert_eq!(ArithmeticOps::neg(&modop, &0), 0);
    }

    #[test]
    fn power_of_two_ops_wrap() {
        let q = 1u64 << 15;
        let modop = PowerOfTwoOpsU64::new(CiphertextModulus::new(q));

        assert_eq!(ArithmeticOps::add(&modop, &(q - 1), &2), 1);
        assert_eq!(ArithmeticOps::sub(&modop, &1, &2), q - 1);
        assert_eq!(ArithmeticOps::neg(&modop, &1), q - 1);
        assert_eq!(ArithmeticOps::mul(&modop, &(q - 1), &(q - 1)), 1);
    }

    #[test]
    fn centred_lift_round_trips() {
        let q = CiphertextModulus::new(1u64 << 15);
        for v in [-5i64, -1, 0, 1, 7, 16383] {
            assert_eq!(q.map_element_to_i64(&q.map_element_from_i64(v)), v);
        }
        assert_eq!(q.log_q(), 15);

        let qp = CiphertextModulus::new(132120577u64);
        assert_eq!(qp.log_q(), 27);
        assert!(!qp.is_power_of_2());
    }

    #[test]
    fn fma_accumulates() {
        let q = 132120577u64;
        let modop = ModularOpsU64::new(CiphertextModulus::new(q));
        let mut out = vec![1u64, 2, 3];
        let a = vec![10u64, 20, 30];
        let b = vec![q - 1, 5, 7];
        modop.elwise_fma_mut(&mut out, &a, &b);
        assert_eq!(out[0], (1 + 10 * (q as u128 - 1) as u64 % q) % q);
        assert_eq!(out[1], 2 + 20 * 5);
        assert_eq!(out[2], 3 + 30 * 7);
    }
}
