use num_traits::{FromPrimitive, PrimInt, ToPrimitive};

use crate::backend::{CiphertextModulus, Modulus};

/// Signed gadget decomposition in base 2^base_log with `decomposition_count`
/// levels. Digits are balanced, i.e. in [-B/2, B/2) except for the slightly
/// wider top digit, and the lowest `ignore_bits` of the input are rounded
/// away (approximate decomposition).
pub trait Decomposer {
    type Element;

    fn decomposition_count(&self) -> usize;
    fn base_log(&self) -> usize;
    /// Writes the `decomposition_count` digits of `v`, least significant
    /// first, mapped back into the modulus.
    fn decompose_into(&self, v: &Self::Element, digits: &mut [Self::Element]);
    /// [2^ignore_bits * B^0, ..., 2^ignore_bits * B^(l-1)]; recomposition
    /// against the digits recovers `v` up to the rounded-away bits.
    fn gadget_vector(&self) -> Vec<Self::Element>;
}

#[derive(Clone, Debug)]
pub struct DefaultDecomposer<T> {
    q: CiphertextModulus<T>,
    base_log: usize,
    count: usize,
    ignore_bits: usize,
}

impl<T: PrimInt> DefaultDecomposer<T> {
    pub fn new(q: CiphertextModulus<T>, base_log: usize, count: usize) -> Self
    where
        CiphertextModulus<T>: Modulus<Element = T>,
    {
        let covered = base_log * count;
        let ignore_bits = q.log_q().saturating_sub(covered);
        DefaultDecomposer {
            q,
            base_log,
            count,
            ignore_bits,
        }
    }

    pub fn ignore_bits(&self) -> usize {
        self.ignore_bits
    }
}

impl<T> Decomposer for DefaultDecomposer<T>
where
    T: PrimInt + FromPrimitive + ToPrimitive,
    CiphertextModulus<T>: Modulus<Element = T>,
{
    type Element = T;

    fn decomposition_count(&self) -> usize {
        self.count
    }

    fn base_log(&self) -> usize {
        self.base_log
    }

    fn decompose_into(&self, v: &T, digits: &mut [T]) {
        debug_assert!(digits.len() == self.count);
        let base = 1i64 << self.base_log;
        let half_base = base >> 1;

        // centred lift, then round away the ignored low bits
        let mut v = self.q.map_element_to_i64(v);
        if self.ignore_bits > 0 {
            let round = (v >> (self.ignore_bits - 1)) & 1;
            v = (v >> self.ignore_bits) + round;
        }

        for d in digits.iter_mut().take(self.count - 1) {
            let mut r = v & (base - 1);
            v >>= self.base_log;
            if r >= half_base {
                r -= base;
                v += 1;
            }
            *d = self.q.map_element_from_i64(r);
        }
        // the top digit absorbs the remaining quotient unbalanced, so the
        // recomposition is exact; it exceeds B/2 by at most one
        digits[self.count - 1] = self.q.map_element_from_i64(v);
    }

    fn gadget_vector(&self) -> Vec<T> {
        (0..self.count)
            .map(|i| {
                self.q
                    .map_element_from_i64(1i64 << (self.ignore_bits + i * self.base_log))
            })
            .collect()
    }
}
