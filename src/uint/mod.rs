use num_bigint_dig::BigUint;

use crate::{
    bool::{
        evaluator::BooleanGates,
        keys::{ClientKey, PublicKey, ServerKeyEvaluationDomain},
        parameters::BoolParameters,
        BoolEvaluator, FheBool,
    },
    error::{FheError, FheResult},
    random::DefaultSecureRng,
    Decryptor, Encryptor,
};

pub mod ops;
pub mod types;

pub use types::{FheUint, SUPPORTED_WIDTHS};

use ops::{
    arbitrary_bit_adder, arbitrary_bit_comparator, arbitrary_bit_equality,
    arbitrary_bit_scalar_adder, arbitrary_bit_select, arbitrary_bit_subtractor,
    arbitrary_bitwise_map2,
};
use types::{bits_to_value, check_width, value_to_bits};

impl ClientKey {
    /// Encrypts `value` as a `width`-bit integer, little-endian bit by
    /// bit. Values wider than the target wrap mod 2^width.
    pub fn encrypt_uint(&self, value: &BigUint, width: usize) -> FheResult<FheUint> {
        check_width(width)?;
        let mut rng = DefaultSecureRng::new();
        let data = value_to_bits(value, width)
            .into_iter()
            .map(|bit| self.encrypt_bit_with_rng(bit, &mut rng))
            .collect::<FheResult<Vec<_>>>()?;
        Ok(FheUint { data })
    }

    pub fn decrypt_uint(&self, c: &FheUint) -> BigUint {
        let bits: Vec<bool> = c.data().iter().map(|bit| self.decrypt_bit(bit)).collect();
        bits_to_value(&bits)
    }
}

impl PublicKey {
    pub fn encrypt_uint(&self, value: &BigUint, width: usize) -> FheResult<FheUint> {
        check_width(width)?;
        let data = value_to_bits(value, width)
            .into_iter()
            .map(|bit| self.encrypt_bit(bit))
            .collect::<FheResult<Vec<_>>>()?;
        Ok(FheUint { data })
    }
}

impl Encryptor<u8, FheUint> for ClientKey {
    fn encrypt(&self, m: &u8) -> FheUint {
        self.encrypt_uint(&BigUint::from(*m), 8)
            .expect("8-bit encryption failed")
    }
}

impl Encryptor<u64, FheUint> for ClientKey {
    fn encrypt(&self, m: &u64) -> FheUint {
        self.encrypt_uint(&BigUint::from(*m), 64)
            .expect("64-bit encryption failed")
    }
}

impl Decryptor<u8, FheUint> for ClientKey {
    fn decrypt(&self, c: &FheUint) -> u8 {
        assert!(c.width() == 8);
        let v = self.decrypt_uint(c);
        v.to_bytes_le()[0]
    }
}

impl Decryptor<u64, FheUint> for ClientKey {
    fn decrypt(&self, c: &FheUint) -> u64 {
        assert!(c.width() == 64);
        let v = self.decrypt_uint(c);
        let mut out = 0u64;
        for (i, byte) in v.to_bytes_le().iter().take(8).enumerate() {
            out |= (*byte as u64) << (8 * i);
        }
        out
    }
}

impl Encryptor<u8, FheUint> for PublicKey {
    fn encrypt(&self, m: &u8) -> FheUint {
        self.encrypt_uint(&BigUint::from(*m), 8)
            .expect("8-bit encryption failed")
    }
}

/// Fixed-width unsigned integer circuits over encrypted bits.
///
/// Holds the Boolean evaluator (and through it the pooled bootstrap
/// scratch) plus a reference to the server key: the one-shot builder
/// wires the whole stack together, no globals involved.
pub struct IntegerEvaluator<'k> {
    bool_evaluator: BoolEvaluator,
    server_key: &'k ServerKeyEvaluationDomain,
}

impl<'k> IntegerEvaluator<'k> {
    pub fn new(
        parameters: &BoolParameters<u64>,
        server_key: &'k ServerKeyEvaluationDomain,
    ) -> FheResult<Self> {
        if parameters.preset() != server_key.parameters().preset() {
            return Err(FheError::ParameterMismatch {
                left: parameters.preset(),
                right: server_key.parameters().preset(),
            });
        }
        Ok(IntegerEvaluator {
            bool_evaluator: BoolEvaluator::new(parameters)?,
            server_key,
        })
    }

    pub fn bool_evaluator(&mut self) -> &mut BoolEvaluator {
        &mut self.bool_evaluator
    }

    /// Noiseless encryption of a public constant, used for padding and
    /// as the zero operand of negation.
    pub fn trivial_uint(&self, value: &BigUint, width: usize) -> FheResult<FheUint> {
        check_width(width)?;
        let data = value_to_bits(value, width)
            .into_iter()
            .map(|bit| self.bool_evaluator.trivial_bool(bit))
            .collect();
        Ok(FheUint { data })
    }

    fn check_pair(&self, a: &FheUint, b: &FheUint) -> FheResult<()> {
        if a.width() != b.width() {
            return Err(FheError::WidthMismatch {
                left: a.width(),
                right: b.width(),
            });
        }
        if a.preset() != b.preset() {
            return Err(FheError::ParameterMismatch {
                left: a.preset(),
                right: b.preset(),
            });
        }
        Ok(())
    }

    /// a + b mod 2^w
    pub fn add(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        self.check_pair(a, b)?;
        let data = arbitrary_bit_adder(&mut self.bool_evaluator, a.data(), b.data(), self.server_key)?;
        Ok(FheUint { data })
    }

    /// a - b mod 2^w
    pub fn sub(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        self.check_pair(a, b)?;
        let (data, _) =
            arbitrary_bit_subtractor(&mut self.bool_evaluator, a.data(), b.data(), self.server_key)?;
        Ok(FheUint { data })
    }

    /// -a mod 2^w, i.e. 0 - a
    pub fn neg(&mut self, a: &FheUint) -> FheResult<FheUint> {
        let zero = self.trivial_uint(&BigUint::from(0u8), a.width())?;
        self.sub(&zero, a)
    }

    /// a + k mod 2^w for a public constant k
    pub fn scalar_add(&mut self, a: &FheUint, k: &BigUint) -> FheResult<FheUint> {
        let k_bits = value_to_bits(k, a.width());
        let data = arbitrary_bit_scalar_adder(
            &mut self.bool_evaluator,
            a.data(),
            &k_bits,
            self.server_key,
        )?;
        Ok(FheUint { data })
    }

    pub fn eq(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheBool> {
        self.check_pair(a, b)?;
        arbitrary_bit_equality(&mut self.bool_evaluator, a.data(), b.data(), self.server_key)
    }

    pub fn neq(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheBool> {
        let eq = self.eq(a, b)?;
        Ok(self.bool_evaluator.not(&eq))
    }

    /// a < b: the final borrow of the subtractor
    pub fn lt(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheBool> {
        self.check_pair(a, b)?;
        arbitrary_bit_comparator(&mut self.bool_evaluator, a.data(), b.data(), self.server_key)
    }

    pub fn gt(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheBool> {
        self.lt(b, a)
    }

    pub fn le(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheBool> {
        let gt = self.gt(a, b)?;
        Ok(self.bool_evaluator.not(&gt))
    }

    pub fn ge(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheBool> {
        let lt = self.lt(a, b)?;
        Ok(self.bool_evaluator.not(&lt))
    }

    pub fn min(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        let a_less = self.lt(a, b)?;
        self.select(&a_less, a, b)
    }

    pub fn max(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        let a_less = self.lt(a, b)?;
        self.select(&a_less, b, a)
    }

    pub fn and(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        self.check_pair(a, b)?;
        let data = arbitrary_bitwise_map2(
            &mut self.bool_evaluator,
            a.data(),
            b.data(),
            self.server_key,
            |e, x, y, k| e.and(x, y, k),
        )?;
        Ok(FheUint { data })
    }

    pub fn or(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        self.check_pair(a, b)?;
        let data = arbitrary_bitwise_map2(
            &mut self.bool_evaluator,
            a.data(),
            b.data(),
            self.server_key,
            |e, x, y, k| e.or(x, y, k),
        )?;
        Ok(FheUint { data })
    }

    pub fn xor(&mut self, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        self.check_pair(a, b)?;
        let data = arbitrary_bitwise_map2(
            &mut self.bool_evaluator,
            a.data(),
            b.data(),
            self.server_key,
            |e, x, y, k| e.xor(x, y, k),
        )?;
        Ok(FheUint { data })
    }

    /// Bitwise complement; linear, no bootstraps.
    pub fn not(&mut self, a: &FheUint) -> FheResult<FheUint> {
        let data = a
            .data()
            .iter()
            .map(|bit| self.bool_evaluator.not(bit))
            .collect();
        Ok(FheUint { data })
    }

    /// a << k for public k: pure rewiring, zero ciphertexts pad the low
    /// end. No bootstraps.
    pub fn shl(&mut self, a: &FheUint, k: usize) -> FheResult<FheUint> {
        let width = a.width();
        let zero = self.bool_evaluator.trivial_bool(false);
        let data = (0..width)
            .map(|i| {
                if i >= k {
                    a.data()[i - k].clone()
                } else {
                    zero.clone()
                }
            })
            .collect();
        Ok(FheUint { data })
    }

    /// a >> k for public k; encrypted shift amounts are out of scope.
    pub fn shr(&mut self, a: &FheUint, k: usize) -> FheResult<FheUint> {
        let width = a.width();
        let zero = self.bool_evaluator.trivial_bool(false);
        let data = (0..width)
            .map(|i| {
                if i + k < width {
                    a.data()[i + k].clone()
                } else {
                    zero.clone()
                }
            })
            .collect();
        Ok(FheUint { data })
    }

    /// sel ? a : b, per-bit MUX with the shared selector.
    pub fn select(&mut self, sel: &FheBool, a: &FheUint, b: &FheUint) -> FheResult<FheUint> {
        self.check_pair(a, b)?;
        let data = arbitrary_bit_select(
            &mut self.bool_evaluator,
            sel,
            a.data(),
            b.data(),
            self.server_key,
        )?;
        Ok(FheUint { data })
    }

    /// Width conversion: truncates to a narrower width, zero-extends to a
    /// wider one. Both directions are free of bootstraps.
    pub fn cast_to(&mut self, a: &FheUint, width: usize) -> FheResult<FheUint> {
        check_width(width)?;
        let mut data: Vec<FheBool> = a.data().iter().take(width).cloned().collect();
        let zero = self.bool_evaluator.trivial_bool(false);
        while data.len() < width {
            data.push(zero.clone());
        }
        Ok(FheUint { data })
    }

    /// Reserved: encrypted multiplication is intentionally not provided.
    pub fn mul(&mut self, _a: &FheUint, _b: &FheUint) -> FheResult<FheUint> {
        Err(FheError::NotImplemented("encrypted multiplication"))
    }

    /// Reserved: encrypted division is intentionally not provided.
    pub fn div(&mut self, _a: &FheUint, _b: &FheUint) -> FheResult<FheUint> {
        Err(FheError::NotImplemented("encrypted division"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bool::{gen_keys, parameters::PN10QP27, ServerKeyEvaluationDomain};

    struct TestCtx {
        ck: ClientKey,
        key: ServerKeyEvaluationDomain,
    }

    fn test_ctx() -> TestCtx {
        let (ck, sk) = gen_keys(&PN10QP27).unwrap();
        let key = ServerKeyEvaluationDomain::from(&sk);
        TestCtx { ck, key }
    }

    fn big(v: u64) -> BigUint {
        BigUint::from(v)
    }

    #[test]
    fn uint_round_trips_across_widths() {
        let TestCtx { ck, .. } = test_ctx();
        for (v, w) in [
            (0u64, 1),
            (1, 1),
            (9, 4),
            (200, 8),
            (65535, 16),
            (12345678, 32),
            (u64::MAX, 64),
        ] {
            let ct = ck.encrypt_uint(&big(v), w).unwrap();
            assert_eq!(ct.width(), w);
            assert_eq!(ck.decrypt_uint(&ct), big(v));
        }

        // wide words: a value spread over the full 128/256-bit range
        for w in [128usize, 256] {
            let v = (BigUint::from(0xA5A5_5A5A_DEAD_BEEFu64) << (w - 64)) + big(0xC0FF_EE11);
            let ct = ck.encrypt_uint(&v, w).unwrap();
            assert_eq!(ct.width(), w);
            assert_eq!(ck.decrypt_uint(&ct), v);
        }
    }

    #[test]
    fn address_width_round_trips() {
        // 160-bit blockchain address
        let TestCtx { ck, .. } = test_ctx();
        let addr_bytes: Vec<u8> = (0..20u8).map(|i| 0xDE ^ (i * 7)).collect();
        let addr = BigUint::from_bytes_le(&addr_bytes);
        let ct = ck.encrypt_uint(&addr, 160).unwrap();
        assert_eq!(ct.width(), 160);
        assert_eq!(ck.decrypt_uint(&ct), addr);
    }

    #[test]
    fn add_saturates_the_byte_then_wraps() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        // 200 + 55 = 255
        let a = ck.encrypt_uint(&big(200), 8).unwrap();
        let b = ck.encrypt_uint(&big(55), 8).unwrap();
        let sum = e.add(&a, &b).unwrap();
        assert_eq!(ck.decrypt_uint(&sum), big(255));

        // 255 + 1 = 0 mod 256
        let a = ck.encrypt_uint(&big(255), 8).unwrap();
        let b = ck.encrypt_uint(&big(1), 8).unwrap();
        let sum = e.add(&a, &b).unwrap();
        assert_eq!(ck.decrypt_uint(&sum), big(0));
    }

    #[test]
    fn sub_underflow_wraps() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(0), 8).unwrap();
        let b = ck.encrypt_uint(&big(1), 8).unwrap();
        let diff = e.sub(&a, &b).unwrap();
        assert_eq!(ck.decrypt_uint(&diff), big(255));
    }

    #[test]
    fn add_commutes_and_sub_cancels() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(11), 4).unwrap();
        let b = ck.encrypt_uint(&big(7), 4).unwrap();

        let ab = e.add(&a, &b).unwrap();
        let ba = e.add(&b, &a).unwrap();
        assert_eq!(ck.decrypt_uint(&ab), ck.decrypt_uint(&ba));
        assert_eq!(ck.decrypt_uint(&ab), big((11 + 7) % 16));

        let diff = e.sub(&a, &a).unwrap();
        assert_eq!(ck.decrypt_uint(&diff), big(0));

        let neg = e.neg(&a).unwrap();
        let sum = e.add(&a, &neg).unwrap();
        assert_eq!(ck.decrypt_uint(&sum), big(0));
    }

    #[test]
    fn add_is_associative_mod_width() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(9), 4).unwrap();
        let b = ck.encrypt_uint(&big(14), 4).unwrap();
        let c = ck.encrypt_uint(&big(6), 4).unwrap();

        let ab = e.add(&a, &b).unwrap();
        let ab_c = e.add(&ab, &c).unwrap();
        let bc = e.add(&b, &c).unwrap();
        let a_bc = e.add(&a, &bc).unwrap();

        assert_eq!(ck.decrypt_uint(&ab_c), ck.decrypt_uint(&a_bc));
        assert_eq!(ck.decrypt_uint(&ab_c), big((9 + 14 + 6) % 16));
    }

    #[test]
    fn comparisons_follow_the_borrow() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(10), 4).unwrap();
        let b = ck.encrypt_uint(&big(15), 4).unwrap();

        assert!(ck.decrypt_bit(&e.lt(&a, &b).unwrap()));
        assert!(!ck.decrypt_bit(&e.gt(&a, &b).unwrap()));
        assert!(ck.decrypt_bit(&e.le(&a, &b).unwrap()));
        assert!(!ck.decrypt_bit(&e.ge(&a, &b).unwrap()));

        let five = ck.encrypt_uint(&big(5), 4).unwrap();
        let five_too = ck.encrypt_uint(&big(5), 4).unwrap();
        assert!(ck.decrypt_bit(&e.eq(&five, &five_too).unwrap()));
        assert!(!ck.decrypt_bit(&e.neq(&five, &five_too).unwrap()));
        assert!(ck.decrypt_bit(&e.ge(&five, &five_too).unwrap()));
    }

    #[test]
    fn select_and_min_max() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(10), 4).unwrap();
        let b = ck.encrypt_uint(&big(5), 4).unwrap();

        let sel = ck.encrypt_bit(true).unwrap();
        let picked = e.select(&sel, &a, &b).unwrap();
        assert_eq!(ck.decrypt_uint(&picked), big(10));

        let sel = ck.encrypt_bit(false).unwrap();
        let picked = e.select(&sel, &a, &b).unwrap();
        assert_eq!(ck.decrypt_uint(&picked), big(5));

        assert_eq!(ck.decrypt_uint(&e.min(&a, &b).unwrap()), big(5));
        assert_eq!(ck.decrypt_uint(&e.max(&a, &b).unwrap()), big(10));
    }

    #[test]
    fn bitwise_ops_and_identities() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(0b1010), 4).unwrap();
        let b = ck.encrypt_uint(&big(0b0110), 4).unwrap();

        assert_eq!(ck.decrypt_uint(&e.and(&a, &b).unwrap()), big(0b0010));
        assert_eq!(ck.decrypt_uint(&e.or(&a, &b).unwrap()), big(0b1110));
        assert_eq!(ck.decrypt_uint(&e.xor(&a, &b).unwrap()), big(0b1100));

        // x ^ x = 0, x | x = x, x & x = x, !!x = x
        assert_eq!(ck.decrypt_uint(&e.xor(&a, &a).unwrap()), big(0));
        assert_eq!(ck.decrypt_uint(&e.or(&a, &a).unwrap()), big(0b1010));
        assert_eq!(ck.decrypt_uint(&e.and(&a, &a).unwrap()), big(0b1010));
        let not_not = {
            let n = e.not(&a).unwrap();
            e.not(&n).unwrap()
        };
        assert_eq!(ck.decrypt_uint(&not_not), big(0b1010));
    }

    #[test]
    fn public_shifts_rewire_bits() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(0b0011_0101), 8).unwrap();
        assert_eq!(ck.decrypt_uint(&e.shl(&a, 2).unwrap()), big(0b1101_0100));
        assert_eq!(ck.decrypt_uint(&e.shr(&a, 3).unwrap()), big(0b0000_0110));
        assert_eq!(ck.decrypt_uint(&e.shl(&a, 8).unwrap()), big(0));
        assert_eq!(ck.decrypt_uint(&e.shr(&a, 9).unwrap()), big(0));
    }

    #[test]
    fn scalar_add_matches_plain_arithmetic() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(100), 8).unwrap();
        for k in [0u64, 1, 12, 200] {
            let sum = e.scalar_add(&a, &big(k)).unwrap();
            assert_eq!(ck.decrypt_uint(&sum), big((100 + k) % 256));
        }
    }

    #[test]
    fn cast_zero_extends_and_truncates() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(0b1011), 4).unwrap();

        let wide = e.cast_to(&a, 8).unwrap();
        assert_eq!(wide.width(), 8);
        assert_eq!(ck.decrypt_uint(&wide), big(0b1011));

        // up then down returns the original
        let back = e.cast_to(&wide, 4).unwrap();
        assert_eq!(ck.decrypt_uint(&back), big(0b1011));

        // down-cast truncates high bits
        let wide = ck.encrypt_uint(&big(0b1011_0110), 8).unwrap();
        let narrow = e.cast_to(&wide, 4).unwrap();
        assert_eq!(ck.decrypt_uint(&narrow), big(0b0110));
    }

    #[test]
    fn width_and_support_errors() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(1), 4).unwrap();
        let b = ck.encrypt_uint(&big(1), 8).unwrap();
        assert_eq!(
            e.add(&a, &b),
            Err(FheError::WidthMismatch { left: 4, right: 8 })
        );
        assert_eq!(
            ck.encrypt_uint(&big(1), 3).unwrap_err(),
            FheError::UnsupportedWidth(3)
        );
        assert_eq!(e.cast_to(&a, 12).unwrap_err(), FheError::UnsupportedWidth(12));
    }

    #[test]
    fn mul_and_div_are_reserved() {
        let TestCtx { ck, key } = test_ctx();
        let mut e = IntegerEvaluator::new(&PN10QP27, &key).unwrap();

        let a = ck.encrypt_uint(&big(3), 4).unwrap();
        let b = ck.encrypt_uint(&big(2), 4).unwrap();
        assert!(matches!(e.mul(&a, &b), Err(FheError::NotImplemented(_))));
        assert!(matches!(e.div(&a, &b), Err(FheError::NotImplemented(_))));
    }

    #[test]
    fn fixed_width_encryptor_impls() {
        let TestCtx { ck, .. } = test_ctx();
        let c: FheUint = ck.encrypt(&200u8);
        assert_eq!(c.width(), 8);
        let back: u8 = ck.decrypt(&c);
        assert_eq!(back, 200);

        let c: FheUint = ck.encrypt(&0xDEAD_BEEFu64);
        assert_eq!(c.width(), 64);
        let back: u64 = ck.decrypt(&c);
        assert_eq!(back, 0xDEAD_BEEF);
    }
}
