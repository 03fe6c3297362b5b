use crate::backend::{CiphertextModulus, ModularOpsU64, Modulus};

pub trait NttInit<M> {
    fn new(q: &M, n: usize) -> Self;
}

/// In-place negacyclic number-theoretic transform over Z_q[X]/(X^n + 1).
/// `backward` is the exact inverse of `forward`; pointwise products of two
/// forward transforms invert to the negacyclic polynomial product.
pub trait Ntt {
    type Element;
    fn forward(&self, v: &mut [Self::Element]);
    fn backward(&self, v: &mut [Self::Element]);
}

pub(crate) fn mod_exp(mut base: u64, mut exp: u64, q: u64) -> u64 {
    let mut acc = 1u64;
    base %= q;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = ((acc as u128 * base as u128) % q as u128) as u64;
        }
        base = ((base as u128 * base as u128) % q as u128) as u64;
        exp >>= 1;
    }
    acc
}

fn bit_reverse(v: usize, bits: usize) -> usize {
    v.reverse_bits() >> (usize::BITS as usize - bits)
}

/// Finds a primitive 2n-th root of unity in Z_q. The candidate x^((q-1)/2n)
/// has order dividing 2n; it is primitive exactly when its n-th power is -1.
fn find_primitive_root(q: u64, two_n: u64) -> u64 {
    debug_assert!((q - 1) % two_n == 0);
    let exp = (q - 1) / two_n;
    for x in 2..q {
        let root = mod_exp(x, exp, q);
        if mod_exp(root, two_n >> 1, q) == q - 1 {
            return root;
        }
    }
    unreachable!("no primitive 2n-th root mod {q}")
}

/// Psi-merged negacyclic NTT; the powers of psi are folded into the
/// twiddle tables, so no pre/post scaling pass is needed.
pub struct NttBackendU64 {
    q: u64,
    n: usize,
    /// psi^brv(i) for the forward butterflies
    psi_rev: Vec<u64>,
    /// psi^-brv(i) for the backward butterflies
    psi_inv_rev: Vec<u64>,
    n_inv: u64,
}

impl NttInit<CiphertextModulus<u64>> for NttBackendU64 {
    fn new(q: &CiphertextModulus<u64>, n: usize) -> Self {
        let q = q.q();
        assert!(n.is_power_of_two(), "ring degree must be a power of two");
        assert!(
            ModularOpsU64::is_prime(q),
            "NTT modulus must be prime, got {q}"
        );
        assert!(
            (q - 1) % (2 * n as u64) == 0,
            "NTT modulus must satisfy q = 1 mod 2n"
        );

        let psi = find_primitive_root(q, 2 * n as u64);
        let psi_inv = mod_exp(psi, q - 2, q);
        let bits = n.trailing_zeros() as usize;

        let mut psi_rev = vec![0u64; n];
        let mut psi_inv_rev = vec![0u64; n];
        let mut power = 1u64;
        let mut power_inv = 1u64;
        for i in 0..n {
            let r = bit_reverse(i, bits);
            psi_rev[r] = power;
            psi_inv_rev[r] = power_inv;
            power = ((power as u128 * psi as u128) % q as u128) as u64;
            power_inv = ((power_inv as u128 * psi_inv as u128) % q as u128) as u64;
        }

        NttBackendU64 {
            q,
            n,
            psi_rev,
            psi_inv_rev,
            n_inv: mod_exp(n as u64, q - 2, q),
        }
    }
}

impl NttBackendU64 {
    fn mul(&self, a: u64, b: u64) -> u64 {
        ((a as u128 * b as u128) % self.q as u128) as u64
    }

    fn add(&self, a: u64, b: u64) -> u64 {
        let s = a + b;
        if s >= self.q {
            s - self.q
        } else {
            s
        }
    }

    fn sub(&self, a: u64, b: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            self.q + a - b
        }
    }
}

impl Ntt for NttBackendU64 {
    type Element = u64;

    fn forward(&self, a: &mut [u64]) {
        debug_assert!(a.len() == self.n);
        let mut t = self.n;
        let mut m = 1;
        while m < self.n {
            t >>= 1;
            for i in 0..m {
                let j1 = 2 * i * t;
                let s = self.psi_rev[m + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = self.mul(a[j + t], s);
                    a[j] = self.add(u, v);
                    a[j + t] = self.sub(u, v);
                }
            }
            m <<= 1;
        }
    }

    fn backward(&self, a: &mut [u64]) {
        debug_assert!(a.len() == self.n);
        let mut t = 1;
        let mut m = self.n;
        while m > 1 {
            let h = m >> 1;
            let mut j1 = 0;
            for i in 0..h {
                let s = self.psi_inv_rev[h + i];
                for j in j1..j1 + t {
                    let u = a[j];
                    let v = a[j + t];
                    a[j] = self.add(u, v);
                    a[j + t] = self.mul(self.sub(u, v), s);
                }
                j1 += 2 * t;
            }
            t <<= 1;
            m = h;
        }
        a.iter_mut().for_each(|v| *v = self.mul(*v, self.n_inv));
    }
}

#[cfg(test)]
mod tests {
    use rand::{thread_rng, Rng};

    use super::*;

    fn random_poly(n: usize, q: u64) -> Vec<u64> {
        let mut rng = thread_rng();
        (0..n).map(|_| rng.gen_range(0..q)).collect()
    }

    fn negacyclic_schoolbook(a: &[u64], b: &[u64], q: u64) -> Vec<u64> {
        let n = a.len();
        let mut out = vec![0i128; n];
        for i in 0..n {
            for j in 0..n {
                let prod = (a[i] as i128 * b[j] as i128) % q as i128;
                if i + j < n {
                    out[i + j] = (out[i + j] + prod) % q as i128;
                } else {
                    out[i + j - n] = (out[i + j - n] - prod).rem_euclid(q as i128);
                }
            }
        }
        out.iter().map(|v| v.rem_euclid(q as i128) as u64).collect()
    }

    #[test]
    fn primitive_root_has_order_2n() {
        let q = 132120577u64;
        let two_n = 2048u64;
        let psi = find_primitive_root(q, two_n);
        assert_eq!(mod_exp(psi, two_n >> 1, q), q - 1);
        assert_eq!(mod_exp(psi, two_n, q), 1);
    }

    #[test]
    fn forward_backward_is_identity() {
        let q = CiphertextModulus::new(132120577u64);
        let nttop = NttBackendU64::new(&q, 1024);
        let a = random_poly(1024, q.q());
        let mut b = a.clone();
        nttop.forward(&mut b);
        assert_ne!(a, b);
        nttop.backward(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn pointwise_product_is_negacyclic_convolution() {
        // small parameters keep the schoolbook reference cheap
        let q = CiphertextModulus::new(97u64);
        let n = 16;
        let nttop = NttBackendU64::new(&q, n);

        for _ in 0..50 {
            let a = random_poly(n, q.q());
            let b = random_poly(n, q.q());
            let want = negacyclic_schoolbook(&a, &b, q.q());

            let mut a_eval = a.clone();
            let mut b_eval = b.clone();
            nttop.forward(&mut a_eval);
            nttop.forward(&mut b_eval);
            let mut c: Vec<u64> = a_eval
                .iter()
                .zip(b_eval.iter())
                .map(|(x, y)| ((*x as u128 * *y as u128) % q.q() as u128) as u64)
                .collect();
            nttop.backward(&mut c);

            assert_eq!(c, want);
        }
    }

    #[test]
    fn multiplication_by_x_rotates_negacyclically() {
        let q = CiphertextModulus::new(132120577u64);
        let n = 1024;
        let nttop = NttBackendU64::new(&q, n);

        let a = random_poly(n, q.q());
        let mut x = vec![0u64; n];
        x[1] = 1;

        let mut a_eval = a.clone();
        let mut x_eval = x;
        nttop.forward(&mut a_eval);
        nttop.forward(&mut x_eval);
        let mut c: Vec<u64> = a_eval
            .iter()
            .zip(x_eval.iter())
            .map(|(x, y)| ((*x as u128 * *y as u128) % q.q() as u128) as u64)
            .collect();
        nttop.backward(&mut c);

        // a * X shifts up by one and negates the wrapped coefficient
        assert_eq!(c[0], (q.q() - a[n - 1]) % q.q());
        for i in 1..n {
            assert_eq!(c[i], a[i - 1]);
        }
    }
}
