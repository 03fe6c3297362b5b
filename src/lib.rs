//! TFHE-style fully homomorphic encryption over the torus.
//!
//! The crate is layered bottom up: modular/NTT backends and samplers,
//! LWE/RLWE/RGSW sample arithmetic, programmable bootstrapping (blind
//! rotation + sample extraction + key switching), Boolean gates on
//! encrypted bits, and fixed-width unsigned integer circuits composed
//! from those gates. Every gate evaluation ends in a bootstrap, so noise
//! is reset after each non-linear step and circuits compose to arbitrary
//! depth.
//!
//! ```no_run
//! use torus_fhe::{
//!     bool::{evaluator::BooleanGates, gen_keys, BoolEvaluator, ServerKeyEvaluationDomain},
//!     parameters::PN10QP27,
//!     Decryptor, Encryptor,
//! };
//!
//! let (ck, sk) = gen_keys(&PN10QP27).unwrap();
//! let sk = ServerKeyEvaluationDomain::from(&sk);
//! let mut e = BoolEvaluator::new(&PN10QP27).unwrap();
//!
//! let c0 = ck.encrypt(&true);
//! let c1 = ck.encrypt(&false);
//! let c_and = e.and(&c0, &c1, &sk).unwrap();
//! assert_eq!(ck.decrypt(&c_and), false);
//! ```

use num_traits::Zero;

pub(crate) mod backend;
pub mod bool;
pub(crate) mod decomposer;
mod error;
pub(crate) mod lwe;
pub(crate) mod ntt;
pub(crate) mod pbs;
pub(crate) mod random;
pub(crate) mod rgsw;
pub mod serialization;
pub mod uint;
pub(crate) mod utils;

pub use backend::{
    ArithmeticOps, CiphertextModulus, GetModulus, ModInit, ModularOpsU64, Modulus,
    PowerOfTwoOpsU64, VectorOps,
};
pub use bool::{
    evaluator::{BoolEvaluator, BooleanGates},
    gen_keys, gen_public_key, keys,
    parameters::{self, BoolParameters, ParameterPreset},
    ClientKey, FheBool, PublicKey, ServerKey, ServerKeyEvaluationDomain,
};
pub use decomposer::{Decomposer, DefaultDecomposer};
pub use error::{FheError, FheResult};
pub use ntt::{Ntt, NttBackendU64, NttInit};
pub use serialization::{FromBytes, ToBytes};
pub use uint::{FheUint, IntegerEvaluator};

/// A read-only row of ring/vector coefficients.
pub trait Row: AsRef<[Self::Element]> {
    type Element;
}

pub trait RowMut: Row + AsMut<[Self::Element]> {}

pub trait RowEntity: RowMut {
    fn zeros(len: usize) -> Self;
}

/// A dense row-major matrix of coefficients. Polynomials, RLWE/RGSW
/// ciphertexts and key-switching keys are all stored this way.
pub trait Matrix: AsRef<[Self::R]> {
    type MatElement;
    type R: Row<Element = Self::MatElement>;

    /// (rows, cols)
    fn dimension(&self) -> (usize, usize);

    fn get_row_slice(&self, index: usize) -> &[Self::MatElement] {
        self.as_ref()[index].as_ref()
    }

    fn get(&self, row: usize, col: usize) -> &Self::MatElement {
        &self.as_ref()[row].as_ref()[col]
    }

    fn iter_rows(&self) -> std::slice::Iter<'_, Self::R> {
        self.as_ref().iter()
    }
}

pub trait MatrixMut: Matrix + AsMut<[Self::R]>
where
    Self::R: RowMut,
{
    fn get_row_mut(&mut self, index: usize) -> &mut [Self::MatElement] {
        self.as_mut()[index].as_mut()
    }

    fn iter_rows_mut(&mut self) -> std::slice::IterMut<'_, Self::R> {
        self.as_mut().iter_mut()
    }

    fn split_at_row_mut(&mut self, index: usize) -> (&mut [Self::R], &mut [Self::R]) {
        self.as_mut().split_at_mut(index)
    }
}

pub trait MatrixEntity: Matrix {
    fn zeros(rows: usize, cols: usize) -> Self;
}

impl<T> Row for Vec<T> {
    type Element = T;
}

impl<T> RowMut for Vec<T> {}

impl<T: Zero + Clone> RowEntity for Vec<T> {
    fn zeros(len: usize) -> Self {
        vec![T::zero(); len]
    }
}

impl<T> Matrix for Vec<Vec<T>> {
    type MatElement = T;
    type R = Vec<T>;

    fn dimension(&self) -> (usize, usize) {
        (self.len(), self.first().map(|r| r.len()).unwrap_or(0))
    }
}

impl<T> MatrixMut for Vec<Vec<T>> {}

impl<T: Zero + Clone> MatrixEntity for Vec<Vec<T>> {
    fn zeros(rows: usize, cols: usize) -> Self {
        vec![vec![T::zero(); cols]; rows]
    }
}

/// Secret key material: a vector of small (here binary) elements.
pub trait Secret {
    type Element;
    fn values(&self) -> &[Self::Element];
}

pub trait Encryptor<M: ?Sized, C> {
    fn encrypt(&self, m: &M) -> C;
}

pub trait Decryptor<M, C> {
    fn decrypt(&self, c: &C) -> M;
}
