use std::fmt;

use crate::bool::parameters::ParameterPreset;

/// Error type surfaced by every fallible public operation.
///
/// Arithmetic inside the torus rings is total; errors only arise at the
/// boundaries (mismatched contexts, malformed bytes, reserved operations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FheError {
    /// Two operands were produced under different parameter presets.
    ParameterMismatch {
        left: ParameterPreset,
        right: ParameterPreset,
    },
    /// Two integer ciphertexts of different bit widths were combined.
    WidthMismatch { left: usize, right: usize },
    /// Requested bit width is not in the supported width table.
    UnsupportedWidth(usize),
    /// A key switch or external product inside the bootstrap was handed
    /// operands of the wrong shape.
    BootstrapFailed(&'static str),
    /// Magic, version, preset id, tag or length mismatch while decoding.
    SerializationError(String),
    /// Operation is reserved but intentionally not provided.
    NotImplemented(&'static str),
    /// A rejection sampler ran out of attempts.
    RngExhausted,
}

pub type FheResult<T> = Result<T, FheError>;

impl fmt::Display for FheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FheError::ParameterMismatch { left, right } => {
                write!(f, "parameter mismatch: {left:?} vs {right:?}")
            }
            FheError::WidthMismatch { left, right } => {
                write!(f, "width mismatch: {left}-bit vs {right}-bit operand")
            }
            FheError::UnsupportedWidth(w) => write!(f, "unsupported bit width {w}"),
            FheError::BootstrapFailed(what) => write!(f, "bootstrap failed: {what}"),
            FheError::SerializationError(what) => write!(f, "serialization error: {what}"),
            FheError::NotImplemented(what) => write!(f, "not implemented: {what}"),
            FheError::RngExhausted => write!(f, "random sampler exhausted its attempts"),
        }
    }
}

impl std::error::Error for FheError {}
