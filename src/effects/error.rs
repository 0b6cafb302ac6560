//! Error types for effect parameters.

/// Effect-specific error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EffectError {
    /// A parameter is NaN or infinite.
    #[error("{effect} {parameter} must be finite, got {value}")]
    NonFinite {
        /// Name of the effect.
        effect: &'static str,
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A parameter lies outside its accepted range.
    #[error("{effect} {parameter} out of range: {value} (expected {expected})")]
    OutOfRange {
        /// Name of the effect.
        effect: &'static str,
        /// Name of the offending parameter.
        parameter: &'static str,
        /// The rejected value.
        value: f64,
        /// Description of the accepted range.
        expected: &'static str,
    },
}

impl EffectError {
    pub(crate) fn check(
        effect: &'static str,
        parameter: &'static str,
        value: f64,
        expected: &'static str,
        accept: impl Fn(f64) -> bool,
    ) -> EffectResult<()> {
        if !value.is_finite() {
            return Err(Self::NonFinite {
                effect,
                parameter,
                value,
            });
        }
        if !accept(value) {
            return Err(Self::OutOfRange {
                effect,
                parameter,
                value,
                expected,
            });
        }
        Ok(())
    }
}

/// Result type for effect operations
pub type EffectResult<T> = Result<T, EffectError>;
