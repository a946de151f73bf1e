use thiserror::Error;

/// Errors raised while turning a `(value, unit)` pair into milliseconds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    #[error("unknown time unit '{0}'")]
    InvalidUnit(String),

    #[error("invalid duration value {0}")]
    InvalidValue(f64),
}

/// Why a step value was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepValueError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("{0}ms is negative")]
    Negative(i64),

    #[error("must be greater than zero")]
    Zero,
}

/// Timer error enum
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimerError {
    /// A step setter received a value it cannot accept.
    #[error("invalid value for step '{step}': {reason}")]
    InvalidStepValue {
        step: &'static str,
        #[source]
        reason: StepValueError,
    },

    /// `change_step` was asked to modify a step that does not exist.
    #[error("unknown step '{0}', expected 'session' or 'interval'")]
    InvalidStepTarget(String),

    #[error("unknown toggle action '{0}', expected 'start', 'stop' or 'pause'")]
    InvalidToggleAction(String),
}

impl TimerError {
    /// Returns true if the error comes from caller-supplied step input.
    pub fn is_step_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidStepValue { .. } | Self::InvalidStepTarget(_)
        )
    }

    /// The conversion failure behind an `InvalidStepValue`, if any.
    pub fn convert_error(&self) -> Option<&ConvertError> {
        match self {
            Self::InvalidStepValue {
                reason: StepValueError::Convert(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}
