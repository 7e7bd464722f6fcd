//! Error taxonomy shared by every stage of the QHA pipeline.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QhaError>;

#[derive(Debug, Error)]
pub enum QhaError {
    /// Negative weights or degeneracies, empty or inconsistent inputs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Arrays whose dimensions do not agree with each other.
    #[error("shape mismatch: expected {expected}, found {found}")]
    Shape { expected: String, found: String },

    #[error(
        "desired pressure {requested_gpa:.2} GPa is above the highest pressure the volume grid reaches \
         ({ceiling_gpa:.2} GPa); reduce the number of pressures, e.g. to fewer than {suggested_max_count}"
    )]
    PressureRangeTooHigh {
        ceiling_gpa: f64,
        requested_gpa: f64,
        suggested_max_count: usize,
    },

    #[error(
        "desired pressure {requested_gpa:.2} GPa is below the lowest pressure the volume grid reaches \
         ({floor_gpa:.2} GPa); raise the minimum pressure or enlarge the volume ratio"
    )]
    PressureRangeTooLow { floor_gpa: f64, requested_gpa: f64 },

    #[error("arbitrary-precision arithmetic unavailable: {0}")]
    NumericPrecision(String),

    #[error("least-squares fit failed: {0}")]
    SingularFit(String),

    #[error("failed to parse input at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QhaError {
    pub fn shape(expected: impl ToString, found: impl ToString) -> Self {
        QhaError::Shape {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Whether the error means the configured pressure grid cannot be served by the data.
    pub fn is_configuration_range(&self) -> bool {
        matches!(
            self,
            QhaError::PressureRangeTooHigh { .. } | QhaError::PressureRangeTooLow { .. }
        )
    }
}
