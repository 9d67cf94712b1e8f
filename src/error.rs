use thiserror::Error;

/// Failure reported by an authoritative or decoy backend.
///
/// The message is for operators only; hosts must not echo it to callers since
/// it could reveal which backend produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BackendFailure(pub String);

impl BackendFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by the routing engine
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Input rejected before it touched any client history
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The selected backend failed; the request is still counted
    #[error("Backend error: {0}")]
    Backend(#[from] BackendFailure),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_failure_converts() {
        let err: GatewayError = BackendFailure::new("division by zero").into();
        assert!(matches!(err, GatewayError::Backend(_)));
        assert_eq!(err.to_string(), "Backend error: division by zero");
    }

    #[test]
    fn test_invalid_input_message() {
        let err = GatewayError::InvalidInput("missing field 'volatility'".to_string());
        assert!(err.to_string().contains("volatility"));
    }
}
