use std::error::Error;
use std::fmt;

/// Errors returned by the bcrypt core.
///
/// A password that does not match its hash is not an error: [`crate::verify`]
/// reports it as `Ok(false)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BcryptError {
    /// Cost factor outside `[4, 31]`.
    InvalidCost(String),
    /// An encoded hash (or salt setting) that does not follow the bcrypt text format.
    MalformedHash(String),
    /// A version tag other than `2`, `2a`, `2b`, `2x` or `2y`.
    UnsupportedPrefix(String),
    /// The operating system entropy source could not produce a salt.
    RandomSourceFailure(String),
    /// Blowfish key expansion was asked to use a zero-length key.
    EmptyKey,
}

impl fmt::Display for BcryptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BcryptError::InvalidCost(msg) => write!(f, "Invalid cost: {}", msg),
            BcryptError::MalformedHash(msg) => write!(f, "Malformed hash: {}", msg),
            BcryptError::UnsupportedPrefix(msg) => write!(f, "Unsupported prefix: {}", msg),
            BcryptError::RandomSourceFailure(msg) => write!(f, "Random source failure: {}", msg),
            BcryptError::EmptyKey => write!(f, "Key must not be empty"),
        }
    }
}

impl Error for BcryptError {}

impl From<rand::Error> for BcryptError {
    fn from(err: rand::Error) -> Self {
        BcryptError::RandomSourceFailure(err.to_string())
    }
}

pub type BcryptResult<T> = Result<T, BcryptError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            BcryptError::InvalidCost("3".to_string()).to_string(),
            "Invalid cost: 3"
        );
        assert_eq!(
            BcryptError::MalformedHash("missing '$'".to_string()).to_string(),
            "Malformed hash: missing '$'"
        );
        assert_eq!(
            BcryptError::UnsupportedPrefix("3a".to_string()).to_string(),
            "Unsupported prefix: 3a"
        );
        assert_eq!(BcryptError::EmptyKey.to_string(), "Key must not be empty");
    }

    #[test]
    fn test_random_error_conversion() {
        let err: BcryptError = rand::Error::new("entropy pool closed").into();
        match err {
            BcryptError::RandomSourceFailure(msg) => assert!(msg.contains("entropy pool closed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
