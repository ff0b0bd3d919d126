//! Error taxonomy shared by all workflow error types.

use std::fmt;

/// Coarse classification of a failure, independent of the module it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; always reported to the caller with a specific message
    Validation,
    /// Missing user, proof or referral
    NotFound,
    /// Duplicate record or a transition that is no longer allowed
    Conflict,
    /// Missing or insufficient credentials
    Unauthorized,
    /// Caller is authenticated but lacks the required role
    Forbidden,
    /// Storage or other infrastructure failure
    Infrastructure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Infrastructure => "infrastructure",
        };
        f.write_str(name)
    }
}

/// Implemented by every domain error so outer layers can map failures
/// without matching on each module's variants.
pub trait DomainError: std::error::Error {
    /// Classification of this error
    fn kind(&self) -> ErrorKind;

    /// Message that is safe to show to clients
    ///
    /// Infrastructure details are replaced by a generic message.
    fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Infrastructure => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
