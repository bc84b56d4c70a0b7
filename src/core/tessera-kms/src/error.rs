//! KMS engine error types.

use thiserror::Error;

use crate::types::KeyState;

/// Errors that can occur in the KMS Engine.
///
/// Every variant corresponds to exactly one wire-level error code (see
/// [`KmsError::code`]), so the transport adapter can map failures without
/// inspecting message text.
#[derive(Debug, Error)]
pub enum KmsError {
    /// No key, alias, grant, or policy matches the given identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// The key exists but is not in the `Enabled` state.
    #[error("key is not enabled: {0}")]
    Disabled(String),

    /// A lifecycle transition was attempted from a state that forbids it.
    #[error("key {key_id} is in state {state}")]
    InvalidState {
        /// Bare id of the key.
        key_id: String,
        /// The state that blocked the transition.
        state: KeyState,
    },

    /// The ciphertext container is malformed, has the wrong version, carries
    /// trailing bytes, or fails authentication. These are deliberately
    /// indistinguishable so callers cannot probe which one occurred.
    #[error("invalid ciphertext")]
    InvalidCiphertext,

    /// Grant tokens were supplied; grants are not supported.
    #[error("grants are not supported")]
    GrantsNotSupported,

    /// The named feature is a stub in this emulator.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// An alias with this name already exists.
    #[error("alias already exists: {0}")]
    AliasExists(String),

    /// The alias name does not start with the required prefix.
    #[error("invalid alias name: {0}")]
    InvalidAliasName(String),

    /// A request field carries an invalid or out-of-range value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two request fields were supplied that exclude each other.
    #[error("conflicting parameters: {0}")]
    InvalidParameterCombination(&'static str),

    /// The requested key spec or usage is not valid for the operation.
    #[error("invalid key usage: {0}")]
    InvalidKeyUsage(String),

    /// A pagination marker was supplied; pagination is not supported.
    #[error("pagination markers are not supported")]
    MarkerNotSupported,

    /// A pagination limit was supplied; pagination is not supported.
    #[error("pagination limits are not supported")]
    LimitNotSupported,

    /// Cipher construction or secure-random failure. Not caused by the
    /// request and not retryable.
    #[error("internal failure: {0}")]
    Internal(String),
}

impl KmsError {
    /// The wire-level error code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundException",
            Self::Disabled(_) => "DisabledException",
            Self::InvalidState { .. } => "KMSInvalidStateException",
            Self::InvalidCiphertext => "InvalidCiphertextException",
            Self::GrantsNotSupported => "GrantsNotSupported",
            Self::Unsupported(_) => "UnsupportedOperationException",
            Self::AliasExists(_) => "AlreadyExistsException",
            Self::InvalidAliasName(_) => "InvalidAliasNameException",
            Self::InvalidParameter(_) => "InvalidParameterValue",
            Self::InvalidParameterCombination(_) => "InvalidParameterCombination",
            Self::InvalidKeyUsage(_) => "InvalidKeyUsageException",
            Self::MarkerNotSupported => "InvalidMarkerException",
            Self::LimitNotSupported => "LimitNotSupported",
            Self::Internal(_) => "InternalFailure",
        }
    }
}
