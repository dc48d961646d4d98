//! Vault error types.

use masksmith_codec::{CodecError, KeyId};

/// Errors produced by password resolution, storage and mask/unmask requests.
///
/// Every variant aborts only the request that raised it; nothing has been
/// written to the store or the document when one is returned.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The password prompt was dismissed or left empty.
    #[error("no password entered")]
    NoPasswordEntered,

    /// The confirmation entry differs from the first entry.
    #[error("passwords do not match")]
    PasswordConfirmationMismatch,

    /// The entered password does not belong to the token being opened.
    #[error("password does not match key {expected} (entered key {entered})")]
    PasswordKeyMismatch { expected: KeyId, entered: KeyId },

    /// A new password derives an identifier already stored for another key.
    #[error("key identifier {0} is already used by a different password")]
    KeyIdentifierCollision(KeyId),

    /// The secret store could not be read or written, or holds corrupt data.
    #[error("secret storage failure: {0}")]
    StorageFailure(String),

    /// The requested document range cannot be masked.
    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<sqlx::Error> for VaultError {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for VaultError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::StorageFailure(err.to_string())
    }
}

/// Flat classification of a [`VaultError`], for mapping to user messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NoPasswordEntered,
    PasswordConfirmationMismatch,
    PasswordKeyMismatch,
    KeyIdentifierCollision,
    UnsupportedVersion,
    DecryptionFailed,
    DecryptionIntegrityFailed,
    EncryptionVerificationFailed,
    StorageFailure,
    MalformedToken,
    InvalidSelection,
}

impl VaultError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoPasswordEntered => ErrorKind::NoPasswordEntered,
            Self::PasswordConfirmationMismatch => ErrorKind::PasswordConfirmationMismatch,
            Self::PasswordKeyMismatch { .. } => ErrorKind::PasswordKeyMismatch,
            Self::KeyIdentifierCollision(_) => ErrorKind::KeyIdentifierCollision,
            Self::StorageFailure(_) => ErrorKind::StorageFailure,
            Self::InvalidSelection(_) => ErrorKind::InvalidSelection,
            Self::Codec(codec) => match codec {
                CodecError::MalformedToken(_) => ErrorKind::MalformedToken,
                CodecError::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
                CodecError::DecryptionFailed => ErrorKind::DecryptionFailed,
                CodecError::DecryptionIntegrityFailed => ErrorKind::DecryptionIntegrityFailed,
                CodecError::EncryptionVerificationFailed => {
                    ErrorKind::EncryptionVerificationFailed
                },
                // A backend that refuses its key cannot have produced a verified token.
                CodecError::Cipher(_) => ErrorKind::EncryptionVerificationFailed,
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, masksmith_codec::derive_from_password};

    #[test]
    fn codec_errors_keep_their_kind() {
        let err = VaultError::from(CodecError::UnsupportedVersion(1));
        assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
        assert_eq!(err.to_string(), "unsupported token version: 0x01");

        let err = VaultError::from(CodecError::DecryptionIntegrityFailed);
        assert_eq!(err.kind(), ErrorKind::DecryptionIntegrityFailed);
    }

    #[test]
    fn key_mismatch_names_both_keys() {
        let (_, expected) = derive_from_password("p@ss");
        let (_, entered) = derive_from_password("wrong");
        let err = VaultError::PasswordKeyMismatch { expected, entered };
        let message = err.to_string();
        assert!(message.contains(&expected.to_string()));
        assert!(message.contains(&entered.to_string()));
    }
}
