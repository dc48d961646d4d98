//! Encryption engine: content-derived IV, AEAD, self-verification.

use sha2::{Digest, Sha256};

use crate::{
    envelope::{Envelope, EnvelopeVersion},
    error::CodecError,
    gcm::Aes256GcmCipher,
    kdf::{KeyId, KeyMaterial},
    traits::{Cipher, IV_LEN},
};

/// When [`Engine::encrypt`] re-decrypts its own output before returning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerifyPolicy {
    /// Every encryption is checked.
    #[default]
    Always,
    /// Only plaintexts up to this many bytes are checked.
    UpTo(usize),
    /// No check.
    Never,
}

impl VerifyPolicy {
    fn applies_to(self, len: usize) -> bool {
        match self {
            Self::Always => true,
            Self::UpTo(limit) => len <= limit,
            Self::Never => false,
        }
    }
}

/// First 12 bytes of SHA-256 over `data`.
#[must_use]
pub fn content_iv(data: &[u8]) -> [u8; IV_LEN] {
    let digest = Sha256::digest(data);
    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(&digest[..IV_LEN]);
    iv
}

/// Turns plaintext into envelopes and back.
///
/// Holds no key state: every call takes the key it needs, so concurrent
/// requests with different passwords cannot observe each other's keys.
#[derive(Debug, Clone, Default)]
pub struct Engine<C: Cipher = Aes256GcmCipher> {
    cipher: C,
    verify: VerifyPolicy,
}

impl Engine<Aes256GcmCipher> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Cipher> Engine<C> {
    #[must_use]
    pub fn with_cipher(cipher: C) -> Self {
        Self {
            cipher,
            verify: VerifyPolicy::default(),
        }
    }

    #[must_use]
    pub fn verify_policy(mut self, verify: VerifyPolicy) -> Self {
        self.verify = verify;
        self
    }

    /// Encrypt `plaintext` into an envelope tagged with `key_id`.
    ///
    /// Unless the [`VerifyPolicy`] exempts it, the envelope is decrypted again
    /// and compared with the input; any difference or failure yields
    /// [`CodecError::EncryptionVerificationFailed`] and no envelope.
    pub fn encrypt(
        &self,
        plaintext: &str,
        key: &KeyMaterial,
        key_id: KeyId,
    ) -> Result<Envelope, CodecError> {
        let bytes = plaintext.as_bytes();
        let iv = content_iv(bytes);
        let ciphertext = self.cipher.encrypt(key.as_bytes(), &iv, bytes)?;

        let envelope = Envelope {
            iv,
            key_id,
            version: EnvelopeVersion::CURRENT,
            ciphertext,
        };

        if self.verify.applies_to(bytes.len()) {
            match self.decrypt(&envelope, key) {
                Ok(round_trip) if round_trip.as_bytes() == bytes => {},
                Ok(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(%key_id, "self-verification produced different plaintext");
                    return Err(CodecError::EncryptionVerificationFailed);
                },
                Err(_e) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!(%key_id, error = %_e, "self-verification failed to decrypt");
                    return Err(CodecError::EncryptionVerificationFailed);
                },
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(%key_id, len = bytes.len(), "encrypted");

        Ok(envelope)
    }

    /// Decrypt an envelope and confirm its content still hashes to the IV.
    pub fn decrypt(&self, envelope: &Envelope, key: &KeyMaterial) -> Result<String, CodecError> {
        let plaintext = self
            .cipher
            .decrypt(key.as_bytes(), &envelope.iv, &envelope.ciphertext)?;

        if content_iv(&plaintext) != envelope.iv {
            return Err(CodecError::DecryptionIntegrityFailed);
        }

        String::from_utf8(plaintext)
            .map_err(|_| CodecError::MalformedToken("plaintext is not valid UTF-8".to_string()))
    }

    /// Encrypt straight to token text (no document delimiters).
    pub fn seal(
        &self,
        plaintext: &str,
        key: &KeyMaterial,
        key_id: KeyId,
    ) -> Result<String, CodecError> {
        Ok(self.encrypt(plaintext, key, key_id)?.serialize())
    }

    /// Decrypt token text produced by [`seal`](Self::seal).
    pub fn open(&self, token: &str, key: &KeyMaterial) -> Result<String, CodecError> {
        self.decrypt(&Envelope::deserialize(token)?, key)
    }
}
