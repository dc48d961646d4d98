//! Mask and unmask requests over text and documents.

use std::ops::Range;

use masksmith_codec::{CodecError, Engine, Envelope, KeyId, VerifyPolicy, token};

use crate::{
    error::VaultError,
    lifecycle::PasswordLifecycle,
    passwords::PasswordStore,
    prompt::Prompter,
    store::SecretStore,
};

/// Tunables for a [`MaskService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaskOptions {
    pub verify: VerifyPolicy,
    /// Offer the last password before prompting for one when encrypting.
    pub offer_last_password: bool,
}

impl Default for MaskOptions {
    fn default() -> Self {
        Self {
            verify: VerifyPolicy::Always,
            offer_last_password: true,
        }
    }
}

/// What a document token reveals without any password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// Well-formed and locked with `key_id`. `known` when its key is stored.
    Locked { key_id: KeyId, known: bool },
    /// The token cannot be parsed.
    Invalid(CodecError),
}

/// One entry of [`MaskService::scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub range: Range<usize>,
    pub status: TokenStatus,
}

/// Performs mask and unmask requests.
///
/// Each request resolves its own key; nothing key-related is shared between
/// requests except through the store, so requests may run concurrently.
pub struct MaskService<S, P> {
    engine: Engine,
    passwords: PasswordStore<S>,
    prompter: P,
    offer_last_password: bool,
}

impl<S: SecretStore, P: Prompter> MaskService<S, P> {
    pub fn new(store: S, prompter: P) -> Self {
        Self::with_options(store, prompter, MaskOptions::default())
    }

    pub fn with_options(store: S, prompter: P, options: MaskOptions) -> Self {
        Self {
            engine: Engine::new().verify_policy(options.verify),
            passwords: PasswordStore::new(store),
            prompter,
            offer_last_password: options.offer_last_password,
        }
    }

    pub fn passwords(&self) -> &PasswordStore<S> {
        &self.passwords
    }

    pub fn prompter(&self) -> &P {
        &self.prompter
    }

    fn lifecycle(&self) -> PasswordLifecycle<'_, S, P> {
        PasswordLifecycle::new(&self.passwords, &self.prompter)
            .offer_last_password(self.offer_last_password)
    }

    /// Encrypt `plaintext` and return it in delimited form.
    pub async fn mask(&self, plaintext: &str) -> Result<String, VaultError> {
        let lifecycle = self.lifecycle();
        let resolved = lifecycle.resolve_for_encrypt().await?;
        let sealed = self
            .engine
            .seal(plaintext, &resolved.key, resolved.id)
            .inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::warn!(key_id = %resolved.id, error = %_e, "mask failed");
            })?;
        lifecycle.commit(&resolved).await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            key_id = %resolved.id,
            new_password = resolved.source == crate::lifecycle::KeySource::New,
            "masked text"
        );

        Ok(token::wrap(&sealed))
    }

    /// Decrypt a bare or delimited token.
    pub async fn unmask(&self, text: &str) -> Result<String, VaultError> {
        let token = token::unwrap(text)
            .ok_or_else(|| CodecError::MalformedToken("empty token".to_string()))?;
        let envelope = Envelope::deserialize(token)?;

        let lifecycle = self.lifecycle();
        let resolved = lifecycle.resolve_for_decrypt(envelope.key_id).await?;
        let plaintext = self.engine.decrypt(&envelope, &resolved.key)?;
        lifecycle.commit(&resolved).await?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            key_id = %resolved.id,
            unlocked = resolved.source == crate::lifecycle::KeySource::Unlocked,
            "unmasked token"
        );

        Ok(plaintext)
    }

    /// Replace the byte range `selection` of `document` with its token.
    ///
    /// On error the document is left as it was.
    pub async fn mask_range(
        &self,
        document: &str,
        selection: Range<usize>,
    ) -> Result<String, VaultError> {
        let Range { start, end } = selection;
        if start >= end {
            return Err(VaultError::InvalidSelection("nothing selected".to_string()));
        }
        if end > document.len() {
            return Err(VaultError::InvalidSelection(format!(
                "range {start}..{end} is past the end of the document ({} bytes)",
                document.len()
            )));
        }
        if !document.is_char_boundary(start) || !document.is_char_boundary(end) {
            return Err(VaultError::InvalidSelection(format!(
                "range {start}..{end} splits a character"
            )));
        }

        let masked = self.mask(&document[start..end]).await?;

        let mut out = String::with_capacity(document.len() - (end - start) + masked.len());
        out.push_str(&document[..start]);
        out.push_str(&masked);
        out.push_str(&document[end..]);
        Ok(out)
    }

    /// Replace every token in `document` with its plaintext.
    ///
    /// All or nothing: the first failing token aborts and no partially
    /// unmasked document is returned.
    pub async fn unmask_document(&self, document: &str) -> Result<String, VaultError> {
        let matches = token::find_all(document);
        let mut out = String::with_capacity(document.len());
        let mut cursor = 0;

        for found in &matches {
            let plaintext = self.unmask(found.token).await.inspect_err(|_e| {
                #[cfg(feature = "tracing")]
                tracing::warn!(at = found.range.start, error = %_e, "document unmask aborted");
            })?;
            out.push_str(&document[cursor..found.range.start]);
            out.push_str(&plaintext);
            cursor = found.range.end;
        }
        out.push_str(&document[cursor..]);

        #[cfg(feature = "tracing")]
        tracing::debug!(tokens = matches.len(), "unmasked document");

        Ok(out)
    }

    /// Decrypt the token covering byte `offset`, leaving the document alone.
    ///
    /// `Ok(None)` when no token is there.
    pub async fn peek(&self, document: &str, offset: usize) -> Result<Option<String>, VaultError> {
        match token::token_at(document, offset) {
            Some(found) => self.unmask(found.token).await.map(Some),
            None => Ok(None),
        }
    }

    /// Describe every token in `document` without prompting.
    pub async fn scan(&self, document: &str) -> Result<Vec<TokenInfo>, VaultError> {
        let mut infos = Vec::new();
        for found in token::find_all(document) {
            let status = match Envelope::deserialize(found.token) {
                Ok(envelope) => TokenStatus::Locked {
                    key_id: envelope.key_id,
                    known: self.passwords.lookup(envelope.key_id).await?.is_some(),
                },
                Err(e) => TokenStatus::Invalid(e),
            };
            infos.push(TokenInfo {
                range: found.range,
                status,
            });
        }
        Ok(infos)
    }
}
