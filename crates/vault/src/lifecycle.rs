//! Password lifecycle: when to reuse, when to prompt, when to confirm.
//!
//! Resolution never writes to the store. It returns a [`ResolvedKey`] scoped
//! to one request; the caller runs the crypto and only then calls
//! [`PasswordLifecycle::commit`], so an aborted or failed request leaves the
//! store untouched.

use {
    masksmith_codec::{KeyId, KeyMaterial, derive_from_password},
    secrecy::{ExposeSecret, Secret},
};

use crate::{
    error::VaultError,
    passwords::PasswordStore,
    prompt::{PasswordPrompt, Prompter},
    store::SecretStore,
};

/// How a [`ResolvedKey`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Found in the store by the token's identifier; no prompt.
    Stored,
    /// The user accepted the offer to reuse the last password.
    ReusedDefault,
    /// Typed in, and matches a password already on record.
    Known,
    /// Typed in twice; not on record yet.
    New,
    /// Typed in to open a token whose key was not on record.
    Unlocked,
}

/// Key material for exactly one encrypt or decrypt request.
#[derive(Debug)]
pub struct ResolvedKey {
    pub id: KeyId,
    pub key: KeyMaterial,
    pub source: KeySource,
}

impl ResolvedKey {
    fn new(key: KeyMaterial, id: KeyId, source: KeySource) -> Self {
        Self { id, key, source }
    }
}

/// Drives the prompts for one request against a password store.
pub struct PasswordLifecycle<'a, S, P: ?Sized> {
    passwords: &'a PasswordStore<S>,
    prompter: &'a P,
    offer_last: bool,
}

impl<'a, S: SecretStore, P: Prompter + ?Sized> PasswordLifecycle<'a, S, P> {
    pub fn new(passwords: &'a PasswordStore<S>, prompter: &'a P) -> Self {
        Self {
            passwords,
            prompter,
            offer_last: true,
        }
    }

    /// Whether encryption offers the last password before prompting.
    #[must_use]
    pub fn offer_last_password(mut self, offer: bool) -> Self {
        self.offer_last = offer;
        self
    }

    /// Resolve the key to encrypt with.
    ///
    /// 1. Offer the last password, if one is on record. Dismissing aborts.
    /// 2. Otherwise prompt. A password already on record needs no confirmation.
    /// 3. A new password must be typed twice, identically.
    pub async fn resolve_for_encrypt(&self) -> Result<ResolvedKey, VaultError> {
        if self.offer_last
            && let Some((id, key)) = self.passwords.default_key().await?
        {
            match self.prompter.reuse_last(id).await {
                Some(true) => return Ok(ResolvedKey::new(key, id, KeySource::ReusedDefault)),
                Some(false) => {},
                None => return Err(VaultError::NoPasswordEntered),
            }
        }

        let password = self.ask(PasswordPrompt::Enter).await?;
        let (key, id) = derive_from_password(password.expose_secret());

        match self.passwords.lookup(id).await? {
            Some(stored) if stored.matches(&key) => {
                return Ok(ResolvedKey::new(key, id, KeySource::Known));
            },
            Some(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(key_id = %id, "new password collides with a stored key identifier");
                return Err(VaultError::KeyIdentifierCollision(id));
            },
            None => {},
        }

        let confirmation = self.ask(PasswordPrompt::Confirm).await?;
        if confirmation.expose_secret() != password.expose_secret() {
            return Err(VaultError::PasswordConfirmationMismatch);
        }

        Ok(ResolvedKey::new(key, id, KeySource::New))
    }

    /// Resolve the key for a token locked with `required`.
    ///
    /// A stored key is used without prompting. Otherwise the user gets one
    /// attempt; a password deriving a different identifier is rejected
    /// before any decryption is tried.
    pub async fn resolve_for_decrypt(&self, required: KeyId) -> Result<ResolvedKey, VaultError> {
        if let Some(key) = self.passwords.lookup(required).await? {
            return Ok(ResolvedKey::new(key, required, KeySource::Stored));
        }

        let password = self.ask(PasswordPrompt::Unlock(required)).await?;
        let (key, entered) = derive_from_password(password.expose_secret());
        if entered != required {
            return Err(VaultError::PasswordKeyMismatch {
                expected: required,
                entered,
            });
        }

        Ok(ResolvedKey::new(key, entered, KeySource::Unlocked))
    }

    /// Persist what a successful request learned about its password.
    pub async fn commit(&self, resolved: &ResolvedKey) -> Result<(), VaultError> {
        match resolved.source {
            KeySource::Stored | KeySource::ReusedDefault => Ok(()),
            KeySource::Known => self.passwords.set_default(resolved.id).await,
            KeySource::New | KeySource::Unlocked => {
                self.passwords.remember(&resolved.key).await?;
                self.passwords.set_default(resolved.id).await
            },
        }
    }

    async fn ask(&self, prompt: PasswordPrompt) -> Result<Secret<String>, VaultError> {
        match self.prompter.password(prompt).await {
            Some(password) if !password.expose_secret().is_empty() => Ok(password),
            _ => Err(VaultError::NoPasswordEntered),
        }
    }
}
