//! Interactive prompt collaborator.

use std::{
    collections::VecDeque,
    sync::{Mutex, PoisonError},
};

use {
    async_trait::async_trait,
    masksmith_codec::KeyId,
    secrecy::{ExposeSecret, Secret},
};

/// Which masked password entry is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordPrompt {
    /// A password to encrypt with.
    Enter,
    /// Re-entry of a password not seen before.
    Confirm,
    /// The password for a token locked with this key.
    Unlock(KeyId),
}

/// Asks the user for passwords and decisions.
///
/// Every method may suspend for as long as the user takes. `None` means the
/// prompt was dismissed, which aborts the enclosing request.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Masked single-line input.
    async fn password(&self, prompt: PasswordPrompt) -> Option<Secret<String>>;

    /// Yes/no: encrypt with the last password used (`key_id`)?
    async fn reuse_last(&self, key_id: KeyId) -> Option<bool>;
}

#[async_trait]
impl<P: Prompter + ?Sized> Prompter for Box<P> {
    async fn password(&self, prompt: PasswordPrompt) -> Option<Secret<String>> {
        (**self).password(prompt).await
    }

    async fn reuse_last(&self, key_id: KeyId) -> Option<bool> {
        (**self).reuse_last(key_id).await
    }
}

/// Non-interactive prompter answering every password prompt with one secret.
///
/// Never reuses the last password, so the supplied password is always the
/// one that gets used.
pub struct StaticPrompter {
    password: Secret<String>,
}

impl StaticPrompter {
    pub fn new(password: Secret<String>) -> Self {
        Self { password }
    }
}

#[async_trait]
impl Prompter for StaticPrompter {
    async fn password(&self, _prompt: PasswordPrompt) -> Option<Secret<String>> {
        Some(Secret::new(self.password.expose_secret().clone()))
    }

    async fn reuse_last(&self, _key_id: KeyId) -> Option<bool> {
        Some(false)
    }
}

/// One recorded interaction with a [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asked {
    Password(PasswordPrompt),
    ReuseLast(KeyId),
}

/// A scripted answer. `None` plays a dismissed prompt.
#[derive(Debug, Clone)]
pub enum Answer {
    Password(Option<String>),
    Choice(Option<bool>),
}

/// Prompter that replays queued answers and records what it was asked.
///
/// An exhausted script, or an answer of the wrong kind, behaves like a
/// dismissed prompt.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<Asked>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::default(),
        }
    }

    /// Interactions so far, in order.
    pub fn asked(&self) -> Vec<Asked> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Answers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn next(&self, asked: Asked) -> Option<Answer> {
        self.asked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(asked);
        self.answers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn password(&self, prompt: PasswordPrompt) -> Option<Secret<String>> {
        match self.next(Asked::Password(prompt)) {
            Some(Answer::Password(answer)) => answer.map(Secret::new),
            _ => None,
        }
    }

    async fn reuse_last(&self, key_id: KeyId) -> Option<bool> {
        match self.next(Asked::ReuseLast(key_id)) {
            Some(Answer::Choice(answer)) => answer,
            _ => None,
        }
    }
}
