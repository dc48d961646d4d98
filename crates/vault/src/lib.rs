//! Password handling and mask/unmask orchestration for masksmith.
//!
//! Key material lives in a [`SecretStore`] under its three-byte key
//! identifier. A [`PasswordLifecycle`] decides when the user is prompted, and
//! a [`MaskService`] runs whole requests against text and documents.

pub mod error;
pub mod lifecycle;
pub mod passwords;
pub mod prompt;
pub mod service;
pub mod sqlite;
pub mod store;

pub use {
    error::{ErrorKind, VaultError},
    lifecycle::{KeySource, PasswordLifecycle, ResolvedKey},
    passwords::PasswordStore,
    prompt::{Answer, Asked, PasswordPrompt, Prompter, ScriptedPrompter, StaticPrompter},
    service::{MaskOptions, MaskService, TokenInfo, TokenStatus},
    sqlite::SqliteSecretStore,
    store::{MemorySecretStore, SecretStore},
};

/// Run database migrations for the secret store.
///
/// Creates the `secrets` table.
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<(), VaultError> {
    sqlx::migrate!("./migrations")
        .set_ignore_missing(true)
        .run(pool)
        .await?;
    Ok(())
}
