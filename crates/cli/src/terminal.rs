//! Terminal prompts on stderr.

use {
    async_trait::async_trait,
    dialoguer::{Confirm, Password, theme::ColorfulTheme},
    masksmith_codec::KeyId,
    masksmith_vault::{PasswordPrompt, Prompter},
    secrecy::Secret,
    tracing::debug,
};

/// Environment variable that answers every password prompt non-interactively.
pub const PASSWORD_ENV: &str = "MASKSMITH_PASSWORD";

/// Prompts with `dialoguer`. Blocking reads run off the async runtime.
pub struct TerminalPrompter;

fn password_label(prompt: PasswordPrompt) -> String {
    match prompt {
        PasswordPrompt::Enter => "Password".to_string(),
        PasswordPrompt::Confirm => "Confirm password".to_string(),
        PasswordPrompt::Unlock(id) => format!("Password for key {id}"),
    }
}

#[async_trait]
impl Prompter for TerminalPrompter {
    async fn password(&self, prompt: PasswordPrompt) -> Option<Secret<String>> {
        let label = password_label(prompt);
        let answer = tokio::task::spawn_blocking(move || {
            Password::with_theme(&ColorfulTheme::default())
                .with_prompt(label)
                .allow_empty_password(true)
                .interact()
        })
        .await;

        match answer {
            Ok(Ok(password)) => Some(Secret::new(password)),
            Ok(Err(e)) => {
                debug!(error = %e, "password prompt dismissed");
                None
            },
            Err(e) => {
                debug!(error = %e, "password prompt task failed");
                None
            },
        }
    }

    async fn reuse_last(&self, key_id: KeyId) -> Option<bool> {
        let answer = tokio::task::spawn_blocking(move || {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("Use the last password (key {key_id})?"))
                .default(true)
                .interact_opt()
        })
        .await;

        match answer {
            Ok(Ok(choice)) => choice,
            Ok(Err(e)) => {
                debug!(error = %e, "reuse prompt dismissed");
                None
            },
            Err(e) => {
                debug!(error = %e, "reuse prompt task failed");
                None
            },
        }
    }
}
