use std::{
    io::{IsTerminal, Read},
    path::{Path, PathBuf},
};

use {
    anyhow::{Context, Result},
    masksmith_codec::VerifyPolicy,
    masksmith_config::MaskSmithConfig,
    masksmith_vault::{
        ErrorKind, MaskOptions, MaskService, MemorySecretStore, Prompter, SecretStore,
        SqliteSecretStore, StaticPrompter, TokenStatus, VaultError,
    },
    secrecy::Secret,
    tracing::{debug, info},
};

use crate::terminal::{PASSWORD_ENV, TerminalPrompter};

pub type DynService = MaskService<Box<dyn SecretStore>, Box<dyn Prompter>>;

/// Where password records are kept for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    Sqlite(PathBuf),
    Memory,
}

impl StoreTarget {
    /// `--ephemeral`, then `--store`, then config (env override already applied).
    pub fn select(ephemeral: bool, store: Option<PathBuf>, config: &MaskSmithConfig) -> Self {
        if ephemeral {
            return Self::Memory;
        }
        Self::Sqlite(store.unwrap_or_else(|| config.storage.resolved_path()))
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Sqlite(path) => path.display().to_string(),
            Self::Memory => "in-memory (discarded on exit)".to_string(),
        }
    }

    async fn open(&self) -> Result<Box<dyn SecretStore>> {
        match self {
            Self::Sqlite(path) => {
                let store = SqliteSecretStore::open(path)
                    .await
                    .with_context(|| format!("failed to open secret store {}", path.display()))?;
                Ok(Box::new(store))
            },
            Self::Memory => Ok(Box::new(MemorySecretStore::new())),
        }
    }
}

/// Map the crypto config section onto a verification policy.
pub fn verify_policy(config: &MaskSmithConfig) -> VerifyPolicy {
    match (
        config.crypto.verify_after_encrypt,
        config.crypto.verify_max_bytes,
    ) {
        (false, _) => VerifyPolicy::Never,
        (true, Some(limit)) => VerifyPolicy::UpTo(limit),
        (true, None) => VerifyPolicy::Always,
    }
}

fn prompter() -> Box<dyn Prompter> {
    match std::env::var(PASSWORD_ENV) {
        Ok(password) if !password.is_empty() => {
            debug!(env = PASSWORD_ENV, "using password from environment");
            Box::new(StaticPrompter::new(Secret::new(password)))
        },
        _ => Box::new(TerminalPrompter),
    }
}

/// Open the store and assemble a service for one command.
pub async fn build_service(target: &StoreTarget, config: &MaskSmithConfig) -> Result<DynService> {
    let store = target.open().await?;
    let options = MaskOptions {
        verify: verify_policy(config),
        offer_last_password: config.prompt.offer_last_password,
    };
    Ok(MaskService::with_options(store, prompter(), options))
}

/// Attach a user-facing explanation to a failed request.
pub fn describe(err: VaultError) -> anyhow::Error {
    let hint = match err.kind() {
        ErrorKind::NoPasswordEntered => "cancelled: no password entered",
        ErrorKind::PasswordConfirmationMismatch => {
            "the two passwords did not match; nothing was encrypted"
        },
        ErrorKind::PasswordKeyMismatch => "wrong password for this token",
        ErrorKind::KeyIdentifierCollision => {
            "this password collides with a different stored password; choose another"
        },
        ErrorKind::UnsupportedVersion => "token was made by a newer version of masksmith",
        ErrorKind::DecryptionFailed => "token could not be decrypted; it is corrupted or was altered",
        ErrorKind::DecryptionIntegrityFailed => "decrypted content failed its integrity check",
        ErrorKind::EncryptionVerificationFailed => {
            "encryption could not be verified; nothing was written"
        },
        ErrorKind::StorageFailure => "secret store error",
        ErrorKind::MalformedToken => "not a valid masksmith token",
        ErrorKind::InvalidSelection => "invalid selection",
    };
    anyhow::Error::new(err).context(hint)
}

/// Strip one trailing line ending, as left by `echo` or a terminal.
fn trim_line_ending(mut text: String) -> String {
    if text.ends_with('\n') {
        text.pop();
        if text.ends_with('\r') {
            text.pop();
        }
    }
    text
}

/// The positional argument, or stdin when omitted.
fn arg_or_stdin(arg: Option<String>) -> Result<String> {
    if let Some(text) = arg {
        return Ok(text);
    }
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        eprintln!("Reading from stdin; end with Ctrl-D.");
    }
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(trim_line_ending(buf))
}

async fn read_document(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Sibling file a document is staged in before it replaces the original.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".masksmith.tmp");
    path.with_file_name(name)
}

/// Replace `path` atomically via temp file + rename.
async fn write_document(path: &Path, contents: &str) -> Result<()> {
    let tmp = staging_path(path);
    tokio::fs::write(&tmp, contents)
        .await
        .with_context(|| format!("failed to stage {}", tmp.display()))?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

/// 1-based line and column (in characters) of a byte offset.
fn line_col(document: &str, offset: usize) -> (usize, usize) {
    let before = &document[..offset.min(document.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let col = before[line_start..].chars().count() + 1;
    (line, col)
}

pub async fn encrypt<S: SecretStore, P: Prompter>(
    svc: &MaskService<S, P>,
    text: Option<String>,
) -> Result<String> {
    let plaintext = arg_or_stdin(text)?;
    svc.mask(&plaintext).await.map_err(describe)
}

pub async fn decrypt<S: SecretStore, P: Prompter>(
    svc: &MaskService<S, P>,
    token: Option<String>,
) -> Result<String> {
    let token = arg_or_stdin(token)?;
    svc.unmask(&token).await.map_err(describe)
}

/// Mask a byte range of `path` in place.
pub async fn mask_file<S: SecretStore, P: Prompter>(
    svc: &MaskService<S, P>,
    path: &Path,
    start: usize,
    end: usize,
) -> Result<()> {
    let document = read_document(path).await?;
    let masked = svc
        .mask_range(&document, start..end)
        .await
        .map_err(describe)?;
    write_document(path, &masked).await?;
    info!(path = %path.display(), start, end, "masked selection");
    Ok(())
}

/// Unmask every token in `path`. Returns the document when `to_stdout`,
/// otherwise rewrites the file and returns how many tokens were replaced.
pub async fn unmask_file<S: SecretStore, P: Prompter>(
    svc: &MaskService<S, P>,
    path: &Path,
    to_stdout: bool,
) -> Result<UnmaskOutcome> {
    let document = read_document(path).await?;
    let count = masksmith_codec::token::find_all(&document).len();
    let unmasked = svc.unmask_document(&document).await.map_err(describe)?;
    if to_stdout {
        return Ok(UnmaskOutcome::Printed(unmasked));
    }
    if count > 0 {
        write_document(path, &unmasked).await?;
    }
    info!(path = %path.display(), tokens = count, "unmasked document");
    Ok(UnmaskOutcome::Rewritten(count))
}

#[derive(Debug, PartialEq, Eq)]
pub enum UnmaskOutcome {
    Printed(String),
    Rewritten(usize),
}

pub async fn peek_file<S: SecretStore, P: Prompter>(
    svc: &MaskService<S, P>,
    path: &Path,
    offset: usize,
) -> Result<Option<String>> {
    let document = read_document(path).await?;
    svc.peek(&document, offset).await.map_err(describe)
}

/// One line per token: position, key identifier and whether it is known.
pub async fn scan_file<S: SecretStore, P: Prompter>(
    svc: &MaskService<S, P>,
    path: &Path,
) -> Result<Vec<String>> {
    let document = read_document(path).await?;
    let infos = svc.scan(&document).await.map_err(describe)?;
    Ok(infos
        .iter()
        .map(|info| {
            let (line, col) = line_col(&document, info.range.start);
            let status = match &info.status {
                TokenStatus::Locked { key_id, known: true } => format!("key {key_id}"),
                TokenStatus::Locked {
                    key_id,
                    known: false,
                } => format!("key {key_id} (password not stored)"),
                TokenStatus::Invalid(e) => format!("invalid: {e}"),
            };
            format!("{}:{line}:{col}\t{status}", path.display())
        })
        .collect())
}

pub async fn status(
    target: &StoreTarget,
    config: &MaskSmithConfig,
    config_path: Option<&Path>,
) -> Result<()> {
    match config_path {
        Some(path) => println!("Config:       {}", path.display()),
        None => println!("Config:       (defaults)"),
    }
    println!("Store:        {}", target.describe());

    let svc = build_service(target, config).await?;
    match svc.passwords().default_key_id().await.map_err(describe)? {
        Some(id) => println!("Last key:     {id}"),
        None => println!("Last key:     (none)"),
    }

    let verify = match verify_policy(config) {
        VerifyPolicy::Always => "always".to_string(),
        VerifyPolicy::UpTo(limit) => format!("up to {limit} bytes"),
        VerifyPolicy::Never => "never".to_string(),
    };
    println!("Verification: {verify}");
    println!(
        "Reuse offer:  {}",
        if config.prompt.offer_last_password {
            "on"
        } else {
            "off"
        }
    );
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        masksmith_vault::{Answer, ScriptedPrompter},
        rstest::rstest,
        std::sync::Arc,
    };

    fn pw(s: &str) -> Answer {
        Answer::Password(Some(s.to_string()))
    }

    #[rstest]
    #[case(true, None, VerifyPolicy::Always)]
    #[case(true, Some(64), VerifyPolicy::UpTo(64))]
    #[case(false, Some(64), VerifyPolicy::Never)]
    #[case(false, None, VerifyPolicy::Never)]
    fn verify_policy_from_config(
        #[case] enabled: bool,
        #[case] limit: Option<usize>,
        #[case] expected: VerifyPolicy,
    ) {
        let mut config = MaskSmithConfig::default();
        config.crypto.verify_after_encrypt = enabled;
        config.crypto.verify_max_bytes = limit;
        assert_eq!(verify_policy(&config), expected);
    }

    #[test]
    fn store_selection() {
        let mut config = MaskSmithConfig::default();
        config.storage.path = Some(PathBuf::from("/cfg/secrets.db"));

        assert_eq!(
            StoreTarget::select(true, Some(PathBuf::from("/flag.db")), &config),
            StoreTarget::Memory
        );
        assert_eq!(
            StoreTarget::select(false, Some(PathBuf::from("/flag.db")), &config),
            StoreTarget::Sqlite(PathBuf::from("/flag.db"))
        );
        assert_eq!(
            StoreTarget::select(false, None, &config),
            StoreTarget::Sqlite(PathBuf::from("/cfg/secrets.db"))
        );
    }

    #[rstest]
    #[case("secret\n", "secret")]
    #[case("secret\r\n", "secret")]
    #[case("secret\n\n", "secret\n")]
    #[case("secret", "secret")]
    #[case("", "")]
    fn trims_one_line_ending(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(trim_line_ending(input.to_string()), expected);
    }

    #[test]
    fn line_and_column() {
        let doc = "first\nsé<cond\nthird";
        assert_eq!(line_col(doc, 0), (1, 1));
        assert_eq!(line_col(doc, 6), (2, 1));
        assert_eq!(line_col(doc, doc.find('<').unwrap()), (2, 3));
    }

    #[test]
    fn described_errors_keep_the_cause() {
        let err = describe(VaultError::PasswordConfirmationMismatch);
        assert!(err.to_string().contains("did not match"));
        let cause = err.downcast_ref::<VaultError>().unwrap();
        assert_eq!(cause.kind(), ErrorKind::PasswordConfirmationMismatch);
    }

    #[tokio::test]
    async fn mask_and_unmask_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let original = "api_key = abc123\n";
        std::fs::write(&path, original).unwrap();

        let store = Arc::new(MemorySecretStore::new());
        let svc = MaskService::new(store.clone(), ScriptedPrompter::new([pw("p@ss"), pw("p@ss")]));
        let start = original.find("abc123").unwrap();
        mask_file(&svc, &path, start, start + 6).await.unwrap();

        let masked = std::fs::read_to_string(&path).unwrap();
        assert!(masked.starts_with("api_key = <!MASK-SMITH:"));
        assert!(!masked.contains("abc123"));

        let lines = scan_file(&svc, &path).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains(":1:11\tkey "), "{}", lines[0]);

        let peeked = peek_file(&svc, &path, start).await.unwrap();
        assert_eq!(peeked.as_deref(), Some("abc123"));

        let printed = unmask_file(&svc, &path, true).await.unwrap();
        assert_eq!(printed, UnmaskOutcome::Printed(original.to_string()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), masked);

        let rewritten = unmask_file(&svc, &path, false).await.unwrap();
        assert_eq!(rewritten, UnmaskOutcome::Rewritten(1));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn failed_mask_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "keep").unwrap();

        let svc = MaskService::new(
            MemorySecretStore::new(),
            ScriptedPrompter::new([pw("p@ss"), pw("nope")]),
        );
        let err = mask_file(&svc, &path, 0, 4).await.unwrap_err();
        assert!(err.to_string().contains("did not match"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep");
    }

    #[tokio::test]
    async fn staging_failure_leaves_document_intact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "user=admin password=hunter2\n").unwrap();
        // A directory in the staging slot makes the temp write fail.
        std::fs::create_dir(staging_path(&path)).unwrap();

        assert!(write_document(&path, "replaced").await.is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "user=admin password=hunter2\n"
        );
    }

    #[tokio::test]
    async fn failed_replace_removes_staged_copy() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails.
        let path = dir.path().join("notes");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep.txt"), "kept").unwrap();

        assert!(write_document(&path, "replaced").await.is_err());
        assert!(!staging_path(&path).exists());
        assert_eq!(std::fs::read_to_string(path.join("keep.txt")).unwrap(), "kept");
    }

    #[tokio::test]
    async fn written_document_leaves_no_staged_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "old").unwrap();

        write_document(&path, "new").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
        assert!(!staging_path(&path).exists());
        assert_eq!(staging_path(&path), dir.path().join("notes.txt.masksmith.tmp"));
    }

    #[tokio::test]
    async fn scan_marks_unknown_passwords() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");

        let writer = MaskService::new(
            MemorySecretStore::new(),
            ScriptedPrompter::new([pw("p@ss"), pw("p@ss")]),
        );
        let token = writer.mask("hidden").await.unwrap();
        std::fs::write(&path, format!("x\n{token}\n<!MASK-SMITH:#####>\n")).unwrap();

        let reader = MaskService::new(MemorySecretStore::new(), ScriptedPrompter::default());
        let lines = scan_file(&reader, &path).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(":2:1\t"));
        assert!(lines[0].ends_with("(password not stored)"));
        assert!(lines[1].contains(":3:1\tinvalid: "));
    }

    #[tokio::test]
    async fn sqlite_target_opens_and_migrates() {
        let dir = tempfile::tempdir().unwrap();
        let target = StoreTarget::Sqlite(dir.path().join("store").join("secrets.db"));
        let store = target.open().await.unwrap();
        store.set("canary", "value").await.unwrap();
        assert_eq!(store.get("canary").await.unwrap().as_deref(), Some("value"));
    }
}
