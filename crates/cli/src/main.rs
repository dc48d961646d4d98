mod config_commands;
mod mask_commands;
mod terminal;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::mask_commands::{StoreTarget, UnmaskOutcome};

#[derive(Parser)]
#[command(
    name = "masksmith",
    version,
    about = "Mask secrets inside text files with password-encrypted tokens"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of ./masksmith.toml and ~/.config/masksmith/).
    #[arg(long, global = true, env = "MASKSMITH_CONFIG")]
    config: Option<PathBuf>,

    /// Secret store database file (overrides config).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Keep passwords in memory only for this run.
    #[arg(long, global = true, default_value_t = false, conflicts_with = "store")]
    ephemeral: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt text and print the token.
    Encrypt {
        /// Text to encrypt; read from stdin when omitted.
        text: Option<String>,
    },
    /// Decrypt a token (bare or `<!MASK-SMITH:…>`) and print the text.
    Decrypt {
        /// Token to decrypt; read from stdin when omitted.
        token: Option<String>,
    },
    /// Replace a byte range of a file with its token.
    Mask {
        file: PathBuf,
        /// First byte of the selection.
        #[arg(long)]
        start: usize,
        /// One past the last byte of the selection.
        #[arg(long)]
        end: usize,
    },
    /// Replace every token in a file with its text.
    Unmask {
        file: PathBuf,
        /// Print the result instead of rewriting the file.
        #[arg(long)]
        stdout: bool,
    },
    /// Print the text of the token at a byte offset.
    Peek {
        file: PathBuf,
        #[arg(long)]
        offset: usize,
    },
    /// List the tokens in a file without decrypting them.
    Scan { file: PathBuf },
    /// Show config, store and last-used key.
    Status,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

/// Initialise tracing on stderr; stdout carries only command output.
fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    debug!(version = env!("CARGO_PKG_VERSION"), "masksmith starting");

    let loaded = masksmith_config::load(cli.config.as_deref())?;
    let config = loaded.config;
    let target = StoreTarget::select(cli.ephemeral, cli.store, &config);

    match cli.command {
        Commands::Config { action } => {
            config_commands::handle_config(action, &config, loaded.path.as_deref())
        },
        Commands::Status => mask_commands::status(&target, &config, loaded.path.as_deref()).await,
        command => {
            let svc = mask_commands::build_service(&target, &config).await?;
            match command {
                Commands::Encrypt { text } => {
                    println!("{}", mask_commands::encrypt(&svc, text).await?);
                },
                Commands::Decrypt { token } => {
                    println!("{}", mask_commands::decrypt(&svc, token).await?);
                },
                Commands::Mask { file, start, end } => {
                    mask_commands::mask_file(&svc, &file, start, end).await?;
                    eprintln!("Masked bytes {start}..{end} of {}", file.display());
                },
                Commands::Unmask { file, stdout } => {
                    match mask_commands::unmask_file(&svc, &file, stdout).await? {
                        UnmaskOutcome::Printed(text) => print!("{text}"),
                        UnmaskOutcome::Rewritten(0) => eprintln!("No tokens found."),
                        UnmaskOutcome::Rewritten(n) => {
                            eprintln!("Unmasked {n} token(s) in {}", file.display());
                        },
                    }
                },
                Commands::Peek { file, offset } => {
                    match mask_commands::peek_file(&svc, &file, offset).await? {
                        Some(text) => println!("{text}"),
                        None => anyhow::bail!("no token at byte {offset}"),
                    }
                },
                Commands::Scan { file } => {
                    let lines = mask_commands::scan_file(&svc, &file).await?;
                    if lines.is_empty() {
                        eprintln!("No tokens found.");
                    }
                    for line in lines {
                        println!("{line}");
                    }
                },
                Commands::Status | Commands::Config { .. } => {},
            }
            Ok(())
        },
    }
}
