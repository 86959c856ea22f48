//! Command-line interface.

pub mod apply;
pub mod completions;
pub mod context;
pub mod inspect;
pub mod manifest;
pub mod output;
pub mod reconcile;
pub mod seal;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::constants;

/// cryptctl - Converge encrypted secret records into plaintext secrets.
#[derive(Parser)]
#[command(
    name = "cryptctl",
    about = "Converge encrypted secret records into plaintext secrets",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub globals: Globals,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct Globals {
    /// Config file (default: ./cryptctl.toml, then the user config dir)
    #[arg(long, global = true, env = "CRYPTCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// State file holding records and secrets
    #[arg(long, global = true, env = "CRYPTCTL_STATE", default_value = constants::STATE_FILE)]
    pub state: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Seal a single value with the static passphrase
    Seal {
        /// Plaintext value (read from stdin if omitted)
        value: Option<String>,
        /// Key derivation override
        #[arg(long, value_enum)]
        kdf: Option<KdfChoice>,
    },

    /// Open a single sealed value with the static passphrase
    Open {
        /// Sealed value (read from stdin if omitted)
        blob: Option<String>,
        /// Key derivation override
        #[arg(long, value_enum)]
        kdf: Option<KdfChoice>,
    },

    /// Decrypt an EncryptedSecret manifest to a DecryptedSecret
    Decrypt {
        /// Manifest path, or - for stdin
        manifest: PathBuf,
    },

    /// Encrypt a DecryptedSecret manifest to an EncryptedSecret
    Encrypt {
        /// Manifest path, or - for stdin
        manifest: PathBuf,
        /// Previous EncryptedSecret; unchanged fields keep their ciphertext
        #[arg(long)]
        from: Option<PathBuf>,
        /// Seal every field of --from again, ignoring the manifest's values
        #[arg(long, requires = "from")]
        re_encrypt: bool,
    },

    /// Store an EncryptedSecret or Secret manifest
    Apply {
        /// Manifest path, or - for stdin
        manifest: PathBuf,
    },

    /// Run convergence passes
    Reconcile {
        /// Record to reconcile (namespace/name)
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<String>,
        /// Reconcile every stored record
        #[arg(long)]
        all: bool,
    },

    /// Show the status of an EncryptedSecret
    Status {
        /// Record (namespace/name)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a derived Secret
    GetSecret {
        /// Secret (namespace/name)
        id: String,
        /// Output the manifest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Key derivation override for the raw primitive.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KdfChoice {
    Argon2id,
    LegacyMd5,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a command.
pub fn execute(command: Command, globals: &Globals) -> crate::error::Result<()> {
    use Command::*;

    match command {
        Seal { value, kdf } => seal::seal(globals, value, kdf),
        Open { blob, kdf } => seal::open(globals, blob, kdf),
        Decrypt { manifest } => manifest::decrypt(globals, &manifest),
        Encrypt {
            manifest,
            from,
            re_encrypt,
        } => manifest::encrypt(globals, &manifest, from.as_deref(), re_encrypt),
        Apply { manifest } => apply::execute(globals, &manifest),
        Reconcile { id, all } => reconcile::execute(globals, id.as_deref(), all),
        Status { id, json } => inspect::status(globals, &id, json),
        GetSecret { id, json } => inspect::secret(globals, &id, json),
        Completions { shell } => completions::execute(shell),
    }
}
