//! cryptctl - Converge encrypted secret records into plaintext secrets.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cryptctl::cli::output;
use cryptctl::cli::{execute, Cli, LogFormat};
use cryptctl::core::constants;
use cryptctl::error::{ConfigError, Error, KeyError, ProviderError};

fn init_tracing(verbose: bool, format: LogFormat) {
    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("cryptctl=debug")
        } else {
            EnvFilter::new("cryptctl=warn")
        }
    });

    // stdout carries manifests and sealed values; logs go to stderr.
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .without_time(),
            )
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

fn hint(e: &Error) -> Option<String> {
    match e {
        Error::Config(ConfigError::MissingPassphrase(var)) => Some(format!("export {}", var)),
        Error::Provider(ProviderError::Key(KeyError::Unavailable(_))) => Some(format!(
            "export {} or add the key secret to the state file",
            constants::PASSPHRASE_ENV
        )),
        Error::Provider(ProviderError::MissingSnapshot(_)) => {
            Some("pass the previous EncryptedSecret with --from".to_string())
        }
        Error::Provider(ProviderError::NotCompiled(_, feature)) => {
            Some(format!("cargo install cryptctl --features {}", feature))
        }
        _ => None,
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.globals.verbose, cli.globals.log_format);

    if let Err(e) = execute(cli.command, &cli.globals) {
        output::error(&e.to_string());
        if let Some(hint) = hint(&e) {
            output::hint(&hint);
        }
        std::process::exit(1);
    }
}
