//! shhh - encrypt secrets inside configuration files.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shhh::cli::output;
use shhh::cli::{execute, Cli};
use shhh::error::{CipherError, ConfigError, Error, FormatError};

fn main() {
    let cli = Cli::parse();

    // SHHH_LOG wins over --verbose
    let filter = EnvFilter::try_from_env("SHHH_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("shhh=debug")
        } else {
            EnvFilter::new("shhh=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();

    if let Err(e) = execute(cli) {
        let suggestion = match &e {
            Error::Cipher(CipherError::KeyNotFound(_)) => {
                Some("import the recipient's key: shhh key import <file>")
            }
            Error::Cipher(CipherError::NoPrivateKey) => {
                Some("none of your private keys is a recipient of this file")
            }
            Error::Cipher(CipherError::KeyExpired(_)) => {
                Some("ask the recipient for a renewed key, or drop them from the list")
            }
            Error::Format(FormatError::Unsupported(_)) => {
                Some("pass --as <name> to choose a format, e.g. --as app.yaml")
            }
            Error::Config(ConfigError::UnknownBackend(_)) => {
                Some("set SHHH_BACKEND to auto, native or gpg")
            }
            _ => None,
        };

        output::error(&e.to_string());
        if let Some(hint) = suggestion {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}
