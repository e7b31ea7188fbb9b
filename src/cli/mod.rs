//! Command-line interface.
//!
//! A thin layer over [`crate::core::engine`]: read a file, run it through the
//! engine, write the result. Status goes to stderr, content to stdout or
//! `--output`.

pub mod decrypt;
pub mod encrypt;
pub mod inspect;
pub mod key;
pub mod output;

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::core::config::Settings;
use crate::core::metadata::Mode;
use crate::error::Result;

/// shhh - encrypt secrets inside configuration files.
#[derive(Parser)]
#[command(
    name = "shhh",
    about = "Encrypt secrets inside YAML, JSON, INI and .env files",
    version
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file (default: <config dir>/shhh/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Encrypt a file for one or more recipients
    Encrypt {
        /// File to encrypt ("-" for stdin)
        file: PathBuf,
        /// Recipient email (repeatable)
        #[arg(short, long = "recipient", value_name = "EMAIL", required = true)]
        recipients: Vec<String>,
        /// Vault label recorded in the file metadata
        #[arg(long, default_value = crate::core::engine::DEFAULT_VAULT)]
        vault: String,
        /// Encrypt each value (values) or the whole file (full)
        #[arg(long, default_value = "values")]
        mode: Mode,
        /// Detect the format from this name instead of the file's
        #[arg(long = "as", value_name = "NAME")]
        as_name: Option<String>,
        /// Write here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Decrypt a file
    Decrypt {
        /// File to decrypt ("-" for stdin)
        file: PathBuf,
        /// Detect the format from this name instead of the file's
        #[arg(long = "as", value_name = "NAME")]
        as_name: Option<String>,
        /// Write here instead of stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Show how a file was encrypted
    Inspect {
        /// File to inspect ("-" for stdin)
        file: PathBuf,
        /// Detect the format from this name instead of the file's
        #[arg(long = "as", value_name = "NAME")]
        as_name: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show, export and import public keys
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

/// Key subcommands.
#[derive(Subcommand)]
pub enum KeyAction {
    /// Show key details for an email address
    Show {
        email: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the ASCII-armored public key for an email address
    Export { email: String },

    /// Import a public key file into the keyring
    Import {
        /// Key file ("-" for stdin)
        file: PathBuf,
    },
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns error if settings cannot be loaded or the command fails.
pub fn execute(cli: Cli) -> Result<()> {
    let settings = Settings::discover(cli.config.as_deref())?;

    match cli.command {
        Command::Encrypt {
            file,
            recipients,
            vault,
            mode,
            as_name,
            output,
        } => encrypt::execute(
            &settings,
            encrypt::Args {
                file: &file,
                recipients,
                vault,
                mode,
                as_name: as_name.as_deref(),
                output: output.as_deref(),
            },
        ),
        Command::Decrypt {
            file,
            as_name,
            output,
        } => decrypt::execute(&settings, &file, as_name.as_deref(), output.as_deref()),
        Command::Inspect {
            file,
            as_name,
            json,
        } => inspect::execute(&file, as_name.as_deref(), json),
        Command::Key { action } => match action {
            KeyAction::Show { email, json } => key::show(&settings, &email, json),
            KeyAction::Export { email } => key::export(&settings, &email),
            KeyAction::Import { file } => key::import(&settings, &file),
        },
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read a file, or stdin for `-`.
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    if is_stdin(path) {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read(path)?)
}

/// Name used for format detection: `--as` if given, else the path.
pub(crate) fn detection_name(path: &Path, as_name: Option<&str>) -> String {
    match as_name {
        Some(name) => name.to_string(),
        None => path.to_string_lossy().into_owned(),
    }
}

/// Write to `output`, or stdout when none is given.
pub(crate) fn write_output(content: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, content)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
