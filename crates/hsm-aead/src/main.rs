//! `hsm-aead` — encrypt or decrypt stdin with a key held on a PKCS#11 token.
//!
//! Startup sequence:
//! 1. Parse arguments and load [`Config`] from `HSM_AEAD_*` variables.
//! 2. Initialise structured JSON logging on stderr.
//! 3. Open the PKCS#11 session and bind the AEAD adapter to the key.
//! 4. Encrypt (raw in, base64 out) or decrypt (base64 in, raw out).

use std::io::{self, Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use common::{Aead, AeadError};
use tracing::info;

use hsm_aead::config::Config;
use hsm_aead::{telemetry, HsmAead, Pkcs11Context};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Key label; overrides HSM_AEAD_KEY_LABEL
    #[arg(long)]
    key_label: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encrypt raw stdin, print the base64 envelope
    Encrypt {
        /// Associated data, authenticated but not encrypted
        #[arg(long, default_value = "")]
        aad: String,
    },
    /// Decrypt a base64 envelope from stdin, print the plaintext
    Decrypt {
        /// Associated data used at encryption time
        #[arg(long, default_value = "")]
        aad: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let code = e
                .downcast_ref::<AeadError>()
                .map(AeadError::code)
                .unwrap_or("error");
            eprintln!("ERROR [{code}]: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env()?;
    let key_label = cfg.key_label(args.key_label.as_deref())?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(version = env!("CARGO_PKG_VERSION"), key_label, "hsm-aead starting");

    // -----------------------------------------------------------------------
    // 3. Token + adapter
    // -----------------------------------------------------------------------
    let ctx = Pkcs11Context::configure(&cfg.token()).context("failed to open PKCS#11 token")?;
    let aead = HsmAead::new(Some(&ctx), key_label)?;

    // -----------------------------------------------------------------------
    // 4. Operation
    // -----------------------------------------------------------------------
    let mut input = Vec::new();
    io::stdin()
        .read_to_end(&mut input)
        .context("failed to read stdin")?;

    let mut stdout = io::stdout().lock();
    match args.command {
        Command::Encrypt { aad } => {
            let envelope = aead.encrypt(&input, aad.as_bytes())?;
            writeln!(stdout, "{}", STANDARD.encode(envelope))?;
        }
        Command::Decrypt { aad } => {
            let text = std::str::from_utf8(&input).context("input is not base64 text")?;
            let envelope = STANDARD
                .decode(text.trim())
                .context("input is not valid base64")?;
            let plaintext = aead.decrypt(&envelope, aad.as_bytes())?;
            stdout.write_all(&plaintext)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_encrypt_with_aad() {
        let args = Args::parse_from(["hsm-aead", "--key-label", "k1", "encrypt", "--aad", "user-id:42"]);
        assert_eq!(args.key_label.as_deref(), Some("k1"));
        match args.command {
            Command::Encrypt { aad } => assert_eq!(aad, "user-id:42"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn aad_defaults_to_empty() {
        let args = Args::parse_from(["hsm-aead", "decrypt"]);
        assert!(args.key_label.is_none());
        match args.command {
            Command::Decrypt { aad } => assert!(aad.is_empty()),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
