//! xloop - set or clear PGP port loopback
//!
//! `xloop set|clear` applies to all ports; `xloop <port> <loop>` clears one
//! port when `loop` is 0 and sets it otherwise. Any other argument list
//! prints usage and exits successfully without touching the card.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

use pgpcard::loopback::{self, LoopbackRun};
use pgpcard::{open_device, DeviceConfig, LOOPBACK_USAGE};

#[derive(Parser, Debug)]
#[command(author, version, about, override_usage = LOOPBACK_USAGE)]
struct Args {
    /// Config file (JSON, or TOML with a `.toml` extension).
    #[arg(long, env = "PGPCARD_CONFIG")]
    config: Option<PathBuf>,
    /// Card device node (or `stub://name` for a synthetic card).
    #[arg(long)]
    device: Option<String>,
    /// `set`, `clear`, or `<port> <loop>`.
    #[arg(value_name = "ARGS", allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            log::debug!("usage: {}", e.kind());
            println!("{LOOPBACK_USAGE}");
            return Ok(());
        }
    };

    let outcome = loopback::run(args.args.as_slice(), || -> Result<_> {
        let cfg = DeviceConfig::load_from(args.config.as_deref())?.with_overrides(
            args.device.clone(),
            None,
            false,
        )?;
        let device = open_device(&cfg.device_path)?;
        Ok(device)
    })
    .context("loopback command failed")?;
    if let LoopbackRun::Usage(reason) = outcome {
        log::debug!("usage: {}", reason);
        println!("{LOOPBACK_USAGE}");
    }
    Ok(())
}
