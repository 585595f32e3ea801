//! xread - drain DMA frames from a PGP card and report them
//!
//! Opens the card, allocates one receive buffer and reads frames until the
//! driver has nothing left, printing each frame's lane, vc and error flags
//! (and optionally the payload) to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use pgpcard::{open_device, read_device, DeviceConfig, DrainOptions};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Config file (JSON, or TOML with a `.toml` extension).
    #[arg(long, env = "PGPCARD_CONFIG")]
    config: Option<PathBuf>,
    /// Card device node (or `stub://name?frames=N` for a synthetic card).
    #[arg(long)]
    device: Option<String>,
    /// Receive buffer size in 32-bit words.
    #[arg(long, value_name = "WORDS")]
    max_words: Option<usize>,
    /// Print each frame's payload in hex.
    #[arg(long)]
    print_payload: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let cfg = DeviceConfig::load_from(args.config.as_deref())?.with_overrides(
        args.device,
        args.max_words,
        args.print_payload,
    )?;
    log::info!(
        "reading {} (buffer {} words, payload {})",
        cfg.device_path,
        cfg.max_words,
        if cfg.print_payload { "on" } else { "off" }
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let options = DrainOptions {
        print_payload: cfg.print_payload,
    };
    read_device(|| open_device(&cfg.device_path), cfg.max_words, &mut out, options)
        .with_context(|| format!("read failed on {}", cfg.device_path))?;
    Ok(())
}
