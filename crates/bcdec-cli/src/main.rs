use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::filter::EnvFilter;

mod config;
mod decode;

use decode::DecodeJob;

#[derive(Parser)]
#[command(name = "bcdec", version, about = "Decode obfuscated LuaJIT bytecode")]
struct Cli {
    /// Bytecode file, or directory of bytecode files
    input: PathBuf,

    /// Output directory (default: `dec` next to the input)
    output: Option<PathBuf>,

    /// Config file (default: bcdec.toml in the current or a parent directory)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Accept prototypes that carry debug info
    #[arg(long = "allow-debug-info")]
    allow_debug_info: bool,

    /// Reject containers with FFI constants
    #[arg(long = "no-ffi")]
    no_ffi: bool,

    /// Indent JSON listings
    #[arg(long)]
    pretty: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load_config(cli.config.as_deref())?;

    let mut options = config.decode.options();
    if cli.allow_debug_info {
        options = options.allow_debug_info(true);
    }
    if cli.no_ffi {
        options = options.ffi(false);
    }

    let job = DecodeJob {
        input: cli.input,
        output: cli.output,
        options,
        pretty: cli.pretty || config.output.pretty,
    };
    let summary = job.run()?;

    if summary.failed > 0 {
        tracing::error!("{} of {} files failed", summary.failed, summary.decoded + summary.failed);
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
