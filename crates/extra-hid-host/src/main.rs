mod config;
mod host;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use extra_hid_core::diagnostics::hex_string;
use extra_hid_core::response::{HidStatus, ResponseId};
use log::error;
use thiserror::Error;

use crate::config::ConfigError;
use crate::host::{Host, SentFrame};
use crate::script::ScriptError;

#[derive(Parser)]
#[command(about = "Drive an emulated Extra HID device from a command script")]
struct Args {
    /// Script of commands (send, advance, bind, reload, disconnect)
    script: PathBuf,

    /// Device config file (defaults to the per-user config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective config back to the config path before running
    #[arg(long)]
    save_config: bool,

    /// Clock granularity in milliseconds
    #[arg(long, default_value_t = 1)]
    tick_ms: u64,

    /// Print decoded fields for status reports
    #[arg(long)]
    decode: bool,

    /// Enable debug logging
    #[arg(long)]
    verbose: bool,
}

#[derive(Error, Debug)]
enum AppError {
    #[error("failed to read script {path}: {source}")]
    ReadScript {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn print_frame(frame: &SentFrame, decode: bool) {
    println!("{:>10.3} ms  {}", frame.at_ms(), hex_string(&frame.bytes));
    if !decode || frame.bytes.first() != Some(&(ResponseId::ReadHidStatus as u8)) {
        return;
    }
    if let Some(status) = HidStatus::decode(&frame.bytes) {
        println!(
            "              c_stick=({:#05X}, {:#05X}) zl={} zr={} battery={:#04X}",
            status.c_stick_x,
            status.c_stick_y,
            if status.zl_pressed() { "down" } else { "up" },
            if status.zr_pressed() { "down" } else { "up" },
            status.battery,
        );
    }
}

fn run(args: &Args) -> Result<(), AppError> {
    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let device_config = config::load_from_file(&config_path);
    if args.save_config {
        config::save_to_file(&config_path, &device_config)?;
    }

    let text = std::fs::read_to_string(&args.script).map_err(|source| AppError::ReadScript {
        path: args.script.clone(),
        source,
    })?;
    let commands = script::parse_script(&text)?;

    let mut host = Host::new(&device_config, args.tick_ms);
    for command in &commands {
        host.execute(command);
        for frame in host.take_output() {
            print_frame(&frame, args.decode);
        }
    }

    log::info!(
        "Finished at cycle {} (period {:?} ms)",
        host.now(),
        host.device().period_ms()
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
