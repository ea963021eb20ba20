use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use hwid_lib::constants::{DEFAULT_EEPROM_ADDRESS, HWID_EEPROM_BUS};
use hwid_lib::{CheckOutcome, FileEeprom, HwidEeprom, HwidFields, StdDelay};

#[cfg(feature = "debug-tools")]
mod debug;

pub(crate) type Session = HwidEeprom<FileEeprom, StdDelay>;

/// Read, check and flash the byteDEVKIT HWID EEPROM.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// EEPROM node or image file. Defaults to the at24 sysfs node of the HWID EEPROM.
    #[arg(short, long, global = true)]
    device: Option<PathBuf>,
    /// 7-bit I2C address of the EEPROM (hex with 0x prefix, or decimal).
    #[arg(short, long, global = true, default_value = "0x50", value_parser = parse_address)]
    address: u8,
    /// Also write exported variables to this file as name=value lines.
    #[arg(long, global = true)]
    env_out: Option<PathBuf>,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the EEPROM contents and export board_header/major/minor/patch.
    Check,
    /// Print production data.
    ProdData {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Write a new header into the HWID EEPROM.
    Set(SetArgs),
    #[cfg(feature = "debug-tools")]
    #[command(flatten)]
    Debug(debug::DebugCommand),
}

#[derive(clap::Args, Debug)]
struct SetArgs {
    major: u8,
    minor: u8,
    patch: u8,
    art_nr: u32,
    lot: u32,
    lotseq: u8,
    proddate: String,
    flashdate: String,
    flashuser: String,
    uid: String,
}

impl From<SetArgs> for HwidFields {
    fn from(args: SetArgs) -> Self {
        HwidFields {
            major: args.major,
            minor: args.minor,
            patch: args.patch,
            art_nr: args.art_nr,
            lot: args.lot,
            lotseq: args.lotseq,
            proddate: args.proddate,
            flashdate: args.flashdate,
            flashuser: args.flashuser,
            uid: args.uid,
        }
    }
}

fn parse_address(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    match parsed {
        Ok(address) if address < 0x80 => Ok(address),
        Ok(address) => Err(format!("{:#x} is not a 7-bit I2C address", address)),
        Err(e) => Err(format!("invalid address '{}': {}", s, e)),
    }
}

fn setup_logging(
    log_file_path: Option<PathBuf>,
    verbosity: &Verbosity<InfoLevel>,
) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file = File::create(path)
            .with_context(|| format!("Failed to create log file at: {:?}", path))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = match setup_logging(cli.log_file.clone(), &cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{:?}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn open_session(device: Option<&Path>, address: u8) -> Session {
    let eeprom = match device {
        Some(path) => FileEeprom::new(path, address),
        None => FileEeprom::sysfs(HWID_EEPROM_BUS, address),
    };
    let hwid = HwidEeprom::new(eeprom, StdDelay, address);
    info!(
        "Using HWID EEPROM {} at {:#04x}",
        hwid.eeprom().path().display(),
        hwid.address()
    );
    hwid
}

pub(crate) fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.address != DEFAULT_EEPROM_ADDRESS {
        warn!("Non-default EEPROM address {:#04x}", cli.address);
    }
    let mut hwid = open_session(cli.device.as_deref(), cli.address);

    match cli.command {
        Command::Check => check(&mut hwid, cli.env_out.as_ref()).map(exit_code),
        Command::ProdData { json } => prod_data(&mut hwid, json).map(exit_code),
        Command::Set(args) => {
            hwid.write_fields(&HwidFields::from(args))
                .context("Failed to flash HWID EEPROM")?;
            println!("HWID EEPROM was flashed successfully");
            Ok(ExitCode::SUCCESS)
        }
        #[cfg(feature = "debug-tools")]
        Command::Debug(command) => debug::run(&mut hwid, command, cli.env_out.as_ref()),
    }
}

/// Check the EEPROM and export the board version. Returns `false` when the
/// part answered but its record was rejected.
pub(crate) fn check(hwid: &mut Session, env_out: Option<&PathBuf>) -> Result<bool> {
    let mut env = BTreeMap::new();
    match hwid.check_and_export(&mut env) {
        Ok(outcome) => {
            if outcome == CheckOutcome::Legacy {
                info!("No HWID EEPROM, exporting defaults for byteDEVKIT 1.2");
            }
            info!("Board version: {}", outcome.board_version());
            for (name, value) in &env {
                println!("{}={}", name, value);
            }
            if let Some(path) = env_out {
                write_env(path, &env)?;
            }
            Ok(true)
        }
        Err(e) => {
            error!("error checking header: {}", e);
            Ok(false)
        }
    }
}

/// Print production data. Returns `false` when the record failed validation.
fn prod_data(hwid: &mut Session, json: bool) -> Result<bool> {
    let (data, warning) = hwid.production_data().context("Failed to read HWID EEPROM")?;
    if let Some(ref e) = warning {
        warn!("WARNING: error checking header: {}", e);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("\tPRODUCTION DATA");
        println!("{}", data);
    }

    Ok(warning.is_none())
}

fn write_env(path: &PathBuf, env: &BTreeMap<String, String>) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("Failed to create {:?}", path))?;
    for (name, value) in env {
        writeln!(file, "{}={}", name, value)?;
    }
    info!("Wrote {} variables to {:?}", env.len(), path);
    Ok(())
}
