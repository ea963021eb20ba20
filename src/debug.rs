//! Bring-up subcommands: raw dump, reset, end-to-end test and module info.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use hwid_lib::HwidFields;
use hwid_lib::constants::EEPROM_ROW;

use crate::{Session, check, exit_code};

#[derive(Subcommand, Debug)]
pub enum DebugCommand {
    /// Dump COUNT bytes from the start of the EEPROM.
    Read { count: usize },
    /// Overwrite COUNT rows of 16 bytes with BYTE, starting at OFFSET.
    EepromReset {
        /// Start offset (hex)
        #[arg(value_parser = parse_hex_u32)]
        offset: u32,
        /// Fill byte (hex)
        #[arg(value_parser = parse_hex_u8)]
        byte: u8,
        /// Number of rows
        count: usize,
    },
    /// Erase, flash a reference header and check it back. Destroys EEPROM contents.
    E2e {
        /// Do not ask for confirmation.
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the module constants.
    Info,
}

fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hex value '{}': {}", s, e))
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("{:#x} does not fit in a byte", value))
}

fn reference_fields() -> HwidFields {
    HwidFields {
        major: 1,
        minor: 3,
        patch: 0,
        art_nr: 888053501,
        lot: 103,
        lotseq: 1,
        proddate: "2022-01-01".to_string(),
        flashdate: "19/20".to_string(),
        flashuser: "sdu".to_string(),
        uid: "1804270009737".to_string(),
    }
}

/// Hex dump with a 16-byte row and a four digit offset column.
fn format_dump(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (row, chunk) in bytes.chunks(EEPROM_ROW).enumerate() {
        out.push_str(&format!("{:04x}  ", row * EEPROM_ROW));
        let cells: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        out.push_str(&cells.join(" "));
        out.push('\n');
    }
    out
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} (yN) ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y"))
}

pub fn run(
    hwid: &mut Session,
    command: DebugCommand,
    env_out: Option<&PathBuf>,
) -> Result<ExitCode> {
    match command {
        DebugCommand::Read { count } => {
            let bytes = hwid.dump(count).context("Error reading from eeprom")?;
            print!("{}", format_dump(&bytes));
            info!("finished reading raw content from EEPROM");
        }
        DebugCommand::EepromReset { offset, byte, count } => {
            hwid.fill_rows(offset, byte, count).context("EEPROM reset failed")?;
            info!("Reset {} rows at {:#06x} to {:#04x}", count, offset, byte);
        }
        DebugCommand::E2e { yes } => {
            if !yes && !confirm("Reset EEPROM?")? {
                bail!("aborted");
            }
            info!("RESETTING EEPROM");
            hwid.fill_rows(0, 0xFF, 4).context("E2E reset step failed")?;

            info!("READING EEPROM");
            let bytes = hwid.dump(32).context("E2E read step failed")?;
            print!("{}", format_dump(&bytes));

            info!("FLASH HEADER");
            hwid.write_fields(&reference_fields())
                .context("E2E flash step failed")?;

            info!("CHECKING VALIDITY OF EEPROM CONTENT");
            return check(hwid, env_out).map(exit_code);
        }
        DebugCommand::Info => {
            println!("Information about this module:");
            println!("{}", hwid.info());
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex_u32("0"), Ok(0));
        assert_eq!(parse_hex_u32("0x40"), Ok(0x40));
        assert_eq!(parse_hex_u8("ff"), Ok(0xFF));
        assert!(parse_hex_u8("100").is_err());
        assert!(parse_hex_u32("zz").is_err());
    }

    #[test]
    fn test_format_dump() {
        let bytes: Vec<u8> = (0u8..20).collect();
        let dump = format_dump(&bytes);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0000  00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f");
        assert_eq!(lines[1], "0010  10 11 12 13");
    }
}
