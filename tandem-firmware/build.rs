//! Build script for tandem-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates board.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

const DEVICES: [&str; 2] = ["console", "amplifier"];

fn main() {
    setup_linker();
    validate_board();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate board.toml at compile time
///
/// The firmware falls back to a built-in board if this file is broken, so
/// catching mistakes here keeps the fallback from masking them.
fn validate_board() {
    println!("cargo:rerun-if-changed=board.toml");

    let board_path = Path::new("board.toml");

    if !board_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: board.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a board.toml file describing the bridge.  ║\n\
            ║  Please create one in the tandem-firmware directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(board_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read board.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let board: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in board.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();
    let mut pins: Vec<(u64, String)> = Vec::new();

    for device in DEVICES {
        validate_device(&board, device, &mut errors, &mut pins);
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid board.toml                                       ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=board.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn validate_device(
    board: &toml::Value,
    device: &str,
    errors: &mut Vec<String>,
    pins: &mut Vec<(u64, String)>,
) {
    let table = match board.get(device) {
        Some(toml::Value::Table(t)) => t,
        Some(_) => {
            errors.push(format!("[{}] must be a table", device));
            return;
        }
        None => {
            errors.push(format!("Missing [{}] section", device));
            return;
        }
    };

    for key in ["tx", "rx"] {
        match table.get(key).and_then(|v| v.as_str()) {
            Some(value) => claim_pin(value, &format!("{}.{}", device, key), errors, pins),
            None => errors.push(format!("[{}] missing '{}' pin", device, key)),
        }
    }

    if let Some(toml::Value::Table(proxies)) = table.get("proxy") {
        for (name, proxy) in proxies {
            for key in ["source", "target"] {
                match proxy.get(key).and_then(|v| v.as_str()) {
                    Some(value) => claim_pin(
                        value,
                        &format!("{}.proxy.{}.{}", device, name, key),
                        errors,
                        pins,
                    ),
                    None => errors.push(format!("[{}.proxy.{}] missing '{}'", device, name, key)),
                }
            }

            if let Some(target) = proxy.get("sequences").and_then(|v| v.as_str()) {
                if !DEVICES.contains(&target) {
                    errors.push(format!("[{}.proxy.{}] unknown device '{}'", device, name, target));
                } else if target == device {
                    errors.push(format!("[{}.proxy.{}] sequences its own device", device, name));
                }
            }
        }
    }

    if let Some(toml::Value::Table(monitors)) = table.get("monitor") {
        for (name, monitor) in monitors {
            match monitor.get("pin").and_then(|v| v.as_str()) {
                Some(value) => claim_pin(
                    value,
                    &format!("{}.monitor.{}.pin", device, name),
                    errors,
                    pins,
                ),
                None => errors.push(format!("[{}.monitor.{}] missing 'pin'", device, name)),
            }
        }
    }
}

/// Record a "gpioN" pin, reporting bad syntax and double use
fn claim_pin(value: &str, owner: &str, errors: &mut Vec<String>, pins: &mut Vec<(u64, String)>) {
    let number = value
        .trim_start_matches(['!', '^'])
        .strip_prefix("gpio")
        .and_then(|n| n.parse::<u64>().ok());

    let Some(number) = number else {
        errors.push(format!("{}: invalid pin '{}'", owner, value));
        return;
    };

    if number >= 30 {
        errors.push(format!("{}: gpio{} does not exist", owner, number));
    }

    if let Some((_, first)) = pins.iter().find(|(n, _)| *n == number) {
        errors.push(format!("gpio{} used by {} and {}", number, first, owner));
    } else {
        pins.push((number, owner.to_string()));
    }
}
