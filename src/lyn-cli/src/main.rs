/* SPDX-FileCopyrightText: © 2025-2026 lyn contributors */
/* SPDX-License-Identifier: MIT */

use std::fs;
use std::process::ExitCode;

use lyn::{link, LinkOptions, LynError, NamedElf};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(script) => {
            print!("{script}");
            ExitCode::SUCCESS
        }
        Err(msg) => {
            eprintln!("[lyn] ERROR: {msg}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<String, String> {
    let (paths, options) = parse_args(args)?;
    if paths.is_empty() {
        return Err("no input ELF files given".to_string());
    }

    let mut inputs = Vec::with_capacity(paths.len());
    for path in &paths {
        let bytes = fs::read(path).map_err(|e| LynError::from(e).to_string())?;
        eprintln!("[lyn] loaded {path}");
        inputs.push(NamedElf::new(path.clone(), bytes));
    }

    link(&inputs, options).map_err(|e| e.to_string())
}

/// Parses the single-dash toggle pairs this CLI uses instead of a
/// `--flag=value` argument crate — every flag is a standalone on/off
/// switch, which a general-purpose parser would only add ceremony around.
fn parse_args(args: &[String]) -> Result<(Vec<String>, LinkOptions), String> {
    let mut options = LinkOptions::default();
    let mut paths = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-link" => options = options.with_link(true),
            "-nolink" => options = options.with_link(false),
            "-longcalls" => options = options.with_longcalls(true),
            "-nolongcalls" => options = options.with_longcalls(false),
            "-hook" => options = options.with_hook(true),
            "-nohook" => options = options.with_hook(false),
            "-temp" => options = options.with_temp(true),
            "-notemp" => options = options.with_temp(false),
            "-raw" => options = LinkOptions::raw(),
            other if other.starts_with('-') => {
                return Err(format!("unrecognized option '{other}'"));
            }
            path => paths.push(path.to_string()),
        }
    }

    Ok((paths, options))
}
