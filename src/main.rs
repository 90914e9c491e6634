// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026  Bartek Kus
// Feature: TMSYNC_CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Target;
use serde::Serialize;
use std::path::{Path, PathBuf};
use syncscan::Scanner;
use tmsync::config::TmsyncConfig;
use tmsync::report::{self, TestDigest};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to tmsync.yaml (defaults to ./tmsync.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify every documented test under ROOT against its stored mapping
    Scan {
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Glob of test files to include; repeatable, replaces configured patterns
        #[arg(long = "pattern")]
        patterns: Vec<String>,
        /// Output results in JSON
        #[arg(long)]
        json: bool,
        /// Also write the JSON scan document to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check documentation rules for every test under ROOT
    Validate {
        #[arg(default_value = ".")]
        root: PathBuf,
        #[arg(long = "pattern")]
        patterns: Vec<String>,
        #[arg(long)]
        json: bool,
        /// Exit non-zero if any test has an error
        #[arg(long)]
        fail_on_error: bool,
    },
    /// Print the structured tests extracted from FILE as JSON
    Parse { file: PathBuf },
    /// Print the content digest of every test in FILE
    Fingerprint {
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

// stdout carries reports only; logs go to stderr.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(Target::Stderr)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config = TmsyncConfig::load(cli.config.as_deref())?;
    let parser = config.test_parser()?;

    let success = match cli.command {
        Commands::Scan {
            root,
            patterns,
            json,
            output,
        } => {
            let scanner = Scanner::with_json_store(parser, config.validator_config()?);
            let result = scanner
                .scan_directory(&root, &effective_patterns(&config, patterns))
                .with_context(|| format!("Failed to scan {}", root.display()))?;
            if let Some(path) = &output {
                write_json(path, &result)?;
                log::info!("Wrote scan report to {}", path.display());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render_scan(&result));
            }
            true
        }
        Commands::Validate {
            root,
            patterns,
            json,
            fail_on_error,
        } => {
            let scanner = Scanner::with_json_store(parser, config.validator_config()?);
            let validation = scanner
                .validate_directory(&root, &effective_patterns(&config, patterns))
                .with_context(|| format!("Failed to validate {}", root.display()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&validation)?);
            } else {
                print!("{}", report::render_validation(&validation));
            }
            !(fail_on_error && validation.failed_tests > 0)
        }
        Commands::Parse { file } => {
            let tests = parser
                .parse_file(&file)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&tests)?);
            true
        }
        Commands::Fingerprint { file, json } => {
            let tests = parser
                .parse_file(&file)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            let digests: Vec<TestDigest> = tests.iter().map(TestDigest::of).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&digests)?);
            } else {
                print!("{}", report::render_digests(&digests));
            }
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn effective_patterns(config: &TmsyncConfig, cli_patterns: Vec<String>) -> Vec<String> {
    if cli_patterns.is_empty() {
        config.file_patterns.clone()
    } else {
        cli_patterns
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    std::fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))
}
