use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use extport_core::{init_tracing, init_tracing_with, ClassParser, FileRewriter, RewriteConfig, RewriteSummary};
use tracing::debug;

fn cli() -> Command {
    Command::new("extport")
        .version(extport_core::VERSION)
        .about("Rewrite Ext JS class-system dependencies into require/import statements")
        .arg(
            Arg::new("input")
                .value_name("INPUT")
                .help("Source files or directories to rewrite")
                .value_parser(clap::value_parser!(PathBuf))
                .num_args(1..)
                .required(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("out")
                .long("out")
                .short('o')
                .value_name("PATH")
                .help("Output file, or output directory for directory inputs")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("in-place")
                .long("in-place")
                .help("Overwrite the inputs")
                .action(ArgAction::SetTrue)
                .conflicts_with("out"),
        )
        .arg(
            Arg::new("imports")
                .long("imports")
                .help("Emit import statements instead of require calls")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cache-dir")
                .long("cache-dir")
                .value_name("DIR")
                .help("Directory for the parsed tree cache")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("no-cache")
                .long("no-cache")
                .help("Disable the parsed tree cache")
                .action(ArgAction::SetTrue)
                .conflicts_with("cache-dir"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

/// Configuration file overlaid with command-line overrides
fn load_config(matches: &ArgMatches) -> Result<RewriteConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => RewriteConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => RewriteConfig::default(),
    };

    if matches.get_flag("imports") {
        config.emit_import_statements = true;
    }
    if let Some(dir) = matches.get_one::<PathBuf>("cache-dir") {
        config.cache_directory = Some(dir.clone());
    }
    if matches.get_flag("no-cache") {
        config.cache_directory = None;
    }
    Ok(config)
}

fn run(matches: &ArgMatches) -> Result<RewriteSummary> {
    let config = load_config(matches)?;
    debug!(?config, "Loaded configuration");

    let parser = ClassParser::new(&config)?;
    let rewriter = FileRewriter::new(parser).source_extensions(config.extensions.iter().cloned());

    let inputs: Vec<&PathBuf> = matches
        .get_many::<PathBuf>("input")
        .map(Iterator::collect)
        .unwrap_or_default();
    let out = matches.get_one::<PathBuf>("out");
    let in_place = matches.get_flag("in-place");

    let mut summary = RewriteSummary::new();
    for input in &inputs {
        let result = if in_place {
            rewriter.rewrite_in_place(input)
        } else if let Some(out) = out {
            rewrite_to(&rewriter, input, out, inputs.len() > 1)
        } else {
            rewrite_to_stdout(&rewriter, input)
        };

        match result {
            Ok(file_summary) => summary.merge(file_summary),
            Err(e) => {
                summary.files_processed += 1;
                summary.errors.push(format!("{e:#}"));
            }
        }
    }

    debug!(stats = ?rewriter.parser().cache_stats(), "Tree cache");
    Ok(summary)
}

fn rewrite_to(rewriter: &FileRewriter, input: &Path, out: &Path, many: bool) -> Result<RewriteSummary> {
    if input.is_dir() {
        return rewriter.rewrite_directory(input, out);
    }
    let target = match input.file_name() {
        Some(name) if many || out.is_dir() => out.join(name),
        _ => out.to_path_buf(),
    };
    rewriter.rewrite_file(input, target)
}

fn rewrite_to_stdout(rewriter: &FileRewriter, input: &Path) -> Result<RewriteSummary> {
    if input.is_dir() {
        bail!("{} is a directory; use --out or --in-place", input.display());
    }
    let original = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let rewritten = rewriter
        .parser()
        .parse(&original)
        .with_context(|| format!("Failed to rewrite {}", input.display()))?;
    io::stdout().write_all(rewritten.as_bytes())?;

    Ok(RewriteSummary {
        files_processed: 1,
        files_rewritten: u64::from(rewritten != original),
        errors: Vec::new(),
    })
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    if matches.get_flag("debug") {
        init_tracing_with("extport_core=debug,extport=debug");
    } else {
        init_tracing();
    }

    match run(&matches) {
        Ok(summary) if summary.success() => ExitCode::SUCCESS,
        Ok(summary) => {
            for error in &summary.errors {
                eprintln!("error: {error}");
            }
            eprintln!(
                "{} of {} files failed",
                summary.errors.len(),
                summary.files_processed
            );
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
