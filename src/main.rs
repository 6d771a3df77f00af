//! PDF De-identification Tool - Command-Line Interface
//!
//! Runs the de-identification pipeline on one PDF with the built-in rule
//! classifier and writes the redacted document and an optional JSON report.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Arg, ArgAction, ArgMatches, Command};
use pdx_deid::config::ProcessingConfig;
use pdx_deid::redaction::builtin_rule_names;
use pdx_deid::{Logger, Pipeline, RuleClassifier};
use tracing::{error, info};
use uuid::Uuid;

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let mut config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let level = matches
        .get_one::<String>("verbose")
        .cloned()
        .unwrap_or_else(|| config.logging.level.clone());
    if let Err(e) = Logger::with_level(&level).init() {
        eprintln!("{}", e);
        process::exit(1);
    }

    if let Err(e) = run(&matches, &mut config).await {
        error!("De-identification failed: {}", e);
        process::exit(1);
    }
}

async fn run(matches: &ArgMatches, config: &mut ProcessingConfig) -> Result<(), String> {
    let input_path = PathBuf::from(required(matches, "input")?);
    let output_path = PathBuf::from(required(matches, "output")?);
    let report_path = matches.get_one::<String>("report").map(PathBuf::from);
    let force = matches.get_flag("force");

    if !input_path.exists() {
        return Err(format!("Input file does not exist: {}", input_path.display()));
    }
    for target in std::iter::once(&output_path).chain(report_path.as_ref()) {
        if target.exists() && !force {
            return Err(format!(
                "Output file already exists: {} (use --force to overwrite)",
                target.display()
            ));
        }
    }

    if let Some(lexicon) = matches.get_one::<String>("lexicon") {
        config.classifier.lexicon_path = Some(PathBuf::from(lexicon));
    }
    if let Some(rules) = matches.get_many::<String>("rule") {
        config.classifier.rules = rules.cloned().collect();
    }

    let classifier = RuleClassifier::from_config(&config.classifier).map_err(|e| e.to_string())?;
    let pipeline = Pipeline::new(config.clone(), Arc::new(classifier)).map_err(|e| e.to_string())?;

    let bytes = fs::read(&input_path)
        .map_err(|e| format!("Failed to read {}: {}", input_path.display(), e))?;
    let document_id = input_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input_path.display().to_string());

    info!(input = %input_path.display(), "Starting de-identification");
    let outcome = pipeline
        .process_async(document_id, bytes)
        .await
        .map_err(|e| format!("{} ({})", e, e.kind()))?;

    let report_json = report_path
        .as_ref()
        .map(|_| outcome.report.to_json())
        .transpose()
        .map_err(|e| format!("Failed to encode report: {}", e))?;

    let mut outputs: Vec<(&Path, &[u8])> = vec![(output_path.as_path(), outcome.document.as_slice())];
    if let (Some(path), Some(json)) = (&report_path, &report_json) {
        outputs.push((path.as_path(), json.as_bytes()));
    }
    write_all_atomically(&outputs)?;

    info!(
        output = %output_path.display(),
        record_id = %outcome.report.record_id,
        redacted = outcome.report.redaction.tokens_redacted,
        "De-identification completed"
    );
    Ok(())
}

fn build_cli() -> Command {
    Command::new("pdx-deid")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Layout-preserving PDF de-identification")
        .long_about(
            "Extracts positioned text from a PDF, redacts PII in \"label - value\" field lines \
             and re-renders every span at its original position, font and color.",
        )
        // Input/Output
        .arg(Arg::new("input")
            .short('i')
            .long("input")
            .value_name("FILE")
            .help("Input PDF file path")
            .required(true))
        .arg(Arg::new("output")
            .short('o')
            .long("output")
            .value_name("FILE")
            .help("Output PDF file path")
            .required(true))
        .arg(Arg::new("report")
            .short('r')
            .long("report")
            .value_name("FILE")
            .help("Write a JSON de-identification report"))
        // Configuration
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .help("Configuration file (JSON/YAML)"))
        .arg(Arg::new("lexicon")
            .long("lexicon")
            .value_name("FILE")
            .help("Word list of tokens always treated as PII"))
        .arg(Arg::new("rule")
            .long("rule")
            .value_name("NAME")
            .action(ArgAction::Append)
            .value_parser(builtin_rule_names())
            .help("Built-in rule to enable, replaces the configured rules (repeatable)"))
        .arg(Arg::new("force")
            .short('f')
            .long("force")
            .action(ArgAction::SetTrue)
            .help("Overwrite existing output files"))
        // Logging
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .value_name("LEVEL")
            .value_parser(["error", "warn", "info", "debug", "trace"])
            .help("Logging verbosity, overrides the configured level"))
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a String, String> {
    matches
        .get_one::<String>(name)
        .ok_or_else(|| format!("Missing argument: {}", name))
}

fn load_config(matches: &ArgMatches) -> Result<ProcessingConfig, String> {
    match matches.get_one::<String>("config") {
        Some(path) => ProcessingConfig::from_file(path).map_err(|e| e.to_string()),
        None => Ok(ProcessingConfig::default()),
    }
}

/// Stages every file next to its target and renames them into place only once
/// all of them are written, so a failed write leaves no target touched
fn write_all_atomically(outputs: &[(&Path, &[u8])]) -> Result<(), String> {
    let mut staged: Vec<(PathBuf, &Path)> = Vec::with_capacity(outputs.len());
    for &(target, data) in outputs {
        match stage(target, data) {
            Ok(temp) => staged.push((temp, target)),
            Err(e) => {
                discard(&staged);
                return Err(e);
            }
        }
    }

    for (i, (temp, target)) in staged.iter().enumerate() {
        if let Err(e) = fs::rename(temp, target) {
            discard(&staged[i..]);
            return Err(format!("Failed to write {}: {}", target.display(), e));
        }
    }
    Ok(())
}

fn stage(target: &Path, data: &[u8]) -> Result<PathBuf, String> {
    let file_name = target
        .file_name()
        .ok_or_else(|| format!("Not a file path: {}", target.display()))?;
    let temp = target.with_file_name(format!(
        ".{}.{}.tmp",
        file_name.to_string_lossy(),
        Uuid::new_v4().simple()
    ));

    if let Err(e) = fs::write(&temp, data) {
        let _ = fs::remove_file(&temp);
        return Err(format!("Failed to write {}: {}", target.display(), e));
    }
    Ok(temp)
}

fn discard(staged: &[(PathBuf, &Path)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}
