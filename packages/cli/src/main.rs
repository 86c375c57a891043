#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the blood report parser.
//!
//! Runs the extraction pipeline on local files, lists the field rules, or
//! starts the upload server.

use std::path::{Path, PathBuf};

use blood_report::{ProcessedReport, persist};
use blood_report_models::{ClinicalRecord, Document, DocumentKind};
use blood_report_parser::capture;
use blood_report_parser::rules::field_rules;
use blood_report_server::ServerConfig;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "blood_report", about = "Blood report parsing tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a report file and print the clinical record as JSON
    Parse {
        /// Path to a PDF or plain text report
        path: PathBuf,
        /// Override the document kind derived from the file name (`pdf` or `text`)
        #[arg(long)]
        kind: Option<DocumentKind>,
        /// Also save the record as a timestamped JSON file in this directory
        #[arg(long)]
        save: Option<PathBuf>,
        /// Print the raw text each field pattern captured to stderr
        #[arg(long, short)]
        verbose: bool,
    },
    /// Print the text extracted from a report file
    Text {
        /// Path to a PDF or plain text report
        path: PathBuf,
        /// Override the document kind derived from the file name (`pdf` or `text`)
        #[arg(long)]
        kind: Option<DocumentKind>,
    },
    /// List the clinical fields and the patterns used to find them
    Fields,
    /// Start the upload server
    Serve {
        /// Address to bind (overrides `BIND_ADDR`)
        #[arg(long)]
        bind: Option<String>,
        /// Port to listen on (overrides `PORT`)
        #[arg(long)]
        port: Option<u16>,
        /// Directory parsed records are saved to (overrides `REPORT_OUTPUT_DIR`)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Prompt for the settings before starting
        #[arg(long)]
        interactive: bool,
    },
}

fn process_file(
    path: &Path,
    kind: Option<DocumentKind>,
) -> Result<ProcessedReport, Box<dyn std::error::Error>> {
    let kind = kind.unwrap_or_else(|| {
        DocumentKind::from_filename(&path.file_name().unwrap_or_default().to_string_lossy())
    });
    let bytes = std::fs::read(path)?;

    log::info!("Processing {} as {kind}", path.display());

    Ok(blood_report::process(&Document::new(&bytes, kind))?)
}

/// One line per field: the raw capture and whether it made it into the
/// record.
fn capture_lines(text: &str, record: &ClinicalRecord) -> Vec<String> {
    field_rules()
        .iter()
        .map(|rule| {
            let field = rule.field.as_ref();
            match capture(rule, text) {
                Some(raw) if record.has(rule.field) => format!("{field:<10} {raw:?}"),
                Some(raw) => format!("{field:<10} {raw:?} (not a valid value, skipped)"),
                None => format!("{field:<10} -"),
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            path,
            kind,
            save,
            verbose,
        } => {
            let report = process_file(&path, kind)?;
            if verbose {
                for line in capture_lines(&report.text, &report.record) {
                    eprintln!("{line}");
                }
            }
            println!("{}", serde_json::to_string_pretty(&report.record)?);

            if let Some(dir) = save {
                let saved = persist::save_record(&dir, &report.record, &chrono::Local::now())?;
                eprintln!("Saved to {}", saved.display());
            }
        }
        Commands::Text { path, kind } => {
            let report = process_file(&path, kind)?;
            println!("{}", report.text);
        }
        Commands::Fields => {
            println!("{:<10} {:<10} PATTERN", "FIELD", "KIND");
            println!("{}", "-".repeat(60));
            for rule in field_rules() {
                println!(
                    "{:<10} {:<10} {}",
                    rule.field.as_ref(),
                    rule.field.value_kind().as_ref(),
                    rule.pattern.as_str()
                );
                for category in &rule.categories {
                    println!("{:<21} {} -> {}", "", category.keyword, category.code);
                }
            }
        }
        Commands::Serve {
            bind,
            port,
            output_dir,
            interactive,
        } => {
            let env = ServerConfig::from_env();
            let config = ServerConfig {
                bind_addr: bind.unwrap_or(env.bind_addr),
                port: port.unwrap_or(env.port),
                output_dir: output_dir.unwrap_or(env.output_dir),
                ..env
            };

            actix_web::rt::System::new().block_on(async move {
                if interactive {
                    blood_report_server::interactive::run(config).await
                } else {
                    blood_report_server::run_server(config).await
                }
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_lines_show_raw_values_and_skips() {
        let text = "Age/Sex 99999999999999999999 Years/Male\nResting ECG Normal";
        let record = blood_report_parser::parse(text);
        let lines = capture_lines(text, &record);

        assert_eq!(lines.len(), 13);
        let overflowing = format!(
            "{:<10} {:?} (not a valid value, skipped)",
            "age", "99999999999999999999"
        );
        assert!(lines.contains(&overflowing), "{lines:#?}");
        assert!(lines.contains(&format!("{:<10} {:?}", "sex", "Male")), "{lines:#?}");
        assert!(lines.contains(&format!("{:<10} {:?}", "restecg", "Normal")), "{lines:#?}");
        assert!(lines.contains(&format!("{:<10} -", "thal")), "{lines:#?}");
    }
}
