use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use intake_ingest::{ExtractionResult, IngestError};
use owo_colors::OwoColorize;
use serde_json::json;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// What happened to one input file.
#[derive(Debug)]
pub enum FileOutcome {
    Finished(Result<ExtractionResult, IngestError>),
    TimedOut(Duration),
    /// The worker panicked or was cancelled.
    Crashed(String),
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Finished(Ok(_)))
    }

    fn error_message(&self) -> Option<String> {
        match self {
            FileOutcome::Finished(Ok(_)) => None,
            FileOutcome::Finished(Err(e)) => Some(e.to_string()),
            FileOutcome::TimedOut(limit) => {
                Some(format!("Timed out after {} seconds", limit.as_secs()))
            }
            FileOutcome::Crashed(msg) => Some(format!("Internal error: {}", msg)),
        }
    }

    /// HTTP-style status a service front end would answer with.
    fn status_code(&self) -> u16 {
        match self {
            FileOutcome::Finished(Ok(_)) => 200,
            FileOutcome::Finished(Err(e)) => e.error_class().status_code(),
            FileOutcome::TimedOut(_) => 504,
            FileOutcome::Crashed(_) => 500,
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Print one line per file, then a summary.
pub fn print_outcomes(
    w: &mut dyn Write,
    outcomes: &[(PathBuf, FileOutcome)],
    color: ColorMode,
) -> std::io::Result<()> {
    for (path, outcome) in outcomes {
        let name = display_name(path);
        match outcome {
            FileOutcome::Finished(Ok(result)) => {
                if color.enabled() {
                    writeln!(w, "{} {}", name.bold(), "OK".green())?;
                } else {
                    writeln!(w, "{} OK", name)?;
                }
                writeln!(w, "  First name:    {}", result.first_name)?;
                writeln!(w, "  Last name:     {}", result.last_name)?;
                writeln!(w, "  Date of birth: {}", result.date_of_birth)?;
            }
            failed => {
                let msg = failed.error_message().unwrap_or_default();
                if color.enabled() {
                    writeln!(w, "{} {}", name.bold(), "FAILED".red())?;
                    writeln!(w, "  {}", msg.dimmed())?;
                } else {
                    writeln!(w, "{} FAILED", name)?;
                    writeln!(w, "  {}", msg)?;
                }
            }
        }
    }

    let ok = outcomes.iter().filter(|(_, o)| o.is_success()).count();
    let failed = outcomes.len() - ok;
    writeln!(w)?;
    if color.enabled() {
        write!(w, "{} {}", "Extracted:".green(), ok)?;
        if failed > 0 {
            write!(w, "  {} {}", "Failed:".red(), failed)?;
        }
        writeln!(w)?;
    } else if failed > 0 {
        writeln!(w, "Extracted: {}  Failed: {}", ok, failed)?;
    } else {
        writeln!(w, "Extracted: {}", ok)?;
    }
    Ok(())
}

/// Print all outcomes as one JSON array.
pub fn print_json(w: &mut dyn Write, outcomes: &[(PathBuf, FileOutcome)]) -> anyhow::Result<()> {
    let entries: Vec<serde_json::Value> = outcomes
        .iter()
        .map(|(path, outcome)| match outcome {
            FileOutcome::Finished(Ok(result)) => json!({
                "file": path.display().to_string(),
                "status": outcome.status_code(),
                "result": result,
            }),
            failed => json!({
                "file": path.display().to_string(),
                "status": failed.status_code(),
                "error": failed.error_message(),
            }),
        })
        .collect();
    serde_json::to_writer_pretty(&mut *w, &entries)?;
    writeln!(w)?;
    Ok(())
}

/// Print per-page text with a header line per page.
pub fn print_page_texts(
    w: &mut dyn Write,
    pages: &[Option<String>],
    color: ColorMode,
) -> std::io::Result<()> {
    for (i, page) in pages.iter().enumerate() {
        let header = format!("--- Page {} ---", i + 1);
        if color.enabled() {
            writeln!(w, "{}", header.bold().cyan())?;
        } else {
            writeln!(w, "{}", header)?;
        }
        match page {
            Some(text) => writeln!(w, "{}", text.trim_end())?,
            None if color.enabled() => writeln!(w, "{}", "(no text)".dimmed())?,
            None => writeln!(w, "(no text)")?,
        }
    }
    Ok(())
}
