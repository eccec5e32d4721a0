// ncx-cli/src/report.rs

//! Console output: the captured streams, then the explanation.

use anyhow::Error;
use colored::*;
use ncx_core::{CapturedRun, ProxyError};
use std::io::{self, Write};
use termimad::MadSkin;
use tracing::warn;

/// Writes the captured bytes unchanged, adding a single newline if they lack one.
///
/// No decoding happens here: binary output reaches the terminal byte for byte.
pub fn echo_stream<W: Write>(writer: &mut W, bytes: &[u8]) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(());
    }
    writer.write_all(bytes)?;
    if bytes.last() != Some(&b'\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Echoes captured stdout to stdout and captured stderr to stderr.
pub fn echo_captured(run: &CapturedRun) {
    if let Err(e) = echo_stream(&mut io::stdout().lock(), &run.stdout) {
        warn!(error = %e, "Failed to echo captured stdout");
    }
    if let Err(e) = echo_stream(&mut io::stderr().lock(), &run.stderr) {
        warn!(error = %e, "Failed to echo captured stderr");
    }
}

pub fn banner(model: &str) -> String {
    format!("=== AI EXPLANATION ({}) ===", model)
}

/// Prints the banner and the explanation. Markdown is rendered only for terminals.
pub fn print_explanation<W: Write>(
    writer: &mut W,
    model: &str,
    explanation: &str,
    render_markdown: bool,
) -> io::Result<()> {
    writeln!(writer, "\n{}\n", banner(model).cyan().bold())?;
    let text = explanation.trim();
    if render_markdown {
        let skin = MadSkin::default();
        write!(writer, "{}", skin.term_text(text))?;
    } else {
        writeln!(writer, "{}", text)?;
    }
    writer.flush()
}

/// Non-fatal notice for a failed interpretation step.
pub fn print_explanation_failure<W: Write>(writer: &mut W, err: &Error) -> io::Result<()> {
    writeln!(
        writer,
        "{} AI explanation failed: {:#}",
        "[ncx]".yellow().bold(),
        err
    )?;
    writer.flush()
}

/// Fatal notice for a tool that could not be run, with guidance for resolution failures.
pub fn print_proxy_failure<W: Write>(
    writer: &mut W,
    err: &ProxyError,
    override_var: &str,
) -> io::Result<()> {
    writeln!(writer, "{} {}", "[ncx]".red().bold(), err)?;
    if err.is_resolution_failure() {
        writeln!(
            writer,
            "{} Set {} to your real nc binary, e.g.:\n  export {}=/usr/bin/nc",
            "[ncx]".red().bold(),
            override_var,
            override_var
        )?;
    }
    writer.flush()
}

/// Exit status for a run that produced a child. Shell semantics: only the low 8 bits survive.
pub fn child_exit_status(run: &CapturedRun) -> u8 {
    (run.exit_code & 0xff) as u8
}
