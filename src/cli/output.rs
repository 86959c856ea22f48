//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, ready
//! - Red: errors
//! - Yellow: warnings, skipped passes
//! - Cyan: ids, paths, hints
//! - Dimmed: secondary info
//!
//! Machine-readable output (JSON manifests, sealed values) goes through
//! [`json`] and [`raw`] so it is never decorated.

use std::fmt::Display;

use console::{style, StyledObject};
use serde::Serialize;

use crate::error::Result;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn paint<D: Display>(value: D, f: impl FnOnce(StyledObject<D>) -> StyledObject<D>) -> String {
    if colors_enabled() {
        f(style(value)).to_string()
    } else {
        value.to_string()
    }
}

/// Print a success message with checkmark.
///
/// Example: `✓ applied EncryptedSecret default/db`
pub fn success(msg: &str) {
    println!("{} {}", paint("✓", |s| s.green()), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", paint("✗", |s| s.red()), msg);
}

/// Print a warning message to stderr.
pub fn warn(msg: &str) {
    eprintln!("{} {}", paint("⚠", |s| s.yellow()), msg);
}

/// Print a hint message to stderr.
///
/// Example: `→ export CRYPTCTL_PASSPHRASE`
pub fn hint(msg: &str) {
    eprintln!("{} {}", paint("→", |s| s.cyan()), paint(msg, |s| s.cyan()));
}

/// Print a key-value pair (label dimmed, value bold).
pub fn kv(label: &str, value: impl Display) {
    println!(
        "  {}  {}",
        paint(format!("{:<12}", label), |s| s.dim()),
        paint(value.to_string(), |s| s.bold())
    );
}

/// Format a resource id or field name in cyan.
pub fn key(k: impl Display) -> String {
    paint(k.to_string(), |s| s.cyan())
}

/// Format a status word: green for ready, red for error, yellow otherwise.
pub fn state(word: &str) -> String {
    match word.to_ascii_lowercase().as_str() {
        "ready" => paint(word, |s| s.green()),
        "error" => paint(word, |s| s.red()),
        _ => paint(word, |s| s.yellow()),
    }
}

/// Print a dimmed/secondary message.
pub fn dimmed(msg: &str) {
    println!("{}", paint(msg, |s| s.dim()));
}

/// Print a value as pretty JSON on stdout.
pub fn json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an undecorated line on stdout.
pub fn raw(line: &str) {
    println!("{}", line);
}
