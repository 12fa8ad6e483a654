//! Crash reports: a timestamped text file with the panic message, crate
//! version, platform and a backtrace.

use std::backtrace::Backtrace;
use std::fmt::Write as _;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};

use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing::error;

const FILE_STAMP: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
const HEADER_STAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");

/// Renders the report body.
pub fn render_report(message: &str, backtrace: &str, at: OffsetDateTime) -> String {
    let mut out = String::new();
    let stamp = at.format(HEADER_STAMP).unwrap_or_else(|_| at.unix_timestamp().to_string());
    let _ = writeln!(out, "{} {} crashed at {stamp}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    let _ = writeln!(
        out,
        "platform: {} / {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH,
        std::env::consts::FAMILY
    );
    let _ = writeln!(out, "\n{message}\n");
    let _ = writeln!(out, "backtrace:\n{backtrace}");
    out
}

/// Writes `crash-<timestamp>.txt` into `dir` and returns its path.
pub fn write_report(dir: &Path, message: &str, backtrace: &str) -> io::Result<PathBuf> {
    let now = OffsetDateTime::now_utc();
    let stamp = now
        .format(FILE_STAMP)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("crash-{stamp}.txt"));
    std::fs::write(&path, render_report(message, backtrace, now))?;
    Ok(path)
}

/// Chains a hook that writes a crash report before the default panic output.
pub fn install_panic_hook(dir: impl Into<PathBuf>) {
    let dir = dir.into();
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::force_capture().to_string();
        match write_report(&dir, &info.to_string(), &backtrace) {
            Ok(path) => error!(path = %path.display(), "Crash report written"),
            Err(e) => error!(error = %e, "Failed to write crash report"),
        }
        previous(info);
    }));
}
