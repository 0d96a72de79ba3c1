//! Subcommand implementations.

pub mod catalog;
pub mod ops;
pub mod register;
pub mod shop;

use std::io::Write as _;

use pagermart_client::{Severity, Shop};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Print and clear whatever the last operation left in the notification
/// slot. Every command calls this after each store operation so outcomes
/// reach the terminal exactly once.
pub fn drain_notification(shop: &Shop) {
    let Some(note) = shop.notifications().current() else {
        return;
    };
    let tag = match note.severity {
        Severity::Success => "ok",
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    };
    println!("[{tag}] {}", note.message);
    shop.notifications().dismiss();
}

/// Read the account secret from `PAGERMART_PASSWORD`, or prompt for it.
///
/// The prompt echoes; pass the variable in scripts and CI.
pub async fn obtain_secret(prompt: &str) -> std::io::Result<String> {
    if let Ok(secret) = std::env::var("PAGERMART_PASSWORD") {
        return Ok(secret);
    }
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}
