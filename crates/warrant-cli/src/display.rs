//! Display utilities for the CLI

use colored::*;
use warrant_audit::AuditEntry;

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", "━".repeat(60).bright_black());
    println!(" {}", title.bright_white().bold());
    println!("{}", "━".repeat(60).bright_black());
}

pub fn success(message: &str) {
    println!("  {} {}", "✓".bright_green(), message);
}

/// Print an expected rejection
pub fn rejected(message: &str) {
    println!("  {} {}", "✗".bright_red(), message.bright_red());
}

pub fn info(message: &str) {
    println!("  {} {}", "→".bright_blue(), message);
}

pub fn kv(key: &str, value: &str) {
    println!("      {}: {}", key, value.bright_cyan());
}

/// Print the audit trail one line per entry
pub fn trail(entries: &[AuditEntry]) {
    section("Audit trail");
    for entry in entries {
        println!(
            "  {:>3} {} {:<18} {}",
            entry.sequence.to_string().bright_black(),
            entry.hash.get(..12).unwrap_or(&entry.hash).bright_black(),
            entry.event.name().bright_white(),
            entry.recorded_at.format("%H:%M:%S%.3f"),
        );
    }
}
