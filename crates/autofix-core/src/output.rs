//! Operator-facing console output.
//!
//! Progress for the person at the terminal goes to stdout through these
//! helpers; diagnostics for developers go through `tracing` on stderr.

const RULE_WIDTH: usize = 80;

/// Print a section banner.
pub fn section(title: &str) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("  {title}");
    println!("{}\n", "=".repeat(RULE_WIDTH));
}

/// Print a thin separator with a heading, used above listings.
pub fn subsection(title: &str) {
    println!("\n{}", "─".repeat(RULE_WIDTH));
    println!("  {title}");
    println!("{}\n", "─".repeat(RULE_WIDTH));
}

pub fn success(message: &str) {
    println!("{message}");
}

pub fn info(message: &str) {
    println!("ℹ {message}");
}

pub fn warning(message: &str) {
    println!("⚠ {message}");
}

pub fn error(message: &str) {
    println!("X {message}");
}

/// First `max` characters of `text` on one line, for list previews.
pub fn preview(text: &str, max: usize) -> String {
    text.chars()
        .take(max)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}
