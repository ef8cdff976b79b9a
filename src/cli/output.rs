// Output helpers - everything here goes to stderr, stdout belongs to supervisord

use colored::*;

/// Print a fatal error message to stderr
pub fn print_error(error: &str) {
    eprintln!("{} {}", "✗ Error:".red().bold(), error);
}

/// Print the startup banner listing the active limits
pub fn print_limits(lines: &[String]) {
    if lines.is_empty() {
        eprintln!("{}", "No uptime limits configured".yellow());
        return;
    }
    for line in lines {
        eprintln!("{} {}", "•".cyan(), line);
    }
}
