use console::style;

/// Styled console output for command results
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        eprintln!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn header(&self, message: &str) {
        println!("\n{}", style(message).bold().underlined());
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Aligned `label: value` line
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<14} {}", format!("{}:", label), value);
    }

    /// Path line with an existence marker
    pub fn path(&self, label: &str, path: &std::path::Path, exists: bool) {
        let marker = if exists {
            style("✓").green()
        } else {
            style("✗").dim()
        };
        println!("  {:<9} {} {}", format!("{}:", label), marker, path.display());
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
