//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a course summary line.
    pub fn course_info(title: &str, instructor: Option<&str>, lessons: usize) {
        let lessons = match lessons {
            1 => "1 lesson".to_string(),
            n => format!("{} lessons", n),
        };
        match instructor {
            Some(name) => println!(
                "  {} {} ({}, {})",
                style("*").cyan(),
                style(title).bold(),
                style(name).dim(),
                lessons
            ),
            None => println!("  {} {} ({})", style("*").cyan(), style(title).bold(), lessons),
        }
    }

    /// Print a cited source.
    pub fn source(name: &str, link: Option<&str>) {
        println!("{} {}", style(">>").green(), style(name).bold());
        if let Some(l) = link {
            println!("   {}", style(l).dim());
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
