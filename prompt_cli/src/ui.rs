// Terminal output helpers for the inspection commands
use colored::Colorize;

pub fn print_header(text: &str) {
    println!("{}", text.bold().cyan());
    println!("{}", "=".repeat(text.len()).cyan());
}

pub fn print_warning(text: &str) {
    println!("{} {}", "⚠".yellow().bold(), text.yellow());
}
