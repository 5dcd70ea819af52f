use console::style;
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    pub fn success(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", style("✓").green().bold(), message);
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "status": "success",
                    "message": message.to_string(),
                }));
            }
        }
    }

    pub fn info(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", style("ℹ").blue().bold(), message);
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({
                    "status": "info",
                    "message": message.to_string(),
                }));
            }
        }
    }

    /// Warnings go to stderr in both modes
    pub fn warning(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", style("⚠").yellow().bold(), message);
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "status": "warning",
                    "message": message.to_string(),
                });
                eprintln!("{}", to_pretty(&output));
            }
        }
    }

    pub fn table<T: Tabled + Serialize>(&self, data: Vec<T>) {
        match self.format {
            OutputFormat::Human => {
                if data.is_empty() {
                    println!("{}", style("(no data)").dim());
                } else {
                    let mut table = Table::new(data);
                    table.with(Style::rounded());
                    println!("{}", table);
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({ "data": data })),
        }
    }

    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "status": "success",
                    "data": data,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{}: {}", style(key).bold(), value);
            }
            OutputFormat::Json => {
                print_json(&serde_json::json!({ key.to_string(): value.to_string() }));
            }
        }
    }

    pub fn section(&self, title: impl Display) {
        if self.format == OutputFormat::Human {
            println!("\n{}", style(title).bold().underlined());
        }
    }
}

fn to_pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", to_pretty(value));
}
