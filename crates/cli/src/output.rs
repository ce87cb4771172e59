//! Output formatting utilities

use bouncer_lib::models::{Decision, DecisionDelta};
use clap::ValueEnum;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Row for decision tables
#[derive(Tabled)]
pub struct DecisionRow {
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Scenario")]
    scenario: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Origin")]
    origin: String,
}

impl DecisionRow {
    pub fn from_decision(decision: &Decision) -> Self {
        Self {
            value: decision.value.clone(),
            scope: decision.scope.clone(),
            action: color_action(&decision.kind),
            scenario: decision.scenario.clone(),
            duration: decision.duration.clone(),
            origin: decision.origin.clone(),
        }
    }
}

/// Print a list of decisions
pub fn print_decisions(decisions: &[Decision], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(decisions)?);
        }
        OutputFormat::Table => {
            if decisions.is_empty() {
                println!("{}", "No active decisions".green());
                return Ok(());
            }
            let rows: Vec<DecisionRow> = decisions.iter().map(DecisionRow::from_decision).collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
    }

    Ok(())
}

/// Print one stream delta
pub fn print_delta(delta: &DecisionDelta, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(delta)?);
        }
        OutputFormat::Table => {
            if delta.is_empty() {
                println!("{}", "No changes".dimmed());
                return Ok(());
            }
            if !delta.new.is_empty() {
                println!("{}", format!("New decisions ({})", delta.new.len()).bold());
                print_decisions(&delta.new, format)?;
            }
            if !delta.deleted.is_empty() {
                println!(
                    "{}",
                    format!("Expired decisions ({})", delta.deleted.len()).bold()
                );
                print_decisions(&delta.deleted, format)?;
            }
        }
    }

    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Color a remediation action based on severity
pub fn color_action(action: &str) -> String {
    match action.to_lowercase().as_str() {
        "ban" => action.red().to_string(),
        "captcha" | "throttle" => action.yellow().to_string(),
        "allow" => action.green().to_string(),
        _ => action.to_string(),
    }
}
