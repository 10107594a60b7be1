//! Minimal command line front end over the month store.

pub mod output;

use std::env;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    config::{Config, ConfigManager},
    core::{
        services::{MonthSummary, ServiceError},
        MonthManager,
    },
    domain::MonthId,
    errors::BudgetError,
    storage::JsonMonthStorage,
    utils::build_info,
};

const USAGE: &str = "usage: budget_months_cli <show|ensure|rollover> [YYYY-MM] [--json] | version | help";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Budget(#[from] BudgetError),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Show,
    Ensure,
    Rollover,
    Version,
    Help,
}

impl Command {
    fn parse(raw: &str) -> Result<Self, CliError> {
        match raw.to_ascii_lowercase().as_str() {
            "show" => Ok(Self::Show),
            "ensure" => Ok(Self::Ensure),
            "rollover" => Ok(Self::Rollover),
            "version" | "--version" => Ok(Self::Version),
            "help" | "--help" | "-h" => Ok(Self::Help),
            other => Err(CliError::Usage(format!("unknown command `{other}`\n{USAGE}"))),
        }
    }
}

struct Invocation {
    command: Command,
    month: MonthId,
    json: bool,
}

fn parse_args(args: &[String]) -> Result<Invocation, CliError> {
    let mut positional = args.iter().filter(|arg| arg.as_str() != "--json");
    let json = args.iter().any(|arg| arg == "--json");
    let command = match positional.next() {
        Some(raw) => Command::parse(raw)?,
        None => Command::Help,
    };
    let month = match positional.next() {
        Some(raw) => raw
            .parse::<MonthId>()
            .map_err(|err| CliError::Usage(err.to_string()))?,
        None => MonthId::current(),
    };
    if let Some(extra) = positional.next() {
        return Err(CliError::Usage(format!("unexpected argument `{extra}`\n{USAGE}")));
    }
    Ok(Invocation {
        command,
        month,
        json,
    })
}

/// Entry point used by the `budget_months_cli` binary.
pub fn run_cli() -> Result<(), CliError> {
    let args: Vec<String> = env::args().skip(1).collect();
    run(&args)
}

pub fn run(args: &[String]) -> Result<(), CliError> {
    let invocation = parse_args(args)?;
    match invocation.command {
        Command::Help => {
            output::info(USAGE);
            Ok(())
        }
        Command::Version => {
            print_version();
            Ok(())
        }
        Command::Show | Command::Ensure | Command::Rollover => {
            let config = ConfigManager::new()?.load()?;
            let mut manager = open_manager(&config)?;
            let result = execute(&mut manager, &invocation, &config.currency);
            for event in manager.take_persistence_events() {
                if event.is_failure() {
                    output::warning(format!(
                        "could not save {}: {:?}",
                        event.month_id, event.outcome
                    ));
                }
            }
            result
        }
    }
}

fn open_manager(config: &Config) -> Result<MonthManager, CliError> {
    let storage = JsonMonthStorage::new(Some(config.months_dir()))?;
    let mut manager = MonthManager::from_config(config, Box::new(storage));
    let report = manager.load()?;
    if !report.corrected.is_empty() {
        output::info(format!("repaired {} stored month(s)", report.corrected.len()));
    }
    Ok(manager)
}

fn execute(
    manager: &mut MonthManager,
    invocation: &Invocation,
    currency: &str,
) -> Result<(), CliError> {
    let id = invocation.month;
    match invocation.command {
        Command::Show => match manager.summarize(id) {
            Some(summary) => print_summary(&summary, invocation.json, currency),
            None => {
                output::warning(format!("month {id} has not been created yet"));
                Ok(())
            }
        },
        Command::Ensure => {
            let existed = manager.month(id).is_some();
            manager.ensure_month_exists(id);
            if !existed {
                output::success(format!("created month {id}"));
            }
            match manager.summarize(id) {
                Some(summary) => print_summary(&summary, invocation.json, currency),
                None => Ok(()),
            }
        }
        Command::Rollover => {
            let report = manager.rollover_unspent_budget(id)?;
            output::success(format!(
                "month {id} closed, unspent budget {} {currency}",
                report.unspent_total
            ));
            Ok(())
        }
        Command::Version | Command::Help => Ok(()),
    }
}

fn print_summary(summary: &MonthSummary, json: bool, currency: &str) -> Result<(), CliError> {
    if json {
        let rendered = serde_json::to_string_pretty(summary).map_err(BudgetError::from)?;
        output::info(rendered);
        return Ok(());
    }
    let state = if summary.is_rolled_over { "closed" } else { "open" };
    output::section(format!("Month {} ({state}), amounts in {currency}", summary.id));
    output::info(format!("  Income       : {}", summary.total_income));
    output::info(format!("  Budgeted     : {}", summary.total_budgeted));
    output::info(format!("  Spent        : {}", summary.total_spent));
    output::info(format!("  Unallocated  : {}", summary.unallocated));
    output::info(format!(
        "  Card debt    : {} -> {}",
        summary.starting_credit_card_debt, summary.debt_at_end_of_month
    ));
    output::section("Categories");
    for category in &summary.categories {
        let line = format!(
            "  {:<24} {:>10} / {:>10}",
            category.name, category.spent, category.budgeted
        );
        if category.overspent {
            output::warning(format!("{line}  overspent"));
        } else if category.is_system_category && category.goal_met {
            output::success(format!("{line}  goal met"));
        } else {
            let left = category.remaining.unwrap_or(Decimal::ZERO);
            output::info(format!("{line}  {left} left"));
        }
        for sub in &category.subcategories {
            let line = format!("    {:<22} {:>10} / {:>10}", sub.name, sub.spent, sub.budgeted);
            if sub.remaining < Decimal::ZERO {
                output::warning(format!("{line}  overspent"));
            } else {
                output::info(format!("{line}  {} left", sub.remaining));
            }
        }
    }
    Ok(())
}

fn print_version() {
    let meta = build_info::current();
    output::section(format!("Budget Months {}", meta.version));
    output::info(format!("  Build hash   : {}", meta.git_hash));
    output::info(format!("  Built at     : {}", meta.timestamp));
    output::info(format!("  Target       : {}", meta.target));
    output::info(format!("  Profile      : {}", meta.profile));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn parses_month_and_json_flag() {
        let invocation = parse_args(&args(&["show", "--json", "2025-06"])).unwrap();
        assert_eq!(invocation.command, Command::Show);
        assert_eq!(invocation.month.to_string(), "2025-06");
        assert!(invocation.json);
    }

    #[test]
    fn empty_args_show_help_and_bad_input_is_usage_error() {
        assert_eq!(parse_args(&[]).unwrap().command, Command::Help);
        assert!(matches!(
            parse_args(&args(&["frobnicate"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["show", "2025-13"])),
            Err(CliError::Usage(_))
        ));
        assert!(matches!(
            parse_args(&args(&["show", "2025-01", "extra"])),
            Err(CliError::Usage(_))
        ));
    }
}
