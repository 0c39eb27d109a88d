//! Shared output formatting for reports.

use anyhow::Result;
use serde::Serialize;
use woven::{JoinPointReport, Origin, WeaveReport};

use crate::OutputFormat;

/// Print a weave report in the specified format.
pub fn print_weave(report: &WeaveReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_weave_text(report),
        OutputFormat::Json => return print_json(report),
        OutputFormat::Compact => {
            for unit in &report.units {
                println!(
                    "{}: {} woven={} origin={}",
                    unit.source.display(),
                    unit.unit,
                    unit.woven,
                    origin_name(unit.origin)
                );
            }
        }
    }
    Ok(())
}

/// Print join points in the specified format.
pub fn print_joins(joins: &[JoinPointReport], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print_joins_text(joins),
        OutputFormat::Json => return print_json(joins),
        OutputFormat::Compact => {
            for join in joins {
                println!(
                    "{}:{}: {} [{}]",
                    join.unit,
                    join.line,
                    join.member,
                    join.aspects.join(",")
                );
            }
        }
    }
    Ok(())
}

fn print_weave_text(report: &WeaveReport) {
    for unit in &report.units {
        let marker = match unit.origin {
            Origin::Transformed if unit.woven > 0 => "\x1b[32mwoven\x1b[0m",
            Origin::Transformed => "loaded",
            Origin::Cache => "\x1b[34mcached\x1b[0m",
            Origin::Exempt => "\x1b[33mexempt\x1b[0m",
        };
        print!("{marker:>16} {}", unit.unit);
        if unit.woven > 0 {
            print!(" ({} member(s))", unit.woven);
        }
        if let Some(output) = &unit.output {
            print!(" -> {}", output.display());
        }
        println!();
    }

    println!(
        "\n\x1b[32mWoven {} member(s) in {} of {} unit(s), {} from cache\x1b[0m",
        report.woven(),
        report.units_woven(),
        report.units.len(),
        report.cache_hits()
    );
}

fn print_joins_text(joins: &[JoinPointReport]) {
    for join in joins {
        println!("{}::{} at line {}", join.unit, join.member, join.line);
        println!("  aspects: {}", join.aspects.join(" > "));
        if let Some(reason) = &join.skipped {
            println!("  \x1b[33mskipped\x1b[0m: {reason}");
        }
        println!();
    }
    let skipped = joins.iter().filter(|j| j.skipped.is_some()).count();
    println!(
        "Found {} join point(s), {} would be skipped",
        joins.len(),
        skipped
    );
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{json}");
    Ok(())
}

fn origin_name(origin: Origin) -> &'static str {
    match origin {
        Origin::Cache => "cache",
        Origin::Transformed => "transformed",
        Origin::Exempt => "exempt",
    }
}
