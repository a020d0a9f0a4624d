//! `refcheck window`: the coverage window ending today.

use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};
use chrono::NaiveDate;
use clap::Args;
use refcheck_core::CoverageWindow;
use refcheck_core::config::CheckConfig;
use refcheck_core::dates::format_date;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct WindowArgs {
    /// Date the window ends on (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct WindowReport {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub years: u32,
    pub days: i64,
}

impl WindowReport {
    pub fn new(window: &CoverageWindow, years: u32) -> Self {
        Self {
            start: window.start,
            end: window.end,
            years,
            days: window.days(),
        }
    }
}

pub fn run_window(args: &WindowArgs, output: OutputMode, config: &CheckConfig) -> anyhow::Result<()> {
    let today = super::resolve_today(args.today);
    let years = config.coverage.years;
    let report = WindowReport::new(&CoverageWindow::ending(today, years), years);

    render_mode(
        output,
        &report,
        |r, w| {
            writeln!(
                w,
                "{} {} {}",
                format_date(r.start),
                format_date(r.end),
                r.days
            )
        },
        |r, w| {
            pretty_section(w, "Coverage window")?;
            pretty_kv(w, "Start", format_date(r.start))?;
            pretty_kv(w, "End", format_date(r.end))?;
            pretty_kv(w, "Years", r.years.to_string())?;
            pretty_kv(w, "Days", r.days.to_string())
        },
    )
}
