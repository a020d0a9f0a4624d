//! `refcheck gaps`: ordered occupation periods and the coverage gaps between
//! them.
//!
//! With `--fill`, every reported gap becomes an unsaved Gap reference and the
//! resulting form snapshot is printed as JSON.

use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_json, render_mode};
use chrono::NaiveDate;
use clap::Args;
use refcheck_core::config::CheckConfig;
use refcheck_core::dates::format_date;
use refcheck_core::{FixedClock, Gap, GapPosition, PeriodReference, ReferenceStore};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use super::window::WindowReport;

#[derive(Args, Debug)]
pub struct GapsArgs {
    /// Persisted form snapshot (JSON).
    #[arg(long, value_name = "FILE")]
    pub state: PathBuf,

    /// Date the coverage window ends on (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long, value_name = "DATE")]
    pub today: Option<NaiveDate>,

    /// Add a Gap reference for every reported gap and print the new snapshot.
    #[arg(long)]
    pub fill: bool,
}

/// One occupation period in display order.
#[derive(Debug, Serialize)]
pub struct PeriodRow {
    pub index: usize,
    pub key: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub open_ended: bool,
    pub inverted_dates: bool,
    pub years: f64,
}

#[derive(Debug, Serialize)]
pub struct GapRow {
    #[serde(flatten)]
    pub gap: Gap,
    pub days: i64,
}

#[derive(Debug, Serialize)]
pub struct GapsReport {
    pub window: WindowReport,
    pub min_gap_days: i64,
    pub occupations: Vec<PeriodRow>,
    pub gaps: Vec<GapRow>,
}

fn period_row(index: usize, period: &PeriodReference, store: &ReferenceStore<FixedClock>) -> PeriodRow {
    let window = store.coverage_window();
    PeriodRow {
        index,
        key: period.identity.to_string(),
        kind: period
            .reference_type()
            .map_or_else(|| "new".to_string(), |ty| ty.to_string()),
        name: period.display_name().map(str::to_string),
        start: period.effective_start(&window),
        end: period.effective_end(&window),
        open_ended: period.end_date.is_none(),
        inverted_dates: period.has_inverted_dates(),
        years: (period.duration_years(&window) * 10.0).round() / 10.0,
    }
}

fn position_label(position: GapPosition) -> String {
    match position {
        GapPosition::Leading => "leading".to_string(),
        GapPosition::Before { index } => format!("before #{index}"),
    }
}

pub fn run_gaps(args: &GapsArgs, output: OutputMode, config: &CheckConfig) -> anyhow::Result<()> {
    let state = super::load_state(&args.state)?;
    let today = super::resolve_today(args.today);
    let mut store = ReferenceStore::with_clock(state, config.clone(), FixedClock(today));

    if args.fill {
        let gaps = store.gaps();
        for gap in &gaps {
            store.add_gap_reference(gap);
        }
        info!(filled = gaps.len(), "filled coverage gaps");
        return render_json(store.state().as_ref());
    }

    let report = GapsReport {
        window: WindowReport::new(&store.coverage_window(), config.coverage.years),
        min_gap_days: config.coverage.min_gap_days,
        occupations: store
            .ordered_occupations()
            .iter()
            .enumerate()
            .map(|(i, p)| period_row(i, p, &store))
            .collect(),
        gaps: store
            .gaps()
            .into_iter()
            .map(|gap| GapRow {
                days: gap.days(),
                gap,
            })
            .collect(),
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for p in &r.occupations {
                writeln!(
                    w,
                    "period {} {} {} {} {}",
                    p.index,
                    p.key,
                    format_date(p.start),
                    format_date(p.end),
                    p.name.as_deref().unwrap_or("-")
                )?;
            }
            for g in &r.gaps {
                writeln!(
                    w,
                    "gap {} {} {} {}",
                    format_date(g.gap.start),
                    format_date(g.gap.end),
                    g.days,
                    position_label(g.gap.position).replace(' ', "-")
                )?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, "Coverage window")?;
            pretty_kv(
                w,
                "Range",
                format!("{} .. {}", format_date(r.window.start), format_date(r.window.end)),
            )?;
            writeln!(w)?;

            pretty_section(w, "Occupations (newest first)")?;
            if r.occupations.is_empty() {
                writeln!(w, "(none)")?;
            }
            for p in &r.occupations {
                let end = if p.open_ended {
                    "present".to_string()
                } else {
                    format_date(p.end)
                };
                writeln!(
                    w,
                    "#{:<3} {} .. {:<10}  {:<18} {} ({} yrs){}",
                    p.index,
                    format_date(p.start),
                    end,
                    p.kind,
                    p.name.as_deref().unwrap_or("(unnamed)"),
                    p.years,
                    if p.inverted_dates { "  [dates swapped]" } else { "" }
                )?;
            }
            writeln!(w)?;

            pretty_section(w, "Gaps")?;
            if r.gaps.is_empty() {
                writeln!(w, "No gaps of {} days or more.", r.min_gap_days)?;
            }
            for g in &r.gaps {
                writeln!(
                    w,
                    "{} .. {}  {:>5} days  {}",
                    format_date(g.gap.start),
                    format_date(g.gap.end),
                    g.days,
                    position_label(g.gap.position)
                )?;
            }
            pretty_rule(w)
        },
    )
}
