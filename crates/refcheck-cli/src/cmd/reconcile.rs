//! `refcheck reconcile`: apply one raw input snapshot to a persisted form.

use crate::output::{OutputMode, pretty_kv, pretty_section, render_json};
use clap::Args;
use refcheck_core::config::CheckConfig;
use refcheck_core::{FormState, ReferenceStore};
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Persisted form snapshot (JSON).
    #[arg(long, value_name = "FILE")]
    pub state: PathBuf,

    /// Raw input snapshot captured from the form (JSON).
    #[arg(long, value_name = "FILE")]
    pub raw: PathBuf,
}

fn write_summary(state: &FormState, w: &mut dyn Write, pretty: bool) -> io::Result<()> {
    if pretty {
        pretty_section(w, "Reconciled form")?;
        pretty_kv(w, "Globals", state.globals.iter().count().to_string())?;
        pretty_kv(w, "Occupations", state.occupations.len().to_string())?;
        pretty_kv(w, "Persons", state.persons.len().to_string())?;
        writeln!(w)?;
    }
    for o in &state.occupations {
        writeln!(
            w,
            "occupation {} {} {}",
            o.identity,
            if o.changed { "changed" } else { "unchanged" },
            o.display_name().unwrap_or("-")
        )?;
    }
    for p in &state.persons {
        writeln!(
            w,
            "person {} {} {}",
            p.identity,
            if p.changed { "changed" } else { "unchanged" },
            p.display_name().unwrap_or("-")
        )?;
    }
    Ok(())
}

pub fn run_reconcile(
    args: &ReconcileArgs,
    output: OutputMode,
    config: &CheckConfig,
) -> anyhow::Result<()> {
    let state = super::load_state(&args.state)?;
    let raw = super::load_raw(&args.raw)?;

    let mut store = ReferenceStore::new(state, config.clone());
    let next = store.reconcile(&raw);

    if output.is_json() {
        return render_json(next.as_ref());
    }
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_summary(next, &mut out, output == OutputMode::Pretty)?;
    Ok(())
}
