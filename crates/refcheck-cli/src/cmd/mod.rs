pub mod gaps;
pub mod reconcile;
pub mod window;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use refcheck_core::config::{CheckConfig, load_config};
use refcheck_core::error::ErrorCode;
use refcheck_core::model::FormStateRecord;
use refcheck_core::raw::RawSnapshot;
use refcheck_core::{Clock, FormState, SystemClock};
use std::path::Path;

/// `--today` if given, else the current UTC date.
pub fn resolve_today(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| SystemClock.today())
}

pub fn load_check_config(root: &Path) -> Result<CheckConfig> {
    load_config(root).context(ErrorCode::ConfigParseError)
}

/// Read a persisted form snapshot.
pub fn load_state(path: &Path) -> Result<FormState> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let record = serde_json::from_str::<FormStateRecord>(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))
        .context(ErrorCode::SnapshotParseError)?;
    let state = FormState::try_from(record).map_err(|err| {
        let code = ErrorCode::from(&err);
        anyhow::Error::new(err)
            .context(format!("Invalid reference in {}", path.display()))
            .context(code)
    })?;
    tracing::debug!(
        path = %path.display(),
        occupations = state.occupations.len(),
        persons = state.persons.len(),
        "loaded form snapshot"
    );
    Ok(state)
}

/// Read a raw input snapshot captured from the form.
pub fn load_raw(path: &Path) -> Result<RawSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str::<RawSnapshot>(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))
        .context(ErrorCode::RawInputParseError)
}
