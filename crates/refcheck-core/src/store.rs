//! The reference store: sole owner of the [`FormState`] for one editing
//! session.
//!
//! Every operation builds a new `FormState` and swaps it in behind a fresh
//! `Arc`. The previous snapshot is never touched, so a renderer can compare
//! `Arc` pointers to decide whether anything changed. Records that were not
//! touched by an operation keep their `Arc`s.
//!
//! | Operation | Confirmation | Effect |
//! |---|---|---|
//! | `add_occupation` | — | appends an unclassified, unsaved period |
//! | `add_gap_reference` | — | appends an unsaved Gap period spanning a gap |
//! | `remove_occupation` | saved + named | drops the period by pointer |
//! | `add_person` | — | appends an empty, unsaved personal reference |
//! | `remove_person` | saved + named | drops the person by pointer |
//! | `reconcile` | — | rebuilds every record from raw form input |

use chrono::NaiveDate;
use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::CheckConfig;
use crate::dates::{Clock, CoverageWindow, SystemClock};
use crate::gaps::{self, Gap};
use crate::identity::{Handle, HandleRegistry};
use crate::model::{
    FormState, Identity, PeriodKind, PeriodReference, PersonalReference, ReferenceRecord,
};
use crate::raw::{ControlId, RawFieldGroup, RawSnapshot};

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Synchronous yes/no prompt shown before a destructive action.
pub trait Confirm {
    fn confirm(&mut self, message: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, message: &str) -> bool {
        self(message)
    }
}

/// Answers yes to every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&mut self, _message: &str) -> bool {
        true
    }
}

/// Answers no to every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&mut self, _message: &str) -> bool {
        false
    }
}

/// Result of a remove request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The user declined the prompt; nothing changed.
    Declined,
    /// The record is not in the current snapshot; nothing changed.
    NotFound,
}

/// Optional bounds for a newly added period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PeriodSeed {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Pure transitions on FormState
// ---------------------------------------------------------------------------

impl FormState {
    #[must_use]
    pub fn with_occupation(&self, occupation: PeriodReference) -> Self {
        let mut occupations = self.occupations.clone();
        occupations.push(Arc::new(occupation));
        Self {
            globals: self.globals.clone(),
            occupations,
            persons: self.persons.clone(),
        }
    }

    /// `None` if `occupation` is not part of this snapshot.
    #[must_use]
    pub fn without_occupation(&self, occupation: &Arc<PeriodReference>) -> Option<Self> {
        self.occupation_index(occupation)?;
        Some(Self {
            globals: self.globals.clone(),
            occupations: self
                .occupations
                .iter()
                .filter(|o| !Arc::ptr_eq(o, occupation))
                .cloned()
                .collect(),
            persons: self.persons.clone(),
        })
    }

    #[must_use]
    pub fn with_person(&self, person: PersonalReference) -> Self {
        let mut persons = self.persons.clone();
        persons.push(Arc::new(person));
        Self {
            globals: self.globals.clone(),
            occupations: self.occupations.clone(),
            persons,
        }
    }

    #[must_use]
    pub fn without_person(&self, person: &Arc<PersonalReference>) -> Option<Self> {
        self.person_index(person)?;
        Some(Self {
            globals: self.globals.clone(),
            occupations: self.occupations.clone(),
            persons: self
                .persons
                .iter()
                .filter(|p| !Arc::ptr_eq(p, person))
                .cloned()
                .collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// ReferenceStore
// ---------------------------------------------------------------------------

/// Owns the current snapshot, the handle registry and the clock.
#[derive(Debug)]
pub struct ReferenceStore<C: Clock = SystemClock> {
    state: Arc<FormState>,
    registry: HandleRegistry,
    config: CheckConfig,
    clock: C,
}

impl ReferenceStore<SystemClock> {
    #[must_use]
    pub fn new(state: FormState, config: CheckConfig) -> Self {
        Self::with_clock(state, config, SystemClock)
    }
}

impl<C: Clock> ReferenceStore<C> {
    /// Start a session from an existing snapshot. Handles already used by
    /// unsaved records in `state` are never minted again.
    #[must_use]
    pub fn with_clock(state: FormState, config: CheckConfig, clock: C) -> Self {
        let mut registry = HandleRegistry::new();
        for handle in state.unsaved_handles() {
            registry.observe(handle);
        }
        Self {
            state: Arc::new(state),
            registry,
            config,
            clock,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub const fn state(&self) -> &Arc<FormState> {
        &self.state
    }

    #[must_use]
    pub const fn config(&self) -> &CheckConfig {
        &self.config
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    #[must_use]
    pub fn coverage_window(&self) -> CoverageWindow {
        CoverageWindow::ending(self.today(), self.config.coverage.years)
    }

    /// Occupations newest first, the order they are displayed in.
    #[must_use]
    pub fn ordered_occupations(&self) -> Vec<Arc<PeriodReference>> {
        gaps::order_occupations(&self.state.occupations, &self.coverage_window())
    }

    /// Reported gaps for the current snapshot, leading gap first.
    #[must_use]
    pub fn gaps(&self) -> Vec<Gap> {
        let window = self.coverage_window();
        let ordered = gaps::order_occupations(&self.state.occupations, &window);
        gaps::derive_gaps(&ordered, &window, self.config.coverage.min_gap_days)
    }

    /// Stable key for any `Arc`-held value.
    pub fn handle_of<T: Any + Send + Sync>(&mut self, value: &Arc<T>) -> Handle {
        self.registry.handle_of(value)
    }

    // -- mutations ----------------------------------------------------------

    /// Append a new, unclassified period.
    pub fn add_occupation(&mut self, seed: PeriodSeed) -> Handle {
        let handle = self.registry.mint("new occupation");
        let period = PeriodReference::unsaved(handle, PeriodKind::New)
            .with_dates(seed.start_date, seed.end_date);
        let next = self.state.with_occupation(period);
        self.replace(next);
        info!(%handle, "added occupation");
        handle
    }

    /// Append a Gap period covering exactly `gap`.
    pub fn add_gap_reference(&mut self, gap: &Gap) -> Handle {
        let handle = self.registry.mint("gap reference");
        let next = self.state.with_occupation(gap.to_reference(handle));
        self.replace(next);
        info!(%handle, start = %gap.start, end = %gap.end, "added gap reference");
        handle
    }

    /// Remove `occupation`. A saved period with a company or institution
    /// name is only removed after `confirm` agrees.
    pub fn remove_occupation(
        &mut self,
        occupation: &Arc<PeriodReference>,
        confirm: &mut impl Confirm,
    ) -> RemoveOutcome {
        let Some(next) = self.state.without_occupation(occupation) else {
            debug!(identity = %occupation.identity, "occupation not in snapshot");
            return RemoveOutcome::NotFound;
        };

        if occupation.identity.is_saved() {
            if let Some(name) = occupation.display_name() {
                let message = format!("Are you sure you want to remove the {name} reference?");
                if !self.confirmed(&message, confirm) {
                    debug!(identity = %occupation.identity, "occupation removal declined");
                    return RemoveOutcome::Declined;
                }
            }
        }

        self.replace(next);
        info!(identity = %occupation.identity, "removed occupation");
        RemoveOutcome::Removed
    }

    /// Append an empty personal reference.
    pub fn add_person(&mut self) -> Handle {
        let handle = self.registry.mint("new person");
        let next = self.state.with_person(PersonalReference::unsaved(handle));
        self.replace(next);
        info!(%handle, "added person");
        handle
    }

    /// Remove `person`. A saved person with a name needs confirmation.
    pub fn remove_person(
        &mut self,
        person: &Arc<PersonalReference>,
        confirm: &mut impl Confirm,
    ) -> RemoveOutcome {
        let Some(next) = self.state.without_person(person) else {
            debug!(identity = %person.identity, "person not in snapshot");
            return RemoveOutcome::NotFound;
        };

        if person.identity.is_saved() {
            if let Some(name) = person.display_name() {
                let message = format!("Are you sure you want to remove {name}?");
                if !self.confirmed(&message, confirm) {
                    debug!(identity = %person.identity, "person removal declined");
                    return RemoveOutcome::Declined;
                }
            }
        }

        self.replace(next);
        info!(identity = %person.identity, "removed person");
        RemoveOutcome::Removed
    }

    /// Rebuild every record from the raw input of one edit event.
    ///
    /// Groups are read in display order. A record is marked changed when the
    /// control that fired the event belongs to its group, when its hidden
    /// changed field says so, or when the same record was already changed.
    /// Global fields missing from the input keep their previous values.
    pub fn reconcile(&mut self, raw: &RawSnapshot) -> &Arc<FormState> {
        let prev = Arc::clone(&self.state);

        let globals = raw
            .globals
            .as_ref()
            .map_or_else(|| prev.globals.clone(), |g| prev.globals.merged(g.values()));

        // Handles echoed back by the form are taken before any are minted.
        let mut claims = HandleClaims::default();
        for group in raw.occupations.iter().chain(&raw.persons) {
            if let Some(handle) = read_group(group, None).identity().and_then(|i| i.handle()) {
                self.registry.observe(handle);
                claims.claimed.insert(handle);
            }
        }

        let mut occupations = Vec::with_capacity(raw.occupations.len());
        for (position, group) in raw.occupations.iter().enumerate() {
            let record = read_group(group, raw.changed);
            let fallback = prev.occupations.get(position).map(|o| o.identity);
            let identity = self.resolve_identity(&record, fallback, &mut claims);
            let kind = record.period_kind().unwrap_or_else(|err| {
                debug!(%identity, %err, "unrecognized reference type treated as new");
                PeriodKind::New
            });
            let mut period = record.into_period(identity, kind);
            period.changed |= was_changed(&prev.occupations, position, identity, |o| {
                (o.identity, o.changed)
            });
            occupations.push(Arc::new(period));
        }

        let mut persons = Vec::with_capacity(raw.persons.len());
        for (position, group) in raw.persons.iter().enumerate() {
            let record = read_group(group, raw.changed);
            let fallback = prev.persons.get(position).map(|p| p.identity);
            let identity = self.resolve_identity(&record, fallback, &mut claims);
            let mut person = record.into_person(identity);
            person.changed |= was_changed(&prev.persons, position, identity, |p| {
                (p.identity, p.changed)
            });
            persons.push(Arc::new(person));
        }

        debug!(
            occupations = occupations.len(),
            persons = persons.len(),
            changed = ?raw.changed,
            "reconciled form input"
        );

        self.replace(FormState {
            globals,
            occupations,
            persons,
        });
        &self.state
    }

    // -- internals ----------------------------------------------------------

    fn replace(&mut self, next: FormState) {
        self.state = Arc::new(next);
    }

    fn confirmed(&self, message: &str, confirm: &mut impl Confirm) -> bool {
        !self.config.removal.confirm || confirm.confirm(message)
    }

    /// Identity for a reconciled group: its own ids, else the unsaved handle
    /// of the record previously shown at the same position, else a new one.
    ///
    /// No two groups leave with the same handle. A group repeating a handle
    /// already assigned in this pass is treated as having none, and a
    /// positional handle that some group still carries is not inherited.
    fn resolve_identity(
        &mut self,
        record: &ReferenceRecord,
        fallback: Option<Identity>,
        claims: &mut HandleClaims,
    ) -> Identity {
        match record.identity() {
            Some(identity @ Identity::Saved { .. }) => return identity,
            Some(identity @ Identity::Unsaved { handle }) => {
                if claims.assign(handle) {
                    return identity;
                }
                warn!(%identity, "handle repeated in input; treating group as new");
            }
            None => {}
        }

        if let Some(identity @ Identity::Unsaved { handle }) = fallback {
            if !claims.claimed.contains(&handle) && claims.assign(handle) {
                warn!(%identity, "input group without identity; keeping handle at same position");
                return identity;
            }
        }

        let handle = self.registry.mint("recovered reference");
        claims.assign(handle);
        let identity = Identity::unsaved(handle);
        warn!(%identity, "input group without identity; minted a new handle");
        identity
    }
}

/// Handles seen while reconciling one raw snapshot.
#[derive(Debug, Default)]
struct HandleClaims {
    /// Carried by some raw group as its own `__unsavedId`.
    claimed: HashSet<Handle>,
    /// Already given to a record in this pass.
    assigned: HashSet<Handle>,
}

impl HandleClaims {
    /// Take `handle` for the current group. `false` if it is already taken.
    fn assign(&mut self, handle: Handle) -> bool {
        self.assigned.insert(handle)
    }
}

/// Whether the record now at `position` with `identity` was already marked
/// changed: the previous record at the same position if it is the same one,
/// else the first previous record with that identity.
fn was_changed<T>(
    prev: &[Arc<T>],
    position: usize,
    identity: Identity,
    key: impl Fn(&T) -> (Identity, bool),
) -> bool {
    match prev.get(position).map(|r| key(r)) {
        Some((id, changed)) if id == identity => changed,
        _ => prev
            .iter()
            .map(|r| key(r))
            .find(|(id, _)| *id == identity)
            .is_some_and(|(_, changed)| changed),
    }
}

fn read_group(group: &RawFieldGroup, changed: Option<ControlId>) -> ReferenceRecord {
    let mut record = ReferenceRecord::from_fields(&group.values());
    if changed.is_some_and(|id| group.contains(id)) {
        record.changed = true;
    }
    record
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::FixedClock;
    use crate::model::{GlobalFields, OccupationDetails, WorkDetails, WorkKind};
    use crate::raw::{ControlKind, RawControl};
    use std::cell::RefCell;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn saved_work(id: i64, company: &str) -> PeriodReference {
        PeriodReference {
            identity: Identity::saved(Some(id), None).unwrap(),
            changed: false,
            address: None,
            start_date: Some(d("2020-01-01")),
            end_date: Some(d("2021-01-01")),
            kind: PeriodKind::Work {
                kind: WorkKind::Employment,
                details: WorkDetails {
                    occupation: OccupationDetails {
                        company_name: company.to_string(),
                        ..OccupationDetails::default()
                    },
                    ..WorkDetails::default()
                },
            },
        }
    }

    fn store(state: FormState) -> ReferenceStore<FixedClock> {
        ReferenceStore::with_clock(state, CheckConfig::default(), FixedClock(d("2025-06-15")))
    }

    fn control(id: u64, name: &str, kind: ControlKind, value: &str) -> RawControl {
        RawControl {
            id: ControlId(id),
            name: name.to_string(),
            kind,
            value: value.to_string(),
            ..RawControl::default()
        }
    }

    #[test]
    fn add_occupation_appends_new_unsaved_changed_period() {
        let mut s = store(FormState::default());
        let before = Arc::clone(s.state());
        let handle = s.add_occupation(PeriodSeed {
            start_date: Some(d("2024-01-01")),
            end_date: None,
        });

        assert!(!Arc::ptr_eq(&before, s.state()));
        assert!(before.occupations.is_empty());
        let added = &s.state().occupations[0];
        assert_eq!(added.kind, PeriodKind::New);
        assert!(added.changed);
        assert_eq!(added.identity.handle(), Some(handle));
        assert_eq!(added.start_date, Some(d("2024-01-01")));
    }

    #[test]
    fn untouched_records_keep_their_arcs() {
        let mut s = store(FormState::new(
            GlobalFields::default(),
            vec![saved_work(1, "Acme")],
            Vec::new(),
        ));
        let first = Arc::clone(&s.state().occupations[0]);
        s.add_person();
        assert!(Arc::ptr_eq(&first, &s.state().occupations[0]));
    }

    #[test]
    fn declined_removal_leaves_state_untouched() {
        let mut s = store(FormState::new(
            GlobalFields::default(),
            vec![saved_work(1, "Acme")],
            Vec::new(),
        ));
        let before = Arc::clone(s.state());
        let target = Arc::clone(&s.state().occupations[0]);

        let prompts = RefCell::new(Vec::new());
        let mut decline = |msg: &str| {
            prompts.borrow_mut().push(msg.to_string());
            false
        };
        assert_eq!(
            s.remove_occupation(&target, &mut decline),
            RemoveOutcome::Declined
        );
        assert!(Arc::ptr_eq(&before, s.state()));
        assert_eq!(s.state().occupations.len(), 1);
        assert_eq!(
            prompts.into_inner(),
            vec!["Are you sure you want to remove the Acme reference?".to_string()]
        );
    }

    #[test]
    fn unsaved_or_nameless_periods_remove_without_prompt() {
        let mut s = store(FormState::new(
            GlobalFields::default(),
            vec![saved_work(1, "")],
            Vec::new(),
        ));
        s.add_occupation(PeriodSeed::default());
        let nameless = Arc::clone(&s.state().occupations[0]);
        let unsaved = Arc::clone(&s.state().occupations[1]);

        assert_eq!(
            s.remove_occupation(&unsaved, &mut NeverConfirm),
            RemoveOutcome::Removed
        );
        assert_eq!(
            s.remove_occupation(&nameless, &mut NeverConfirm),
            RemoveOutcome::Removed
        );
        assert!(s.state().occupations.is_empty());
    }

    #[test]
    fn removal_is_by_pointer_not_value() {
        let mut s = store(FormState::new(
            GlobalFields::default(),
            vec![saved_work(1, "Acme")],
            Vec::new(),
        ));
        let twin = Arc::new(saved_work(1, "Acme"));
        assert_eq!(
            s.remove_occupation(&twin, &mut AlwaysConfirm),
            RemoveOutcome::NotFound
        );
        assert_eq!(s.state().occupations.len(), 1);
    }

    #[test]
    fn saved_named_person_needs_confirmation() {
        let person = PersonalReference {
            identity: Identity::saved(None, Some(4)).unwrap(),
            referee_name: "John Smith".into(),
            ..PersonalReference::unsaved(Handle::from_raw(1))
        };
        let mut s = store(FormState::new(GlobalFields::default(), Vec::new(), vec![person]));
        let target = Arc::clone(&s.state().persons[0]);
        assert_eq!(
            s.remove_person(&target, &mut NeverConfirm),
            RemoveOutcome::Declined
        );
        assert_eq!(
            s.remove_person(&target, &mut |m: &str| m == "Are you sure you want to remove John Smith?"),
            RemoveOutcome::Removed
        );
        assert!(s.state().persons.is_empty());
    }

    #[test]
    fn confirmation_can_be_disabled_by_config() {
        let mut config = CheckConfig::default();
        config.removal.confirm = false;
        let mut s = ReferenceStore::with_clock(
            FormState::new(GlobalFields::default(), vec![saved_work(1, "Acme")], Vec::new()),
            config,
            FixedClock(d("2025-06-15")),
        );
        let target = Arc::clone(&s.state().occupations[0]);
        assert_eq!(
            s.remove_occupation(&target, &mut NeverConfirm),
            RemoveOutcome::Removed
        );
    }

    #[test]
    fn gap_reference_fills_the_gap() {
        let mut s = store(FormState::default());
        let gaps = s.gaps();
        assert_eq!(gaps.len(), 1);
        s.add_gap_reference(&gaps[0]);
        assert!(s.gaps().is_empty());
        assert!(matches!(s.state().occupations[0].kind, PeriodKind::Gap(_)));
    }

    #[test]
    fn handles_from_loaded_state_are_not_reminted() {
        let existing = PeriodReference::unsaved(Handle::from_raw(10), PeriodKind::New);
        let mut s = store(FormState::new(GlobalFields::default(), vec![existing], Vec::new()));
        let h = s.add_person();
        assert!(h.get() > 10);
    }

    #[test]
    fn out_of_range_loaded_handle_does_not_block_minting() {
        let existing = PeriodReference::unsaved(Handle::from_raw(u64::MAX), PeriodKind::New)
            .with_dates(Some(d("2024-01-01")), Some(d("2024-06-30")));
        let mut s = store(FormState::new(GlobalFields::default(), vec![existing], Vec::new()));
        let person = s.add_person();
        let gap = s.gaps()[0];
        let filled = s.add_gap_reference(&gap);

        assert_eq!(person, Handle::from_raw(1));
        assert_eq!(filled, Handle::from_raw(2));
        assert_eq!(s.state().unsaved_handles().count(), 3);
    }

    fn unsaved_group(handle: u64) -> RawFieldGroup {
        RawFieldGroup {
            controls: vec![control(
                handle * 10,
                "__unsavedId",
                ControlKind::Hidden,
                &handle.to_string(),
            )],
        }
    }

    fn handles(state: &FormState) -> Vec<Handle> {
        state.unsaved_handles().collect()
    }

    #[test]
    fn positional_handle_still_carried_by_a_later_group_is_not_inherited() {
        let mut s = store(FormState::default());
        let first = s.add_occupation(PeriodSeed::default());
        let raw = RawSnapshot {
            occupations: vec![
                RawFieldGroup {
                    controls: vec![control(1, "CompanyName", ControlKind::Text, "Other")],
                },
                unsaved_group(first.get()),
            ],
            ..RawSnapshot::default()
        };

        let state = Arc::clone(s.reconcile(&raw));
        let got = handles(&state);
        assert_eq!(got.len(), 2);
        assert_ne!(got[0], got[1]);
        assert_eq!(got[1], first);

        let again = Arc::clone(s.reconcile(&raw));
        assert_eq!(again, state);
    }

    #[test]
    fn repeated_input_handle_goes_to_the_first_group_only() {
        let mut s = store(FormState::default());
        let raw = RawSnapshot {
            occupations: vec![unsaved_group(7), unsaved_group(7)],
            persons: vec![unsaved_group(7)],
            ..RawSnapshot::default()
        };

        let state = Arc::clone(s.reconcile(&raw));
        let got = handles(&state);
        assert_eq!(got[0], Handle::from_raw(7));
        assert_ne!(got[1], got[0]);
        assert_ne!(got[2], got[0]);
        assert_ne!(got[2], got[1]);

        let again = Arc::clone(s.reconcile(&raw));
        assert_eq!(again, state);
    }

    #[test]
    fn reconcile_reads_groups_in_order_and_marks_changed_group() {
        let mut s = store(FormState::default());
        let raw = RawSnapshot {
            globals: Some(RawFieldGroup {
                controls: vec![control(1, "MotherName", ControlKind::Text, "Jane")],
            }),
            occupations: vec![
                RawFieldGroup {
                    controls: vec![
                        control(10, "OriginalApplicantReferenceId", ControlKind::Hidden, "501"),
                        control(11, "ReferenceTypeValueId", ControlKind::Select, "1077"),
                        control(12, "CompanyName", ControlKind::Text, "Example State University"),
                        control(13, "StartDate", ControlKind::Date, "2018-09-01"),
                        control(14, "EndDate", ControlKind::Date, ""),
                    ],
                },
                RawFieldGroup {
                    controls: vec![
                        control(20, "__unsavedId", ControlKind::Hidden, "3"),
                        control(21, "ReferenceTypeValueId", ControlKind::Select, ""),
                    ],
                },
            ],
            persons: Vec::new(),
            changed: Some(ControlId(12)),
        };

        let state = Arc::clone(s.reconcile(&raw));
        assert_eq!(state.globals.text("MotherName"), Some("Jane"));
        assert_eq!(state.occupations.len(), 2);

        let edu = &state.occupations[0];
        assert!(edu.changed);
        assert_eq!(edu.display_name(), Some("Example State University"));
        assert_eq!(edu.end_date, None);
        assert_eq!(edu.identity, Identity::saved(Some(501), None).unwrap());

        let new = &state.occupations[1];
        assert!(!new.changed);
        assert_eq!(new.kind, PeriodKind::New);
        assert_eq!(new.identity.handle(), Some(Handle::from_raw(3)));
    }

    #[test]
    fn reconcile_is_idempotent() {
        let mut s = store(FormState::default());
        let raw = RawSnapshot {
            occupations: vec![RawFieldGroup {
                controls: vec![control(1, "CompanyName", ControlKind::Text, "Acme")],
            }],
            persons: vec![RawFieldGroup::default()],
            changed: Some(ControlId(1)),
            ..RawSnapshot::default()
        };
        let first = Arc::clone(s.reconcile(&raw));
        let second = Arc::clone(s.reconcile(&raw));
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn reconcile_never_clears_changed() {
        let mut s = store(FormState::default());
        let handle = s.add_person();
        let raw = RawSnapshot {
            persons: vec![RawFieldGroup {
                controls: vec![control(
                    1,
                    "__unsavedId",
                    ControlKind::Hidden,
                    &handle.get().to_string(),
                )],
            }],
            ..RawSnapshot::default()
        };
        let state = s.reconcile(&raw);
        assert!(state.persons[0].changed);
    }

    #[test]
    fn malformed_group_coerces_instead_of_failing() {
        let mut s = store(FormState::default());
        let raw = RawSnapshot {
            occupations: vec![RawFieldGroup {
                controls: vec![
                    control(1, "ReferenceTypeValueId", ControlKind::Select, "banana"),
                    control(2, "StartDate", ControlKind::Date, "31/12/2020"),
                    control(3, "OriginalApplicantReferenceId", ControlKind::Hidden, "x"),
                ],
            }],
            ..RawSnapshot::default()
        };
        let state = s.reconcile(&raw);
        let p = &state.occupations[0];
        assert_eq!(p.kind, PeriodKind::New);
        assert_eq!(p.start_date, None);
        assert!(!p.identity.is_saved());
    }

    #[test]
    fn ordered_occupations_follow_effective_start() {
        let mut s = store(FormState::default());
        s.add_occupation(PeriodSeed {
            start_date: Some(d("2021-01-01")),
            end_date: None,
        });
        s.add_occupation(PeriodSeed {
            start_date: Some(d("2023-01-01")),
            end_date: None,
        });
        let ordered = s.ordered_occupations();
        assert_eq!(ordered[0].start_date, Some(d("2023-01-01")));
        assert_eq!(ordered[1].start_date, Some(d("2021-01-01")));
    }
}
