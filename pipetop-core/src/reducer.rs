use std::time::SystemTime;

use crate::api::ApiError;
use crate::model::{DashboardSummary, Deal, Lead, Task};
use crate::state::{AppState, LoadPhase, Notice, Resource};

/// A write operation, for status-line wording
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationAction {
    AddLead,
    AddDeal,
    AddTask,
    SetLeadStatus,
}

impl MutationAction {
    pub fn label(&self) -> &'static str {
        match self {
            MutationAction::AddLead => "add lead",
            MutationAction::AddDeal => "add deal",
            MutationAction::AddTask => "add task",
            MutationAction::SetLeadStatus => "update lead",
        }
    }

    pub fn done_label(&self) -> &'static str {
        match self {
            MutationAction::AddLead => "lead created",
            MutationAction::AddDeal => "deal created",
            MutationAction::AddTask => "task created",
            MutationAction::SetLeadStatus => "lead updated",
        }
    }
}

#[derive(Clone, Debug)]
pub enum SyncEvent {
    /// A load was issued for `resource`, stamped with `seq`
    Loading { resource: Resource, seq: u64 },
    LeadsLoaded { seq: u64, rows: Vec<Lead> },
    DealsLoaded { seq: u64, rows: Vec<Deal> },
    TasksLoaded { seq: u64, rows: Vec<Task> },
    SummaryLoaded { seq: u64, summary: DashboardSummary },
    LoadFailed {
        resource: Resource,
        seq: u64,
        error: ApiError,
    },
    /// A create/patch completed; the follow-up reload is issued separately
    Mutated { action: MutationAction },
    /// A create/patch failed; no reload follows and rows stay untouched
    MutationFailed {
        action: MutationAction,
        error: ApiError,
    },
}

#[derive(Clone, Debug)]
pub struct EventEnvelope {
    pub id: u64,
    pub at: SystemTime,
    pub event: SyncEvent,
}

/// Fold one event into the state.
///
/// Load completions carry the sequence stamp of the request that produced
/// them; a completion is applied only when its stamp equals the newest
/// issued sequence for that resource. Older completions are stale and are
/// dropped, so overlapping loads converge on the newest request's response
/// instead of whichever response arrives last.
pub fn reduce(state: &mut AppState, env: &EventEnvelope) {
    state.last_event_id = env.id;

    match &env.event {
        SyncEvent::Loading { resource, seq } => {
            let (phase, issued) = state.slot_mut(*resource);
            if *seq >= *issued {
                *issued = *seq;
                *phase = LoadPhase::Loading;
            }
        }
        SyncEvent::LeadsLoaded { seq, rows } => {
            if *seq == state.leads.issued_seq {
                state.leads.rows = rows.clone();
                state.leads.phase = LoadPhase::Loaded;
            }
        }
        SyncEvent::DealsLoaded { seq, rows } => {
            if *seq == state.deals.issued_seq {
                state.deals.rows = rows.clone();
                state.deals.phase = LoadPhase::Loaded;
            }
        }
        SyncEvent::TasksLoaded { seq, rows } => {
            if *seq == state.tasks.issued_seq {
                state.tasks.rows = rows.clone();
                state.tasks.phase = LoadPhase::Loaded;
            }
        }
        SyncEvent::SummaryLoaded { seq, summary } => {
            if *seq == state.dashboard.issued_seq {
                state.dashboard.summary = summary.clone();
                state.dashboard.phase = LoadPhase::Loaded;
            }
        }
        SyncEvent::LoadFailed {
            resource,
            seq,
            error,
        } => {
            let (phase, issued) = state.slot_mut(*resource);
            if *seq == *issued {
                *phase = LoadPhase::LoadFailed {
                    error: error.clone(),
                };
            }
            state.notice = Some(Notice::err(format!(
                "load {} failed: {}",
                resource.label(),
                error
            )));
        }
        SyncEvent::Mutated { action } => {
            state.notice = Some(Notice::ok(action.done_label()));
        }
        SyncEvent::MutationFailed { action, error } => {
            state.notice = Some(Notice::err(format!("{} failed: {}", action.label(), error)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LeadStatus;

    fn env(id: u64, event: SyncEvent) -> EventEnvelope {
        EventEnvelope {
            id,
            at: SystemTime::now(),
            event,
        }
    }

    fn lead(id: &str, name: &str, status: LeadStatus) -> Lead {
        Lead {
            id: id.into(),
            name: name.into(),
            email: None,
            status,
        }
    }

    #[test]
    fn test_load_replaces_rows_in_backend_order() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Loading {
                    resource: Resource::Leads,
                    seq: 1,
                },
            ),
        );
        assert_eq!(state.leads.phase, LoadPhase::Loading);

        let rows = vec![
            lead("b", "Bea", LeadStatus::New),
            lead("a", "Ada", LeadStatus::Qualified),
        ];
        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::LeadsLoaded {
                    seq: 1,
                    rows: rows.clone(),
                },
            ),
        );

        assert_eq!(state.leads.phase, LoadPhase::Loaded);
        assert_eq!(state.leads.rows, rows);
        assert_eq!(state.last_event_id, 2);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut state = AppState::new();

        // Two overlapping loads: seq 1 issued, then seq 2.
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Loading {
                    resource: Resource::Leads,
                    seq: 1,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::Loading {
                    resource: Resource::Leads,
                    seq: 2,
                },
            ),
        );

        // Newest response lands first.
        reduce(
            &mut state,
            &env(
                3,
                SyncEvent::LeadsLoaded {
                    seq: 2,
                    rows: vec![lead("a", "Ada", LeadStatus::New)],
                },
            ),
        );
        assert_eq!(state.leads.rows.len(), 1);

        // The older response arrives late and must not clobber it.
        reduce(
            &mut state,
            &env(
                4,
                SyncEvent::LeadsLoaded {
                    seq: 1,
                    rows: vec![],
                },
            ),
        );
        assert_eq!(state.leads.rows.len(), 1);
        assert_eq!(state.leads.phase, LoadPhase::Loaded);
    }

    #[test]
    fn test_stale_failure_is_discarded() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Loading {
                    resource: Resource::Deals,
                    seq: 1,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::Loading {
                    resource: Resource::Deals,
                    seq: 2,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                3,
                SyncEvent::DealsLoaded {
                    seq: 2,
                    rows: vec![],
                },
            ),
        );

        // Failure of the superseded request does not flip the phase.
        reduce(
            &mut state,
            &env(
                4,
                SyncEvent::LoadFailed {
                    resource: Resource::Deals,
                    seq: 1,
                    error: ApiError::Status { code: 500 },
                },
            ),
        );
        assert_eq!(state.deals.phase, LoadPhase::Loaded);
    }

    #[test]
    fn test_failed_load_keeps_previous_rows() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Loading {
                    resource: Resource::Leads,
                    seq: 1,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::LeadsLoaded {
                    seq: 1,
                    rows: vec![lead("a", "Ada", LeadStatus::New)],
                },
            ),
        );

        reduce(
            &mut state,
            &env(
                3,
                SyncEvent::Loading {
                    resource: Resource::Leads,
                    seq: 2,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                4,
                SyncEvent::LoadFailed {
                    resource: Resource::Leads,
                    seq: 2,
                    error: ApiError::Transport {
                        detail: "connection refused".into(),
                    },
                },
            ),
        );

        // Rows survive; phase and notice carry the failure.
        assert_eq!(state.leads.rows.len(), 1);
        assert!(matches!(state.leads.phase, LoadPhase::LoadFailed { .. }));
        let notice = state.notice.as_ref().unwrap();
        assert!(!notice.ok);
        assert!(notice.text.contains("connection refused"));
    }

    #[test]
    fn test_summary_failure_keeps_zeroes_before_first_load() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Loading {
                    resource: Resource::Dashboard,
                    seq: 1,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::LoadFailed {
                    resource: Resource::Dashboard,
                    seq: 1,
                    error: ApiError::Decode {
                        detail: "expected object".into(),
                    },
                },
            ),
        );

        assert_eq!(state.dashboard.cards().total_leads, 0);
        assert!(state.dashboard.pipeline().is_empty());
        assert!(matches!(
            state.dashboard.phase,
            LoadPhase::LoadFailed { .. }
        ));
    }

    #[test]
    fn test_mutation_outcomes_set_notice() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Mutated {
                    action: MutationAction::AddLead,
                },
            ),
        );
        assert_eq!(state.notice, Some(Notice::ok("lead created")));

        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::MutationFailed {
                    action: MutationAction::SetLeadStatus,
                    error: ApiError::Status { code: 404 },
                },
            ),
        );
        let notice = state.notice.unwrap();
        assert!(!notice.ok);
        assert!(notice.text.starts_with("update lead failed"));
    }

    #[test]
    fn test_mutation_failure_leaves_rows_untouched() {
        let mut state = AppState::new();
        reduce(
            &mut state,
            &env(
                1,
                SyncEvent::Loading {
                    resource: Resource::Tasks,
                    seq: 1,
                },
            ),
        );
        reduce(
            &mut state,
            &env(
                2,
                SyncEvent::TasksLoaded {
                    seq: 1,
                    rows: vec![Task {
                        id: "t1".into(),
                        title: "Call Ada".into(),
                        kind: Default::default(),
                        completed: false,
                    }],
                },
            ),
        );

        reduce(
            &mut state,
            &env(
                3,
                SyncEvent::MutationFailed {
                    action: MutationAction::AddTask,
                    error: ApiError::Status { code: 422 },
                },
            ),
        );
        assert_eq!(state.tasks.rows.len(), 1);
        assert_eq!(state.tasks.phase, LoadPhase::Loaded);
    }
}
