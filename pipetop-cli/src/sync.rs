use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use tokio::sync::{broadcast, mpsc};

use pipetop_core::api::{ApiError, CrmApi};
use pipetop_core::model::{LeadStatus, NewDeal, NewLead, NewTask};
use pipetop_core::reducer::{EventEnvelope, MutationAction, SyncEvent};
use pipetop_core::state::Resource;

/// Commands accepted by the sync worker
#[derive(Clone, Debug)]
pub enum SyncCommand {
    /// Fetch current rows (or the summary) for one resource
    Load(Resource),
    AddLead(NewLead),
    AddDeal(NewDeal),
    AddTask(NewTask),
    SetLeadStatus { id: String, status: LeadStatus },
}

/// Bridges the UI to the backend: receives [`SyncCommand`]s, performs them
/// against the [`CrmApi`], and broadcasts [`EventEnvelope`]s for the
/// reducer to fold into state.
///
/// Every command runs on its own task, so a slow request never queues the
/// next one; overlapping loads are allowed and resolved by the sequence
/// stamps the reducer checks. A successful create/patch is followed by a
/// reload of the owning collection; a failed one emits only the failure.
#[derive(Clone)]
pub struct SyncWorker {
    api: Arc<dyn CrmApi>,
    event_tx: broadcast::Sender<EventEnvelope>,
    next_event_id: Arc<AtomicU64>,
    seqs: Arc<Seqs>,
}

/// Per-resource load sequence counters
#[derive(Default)]
struct Seqs {
    leads: AtomicU64,
    deals: AtomicU64,
    tasks: AtomicU64,
    dashboard: AtomicU64,
}

impl Seqs {
    fn next(&self, resource: Resource) -> u64 {
        let counter = match resource {
            Resource::Leads => &self.leads,
            Resource::Deals => &self.deals,
            Resource::Tasks => &self.tasks,
            Resource::Dashboard => &self.dashboard,
        };
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl SyncWorker {
    pub fn new(api: Arc<dyn CrmApi>, event_tx: broadcast::Sender<EventEnvelope>) -> Self {
        Self {
            api,
            event_tx,
            next_event_id: Arc::new(AtomicU64::new(1)),
            seqs: Arc::new(Seqs::default()),
        }
    }

    /// Run until the command channel closes
    pub async fn run(self, mut command_rx: mpsc::Receiver<SyncCommand>) {
        while let Some(cmd) = command_rx.recv().await {
            self.dispatch(cmd);
        }
    }

    /// Start the command on its own task and return immediately
    fn dispatch(&self, cmd: SyncCommand) {
        let worker = self.clone();
        tokio::spawn(async move { worker.perform(cmd).await });
    }

    async fn perform(&self, cmd: SyncCommand) {
        match cmd {
            SyncCommand::Load(resource) => self.load(resource).await,
            SyncCommand::AddLead(lead) => {
                let result = self.api.create_lead(lead).await;
                self.finish_mutation(MutationAction::AddLead, Resource::Leads, result)
                    .await;
            }
            SyncCommand::AddDeal(deal) => {
                let result = self.api.create_deal(deal).await;
                self.finish_mutation(MutationAction::AddDeal, Resource::Deals, result)
                    .await;
            }
            SyncCommand::AddTask(task) => {
                let result = self.api.create_task(task).await;
                self.finish_mutation(MutationAction::AddTask, Resource::Tasks, result)
                    .await;
            }
            SyncCommand::SetLeadStatus { id, status } => {
                let result = self.api.patch_lead_status(&id, status).await;
                self.finish_mutation(MutationAction::SetLeadStatus, Resource::Leads, result)
                    .await;
            }
        }
    }

    async fn load(&self, resource: Resource) {
        let seq = self.seqs.next(resource);
        self.emit(SyncEvent::Loading { resource, seq });

        let event = match resource {
            Resource::Leads => match self.api.list_leads().await {
                Ok(rows) => SyncEvent::LeadsLoaded { seq, rows },
                Err(error) => SyncEvent::LoadFailed {
                    resource,
                    seq,
                    error,
                },
            },
            Resource::Deals => match self.api.list_deals().await {
                Ok(rows) => SyncEvent::DealsLoaded { seq, rows },
                Err(error) => SyncEvent::LoadFailed {
                    resource,
                    seq,
                    error,
                },
            },
            Resource::Tasks => match self.api.list_tasks().await {
                Ok(rows) => SyncEvent::TasksLoaded { seq, rows },
                Err(error) => SyncEvent::LoadFailed {
                    resource,
                    seq,
                    error,
                },
            },
            Resource::Dashboard => match self.api.fetch_summary().await {
                Ok(summary) => SyncEvent::SummaryLoaded { seq, summary },
                Err(error) => SyncEvent::LoadFailed {
                    resource,
                    seq,
                    error,
                },
            },
        };
        self.emit(event);
    }

    async fn finish_mutation(
        &self,
        action: MutationAction,
        owner: Resource,
        result: Result<(), ApiError>,
    ) {
        match result {
            Ok(()) => {
                self.emit(SyncEvent::Mutated { action });
                // Reload only the owning collection; the dashboard stays
                // as-is until its screen is next visited
                self.load(owner).await;
            }
            Err(error) => self.emit(SyncEvent::MutationFailed { action, error }),
        }
    }

    fn emit(&self, event: SyncEvent) {
        let env = EventEnvelope {
            id: self.next_event_id.fetch_add(1, Ordering::SeqCst),
            at: SystemTime::now(),
            event,
        };
        // A send error means no receiver is listening; dropped UI
        // refreshes are fine, the write itself already happened
        let _ = self.event_tx.send(env);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::FakeApi;
    use pipetop_core::reducer::reduce;
    use pipetop_core::state::{AppState, LoadPhase};

    fn start_worker(
        api: Arc<dyn CrmApi>,
    ) -> (
        mpsc::Sender<SyncCommand>,
        broadcast::Receiver<EventEnvelope>,
    ) {
        let (event_tx, event_rx) = broadcast::channel(1_000);
        let (command_tx, command_rx) = mpsc::channel(100);
        tokio::spawn(SyncWorker::new(api, event_tx).run(command_rx));
        (command_tx, event_rx)
    }

    async fn fold_next(
        rx: &mut broadcast::Receiver<EventEnvelope>,
        state: &mut AppState,
    ) -> SyncEvent {
        let env = rx.recv().await.unwrap();
        reduce(state, &env);
        env.event
    }

    #[tokio::test]
    async fn test_load_emits_loading_then_rows() {
        let (tx, mut rx) = start_worker(Arc::new(FakeApi::default()));
        let mut state = AppState::new();

        tx.send(SyncCommand::Load(Resource::Leads)).await.unwrap();

        let first = fold_next(&mut rx, &mut state).await;
        assert!(matches!(
            first,
            SyncEvent::Loading {
                resource: Resource::Leads,
                seq: 1
            }
        ));
        assert!(state.leads.phase.is_loading());

        let second = fold_next(&mut rx, &mut state).await;
        assert!(matches!(second, SyncEvent::LeadsLoaded { seq: 1, .. }));
        assert_eq!(state.leads.phase, LoadPhase::Loaded);
        assert!(!state.leads.is_empty());
    }

    #[tokio::test]
    async fn test_successful_mutation_reloads_owning_collection() {
        let (tx, mut rx) = start_worker(Arc::new(FakeApi::empty()));
        let mut state = AppState::new();

        tx.send(SyncCommand::AddLead(NewLead {
            name: "Ada".into(),
            email: "".into(),
        }))
        .await
        .unwrap();

        let first = fold_next(&mut rx, &mut state).await;
        assert!(matches!(
            first,
            SyncEvent::Mutated {
                action: MutationAction::AddLead
            }
        ));
        assert!(matches!(
            fold_next(&mut rx, &mut state).await,
            SyncEvent::Loading {
                resource: Resource::Leads,
                ..
            }
        ));
        assert!(matches!(
            fold_next(&mut rx, &mut state).await,
            SyncEvent::LeadsLoaded { .. }
        ));

        assert_eq!(state.leads.rows.len(), 1);
        assert_eq!(state.leads.rows[0].name, "Ada");
        assert_eq!(state.leads.rows[0].status, LeadStatus::New);
    }

    #[tokio::test]
    async fn test_failed_mutation_emits_only_the_failure() {
        let (tx, mut rx) = start_worker(Arc::new(FakeApi::empty()));
        let mut state = AppState::new();

        tx.send(SyncCommand::SetLeadStatus {
            id: "missing".into(),
            status: LeadStatus::Qualified,
        })
        .await
        .unwrap();

        let event = fold_next(&mut rx, &mut state).await;
        assert!(matches!(
            event,
            SyncEvent::MutationFailed {
                action: MutationAction::SetLeadStatus,
                error: ApiError::Status { code: 404 }
            }
        ));
        // No reload follows a failed write
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
        assert!(state.leads.is_empty());
        assert_eq!(state.leads.phase, LoadPhase::Idle);
    }

    #[tokio::test]
    async fn test_qualify_round_trip_through_reducer() {
        let (tx, mut rx) = start_worker(Arc::new(FakeApi::empty()));
        let mut state = AppState::new();

        tx.send(SyncCommand::AddLead(NewLead {
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }))
        .await
        .unwrap();
        for _ in 0..3 {
            fold_next(&mut rx, &mut state).await;
        }
        let id = state.leads.rows[0].id.clone();

        tx.send(SyncCommand::SetLeadStatus {
            id,
            status: LeadStatus::Qualified,
        })
        .await
        .unwrap();
        for _ in 0..3 {
            fold_next(&mut rx, &mut state).await;
        }

        assert_eq!(state.leads.rows.len(), 1);
        assert_eq!(state.leads.rows[0].status, LeadStatus::Qualified);
        let notice = state.notice.as_ref().unwrap();
        assert!(notice.ok);
        assert_eq!(notice.text, "lead updated");
    }

    #[tokio::test]
    async fn test_loads_of_different_resources_use_independent_seqs() {
        let (tx, mut rx) = start_worker(Arc::new(FakeApi::empty()));
        let mut state = AppState::new();

        tx.send(SyncCommand::Load(Resource::Dashboard)).await.unwrap();
        for _ in 0..2 {
            fold_next(&mut rx, &mut state).await;
        }
        tx.send(SyncCommand::Load(Resource::Tasks)).await.unwrap();
        let event = fold_next(&mut rx, &mut state).await;

        // Tasks start their own sequence at 1 regardless of prior
        // dashboard loads
        assert!(matches!(
            event,
            SyncEvent::Loading {
                resource: Resource::Tasks,
                seq: 1
            }
        ));
    }
}
