use crate::api::ApiError;
use crate::model::{Activity, DashboardSummary, Deal, Lead, PipelineStage, SummaryCards, Task};

/// Which screen the UI is showing; pure navigation state, no I/O
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Screen {
    #[default]
    Dashboard,
    Leads,
    Deals,
    Tasks,
}

impl Screen {
    pub const ALL: [Screen; 4] = [Screen::Dashboard, Screen::Leads, Screen::Deals, Screen::Tasks];

    pub fn label(&self) -> &'static str {
        match self {
            Screen::Dashboard => "Dashboard",
            Screen::Leads => "Leads",
            Screen::Deals => "Deals",
            Screen::Tasks => "Tasks",
        }
    }

    pub fn key(&self) -> char {
        match self {
            Screen::Dashboard => '1',
            Screen::Leads => '2',
            Screen::Deals => '3',
            Screen::Tasks => '4',
        }
    }

    /// The backend resource this screen renders
    pub fn resource(&self) -> Resource {
        match self {
            Screen::Dashboard => Resource::Dashboard,
            Screen::Leads => Resource::Leads,
            Screen::Deals => Resource::Deals,
            Screen::Tasks => Resource::Tasks,
        }
    }
}

/// One loadable backend resource: the three record collections plus
/// the precomputed dashboard summary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    Leads,
    Deals,
    Tasks,
    Dashboard,
}

impl Resource {
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Leads => "leads",
            Resource::Deals => "deals",
            Resource::Tasks => "tasks",
            Resource::Dashboard => "dashboard",
        }
    }
}

/// Load lifecycle of one resource
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    LoadFailed { error: ApiError },
}

impl LoadPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::Loading)
    }
}

/// Client-side snapshot of one backend collection.
///
/// `rows` always holds the last successful load, in backend order; it is
/// never patched locally after a write (the follow-up reload is the only
/// way rows change). `issued_seq` is the newest load sequence issued for
/// this collection; completions stamped with an older value are stale and
/// get discarded by the reducer.
#[derive(Clone, Debug)]
pub struct CollectionState<T> {
    pub rows: Vec<T>,
    pub phase: LoadPhase,
    pub issued_seq: u64,
}

impl<T> CollectionState<T> {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            phase: LoadPhase::Idle,
            issued_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<T> Default for CollectionState<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Dashboard summary snapshot.
///
/// `summary` is a plain value, not an option: until the first successful
/// load (and after a failed one) it holds the all-zero default, so view
/// code never branches on "data is missing" — only on empty collections.
#[derive(Clone, Debug, Default)]
pub struct SummaryState {
    pub summary: DashboardSummary,
    pub phase: LoadPhase,
    pub issued_seq: u64,
}

impl SummaryState {
    pub fn cards(&self) -> SummaryCards {
        self.summary.cards
    }

    pub fn pipeline(&self) -> &[PipelineStage] {
        &self.summary.pipeline
    }

    pub fn recent_activities(&self) -> &[Activity] {
        &self.summary.recent_activities
    }
}

/// Outcome of the most recent operation, for the footer status line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub ok: bool,
    pub text: String,
}

impl Notice {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            ok: true,
            text: text.into(),
        }
    }

    pub fn err(text: impl Into<String>) -> Self {
        Self {
            ok: false,
            text: text.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub screen: Screen,
    pub leads: CollectionState<Lead>,
    pub deals: CollectionState<Deal>,
    pub tasks: CollectionState<Task>,
    pub dashboard: SummaryState,
    pub last_event_id: u64,
    /// Most recent operation outcome; None until the first one completes
    pub notice: Option<Notice>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, resource: Resource) -> &LoadPhase {
        match resource {
            Resource::Leads => &self.leads.phase,
            Resource::Deals => &self.deals.phase,
            Resource::Tasks => &self.tasks.phase,
            Resource::Dashboard => &self.dashboard.phase,
        }
    }

    pub fn issued_seq(&self, resource: Resource) -> u64 {
        match resource {
            Resource::Leads => self.leads.issued_seq,
            Resource::Deals => self.deals.issued_seq,
            Resource::Tasks => self.tasks.issued_seq,
            Resource::Dashboard => self.dashboard.issued_seq,
        }
    }

    /// Phase and sequence slot for one resource, for the reducer
    pub fn slot_mut(&mut self, resource: Resource) -> (&mut LoadPhase, &mut u64) {
        match resource {
            Resource::Leads => (&mut self.leads.phase, &mut self.leads.issued_seq),
            Resource::Deals => (&mut self.deals.phase, &mut self.deals.issued_seq),
            Resource::Tasks => (&mut self.tasks.phase, &mut self.tasks.issued_seq),
            Resource::Dashboard => (&mut self.dashboard.phase, &mut self.dashboard.issued_seq),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_screen_is_dashboard() {
        let state = AppState::new();
        assert_eq!(state.screen, Screen::Dashboard);
    }

    #[test]
    fn test_screen_resource_mapping() {
        assert_eq!(Screen::Leads.resource(), Resource::Leads);
        assert_eq!(Screen::Dashboard.resource(), Resource::Dashboard);
        assert_eq!(Screen::ALL.len(), 4);
    }

    #[test]
    fn test_unloaded_summary_is_all_zeroes() {
        let state = AppState::new();
        let cards = state.dashboard.cards();
        assert_eq!(cards.total_leads, 0);
        assert_eq!(cards.total_deals, 0);
        assert_eq!(cards.revenue, 0.0);
        assert_eq!(cards.conversion_rate, 0.0);
        assert!(state.dashboard.pipeline().is_empty());
        assert!(state.dashboard.recent_activities().is_empty());
    }

    #[test]
    fn test_collection_starts_idle_and_empty() {
        let state = AppState::new();
        assert!(state.leads.is_empty());
        assert_eq!(state.leads.phase, LoadPhase::Idle);
        assert_eq!(state.leads.issued_seq, 0);
    }
}
