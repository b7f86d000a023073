use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pipetop_core::api::{ApiError, CrmApi};
use pipetop_core::model::{
    Activity, DashboardSummary, Deal, Lead, LeadStatus, NewDeal, NewLead, NewTask, PipelineStage,
    SummaryCards, Task, TaskKind,
};

/// In-memory backend for demo mode and worker tests.
///
/// Behaves like the real backend where it matters: creates append in
/// arrival order, blank required fields are rejected with a 422, patching
/// an unknown lead is a 404, and the summary is recomputed from the
/// current records so writes show up on the dashboard screen.
pub struct FakeApi {
    records: Mutex<Records>,
    next_id: AtomicU64,
    latency: Duration,
}

struct Records {
    leads: Vec<Lead>,
    deals: Vec<Deal>,
    tasks: Vec<Task>,
    activities: Vec<Activity>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            records: Mutex::new(Records::demo()),
            next_id: AtomicU64::new(11),
            // Enough lag to make the loading phase visible in the TUI
            latency: Duration::from_millis(150),
        }
    }
}

impl FakeApi {
    /// No seed records and no artificial latency
    pub fn empty() -> Self {
        Self {
            records: Mutex::new(Records {
                leads: Vec::new(),
                deals: Vec::new(),
                tasks: Vec::new(),
                activities: Vec::new(),
            }),
            next_id: AtomicU64::new(1),
            latency: Duration::ZERO,
        }
    }

    #[allow(dead_code)]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn next_id(&self) -> String {
        format!("f{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn lag(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Records {
    fn demo() -> Self {
        let lead = |id: &str, name: &str, email: &str, status: LeadStatus| Lead {
            id: id.into(),
            name: name.into(),
            email: if email.is_empty() {
                None
            } else {
                Some(email.into())
            },
            status,
        };
        let deal = |id: &str, title: &str, value: f64, stage: &str| Deal {
            id: id.into(),
            title: title.into(),
            value,
            stage: stage.into(),
        };
        let task = |id: &str, title: &str, kind: TaskKind, completed: bool| Task {
            id: id.into(),
            title: title.into(),
            kind,
            completed,
        };
        let activity = |subject: &str, kind: &str, when: &str| Activity {
            subject: subject.into(),
            kind: kind.into(),
            created_at: when.into(),
        };

        Self {
            leads: vec![
                lead("f1", "Ava Collins", "ava@northwind.dev", LeadStatus::Qualified),
                lead("f2", "Noah Patel", "noah@brightline.io", LeadStatus::New),
                lead("f3", "Mia Torres", "", LeadStatus::New),
                lead("f4", "Liam Chen", "liam@graphitehq.com", LeadStatus::Lost),
            ],
            deals: vec![
                deal("f5", "Website revamp", 12000.0, "Proposal"),
                deal("f6", "Annual support renewal", 8000.0, "Negotiation"),
                deal("f7", "Onboarding package", 3500.0, "Prospecting"),
            ],
            tasks: vec![
                task("f8", "Intro call with Ava", TaskKind::Call, true),
                task("f9", "Send proposal to Noah", TaskKind::Email, false),
                task("f10", "Quarterly check-in", TaskKind::FollowUp, false),
            ],
            activities: vec![
                activity("Intro call with Ava", "call", "3d ago"),
                activity("Send proposal to Noah", "email", "2d ago"),
                activity("Quarterly check-in", "follow-up", "yesterday"),
            ],
        }
    }

    fn summary(&self) -> DashboardSummary {
        let qualified = self
            .leads
            .iter()
            .filter(|l| l.status == LeadStatus::Qualified)
            .count();
        let conversion_rate = if self.leads.is_empty() {
            0.0
        } else {
            let rate = qualified as f64 * 100.0 / self.leads.len() as f64;
            (rate * 10.0).round() / 10.0
        };

        // Group deals by stage, first-seen order
        let mut pipeline: Vec<PipelineStage> = Vec::new();
        for deal in &self.deals {
            match pipeline.iter_mut().find(|p| p.stage == deal.stage) {
                Some(entry) => entry.count += 1,
                None => pipeline.push(PipelineStage {
                    stage: deal.stage.clone(),
                    count: 1,
                }),
            }
        }

        let recent_activities = self.activities.iter().rev().take(5).cloned().collect();

        DashboardSummary {
            cards: SummaryCards {
                total_leads: self.leads.len() as u64,
                total_deals: self.deals.len() as u64,
                revenue: self.deals.iter().map(|d| d.value).sum(),
                conversion_rate,
            },
            pipeline,
            recent_activities,
        }
    }
}

fn reject_blank(field: &str) -> Result<(), ApiError> {
    if field.trim().is_empty() {
        // Same contract as the real backend's required-field validation
        Err(ApiError::Status { code: 422 })
    } else {
        Ok(())
    }
}

#[async_trait]
impl CrmApi for FakeApi {
    async fn fetch_summary(&self) -> Result<DashboardSummary, ApiError> {
        self.lag().await;
        Ok(self.records.lock().await.summary())
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, ApiError> {
        self.lag().await;
        Ok(self.records.lock().await.leads.clone())
    }

    async fn create_lead(&self, lead: NewLead) -> Result<(), ApiError> {
        self.lag().await;
        reject_blank(&lead.name)?;
        let mut records = self.records.lock().await;
        records.leads.push(Lead {
            id: self.next_id(),
            name: lead.name,
            email: if lead.email.is_empty() {
                None
            } else {
                Some(lead.email)
            },
            status: LeadStatus::New,
        });
        Ok(())
    }

    async fn patch_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), ApiError> {
        self.lag().await;
        let mut records = self.records.lock().await;
        match records.leads.iter_mut().find(|l| l.id == id) {
            Some(lead) => {
                lead.status = status;
                Ok(())
            }
            None => Err(ApiError::Status { code: 404 }),
        }
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.lag().await;
        Ok(self.records.lock().await.deals.clone())
    }

    async fn create_deal(&self, deal: NewDeal) -> Result<(), ApiError> {
        self.lag().await;
        reject_blank(&deal.title)?;
        let mut records = self.records.lock().await;
        records.deals.push(Deal {
            id: self.next_id(),
            title: deal.title,
            value: deal.value,
            // New deals enter the pipeline at its first stage
            stage: "Prospecting".into(),
        });
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.lag().await;
        Ok(self.records.lock().await.tasks.clone())
    }

    async fn create_task(&self, task: NewTask) -> Result<(), ApiError> {
        self.lag().await;
        reject_blank(&task.title)?;
        let mut records = self.records.lock().await;
        records.tasks.push(Task {
            id: self.next_id(),
            title: task.title.clone(),
            kind: task.kind,
            completed: false,
        });
        records.activities.push(Activity {
            subject: task.title,
            kind: task.kind.label().into(),
            created_at: "just now".into(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "demo"
    }
}
