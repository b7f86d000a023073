use serde::{Deserialize, Deserializer, Serialize};

/// Backend-assigned record identity (Mongo-style object id string)
pub type RecordId = String;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Qualified,
    Lost,
}

impl LeadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Lost => "lost",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskKind {
    Call,
    Meeting,
    #[default]
    FollowUp,
    Email,
}

impl TaskKind {
    pub const ALL: [TaskKind; 4] = [
        TaskKind::Call,
        TaskKind::Meeting,
        TaskKind::FollowUp,
        TaskKind::Email,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Call => "call",
            TaskKind::Meeting => "meeting",
            TaskKind::FollowUp => "follow-up",
            TaskKind::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" => Some(TaskKind::Call),
            "meeting" => Some(TaskKind::Meeting),
            "follow-up" | "followup" => Some(TaskKind::FollowUp),
            "email" => Some(TaskKind::Email),
            _ => None,
        }
    }

    /// Next kind in display order (used by the add-form kind selector)
    pub fn next(&self) -> Self {
        match self {
            TaskKind::Call => TaskKind::Meeting,
            TaskKind::Meeting => TaskKind::FollowUp,
            TaskKind::FollowUp => TaskKind::Email,
            TaskKind::Email => TaskKind::Call,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Lead {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: LeadStatus,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Deal {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub title: String,
    /// Stored as JSON null when the creating client held non-numeric input
    #[serde(default, deserialize_with = "null_to_zero")]
    pub value: f64,
    /// Pipeline stage, assigned by the backend; opaque to this client
    #[serde(default, deserialize_with = "null_to_empty")]
    pub stage: String,
}

/// The backend returns fields exactly as stored, nulls included; a null
/// decodes like an absent key instead of rejecting the whole collection.
fn null_to_zero<'de, D>(de: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(de)?.unwrap_or(0.0))
}

fn null_to_empty<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(de)?.unwrap_or_default())
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Task {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub completed: bool,
}

/// Create payload for POST /api/leads
#[derive(Clone, Debug, Serialize)]
pub struct NewLead {
    pub name: String,
    /// Sent as-is, empty string included; the backend decides what to store
    pub email: String,
}

/// Create payload for POST /api/deals
#[derive(Clone, Debug, Serialize)]
pub struct NewDeal {
    pub title: String,
    pub value: f64,
}

/// Create payload for POST /api/tasks
#[derive(Clone, Debug, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryCards {
    pub total_leads: u64,
    pub total_deals: u64,
    pub revenue: f64,
    pub conversion_rate: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineStage {
    pub stage: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Activity {
    pub subject: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: String,
}

/// Precomputed dashboard aggregate served by GET /api/dashboard.
///
/// Every field is optional on the wire; missing fields decode to
/// zero/empty so the presentation layer never sees an absent value.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSummary {
    pub cards: SummaryCards,
    pub pipeline: Vec<PipelineStage>,
    pub recent_activities: Vec<Activity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_decodes_wire_names() {
        let json = r#"{"_id":"65a1","name":"Ada","email":"ada@example.com","status":"qualified"}"#;
        let lead: Lead = serde_json::from_str(json).unwrap();
        assert_eq!(lead.id, "65a1");
        assert_eq!(lead.name, "Ada");
        assert_eq!(lead.email.as_deref(), Some("ada@example.com"));
        assert_eq!(lead.status, LeadStatus::Qualified);
    }

    #[test]
    fn test_lead_defaults_when_fields_absent() {
        let lead: Lead = serde_json::from_str(r#"{"_id":"1","name":"Bo"}"#).unwrap();
        assert_eq!(lead.email, None);
        assert_eq!(lead.status, LeadStatus::New);
    }

    #[test]
    fn test_deal_null_fields_decode_to_defaults() {
        // One null-valued record must not reject the whole list
        let json = r#"[
            {"_id":"d1","title":"Pilot","value":null,"stage":"Proposal"},
            {"_id":"d2","title":"Renewal","value":8000.5,"stage":null}
        ]"#;
        let deals: Vec<Deal> = serde_json::from_str(json).unwrap();
        assert_eq!(deals[0].value, 0.0);
        assert_eq!(deals[0].stage, "Proposal");
        assert_eq!(deals[1].value, 8000.5);
        assert_eq!(deals[1].stage, "");
    }

    #[test]
    fn test_deal_defaults_when_fields_absent() {
        let deal: Deal = serde_json::from_str(r#"{"_id":"d3","title":"Pilot"}"#).unwrap();
        assert_eq!(deal.value, 0.0);
        assert_eq!(deal.stage, "");
    }

    #[test]
    fn test_task_kind_wire_values() {
        let task: Task =
            serde_json::from_str(r#"{"_id":"t1","title":"Call Ada","type":"follow-up"}"#).unwrap();
        assert_eq!(task.kind, TaskKind::FollowUp);
        assert!(!task.completed);

        let payload = serde_json::to_value(NewTask {
            title: "Call Ada".into(),
            kind: TaskKind::FollowUp,
        })
        .unwrap();
        assert_eq!(payload["type"], "follow-up");
    }

    #[test]
    fn test_task_kind_parse() {
        assert_eq!(TaskKind::parse("Email"), Some(TaskKind::Email));
        assert_eq!(TaskKind::parse("followup"), Some(TaskKind::FollowUp));
        assert_eq!(TaskKind::parse("sprint"), None);
    }

    #[test]
    fn test_summary_decodes_nested_cards() {
        let json = r#"{
            "cards": {"totalLeads": 12, "totalDeals": 4, "revenue": 9000.5, "conversionRate": 33.3},
            "pipeline": [{"stage": "Prospecting", "count": 3}],
            "recentActivities": [{"subject": "Intro call", "type": "call", "created_at": "2026-08-20"}]
        }"#;
        let summary: DashboardSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.cards.total_leads, 12);
        assert_eq!(summary.cards.conversion_rate, 33.3);
        assert_eq!(summary.pipeline[0].stage, "Prospecting");
        assert_eq!(summary.recent_activities[0].kind, "call");
    }

    #[test]
    fn test_summary_empty_body_is_all_zeroes() {
        let summary: DashboardSummary = serde_json::from_str("{}").unwrap();
        assert_eq!(summary.cards.total_leads, 0);
        assert_eq!(summary.cards.revenue, 0.0);
        assert!(summary.pipeline.is_empty());
        assert!(summary.recent_activities.is_empty());
    }
}
