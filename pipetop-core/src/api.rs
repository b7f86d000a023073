use async_trait::async_trait;

use crate::model::{DashboardSummary, Deal, Lead, LeadStatus, NewDeal, NewLead, NewTask, Task};

/// Failure of a single round trip against the backend
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiError {
    /// Network unreachable, DNS failure, connection reset
    Transport { detail: String },
    /// Response body was not valid JSON for the expected shape
    Decode { detail: String },
    /// Backend answered with a non-2xx status
    Status { code: u16 },
}

impl ApiError {
    /// Short tag for status lines and log output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Decode { .. } => "decode",
            Self::Status { .. } => "status",
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { detail } => write!(f, "transport error: {}", detail),
            Self::Decode { detail } => write!(f, "decode error: {}", detail),
            Self::Status { code } => write!(f, "backend returned HTTP {}", code),
        }
    }
}

impl std::error::Error for ApiError {}

/// The CrmApi trait defines the REST surface this client consumes.
///
/// Implementations:
/// - `HttpApi`: talks to a real backend over HTTP
/// - `FakeApi`: in-memory records for demo mode and tests
///
/// Contract notes:
/// - Lists return the backend's ordering untouched.
/// - Creates and patches ignore any response body; callers resynchronize
///   with a follow-up list call instead of patching local state.
/// - No retries and no timeout beyond the platform default: every failure
///   surfaces to the caller on the first attempt.
#[async_trait]
pub trait CrmApi: Send + Sync {
    async fn fetch_summary(&self) -> Result<DashboardSummary, ApiError>;

    async fn list_leads(&self) -> Result<Vec<Lead>, ApiError>;
    async fn create_lead(&self, lead: NewLead) -> Result<(), ApiError>;
    async fn patch_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), ApiError>;

    async fn list_deals(&self) -> Result<Vec<Deal>, ApiError>;
    async fn create_deal(&self, deal: NewDeal) -> Result<(), ApiError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError>;
    async fn create_task(&self, task: NewTask) -> Result<(), ApiError>;

    /// Name of this backend implementation, shown in the TUI footer
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let e = ApiError::Status { code: 404 };
        assert_eq!(e.to_string(), "backend returned HTTP 404");
        assert_eq!(e.kind(), "status");

        let e = ApiError::Transport {
            detail: "connection refused".into(),
        };
        assert!(e.to_string().contains("connection refused"));
    }
}
