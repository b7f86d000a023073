use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use pipetop_core::api::{ApiError, CrmApi};
use pipetop_core::model::{
    DashboardSummary, Deal, Lead, LeadStatus, NewDeal, NewLead, NewTask, Task,
};

/// REST client for a running Pipetop backend.
///
/// Paths are appended to `base` as-is, so `base` must not carry a trailing
/// slash (`Config::effective_base_url` already trims it). Every request is
/// a single attempt: no retries, no backoff, only the client's platform
/// default timeout.
pub struct HttpApi {
    client: reqwest::Client,
    base: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                code: status.as_u16(),
            });
        }

        let body = resp.bytes().await.map_err(transport)?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            detail: e.to_string(),
        })
    }

    /// POST a JSON payload. A success body is never parsed; callers
    /// resynchronize with a follow-up list call.
    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        ok_or_status(resp)
    }

    async fn patch_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<(), ApiError> {
        let resp = self
            .client
            .patch(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        ok_or_status(resp)
    }
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport {
        detail: e.to_string(),
    }
}

fn ok_or_status(resp: reqwest::Response) -> Result<(), ApiError> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status {
            code: status.as_u16(),
        })
    }
}

#[async_trait]
impl CrmApi for HttpApi {
    async fn fetch_summary(&self) -> Result<DashboardSummary, ApiError> {
        self.get_json("/api/dashboard").await
    }

    async fn list_leads(&self) -> Result<Vec<Lead>, ApiError> {
        self.get_json("/api/leads").await
    }

    async fn create_lead(&self, lead: NewLead) -> Result<(), ApiError> {
        self.post_json("/api/leads", &lead).await
    }

    async fn patch_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), ApiError> {
        let path = format!("/api/leads/{}", id);
        self.patch_json(&path, &serde_json::json!({ "status": status }))
            .await
    }

    async fn list_deals(&self) -> Result<Vec<Deal>, ApiError> {
        self.get_json("/api/deals").await
    }

    async fn create_deal(&self, deal: NewDeal) -> Result<(), ApiError> {
        self.post_json("/api/deals", &deal).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        self.get_json("/api/tasks").await
    }

    async fn create_task(&self, task: NewTask) -> Result<(), ApiError> {
        self.post_json("/api/tasks", &task).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Answers exactly one request with a canned HTTP/1.1 response and
    /// hands the raw request back for assertions.
    async fn capture_server(response: String) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            // Drain the full request before answering; a response racing
            // an unread body can surface as a reset on the client side.
            loop {
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
                if request_complete(&raw) {
                    break;
                }
            }
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
        });

        (format!("http://{}", addr), rx)
    }

    async fn one_shot_server(response: String) -> String {
        let (base, _rx) = capture_server(response).await;
        base
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let body_len = text
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + body_len
    }

    fn json_response(status_line: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        )
    }

    #[tokio::test]
    async fn test_fetch_summary_hits_dashboard_path() {
        let body = r#"{"cards":{"totalLeads":7,"totalDeals":2,"revenue":1500.0,"conversionRate":28.5}}"#;
        let (base, request) = capture_server(json_response("200 OK", body)).await;

        let summary = HttpApi::new(base).fetch_summary().await.unwrap();
        assert_eq!(summary.cards.total_leads, 7);
        assert_eq!(summary.cards.revenue, 1500.0);
        assert!(summary.pipeline.is_empty());

        let raw = request.await.unwrap();
        assert!(raw.starts_with("GET /api/dashboard HTTP/1.1\r\n"));
    }

    #[tokio::test]
    async fn test_list_leads_decodes_backend_rows() {
        let body = r#"[{"_id":"65a1","name":"Ada","status":"qualified"},{"_id":"65a2","name":"Bo"}]"#;
        let base = one_shot_server(json_response("200 OK", body)).await;

        let rows = HttpApi::new(base).list_leads().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "65a1");
        assert_eq!(rows[0].status, LeadStatus::Qualified);
        assert_eq!(rows[1].status, LeadStatus::New);
    }

    #[tokio::test]
    async fn test_create_lead_posts_json_body() {
        let (base, request) = capture_server(json_response("201 Created", "{}")).await;

        HttpApi::new(base)
            .create_lead(NewLead {
                name: "Ada".into(),
                email: "".into(),
            })
            .await
            .unwrap();

        let raw = request.await.unwrap();
        assert!(raw.starts_with("POST /api/leads HTTP/1.1\r\n"));
        assert!(raw.to_lowercase().contains("content-type: application/json"));
        assert!(raw.contains(r#"{"name":"Ada","email":""}"#));
    }

    #[tokio::test]
    async fn test_patch_lead_status_targets_record_path() {
        let (base, request) = capture_server(json_response("200 OK", "{}")).await;

        HttpApi::new(base)
            .patch_lead_status("65a1", LeadStatus::Qualified)
            .await
            .unwrap();

        let raw = request.await.unwrap();
        assert!(raw.starts_with("PATCH /api/leads/65a1 HTTP/1.1\r\n"));
        assert!(raw.contains(r#"{"status":"qualified"}"#));
    }

    #[tokio::test]
    async fn test_non_2xx_maps_to_status_error() {
        let base = one_shot_server(json_response(
            "500 Internal Server Error",
            r#"{"error":"boom"}"#,
        ))
        .await;

        let err = HttpApi::new(base).list_deals().await.unwrap_err();
        assert_eq!(err, ApiError::Status { code: 500 });
    }

    #[tokio::test]
    async fn test_malformed_body_maps_to_decode_error() {
        let base = one_shot_server(json_response("200 OK", "not json at all")).await;

        let err = HttpApi::new(base).list_tasks().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_backend_maps_to_transport_error() {
        // Bind then drop so the port is known-closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpApi::new(format!("http://{}", addr))
            .fetch_summary()
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport { .. }));
    }
}
