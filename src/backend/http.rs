//! Dispatch API client over HTTP/JSON

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{DispatchBackend, RejectionKind, ScanOutcome, SorterStats, UndoOutcome};
use crate::error::BackendError;
use crate::route::{DriverId, ParcelId, Route};

const DRIVER_ROLE: &str = "chauffeur";

pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lastmile/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        debug!(path, "GET");
        let resp = self.authorized(self.client.get(self.url(path))).send().await?;
        decode(resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, BackendError> {
        debug!(path, "POST");
        let resp = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }
}

#[async_trait]
impl DispatchBackend for HttpBackend {
    async fn fetch_route(&self, driver_id: DriverId) -> Result<Route, BackendError> {
        self.get(&format!("/dispatch/drivers/{}/route", driver_id)).await
    }

    async fn commit_reorder(
        &self,
        driver_id: DriverId,
        ordered_parcel_ids: &[ParcelId],
    ) -> Result<Route, BackendError> {
        let body = ReorderRequest {
            parcel_ids: ordered_parcel_ids,
        };
        self.post(&format!("/dispatch/drivers/{}/route/reorder", driver_id), &body)
            .await
    }

    async fn scan_tracking_number(&self, tracking_no: &str) -> Result<ScanOutcome, BackendError> {
        let resp: ScanResponse = self.post("/sorting/scan", &ScanRequest { tracking_no }).await?;
        Ok(resp.into_outcome(tracking_no))
    }

    async fn undo_scan(&self, tracking_no: &str) -> Result<UndoOutcome, BackendError> {
        let resp: UndoResponse = self.post("/sorting/unscan", &ScanRequest { tracking_no }).await?;
        Ok(resp.into_outcome())
    }

    async fn sorter_stats(&self) -> Result<SorterStats, BackendError> {
        self.get("/sorting/stats").await
    }

    async fn list_drivers(&self) -> Result<Vec<DriverId>, BackendError> {
        let users: Vec<UserItem> = self.get("/users").await?;
        Ok(driver_ids(users))
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Serialize)]
struct ReorderRequest<'a> {
    parcel_ids: &'a [ParcelId],
}

#[derive(Serialize)]
struct ScanRequest<'a> {
    tracking_no: &'a str,
}

#[derive(Debug, Deserialize)]
struct ScanResponse {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    tracking_no: Option<String>,
    #[serde(default)]
    driver_name: Option<String>,
    #[serde(default)]
    bag_position: Option<u32>,
    #[serde(default)]
    already_sorted: bool,
}

impl ScanResponse {
    /// The API reports duplicates as `success` with `already_sorted` set.
    fn into_outcome(self, requested: &str) -> ScanOutcome {
        if self.already_sorted {
            ScanOutcome::Rejected {
                kind: RejectionKind::AlreadySorted,
                message: self.message,
            }
        } else if self.success {
            ScanOutcome::Accepted {
                tracking_no: self.tracking_no.unwrap_or_else(|| requested.to_string()),
                driver_name: self.driver_name,
                bag_position: self.bag_position,
                message: self.message,
            }
        } else {
            ScanOutcome::Rejected {
                kind: RejectionKind::NotFound,
                message: self.message,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UndoResponse {
    success: bool,
    #[serde(default)]
    message: String,
}

impl UndoResponse {
    fn into_outcome(self) -> UndoOutcome {
        if self.success {
            UndoOutcome::Accepted { message: self.message }
        } else {
            UndoOutcome::Rejected { message: self.message }
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserItem {
    id: DriverId,
    #[serde(default)]
    role: String,
}

/// Ids of the users holding the driver role, in response order.
fn driver_ids(users: Vec<UserItem>) -> Vec<DriverId> {
    users
        .into_iter()
        .filter(|u| u.role == DRIVER_ROLE)
        .map(|u| u.id)
        .collect()
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return resp
            .json::<T>()
            .await
            .map_err(|e| BackendError::transport(format!("invalid response body: {}", e)));
    }
    let body = resp.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

/// Requests the server understood and declined are rejections; anything
/// else (auth, throttling, server faults) is a transport failure.
fn classify_failure(status: StatusCode, body: &str) -> BackendError {
    let message = detail_message(body).unwrap_or_else(|| format!("unexpected status {}", status));
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::NOT_FOUND
        | StatusCode::CONFLICT
        | StatusCode::UNPROCESSABLE_ENTITY => BackendError::rejected(message),
        _ => BackendError::transport(format!("{} ({})", message, status)),
    }
}

fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}
