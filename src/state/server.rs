//! Server-side paging contract.
//!
//! The engine derives requests and reconciles responses by cache key;
//! transport belongs to the host.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::state::data_model::Record;
use crate::state::filter::FilterModel;
use crate::state::sort::SortModel;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
    pub sort_model: SortModel,
    pub filter_model: FilterModel,
    pub quick_filter_text: String,
}

impl PageRequest {
    /// Stable key: equal requests serialize identically.
    pub fn cache_key(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub data: Vec<Record>,
    pub total_rows: usize,
    pub page: usize,
    pub page_size: usize,
}

#[derive(Clone, Debug)]
pub struct PendingRequest {
    pub key: String,
    pub request: PageRequest,
    pub cancel: CancellationToken,
}

/// Tracks the one request whose response is still wanted.
#[derive(Debug, Default)]
pub struct ServerPaging {
    current_key: Option<String>,
    cancel: Option<CancellationToken>,
    response: Option<PageResponse>,
}

impl ServerPaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_key(&self) -> Option<&str> {
        self.current_key.as_deref()
    }

    pub fn response(&self) -> Option<&PageResponse> {
        self.response.as_ref()
    }

    /// Starts a request unless one with the same key is already current.
    /// The superseded request's token is cancelled.
    pub fn request(&mut self, request: PageRequest) -> Option<PendingRequest> {
        let key = request.cache_key();
        if self.current_key.as_deref() == Some(key.as_str()) {
            return None;
        }
        if let Some(previous) = self.cancel.take() {
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.current_key = Some(key.clone());
        self.cancel = Some(cancel.clone());
        Some(PendingRequest {
            key,
            request,
            cancel,
        })
    }

    /// Accepts a response only if `key` is still current.
    pub fn receive(&mut self, key: &str, response: PageResponse) -> Option<&PageResponse> {
        if self.current_key.as_deref() != Some(key) {
            debug!(key, "dropping stale page response");
            return None;
        }
        self.cancel = None;
        self.response = Some(response);
        self.response.as_ref()
    }

    /// Forgets the current key so the next request is issued even if unchanged.
    pub fn invalidate(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.current_key = None;
    }
}

/// Runs `fetch` for a pending request, resolving to `None` if the request is
/// superseded first.
pub async fn run_request<F, Fut, E>(pending: PendingRequest, fetch: F) -> Option<(String, Result<PageResponse, E>)>
where
    F: FnOnce(PageRequest) -> Fut,
    Fut: Future<Output = Result<PageResponse, E>>,
{
    let PendingRequest {
        key,
        request,
        cancel,
    } = pending;
    tokio::select! {
        _ = cancel.cancelled() => None,
        result = fetch(request) => Some((key, result)),
    }
}
