//! HTTP implementation of [`RecordService`] for a json-server style collection.
//!
//! # Wire format
//!
//! | Operation | Request |
//! |-----------|---------|
//! | list | `GET /{collection}?_start={offset}&_limit={limit}&_sort={field}&_order={asc,desc}[&q=..][&status=..]` |
//! | count | `GET /{collection}?_page=1&_limit=1&_sort=..&_order=..[&q=..][&status=..]`, read `X-Total-Count` |
//! | patch | `PATCH /{collection}/{id}` with `{"votes": n}` |
//! | get | `GET /{collection}/{id}` |
//!
//! Empty parameters are omitted. The server's `q` is a loose full-text match,
//! so rows are narrowed to the name/id substring match afterwards: by the
//! engine for list pages, and here for the count fallback.
//!
//! When the count response lacks `X-Total-Count`, the whole collection is
//! fetched with only the status filter and sort, and the rows passing the
//! search filter are counted.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url, header::HeaderMap};
use serde::Serialize;
use tracklist_types::{Page, Record, RecordFilter, RecordId, SortSpec, Window};

use crate::{
    config::ClientConfig,
    error::{Result, SdkError},
    retry::with_retry,
    service::RecordService,
};

/// Header carrying the exact number of matching rows.
const TOTAL_COUNT_HEADER: &str = "x-total-count";

type Params = Vec<(&'static str, String)>;

/// Record collection reached over HTTP.
///
/// Every request runs under the configured timeout and is retried on
/// transient failures according to the [`RetryPolicy`](crate::RetryPolicy).
#[derive(Debug, Clone)]
pub struct HttpRecordService {
    client: Client,
    config: ClientConfig,
}

#[derive(Serialize)]
struct VotesPatch {
    votes: u64,
}

impl HttpRecordService {
    /// Creates a service for the collection described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| SdkError::Config { message: format!("failed to build HTTP client: {e}") })?;
        Ok(Self { client, config })
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn collection_url(&self) -> Result<Url> {
        let raw = self.config.collection_url();
        Url::parse(&raw).map_err(|e| SdkError::InvalidUrl { url: raw, message: e.to_string() })
    }

    fn record_url(&self, id: &RecordId) -> Result<Url> {
        let mut url = self.collection_url()?;
        url.path_segments_mut()
            .map_err(|()| SdkError::InvalidUrl {
                url: self.config.collection_url(),
                message: "URL cannot be a base".to_owned(),
            })?
            .push(id.as_str());
        Ok(url)
    }

    /// Maps a transport error, filling in the configured timeout.
    fn transport_error(&self, err: reqwest::Error) -> SdkError {
        if err.is_timeout() {
            return SdkError::Timeout { duration_ms: self.config.timeout().as_millis() as u64 };
        }
        err.into()
    }

    /// Fetches rows and the reported total.
    async fn get_rows(&self, url: &Url, params: &Params) -> Result<(Vec<Record>, Option<u64>)> {
        tracing::trace!(url = %url, ?params, "GET collection");
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = check_status(response).await?;
        let total = total_count(response.headers());
        let rows = response.json::<Vec<Record>>().await.map_err(|e| self.transport_error(e))?;
        Ok((rows, total))
    }

    async fn count_by_scan(&self, filter: &RecordFilter, sort: &SortSpec) -> Result<u64> {
        let url = self.collection_url()?;
        let mut params = sort_params(sort);
        if let Some(status) = filter.status {
            params.push(("status", status.to_string()));
        }
        let (mut rows, _) =
            with_retry(self.config.retry_policy(), || self.get_rows(&url, &params)).await?;
        filter.retain_search_matches(&mut rows);
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl RecordService for HttpRecordService {
    async fn query_collection(
        &self,
        filter: &RecordFilter,
        sort: &SortSpec,
        window: Window,
    ) -> Result<Page> {
        let url = self.collection_url()?;
        let mut params: Params =
            vec![("_start", window.offset.to_string()), ("_limit", window.limit.to_string())];
        params.extend(filter_params(filter, sort));

        let (rows, total) =
            with_retry(self.config.retry_policy(), || self.get_rows(&url, &params)).await?;
        Ok(Page::new(rows, total))
    }

    async fn query_count(&self, filter: &RecordFilter, sort: &SortSpec) -> Result<u64> {
        let url = self.collection_url()?;
        let mut params: Params = vec![("_page", "1".to_owned()), ("_limit", "1".to_owned())];
        params.extend(filter_params(filter, sort));

        let (_, total) =
            with_retry(self.config.retry_policy(), || self.get_rows(&url, &params)).await?;
        match total {
            Some(total) => Ok(total),
            None => {
                tracing::debug!("collection did not report a total, counting by scan");
                self.count_by_scan(filter, sort).await
            },
        }
    }

    async fn patch_record_votes(&self, id: &RecordId, votes: u64) -> Result<Option<Record>> {
        let url = &self.record_url(id)?;
        let body = &VotesPatch { votes };

        with_retry(self.config.retry_policy(), || async move {
            let response = self
                .client
                .patch(url.clone())
                .json(body)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;
            let response = check_status(response).await?;
            let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(None);
            }
            Ok(Some(serde_json::from_slice::<Record>(&bytes)?))
        })
        .await
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let url = &self.record_url(id)?;

        with_retry(self.config.retry_policy(), || async move {
            let response =
                self.client.get(url.clone()).send().await.map_err(|e| self.transport_error(e))?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let response = check_status(response).await?;
            Ok(Some(response.json::<Record>().await.map_err(|e| self.transport_error(e))?))
        })
        .await
    }
}

/// Sort, search and status parameters, omitting empty values.
fn filter_params(filter: &RecordFilter, sort: &SortSpec) -> Params {
    let mut params = sort_params(sort);
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        params.push(("q", search.to_owned()));
    }
    if let Some(status) = filter.status {
        params.push(("status", status.to_string()));
    }
    params
}

fn sort_params(sort: &SortSpec) -> Params {
    vec![("_sort", sort.field.to_string()), ("_order", sort.order.to_string())]
}

fn total_count(headers: &HeaderMap) -> Option<u64> {
    headers.get(TOTAL_COUNT_HEADER)?.to_str().ok()?.trim().parse().ok()
}

/// Turns a non-success response into [`SdkError::Http`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_owned()
    } else {
        body
    };
    Err(SdkError::Http { status: status.as_u16(), message })
}
