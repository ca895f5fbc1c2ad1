//! Mock HTTP client for testing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::{ByteStream, Headers, HttpClient, HttpError, Response};

/// A request the mock received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
}

impl RecordedRequest {
    /// The body parsed as JSON, for assertions.
    pub fn json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|body| serde_json::from_str(body).ok())
    }
}

/// What the mock answers with.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A buffered response. For streaming requests, a 2xx body is sent as
    /// one chunk and anything else fails like a real server error would.
    Success(Response),
    /// Fail before any response.
    Error(HttpError),
    /// Stream these chunks, then end.
    Stream(Vec<Bytes>),
    /// Stream these chunks, then fail mid-body.
    StreamThenError(Vec<Bytes>, HttpError),
    /// Stream these chunks, then stall forever.
    StreamThenStall(Vec<Bytes>),
    /// Never respond.
    Hang,
}

impl MockResponse {
    /// A 200 JSON response.
    pub fn json(value: serde_json::Value) -> Self {
        MockResponse::Success(
            Response::new(200, value.to_string()).with_header("content-type", "application/json"),
        )
    }

    /// A streamed body, one chunk per line-chunk given.
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockResponse::Stream(
            chunks
                .into_iter()
                .map(|chunk| Bytes::from(chunk.into()))
                .collect(),
        )
    }
}

/// Records requests and replays configured responses.
///
/// Responses are matched by method and URL first, then by URL alone, then
/// by URL prefix, then the default. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    routes: Arc<Mutex<HashMap<(Option<String>, String), MockResponse>>>,
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any method on `url`.
    pub fn set_response(&self, url: &str, response: MockResponse) {
        lock(&self.routes).insert((None, url.to_string()), response);
    }

    /// Answer only `method` on `url`.
    pub fn set_method_response(&self, method: &str, url: &str, response: MockResponse) {
        lock(&self.routes).insert((Some(method.to_uppercase()), url.to_string()), response);
    }

    pub fn set_default_response(&self, response: MockResponse) {
        *lock(&self.default_response) = Some(response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.requests).last().cloned()
    }

    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }

    fn record(&self, method: &str, url: &str, headers: &Headers, body: Option<&str>) {
        lock(&self.requests).push(RecordedRequest {
            method: method.to_string(),
            url: url.to_string(),
            headers: headers.clone(),
            body: body.map(str::to_string),
        });
    }

    fn lookup(&self, method: &str, url: &str) -> Option<MockResponse> {
        let routes = lock(&self.routes);

        if let Some(response) = routes.get(&(Some(method.to_string()), url.to_string())) {
            return Some(response.clone());
        }
        if let Some(response) = routes.get(&(None, url.to_string())) {
            return Some(response.clone());
        }
        for ((route_method, pattern), response) in routes.iter() {
            let method_matches = route_method.as_deref().map_or(true, |m| m == method);
            if method_matches && url.starts_with(pattern.as_str()) {
                return Some(response.clone());
            }
        }

        lock(&self.default_response).clone()
    }

    async fn respond(&self, method: &str, url: &str) -> Result<Response, HttpError> {
        match self.lookup(method, url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Hang) => std::future::pending().await,
            Some(MockResponse::Error(err)) => Err(err),
            Some(_) => Err(HttpError::Other(
                "stream response configured for a buffered request".to_string(),
            )),
            None => Err(HttpError::Other(format!("no mock response for {} {}", method, url))),
        }
    }
}

fn chunk_stream(chunks: Vec<Bytes>) -> impl futures::Stream<Item = Result<Bytes, HttpError>> {
    futures::stream::iter(chunks.into_iter().map(Ok))
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("GET", url, headers, None);
        self.respond("GET", url).await
    }

    async fn post(&self, url: &str, body: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.record("POST", url, headers, Some(body));
        self.respond("POST", url).await
    }

    async fn delete(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<Response, HttpError> {
        self.record("DELETE", url, headers, Some(body));
        self.respond("DELETE", url).await
    }

    async fn post_stream(
        &self,
        url: &str,
        body: &str,
        headers: &Headers,
    ) -> Result<ByteStream, HttpError> {
        self.record("POST", url, headers, Some(body));

        match self.lookup("POST", url) {
            Some(MockResponse::Stream(chunks)) => Ok(Box::pin(chunk_stream(chunks))),
            Some(MockResponse::StreamThenError(chunks, err)) => Ok(Box::pin(
                chunk_stream(chunks).chain(futures::stream::once(async move { Err(err) })),
            )),
            Some(MockResponse::StreamThenStall(chunks)) => Ok(Box::pin(
                chunk_stream(chunks).chain(futures::stream::pending()),
            )),
            Some(MockResponse::Success(response)) => {
                let response = response.error_for_status()?;
                Ok(Box::pin(chunk_stream(vec![response.body])))
            }
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(HttpError::Other(format!("no mock response for POST {}", url))),
        }
    }
}
