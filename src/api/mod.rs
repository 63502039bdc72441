pub mod normalize;
pub mod operations;

use crate::config::AppConfig;
use async_trait::async_trait;
use operations::Operation;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

pub use normalize::{normalize, Normalized, NormalizeError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    GraphQl,
    Parse,
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn network(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    pub fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    pub fn http(status: u16, body: &str, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }

    pub fn graphql(messages: &[String]) -> Self {
        Self {
            kind: ApiErrorKind::GraphQl,
            message: messages.join("; "),
        }
    }
}

impl From<NormalizeError> for ApiError {
    fn from(e: NormalizeError) -> Self {
        Self::parse(e)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Deserialize, Debug)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize, Debug)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

impl GraphQlResponse {
    /// Any error makes the whole response a failure, partial data included.
    fn into_result(self) -> ApiResult<Value> {
        if !self.errors.is_empty() {
            let messages: Vec<String> = self.errors.into_iter().map(|e| e.message).collect();
            return Err(ApiError::graphql(&messages));
        }
        match self.data {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(ApiError::parse("response has neither data nor errors")),
        }
    }
}

/// Parses a raw GraphQL response body.
pub fn parse_response(body: &str) -> ApiResult<Value> {
    let res: GraphQlResponse = serde_json::from_str(body).map_err(ApiError::parse)?;
    res.into_result()
}

/// The network boundary. Every call completes exactly once.
#[async_trait(?Send)]
pub trait GraphQlNetwork {
    async fn execute(&self, operation: &Operation) -> ApiResult<Value>;

    /// Best-effort session deletion: any HTTP status counts as done, only a
    /// failed request is an error.
    async fn delete_session(&self) -> ApiResult<()>;
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    pub(crate) base_url: String,
    graphql_path: String,
    session_path: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            graphql_path: config.graphql_path.clone(),
            session_path: config.session_path.clone(),
        }
    }

    pub fn graphql_url(&self) -> String {
        format!("{}{}", self.base_url, self.graphql_path)
    }

    pub fn session_url(&self) -> String {
        format!("{}{}", self.base_url, self.session_path)
    }

    // reqwest needs an absolute URL; an empty base means same origin.
    fn absolute(url: String) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            return url;
        }
        let origin = web_sys::window()
            .and_then(|w| w.location().origin().ok())
            .unwrap_or_default();
        format!("{origin}{url}")
    }
}

#[async_trait(?Send)]
impl GraphQlNetwork for ApiClient {
    async fn execute(&self, operation: &Operation) -> ApiResult<Value> {
        let client = reqwest::Client::new();
        let res = client
            .post(Self::absolute(self.graphql_url()))
            .json(operation)
            .send()
            .await
            .map_err(ApiError::network)?;

        let status = res.status();
        let body = res.text().await.map_err(ApiError::network)?;
        if status.as_u16() == 401 {
            return Err(ApiError::unauthorized());
        }
        if !status.is_success() {
            warn!(operation = operation.name, %status, "graphql request failed");
            return Err(ApiError::http(status.as_u16(), &body, "GraphQL request failed"));
        }

        parse_response(&body).inspect_err(|e| {
            warn!(operation = operation.name, error = %e, "graphql response rejected");
        })
    }

    async fn delete_session(&self) -> ApiResult<()> {
        let client = reqwest::Client::new();
        client
            .delete(Self::absolute(self.session_url()))
            .send()
            .await
            .map_err(ApiError::network)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted network: answers calls from a queue and records requests.
    #[derive(Default)]
    pub(crate) struct FakeNetwork {
        pub responses: RefCell<VecDeque<ApiResult<Value>>>,
        pub session_result: RefCell<Option<ApiResult<()>>>,
        pub requests: RefCell<Vec<Operation>>,
        pub session_deletes: RefCell<usize>,
    }

    impl FakeNetwork {
        pub fn respond(&self, result: ApiResult<Value>) {
            self.responses.borrow_mut().push_back(result);
        }
    }

    #[async_trait(?Send)]
    impl GraphQlNetwork for FakeNetwork {
        async fn execute(&self, operation: &Operation) -> ApiResult<Value> {
            self.requests.borrow_mut().push(operation.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::network("no scripted response")))
        }

        async fn delete_session(&self) -> ApiResult<()> {
            *self.session_deletes.borrow_mut() += 1;
            self.session_result.borrow_mut().take().unwrap_or(Ok(()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_data() {
        let data = parse_response(r#"{"data":{"realm":null}}"#).unwrap();
        assert_eq!(data, serde_json::json!({ "realm": null }));
    }

    #[test]
    fn test_parse_response_errors_win_over_partial_data() {
        let err = parse_response(r#"{"data":{"realm":null},"errors":[{"message":"a"},{"message":"b"}]}"#)
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::GraphQl);
        assert_eq!(err.message, "a; b");
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert_eq!(parse_response("<html>").unwrap_err().kind, ApiErrorKind::Parse);
        assert_eq!(parse_response("{}").unwrap_err().kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_client_urls() {
        let config = AppConfig {
            api_url: "https://tube.example.org/".into(),
            ..AppConfig::default()
        };
        let client = ApiClient::new(&config);
        assert_eq!(client.graphql_url(), "https://tube.example.org/graphql");
        assert_eq!(client.session_url(), "https://tube.example.org/~session");
    }
}
