//! Row sources: where an inspection's rows come from.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use portdq_core::{ApiParams, DataTypeConfig, Row};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// Envelope fields that may carry the row array of an object body.
const ROW_ENVELOPE_FIELDS: &[&str] = &["data", "items", "rows", "result"];

/// Supplies the rows of a data type for one inspection.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch rows with the effective request parameters.
    async fn fetch(&self, data_type: &DataTypeConfig, params: &ApiParams) -> Result<Vec<Row>, FetchError>;
}

/// Fetches rows with `GET <base_url><endpoint>?<params>`.
#[derive(Debug, Clone)]
pub struct HttpRowSource {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpRowSource {
    /// Create a source against an upstream base URL.
    ///
    /// Fails with `Transport` when the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: None,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn url_for(&self, data_type: &DataTypeConfig) -> String {
        if data_type.endpoint.starts_with('/') {
            format!("{}{}", self.base_url, data_type.endpoint)
        } else {
            format!("{}/{}", self.base_url, data_type.endpoint)
        }
    }
}

#[async_trait]
impl RowSource for HttpRowSource {
    async fn fetch(&self, data_type: &DataTypeConfig, params: &ApiParams) -> Result<Vec<Row>, FetchError> {
        let url = self.url_for(data_type);
        let query: Vec<(&str, String)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect();

        debug!(url = %url, params = query.len(), "Fetching rows");

        let mut request = self.client.get(&url).query(&query);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Body(e.to_string()))?;
        parse_rows_body(body)
    }
}

/// Serves a fixed row set, whatever the data type or parameters.
#[derive(Debug, Clone, Default)]
pub struct StaticRowSource {
    rows: Vec<Row>,
}

impl StaticRowSource {
    /// Serve these rows.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Serve rows parsed from a JSON body.
    pub fn from_json(body: Value) -> Result<Self, FetchError> {
        Ok(Self::new(parse_rows_body(body)?))
    }
}

#[async_trait]
impl RowSource for StaticRowSource {
    async fn fetch(&self, _data_type: &DataTypeConfig, _params: &ApiParams) -> Result<Vec<Row>, FetchError> {
        Ok(self.rows.clone())
    }
}

/// Reads rows from a local JSON file on every fetch.
#[derive(Debug, Clone)]
pub struct JsonFileRowSource {
    path: PathBuf,
}

impl JsonFileRowSource {
    /// Read rows from `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RowSource for JsonFileRowSource {
    async fn fetch(&self, data_type: &DataTypeConfig, _params: &ApiParams) -> Result<Vec<Row>, FetchError> {
        debug!(path = %self.path.display(), data_type = %data_type.id, "Reading rows from file");
        let content = tokio::fs::read_to_string(&self.path).await?;
        let body: Value = serde_json::from_str(&content).map_err(|e| FetchError::Body(e.to_string()))?;
        parse_rows_body(body)
    }
}

/// Extract rows from an upstream body.
///
/// Accepts a bare array, or an object carrying the array under one of the
/// usual envelope fields. Every element must be an object.
pub fn parse_rows_body(body: Value) -> Result<Vec<Row>, FetchError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => ROW_ENVELOPE_FIELDS
            .iter()
            .find_map(|key| match envelope.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| {
                FetchError::Body(format!(
                    "object body has no row array under any of {ROW_ENVELOPE_FIELDS:?}"
                ))
            })?,
        other => {
            return Err(FetchError::Body(format!(
                "expected an array of rows, got {}",
                json_kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(FetchError::Body(format!(
                "row {idx} is {}, not an object",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn data_type(endpoint: &str) -> DataTypeConfig {
        DataTypeConfig {
            id: "tc_work_info".to_string(),
            name: "TC".to_string(),
            description: String::new(),
            category: "TC".to_string(),
            endpoint: endpoint.to_string(),
            default_params: Default::default(),
            default_meta: Default::default(),
        }
    }

    #[test]
    fn test_parse_bare_array() {
        let rows = parse_rows_body(json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["a"], 2);
    }

    #[test]
    fn test_parse_envelopes() {
        for key in ["data", "items", "rows", "result"] {
            let rows = parse_rows_body(json!({ key: [{"a": 1}], "total": 1 })).unwrap();
            assert_eq!(rows.len(), 1, "envelope {key}");
        }
    }

    #[test]
    fn test_parse_rejects_malformed_bodies() {
        assert!(matches!(parse_rows_body(json!("nope")), Err(FetchError::Body(_))));
        assert!(matches!(parse_rows_body(json!({"total": 3})), Err(FetchError::Body(_))));
        assert!(matches!(parse_rows_body(json!([{"a": 1}, 2])), Err(FetchError::Body(_))));
    }

    #[test]
    fn test_url_joining() {
        let source = HttpRowSource::new("http://upstream:8080/", Duration::from_secs(1)).unwrap();
        assert_eq!(source.url_for(&data_type("/api/tc")), "http://upstream:8080/api/tc");
        assert_eq!(source.url_for(&data_type("api/tc")), "http://upstream:8080/api/tc");
    }

    /// Answer one request with a canned HTTP response.
    async fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}")
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn test_http_fetch_reads_rows() {
        let base = serve_once(http_response("200 OK", r#"{"data": [{"tmnlId": "BPTS"}]}"#)).await;
        let source = HttpRowSource::new(base, Duration::from_secs(5)).unwrap();

        let rows = source.fetch(&data_type("/api/tc"), &ApiParams::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tmnlId"], "BPTS");
    }

    #[tokio::test]
    async fn test_http_fetch_non_success_status() {
        let base = serve_once(http_response("500 Internal Server Error", "")).await;
        let source = HttpRowSource::new(base, Duration::from_secs(5)).unwrap();

        let err = source.fetch(&data_type("/api/tc"), &ApiParams::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
    }

    #[tokio::test]
    async fn test_http_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpRowSource::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        let err = source.fetch(&data_type("/api/tc"), &ApiParams::new()).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticRowSource::from_json(json!({"data": [{"a": 1}]})).unwrap();
        let rows = source.fetch(&data_type(""), &ApiParams::new()).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_json_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        tokio::fs::write(&path, r#"[{"tmnlId": "BPTS"}]"#).await.unwrap();

        let source = JsonFileRowSource::new(&path);
        let rows = source.fetch(&data_type(""), &ApiParams::new()).await.unwrap();
        assert_eq!(rows[0]["tmnlId"], "BPTS");

        let missing = JsonFileRowSource::new(dir.path().join("missing.json"));
        assert!(matches!(
            missing.fetch(&data_type(""), &ApiParams::new()).await,
            Err(FetchError::Io(_))
        ));
    }
}
