// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Long-poll client for the upstream job feed.

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use rotulo_core::LabelJob;
use rotulo_core::error::{Result, RotuloError};

/// Client timeout sized for a long-poll cycle; the server holds the
/// request open until work arrives or its own window closes.
const POLL_TIMEOUT: Duration = Duration::from_secs(65);

/// HTTP client for the `{"data": [...]}` job feed.
pub struct JobSource {
    client: reqwest::Client,
    url: String,
}

impl JobSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, POLL_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RotuloError::Http(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Polls the feed once. An empty batch is `Ok(vec![])`; a client
    /// timeout maps to [`RotuloError::SourceTimeout`] so the caller can
    /// treat it as an ordinary quiet cycle.
    pub async fn fetch(&self) -> Result<Vec<LabelJob>> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;
        let body: Value = resp
            .json()
            .await
            .map_err(|e| RotuloError::MalformedBatch(e.to_string()))?;
        parse_batch(body)
    }
}

fn classify(err: reqwest::Error) -> RotuloError {
    if err.is_timeout() {
        RotuloError::SourceTimeout
    } else {
        RotuloError::Source(err.to_string())
    }
}

/// Validates the feed envelope before anything reaches dispatch. A
/// missing or non-array `data` field rejects the whole payload; an item
/// that is not an object is skipped with a warning, like any other
/// malformed job.
pub fn parse_batch(body: Value) -> Result<Vec<LabelJob>> {
    let Some(data) = body.get("data") else {
        return Err(RotuloError::MalformedBatch("missing data field".into()));
    };
    let Some(items) = data.as_array() else {
        return Err(RotuloError::MalformedBatch("data is not an array".into()));
    };

    let jobs = items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(job) => Some(job),
            Err(e) => {
                warn!(error = %e, "unparseable job skipped");
                None
            }
        })
        .collect();
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn envelope_without_data_is_malformed() {
        let err = parse_batch(json!({"jobs": []})).unwrap_err();
        assert!(matches!(err, RotuloError::MalformedBatch(_)));
    }

    #[test]
    fn non_array_data_is_malformed() {
        let err = parse_batch(json!({"data": "nope"})).unwrap_err();
        assert!(matches!(err, RotuloError::MalformedBatch(_)));
        assert!(parse_batch(json!({"data": null})).is_err());
    }

    #[test]
    fn empty_data_is_an_empty_batch() {
        assert!(parse_batch(json!({"data": []})).unwrap().is_empty());
    }

    #[test]
    fn jobs_parse_and_non_objects_are_skipped() {
        let jobs = parse_batch(json!({"data": [
            {"store_key": "1-1", "id_produto": 812, "nome": "QUEIJO"},
            "garbage",
            {"store_key": "1-2", "id_produto": "7"},
        ]}))
        .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id_produto.as_deref(), Some("812"));
        assert_eq!(jobs[1].store_key.as_deref(), Some("1-2"));
    }

    #[tokio::test]
    async fn fetch_parses_a_served_batch() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"data":[{"store_key":"1-1","id_produto":"9","nome":"PAO"}]}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let source = JobSource::new(format!("http://{addr}/start.php")).unwrap();
        let jobs = source.fetch().await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].field_str("nome"), "PAO");
    }

    #[tokio::test]
    async fn silent_server_maps_to_poll_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // accept and hold the connection open without answering
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(socket);
        });

        let source =
            JobSource::with_timeout(format!("http://{addr}/start.php"), Duration::from_millis(200))
                .unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, RotuloError::SourceTimeout));
    }

    #[tokio::test]
    async fn refused_connection_is_a_source_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = JobSource::new(format!("http://{addr}/start.php")).unwrap();
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, RotuloError::Source(_)));
    }
}
