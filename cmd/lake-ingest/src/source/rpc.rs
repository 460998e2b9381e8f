use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    model::ClosedLedger,
    source::{enforce_order, Error, LedgerRange},
    xdr::{self, Limits, ReadXdr},
};

/// Ledgers requested per getLedgers page. The server caps pages itself;
/// anything in the low hundreds keeps response bodies well under the
/// transport's 100 MiB frame limit even for Soroban-heavy ledgers.
const PAGE_LIMIT: u32 = 200;

/// Streams closed ledgers from a Stellar RPC server by polling the
/// `getLedgers` JSON-RPC method with cursor pagination.
pub struct RpcSource {
    client: reqwest::Client,
    url: String,
    poll_interval: Duration,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetLedgersResult {
    ledgers: Vec<LedgerInfo>,
    latest_ledger: u32,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LedgerInfo {
    sequence: u32,
    metadata_xdr: String,
}

#[derive(Deserialize)]
struct GetHealthResult {
    status: String,
}

impl RpcSource {
    pub fn new(
        url: &str,
        headers: &[(String, String)],
        poll_interval: Duration,
    ) -> Result<Self, Error> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name: HeaderName = name
                .parse()
                .map_err(|e| Error::SourceUnavailable(format!("invalid header name: {e}")))?;
            let value: HeaderValue = value
                .parse()
                .map_err(|e| Error::SourceUnavailable(format!("invalid header value: {e}")))?;
            header_map.insert(name, value);
        }
        let client = reqwest::Client::builder()
            .default_headers(header_map)
            .build()
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
            poll_interval,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, Error> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::SourceUnavailable(format!(
                "{method}: got status code {}",
                response.status()
            )));
        }
        let rpc: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("{method}: {e}")))?;
        if let Some(err) = rpc.error {
            return Err(Error::SourceUnavailable(format!(
                "{method}: rpc error {}: {}",
                err.code, err.message
            )));
        }
        rpc.result
            .ok_or_else(|| Error::SourceUnavailable(format!("{method}: empty result")))
    }

    pub async fn prepare(&self, range: LedgerRange) -> Result<(), Error> {
        let health: GetHealthResult = self.call("getHealth", json!({})).await?;
        if health.status != "healthy" {
            return Err(Error::SourceUnavailable(format!(
                "rpc server unhealthy: {}",
                health.status
            )));
        }
        debug!(start = range.start, end = ?range.end, "rpc source prepared");
        Ok(())
    }

    pub async fn produce(
        self,
        range: LedgerRange,
        tx: mpsc::Sender<Result<ClosedLedger, Error>>,
        cancel: CancellationToken,
    ) {
        let mut next_seq = range.start;
        let mut cursor: Option<String> = None;

        loop {
            if cancel.is_cancelled() {
                return;
            }

            let params = match &cursor {
                Some(cursor) => json!({
                    "pagination": { "cursor": cursor, "limit": PAGE_LIMIT },
                }),
                None => json!({
                    "startLedger": next_seq,
                    "pagination": { "limit": PAGE_LIMIT },
                }),
            };

            let page: GetLedgersResult = match self.call("getLedgers", params).await {
                Ok(page) => page,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                    return;
                }
            };

            if page.ledgers.is_empty() {
                if page.latest_ledger < next_seq {
                    // Caught up to the chain head; wait for the next close.
                    tokio::select! {
                        () = cancel.cancelled() => return,
                        () = tokio::time::sleep(self.poll_interval) => {}
                    }
                    // Cursor pagination resumes at the head after a sleep.
                    continue;
                }
                let _ = tx
                    .send(Err(Error::SourceUnavailable(format!(
                        "getLedgers returned no ledgers before sequence {next_seq}"
                    ))))
                    .await;
                return;
            }

            for info in &page.ledgers {
                if let Some(end) = range.end {
                    if info.sequence > end {
                        return;
                    }
                }
                let item = decode_ledger(info, next_seq);
                let fatal = item.is_err();
                tokio::select! {
                    () = cancel.cancelled() => return,
                    sent = tx.send(item) => {
                        if sent.is_err() || fatal {
                            return;
                        }
                    }
                }
                next_seq = info.sequence + 1;
            }

            if let Some(end) = range.end {
                if next_seq > end {
                    return;
                }
            }
            cursor = page.cursor.clone();
            if cursor.is_none() {
                warn!("getLedgers response had no cursor; restarting from startLedger");
            }
        }
    }
}

fn decode_ledger(info: &LedgerInfo, expected: u32) -> Result<ClosedLedger, Error> {
    enforce_order(expected, info.sequence)?;
    let meta = xdr::LedgerCloseMeta::from_xdr_base64(&info.metadata_xdr, Limits::none()).map_err(
        |e| Error::Decode {
            sequence: info.sequence,
            message: e.to_string(),
        },
    )?;
    let ledger = ClosedLedger(meta);
    if ledger.sequence() != info.sequence {
        return Err(Error::Decode {
            sequence: info.sequence,
            message: format!(
                "metadata header sequence {} disagrees with envelope sequence",
                ledger.sequence()
            ),
        });
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_header_names() {
        let headers = vec![("api key".to_string(), "Bearer".to_string())];
        let result = RpcSource::new("http://localhost:1234", &headers, Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[test]
    fn accepts_wellformed_headers() {
        let headers = vec![("authorization".to_string(), "bearer 1234".to_string())];
        let result = RpcSource::new("http://localhost:1234", &headers, Duration::from_secs(1));
        assert!(result.is_ok());
    }

    #[test]
    fn parses_get_ledgers_result() {
        let raw = r#"{
            "ledgers": [
                {"sequence": 100, "metadataXdr": "AAAA", "hash": "ab"}
            ],
            "latestLedger": 105,
            "cursor": "100"
        }"#;
        let page: GetLedgersResult = serde_json::from_str(raw).unwrap();
        assert_eq!(page.ledgers.len(), 1);
        assert_eq!(page.ledgers[0].sequence, 100);
        assert_eq!(page.latest_ledger, 105);
        assert_eq!(page.cursor.as_deref(), Some("100"));
    }
}
