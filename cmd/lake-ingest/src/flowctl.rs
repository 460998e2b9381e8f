//! Opt-in registration with a flowctl control plane. Best-effort: the
//! pipeline never blocks on the control plane being reachable.

use serde_json::json;
use tracing::{debug, info, warn};

use crate::{config::Config, version};

const ENABLE_VAR: &str = "ENABLE_FLOWCTL";
const ENDPOINT_VAR: &str = "FLOWCTL_ENDPOINT";
const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/v1/producers";

pub async fn register_if_enabled(config: &Config) {
    if std::env::var(ENABLE_VAR).map(|v| v == "true") != Ok(true) {
        debug!("flowctl registration disabled");
        return;
    }
    let endpoint =
        std::env::var(ENDPOINT_VAR).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

    let body = json!({
        "producer_id": config.producer_id,
        "version": version::pkg(),
        "network": config.network.name.clone().unwrap_or_else(|| config.network.passphrase.clone()),
        "era_id": config.era.era_id,
        "ledger_start": config.range.start,
        "ledger_end": config.range.end,
    });

    let client = reqwest::Client::new();
    match client.post(&endpoint).json(&body).send().await {
        Ok(response) if response.status().is_success() => {
            info!(%endpoint, "registered with flowctl");
        }
        Ok(response) => {
            warn!(%endpoint, status = %response.status(), "flowctl registration rejected");
        }
        Err(e) => {
            warn!(%endpoint, "flowctl registration failed: {e}");
        }
    }
}
