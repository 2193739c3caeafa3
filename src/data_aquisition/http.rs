use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::scan::source::{
    ProbeReport, ScanBackend, ScanError, ScanResult, ScanSnapshot,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(4);
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5001";

/// HTTP client for the scanning backend.
///
/// Cheap to clone; every request shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ScanApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl Default for ScanApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ScanApiClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("default reqwest client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct LocalIpResponse {
    ip: String,
}

/// The probe endpoint reports failures in-band as `{"error": ...}` instead
/// of a dedicated status code, so decode both shapes from one struct.
#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "unknown_os")]
    os: String,
    #[serde(default)]
    services: Vec<String>,
}

fn unknown_os() -> String {
    "Unknown".to_string()
}

impl ProbeResponse {
    fn into_report(self) -> ScanResult<ProbeReport> {
        match self.error {
            Some(error) => Err(ScanError::Backend(error)),
            None => Ok(ProbeReport {
                os: self.os,
                services: self.services,
            }),
        }
    }
}

fn transport(e: reqwest::Error) -> ScanError {
    ScanError::Transport(e.to_string())
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ScanResult<T> {
    let resp = resp.error_for_status().map_err(transport)?;
    resp.json::<T>()
        .await
        .map_err(|e| ScanError::Decode(e.to_string()))
}

#[async_trait]
impl ScanBackend for ScanApiClient {
    async fn fetch_snapshot(&self) -> ScanResult<ScanSnapshot> {
        let resp = self
            .http
            .get(self.url("/api/scan"))
            .send()
            .await
            .map_err(transport)?;
        decode(resp).await
    }

    async fn start_scan(&self) -> ScanResult<()> {
        self.http
            .post(self.url("/api/scan/start"))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    async fn stop_scan(&self) -> ScanResult<()> {
        self.http
            .post(self.url("/api/scan/stop"))
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        Ok(())
    }

    async fn local_ip(&self) -> ScanResult<String> {
        let resp = self
            .http
            .get(self.url("/api/local-ip"))
            .send()
            .await
            .map_err(transport)?;
        let body: LocalIpResponse = decode(resp).await?;
        Ok(body.ip)
    }

    async fn probe_device(&self, ip: &str) -> ScanResult<ProbeReport> {
        // No error_for_status here: a rejected probe comes back as a 4xx
        // with the error payload we want to surface in the panel.
        let resp = self
            .http
            .get(self.url(&format!("/api/nmap/{}", ip)))
            .send()
            .await
            .map_err(transport)?;
        let body: ProbeResponse = resp
            .json()
            .await
            .map_err(|e| ScanError::Decode(e.to_string()))?;
        body.into_report()
    }

    fn report_url(&self) -> String {
        self.url("/api/report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = ScanApiClient::new("http://10.0.0.2:5001/");
        assert_eq!(client.base_url(), "http://10.0.0.2:5001");
        assert_eq!(client.report_url(), "http://10.0.0.2:5001/api/report");
    }

    #[test]
    fn probe_error_payload_maps_to_backend_error() {
        let body: ProbeResponse =
            serde_json::from_str(r#"{"error": "Invalid IP address"}"#).unwrap();
        match body.into_report() {
            Err(ScanError::Backend(msg)) => assert_eq!(msg, "Invalid IP address"),
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[test]
    fn probe_report_decodes_with_defaults() {
        let body: ProbeResponse =
            serde_json::from_str(r#"{"services": ["22/tcp: ssh OpenSSH 9.6"]}"#).unwrap();
        let report = body.into_report().unwrap();
        assert_eq!(report.os, "Unknown");
        assert_eq!(report.services.len(), 1);
    }
}
