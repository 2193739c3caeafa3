/*!
GUI-facing scan backend interface.

This module defines:
- `ScanError`: minimal error type for backend calls.
- `ScanSnapshot` / `QualityReport` / `ProbeReport`: what the backend returns.
- `ScanBackend`: an async trait that hides transport details and returns
  plain device records for reconciliation.

Adapters (the HTTP client today, anything else tomorrow) implement
`ScanBackend`; the GUI never sees a wire format.
*/

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::network::device::DeviceRecord;

#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// Underlying IO/transport failure (connection refused, timeout, 5xx).
    #[error("transport error: {0}")]
    Transport(String),
    /// The backend answered but reported a failure of its own.
    #[error("backend error: {0}")]
    Backend(String),
    /// The response body did not match the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}

/// Convenience result alias for backend operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// One poll result: backend session status plus the device snapshot and the
/// derived quality digest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanSnapshot {
    #[serde(default)]
    pub is_scanning: bool,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub quality: QualityReport,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QualityReport {
    pub score: i64,
    #[serde(default)]
    pub issues: Vec<String>,
}

impl Default for QualityReport {
    fn default() -> Self {
        // An empty network is a healthy network.
        Self {
            score: 100,
            issues: Vec::new(),
        }
    }
}

/// Result of the on-demand deep probe of one device.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub os: String,
    pub services: Vec<String>,
}

/// A small async interface for everything the GUI asks of the backend.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    /// Fetch the current snapshot and scan-session status.
    async fn fetch_snapshot(&self) -> ScanResult<ScanSnapshot>;
    /// Ask the backend to begin its scan loop.
    async fn start_scan(&self) -> ScanResult<()>;
    /// Ask the backend to end its scan loop.
    async fn stop_scan(&self) -> ScanResult<()>;
    /// The operator's own address, used to mark their device in the graph.
    async fn local_ip(&self) -> ScanResult<String>;
    /// Deep-probe a single device.
    async fn probe_device(&self, ip: &str) -> ScanResult<ProbeReport>;
    /// Navigation target for the downloadable report.
    fn report_url(&self) -> String;
}
