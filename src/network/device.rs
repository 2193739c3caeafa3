use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Address suffix used to classify a device as the network gateway when the
/// backend did not type it explicitly.
pub const GATEWAY_SUFFIX: &str = ".1";

/// Node id of the synthetic router anchor used when no router was detected.
/// Once created it is never removed, so the topology always has its anchor.
pub const GATEWAY_SENTINEL: &str = "gateway";

/// One discovered host, as reported by the scanning backend.
///
/// Everything except `ip` may be missing on the wire; absent fields degrade
/// to defaults instead of failing the whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    #[serde(default)]
    pub ip: String,
    #[serde(rename = "type", default)]
    pub kind: DeviceType,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub mac: Option<String>,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub latency: Option<String>,
    #[serde(default)]
    pub ports: Vec<u16>,
}

fn default_active() -> bool {
    true
}

impl DeviceRecord {
    /// Whether this record may serve as the router anchor. The first
    /// candidate in snapshot order wins.
    pub fn is_router_candidate(&self) -> bool {
        self.kind == DeviceType::Router || self.ip.ends_with(GATEWAY_SUFFIX)
    }

    /// The operator's own machine: either the backend-reported local IP or a
    /// record the scanner stamped with the Localhost vendor.
    pub fn is_local(&self, local_ip: Option<&str>) -> bool {
        local_ip.is_some_and(|ip| ip == self.ip) || self.vendor.as_deref() == Some("Localhost")
    }

    pub fn hostname_display(&self) -> &str {
        self.hostname.as_deref().unwrap_or("N/A")
    }

    pub fn mac_display(&self) -> &str {
        self.mac.as_deref().unwrap_or("N/A")
    }

    pub fn vendor_display(&self) -> &str {
        self.vendor.as_deref().unwrap_or("Unknown")
    }

    pub fn latency_display(&self) -> &str {
        self.latency.as_deref().unwrap_or("N/A")
    }

    pub fn ports_display(&self) -> String {
        if self.ports.is_empty() {
            "None/Closed".to_string()
        } else {
            self.ports
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

/// Device classification as guessed by the backend scanner. Anything the
/// backend invents beyond this set decodes as `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Router,
    Mobile,
    Desktop,
    Laptop,
    Server,
    Printer,
    #[default]
    #[serde(other)]
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Router => "router",
            DeviceType::Mobile => "mobile",
            DeviceType::Desktop => "desktop",
            DeviceType::Laptop => "laptop",
            DeviceType::Server => "server",
            DeviceType::Printer => "printer",
            DeviceType::Unknown => "unknown",
        }
    }

    /// Short badge appended to the node label for the common classes.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            DeviceType::Mobile => Some("[MOB]"),
            DeviceType::Desktop => Some("[DSK]"),
            DeviceType::Server => Some("[SRV]"),
            _ => None,
        }
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload attached to each rendered node: identity plus the creation-time
/// visual traits the shape needs. Mutable styling travels through the node's
/// label and color instead, since the layout engine keeps the payload fixed
/// after creation.
#[derive(Debug, Clone)]
pub struct DeviceNode {
    pub id: String,
    pub is_router: bool,
    pub size: f32,
}

/// Per-snapshot counters shown in the stats strip. Desktops fold laptops in,
/// "other" collects the printers and everything unclassified; the router
/// only counts toward the total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub total: usize,
    pub server: usize,
    pub desktop: usize,
    pub mobile: usize,
    pub other: usize,
}

impl NetworkStats {
    pub fn from_devices(devices: &[DeviceRecord]) -> Self {
        let mut stats = NetworkStats {
            total: devices.len(),
            ..Default::default()
        };
        for device in devices {
            match device.kind {
                DeviceType::Server => stats.server += 1,
                DeviceType::Desktop | DeviceType::Laptop => stats.desktop += 1,
                DeviceType::Mobile => stats.mobile += 1,
                DeviceType::Unknown | DeviceType::Printer => stats.other += 1,
                DeviceType::Router => {}
            }
        }
        stats
    }
}

/// Order used by the device list panel: router first, then active devices,
/// then offline ones, preserving snapshot order within each group.
pub fn listing_order(devices: &[DeviceRecord]) -> Vec<&DeviceRecord> {
    let mut sorted: Vec<&DeviceRecord> = devices.iter().collect();
    sorted.sort_by_key(|d| (!d.is_router_candidate(), !d.active));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_record_decodes_with_defaults() {
        let json = r#"{"ip": "192.168.1.23"}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.ip, "192.168.1.23");
        assert_eq!(device.kind, DeviceType::Unknown);
        assert!(device.active);
        assert!(device.ports.is_empty());
        assert_eq!(device.hostname_display(), "N/A");
        assert_eq!(device.vendor_display(), "Unknown");
    }

    #[test]
    fn unrecognized_type_degrades_to_unknown() {
        let json = r#"{"ip": "10.0.0.7", "type": "toaster", "active": false}"#;
        let device: DeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(device.kind, DeviceType::Unknown);
        assert!(!device.active);
    }

    #[test]
    fn router_candidates() {
        let by_type: DeviceRecord =
            serde_json::from_str(r#"{"ip": "10.1.2.3", "type": "router"}"#).unwrap();
        let by_suffix: DeviceRecord = serde_json::from_str(r#"{"ip": "10.1.2.1"}"#).unwrap();
        let neither: DeviceRecord = serde_json::from_str(r#"{"ip": "10.1.2.30"}"#).unwrap();
        assert!(by_type.is_router_candidate());
        assert!(by_suffix.is_router_candidate());
        assert!(!neither.is_router_candidate());
    }

    #[test]
    fn local_device_detection() {
        let device: DeviceRecord = serde_json::from_str(r#"{"ip": "10.0.0.5"}"#).unwrap();
        assert!(device.is_local(Some("10.0.0.5")));
        assert!(!device.is_local(Some("10.0.0.6")));
        assert!(!device.is_local(None));

        let localhost: DeviceRecord =
            serde_json::from_str(r#"{"ip": "10.0.0.9", "vendor": "Localhost"}"#).unwrap();
        assert!(localhost.is_local(None));
    }

    #[test]
    fn stats_scenario() {
        let devices: Vec<DeviceRecord> = serde_json::from_str(
            r#"[
                {"ip": "192.168.1.1", "type": "router"},
                {"ip": "192.168.1.5", "type": "mobile", "active": true}
            ]"#,
        )
        .unwrap();
        let stats = NetworkStats::from_devices(&devices);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.mobile, 1);
        assert_eq!(stats.desktop, 0);
        assert_eq!(stats.server, 0);
        assert_eq!(stats.other, 0);
    }

    #[test]
    fn laptops_count_as_desktops() {
        let devices: Vec<DeviceRecord> = serde_json::from_str(
            r#"[
                {"ip": "192.168.1.10", "type": "laptop"},
                {"ip": "192.168.1.11", "type": "desktop"},
                {"ip": "192.168.1.12", "type": "printer"}
            ]"#,
        )
        .unwrap();
        let stats = NetworkStats::from_devices(&devices);
        assert_eq!(stats.desktop, 2);
        assert_eq!(stats.other, 1);
    }

    #[test]
    fn listing_puts_router_first_then_active() {
        let devices: Vec<DeviceRecord> = serde_json::from_str(
            r#"[
                {"ip": "192.168.1.40", "active": false},
                {"ip": "192.168.1.20", "active": true},
                {"ip": "192.168.1.1", "type": "router"},
                {"ip": "192.168.1.30", "active": true}
            ]"#,
        )
        .unwrap();
        let order: Vec<&str> = listing_order(&devices).iter().map(|d| d.ip.as_str()).collect();
        assert_eq!(
            order,
            vec!["192.168.1.1", "192.168.1.20", "192.168.1.30", "192.168.1.40"]
        );
    }
}
