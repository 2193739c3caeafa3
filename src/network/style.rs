use catppuccin_egui::Theme;
use egui::Color32;

use crate::network::device::{DeviceRecord, DeviceType};

pub const ROUTER_SIZE: f32 = 20.0;
pub const LOCAL_SIZE: f32 = 12.0;
pub const DEVICE_SIZE: f32 = 8.0;

/// Everything the reconciler pushes into a rendered node on each snapshot.
/// `size` only takes effect at node creation; the layout engine keeps shape
/// payloads fixed afterwards, which matches the anchor-stability contract.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeStyle {
    pub color: Color32,
    pub size: f32,
    pub label: String,
}

/// Styling for the router anchor. Applied exactly once, when the node is
/// created; an established router keeps its look across snapshots.
pub fn router_style(theme: &Theme, router: Option<&DeviceRecord>) -> NodeStyle {
    let label = match router {
        Some(record) => format!("YOUR ROUTER\n{}", record.ip),
        None => "YOUR ROUTER".to_string(),
    };
    NodeStyle {
        color: theme.red,
        size: ROUTER_SIZE,
        label,
    }
}

/// Styling for a non-router device. The operator's own machine overrides
/// type coloring, and liveness overrides both.
pub fn style_for(theme: &Theme, record: &DeviceRecord, is_local: bool) -> NodeStyle {
    let mut size = DEVICE_SIZE;
    let mut color;
    let mut label;

    if is_local {
        label = format!("YOUR DEVICE\n{}", record.ip);
        color = theme.text;
        size = LOCAL_SIZE;
    } else {
        color = match record.kind {
            DeviceType::Mobile => theme.green,
            DeviceType::Server => theme.peach,
            DeviceType::Router => theme.red,
            _ => theme.teal,
        };
        label = record.ip.clone();
        if let Some(tag) = record.kind.tag() {
            label.push('\n');
            label.push_str(tag);
        }
        if record.kind == DeviceType::Router {
            // A router-typed device that is not the anchor still stands out.
            size = 15.0;
        }
    }

    if !record.active {
        color = theme.overlay0;
        label.push_str("\n(OFFLINE)");
    }

    NodeStyle { color, size, label }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn theme() -> Theme {
        catppuccin_egui::MOCHA
    }

    fn device(json: &str) -> DeviceRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn offline_overrides_type_styling() {
        let record = device(r#"{"ip": "10.0.0.4", "type": "mobile", "active": false}"#);
        let style = style_for(&theme(), &record, false);
        assert_eq!(style.color, theme().overlay0);
        assert!(style.label.ends_with("(OFFLINE)"));
    }

    #[test]
    fn local_device_gets_highlight_and_size() {
        let record = device(r#"{"ip": "10.0.0.5", "type": "desktop"}"#);
        let style = style_for(&theme(), &record, true);
        assert_eq!(style.color, theme().text);
        assert_eq!(style.size, LOCAL_SIZE);
        assert_eq!(style.label, "YOUR DEVICE\n10.0.0.5");
    }

    #[test]
    fn offline_also_dims_the_local_device() {
        let record = device(r#"{"ip": "10.0.0.5", "active": false}"#);
        let style = style_for(&theme(), &record, true);
        assert_eq!(style.color, theme().overlay0);
        assert_eq!(style.label, "YOUR DEVICE\n10.0.0.5\n(OFFLINE)");
    }

    #[test]
    fn type_tags_land_in_the_label() {
        let record = device(r#"{"ip": "10.0.0.6", "type": "server"}"#);
        let style = style_for(&theme(), &record, false);
        assert_eq!(style.color, theme().peach);
        assert_eq!(style.label, "10.0.0.6\n[SRV]");
    }

    #[test]
    fn unknown_device_defaults_to_plain_label() {
        let record = device(r#"{"ip": "10.0.0.7"}"#);
        let style = style_for(&theme(), &record, false);
        assert_eq!(style.color, theme().teal);
        assert_eq!(style.label, "10.0.0.7");
        assert_eq!(style.size, DEVICE_SIZE);
    }

    #[test]
    fn router_style_embeds_address_when_known() {
        let record = device(r#"{"ip": "192.168.1.1", "type": "router"}"#);
        let style = router_style(&theme(), Some(&record));
        assert_eq!(style.label, "YOUR ROUTER\n192.168.1.1");
        assert_eq!(style.size, ROUTER_SIZE);

        let synthetic = router_style(&theme(), None);
        assert_eq!(synthetic.label, "YOUR ROUTER");
    }
}
