/// Edge payload connecting the router anchor to one device node.
#[derive(Debug, Clone)]
pub struct Link {
    pub id: String,
    pub from: String,
    pub to: String,
}

impl Link {
    pub fn router_link(router_id: &str, device_ip: &str) -> Self {
        Self {
            id: edge_id(router_id, device_ip),
            from: router_id.to_string(),
            to: device_ip.to_string(),
        }
    }
}

/// Stable identity for a router-device edge.
pub fn edge_id(from: &str, to: &str) -> String {
    format!("{}-{}", from, to)
}
