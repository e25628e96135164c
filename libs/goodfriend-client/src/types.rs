use serde::{Deserialize, Serialize};
use std::fmt;

/// Login state change broadcast on the player event stream
///
/// Encoded as a MessagePack array in field order, with the hash and salt
/// as `bin` values. The same shape is posted by
/// [`ApiClient::post_login_state`](crate::rest::ApiClient::post_login_state).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEventStreamUpdate {
    #[serde(with = "serde_bytes")]
    pub content_id_hash: [u8; 32],
    #[serde(with = "serde_bytes")]
    pub content_id_salt: [u8; 16],
    pub logged_in: bool,
    pub territory_id: u16,
    pub world_id: u32,
}

impl PlayerEventStreamUpdate {
    /// Hex form of the hash, for logging
    pub fn hash_hex(&self) -> String {
        hex::encode(self.content_id_hash)
    }
}

/// Severity of a service announcement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnouncementKind {
    Informational,
    Maintenance,
    Critical,
    Miscellaneous,
}

impl fmt::Display for AnnouncementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnnouncementKind::Informational => "informational",
            AnnouncementKind::Maintenance => "maintenance",
            AnnouncementKind::Critical => "critical",
            AnnouncementKind::Miscellaneous => "miscellaneous",
        };
        f.write_str(name)
    }
}

/// Announcement pushed on the text stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementStreamUpdate {
    pub message: String,
    pub kind: AnnouncementKind,
    #[serde(default)]
    pub channel: Option<String>,
}

/// Service metadata returned by `GET api/metadata`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceMetadata {
    pub connected_clients: u32,
    pub max_capacity: u32,
    #[serde(default)]
    pub donation_page_url: Option<String>,
    #[serde(default)]
    pub status_page_url: Option<String>,
    /// Set when the service has moved and clients should switch base URL
    #[serde(default)]
    pub new_api_url: Option<String>,
}

impl ServiceMetadata {
    /// Fraction of capacity in use, 0.0 when capacity is unknown
    pub fn load(&self) -> f64 {
        if self.max_capacity == 0 {
            return 0.0;
        }
        f64::from(self.connected_clients) / f64::from(self.max_capacity)
    }
}
