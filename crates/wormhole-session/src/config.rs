//! Session configuration and protocol timeouts

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application id that namespaces the protocol on the rendezvous server
pub const DEFAULT_APP_ID: &str = "lothar.com/wormhole/text-or-file-xfer";

/// Public rendezvous relay
pub const DEFAULT_RENDEZVOUS_URL: &str = "ws://relay.magic-wormhole.io:4000/v1";

/// Public transit relay
pub const DEFAULT_TRANSIT_RELAY_URL: &str = "tcp:transit.magic-wormhole.io:4001";

/// Default bound for handshake-bearing waits (code assignment, rendezvous,
/// key exchange)
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound for payload-bearing waits (control messages from the peer)
pub const MESSAGE_TIMEOUT: Duration = Duration::from_secs(600);

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Application identifier, also the prefix of derived-key purposes
    pub app_id: String,
    /// Rendezvous server address
    pub rendezvous_url: String,
    /// Transit relay address handed to the transit factory
    pub transit_relay_url: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID.to_string(),
            rendezvous_url: DEFAULT_RENDEZVOUS_URL.to_string(),
            transit_relay_url: DEFAULT_TRANSIT_RELAY_URL.to_string(),
        }
    }
}

impl SessionConfig {
    /// Purpose string for deriving the transit encryption key
    pub fn transit_key_purpose(&self) -> String {
        format!("{}/transit-key", self.app_id)
    }
}
