//! Plain configuration structs with defaults; the TOML layer patches
//! values onto these.

/// Identity of this station.
#[derive(Debug, Clone)]
pub struct CfgStation {
    /// Our DMR ID.
    pub id: u32,
    pub callsign: String,
    /// Talk groups the terminal subscribes to.
    pub talk_groups: Vec<u32>,
}

impl Default for CfgStation {
    fn default() -> CfgStation {
        CfgStation { id: 0, callsign: String::new(), talk_groups: Vec::new() }
    }
}

/// Homebrew link parameters.
#[derive(Debug, Clone)]
pub struct CfgLink {
    /// Local UDP bind address.
    pub listen: String,
    /// Remote master address, "host:port".
    pub master_addr: String,
    /// Remote master DMR ID.
    pub master_id: u32,
    /// Shared authentication secret.
    pub auth_key: String,
    /// Drop the peer instead of retrying after a login refusal.
    pub unlink_on_auth_failure: bool,
    pub auth_timeout_secs: u64,
    pub ping_interval_secs: u64,
    pub ping_timeout_secs: u64,
    pub config_interval_secs: u64,
    /// Per-call inactivity timeout in milliseconds.
    pub call_idle_timeout_ms: u64,
}

impl Default for CfgLink {
    fn default() -> CfgLink {
        CfgLink {
            listen: "0.0.0.0:62030".into(),
            master_addr: String::new(),
            master_id: 0,
            auth_key: String::new(),
            unlink_on_auth_failure: false,
            auth_timeout_secs: 5,
            ping_interval_secs: 5,
            ping_timeout_secs: 15,
            config_interval_secs: 300,
            call_idle_timeout_ms: 360,
        }
    }
}

/// Fields announced in the repeater configuration record.
#[derive(Debug, Clone, Default)]
pub struct CfgRepeater {
    pub rx_freq: u32,
    pub tx_freq: u32,
    pub tx_power: u8,
    pub color_code: u8,
    pub latitude: f32,
    pub longitude: f32,
    pub height: u16,
    pub location: String,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct StackConfig {
    /// Optional verbose log file.
    pub debug_log: Option<String>,
    pub station: CfgStation,
    pub link: CfgLink,
    pub repeater: CfgRepeater,
}
