//! Build a `StackConfig` from a TOML configuration file.
//!
//! The DTOs reject unrecognised fields through a flattened `extra` map,
//! so typos fail loudly instead of silently falling back to defaults.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use crate::stack_config::{CfgLink, CfgRepeater, CfgStation, StackConfig};

const EXPECTED_CONFIG_VERSION: &str = "1";

#[derive(Debug, Deserialize)]
struct TomlRoot {
    config_version: String,
    debug_log: Option<String>,
    station: TomlStation,
    link: TomlLink,
    repeater: Option<TomlRepeater>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TomlStation {
    id: u32,
    callsign: String,
    talk_groups: Option<Vec<u32>>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TomlLink {
    listen: Option<String>,
    master_addr: String,
    master_id: u32,
    auth_key: String,
    unlink_on_auth_failure: Option<bool>,
    auth_timeout_secs: Option<u64>,
    ping_interval_secs: Option<u64>,
    ping_timeout_secs: Option<u64>,
    config_interval_secs: Option<u64>,
    call_idle_timeout_ms: Option<u64>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TomlRepeater {
    rx_freq: Option<u32>,
    tx_freq: Option<u32>,
    tx_power: Option<u8>,
    color_code: Option<u8>,
    latitude: Option<f32>,
    longitude: Option<f32>,
    height: Option<u16>,
    location: Option<String>,
    description: Option<String>,
    url: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
    keys.sort_unstable();
    keys
}

pub fn from_toml_str(toml_str: &str) -> Result<StackConfig, Box<dyn std::error::Error>> {
    let root: TomlRoot = toml::from_str(toml_str)?;

    if root.config_version != EXPECTED_CONFIG_VERSION {
        return Err(format!(
            "unrecognized config_version: {}, expect {}",
            root.config_version, EXPECTED_CONFIG_VERSION
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if !root.station.extra.is_empty() {
        return Err(
            format!("unrecognized fields in station: {:?}", sorted_keys(&root.station.extra)).into()
        );
    }
    if !root.link.extra.is_empty() {
        return Err(
            format!("unrecognized fields in link: {:?}", sorted_keys(&root.link.extra)).into()
        );
    }
    if let Some(ref rep) = root.repeater {
        if !rep.extra.is_empty() {
            return Err(
                format!("unrecognized fields in repeater: {:?}", sorted_keys(&rep.extra)).into()
            );
        }
    }

    let mut cfg = StackConfig {
        debug_log: root.debug_log,
        station: CfgStation {
            id: root.station.id,
            callsign: root.station.callsign,
            talk_groups: root.station.talk_groups.unwrap_or_default(),
        },
        link: CfgLink::default(),
        repeater: CfgRepeater::default(),
    };

    apply_link_patch(&mut cfg.link, root.link);
    if let Some(rep) = root.repeater {
        apply_repeater_patch(&mut cfg.repeater, rep);
    }

    Ok(cfg)
}

pub fn from_file(path: impl AsRef<Path>) -> Result<StackConfig, Box<dyn std::error::Error>> {
    let contents = fs::read_to_string(path)?;
    from_toml_str(&contents)
}

fn apply_link_patch(link: &mut CfgLink, t: TomlLink) {
    if let Some(v) = t.listen {
        link.listen = v;
    }
    link.master_addr = t.master_addr;
    link.master_id = t.master_id;
    link.auth_key = t.auth_key;
    if let Some(v) = t.unlink_on_auth_failure {
        link.unlink_on_auth_failure = v;
    }
    if let Some(v) = t.auth_timeout_secs {
        link.auth_timeout_secs = v;
    }
    if let Some(v) = t.ping_interval_secs {
        link.ping_interval_secs = v;
    }
    if let Some(v) = t.ping_timeout_secs {
        link.ping_timeout_secs = v;
    }
    if let Some(v) = t.config_interval_secs {
        link.config_interval_secs = v;
    }
    if let Some(v) = t.call_idle_timeout_ms {
        link.call_idle_timeout_ms = v;
    }
}

fn apply_repeater_patch(rep: &mut CfgRepeater, t: TomlRepeater) {
    if let Some(v) = t.rx_freq {
        rep.rx_freq = v;
    }
    if let Some(v) = t.tx_freq {
        rep.tx_freq = v;
    }
    if let Some(v) = t.tx_power {
        rep.tx_power = v;
    }
    if let Some(v) = t.color_code {
        rep.color_code = v;
    }
    if let Some(v) = t.latitude {
        rep.latitude = v;
    }
    if let Some(v) = t.longitude {
        rep.longitude = v;
    }
    if let Some(v) = t.height {
        rep.height = v;
    }
    if let Some(v) = t.location {
        rep.location = v;
    }
    if let Some(v) = t.description {
        rep.description = v;
    }
    if let Some(v) = t.url {
        rep.url = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
config_version = "1"

[station]
id = 2042214
callsign = "PD0MZ"
talk_groups = [204, 2041]

[link]
master_addr = "master.example.net:62030"
master_id = 204000
auth_key = "s3cr3t"
ping_interval_secs = 5

[repeater]
rx_freq = 433787500
tx_freq = 438787500
color_code = 1
location = "Hillegom, ZH, NL"
"#;

    #[test]
    fn test_load_sample() {
        let cfg = from_toml_str(SAMPLE).unwrap();
        assert_eq!(cfg.station.id, 2042214);
        assert_eq!(cfg.station.callsign, "PD0MZ");
        assert_eq!(cfg.station.talk_groups, vec![204, 2041]);
        assert_eq!(cfg.link.master_id, 204000);
        assert_eq!(cfg.link.listen, "0.0.0.0:62030");
        assert_eq!(cfg.link.ping_timeout_secs, 15);
        assert_eq!(cfg.repeater.rx_freq, 433787500);
        assert_eq!(cfg.repeater.color_code, 1);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let bad = SAMPLE.replace("config_version = \"1\"", "config_version = \"9\"");
        assert!(from_toml_str(&bad).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let bad = SAMPLE.replace("[repeater]", "[repeater]\ntx_pwr = 5");
        let err = from_toml_str(&bad).unwrap_err().to_string();
        assert!(err.contains("tx_pwr"), "{}", err);
    }
}
