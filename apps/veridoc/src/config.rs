use std::{collections::HashMap, fs, path::PathBuf};

use anyhow::{Context, Result};
use shared::domain::Network;

#[derive(Debug)]
pub struct Settings {
    pub api_base_url: String,
    pub network: Network,
    pub credential_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8787".into(),
            network: Network::Private,
            credential_path: default_credential_path(),
        }
    }
}

/// Precedence: defaults < `veridoc.toml` < environment < CLI flags.
pub fn load_settings(
    api_url_flag: Option<String>,
    network_flag: Option<String>,
) -> Result<Settings> {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("veridoc.toml") {
        if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(&raw) {
            if let Some(v) = file_cfg.get("api_base_url") {
                settings.api_base_url = v.clone();
            }
            if let Some(v) = file_cfg.get("network") {
                settings.network = v
                    .parse::<Network>()
                    .context("invalid network in veridoc.toml")?;
            }
            if let Some(v) = file_cfg.get("credential_path") {
                settings.credential_path = PathBuf::from(v);
            }
        }
    }

    if let Ok(v) = std::env::var("VERIDOC_API_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("APP__NETWORK") {
        settings.network = v.parse::<Network>().context("invalid APP__NETWORK")?;
    }
    if let Ok(v) = std::env::var("APP__CREDENTIAL_PATH") {
        settings.credential_path = PathBuf::from(v);
    }

    if let Some(v) = api_url_flag {
        settings.api_base_url = v;
    }
    if let Some(v) = network_flag {
        settings.network = v.parse::<Network>().context("invalid --network value")?;
    }

    Ok(settings)
}

fn default_credential_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("veridoc")
        .join("credential")
}
