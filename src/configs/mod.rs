use crate::error::AppResult;
use config::{
    builder::DefaultState, Config, ConfigBuilder, Environment as ConfigEnv, File as ConfigFile,
};
use duration_str::deserialize_duration;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(600);
pub const DEFAULT_LISTEN_PORT: u16 = 8083;
pub const DEFAULT_SOURCE_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GlobalConfig {
    pub workers: Option<usize>,

    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl GlobalConfig {
    pub fn load_config() -> AppResult<Self> {
        Self::load_from(
            Config::builder()
                .add_source(ConfigFile::with_name("/etc/cert-cache-proxy/config").required(false))
                .add_source(ConfigFile::with_name("config").required(false))
                .add_source(ConfigEnv::with_prefix("CERTCACHE").separator(".")),
        )
    }

    fn load_from(builder: ConfigBuilder<DefaultState>) -> AppResult<Self> {
        let cfg = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            workers: Default::default(),
            listen: default_listen(),
            source: Default::default(),
            refresh: Default::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_url")]
    pub url: String,

    #[serde(default = "default_timeout", deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            timeout: default_timeout(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RefreshConfig {
    #[serde(
        default = "default_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
        }
    }
}

const fn default_timeout() -> Duration {
    DEFAULT_FETCH_TIMEOUT
}

const fn default_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_LISTEN_PORT))
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_owned()
}
