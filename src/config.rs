use serde::Deserialize;
use std::net::SocketAddr;

use crate::leaderboard::Strategy;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub web: Web,
    pub database: Database,
    #[serde(default)]
    pub leaderboard: Leaderboard,
}

#[derive(Debug, Deserialize)]
pub struct Web {
    pub host: SocketAddr,
    /// Only requests whose peer address renders exactly as this string are served.
    #[serde(default = "default_allowed_origin")]
    pub allowed_origin: String,
}

#[derive(Debug, Deserialize)]
pub struct Database {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound for acquiring a connection and for each statement.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Leaderboard {
    /// Which ranking `/api/getList` serves.
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for Leaderboard {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

fn default_allowed_origin() -> String {
    "127.0.0.1".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    60
}
