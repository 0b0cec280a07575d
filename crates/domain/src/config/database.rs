use serde::{Deserialize, Serialize};

/// Policy store (PostgreSQL) connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Server host; the client library default (unix socket) when omitted
    #[serde(default)]
    pub host: Option<String>,

    /// Server port (default: 5432)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name (default: "squidTag")
    #[serde(default = "default_database")]
    pub database: String,

    /// Role to connect as (default: "squidTag")
    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Apply pending schema migrations at startup (default: true)
    #[serde(default = "default_true")]
    pub migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: default_port(),
            database: default_database(),
            user: default_user(),
            password: None,
            migrate: true,
        }
    }
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "squidTag".to_string()
}

fn default_user() -> String {
    "squidTag".to_string()
}

fn default_true() -> bool {
    true
}
