// ABOUTME: Application configuration read from environment variables with development defaults
// ABOUTME: Covers the listen address, database location, token signing and upload directory

use std::path::PathBuf;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub upload_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            database_url: "sqlite:checkups.db?mode=rwc".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_ttl_seconds: 24 * 60 * 60,
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so parsing can be tested without touching the process env.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("PORT must be a port number, got {:?}: {}", raw, e))?,
            None => defaults.port,
        };

        let token_ttl_seconds = match lookup("TOKEN_TTL_SECONDS") {
            Some(raw) => {
                let ttl: i64 = raw.parse().map_err(|e| {
                    anyhow::anyhow!("TOKEN_TTL_SECONDS must be an integer, got {:?}: {}", raw, e)
                })?;
                if ttl <= 0 {
                    anyhow::bail!("TOKEN_TTL_SECONDS must be positive");
                }
                ttl
            }
            None => defaults.token_ttl_seconds,
        };

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            jwt_secret: lookup("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_seconds,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        };

        if config.uses_dev_secret() {
            tracing::warn!("JWT_SECRET not set, using the development signing secret");
        }

        Ok(config)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
