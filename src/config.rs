use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use tokio_postgres::NoTls;

/// How session tokens are checked.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionKey {
    /// RS256 public key in PEM form (the identity provider's JWT verification key).
    RsaPem(String),
    /// HS256 shared secret.
    Secret(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub identity_api_url: String,
    pub identity_secret_key: String,
    pub session_key: SessionKey,
    pub ratelimit_url: String,
    pub ratelimit_token: String,
    pub ratelimit_prefix: String,
    pub page_revalidate: Option<Duration>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup, so tests never touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).with_context(|| format!("{} must be set", key));

        let port = match get("PORT") {
            Some(p) => p.parse().with_context(|| format!("PORT is not a port number: {}", p))?,
            None => 8080,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let session_key = match (get("CLERK_JWT_KEY"), get("SESSION_JWT_SECRET")) {
            (Some(pem), _) => SessionKey::RsaPem(pem.replace("\\n", "\n")),
            (None, Some(secret)) => SessionKey::Secret(secret),
            (None, None) => return Err(anyhow!("CLERK_JWT_KEY or SESSION_JWT_SECRET must be set")),
        };

        let page_revalidate = match get("PAGE_REVALIDATE_SECS") {
            Some(s) => {
                let secs: u64 = s
                    .parse()
                    .with_context(|| format!("PAGE_REVALIDATE_SECS is not a number: {}", s))?;
                Some(Duration::from_secs(secs))
            }
            None => Some(Duration::from_secs(60)),
        };

        Ok(Self {
            port,
            allowed_origins,
            identity_api_url: get("CLERK_API_URL").unwrap_or_else(|| "https://api.clerk.com".into()),
            identity_secret_key: require("CLERK_SECRET_KEY")?,
            session_key,
            ratelimit_url: require("UPSTASH_REDIS_REST_URL")?,
            ratelimit_token: require("UPSTASH_REDIS_REST_TOKEN")?,
            ratelimit_prefix: get("RATELIMIT_PREFIX").unwrap_or_else(|| "chirp:ratelimit".into()),
            page_revalidate,
        })
    }
}

pub fn get_pg_pool() -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(env::var("PG_HOST").context("PG_HOST not set")?);
    cfg.user = Some(env::var("PG_USER").context("PG_USER not set")?);
    cfg.password = env::var("PG_PASS").ok();
    cfg.dbname = Some(env::var("PG_DB").context("PG_DB not set")?);
    if let Ok(port) = env::var("PG_PORT") {
        cfg.port = Some(port.parse().with_context(|| format!("PG_PORT is not a port number: {}", port))?);
    }

    let mut pool_cfg = PoolConfig::default();
    pool_cfg.max_size = 16;
    cfg.pool = Some(pool_cfg);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("failed to create postgres pool")
}
