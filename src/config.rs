use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Base for absolute pagination links. Falls back to the request `Host` header.
    pub public_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://movie_catalog.db?mode=rwc".to_string());

        let db_max_connections: u32 =
            std::env::var("DB_MAX_CONNECTIONS").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let default_page_size: u64 =
            std::env::var("DEFAULT_PAGE_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(10);

        let max_page_size: u64 =
            std::env::var("MAX_PAGE_SIZE").ok().and_then(|s| s.parse().ok()).unwrap_or(100);

        let public_url = std::env::var("PUBLIC_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            db_max_connections: db_max_connections.max(1),
            default_page_size: default_page_size.max(1),
            max_page_size: max_page_size.max(default_page_size.max(1)),
            public_url,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            addr: ([127, 0, 0, 1], 0).into(),
            database_url: "sqlite::memory:".to_string(),
            db_max_connections: 1,
            default_page_size: 10,
            max_page_size: 100,
            public_url: Some("http://testserver".to_string()),
        }
    }
}
