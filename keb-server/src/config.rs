use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
        })
    }
}
