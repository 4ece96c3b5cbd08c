use anyhow::{Context, Result};

pub struct DatabaseConfig {
    pub url: String,
}

pub struct ServerConfig {
    pub port: u16,
}

pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

/// Load configuration from the environment. `DATABASE_URL` is mandatory,
/// everything else has a local-dev default.
pub fn load() -> Result<Config> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .context("PORT must be a valid port number")?;

    Ok(Config {
        database: DatabaseConfig { url },
        server: ServerConfig { port },
    })
}
