use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub from_email: String,
    pub from_name: String,
    pub frontend_url: String,
}

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub brevo_api_key: String,
    pub email: EmailSettings,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "8080"),
            database_url: try_load("DATABASE_URL", "postgres://localhost/svj_voting"),
            brevo_api_key: read_secret("BREVO_API_KEY"),
            email: EmailSettings {
                from_email: try_load("FROM_EMAIL", "noreply@onlinesprava.cz"),
                from_name: try_load("FROM_NAME", "OnlineSprava"),
                frontend_url: try_load("FRONTEND_URL", "http://localhost:5173"),
            },
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> String {
    if let Ok(value) = env::var(secret_name) {
        return value;
    }

    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            warn!("Failed to read {secret_name} from file: {e}");
        })
        .expect("Secrets misconfigured!")
}
