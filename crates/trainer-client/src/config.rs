use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    pub data_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub blunder_limit: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_url: env::var("TRAINER_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "https://chessmadra.com".to_string()),
            data_dir: env::var("TRAINER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            http_timeout_secs: env::var("TRAINER_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            blunder_limit: env::var("TRAINER_BLUNDER_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(20),
        }
    }
}
