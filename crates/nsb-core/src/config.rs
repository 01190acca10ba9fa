use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

/// Typed configuration, loaded from the environment (with `.env` support).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub bot_token: String,
    pub channel_username: String,
    pub channel_link: String,

    // Upstream lookup API: `{term}` is replaced with the search key.
    pub lookup_api_url: String,

    // Group gating
    pub group_chat_id: i64,
    pub group_link: Option<String>,

    // Admin allow-list
    pub admin_ids: Vec<i64>,

    // Storage
    pub database_url: String,

    // Health endpoint
    pub port: u16,

    // Runtime constants
    pub request_cooldown: Duration,
    pub http_connect_timeout: Duration,
    pub http_total_timeout: Duration,
    pub broadcast_delay: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        // Required env vars
        let bot_token = env_str("BOT_TOKEN").unwrap_or_default();
        if bot_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let channel_username = env_str("CHANNEL_USERNAME")
            .and_then(non_empty)
            .map(|s| s.trim_start_matches('@').to_string())
            .ok_or_else(|| {
                Error::Config("CHANNEL_USERNAME environment variable is required".to_string())
            })?;
        let channel_link = env_str("CHANNEL_LINK")
            .and_then(non_empty)
            .unwrap_or_else(|| format!("https://t.me/{channel_username}"));

        let lookup_api_url = env_str("LOOKUP_API_URL").and_then(non_empty).ok_or_else(|| {
            Error::Config("LOOKUP_API_URL environment variable is required".to_string())
        })?;
        if !lookup_api_url.contains("{term}") {
            return Err(Error::Config(
                "LOOKUP_API_URL must contain a {term} placeholder".to_string(),
            ));
        }

        let group_chat_id = env_i64("GROUP_CHAT_ID").ok_or_else(|| {
            Error::Config("GROUP_CHAT_ID environment variable is required".to_string())
        })?;
        let group_link = env_str("GROUP_LINK").and_then(non_empty);

        let admin_ids = parse_csv_i64(env_str("ADMIN_IDS"));

        let database_url =
            env_str("DATABASE_URL").unwrap_or_else(|| "sqlite://nsb.db?mode=rwc".to_string());

        let port = env_u16("PORT").unwrap_or(10_000);

        let request_cooldown = Duration::from_secs(env_u64("REQUEST_COOLDOWN").unwrap_or(5));
        let http_connect_timeout =
            Duration::from_millis(env_u64("HTTP_CONNECT_TIMEOUT_MS").unwrap_or(5_000));
        let http_total_timeout =
            Duration::from_millis(env_u64("HTTP_TOTAL_TIMEOUT_MS").unwrap_or(15_000));
        let broadcast_delay = Duration::from_millis(env_u64("BROADCAST_DELAY_MS").unwrap_or(100));

        Ok(Self {
            bot_token,
            channel_username,
            channel_link,
            lookup_api_url,
            group_chat_id,
            group_link,
            admin_ids,
            database_url,
            port,
            request_cooldown,
            http_connect_timeout,
            http_total_timeout,
            broadcast_delay,
        })
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u16(key: &str) -> Option<u16> {
    env_str(key).and_then(|s| s.trim().parse::<u16>().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
