use std::{
    env, fs,
    path::{Path, PathBuf},
};

use chrono::Duration;

use crate::{domain::DEFAULT_COOLDOWN_DAYS, errors::Error, Result};

/// Typed configuration, read from the environment (and `.env` when present).
#[derive(Clone, Debug)]
pub struct Config {
    pub telegram_bot_token: String,

    /// Users allowed to review applications and ban applicants.
    pub admin_ids: Vec<i64>,
    /// Where new applications are announced.
    pub admin_chat_id: i64,
    /// The chat accepted applicants are invited into.
    pub clan_chat_id: i64,

    pub reapply_cooldown: Duration,
    pub store_file: Option<PathBuf>,
    pub manager_contact: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let admin_ids = parse_csv_i64(env_str("ADMIN_IDS"));
        let Some(&first_admin) = admin_ids.first() else {
            return Err(Error::Config(
                "ADMIN_IDS environment variable is required".to_string(),
            ));
        };

        let clan_chat_id = env_i64("CLAN_CHAT_ID").ok_or_else(|| {
            Error::Config("CLAN_CHAT_ID environment variable is required".to_string())
        })?;
        let admin_chat_id = env_i64("ADMIN_CHAT_ID").unwrap_or(first_admin);

        let cooldown_days = env_i64("REAPPLY_COOLDOWN_DAYS").unwrap_or(DEFAULT_COOLDOWN_DAYS);
        if cooldown_days < 0 {
            return Err(Error::Config(
                "REAPPLY_COOLDOWN_DAYS must not be negative".to_string(),
            ));
        }

        let store_file = env_str("STORE_FILE").and_then(non_empty).map(PathBuf::from);
        let manager_contact = env_str("MANAGER_CONTACT")
            .and_then(non_empty)
            .unwrap_or_else(|| "@manager".to_string());

        Ok(Self {
            telegram_bot_token,
            admin_ids,
            admin_chat_id,
            clan_chat_id,
            reapply_cooldown: Duration::days(cooldown_days),
            store_file,
            manager_contact,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
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

        let mut val = v.trim();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = &val[1..val.len() - 1];
        }
        out.push((key.to_string(), val.to_string()));
    }
    out
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
