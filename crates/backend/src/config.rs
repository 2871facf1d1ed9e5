use std::path::PathBuf;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_PATH: &str = "data/sentinels.redb";
const DEFAULT_DIST_DIR: &str = "dist";

/// Server settings, read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
    pub dist_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("Invalid PORT {:?}: {}", raw, e))?,
            None => DEFAULT_PORT,
        };
        let db_path = lookup("DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let dist_dir = lookup("DIST_DIR").unwrap_or_else(|| DEFAULT_DIST_DIR.to_string());

        Ok(Config {
            port,
            db_path: PathBuf::from(db_path),
            dist_dir: PathBuf::from(dist_dir),
        })
    }
}
