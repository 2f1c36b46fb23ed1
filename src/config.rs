//! Configuration from environment variables (port, public URL, static files, cards).

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::game::session::{SessionSettings, DEFAULT_CARD_COUNT};

const DEFAULT_PORT: u16 = 3000;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("CARD_NAMES is set but lists no names")]
    EmptyRoster,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Externally reachable base URL, without a trailing slash.
    pub public_url: String,
    pub static_dir: PathBuf,
    pub session: SessionSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// - `PORT`: listen port, default 3000.
    /// - `PUBLIC_URL`: public base URL. Otherwise `FLY_APP_NAME` yields
    ///   `https://{app}.fly.dev`, and `http://localhost:{port}` is the fallback.
    /// - `STATIC_DIR`: directory holding the client pages.
    /// - `CARD_COUNT`: number of cards, default 50.
    /// - `CARD_NAMES`: comma separated roster, one card per name.
    /// - `DRAW_CARDS`: whether confirming draws a card, default true.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(v) => v.trim().parse::<u16>().map_err(|_| ConfigError::Invalid { name: "PORT", value: v })?,
            None => DEFAULT_PORT,
        };

        let public_url = match (lookup("PUBLIC_URL"), lookup("FLY_APP_NAME")) {
            (Some(url), _) if !url.trim().is_empty() => url.trim().trim_end_matches('/').to_string(),
            (_, Some(app)) if !app.trim().is_empty() => format!("https://{}.fly.dev", app.trim()),
            _ => format!("http://localhost:{}", port),
        };

        let static_dir = match lookup("STATIC_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => default_static_dir(),
        };

        let card_count = match lookup("CARD_COUNT") {
            Some(v) => match v.trim().parse::<u32>() {
                Ok(n) if n > 0 => n as usize,
                _ => return Err(ConfigError::Invalid { name: "CARD_COUNT", value: v }),
            },
            None => DEFAULT_CARD_COUNT,
        };

        let card_names = match lookup("CARD_NAMES") {
            Some(raw) => {
                let names: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(String::from)
                    .collect();
                if names.is_empty() {
                    return Err(ConfigError::EmptyRoster);
                }
                Some(names)
            }
            None => None,
        };

        let draw_cards = match lookup("DRAW_CARDS") {
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid { name: "DRAW_CARDS", value: v })?,
            None => true,
        };

        Ok(Self {
            port,
            public_url,
            static_dir,
            session: SessionSettings { card_count, card_names, draw_cards },
        })
    }

    /// Socket address to bind the server to, on all interfaces.
    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// Page participants open on their phones; this is what the QR code encodes.
    pub fn mobile_url(&self) -> String {
        format!("{}/mobile", self.public_url)
    }

    /// Origins allowed by CORS.
    pub fn allowed_origins(&self) -> Vec<String> {
        let local = format!("http://localhost:{}", self.port);
        if self.public_url == local {
            vec![local]
        } else {
            vec![self.public_url.clone(), local]
        }
    }
}

/// Order: `./public` (container layout), then `../public` (running from a subdirectory).
fn default_static_dir() -> PathBuf {
    let p = Path::new("./public");
    if p.exists() {
        return p.to_path_buf();
    }
    PathBuf::from("../public")
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
