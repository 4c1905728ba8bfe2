//! Configuration management for the Spotify Playlist Shuffler.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files. It provides a single typed [`Config`] that is built
//! once at startup and shared by the HTTP client and the web server.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the working directory
//! 3. `.env` file in the local data directory
//! 4. Application defaults (where applicable)

use std::{env, fmt, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use crate::error::ShuffleError;

const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_SCOPE: &str = "playlist-modify-private playlist-modify-public playlist-read-private";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Minimum length of the secret the session cookie key is derived from.
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Loads environment variables from `.env` files.
///
/// Creates the necessary directory structure if it doesn't exist, then loads
/// a `.env` file from the working directory followed by the one located in
/// the platform-specific local data directory under `playlist-shuffler/.env`.
/// Variables that are already set are never overwritten, so the real
/// environment always wins, then the working directory file.
///
/// # Directory Structure
///
/// The function looks for the data directory `.env` file in:
/// - Linux: `~/.local/share/playlist-shuffler/.env`
/// - macOS: `~/Library/Application Support/playlist-shuffler/.env`
/// - Windows: `%LOCALAPPDATA%/playlist-shuffler/.env`
///
/// # Errors
///
/// This function will return an error if:
/// - The parent directory cannot be created
/// - An existing `.env` file cannot be read or parsed
///
/// Missing `.env` files are not an error; the hosting environment may
/// provide every variable directly.
pub async fn load_env() -> Result<(), String> {
    let data_env = env_file_path();
    if let Some(parent) = data_env.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    load_env_files(&[PathBuf::from(".env"), data_env])
}

/// Loads the given `.env` files in order, skipping files that do not exist.
///
/// A variable keeps the first value it receives, so earlier files take
/// priority over later ones.
pub fn load_env_files(paths: &[PathBuf]) -> Result<(), String> {
    for path in paths {
        if path.is_file() {
            dotenv::from_path(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        }
    }
    Ok(())
}

fn env_file_path() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("playlist-shuffler/.env");
    path
}

/// Runtime configuration of the shuffler.
///
/// Secrets (`client_secret`, `session_secret`) are redacted from the `Debug`
/// output and must never be logged.
#[derive(Clone)]
pub struct Config {
    /// Address the web server binds to (`SERVER_ADDRESS`).
    pub server_address: SocketAddr,
    /// Spotify application client id (`SPOTIFY_API_AUTH_CLIENT_ID`).
    pub client_id: String,
    /// Spotify application client secret (`SPOTIFY_API_AUTH_CLIENT_SECRET`).
    pub client_secret: String,
    /// Callback URL registered with Spotify (`SPOTIFY_API_REDIRECT_URI`).
    pub redirect_uri: String,
    /// Secret the session cookie key is derived from (`SESSION_SECRET`).
    pub session_secret: String,
    /// Space separated OAuth scopes (`SPOTIFY_API_AUTH_SCOPE`).
    pub scope: String,
    /// Base URL of the Web API (`SPOTIFY_API_URL`).
    pub api_url: String,
    /// Authorization endpoint (`SPOTIFY_API_AUTH_URL`).
    pub auth_url: String,
    /// Token endpoint (`SPOTIFY_API_TOKEN_URL`).
    pub token_url: String,
    /// Per-request timeout (`HTTP_TIMEOUT_SECS`).
    pub http_timeout: Duration,
    /// Retries for transient failures (`HTTP_MAX_RETRIES`).
    pub max_retries: u32,
    /// Base delay of the exponential backoff (`HTTP_RETRY_BACKOFF_MS`).
    pub retry_backoff: Duration,
}

impl Config {
    /// Creates a configuration with the given credentials and defaults for
    /// everything else.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
        session_secret: impl Into<String>,
    ) -> Self {
        Self {
            server_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            session_secret: session_secret.into(),
            scope: DEFAULT_SCOPE.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }

    /// Builds the configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `SPOTIFY_API_AUTH_CLIENT_ID`
    /// - `SPOTIFY_API_AUTH_CLIENT_SECRET`
    /// - `SPOTIFY_API_REDIRECT_URI`
    /// - `SESSION_SECRET` (at least 32 characters)
    ///
    /// # Optional Variables
    ///
    /// - `SERVER_ADDRESS` (default `127.0.0.1:8080`)
    /// - `SPOTIFY_API_URL`, `SPOTIFY_API_AUTH_URL`, `SPOTIFY_API_TOKEN_URL`
    /// - `SPOTIFY_API_AUTH_SCOPE`
    /// - `HTTP_TIMEOUT_SECS`, `HTTP_MAX_RETRIES`, `HTTP_RETRY_BACKOFF_MS`
    ///
    /// # Errors
    ///
    /// Returns [`ShuffleError::MissingConfig`] for an unset required variable and
    /// [`ShuffleError::InvalidConfig`] for a value that cannot be parsed.
    pub fn from_env() -> Result<Self, ShuffleError> {
        let mut config = Self::new(
            required("SPOTIFY_API_AUTH_CLIENT_ID")?,
            required("SPOTIFY_API_AUTH_CLIENT_SECRET")?,
            required("SPOTIFY_API_REDIRECT_URI")?,
            required("SESSION_SECRET")?,
        );

        config.server_address = parsed("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)?;
        config.api_url = optional("SPOTIFY_API_URL", DEFAULT_API_URL);
        config.auth_url = optional("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL);
        config.token_url = optional("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL);
        config.scope = optional("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE);
        config.http_timeout = Duration::from_secs(parsed(
            "HTTP_TIMEOUT_SECS",
            &DEFAULT_HTTP_TIMEOUT_SECS.to_string(),
        )?);
        config.max_retries = parsed("HTTP_MAX_RETRIES", &DEFAULT_MAX_RETRIES.to_string())?;
        config.retry_backoff = Duration::from_millis(parsed(
            "HTTP_RETRY_BACKOFF_MS",
            &DEFAULT_RETRY_BACKOFF_MS.to_string(),
        )?);

        config.validate()?;
        Ok(config)
    }

    /// Checks invariants that the environment parsing alone cannot express.
    pub fn validate(&self) -> Result<(), ShuffleError> {
        if self.session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(ShuffleError::InvalidConfig {
                name: "SESSION_SECRET",
                reason: format!("must be at least {MIN_SESSION_SECRET_LEN} characters"),
            });
        }

        for (name, value) in [
            ("SPOTIFY_API_REDIRECT_URI", &self.redirect_uri),
            ("SPOTIFY_API_AUTH_URL", &self.auth_url),
            ("SPOTIFY_API_TOKEN_URL", &self.token_url),
            ("SPOTIFY_API_URL", &self.api_url),
        ] {
            url::Url::parse(value).map_err(|e| ShuffleError::InvalidConfig {
                name,
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Whether session cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.redirect_uri.starts_with("https://")
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server_address", &self.server_address)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("session_secret", &"<redacted>")
            .field("scope", &self.scope)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("http_timeout", &self.http_timeout)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff", &self.retry_backoff)
            .finish()
    }
}

fn required(name: &'static str) -> Result<String, ShuffleError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ShuffleError::MissingConfig(name)),
    }
}

fn optional(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parsed<T>(name: &'static str, default: &str) -> Result<T, ShuffleError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    optional(name, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ShuffleError::InvalidConfig {
            name,
            reason: e.to_string(),
        })
}
