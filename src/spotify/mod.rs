//! # Spotify Integration Module
//!
//! This module is the integration layer between the shuffler and the Spotify
//! Web API. It owns all HTTP communication: OAuth token grants, the identity
//! lookup, paginated reads of playlists and playlist items, and the batched
//! rewrite of a playlist.
//!
//! ## Architecture
//!
//! ```text
//! Web Routes (api)
//!          ↓
//! Session & Token Lifecycle (management)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (authorize URL, token grants, /me)
//!     ├── Pagination (offset-driven fetch of every page)
//!     ├── Playlists (owned playlists of the user)
//!     └── Tracks (playlist items, batched replace/append)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Error Handling
//!
//! Every call returns a [`ShuffleError`] carrying the name of the call and the
//! provider status. Transient failures are retried by [`SpotifyClient::send`]:
//!
//! - **429 Too Many Requests**: waits for `Retry-After` when it is at most
//!   120 seconds, for any request
//! - **5xx**: exponential backoff, only for idempotent requests (`GET`, `PUT`)
//!
//! Non-idempotent requests (`POST` appends and token grants) are never
//! repeated after a server error, because the provider may already have
//! applied them.
//!
//! ## API Coverage
//!
//! - `POST /api/token` - authorization code and refresh token grants
//! - `GET /me` - identity of the signed-in user
//! - `GET /users/{user_id}/playlists` - playlists of the user
//! - `GET /playlists/{playlist_id}/tracks` - items of a playlist
//! - `PUT /playlists/{playlist_id}/tracks` - replace items
//! - `POST /playlists/{playlist_id}/tracks` - append items

use std::{sync::Arc, time::Duration};

use reqwest::{Client, RequestBuilder, Response, StatusCode, header::RETRY_AFTER};
use tokio::time::sleep;

use crate::{config::Config, error::ShuffleError, warning};

pub mod auth;
pub mod pagination;
pub mod playlist;
pub mod tracks;

/// Longest `Retry-After` the client is willing to wait for.
const MAX_RETRY_AFTER_SECS: u64 = 120;

/// Whether a request may be repeated after a server error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
    Idempotent,
    RateLimitOnly,
}

/// HTTP client for the Spotify accounts service and Web API.
///
/// Cheap to clone; all clones share one connection pool and one
/// configuration.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: Client,
    config: Arc<Config>,
}

impl SpotifyClient {
    /// Builds a client whose requests time out after `config.http_timeout`.
    pub fn new(config: Arc<Config>) -> Result<Self, ShuffleError> {
        let http = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(ShuffleError::transport("client setup"))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Joins `path` onto the configured Web API base url.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Sends a request, retrying transient failures according to `retry`.
    ///
    /// # Returns
    ///
    /// The last response received, whatever its status. Callers map
    /// unexpected statuses into typed errors themselves.
    ///
    /// # Errors
    ///
    /// [`ShuffleError::Transport`] when no response was received at all.
    pub async fn send(
        &self,
        request: RequestBuilder,
        retry: Retry,
        context: &'static str,
    ) -> Result<Response, ShuffleError> {
        let mut attempt: u32 = 0;

        loop {
            // Bodies built from JSON or forms are always cloneable.
            let Some(current) = request.try_clone() else {
                return request
                    .send()
                    .await
                    .map_err(ShuffleError::transport(context));
            };

            let response = current
                .send()
                .await
                .map_err(ShuffleError::transport(context))?;

            if attempt >= self.config.max_retries {
                return Ok(response);
            }

            let status = response.status();
            let delay = if status == StatusCode::TOO_MANY_REQUESTS {
                match retry_after(&response) {
                    Some(secs) if secs <= MAX_RETRY_AFTER_SECS => Duration::from_secs(secs),
                    Some(secs) => {
                        warning!(
                            "{} rate limited, Retry-After of {} seconds is too long to wait",
                            context,
                            secs
                        );
                        return Ok(response);
                    }
                    None => self.backoff(attempt),
                }
            } else if status.is_server_error() && retry == Retry::Idempotent {
                self.backoff(attempt)
            } else {
                return Ok(response);
            };

            warning!(
                "{} returned {}, retrying in {} ms",
                context,
                status.as_u16(),
                delay.as_millis()
            );
            sleep(delay).await;
            attempt += 1;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config.retry_backoff * 2u32.saturating_pow(attempt)
    }
}

fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
