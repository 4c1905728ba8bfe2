use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use serde::{Deserialize, Serialize};

use crate::{types::Token, utils, warning};

/// Name of the encrypted cookie holding the session.
pub const SESSION_COOKIE: &str = "playlist_shuffler_session";

/// Seconds before the stated expiry at which a token already counts as expired.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

/// Per-browser state of the authorization flow.
///
/// The whole struct lives in one private (encrypted and authenticated) cookie
/// without an expiry, so it ends with the browser session.
///
/// - `state_key`: set when an authorization attempt starts, removed by the
///   callback that consumes it
/// - `token`: set by a successful code exchange; the access token is valid
///   until [`Session::token_expiration`] minus the safety margin
/// - `user_id`: set once the identity lookup after the exchange succeeded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub state_key: Option<String>,
    pub token: Option<Token>,
    pub user_id: Option<String>,
}

impl Session {
    /// Reads the session from the cookie jar.
    ///
    /// A missing cookie, or one that fails to decrypt or decode, yields an
    /// empty session.
    pub fn load(jar: &PrivateCookieJar) -> Self {
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Self::default();
        };

        match serde_json::from_str(cookie.value()) {
            Ok(session) => session,
            Err(e) => {
                warning!("Discarding unreadable session cookie: {}", e);
                Self::default()
            }
        }
    }

    /// Writes the session into the cookie jar.
    pub fn persist(&self, jar: PrivateCookieJar, secure: bool) -> PrivateCookieJar {
        let value = match serde_json::to_string(self) {
            Ok(value) => value,
            Err(e) => {
                warning!("Cannot encode session, clearing it: {}", e);
                return Self::clear(jar);
            }
        };

        let cookie = Cookie::build((SESSION_COOKIE, value))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path("/")
            .build();

        jar.add(cookie)
    }

    /// Removes the session cookie.
    pub fn clear(jar: PrivateCookieJar) -> PrivateCookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }

    /// Starts an authorization attempt and returns its fresh state key.
    pub fn begin_authorization(&mut self) -> String {
        let state_key = utils::create_state_key(utils::STATE_KEY_LEN);
        self.state_key = Some(state_key.clone());
        state_key
    }

    /// Removes and returns the pending state key.
    pub fn take_state_key(&mut self) -> Option<String> {
        self.state_key.take()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.access_token.as_str())
    }

    /// Absolute expiry of the access token as a unix timestamp.
    pub fn token_expiration(&self) -> Option<i64> {
        self.token.as_ref().map(Token::expires_at)
    }

    /// Whether the access token must be refreshed before use at `now`.
    ///
    /// A session without a token never needs a refresh; it needs a login.
    pub fn needs_refresh(&self, now: i64) -> bool {
        match self.token_expiration() {
            Some(expiration) => now >= expiration - TOKEN_EXPIRY_MARGIN_SECS,
            None => false,
        }
    }

    /// A session is complete once both the token pair and the user id are known.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user_id.is_some()
    }
}
