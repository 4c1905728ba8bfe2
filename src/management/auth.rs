use chrono::Utc;

use crate::{
    error::ShuffleError,
    management::Session,
    spotify::{SpotifyClient, auth},
    types::Token,
    warning,
};

/// Drives the token lifecycle of a [`Session`].
///
/// The manager holds no state of its own; every operation reads and updates
/// the session it is given.
pub struct TokenManager<'a> {
    client: &'a SpotifyClient,
}

impl<'a> TokenManager<'a> {
    pub fn new(client: &'a SpotifyClient) -> Self {
        TokenManager { client }
    }

    /// Exchanges an authorization code and completes the session.
    ///
    /// On success the session holds the token pair, its expiry and the user
    /// id. If the token endpoint rejects the code, the session is left
    /// without a token. If only the identity lookup fails, the token pair is
    /// stored but `user_id` stays empty and the session is incomplete.
    pub async fn exchange_code(
        &self,
        code: &str,
        session: &mut Session,
    ) -> Result<(), ShuffleError> {
        session.user_id = None;

        let response = auth::request_token(self.client, code).await?;
        let refresh_token = response
            .refresh_token
            .ok_or_else(|| ShuffleError::TokenRequest {
                status: 200,
                message: "token response without refresh_token".to_string(),
            })?;

        let token = Token {
            access_token: response.access_token,
            refresh_token,
            scope: response.scope.unwrap_or_default(),
            expires_in: response.expires_in,
            obtained_at: Utc::now().timestamp(),
        };
        let access_token = token.access_token.clone();
        session.token = Some(token);

        match auth::get_user_id(self.client, &access_token).await {
            Ok(user_id) => {
                session.user_id = Some(user_id);
                Ok(())
            }
            Err(e) => {
                warning!("Token granted but identity lookup failed: {}", e);
                Err(e)
            }
        }
    }

    /// Refreshes the access token unless it is valid for more than the
    /// expiry margin.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when a refresh happened, `Ok(false)` when the current token
    /// is still good.
    ///
    /// # Errors
    ///
    /// [`ShuffleError::Unauthenticated`] without a token, or the refresh
    /// failure. On failure the stale token stays in the session and must not
    /// be used.
    ///
    /// A refresh token returned by the provider is not stored; the original
    /// one keeps being used.
    pub async fn refresh_if_needed(&self, session: &mut Session) -> Result<bool, ShuffleError> {
        let now = Utc::now().timestamp();
        if session.token.is_none() {
            return Err(ShuffleError::Unauthenticated);
        }
        if !session.needs_refresh(now) {
            return Ok(false);
        }

        let Some(token) = session.token.as_mut() else {
            return Err(ShuffleError::Unauthenticated);
        };

        let response = match auth::refresh_token(self.client, &token.refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                warning!("Error acquiring refreshed token: {}", e);
                return Err(e);
            }
        };

        if let Some(rotated) = response.refresh_token.as_deref() {
            if rotated != token.refresh_token {
                warning!("Provider rotated the refresh token; the new one is not stored");
            }
        }

        token.access_token = response.access_token;
        token.expires_in = response.expires_in;
        token.obtained_at = Utc::now().timestamp();
        if let Some(scope) = response.scope {
            token.scope = scope;
        }

        Ok(true)
    }

    /// Returns an access token that is valid for at least the expiry margin,
    /// refreshing it first if needed.
    pub async fn get_valid_token(&self, session: &mut Session) -> Result<String, ShuffleError> {
        self.refresh_if_needed(session).await?;
        session
            .access_token()
            .map(str::to_string)
            .ok_or(ShuffleError::Unauthenticated)
    }
}
