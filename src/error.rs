//! Typed errors for the shuffler.
//!
//! Every provider call, session lookup and configuration read reports a
//! [`ShuffleError`]. Route handlers decide from [`ShuffleError::kind`] whether
//! to reset the session (auth errors) or to render a failure view.

use thiserror::Error;

/// Broad category of a [`ShuffleError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// State mismatch, provider denial, missing session or failed token grant.
    Auth,
    /// A resource endpoint answered with an unexpected status.
    Api,
    /// A batched playlist write stopped after some batches were applied.
    PartialWrite,
    /// The chosen playlist cannot be shuffled as requested.
    Input,
    /// The request never produced a usable response.
    Transport,
    /// Missing or malformed configuration.
    Config,
}

#[derive(Debug, Error)]
pub enum ShuffleError {
    #[error("authorization state does not match the session")]
    StateMismatch,

    #[error("authorization was denied by the provider: {0}")]
    AuthorizationDenied(String),

    #[error("session is not authenticated")]
    Unauthenticated,

    #[error("token request failed with status {status}: {message}")]
    TokenRequest { status: u16, message: String },

    #[error("{context} failed with status {status}")]
    Api { context: &'static str, status: u16 },

    #[error(
        "playlist write stopped after {written_batches} of {total_batches} batches \
         ({written_tracks} tracks written), status {status}"
    )]
    PartialWrite {
        written_batches: usize,
        total_batches: usize,
        written_tracks: usize,
        status: u16,
    },

    #[error("invalid playlist id: {0:?}")]
    InvalidPlaylist(String),

    #[error("{skipped} of {total} playlist entries are unavailable; rewriting would remove them")]
    UnavailableTracks { skipped: usize, total: u32 },

    #[error("{context} request failed: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("missing environment variable {0}")]
    MissingConfig(&'static str),

    #[error("invalid value for {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },
}

impl ShuffleError {
    /// Wraps a reqwest error with the name of the call that produced it.
    pub fn transport(context: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ShuffleError::Transport { context, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ShuffleError::StateMismatch
            | ShuffleError::AuthorizationDenied(_)
            | ShuffleError::Unauthenticated
            | ShuffleError::TokenRequest { .. } => ErrorKind::Auth,
            ShuffleError::Api { .. } => ErrorKind::Api,
            ShuffleError::PartialWrite { .. } => ErrorKind::PartialWrite,
            ShuffleError::InvalidPlaylist(_) | ShuffleError::UnavailableTracks { .. } => {
                ErrorKind::Input
            }
            ShuffleError::Transport { .. } => ErrorKind::Transport,
            ShuffleError::MissingConfig(_) | ShuffleError::InvalidConfig { .. } => {
                ErrorKind::Config
            }
        }
    }

    /// HTTP status reported by the provider, if the error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ShuffleError::TokenRequest { status, .. }
            | ShuffleError::Api { status, .. }
            | ShuffleError::PartialWrite { status, .. } => Some(*status),
            ShuffleError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        self.kind() == ErrorKind::Auth
    }
}
