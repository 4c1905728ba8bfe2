use serde::{Deserialize, Serialize};

use crate::{error::ShuffleError, utils};

/// OAuth token pair as kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: i64,
    pub obtained_at: i64,
}

impl Token {
    /// Absolute expiry as a unix timestamp.
    pub fn expires_at(&self) -> i64 {
        self.obtained_at + self.expires_in
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub name: String,
    pub uri: String,
}

impl Playlist {
    /// Bare playlist id taken from a `spotify:playlist:<id>` uri.
    pub fn id(&self) -> Result<&str, ShuffleError> {
        utils::playlist_id_from_uri(&self.uri)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    pub uri: String,
}

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u32,
    /// Entries the provider listed but that could not be turned into items.
    pub skipped: usize,
}

/// Outcome of a complete playlist rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub batches: usize,
    pub tracks: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenErrorResponse {
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserPlaylistsResponse {
    pub items: Vec<PlaylistObject>,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistObject {
    pub name: String,
    pub uri: String,
    pub owner: PlaylistOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

impl PlaylistOwner {
    pub fn is(&self, user_id: &str) -> bool {
        self.id.as_deref() == Some(user_id) || self.display_name.as_deref() == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPlaylistItemsResponse {
    pub items: Vec<PlaylistItem>,
    pub total: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksRequest {
    pub uris: Vec<String>,
}
