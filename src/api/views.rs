use crate::{
    error::ShuffleError,
    types::{Playlist, WriteSummary},
    utils::escape_html,
    warning,
};

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

pub fn index(auth_url: &str) -> String {
    page(
        "Playlist Shuffler",
        &format!(
            "<p>Shuffle the track order of one of your Spotify playlists.</p>\n\
             <p><a href=\"{}\">Log in with Spotify</a></p>",
            escape_html(auth_url)
        ),
    )
}

pub fn no_playlists() -> String {
    page(
        "No playlists found",
        "<p>You do not own any playlists that could be shuffled.</p>\n\
         <p><a href=\"/index\">Back to start</a></p>",
    )
}

pub fn playlists(playlists: &[Playlist]) -> String {
    let mut rows = String::new();
    for playlist in playlists {
        let id = match playlist.id() {
            Ok(id) => id,
            Err(e) => {
                warning!("Not listing playlist {:?}: {}", playlist.name, e);
                continue;
            }
        };
        let name = escape_html(&playlist.name);
        rows.push_str(&format!(
            "<li><form method=\"post\" action=\"/randomized\">\
             <input type=\"hidden\" name=\"playlist_id\" value=\"{id}\">\
             <input type=\"hidden\" name=\"playlist_name\" value=\"{name}\">\
             {name} <button type=\"submit\">Shuffle</button></form></li>\n",
            id = escape_html(id),
        ));
    }

    page("Choose a playlist", &format!("<ul>\n{rows}</ul>"))
}

pub fn shuffled(playlist_name: &str, summary: &WriteSummary) -> String {
    page(
        "Playlist shuffled",
        &format!(
            "<p><strong>{}</strong> now plays its {} tracks in a new order.</p>\n\
             <p><a href=\"/randomize\">Shuffle another playlist</a></p>",
            escape_html(playlist_name),
            summary.tracks
        ),
    )
}

pub fn failure(error: &ShuffleError) -> String {
    let detail = match error {
        ShuffleError::PartialWrite {
            written_batches,
            total_batches,
            written_tracks,
            status,
        } => format!(
            "Spotify stopped accepting tracks after {written_batches} of {total_batches} \
             batches (status {status}). The playlist now holds only the first \
             {written_tracks} tracks of the new order."
        ),
        ShuffleError::InvalidPlaylist(_) => "That playlist cannot be shuffled.".to_string(),
        ShuffleError::UnavailableTracks { skipped, total } => format!(
            "{skipped} of the {total} entries in this playlist are no longer available. \
             Shuffling would remove them, so the playlist was left unchanged."
        ),
        ShuffleError::MissingConfig(_) | ShuffleError::InvalidConfig { .. } => {
            "The shuffler is not configured correctly.".to_string()
        }
        other => match other.status() {
            Some(status) => format!("Spotify answered with status {status}. Please try again."),
            None => "Spotify could not be reached. Please try again.".to_string(),
        },
    };

    page(
        "Shuffle failed",
        &format!(
            "<p>{}</p>\n<p><a href=\"/randomize\">Back to your playlists</a></p>",
            escape_html(&detail)
        ),
    )
}
