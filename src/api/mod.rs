//! # API Module
//!
//! HTTP endpoints of the shuffler's web server. Every handler loads the
//! browser [`Session`](crate::management::Session) from the private cookie
//! jar, runs one step of the flow, and writes the session back (or clears it)
//! alongside the response.
//!
//! ## Endpoints
//!
//! ### Authentication
//!
//! - [`index`] - Landing page with the Spotify authorization link
//! - [`forward`] - Redirects straight to Spotify's authorization page
//! - [`callback`] - Completes the authorization-code flow
//!
//! ### Shuffling
//!
//! - [`randomize`] - Lists the user's own playlists
//! - [`randomized`] - Shuffles the chosen playlist and writes it back
//!
//! ### Monitoring
//!
//! - [`health`] - Application status and version
//!
//! ## Error Handling
//!
//! Authorization errors (state mismatch, provider denial, failed token grant
//! or refresh, missing session) clear the session and send the user back to
//! the landing page. Every other error renders the failure view with the
//! provider status; a partial playlist write says how much was written.

mod callback;
mod health;
mod index;
mod shuffle;
mod views;

pub use callback::CallbackParams;
pub use callback::callback;
pub use health::health;
pub use index::forward;
pub use index::index;
pub use shuffle::ShuffleForm;
pub use shuffle::randomize;
pub use shuffle::randomized;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{
    error::{ErrorKind, ShuffleError},
    management::Session,
    warning,
};

/// Turns a failed step into a response: sign-in problems restart the flow,
/// everything else renders the failure view.
fn failure_response(
    jar: PrivateCookieJar,
    session: &Session,
    secure: bool,
    e: ShuffleError,
) -> Response {
    if e.is_auth() {
        warning!("Session reset after authorization failure: {}", e);
        return (Session::clear(jar), Redirect::to("/index")).into_response();
    }

    warning!("Request failed: {}", e);
    let status = match e.kind() {
        ErrorKind::Input => StatusCode::BAD_REQUEST,
        ErrorKind::Config => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
    };

    (status, session.persist(jar, secure), Html(views::failure(&e))).into_response()
}
