mod auth;
mod session;

pub use auth::TokenManager;
pub use session::SESSION_COOKIE;
pub use session::Session;
pub use session::TOKEN_EXPIRY_MARGIN_SECS;
