//! Bearer token authentication and refresh token rotation.
//!
//! Dual-token system: short-lived access tokens (minutes, stateless, sent as
//! `Authorization: Bearer`) and long-lived refresh tokens (days, one per user
//! in the database, sent as an HttpOnly cookie and rotated on every use).

mod access;
mod cookie;
mod errors;
mod extractors;
mod ip;
mod middleware;
mod refresh;
mod state;
mod types;

pub use access::AccessTokenIssuer;
pub use cookie::{REFRESH_COOKIE_NAME, RefreshCookie, bearer_token, get_cookie};
pub use errors::{AuthError, RATE_LIMITED_MESSAGE};
pub use extractors::{Auth, OptionalAuth};
pub use ip::extract_client_key;
pub use middleware::authenticate;
pub use refresh::{IssuedRefreshToken, RefreshTokenService, RotatedTokens};
pub use state::{AuthBackend, UserDirectory};
pub use types::AuthenticatedUser;
