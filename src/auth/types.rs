//! Authentication user types.

use crate::db::{User, UserRole};

/// Identity attached to a request by the authentication middleware.
/// Lives in the request extensions only; never stored or shared across requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Database user ID
    pub user_id: i64,
    /// Token subject
    pub email: String,
    pub username: String,
    pub role: UserRole,
    pub email_verified: bool,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            username: user.username,
            role: user.role,
            email_verified: user.email_verified,
        }
    }
}
