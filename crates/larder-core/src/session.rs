//! Session context
//!
//! Passed explicitly into every coordinator call; the engine never reads
//! ambient global auth state.

use crate::error::AuthError;
use crate::models::UserId;

/// Authentication context for coordinator operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user: Option<UserId>,
}

impl Session {
    /// A session with no logged-in user; every sync operation fails fast
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    /// A session for the given user
    #[must_use]
    pub const fn logged_in(user: UserId) -> Self {
        Self { user: Some(user) }
    }

    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// The current user id, or `NotLoggedIn`
    pub fn user_id(&self) -> Result<&UserId, AuthError> {
        self.user.as_ref().ok_or(AuthError::NotLoggedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_no_user() {
        let session = Session::anonymous();
        assert!(!session.is_logged_in());
        assert_eq!(session.user_id(), Err(AuthError::NotLoggedIn));
    }

    #[test]
    fn test_logged_in_resolves_user() {
        let session = Session::logged_in(UserId::new("uid-1"));
        assert!(session.is_logged_in());
        assert_eq!(session.user_id().unwrap().as_str(), "uid-1");
    }
}
