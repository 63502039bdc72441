//! Logout side channel.

use crate::api::{ApiError, ApiResult};
use tracing::error;

/// Where the browser goes after the session is gone.
pub const AFTER_LOGOUT: &str = "/";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogoutState {
    #[default]
    Idle,
    Pending,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// Hard navigation target.
    Redirect(&'static str),
    Failed(ApiError),
}

impl LogoutState {
    /// Returns false while a logout is already running; the click is
    /// ignored then.
    pub fn begin(&mut self) -> bool {
        if *self == Self::Pending {
            return false;
        }
        *self = Self::Pending;
        true
    }

    /// Failures are not retried; the user may click again.
    pub fn finish(&mut self, result: ApiResult<()>) -> LogoutOutcome {
        match result {
            Ok(()) => {
                *self = Self::Idle;
                LogoutOutcome::Redirect(AFTER_LOGOUT)
            }
            Err(e) => {
                error!(error = %e, "error during logout");
                *self = Self::Error;
                LogoutOutcome::Failed(e)
            }
        }
    }

    /// The session is gone but the browser refused to leave the page.
    pub fn redirect_failed(&mut self, to: &str, reason: &str) {
        error!(to, reason, "redirect after logout failed");
        *self = Self::Error;
    }
}
