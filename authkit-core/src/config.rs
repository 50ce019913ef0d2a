//! Default endpoints per environment and session policy knobs.

use crate::Environment;

/// Account service base URL for the staging environment.
const STAGING_URL: &str = "https://accounts.stage.lumen-reader.app";

/// Account service base URL for the production environment.
const PRODUCTION_URL: &str = "https://accounts.lumen-reader.app";

impl Environment {
    /// Returns the default account service base URL for this environment.
    #[must_use]
    pub const fn backend_url(&self) -> &'static str {
        match self {
            Self::Staging => STAGING_URL,
            Self::Production => PRODUCTION_URL,
        }
    }
}

/// Policy configuration for the session manager.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// When true, a failed restore fetch clears the local session instead
    /// of leaving a stale authenticated view behind. Off by default: a
    /// transient network failure during restore should not log the user
    /// out.
    pub invalidate_on_restore_failure: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn environment_urls_are_https() {
        assert!(Environment::Staging.backend_url().starts_with("https://"));
        assert!(Environment::Production.backend_url().starts_with("https://"));
    }

    #[test]
    fn environment_parses_from_lowercase() {
        assert_eq!(
            Environment::from_str("production").unwrap(),
            Environment::Production
        );
        assert!(Environment::from_str("prod").is_err());
    }

    #[test]
    fn restore_failures_keep_the_session_by_default() {
        assert!(!SessionConfig::default().invalidate_on_restore_failure);
    }
}
