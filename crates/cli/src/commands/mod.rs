//! Command handlers.
//!
//! Each handler dispatches one intent to a store slice and renders the
//! result. A failure is reported to the caller and then dismissed from the
//! slice, so a stale error never resurfaces.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::future::Future;

use thiserror::Error;

use medistore_core::EmailError;
use medistore_storefront::api::ApiError;
use medistore_storefront::config::ConfigError;
use medistore_storefront::error::StoreError;

/// Errors that end a command with a non-zero exit status.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command needs a session.
    #[error("{0} (run `medistore login` and export MEDISTORE_API_TOKEN)")]
    LoginRequired(StoreError),

    /// A store operation failed.
    #[error(transparent)]
    Store(StoreError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The API client could not be built.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        if err.requires_login() {
            Self::LoginRequired(err)
        } else {
            Self::Store(err)
        }
    }
}

/// Pass a store result through, dismissing the slice's error on failure.
async fn settle<T>(
    result: Result<T, StoreError>,
    dismiss: impl Future<Output = ()>,
) -> Result<T, CliError> {
    match result {
        Ok(value) => Ok(value),
        Err(e) => {
            dismiss.await;
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use medistore_storefront::error::FailureKind;

    use super::*;

    #[test]
    fn test_unauthenticated_becomes_login_hint() {
        let err = CliError::from(StoreError::unauthenticated());
        assert!(matches!(err, CliError::LoginRequired(_)));
        assert!(err.to_string().starts_with("Please login to continue"));
    }

    #[test]
    fn test_store_message_is_passed_through() {
        let err = CliError::from(StoreError::new(FailureKind::Validation, "Insufficient stock"));
        assert_eq!(err.to_string(), "Insufficient stock");
    }

    #[tokio::test]
    async fn test_settle_dismisses_only_on_failure() {
        let dismissed = std::cell::Cell::new(false);

        let ok: Result<u8, CliError> = settle(Ok(1), async { dismissed.set(true) }).await;
        assert!(ok.is_ok());
        assert!(!dismissed.get());

        let err = settle::<u8>(Err(StoreError::empty_cart()), async { dismissed.set(true) }).await;
        assert!(err.is_err());
        assert!(dismissed.get());
    }
}
