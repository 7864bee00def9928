//! `medistore login`, `medistore register` and `medistore profile [update]`
//!
//! Each invocation is a fresh process, so the session token is handed back
//! to the user to export as `MEDISTORE_API_TOKEN`.

use secrecy::{ExposeSecret, SecretString};

use medistore_core::Email;
use medistore_storefront::api::{ProfileUpdate, Registration, UserProfile};
use medistore_storefront::state::AppState;

use super::CliError;
use crate::{telemetry, view};

pub async fn login(state: &AppState, email: &str, password: String) -> Result<(), CliError> {
    let email = Email::parse(email)?;
    let password = SecretString::from(password);

    let user = state.login(&email, &password).await?;
    announce_session(state, user.as_ref(), email.as_str()).await;
    Ok(())
}

pub async fn register(
    state: &AppState,
    name: String,
    email: &str,
    password: String,
    phone: Option<String>,
) -> Result<(), CliError> {
    let registration = Registration {
        name,
        email: Email::parse(email)?,
        password: SecretString::from(password),
        phone,
    };

    let user = state.register(&registration).await?;
    announce_session(state, user.as_ref(), registration.email.as_str()).await;
    Ok(())
}

pub async fn profile(state: &AppState) -> Result<(), CliError> {
    let user = state.profile().await?;
    telemetry::set_user(&user);
    view::emit(&view::render_profile(&user));
    Ok(())
}

pub async fn update_profile(state: &AppState, update: &ProfileUpdate) -> Result<(), CliError> {
    let user = state.update_profile(update).await?;
    telemetry::set_user(&user);
    view::emit(&format!("Profile updated\n{}", view::render_profile(&user)));
    Ok(())
}

async fn announce_session(state: &AppState, user: Option<&UserProfile>, email: &str) {
    match user {
        Some(user) => {
            telemetry::set_user(user);
            view::emit(&format!("Signed in as {}", user.name));
        }
        None => view::emit(&format!("Signed in as {email}")),
    }

    if let Some(token) = state.api().token().await {
        view::emit(&format!(
            "export MEDISTORE_API_TOKEN={}",
            token.expose_secret()
        ));
    }
}
