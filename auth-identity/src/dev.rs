use crate::{config::DevIdentityConfig, error::*, models::*, repository::UserDirectory};

/// Find or create the standing development identity.
///
/// Callers are responsible for only invoking this in a deployment that is
/// explicitly flagged as development.
pub async fn ensure_dev_identity(
    directory: &dyn UserDirectory,
    config: &DevIdentityConfig,
) -> Result<Identity> {
    if let Some(existing) = directory.find_by_email(&config.email).await? {
        return Ok(existing);
    }

    let new_user = NewIdentity::new(config.email.clone())
        .with_username(config.username.clone())
        .with_display_name(config.display_name.clone())
        .with_role(Role::Admin)
        .verified();

    match directory.create_user(new_user).await {
        Ok(identity) => {
            tracing::info!(user_id = %identity.id, "Created development identity for auto-login");
            Ok(identity)
        }
        // Lost a creation race with another instance; read the winner back
        Err(IdentityError::UserAlreadyExists) => directory
            .find_by_email(&config.email)
            .await?
            .ok_or_else(|| IdentityError::Unavailable("development identity vanished".to_string())),
        Err(e) => Err(e),
    }
}
