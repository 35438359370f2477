//! Idempotent identity-provider setup.
//!
//! An identity-provider registration is keyed by its origin key within a
//! zone. [`ensure_identity_provider`] looks the key up first and then either
//! creates the record or replaces the one it found, so repeating setup never
//! produces a second registration.

use crate::client::IdpRegistry;
use crate::error::{FederationError, FederationResult};
use crate::identity_provider::{IdentityProvider, metadata_fingerprint};
use crate::token::AccessToken;
use crate::zone::Zone;
use log::{debug, info};
use std::fmt;

/// What [`ensure_identity_provider`] did to reach the desired state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Updated,
}

impl fmt::Display for UpsertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "Created"),
            Self::Updated => write!(f, "Updated"),
        }
    }
}

/// Find the registration whose origin key equals `origin_key`.
///
/// More than one match is a registry invariant violation and is reported as
/// a data-integrity error instead of picking one.
pub fn find_existing<'a>(
    providers: &'a [IdentityProvider],
    origin_key: &str,
) -> FederationResult<Option<&'a IdentityProvider>> {
    let mut matches = providers.iter().filter(|p| p.origin_key == origin_key);
    let first = matches.next();
    let extra = matches.count();
    if extra > 0 {
        return Err(FederationError::data_integrity(format!(
            "{} identity providers share origin key '{}'",
            extra + 1,
            origin_key
        )));
    }
    Ok(first)
}

/// Make `desired` the registration for its origin key in `zone`.
///
/// Returns the persisted record with its server-assigned id.
pub async fn ensure_identity_provider<R: IdpRegistry>(
    registry: &R,
    zone: &Zone,
    admin_token: &AccessToken,
    desired: &IdentityProvider,
) -> FederationResult<IdentityProvider> {
    let existing = registry.list_identity_providers(zone, admin_token).await?;
    debug!(
        "Zone {} has {} identity provider(s)",
        zone.id(),
        existing.len()
    );

    let (action, persisted) = match find_existing(&existing, &desired.origin_key)? {
        Some(found) => {
            let id = found.id.as_deref().ok_or_else(|| {
                FederationError::data_integrity(format!(
                    "listed identity provider '{}' has no id",
                    found.origin_key
                ))
            })?;
            let updated = registry
                .update_identity_provider(zone, admin_token, id, desired)
                .await?;
            if updated.id.as_deref() != Some(id) {
                return Err(FederationError::data_integrity(format!(
                    "update of identity provider {} returned id {:?}",
                    id, updated.id
                )));
            }
            (UpsertAction::Updated, updated)
        }
        None => {
            let created = registry
                .create_identity_provider(zone, admin_token, desired)
                .await?;
            if created.id.is_none() {
                return Err(FederationError::data_integrity(format!(
                    "created identity provider '{}' has no id",
                    created.origin_key
                )));
            }
            (UpsertAction::Created, created)
        }
    };

    if persisted.origin_key != desired.origin_key {
        return Err(FederationError::data_integrity(format!(
            "identity provider saved with origin key '{}', expected '{}'",
            persisted.origin_key, desired.origin_key
        )));
    }

    info!("{} identity provider in zone {}: {}", action, zone.id(), persisted);
    if let Ok(definition) = persisted.saml_definition() {
        debug!(
            "Identity provider {} metadata fingerprint {}",
            persisted.origin_key,
            metadata_fingerprint(&definition.metadata_location)
        );
    }
    Ok(persisted)
}
