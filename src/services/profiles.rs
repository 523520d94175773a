use crate::{
    db::DbPool,
    entities::profile::{self, Entity as ProfileEntity},
    errors::ServiceError,
    events::{DomainEvent, EventSender},
    services::email::EmailService,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Verification states a profile can hold
pub const VERIFICATION_STATUSES: [&str; 3] = ["pending", "verified", "rejected"];

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Display name is required"))]
    pub display_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Profile category is required"))]
    pub profile_category: String,
}

/// Service for purchaser profiles and their verification lifecycle
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DbPool>,
    email: Arc<EmailService>,
    event_sender: Option<Arc<EventSender>>,
}

impl ProfileService {
    pub fn new(
        db: Arc<DbPool>,
        email: Arc<EmailService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            email,
            event_sender,
        }
    }

    /// Creates a profile in the `pending` verification state
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_profile(
        &self,
        request: CreateProfileRequest,
    ) -> Result<profile::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let now = Utc::now();
        let created = profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            display_name: Set(request.display_name),
            email: Set(request.email),
            profile_category: Set(request.profile_category),
            verification_status: Set("pending".to_string()),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(&*self.db)
        .await?;

        info!(profile_id = %created.id, "Profile created");
        Ok(created)
    }

    /// Retrieves a profile by ID
    pub async fn get_profile(
        &self,
        profile_id: Uuid,
    ) -> Result<Option<profile::Model>, ServiceError> {
        Ok(ProfileEntity::find_by_id(profile_id).one(&*self.db).await?)
    }

    /// Transitions a profile's verification status. The change is persisted
    /// first; the notification email is awaited afterwards with its outcome
    /// recorded, and a transport failure does not undo the transition.
    #[instrument(skip(self), fields(profile_id = %profile_id, status = %new_status))]
    pub async fn set_verification_status(
        &self,
        profile_id: Uuid,
        new_status: &str,
    ) -> Result<profile::Model, ServiceError> {
        if !VERIFICATION_STATUSES.contains(&new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Unknown verification status: {}",
                new_status
            )));
        }

        let profile = self.get_profile(profile_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("Profile with ID {} not found", profile_id))
        })?;

        if profile.verification_status == new_status {
            // No transition, nothing to notify
            return Ok(profile);
        }

        let mut update: profile::ActiveModel = profile.clone().into();
        update.verification_status = Set(new_status.to_string());
        update.updated_at = Set(Some(Utc::now()));
        let updated = update.update(&*self.db).await?;

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(DomainEvent::ProfileVerificationChanged {
                    profile_id,
                    status: new_status.to_string(),
                })
                .await
            {
                warn!(error = %e, "Failed to send verification-changed event");
            }
        }

        match self
            .email
            .send_verification_status(&updated.email, &updated.display_name, new_status)
            .await
        {
            Ok(id) => {
                info!(email_id = %id, "Verification-status email dispatched");
                if let Some(sender) = &self.event_sender {
                    let _ = sender
                        .send(DomainEvent::EmailDispatched {
                            kind: "verification_status".to_string(),
                            recipient: updated.email.clone(),
                        })
                        .await;
                }
            }
            Err(e) => {
                // Status change stands; the failed notification is recorded
                // for reconciliation
                error!(profile_id = %profile_id, error = %e, "Verification-status email failed");
                if let Some(sender) = &self.event_sender {
                    let _ = sender
                        .send(DomainEvent::EmailFailed {
                            kind: "verification_status".to_string(),
                            recipient: updated.email.clone(),
                            reason: e.to_string(),
                        })
                        .await;
                }
            }
        }

        Ok(updated)
    }
}
