// ABOUTME: Type definitions for API requests and responses
// ABOUTME: Includes auth payloads, user summaries and the checkup view with populated participants

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{
    checkup::{self, ImageAttachment, Status},
    user::{self, Role},
};

// Auth related types
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<user::Model> for UserSummary {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

// Checkup related types
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCheckupRequest {
    pub dentist_id: Uuid,
}

/// A participant reference. `name` and `email` are present only when populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Participant {
    pub fn id_only(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }

    pub fn populated(user: &user::Model) -> Self {
        Self {
            id: user.id,
            name: Some(user.name.clone()),
            email: Some(user.email.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckupResponse {
    pub id: Uuid,
    pub patient: Participant,
    pub dentist: Participant,
    pub status: Status,
    pub notes: Option<String>,
    pub images: Vec<ImageAttachment>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckupResponse {
    /// Builds the view without populating either participant.
    pub fn bare(checkup: checkup::Model) -> Self {
        Self::with_participants(
            Participant::id_only(checkup.patient_id),
            Participant::id_only(checkup.dentist_id),
            checkup,
        )
    }

    pub fn with_participants(
        patient: Participant,
        dentist: Participant,
        checkup: checkup::Model,
    ) -> Self {
        Self {
            id: checkup.id,
            patient,
            dentist,
            status: checkup.status,
            notes: checkup.notes,
            images: checkup.images.0,
            version: checkup.version,
            created_at: checkup.created_at,
            updated_at: checkup.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
