// ABOUTME: Checkup lifecycle service: the only code allowed to create, complete and query checkups
// ABOUTME: Enforces participant roles, dentist ownership on updates, and participant-only reads

use std::sync::Arc;

use uuid::Uuid;

use crate::entities::{
    checkup::{self, ImageList},
    user::Role,
};
use crate::error::{AppError, Result};
use crate::storage::{CompletionUpdate, Storage};
use crate::types::{CheckupResponse, Participant};

/// A dentist's completing update.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub notes: Option<String>,
    pub images: ImageList,
    pub expected_version: Option<i32>,
}

#[derive(Clone)]
pub struct CheckupService {
    storage: Arc<Storage>,
}

impl CheckupService {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Opens a new checkup in `requested` state for the calling patient.
    pub async fn request(&self, patient_id: Uuid, dentist_id: Uuid) -> Result<checkup::Model> {
        let patient = self
            .storage
            .find_user_by_id(patient_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Unknown patient".to_string()))?;
        if patient.role != Role::Patient {
            return Err(AppError::Forbidden(
                "Only patients may request checkups".to_string(),
            ));
        }

        match self.storage.find_user_by_id(dentist_id).await? {
            Some(dentist) if dentist.role == Role::Dentist => {}
            _ => return Err(AppError::NotFound("Dentist not found".to_string())),
        }

        let checkup = self.storage.insert_checkup(patient_id, dentist_id).await?;
        tracing::info!(
            checkup_id = %checkup.id,
            %patient_id,
            %dentist_id,
            "Checkup requested"
        );
        Ok(checkup)
    }

    /// Loads a checkup only if `caller_id` is its assigned dentist, whatever the caller's role.
    pub async fn assigned_checkup(&self, checkup_id: Uuid, caller_id: Uuid) -> Result<checkup::Model> {
        let checkup = self
            .storage
            .find_checkup(checkup_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Checkup not found".to_string()))?;

        if checkup.dentist_id != caller_id {
            return Err(AppError::Forbidden("Not authorized".to_string()));
        }
        Ok(checkup)
    }

    /// Applies the assigned dentist's update and marks the checkup completed.
    ///
    /// Notes replace stored notes when given; a non-empty image list replaces
    /// the stored list entirely.
    pub async fn complete(
        &self,
        checkup_id: Uuid,
        caller_id: Uuid,
        completion: Completion,
    ) -> Result<checkup::Model> {
        let current = self.assigned_checkup(checkup_id, caller_id).await?;

        if completion.notes.is_none() && completion.images.is_empty() {
            return Err(AppError::Validation(
                "An update needs notes or at least one image".to_string(),
            ));
        }

        let image_count = completion.images.len();
        let update = CompletionUpdate {
            notes: completion.notes,
            images: (!completion.images.is_empty()).then_some(completion.images),
            expected_version: completion.expected_version,
        };

        let updated = self.storage.complete_checkup(current, update).await?;
        tracing::info!(
            %checkup_id,
            dentist_id = %caller_id,
            images = image_count,
            version = updated.version,
            "Checkup completed"
        );
        Ok(updated)
    }

    /// Patient's checkups, newest first, with the dentist populated.
    pub async fn list_for_patient(&self, patient_id: Uuid) -> Result<Vec<CheckupResponse>> {
        let checkups = self.storage.list_checkups_for_patient(patient_id).await?;
        let dentist_ids: Vec<Uuid> = checkups.iter().map(|c| c.dentist_id).collect();
        let dentists = self.storage.find_users_by_ids(&dentist_ids).await?;

        Ok(checkups
            .into_iter()
            .map(|c| {
                let dentist = dentists
                    .get(&c.dentist_id)
                    .map(Participant::populated)
                    .unwrap_or_else(|| Participant::id_only(c.dentist_id));
                CheckupResponse::with_participants(Participant::id_only(c.patient_id), dentist, c)
            })
            .collect())
    }

    /// Dentist's checkups, newest first, with the patient populated.
    pub async fn list_for_dentist(&self, dentist_id: Uuid) -> Result<Vec<CheckupResponse>> {
        let checkups = self.storage.list_checkups_for_dentist(dentist_id).await?;
        let patient_ids: Vec<Uuid> = checkups.iter().map(|c| c.patient_id).collect();
        let patients = self.storage.find_users_by_ids(&patient_ids).await?;

        Ok(checkups
            .into_iter()
            .map(|c| {
                let patient = patients
                    .get(&c.patient_id)
                    .map(Participant::populated)
                    .unwrap_or_else(|| Participant::id_only(c.patient_id));
                CheckupResponse::with_participants(patient, Participant::id_only(c.dentist_id), c)
            })
            .collect())
    }

    /// Single checkup with both participants populated. Only participants may read it.
    pub async fn get(&self, checkup_id: Uuid, reader_id: Uuid) -> Result<CheckupResponse> {
        let checkup = self
            .storage
            .find_checkup(checkup_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Checkup not found".to_string()))?;

        if !checkup.is_participant(reader_id) {
            return Err(AppError::Forbidden(
                "Only the patient or dentist on this checkup may view it".to_string(),
            ));
        }

        let users = self
            .storage
            .find_users_by_ids(&[checkup.patient_id, checkup.dentist_id])
            .await?;
        let participant = |id: Uuid| {
            users
                .get(&id)
                .map(Participant::populated)
                .unwrap_or_else(|| Participant::id_only(id))
        };

        Ok(CheckupResponse::with_participants(
            participant(checkup.patient_id),
            participant(checkup.dentist_id),
            checkup,
        ))
    }
}
