// ABOUTME: Checkup entity linking one patient and one dentist with status, notes and images
// ABOUTME: Image attachments are embedded as a JSON array instead of a separate table

use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[sea_orm(string_value = "requested")]
    Requested,
    /// Kept for compatibility with stored data. No operation enters this state.
    #[sea_orm(string_value = "in-progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub path: String,
    pub description: String,
}

/// Ordered image list, replaced wholesale on every accepted update.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ImageList(pub Vec<ImageAttachment>);

impl ImageList {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "checkups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub patient_id: Uuid,
    pub dentist_id: Uuid,
    pub status: Status,
    pub notes: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub images: ImageList,
    pub version: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.patient_id == user_id || self.dentist_id == user_id
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::PatientId",
        to = "super::user::Column::Id"
    )]
    Patient,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DentistId",
        to = "super::user::Column::Id"
    )]
    Dentist,
}

impl ActiveModelBehavior for ActiveModel {}
