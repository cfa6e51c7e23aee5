// ABOUTME: SeaORM storage layer for users and checkups on SQLite
// ABOUTME: Handles connection setup, migrations, and all record reads and writes

use std::collections::HashMap;

use anyhow::Context;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::entities::{
    checkup::{self, ImageList, Status},
    user::{self, Role},
};
use crate::error::{AppError, Result};
use crate::migration::Migrator;

pub struct Storage {
    pub db: DatabaseConnection,
}

/// Replacement values applied by a completing update.
#[derive(Debug, Clone)]
pub struct CompletionUpdate {
    pub notes: Option<String>,
    pub images: Option<ImageList>,
    pub expected_version: Option<i32>,
}

impl Storage {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = Database::connect(database_url)
            .await
            .with_context(|| format!("failed to connect to {}", database_url))?;

        Migrator::up(&db, None)
            .await
            .context("failed to run database migrations")?;

        Ok(Self { db })
    }

    // Users

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<user::Model> {
        if self.find_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let user = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(password_hash.to_string()),
            role: Set(role),
            created_at: Set(chrono::Utc::now()),
        };

        // A concurrent registration can still win the race; the unique index decides.
        user.insert(&self.db).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AppError::Conflict("Email is already registered".to_string())
            }
            _ => AppError::Database(err),
        })
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<user::Model>> {
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(user)
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<user::Model>> {
        Ok(user::Entity::find_by_id(user_id).one(&self.db).await?)
    }

    pub async fn find_users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, user::Model>> {
        let users = user::Entity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }

    pub async fn list_users_by_role(&self, role: Role) -> Result<Vec<user::Model>> {
        let users = user::Entity::find()
            .filter(user::Column::Role.eq(role))
            .order_by_asc(user::Column::Name)
            .all(&self.db)
            .await?;
        Ok(users)
    }

    // Checkups

    pub async fn insert_checkup(&self, patient_id: Uuid, dentist_id: Uuid) -> Result<checkup::Model> {
        let now = chrono::Utc::now();
        let checkup = checkup::ActiveModel {
            id: Set(Uuid::new_v4()),
            patient_id: Set(patient_id),
            dentist_id: Set(dentist_id),
            status: Set(Status::Requested),
            notes: Set(None),
            images: Set(ImageList::default()),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(checkup.insert(&self.db).await?)
    }

    pub async fn find_checkup(&self, checkup_id: Uuid) -> Result<Option<checkup::Model>> {
        Ok(checkup::Entity::find_by_id(checkup_id).one(&self.db).await?)
    }

    pub async fn list_checkups_for_patient(&self, patient_id: Uuid) -> Result<Vec<checkup::Model>> {
        let checkups = checkup::Entity::find()
            .filter(checkup::Column::PatientId.eq(patient_id))
            .order_by_desc(checkup::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(checkups)
    }

    pub async fn list_checkups_for_dentist(&self, dentist_id: Uuid) -> Result<Vec<checkup::Model>> {
        let checkups = checkup::Entity::find()
            .filter(checkup::Column::DentistId.eq(dentist_id))
            .order_by_desc(checkup::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(checkups)
    }

    /// Writes a completing update over `current`, the record as last read.
    ///
    /// With an expected version the write only applies while the stored
    /// version still equals it; otherwise the last writer wins.
    pub async fn complete_checkup(
        &self,
        current: checkup::Model,
        update: CompletionUpdate,
    ) -> Result<checkup::Model> {
        if let Some(expected) = update.expected_version {
            if expected != current.version {
                return Err(AppError::Conflict(format!(
                    "Checkup version is {}, not {}",
                    current.version, expected
                )));
            }
        }

        let read_version = current.version;
        let mut active: checkup::ActiveModel = current.into();
        if let Some(notes) = update.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(images) = update.images {
            active.images = Set(images);
        }
        active.status = Set(Status::Completed);
        active.version = Set(read_version + 1);
        active.updated_at = Set(chrono::Utc::now());

        let mut query = checkup::Entity::update(active);
        if update.expected_version.is_some() {
            query = query.filter(checkup::Column::Version.eq(read_version));
        }

        match query.exec(&self.db).await {
            Ok(updated) => Ok(updated),
            Err(DbErr::RecordNotUpdated) if update.expected_version.is_some() => Err(
                AppError::Conflict("Checkup was modified concurrently".to_string()),
            ),
            Err(DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound("Checkup not found".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }
}
