// ABOUTME: Initial migration creating the users and checkups tables
// ABOUTME: Checkups reference two users and keep their image list in a JSON column

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Name).string().not_null())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Users::Role).string_len(16).not_null())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Checkups::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Checkups::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Checkups::PatientId).uuid().not_null())
                    .col(ColumnDef::new(Checkups::DentistId).uuid().not_null())
                    .col(
                        ColumnDef::new(Checkups::Status)
                            .string_len(16)
                            .not_null()
                            .default("requested"),
                    )
                    .col(ColumnDef::new(Checkups::Notes).text())
                    .col(ColumnDef::new(Checkups::Images).json().not_null())
                    .col(ColumnDef::new(Checkups::Version).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Checkups::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Checkups::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkups_patient_id")
                            .from(Checkups::Table, Checkups::PatientId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_checkups_dentist_id")
                            .from(Checkups::Table, Checkups::DentistId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_checkups_patient_created")
                    .table(Checkups::Table)
                    .col(Checkups::PatientId)
                    .col(Checkups::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_checkups_dentist_created")
                    .table(Checkups::Table)
                    .col(Checkups::DentistId)
                    .col(Checkups::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Checkups::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Role,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Checkups {
    Table,
    Id,
    PatientId,
    DentistId,
    Status,
    Notes,
    Images,
    Version,
    CreatedAt,
    UpdatedAt,
}
