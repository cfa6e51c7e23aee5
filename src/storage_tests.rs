// ABOUTME: Tests for the storage layer against a throwaway SQLite database
// ABOUTME: Covers user uniqueness, role queries, checkup listing order and completion writes

#[cfg(test)]
mod tests {
    use super::super::entities::checkup::{ImageAttachment, ImageList, Status};
    use super::super::entities::user::Role;
    use super::super::error::AppError;
    use super::super::storage::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    async fn create_test_storage() -> (Storage, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let storage = Storage::connect(&db_url).await.unwrap();
        (storage, temp_dir)
    }

    fn image(path: &str, description: &str) -> ImageAttachment {
        ImageAttachment {
            path: path.to_string(),
            description: description.to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_operations() {
        let (storage, _temp_dir) = create_test_storage().await;

        let user = storage
            .create_user("Pat Patient", "pat@example.com", "hash", Role::Patient)
            .await
            .unwrap();

        let by_email = storage
            .find_user_by_email("pat@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.role, Role::Patient);

        let by_id = storage.find_user_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "Pat Patient");
    }

    #[tokio::test]
    async fn test_user_not_found() {
        let (storage, _temp_dir) = create_test_storage().await;

        assert!(storage.find_user_by_email("nobody@example.com").await.unwrap().is_none());
        assert!(storage.find_user_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (storage, _temp_dir) = create_test_storage().await;

        storage
            .create_user("First", "same@example.com", "hash", Role::Patient)
            .await
            .unwrap();
        let result = storage
            .create_user("Second", "same@example.com", "hash", Role::Dentist)
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_users_by_role() {
        let (storage, _temp_dir) = create_test_storage().await;

        storage
            .create_user("Dr. Zed", "zed@example.com", "hash", Role::Dentist)
            .await
            .unwrap();
        storage
            .create_user("Dr. Amy", "amy@example.com", "hash", Role::Dentist)
            .await
            .unwrap();
        storage
            .create_user("Pat", "pat@example.com", "hash", Role::Patient)
            .await
            .unwrap();

        let dentists = storage.list_users_by_role(Role::Dentist).await.unwrap();
        let names: Vec<&str> = dentists.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. Amy", "Dr. Zed"]);
    }

    #[tokio::test]
    async fn test_new_checkup_defaults() {
        let (storage, _temp_dir) = create_test_storage().await;
        let patient = storage
            .create_user("Pat", "pat@example.com", "hash", Role::Patient)
            .await
            .unwrap();
        let dentist = storage
            .create_user("Dr. Dee", "dee@example.com", "hash", Role::Dentist)
            .await
            .unwrap();

        let checkup = storage.insert_checkup(patient.id, dentist.id).await.unwrap();
        let stored = storage.find_checkup(checkup.id).await.unwrap().unwrap();

        assert_eq!(stored.status, Status::Requested);
        assert_eq!(stored.notes, None);
        assert!(stored.images.is_empty());
        assert_eq!(stored.version, 0);
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[tokio::test]
    async fn test_checkups_listed_newest_first() {
        let (storage, _temp_dir) = create_test_storage().await;
        let patient = storage
            .create_user("Pat", "pat@example.com", "hash", Role::Patient)
            .await
            .unwrap();
        let dentist = storage
            .create_user("Dr. Dee", "dee@example.com", "hash", Role::Dentist)
            .await
            .unwrap();

        let first = storage.insert_checkup(patient.id, dentist.id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = storage.insert_checkup(patient.id, dentist.id).await.unwrap();

        let for_patient = storage.list_checkups_for_patient(patient.id).await.unwrap();
        let ids: Vec<Uuid> = for_patient.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let for_dentist = storage.list_checkups_for_dentist(dentist.id).await.unwrap();
        let ids: Vec<Uuid> = for_dentist.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_complete_checkup_replaces_images() {
        let (storage, _temp_dir) = create_test_storage().await;
        let patient = storage
            .create_user("Pat", "pat@example.com", "hash", Role::Patient)
            .await
            .unwrap();
        let dentist = storage
            .create_user("Dr. Dee", "dee@example.com", "hash", Role::Dentist)
            .await
            .unwrap();
        let checkup = storage.insert_checkup(patient.id, dentist.id).await.unwrap();

        let first = storage
            .complete_checkup(
                checkup,
                CompletionUpdate {
                    notes: Some("first".into()),
                    images: Some(ImageList(vec![
                        image("uploads/a.png", "a"),
                        image("uploads/b.png", "b"),
                    ])),
                    expected_version: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(first.status, Status::Completed);
        assert_eq!(first.version, 1);
        assert_eq!(first.images.len(), 2);

        let second = storage
            .complete_checkup(
                first,
                CompletionUpdate {
                    notes: None,
                    images: Some(ImageList(vec![image("uploads/c.png", "c")])),
                    expected_version: None,
                },
            )
            .await
            .unwrap();

        let stored = storage.find_checkup(second.id).await.unwrap().unwrap();
        assert_eq!(stored.images, ImageList(vec![image("uploads/c.png", "c")]));
        // Notes were not supplied, so the earlier notes remain
        assert_eq!(stored.notes.as_deref(), Some("first"));
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn test_complete_checkup_version_mismatch() {
        let (storage, _temp_dir) = create_test_storage().await;
        let patient = storage
            .create_user("Pat", "pat@example.com", "hash", Role::Patient)
            .await
            .unwrap();
        let dentist = storage
            .create_user("Dr. Dee", "dee@example.com", "hash", Role::Dentist)
            .await
            .unwrap();
        let checkup = storage.insert_checkup(patient.id, dentist.id).await.unwrap();
        let checkup_id = checkup.id;
        let stale = checkup.clone();

        storage
            .complete_checkup(
                checkup,
                CompletionUpdate {
                    notes: Some("winner".into()),
                    images: None,
                    expected_version: Some(0),
                },
            )
            .await
            .unwrap();

        // Same read snapshot, written after the stored version moved on
        let result = storage
            .complete_checkup(
                stale,
                CompletionUpdate {
                    notes: Some("loser".into()),
                    images: None,
                    expected_version: Some(0),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));

        let stored = storage.find_checkup(checkup_id).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("winner"));
        assert_eq!(stored.version, 1);
    }
}
