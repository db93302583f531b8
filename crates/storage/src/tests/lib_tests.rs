use super::*;

async fn seeded() -> Storage {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.reset_data_source().await.expect("seed");
    storage
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = std::env::temp_dir().join(format!("people_storage_test_{suffix}"));
    let db_path = temp_root.join("nested").join("people.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    storage.close().await;

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );

    std::fs::remove_dir_all(temp_root).expect("cleanup");
}

#[tokio::test]
async fn reset_data_source_restores_sample_people() {
    let storage = seeded().await;
    storage
        .apply_batch(&[BatchOp::Delete {
            key: "russellwhyte".into(),
        }])
        .await
        .expect("delete");

    storage.reset_data_source().await.expect("reset");
    assert_eq!(
        storage.count_people().await.expect("count"),
        sample_people().len() as i64
    );
    assert!(storage
        .find_person("russellwhyte")
        .await
        .expect("find")
        .is_some());
}

#[tokio::test]
async fn filters_on_last_name_substring() {
    let storage = seeded().await;
    let people = storage
        .list_people(&PeopleQuery {
            last_name_contains: Some("h".into()),
            order: SortOrder::None,
        })
        .await
        .expect("list");

    let names: Vec<_> = people.iter().map(|p| p.last_name.as_str()).collect();
    assert_eq!(names, vec!["Whyte", "Ketchum", "Ashmore"]);
}

#[tokio::test]
async fn sorts_on_last_name_in_both_directions() {
    let storage = seeded().await;
    let ascending = storage
        .list_people(&PeopleQuery {
            last_name_contains: None,
            order: SortOrder::Ascending,
        })
        .await
        .expect("ascending");
    let descending = storage
        .list_people(&PeopleQuery {
            last_name_contains: None,
            order: SortOrder::Descending,
        })
        .await
        .expect("descending");

    assert_eq!(ascending.first().map(|p| p.last_name.as_str()), Some("Alfred"));
    assert_eq!(descending.first().map(|p| p.last_name.as_str()), Some("Whyte"));
}

#[tokio::test]
async fn batch_applies_insert_update_and_delete_together() {
    let storage = seeded().await;
    let mut renamed = storage
        .find_person("scottketchum")
        .await
        .expect("find")
        .expect("exists");
    renamed.first_name = "Scotty".into();

    storage
        .apply_batch(&[
            BatchOp::Insert(Person::new("jdoe", "John", "Doe", "30")),
            BatchOp::Update {
                key: "scottketchum".into(),
                person: renamed.clone(),
            },
            BatchOp::Delete {
                key: "ronaldmundy".into(),
            },
        ])
        .await
        .expect("batch");

    assert!(storage.find_person("jdoe").await.expect("find").is_some());
    assert_eq!(
        storage.find_person("scottketchum").await.expect("find"),
        Some(renamed)
    );
    assert!(storage
        .find_person("ronaldmundy")
        .await
        .expect("find")
        .is_none());
}

#[tokio::test]
async fn rejected_batch_rolls_back_earlier_operations() {
    let storage = seeded().await;
    let err = storage
        .apply_batch(&[
            BatchOp::Insert(Person::new("jdoe", "John", "Doe", "30")),
            BatchOp::Insert(Person::new("", "No", "Name", "18")),
        ])
        .await
        .expect_err("empty user name is rejected");

    assert!(!err.is_technical());
    assert!(err.to_string().contains("must not be empty"));
    assert!(storage.find_person("jdoe").await.expect("find").is_none());
}

#[tokio::test]
async fn rejects_duplicate_keys_and_non_numeric_age() {
    let storage = seeded().await;
    let duplicate = storage
        .apply_batch(&[BatchOp::Insert(Person::new(
            "russellwhyte",
            "Other",
            "Person",
            "20",
        ))])
        .await
        .expect_err("duplicate");
    assert_eq!(duplicate.user_name(), Some("russellwhyte"));

    let bad_age = storage
        .apply_batch(&[BatchOp::Insert(Person::new("jdoe", "John", "Doe", "old"))])
        .await
        .expect_err("age");
    assert!(matches!(bad_age, BatchError::Rejected { .. }));
}

#[tokio::test]
async fn deleting_missing_person_is_not_found() {
    let storage = seeded().await;
    let err = storage
        .apply_batch(&[BatchOp::Delete {
            key: "nobody".into(),
        }])
        .await
        .expect_err("missing");
    assert!(matches!(err, BatchError::NotFound { .. }));
}

#[tokio::test]
async fn freed_user_names_can_be_reused_within_one_batch() {
    let storage = seeded().await;

    storage
        .apply_batch(&[
            BatchOp::Insert(Person::new("clydeguess", "Clyde", "Newcomer", "19")),
            BatchOp::Insert(Person::new("russellwhyte", "Second", "Russell", "30")),
            BatchOp::Update {
                key: "russellwhyte".into(),
                person: Person::new("russw", "Russell", "Whyte", "42"),
            },
            BatchOp::Delete {
                key: "clydeguess".into(),
            },
        ])
        .await
        .expect("delete and rename run before inserts");

    let clyde = storage
        .find_person("clydeguess")
        .await
        .expect("find")
        .expect("new clydeguess");
    assert_eq!(clyde.last_name, "Newcomer");
    let renamed = storage.find_person("russw").await.expect("find");
    assert_eq!(renamed.map(|p| p.last_name), Some("Whyte".to_string()));
    let reused = storage
        .find_person("russellwhyte")
        .await
        .expect("find")
        .expect("new russellwhyte");
    assert_eq!(reused.first_name, "Second");
}

#[tokio::test]
async fn closed_pool_reports_technical_failure() {
    let storage = seeded().await;
    storage.close().await;

    let err = storage
        .apply_batch(&[BatchOp::Delete {
            key: "russellwhyte".into(),
        }])
        .await
        .expect_err("closed pool");
    assert!(err.is_technical());
}

#[test]
fn memory_urls_have_no_parent_directory() {
    assert_eq!(sqlite_path("sqlite::memory:"), None);
    assert_eq!(
        sqlite_path("sqlite://./data/people.db?mode=rwc"),
        Some(PathBuf::from("./data/people.db"))
    );
}
