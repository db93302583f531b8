use super::*;
use crate::test_support::{row_named, seeded_model};

use std::sync::atomic::AtomicBool;

#[tokio::test]
async fn initial_load_lists_the_sample_people() {
    let (_storage, model) = seeded_model().await;
    assert_eq!(model.contexts().len(), storage::sample_people().len());
    assert!(!model.has_pending_changes());
}

#[tokio::test]
async fn created_row_is_pending_and_listed_first() {
    let (_storage, model) = seeded_model().await;
    let ctx = model.create(Person::default());

    assert!(model.has_pending_changes());
    assert_eq!(model.contexts()[0].id(), ctx.id());
    assert_eq!(ctx.get_field(PersonField::Age), "18");
}

#[tokio::test]
async fn editing_back_to_the_stored_value_clears_pending_state() {
    let (_storage, model) = seeded_model().await;
    let ctx = row_named(&model, "russellwhyte");

    ctx.set_field(PersonField::FirstName, "Rusty").expect("edit");
    assert!(model.has_pending_changes());
    ctx.set_field(PersonField::FirstName, "Russell").expect("edit");
    assert!(!model.has_pending_changes());
}

#[tokio::test]
async fn submitted_batch_persists_every_pending_change() {
    let (storage, model) = seeded_model().await;
    let created = model.create(Person::default());
    created.set_field(PersonField::UserName, "jdoe").expect("edit");
    created.set_field(PersonField::LastName, "Doe").expect("edit");
    let edited = row_named(&model, "scottketchum");
    edited.set_field(PersonField::Age, "37").expect("edit");

    model.submit_batch(DEFAULT_GROUP_ID).await.expect("submit");

    assert!(!model.has_pending_changes());
    let stored = storage.find_person("jdoe").await.expect("find").expect("stored");
    assert_eq!(stored.last_name, "Doe");
    let stored = storage
        .find_person("scottketchum")
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(stored.age, "37");
}

#[tokio::test]
async fn submit_for_unknown_group_is_rejected() {
    let (_storage, model) = seeded_model().await;
    model.create(Person::default());
    let err = model.submit_batch("otherGroup").await.expect_err("group");
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(model.has_pending_changes());
}

#[tokio::test]
async fn rejected_batch_keeps_edits_pending_without_technical_message() {
    let (_storage, model) = seeded_model().await;
    model.create(Person::default());

    let err = model
        .submit_batch(DEFAULT_GROUP_ID)
        .await
        .expect_err("unnamed person is rejected");

    assert!(!err.is_technical());
    assert!(model.has_pending_changes());
    assert!(model.messages().technical_messages().is_empty());
}

#[tokio::test]
async fn storage_failure_posts_a_technical_message() {
    let (storage, model) = seeded_model().await;
    row_named(&model, "russellwhyte")
        .set_field(PersonField::Age, "43")
        .expect("edit");
    storage.close().await;

    let err = model
        .submit_batch(DEFAULT_GROUP_ID)
        .await
        .expect_err("closed storage");

    assert!(err.is_technical());
    let messages = model.messages().technical_messages();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].text.starts_with("batch submission failed"));
}

#[tokio::test]
async fn delete_resolves_when_the_batch_commits() {
    let (storage, model) = seeded_model().await;
    let ctx = row_named(&model, "ronaldmundy");

    let (deleted, submitted) = tokio::join!(ctx.delete(), async {
        tokio::task::yield_now().await;
        assert!(ctx.is_deleted());
        assert!(model.context(ctx.id()).is_none());
        model.submit_batch(DEFAULT_GROUP_ID).await
    });

    submitted.expect("submit");
    deleted.expect("delete");
    assert!(storage
        .find_person("ronaldmundy")
        .await
        .expect("find")
        .is_none());
    assert!(!model.has_pending_changes());
}

#[tokio::test]
async fn delete_marks_the_row_before_the_outcome_is_awaited() {
    let (_storage, model) = seeded_model().await;
    let ctx = row_named(&model, "ronaldmundy");

    let outcome = ctx.delete();

    assert!(ctx.is_deleted());
    assert!(model.has_pending_changes());
    model.submit_batch(DEFAULT_GROUP_ID).await.expect("submit");
    outcome.await.expect("delete committed");
}

#[tokio::test]
async fn deleted_user_name_can_be_taken_by_a_new_row_in_the_same_batch() {
    let (storage, model) = seeded_model().await;
    let outcome = row_named(&model, "clydeguess").delete();
    let created = model.create(Person::default());
    created
        .set_field(PersonField::UserName, "clydeguess")
        .expect("edit");
    created
        .set_field(PersonField::LastName, "Newcomer")
        .expect("edit");

    model.submit_batch(DEFAULT_GROUP_ID).await.expect("submit");

    outcome.await.expect("delete committed");
    let stored = storage
        .find_person("clydeguess")
        .await
        .expect("find")
        .expect("stored");
    assert_eq!(stored.last_name, "Newcomer");
}

#[tokio::test]
async fn reload_takes_store_values_but_keeps_unsaved_rows() {
    let (storage, model) = seeded_model().await;
    let edited = row_named(&model, "keithpinckney");
    edited.set_field(PersonField::Age, "39").expect("edit");
    let created = model.create(Person::default());
    storage
        .apply_batch(&[BatchOp::Update {
            key: "russellwhyte".into(),
            person: Person::new("russellwhyte", "RUSS", "Whyte", "42"),
        }])
        .await
        .expect("remote update");

    model.reload().await.expect("reload");

    assert_eq!(
        row_named(&model, "russellwhyte").get_field(PersonField::FirstName),
        "RUSS"
    );
    assert_eq!(edited.get_field(PersonField::Age), "39");
    assert_eq!(model.contexts()[0].id(), created.id());
    assert!(model.has_pending_changes());
}

#[tokio::test]
async fn reset_cancels_pending_delete_and_restores_row() {
    let (_storage, model) = seeded_model().await;
    let ctx = row_named(&model, "ronaldmundy");

    let (deleted, ()) = tokio::join!(ctx.delete(), async {
        tokio::task::yield_now().await;
        model.reset_changes();
    });

    let err = deleted.expect_err("canceled");
    assert!(err.canceled);
    assert!(!ctx.is_deleted());
    assert!(model.context(ctx.id()).is_some());
    assert!(!model.has_pending_changes());
}

#[tokio::test]
async fn deleting_transient_row_discards_it_immediately() {
    let (_storage, model) = seeded_model().await;
    let ctx = model.create(Person::default());

    ctx.delete().await.expect("transient delete");

    assert!(model.context(ctx.id()).is_none());
    assert!(!model.has_pending_changes());
}

#[tokio::test]
async fn reset_drops_created_rows_and_restores_edits() {
    let (_storage, model) = seeded_model().await;
    let created = model.create(Person::default());
    let edited = row_named(&model, "javieralfred");
    edited.set_field(PersonField::LastName, "Alfredo").expect("edit");

    model.reset_changes();

    assert!(created.is_deleted());
    assert_eq!(edited.get_field(PersonField::LastName), "Alfred");
    assert!(!model.has_pending_changes());
}

#[tokio::test]
async fn refresh_filter_and_sort_refuse_while_changes_are_pending() {
    let (_storage, model) = seeded_model().await;
    model.create(Person::default());

    for err in [
        model.refresh().await.expect_err("refresh"),
        model
            .filter(Some(ListFilter::LastNameContains("W".into())))
            .await
            .expect_err("filter"),
        model.sort(SortOrder::Ascending).await.expect_err("sort"),
    ] {
        assert_eq!(err.code, ErrorCode::PendingChanges);
    }
}

#[tokio::test]
async fn filter_and_sort_reload_the_listing() {
    let (_storage, model) = seeded_model().await;
    model
        .filter(Some(ListFilter::LastNameContains("h".into())))
        .await
        .expect("filter");
    model.sort(SortOrder::Descending).await.expect("sort");

    let names: Vec<String> = model
        .contexts()
        .iter()
        .map(|ctx| ctx.get_field(PersonField::LastName))
        .collect();
    assert_eq!(names, vec!["Whyte", "Ketchum", "Ashmore"]);
}

#[tokio::test]
async fn reload_keeps_context_identity_for_listed_rows() {
    let (_storage, model) = seeded_model().await;
    let before = row_named(&model, "clydeguess");
    model.refresh().await.expect("refresh");
    assert_eq!(row_named(&model, "clydeguess").id(), before.id());
}

#[tokio::test]
async fn kept_alive_row_survives_falling_out_of_the_filter() {
    let (_storage, model) = seeded_model().await;
    let ctx = row_named(&model, "clydeguess");
    ctx.set_keep_alive(true, None);

    model
        .filter(Some(ListFilter::LastNameContains("Whyte".into())))
        .await
        .expect("filter");

    assert!(model.context(ctx.id()).is_some());
    let listed: Vec<String> = model
        .contexts()
        .iter()
        .map(|ctx| ctx.get_field(PersonField::UserName))
        .collect();
    assert_eq!(listed, vec!["russellwhyte"]);

    model.filter(None).await.expect("clear filter");
    assert_eq!(row_named(&model, "clydeguess").id(), ctx.id());
}

#[tokio::test]
async fn kept_alive_row_removed_in_storage_fires_vanish_callback() {
    let (storage, model) = seeded_model().await;
    let ctx = row_named(&model, "clydeguess");
    let vanished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&vanished);
    ctx.set_keep_alive(
        true,
        Some(Box::new(move || flag.store(true, Ordering::SeqCst))),
    );

    storage
        .apply_batch(&[BatchOp::Delete {
            key: "clydeguess".into(),
        }])
        .await
        .expect("remote delete");
    model.refresh().await.expect("refresh");

    assert!(vanished.load(Ordering::SeqCst));
    assert!(!ctx.is_keep_alive());
    assert!(model.context(ctx.id()).is_none());
}

#[tokio::test]
async fn reset_data_source_is_the_only_known_operation() {
    let (storage, model) = seeded_model().await;
    storage
        .apply_batch(&[BatchOp::Delete {
            key: "clydeguess".into(),
        }])
        .await
        .expect("remote delete");

    model.invoke(RESET_DATA_SOURCE).await.expect("invoke");
    assert!(storage.find_person("clydeguess").await.expect("find").is_some());

    let err = model.invoke("Explode").await.expect_err("unknown");
    assert_eq!(err.code, ErrorCode::NotFound);
}
