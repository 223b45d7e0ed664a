//! Integration tests for the transaction store: claim semantics, typed
//! partial updates, archival guarantees, and the indexed scan queries.

use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::EntityTrait;
use serde_json::json;

use chat_gateway::error::StoreError;
use chat_gateway::models::{MessageTransaction, TransactionStatus};
use chat_gateway::repositories::{
    MessageTransactionHistoryRepository, MessageTransactionRepository, NewTransaction,
    TransactionUpdate,
};

mod test_utils;
use test_utils::{TransactionFixture, insert_provider, insert_user, setup_test_db};

#[tokio::test]
async fn create_initializes_pending_state() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let repo = MessageTransactionRepository::new(db.clone());
    let created = repo
        .create(NewTransaction {
            user_id: user.id,
            provider_id: signal.id,
            recipients: json!(["+15550100"]),
            body: "hello".to_string(),
            retry_count: 0,
        })
        .await?;

    assert_eq!(created.status, "pending");
    assert!(!created.processing);
    assert!(created.next_retry_at.is_none());
    assert!(created.processed_at.is_none());
    Ok(())
}

#[tokio::test]
async fn claim_skips_reserved_and_terminal_rows() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let claimable = TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    let reserved = TransactionFixture::pending(user.id, signal.id)
        .with_processing(true)
        .insert(&db)
        .await?;
    let done = TransactionFixture::pending(user.id, signal.id)
        .with_status("success")
        .insert(&db)
        .await?;

    let repo = MessageTransactionRepository::new(db.clone());
    let claimed = repo.claim_pending_batch(1000).await?;

    assert_eq!(claimed.len(), 1);
    assert_eq!(claimed[0].id, claimable.id);
    assert!(claimed[0].processing);

    // The others are untouched.
    let reserved_row = MessageTransaction::find_by_id(reserved.id)
        .one(&*db)
        .await?
        .unwrap();
    assert!(reserved_row.processed_at.is_none());
    let done_row = MessageTransaction::find_by_id(done.id)
        .one(&*db)
        .await?
        .unwrap();
    assert_eq!(done_row.status, "success");
    Ok(())
}

#[tokio::test]
async fn claim_respects_the_batch_limit() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    for _ in 0..5 {
        TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    }

    let repo = MessageTransactionRepository::new(db.clone());
    assert_eq!(repo.claim_pending_batch(3).await?.len(), 3);
    assert_eq!(repo.claim_pending_batch(3).await?.len(), 2);
    assert!(repo.claim_pending_batch(3).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_sets_and_clears_nullable_fields() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let row = TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    let repo = MessageTransactionRepository::new(db.clone());

    let retry_at = (Utc::now() + Duration::minutes(3)).fixed_offset();
    let updated = repo
        .update(
            row.id,
            TransactionUpdate {
                error_message: Some(Some("boom".to_string())),
                next_retry_at: Some(Some(retry_at)),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(updated.error_message.as_deref(), Some("boom"));
    assert!(updated.next_retry_at.is_some());

    let cleared = repo
        .update(
            row.id,
            TransactionUpdate {
                error_message: Some(None),
                next_retry_at: Some(None),
                ..Default::default()
            },
        )
        .await?;
    assert!(cleared.error_message.is_none());
    assert!(cleared.next_retry_at.is_none());
    Ok(())
}

#[tokio::test]
async fn archive_refuses_non_terminal_status() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let row = TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    let repo = MessageTransactionRepository::new(db.clone());

    let err = repo
        .apply_outcome_and_archive(row.id, TransactionUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast::<StoreError>(),
        Ok(StoreError::InvalidTransition { .. })
    ));

    // Nothing was archived.
    let history = MessageTransactionHistoryRepository::new(db.clone())
        .find_by_original_id(row.id)
        .await?;
    assert!(history.is_empty());
    Ok(())
}

#[tokio::test]
async fn update_of_unknown_row_is_a_typed_not_found() -> Result<()> {
    let db = setup_test_db().await?;
    let repo = MessageTransactionRepository::new(db.clone());

    let err = repo
        .update(9999, TransactionUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast::<StoreError>(),
        Ok(StoreError::NotFound { id: 9999 })
    ));
    Ok(())
}

#[tokio::test]
async fn archive_is_idempotent_per_terminal_status() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let row = TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    let repo = MessageTransactionRepository::new(db.clone());

    let success = TransactionUpdate {
        status: Some(TransactionStatus::Success),
        processing: Some(false),
        ..Default::default()
    };
    repo.apply_outcome_and_archive(row.id, success.clone()).await?;
    repo.apply_outcome_and_archive(row.id, success).await?;

    let history = MessageTransactionHistoryRepository::new(db.clone())
        .find_by_original_id(row.id)
        .await?;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].original_id, row.id);
    Ok(())
}

#[tokio::test]
async fn daily_count_scopes_to_user_and_utc_day() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let other = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    TransactionFixture::pending(user.id, signal.id)
        .with_status("success")
        .insert(&db)
        .await?;
    TransactionFixture::pending(other.id, signal.id).insert(&db).await?;

    let yesterday = (Utc::now() - Duration::days(1)).fixed_offset();
    TransactionFixture::pending(user.id, signal.id)
        .with_created_at(yesterday)
        .with_updated_at(yesterday)
        .insert(&db)
        .await?;

    let repo = MessageTransactionRepository::new(db.clone());
    assert_eq!(repo.count_user_messages_for_today(user.id).await?, 2);
    assert_eq!(repo.count_user_messages_for_today(other.id).await?, 1);
    Ok(())
}

#[tokio::test]
async fn failed_due_scan_honors_the_retry_window() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let past = (Utc::now() - Duration::minutes(1)).fixed_offset();
    let future = (Utc::now() + Duration::minutes(5)).fixed_offset();

    let due = TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(past)
        .insert(&db)
        .await?;
    TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(future)
        .insert(&db)
        .await?;
    // A consumed failed row without a window never shows up.
    TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .insert(&db)
        .await?;

    let repo = MessageTransactionRepository::new(db.clone());
    let found = repo.find_failed_due_for_retry().await?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, due.id);
    Ok(())
}

#[tokio::test]
async fn history_lookups_by_original_and_user() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;

    let row = TransactionFixture::pending(user.id, signal.id).insert(&db).await?;
    let repo = MessageTransactionRepository::new(db.clone());

    repo.apply_outcome_and_archive(
        row.id,
        TransactionUpdate {
            status: Some(TransactionStatus::Failed),
            error_message: Some(Some("boom".to_string())),
            next_retry_at: Some(Some((Utc::now() + Duration::minutes(3)).fixed_offset())),
            processing: Some(false),
            ..Default::default()
        },
    )
    .await?;

    let history = MessageTransactionHistoryRepository::new(db.clone());

    let by_original = history.find_by_original_id(row.id).await?;
    assert_eq!(by_original.len(), 1);
    assert_eq!(by_original[0].error_message.as_deref(), Some("boom"));

    let latest = history.find_latest_by_original_id(row.id).await?.unwrap();
    assert_eq!(latest.status, "failed");

    let by_user = history.find_by_user(user.id).await?;
    assert_eq!(by_user.len(), 1);

    assert!(history.find_latest_by_original_id(9999).await?.is_none());
    Ok(())
}
