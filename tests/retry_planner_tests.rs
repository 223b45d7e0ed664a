//! Integration tests for the retry planner: chain walking, retry count
//! monotonicity, inactive successors, and back-to-back idempotence.

use anyhow::Result;
use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use chat_gateway::dispatch::{DispatchQueue, RetryPlanner};
use chat_gateway::models::{MessageTransaction, message_transaction};
use chat_gateway::repositories::{
    MessageTransactionRepository, ProviderRepository, UserProviderRepository,
};

mod test_utils;
use test_utils::{TransactionFixture, insert_binding, insert_provider, insert_user, setup_test_db};

fn planner(db: &std::sync::Arc<sea_orm::DatabaseConnection>, queue: DispatchQueue) -> RetryPlanner {
    RetryPlanner::new(
        MessageTransactionRepository::new(db.clone()),
        UserProviderRepository::new(db.clone()),
        ProviderRepository::new(db.clone()),
        queue,
    )
}

#[tokio::test]
async fn due_failed_row_spawns_successor_on_next_provider() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;
    let email = insert_provider(&db, "email-main", "email", None, true).await?;
    insert_binding(&db, user.id, signal.id, 1, true, None).await?;
    insert_binding(&db, user.id, email.id, 2, true, None).await?;

    let a_minute_ago = (Utc::now() - Duration::minutes(1)).fixed_offset();
    let failed = TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(a_minute_ago)
        .insert(&db)
        .await?;

    let queue = DispatchQueue::new(10);
    planner(&db, queue.clone()).retry_failed().await?;

    // The successor targets the next binding in priority order and carries
    // the incremented retry count.
    let child = queue.recv().await.expect("successor enqueued");
    assert_eq!(child.provider_id, email.id);
    assert_eq!(child.retry_count, failed.retry_count + 1);
    assert_eq!(child.status, "pending");
    assert_eq!(child.body, failed.body);

    // The consumed failed row is no longer due.
    let consumed = MessageTransaction::find_by_id(failed.id)
        .one(&*db)
        .await?
        .unwrap();
    assert!(consumed.next_retry_at.is_none());
    assert_eq!(consumed.status, "failed");
    Ok(())
}

#[tokio::test]
async fn retry_is_idempotent_across_back_to_back_invocations() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;
    let email = insert_provider(&db, "email-main", "email", None, true).await?;
    insert_binding(&db, user.id, signal.id, 1, true, None).await?;
    insert_binding(&db, user.id, email.id, 2, true, None).await?;

    let a_minute_ago = (Utc::now() - Duration::minutes(1)).fixed_offset();
    TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(a_minute_ago)
        .insert(&db)
        .await?;

    let queue = DispatchQueue::new(10);
    let planner = planner(&db, queue);

    planner.retry_failed().await?;
    let after_first = MessageTransaction::find().all(&*db).await?.len();

    planner.retry_failed().await?;
    let after_second = MessageTransaction::find().all(&*db).await?.len();

    assert_eq!(after_first, 2, "one original plus one successor");
    assert_eq!(after_second, after_first, "second invocation plans nothing");
    Ok(())
}

#[tokio::test]
async fn not_yet_due_rows_are_ignored() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;
    let email = insert_provider(&db, "email-main", "email", None, true).await?;
    insert_binding(&db, user.id, signal.id, 1, true, None).await?;
    insert_binding(&db, user.id, email.id, 2, true, None).await?;

    let in_two_minutes = (Utc::now() + Duration::minutes(2)).fixed_offset();
    let failed = TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(in_two_minutes)
        .insert(&db)
        .await?;

    let queue = DispatchQueue::new(10);
    planner(&db, queue).retry_failed().await?;

    let rows = MessageTransaction::find().all(&*db).await?;
    assert_eq!(rows.len(), 1, "no successor planned before the window");

    let untouched = MessageTransaction::find_by_id(failed.id)
        .one(&*db)
        .await?
        .unwrap();
    assert!(untouched.next_retry_at.is_some());
    Ok(())
}

#[tokio::test]
async fn inactive_next_provider_skips_the_chain() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;
    let email = insert_provider(&db, "email-main", "email", None, false).await?;
    insert_binding(&db, user.id, signal.id, 1, true, None).await?;
    insert_binding(&db, user.id, email.id, 2, true, None).await?;

    let a_minute_ago = (Utc::now() - Duration::minutes(1)).fixed_offset();
    let failed = TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(a_minute_ago)
        .insert(&db)
        .await?;

    let queue = DispatchQueue::new(10);
    planner(&db, queue).retry_failed().await?;

    let rows = MessageTransaction::find().all(&*db).await?;
    assert_eq!(rows.len(), 1, "no successor against an inactive provider");

    // The row is still consumed, so later invocations do not retry it.
    let consumed = MessageTransaction::find_by_id(failed.id)
        .one(&*db)
        .await?
        .unwrap();
    assert!(consumed.next_retry_at.is_none());
    Ok(())
}

#[tokio::test]
async fn exhausted_chain_plans_nothing() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;
    let email = insert_provider(&db, "email-main", "email", None, true).await?;
    insert_binding(&db, user.id, signal.id, 1, true, None).await?;
    insert_binding(&db, user.id, email.id, 2, true, None).await?;

    // The failed provider is last in the priority ordering.
    let a_minute_ago = (Utc::now() - Duration::minutes(1)).fixed_offset();
    TransactionFixture::pending(user.id, email.id)
        .with_status("failed")
        .with_next_retry_at(a_minute_ago)
        .insert(&db)
        .await?;

    let queue = DispatchQueue::new(10);
    planner(&db, queue).retry_failed().await?;

    let rows = MessageTransaction::find().all(&*db).await?;
    assert_eq!(rows.len(), 1);
    Ok(())
}

#[tokio::test]
async fn retry_chain_walks_two_hops() -> Result<()> {
    let db = setup_test_db().await?;
    let user = insert_user(&db, 10).await?;
    let signal = insert_provider(&db, "signal-main", "signal", None, true).await?;
    let email = insert_provider(&db, "email-main", "email", None, true).await?;
    let sms = insert_provider(&db, "sms-main", "sms", None, true).await?;
    insert_binding(&db, user.id, signal.id, 1, true, None).await?;
    insert_binding(&db, user.id, email.id, 2, true, None).await?;
    insert_binding(&db, user.id, sms.id, 3, true, None).await?;

    let a_minute_ago = (Utc::now() - Duration::minutes(1)).fixed_offset();
    TransactionFixture::pending(user.id, signal.id)
        .with_status("failed")
        .with_next_retry_at(a_minute_ago)
        .with_retry_count(0)
        .insert(&db)
        .await?;

    let queue = DispatchQueue::new(10);
    let planner = planner(&db, queue);

    // First hop: signal -> email.
    planner.retry_failed().await?;
    let first_child = MessageTransaction::find()
        .filter(message_transaction::Column::RetryCount.eq(1))
        .one(&*db)
        .await?
        .expect("first successor");
    assert_eq!(first_child.provider_id, email.id);

    // The email attempt fails too.
    MessageTransactionRepository::new(db.clone())
        .update(
            first_child.id,
            chat_gateway::repositories::TransactionUpdate {
                status: Some(chat_gateway::models::TransactionStatus::Failed),
                next_retry_at: Some(Some(a_minute_ago)),
                ..Default::default()
            },
        )
        .await?;

    // Second hop: email -> sms, retry count keeps climbing by one.
    planner.retry_failed().await?;
    let second_child = MessageTransaction::find()
        .filter(message_transaction::Column::RetryCount.eq(2))
        .one(&*db)
        .await?
        .expect("second successor");
    assert_eq!(second_child.provider_id, sms.id);
    Ok(())
}
