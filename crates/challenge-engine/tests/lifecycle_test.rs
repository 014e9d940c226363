// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Integration tests for challenge authoring.

mod common;

use challenge_engine::Error;
use challenge_engine::collaborators::mock::MockObjectStorage;
use challenge_engine::lifecycle::ChallengeUpdate;
use challenge_engine::model::{ChallengeStatus, DayPlanEntry};
use common::*;

fn entry(day: i32, activity: &str) -> DayPlanEntry {
    DayPlanEntry {
        day_number: day,
        activity_id: activity.to_string(),
    }
}

#[tokio::test]
async fn test_create_defaults_to_draft() {
    let ctx = TestContext::new().await;

    let challenge = ctx
        .lifecycle
        .create(new_challenge(7, date(2025, 3, 1), date(2025, 3, 31)))
        .await
        .unwrap();

    assert_eq!(challenge.status(), ChallengeStatus::Draft);
    assert!(challenge.day_plan.is_empty());

    let stored = ctx.lifecycle.get_by_id(&challenge.id).await.unwrap();
    assert_eq!(stored.status(), ChallengeStatus::Draft);
    assert_eq!(stored.title, "Mindful March");
    assert_eq!(stored.duration, 7);
}

#[tokio::test]
async fn test_create_published_requires_full_plan() {
    let ctx = TestContext::new().await;

    let mut request = new_challenge(3, date(2025, 3, 1), date(2025, 3, 31));
    request.day_plan = Some(vec![entry(1, "game-1"), entry(3, "game-3")]);
    request.status = Some(ChallengeStatus::Published);

    let err = ctx.lifecycle.create(request).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    assert!(ctx.lifecycle.list_all().await.unwrap().is_empty());

    let challenge = ctx.published(3, date(2025, 3, 1), date(2025, 3, 31)).await;
    assert_eq!(challenge.status(), ChallengeStatus::Published);
    assert_eq!(ctx.lifecycle.day_plan(&challenge.id).await.unwrap(), plan(3));
}

#[tokio::test]
async fn test_create_rejects_scheduler_owned_status() {
    let ctx = TestContext::new().await;

    for status in [ChallengeStatus::Active, ChallengeStatus::Completed] {
        let mut request = new_challenge(2, date(2025, 3, 1), date(2025, 3, 31));
        request.day_plan = Some(plan(2));
        request.status = Some(status);

        let err = ctx.lifecycle.create(request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)), "{}: got {:?}", status, err);
    }
}

#[tokio::test]
async fn test_create_validates_schedule_and_plan() {
    let ctx = TestContext::new().await;

    let backwards = new_challenge(3, date(2025, 3, 10), date(2025, 3, 1));
    assert!(matches!(
        ctx.lifecycle.create(backwards).await,
        Err(Error::Validation(_))
    ));

    let zero = new_challenge(0, date(2025, 3, 1), date(2025, 3, 31));
    assert!(matches!(
        ctx.lifecycle.create(zero).await,
        Err(Error::Validation(_))
    ));

    let mut out_of_range = new_challenge(3, date(2025, 3, 1), date(2025, 3, 31));
    out_of_range.day_plan = Some(vec![entry(4, "game-4")]);
    assert!(matches!(
        ctx.lifecycle.create(out_of_range).await,
        Err(Error::Validation(_))
    ));

    let mut duplicate = new_challenge(3, date(2025, 3, 1), date(2025, 3, 31));
    duplicate.day_plan = Some(vec![entry(1, "game-1"), entry(1, "game-2")]);
    assert!(matches!(
        ctx.lifecycle.create(duplicate).await,
        Err(Error::Validation(_))
    ));

    assert!(ctx.lifecycle.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_replaces_day_plan() {
    let ctx = TestContext::new().await;

    let mut request = new_challenge(3, date(2025, 3, 1), date(2025, 3, 31));
    request.day_plan = Some(vec![entry(1, "game-1"), entry(2, "game-2")]);
    let challenge = ctx.lifecycle.create(request).await.unwrap();

    let updated = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                day_plan: Some(vec![entry(3, "game-9")]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.day_plan.entries(), vec![entry(3, "game-9")]);
    assert_eq!(
        ctx.lifecycle.day_plan(&challenge.id).await.unwrap(),
        vec![entry(3, "game-9")]
    );
}

#[tokio::test]
async fn test_update_without_day_plan_keeps_it() {
    let ctx = TestContext::new().await;

    let mut request = new_challenge(2, date(2025, 3, 1), date(2025, 3, 31));
    request.day_plan = Some(plan(2));
    let challenge = ctx.lifecycle.create(request).await.unwrap();

    let updated = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                title: Some("Brain April".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Brain April");
    assert_eq!(updated.version(), challenge.version() + 1);

    let stored = ctx.lifecycle.get_by_id(&challenge.id).await.unwrap();
    assert_eq!(stored.title, "Brain April");
    assert_eq!(stored.day_plan.entries(), plan(2));
}

#[tokio::test]
async fn test_publish_requires_every_day() {
    let ctx = TestContext::new().await;

    let mut request = new_challenge(3, date(2025, 3, 1), date(2025, 3, 31));
    request.day_plan = Some(vec![entry(1, "game-1"), entry(2, "game-2")]);
    let challenge = ctx.lifecycle.create(request).await.unwrap();

    let err = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                status: Some(ChallengeStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);

    let stored = ctx.lifecycle.get_by_id(&challenge.id).await.unwrap();
    assert_eq!(stored.status(), ChallengeStatus::Draft);

    let published = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                day_plan: Some(plan(3)),
                status: Some(ChallengeStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(published.status(), ChallengeStatus::Published);
}

#[tokio::test]
async fn test_published_challenge_is_frozen() {
    let ctx = TestContext::new().await;
    let challenge = ctx.published(2, date(2025, 3, 1), date(2025, 3, 31)).await;

    let err = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "got {:?}", err);

    let err = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                status: Some(ChallengeStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "got {:?}", err);

    let err = ctx.lifecycle.delete(&challenge.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_update_unknown_challenge() {
    let ctx = TestContext::new().await;

    let err = ctx
        .lifecycle
        .update("missing", ChallengeUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ChallengeNotFound(ref id) if id == "missing"));
}

#[tokio::test]
async fn test_image_replacement_discards_old_image() {
    let storage = MockObjectStorage::new();
    let ctx = TestContext::with_storage(storage.clone()).await;

    let first = ctx
        .lifecycle
        .upload_cover("first.png", vec![1, 2, 3])
        .await
        .unwrap();
    let mut request = new_challenge(2, date(2025, 3, 1), date(2025, 3, 31));
    request.image_url = Some(first.clone());
    let challenge = ctx.lifecycle.create(request).await.unwrap();

    let second = ctx
        .lifecycle
        .upload_cover("second.png", vec![4, 5, 6])
        .await
        .unwrap();
    let updated = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                image_url: Some(second.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.image_url.as_deref(), Some(second.as_str()));
    assert_eq!(storage.deleted_urls().await, vec![first]);
    assert_eq!(storage.stored_urls().await, vec![second]);
}

#[tokio::test]
async fn test_placeholder_image_is_never_deleted() {
    let storage = MockObjectStorage::new();
    let ctx = TestContext::with_storage(storage.clone()).await;

    let mut request = new_challenge(2, date(2025, 3, 1), date(2025, 3, 31));
    request.image_url = Some("https://via.placeholder.com/600x400".to_string());
    let challenge = ctx.lifecycle.create(request).await.unwrap();

    ctx.lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                image_url: Some("https://storage.example.com/challenges/covers/new.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(storage.deleted_urls().await.is_empty());
}

#[tokio::test]
async fn test_failed_image_delete_does_not_fail_update() {
    let storage = MockObjectStorage::failing_deletes();
    let ctx = TestContext::with_storage(storage.clone()).await;

    let mut request = new_challenge(2, date(2025, 3, 1), date(2025, 3, 31));
    request.image_url = Some("https://storage.example.com/challenges/covers/old.png".to_string());
    let challenge = ctx.lifecycle.create(request).await.unwrap();

    let updated = ctx
        .lifecycle
        .update(
            &challenge.id,
            ChallengeUpdate {
                image_url: Some("https://storage.example.com/challenges/covers/new.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(
        updated.image_url.as_deref(),
        Some("https://storage.example.com/challenges/covers/new.png")
    );
    assert_eq!(
        storage.deleted_urls().await,
        vec!["https://storage.example.com/challenges/covers/old.png".to_string()]
    );
}

#[tokio::test]
async fn test_delete_draft() {
    let ctx = TestContext::new().await;
    let challenge = ctx
        .lifecycle
        .create(new_challenge(2, date(2025, 3, 1), date(2025, 3, 31)))
        .await
        .unwrap();

    ctx.lifecycle.delete(&challenge.id).await.unwrap();

    let err = ctx.lifecycle.get_by_id(&challenge.id).await.unwrap_err();
    assert!(matches!(err, Error::ChallengeNotFound(_)));

    let err = ctx.lifecycle.delete(&challenge.id).await.unwrap_err();
    assert!(matches!(err, Error::ChallengeNotFound(_)));
}

#[tokio::test]
async fn test_delete_blocked_by_participations() {
    let ctx = TestContext::new().await;
    let challenge = ctx
        .lifecycle
        .create(new_challenge(2, date(2025, 3, 1), date(2025, 3, 31)))
        .await
        .unwrap();
    ctx.engine.join(ALICE, &challenge.id).await.unwrap();

    let err = ctx.lifecycle.delete(&challenge.id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidState(_)), "got {:?}", err);
    assert!(ctx.lifecycle.get_by_id(&challenge.id).await.is_ok());
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let ctx = TestContext::new().await;

    let draft = ctx
        .lifecycle
        .create(new_challenge(2, date(2025, 3, 1), date(2025, 3, 31)))
        .await
        .unwrap();
    let published = ctx.published(2, date(2025, 4, 1), date(2025, 4, 30)).await;

    assert_eq!(ctx.lifecycle.list(None).await.unwrap().len(), 2);
    assert_eq!(ctx.lifecycle.list(Some("  ")).await.unwrap().len(), 2);

    let drafts = ctx.lifecycle.list(Some("DRAFT")).await.unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].id, draft.id);

    let live = ctx
        .lifecycle
        .list_by_status(ChallengeStatus::Published)
        .await
        .unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, published.id);

    assert!(
        ctx.lifecycle
            .list_by_status(ChallengeStatus::Active)
            .await
            .unwrap()
            .is_empty()
    );

    let err = ctx.lifecycle.list(Some("ARCHIVED")).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_upload_cover() {
    let storage = MockObjectStorage::new();
    let ctx = TestContext::with_storage(storage.clone()).await;

    let url = ctx
        .lifecycle
        .upload_cover("cover.jpg", vec![0xFF, 0xD8])
        .await
        .unwrap();
    assert!(url.starts_with("https://storage.example.com/challenges/covers/"));
    assert!(url.ends_with("cover.jpg"));
    assert_eq!(storage.stored_urls().await, vec![url]);

    assert!(matches!(
        ctx.lifecycle.upload_cover("cover.jpg", Vec::new()).await,
        Err(Error::Validation(_))
    ));
}
