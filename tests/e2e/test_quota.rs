use crate::e2e::helpers;

use helpers::{at, user_path, TestContext, FREE_LIMIT};
use hyper::StatusCode;
use innervoice_backend::domain::subscription::{UsageState, UsageSummary};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_context::test_context;
use uuid::Uuid;

fn resets_at(body: &serde_json::Value) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    body.get("resets_at")
        .and_then(|v| v.as_str())
        .map(|s| chrono::DateTime::parse_from_rfc3339(s).unwrap())
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_allow_first_question_for_new_user(ctx: &TestContext) {
    let user_id = Uuid::new_v4();

    let response = ctx.client.get(&user_path(&user_id, "quota")).await.unwrap();

    response.assert_status(StatusCode::OK).assert_allowed(true);
    assert!(response.field("message").is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_deny_questions_past_the_free_limit(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let path = user_path(&user_id, "questions");

    for _ in 0..FREE_LIMIT {
        ctx.client
            .post_empty(&path)
            .await
            .unwrap()
            .assert_status(StatusCode::OK);
    }

    let response = ctx.client.post_empty(&path).await.unwrap();
    response
        .assert_status(StatusCode::TOO_MANY_REQUESTS)
        .assert_allowed(false)
        .assert_error_message("daily limit");
    assert_eq!(
        resets_at(response.body.as_ref().unwrap()),
        Some(at("2024-01-02T00:00:00Z"))
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reset_the_counter_on_a_new_day(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let path = user_path(&user_id, "questions");

    for _ in 0..FREE_LIMIT {
        ctx.client.post_empty(&path).await.unwrap();
    }
    ctx.client
        .post_empty(&path)
        .await
        .unwrap()
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    ctx.clock.set(at("2024-01-02T00:01:00Z"));

    ctx.client
        .post_empty(&path)
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let usage: UsageSummary = ctx
        .client
        .get(&user_path(&user_id, "usage"))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(usage.usage.questions_today, 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_support_check_then_record_flow(ctx: &TestContext) {
    let user_id = Uuid::new_v4();

    for expected in 1..=FREE_LIMIT {
        let check = ctx.client.get(&user_path(&user_id, "quota")).await.unwrap();
        check.assert_allowed(true);

        let recorded: UsageState = ctx
            .client
            .post_empty(&user_path(&user_id, "questions/record"))
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(recorded.questions_today, expected);
    }

    let check = ctx.client.get(&user_path(&user_id, "quota")).await.unwrap();
    check.assert_status(StatusCode::OK).assert_allowed(false);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_lift_the_limit_after_upgrade(ctx: &TestContext) {
    let user_id = Uuid::new_v4();

    ctx.client
        .put(&user_path(&user_id, "subscription"), &json!({ "tier": "premium" }))
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);

    for _ in 0..(FREE_LIMIT * 5) {
        ctx.client
            .post_empty(&user_path(&user_id, "questions"))
            .await
            .unwrap()
            .assert_status(StatusCode::OK);
    }

    let usage: UsageSummary = ctx
        .client
        .get(&user_path(&user_id, "usage"))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(usage.limits.daily_questions, -1);
    assert_eq!(usage.usage.questions_today, FREE_LIMIT * 5);
    assert_eq!(usage.usage.questions_remaining, None);
    assert!(usage.features.voice_output);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unknown_tier(ctx: &TestContext) {
    let user_id = Uuid::new_v4();

    let response = ctx
        .client
        .put(&user_path(&user_id, "subscription"), &json!({ "tier": "gold" }))
        .await
        .unwrap();

    assert!(response.status.is_client_error());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_invalid_user_id(ctx: &TestContext) {
    let response = ctx.client.get("/api/users/not-a-uuid/quota").await.unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Invalid user id");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_usage_and_reset_countdown(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    ctx.client
        .post_empty(&user_path(&user_id, "questions"))
        .await
        .unwrap();
    ctx.client
        .post_empty(&user_path(&user_id, "conversations"))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    let response = ctx.client.get(&user_path(&user_id, "usage")).await.unwrap();
    response.assert_status(StatusCode::OK);

    let usage: UsageSummary = response.json().unwrap();
    assert_eq!(usage.period, "daily");
    assert_eq!(usage.usage.questions_today, 1);
    assert_eq!(usage.usage.questions_remaining, Some(FREE_LIMIT - 1));
    assert_eq!(usage.usage.conversation_count, 1);
    assert_eq!(usage.limits.daily_questions, FREE_LIMIT as i64);
    assert_eq!(usage.resets_at, at("2024-01-02T00:00:00Z"));
    assert_eq!(usage.resets_in, "14h 0m");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_never_over_allow_concurrent_questions(ctx: &TestContext) {
    let user_id = Uuid::new_v4();
    let path = user_path(&user_id, "questions");

    let requests = (0..10).map(|_| {
        let client = ctx.client.clone();
        let path = path.clone();
        async move { client.post_empty(&path).await }
    });

    let allowed = futures::future::join_all(requests)
        .await
        .into_iter()
        .filter(|r| r.as_ref().unwrap().status == StatusCode::OK)
        .count();

    assert_eq!(allowed, FREE_LIMIT as usize);
}
