//! HTTP notifier tests against a fake bot bound to a local port

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use killer_matchmaking::config::NotifierSettings;
use killer_matchmaking::error::MatchmakingError;
use killer_matchmaking::notify::{HttpMatchNotifier, MatchNotifier, SECRET_HEADER};
use killer_matchmaking::types::{
    ExpectedQueues, MatchNotification, MatchResult, PlayerData, PlayerType,
};
use killer_matchmaking::utils::generate_match_id;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Default)]
struct FakeBot {
    matches: Mutex<Vec<(Option<String>, MatchNotification)>>,
    reject: bool,
}

async fn receive_match(
    State(bot): State<Arc<FakeBot>>,
    headers: HeaderMap,
    Json(body): Json<MatchNotification>,
) -> StatusCode {
    let secret = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    bot.matches.lock().unwrap().push((secret, body));
    if bot.reject {
        StatusCode::FORBIDDEN
    } else {
        StatusCode::OK
    }
}

async fn restore() -> Json<serde_json::Value> {
    Json(json!({ "killers_queue": [1, 2], "victims_queue": [3] }))
}

async fn spawn_bot(bot: Arc<FakeBot>) -> String {
    let app = Router::new()
        .route("/match", post(receive_match))
        .route("/restore", get(restore))
        .route("/ping", get(|| async { "pong" }))
        .with_state(bot);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/", addr)
}

fn notifier(bot_url: &str) -> HttpMatchNotifier {
    HttpMatchNotifier::new(&NotifierSettings {
        bot_url: bot_url.to_string(),
        secret_key: "s3cret".to_string(),
        request_timeout_seconds: 2,
    })
    .unwrap()
}

fn sample_match() -> MatchResult {
    let data = PlayerData::new(600.0, PlayerType::Bachelor, Some(2), None).unwrap();
    MatchResult {
        match_id: generate_match_id(),
        killer_id: 11,
        victim_id: 22,
        killer_data: data.clone(),
        victim_data: data,
        matched_at: Utc::now(),
        match_quality: 0.98,
    }
}

#[tokio::test]
async fn test_match_is_posted_with_secret() {
    let bot = Arc::new(FakeBot::default());
    let url = spawn_bot(bot.clone()).await;
    let notifier = notifier(&url);

    let result = sample_match();
    notifier.notify_match(&result).await.unwrap();

    let received = bot.matches.lock().unwrap().clone();
    assert_eq!(received.len(), 1);
    let (secret, body) = &received[0];
    assert_eq!(secret.as_deref(), Some("s3cret"));
    assert_eq!(body, &MatchNotification::from(&result));
}

#[tokio::test]
async fn test_rejected_match_is_a_notification_failure() {
    let bot = Arc::new(FakeBot {
        reject: true,
        ..FakeBot::default()
    });
    let url = spawn_bot(bot).await;

    let err = notifier(&url).notify_match(&sample_match()).await.unwrap_err();
    assert!(matches!(
        err,
        MatchmakingError::NotificationFailed {
            killer_id: 11,
            victim_id: 22,
            ..
        }
    ));
}

#[tokio::test]
async fn test_restore_and_ping() {
    let url = spawn_bot(Arc::new(FakeBot::default())).await;
    let notifier = notifier(&url);

    let expected = notifier.fetch_expected_queues().await.unwrap();
    assert_eq!(
        expected,
        ExpectedQueues {
            killers_queue: vec![1, 2],
            victims_queue: vec![3],
        }
    );
    notifier.ping().await.unwrap();
}

#[tokio::test]
async fn test_unreachable_bot() {
    // Bind then drop to get a port nothing listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let notifier = notifier(&format!("http://{}", addr));
    assert!(matches!(
        notifier.notify_match(&sample_match()).await,
        Err(MatchmakingError::NotificationFailed { .. })
    ));
    assert!(matches!(
        notifier.fetch_expected_queues().await,
        Err(MatchmakingError::ReconciliationFailed { .. })
    ));
    assert!(notifier.ping().await.is_err());
}
