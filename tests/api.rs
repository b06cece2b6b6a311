use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        Method, Request, StatusCode,
    },
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use pollify::config::Config;
use pollify::memory::MemoryStore;
use pollify::models::Identity;
use pollify::routes::create_routes;
use pollify::state::AppState;
use pollify::store::Store;

const ALICE: &str = "alice-token";
const BOB: &str = "bob-token";
const EXPIRED: &str = "expired-token";

struct TestApp {
    router: Router,
    store: MemoryStore,
}

async fn app() -> TestApp {
    let store = MemoryStore::new();

    for (token, email) in [(ALICE, "alice@example.com"), (BOB, "bob@example.com")] {
        let user = Identity {
            id: Uuid::new_v4(),
            email: email.to_string(),
        };
        store.insert_user(user.clone()).await;
        store
            .insert_session(token, user.id, Utc::now() + Duration::hours(1))
            .await;
    }

    let carol = Identity {
        id: Uuid::new_v4(),
        email: "carol@example.com".to_string(),
    };
    store.insert_user(carol.clone()).await;
    store
        .insert_session(EXPIRED, carol.id, Utc::now() - Duration::hours(1))
        .await;

    let config = Config {
        public_url: "https://pollify.example".to_string(),
        ..Config::default()
    };
    let state = AppState::new(Store::Memory(store.clone()), config);

    TestApp {
        router: create_routes(state),
        store,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_poll(&self, token: &str, question: &str, options: &[&str]) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/polls",
                Some(token),
                Some(json!({ "question": question, "options": options })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn vote(&self, token: Option<&str>, poll_id: &str, option: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            &format!("/api/polls/{poll_id}/vote"),
            token,
            Some(json!({ "selectedOption": option })),
        )
        .await
    }
}

fn counts(results: &Value) -> Vec<(String, u64)> {
    results["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| {
            (
                entry["option"].as_str().unwrap().to_string(),
                entry["votes"].as_u64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn health_check_responds() {
    let app = app().await;
    let (status, body) = app.send(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn creates_and_fetches_a_poll() {
    let app = app().await;
    let (status, created) = app
        .send(
            Method::POST,
            "/api/polls",
            Some(ALICE),
            Some(json!({ "question": " Best colour? ", "options": ["Red", " Blue", "Green"] })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["question"], "Best colour?");
    assert_eq!(created["options"], json!(["Red", "Blue", "Green"]));
    assert!(created["createdAt"].is_string());

    let id = created["id"].as_str().unwrap();
    let (status, details) = app
        .send(Method::GET, &format!("/api/polls/{id}"), None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["poll"]["id"], id);
    assert_eq!(details["results"]["total"], 0);
    assert_eq!(details["myVote"], Value::Null);
}

#[tokio::test]
async fn creating_a_poll_requires_a_live_session() {
    let app = app().await;
    let body = json!({ "question": "Q?", "options": ["A", "B"] });

    let (status, response) = app
        .send(Method::POST, "/api/polls", None, Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response, json!({ "success": false, "message": "Unauthorized" }));

    let (status, _) = app
        .send(Method::POST, "/api/polls", Some(EXPIRED), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::POST, "/api/polls", Some("made-up"), Some(body))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_poll_reports_field_errors() {
    let app = app().await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/polls",
            Some(ALICE),
            Some(json!({ "question": "", "options": ["Same", "same"] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["question"], json!(["Question is required"]));
    assert_eq!(
        body["errors"]["options"],
        json!(["Option 2 duplicates an earlier option"])
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = app().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/polls")
        .header(AUTHORIZATION, format!("Bearer {ALICE}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"question\": "))
        .unwrap();

    let (status, body) = app.call(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"]["body"], json!(["Malformed body"]));
    assert!(!body.to_string().contains("line 1"));
}

#[tokio::test]
async fn tallies_votes_from_several_users() {
    let app = app().await;
    let poll_id = app
        .create_poll(ALICE, "Colour?", &["Red", "Blue", "Green"])
        .await;

    let (status, body) = app.vote(Some(ALICE), &poll_id, "Red").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "success": true, "message": "Vote recorded" }));

    let (status, _) = app.vote(Some(BOB), &poll_id, "Blue").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/polls/{poll_id}/vote"),
            Some(BOB),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hasVoted"], true);
    assert_eq!(body["myVote"], "Blue");
    assert_eq!(body["results"]["total"], 2);
    assert_eq!(
        counts(&body["results"]),
        vec![
            ("Red".to_string(), 1),
            ("Blue".to_string(), 1),
            ("Green".to_string(), 0)
        ]
    );
}

#[tokio::test]
async fn second_vote_conflicts() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;

    app.vote(Some(BOB), &poll_id, "Red").await;
    let (status, body) = app.vote(Some(BOB), &poll_id, "Blue").await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({ "success": false, "message": "Already voted" }));

    let id = Uuid::parse_str(&poll_id).unwrap();
    let votes = app.store.votes_for_poll(id).await;
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].selected_option, "Red");
}

#[tokio::test]
async fn vote_for_unknown_option_creates_nothing() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;

    let (status, body) = app.vote(Some(BOB), &poll_id, "Purple").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid option");

    let id = Uuid::parse_str(&poll_id).unwrap();
    assert!(app.store.votes_for_poll(id).await.is_empty());
}

#[tokio::test]
async fn anonymous_vote_is_unauthorized() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;

    let (status, body) = app.vote(None, &poll_id, "Red").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "message": "Unauthorized" }));

    let id = Uuid::parse_str(&poll_id).unwrap();
    assert!(app.store.votes_for_poll(id).await.is_empty());
}

#[tokio::test]
async fn session_cookie_identifies_the_voter() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/polls/{poll_id}/vote"))
        .header(COOKIE, format!("theme=dark; session={BOB}"))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "selectedOption": "Blue" }).to_string()))
        .unwrap();

    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, details) = app
        .send(Method::GET, &format!("/api/polls/{poll_id}"), Some(BOB), None)
        .await;
    assert_eq!(details["myVote"], "Blue");
}

#[tokio::test]
async fn unknown_or_malformed_poll_id_is_not_found() {
    let app = app().await;
    let missing = Uuid::new_v4();

    for uri in [
        format!("/api/polls/{missing}"),
        "/api/polls/not-a-uuid".to_string(),
        format!("/api/polls/{missing}/share"),
    ] {
        let (status, body) = app.send(Method::GET, &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["message"], "Poll not found");
    }

    let (status, _) = app.vote(Some(BOB), &missing.to_string(), "Red").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removing_a_vote() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;
    let uri = format!("/api/polls/{poll_id}/vote");

    let (status, body) = app.send(Method::DELETE, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Vote not found");

    app.vote(Some(BOB), &poll_id, "Red").await;
    let (status, body) = app.send(Method::DELETE, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Vote removed" }));

    let (status, _) = app.vote(Some(BOB), &poll_id, "Blue").await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn only_the_creator_edits_a_poll() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;
    let uri = format!("/api/polls/{poll_id}");
    let edit = json!({ "question": "Favourite colour?", "options": ["Red", "Blue", "Teal"] });

    let (status, _) = app
        .send(Method::PUT, &uri, Some(BOB), Some(edit.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::PUT, &uri, None, Some(edit.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, updated) = app.send(Method::PUT, &uri, Some(ALICE), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["question"], "Favourite colour?");
    assert_eq!(updated["options"], json!(["Red", "Blue", "Teal"]));

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(ALICE),
            Some(json!({ "question": "Q", "options": ["Solo"] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["options"].is_array());
}

#[tokio::test]
async fn deleting_a_poll_removes_its_votes() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;
    app.vote(Some(ALICE), &poll_id, "Red").await;
    app.vote(Some(BOB), &poll_id, "Blue").await;
    let uri = format!("/api/polls/{poll_id}");

    let (status, _) = app.send(Method::DELETE, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "message": "Poll deleted" }));

    let id = Uuid::parse_str(&poll_id).unwrap();
    assert!(app.store.votes_for_poll(id).await.is_empty());

    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lists_all_or_own_polls() {
    let app = app().await;
    let alices = app.create_poll(ALICE, "Alice asks?", &["A", "B"]).await;
    let bobs = app.create_poll(BOB, "Bob asks?", &["C", "D"]).await;

    let (status, all) = app.send(Method::GET, "/api/polls", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, mine) = app
        .send(Method::GET, "/api/polls?mine=true", Some(BOB), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = mine
        .as_array()
        .unwrap()
        .iter()
        .map(|poll| poll["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![bobs.as_str()]);
    assert!(!ids.contains(&alices.as_str()));

    let (status, _) = app
        .send(Method::GET, "/api/polls?mine=true", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(Method::GET, "/api/polls?mine=maybe", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"]["query"], json!(["Malformed query"]));
}

#[tokio::test]
async fn share_links_point_at_the_public_url() {
    let app = app().await;
    let poll_id = app.create_poll(ALICE, "Colour?", &["Red", "Blue"]).await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/polls/{poll_id}/share"), None, None)
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], format!("https://pollify.example/polls/{poll_id}"));
    assert_eq!(
        body["resultsUrl"],
        format!("https://pollify.example/api/polls/{poll_id}/vote")
    );
}
