pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::analysis::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/keywords/extract",
            post(handlers::handle_extract_keywords),
        )
        .route(
            "/api/v1/analyses",
            post(handlers::handle_create_analysis).get(handlers::handle_list_analyses),
        )
        .route(
            "/api/v1/analyses/latest",
            get(handlers::handle_latest_analysis),
        )
        .route("/api/v1/analyses/:id", get(handlers::handle_get_analysis))
        .route(
            "/api/v1/analyses/:id/content",
            post(handlers::handle_regenerate_content),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::profile::{UserProfile, WorkExperienceEntry};
    use crate::persistence::memory::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn make_app() -> (Router, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (build_router(AppState::for_tests(store.clone())), store)
    }

    fn make_profile(user_id: Uuid) -> UserProfile {
        UserProfile {
            user_id,
            skills: vec!["Python".to_string(), "SQL".to_string()],
            work_experience: vec![WorkExperienceEntry {
                title: "Data Engineer".to_string(),
                company: "Initech".to_string(),
                achievements: vec!["Built Python pipelines processing 2TB daily".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
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

    #[tokio::test]
    async fn test_health() {
        let (app, _) = make_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resume-match-api");
    }

    #[tokio::test]
    async fn test_extract_keywords() {
        let (app, _) = make_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/keywords/extract",
            Some(json!({"description": "Requires Python and AWS experience, 5+ years"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let terms: Vec<&str> = body["keywords"]
            .as_array()
            .unwrap()
            .iter()
            .map(|k| k["term"].as_str().unwrap())
            .collect();
        assert_eq!(terms, vec!["python", "aws"]);
        assert!(body["vocabularyVersion"].is_string());
    }

    #[tokio::test]
    async fn test_extract_rejects_blank_description() {
        let (app, _) = make_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/keywords/extract",
            Some(json!({"description": "   "})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_analysis_unknown_profile_is_404() {
        let (app, _) = make_app();
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/analyses",
            Some(json!({"userId": Uuid::new_v4(), "posting": {"description": "Requires Rust"}})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_analysis_empty_profile_is_400() {
        let (app, store) = make_app();
        let user_id = Uuid::new_v4();
        store.insert_profile(UserProfile {
            user_id,
            ..Default::default()
        });
        let (status, _) = send(
            &app,
            "POST",
            "/api/v1/analyses",
            Some(json!({"userId": user_id, "posting": {"description": "Requires Rust"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.analysis_count(), 0);
    }

    #[tokio::test]
    async fn test_create_analysis_empty_description_is_400() {
        let (app, store) = make_app();
        let user_id = Uuid::new_v4();
        store.insert_profile(make_profile(user_id));
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/analyses",
            Some(json!({"userId": user_id, "posting": {"description": ""}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_analysis_lifecycle() {
        let (app, store) = make_app();
        let user_id = Uuid::new_v4();
        store.insert_profile(make_profile(user_id));

        let (status, created) = send(
            &app,
            "POST",
            "/api/v1/analyses",
            Some(json!({
                "userId": user_id,
                "posting": {
                    "description": "Python and SQL required. Airflow preferred.",
                    "title": "Data Engineer",
                    "company": "Globex"
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["persisted"], true);
        assert_eq!(created["generation"], 1);
        let matched = created["matchResult"]["matchedSkills"].as_array().unwrap();
        assert!(matched.contains(&json!("python")));
        assert!(matched.contains(&json!("sql")));
        let id = created["analysis"]["id"].as_str().unwrap().to_string();

        let (status, latest) = send(
            &app,
            "GET",
            &format!("/api/v1/analyses/latest?user_id={user_id}"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["id"], id.as_str());
        assert_eq!(latest["jobCompany"], "Globex");

        let (status, one) = send(&app, "GET", &format!("/api/v1/analyses/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(one["matchResult"], created["matchResult"]);

        let (status, content) = send(
            &app,
            "POST",
            &format!("/api/v1/analyses/{id}/content"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content["analysisId"], id.as_str());
        assert!(content["content"]["markup"]
            .as_str()
            .unwrap()
            .contains("## Professional Experience"));
        assert_eq!(store.analysis_count(), 1);
    }

    #[tokio::test]
    async fn test_history_is_newest_first_and_limited() {
        let (app, store) = make_app();
        let user_id = Uuid::new_v4();
        store.insert_profile(make_profile(user_id));

        for description in ["Requires Python", "Requires SQL", "Requires Kafka"] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/v1/analyses",
                Some(json!({"userId": user_id, "posting": {"description": description}})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, history) = send(
            &app,
            "GET",
            &format!("/api/v1/analyses?user_id={user_id}&limit=2"),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let history = history.as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["jobDescription"], "Requires Kafka");
        assert_eq!(history[1]["jobDescription"], "Requires SQL");
    }

    #[tokio::test]
    async fn test_missing_analysis_is_404() {
        let (app, _) = make_app();
        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/v1/analyses/{}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            "GET",
            &format!("/api/v1/analyses/latest?user_id={}", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
