use crate::composer::Composer;
use crate::handlers::render::render;
use crate::models::card::NavAction;
use crate::models::pipeline::Pipeline;
use crate::utils::RequestError;
use actix_web::{web, HttpResponse};
use log::debug;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct CardRequest {
    #[serde(default)]
    pipeline: Pipeline,
    #[serde(default)]
    index: usize,
}

#[derive(Deserialize)]
pub struct NavigateRequest {
    #[serde(default)]
    pipeline: Pipeline,
    index: usize,
    action: NavAction,
}

pub async fn get_card(
    composer: web::Data<Composer>,
    body: web::Json<CardRequest>,
) -> Result<HttpResponse, RequestError> {
    let outcome = composer.compose(&body.pipeline, body.index).await;
    Ok(HttpResponse::Ok().json(render(outcome, composer.palette())))
}

/// Maps a button press back onto an index and re-renders. The composer
/// re-clamps whatever index results.
pub async fn navigate(
    composer: web::Data<Composer>,
    body: web::Json<NavigateRequest>,
) -> Result<HttpResponse, RequestError> {
    debug!("{:?} from index {} in {}", body.action, body.index, body.pipeline.subject_name());

    let index = match body.action {
        NavAction::Next => body.index.saturating_add(1),
        NavAction::Previous => body.index.saturating_sub(1),
        NavAction::Players => {
            return match composer.sample(&body.pipeline, body.index).await {
                Some(players) => Ok(HttpResponse::Ok().json(json!({ "players": players }))),
                None => Err(RequestError::PlayersUnavailable),
            };
        }
    };

    let outcome = composer.compose(&body.pipeline, index).await;
    Ok(HttpResponse::Ok().json(render(outcome, composer.palette())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColorPalette;
    use crate::models::server::tests::document;
    use crate::probe::tests::{closed_port, spawn_java_server};
    use crate::probe::JavaProber;
    use crate::storage::memory::ServerStorage;
    use crate::utils::json_error_handler;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    async fn composer_with(docs: Vec<Value>) -> web::Data<Composer> {
        let storage = ServerStorage::new();
        for doc in docs {
            storage.add_server(doc).unwrap();
        }
        web::Data::new(Composer::new(
            Arc::new(storage),
            Arc::new(JavaProber::new(Duration::from_millis(500), 47)),
            ColorPalette::default(),
        ))
    }

    macro_rules! app {
        ($composer:expr) => {
            test::init_service(
                App::new()
                    .app_data($composer)
                    .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                    .route("/", web::get().to(crate::handlers::index::index))
                    .route("/card", web::post().to(get_card))
                    .route("/card/navigate", web::post().to(navigate)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_index() {
        let app = app!(composer_with(Vec::new()).await);
        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
    }

    #[actix_web::test]
    async fn test_card_clamps_and_reports_page() {
        let port_a = closed_port().await;
        let port_b = spawn_java_server(false).await;
        let app = app!(composer_with(vec![document("alpha", port_a), document("bravo", port_b)]).await);

        let req = test::TestRequest::post()
            .uri("/card")
            .set_json(json!({ "pipeline": ["everything"], "index": 7 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["kind"], "card");
        assert_eq!(body["index"], 0);
        assert_eq!(body["total"], 2);
        assert_eq!(body["embed"]["title"], "🔴 alpha");
        assert_eq!(body["embed"]["footer"]["text"], "Showing 1 of 2 servers in: everything");

        let req = test::TestRequest::post()
            .uri("/card/navigate")
            .set_json(json!({ "pipeline": ["everything"], "index": 0, "action": "next" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["index"], 1);
        assert_eq!(body["embed"]["title"], "🟢 bravo");
        assert_eq!(body["components"][0]["components"][1]["disabled"], false);

        // Next from the last card wraps to the first.
        let req = test::TestRequest::post()
            .uri("/card/navigate")
            .set_json(json!({ "pipeline": ["everything"], "index": 1, "action": "next" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["index"], 0);
    }

    #[actix_web::test]
    async fn test_previous_saturates_at_zero() {
        let app = app!(composer_with(vec![document("alpha", closed_port().await)]).await);
        let req = test::TestRequest::post()
            .uri("/card/navigate")
            .set_json(json!({ "index": 0, "action": "previous" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["index"], 0);
        assert_eq!(body["components"][0]["components"][0]["disabled"], true);
    }

    #[actix_web::test]
    async fn test_empty_result() {
        let app = app!(composer_with(vec![document("alpha", closed_port().await)]).await);
        let req = test::TestRequest::post()
            .uri("/card")
            .set_json(json!({ "pipeline": [{ "$match": { "cracked": true } }] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["kind"], "empty");
        assert!(body.get("index").is_none());
    }

    #[actix_web::test]
    async fn test_unsupported_pipeline_is_degraded() {
        let app = app!(composer_with(vec![document("alpha", closed_port().await)]).await);
        let req = test::TestRequest::post()
            .uri("/card")
            .set_json(json!({ "pipeline": [{ "$group": {} }] }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["kind"], "degraded");
        assert_eq!(body["embed"]["description"], "No server found");
    }

    #[actix_web::test]
    async fn test_players_action() {
        let mut with_sample = document("alpha", closed_port().await);
        with_sample["sample"] = json!([{ "name": "Notch" }]);
        let without_sample = document("bravo", closed_port().await);
        let app = app!(composer_with(vec![with_sample, without_sample]).await);

        let req = test::TestRequest::post()
            .uri("/card/navigate")
            .set_json(json!({ "index": 0, "action": "players" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["players"][0]["name"], "Notch");

        let req = test::TestRequest::post()
            .uri("/card/navigate")
            .set_json(json!({ "index": 1, "action": "players" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_invalid_body_is_bad_request() {
        let app = app!(composer_with(Vec::new()).await);
        let req = test::TestRequest::post()
            .uri("/card/navigate")
            .set_json(json!({ "index": -1, "action": "sideways" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_REQUEST);
    }
}
