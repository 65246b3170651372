// End-to-end client flow: axum provider + axum resource server, real reqwest executor.
//
// The provider hands out T1, T2, ... ; the resource only accepts "Bearer T2",
// so the first dispatch is rejected and the forced refresh has to succeed.

#[cfg(test)]
mod test {

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::{get as get_route, post};
    use axum::Json;
    use bytes::Bytes;
    use http::header::AUTHORIZATION;
    use http::{Method, Request, StatusCode};

    use crate::client::authenticating::AuthenticatingClient;
    use crate::config::settings::TransportConfig;
    use crate::tests::common::{body_json, closed_port, get, json, provider_config, spawn_axum, Router};
    use crate::transport::reqwest_executor::ReqwestExecutor;

    fn executor() -> Arc<ReqwestExecutor> {
        Arc::new(ReqwestExecutor::from_config(&TransportConfig::default()).unwrap())
    }

    fn provider_router(issued: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/oauth/token",
                post(|State(issued): State<Arc<AtomicUsize>>, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(body["client_id"], "c");
                    let n = issued.fetch_add(1, Ordering::SeqCst) + 1;
                    Json(json!({ "access_token": format!("T{n}"), "token_type": "Bearer" }))
                }),
            )
            .with_state(issued)
    }

    fn authorized(headers: &HeaderMap, accepted: &str) -> bool {
        headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) == Some(accepted)
    }

    fn resource_router(accepted: &'static str) -> Router {
        Router::new()
            .route(
                "/items",
                get_route(move |headers: HeaderMap| async move {
                    if authorized(&headers, accepted) {
                        (StatusCode::OK, "items")
                    } else {
                        (StatusCode::UNAUTHORIZED, "no")
                    }
                }),
            )
            .route(
                "/echo",
                post(move |headers: HeaderMap, body: Bytes| async move {
                    if authorized(&headers, accepted) {
                        (StatusCode::CREATED, body)
                    } else {
                        (StatusCode::NOT_FOUND, Bytes::new())
                    }
                }),
            )
    }

    #[tokio::test]
    async fn stale_token_is_refreshed_transparently() {
        let issued = Arc::new(AtomicUsize::new(0));
        let (_provider, provider_addr) = spawn_axum(provider_router(issued.clone())).await;
        let (_resource, resource_addr) = spawn_axum(resource_router("Bearer T2")).await;

        let client =
            AuthenticatingClient::from_config(executor(), &provider_config(&format!("http://{provider_addr}")))
                .unwrap();

        let response = client.execute(get(&format!("http://{resource_addr}/items"))).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().as_ref(), b"items");
        assert_eq!(issued.load(Ordering::SeqCst), 2);
        assert_eq!(client.cache().current().unwrap().as_str(), "T2");

        // token is reused for the next call
        let again = client.execute(get(&format!("http://{resource_addr}/items"))).await;
        assert_eq!(again.status(), StatusCode::OK);
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn request_body_survives_the_retry() {
        let issued = Arc::new(AtomicUsize::new(0));
        let (_provider, provider_addr) = spawn_axum(provider_router(issued.clone())).await;
        let (_resource, resource_addr) = spawn_axum(resource_router("Bearer T2")).await;

        let client =
            AuthenticatingClient::from_config(executor(), &provider_config(&format!("http://{provider_addr}")))
                .unwrap();

        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{resource_addr}/echo"))
            .body(Bytes::from_static(b"payload"))
            .unwrap();
        let response = client.execute(request).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body().as_ref(), b"payload");
        assert_eq!(issued.load(Ordering::SeqCst), 2, "404 on the first attempt forced a refresh");
    }

    #[tokio::test]
    async fn resource_that_never_accepts_ends_in_401() {
        let issued = Arc::new(AtomicUsize::new(0));
        let (_provider, provider_addr) = spawn_axum(provider_router(issued.clone())).await;
        let (_resource, resource_addr) = spawn_axum(resource_router("Bearer nope")).await;

        let client =
            AuthenticatingClient::from_config(executor(), &provider_config(&format!("http://{provider_addr}")))
                .unwrap();

        let response = client.execute(get(&format!("http://{resource_addr}/items"))).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(&response), json!({ "message": "credentials rejected" }));
        assert_eq!(issued.load(Ordering::SeqCst), 2, "initial fetch plus one refresh");
    }

    #[tokio::test]
    async fn unreachable_provider_ends_in_408() {
        let (_resource, resource_addr) = spawn_axum(resource_router("Bearer T1")).await;
        let base = format!("http://127.0.0.1:{}", closed_port());

        let client = AuthenticatingClient::from_config(executor(), &provider_config(&base)).unwrap();

        let response = client.execute(get(&format!("http://{resource_addr}/items"))).await;

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let message = body_json(&response)["message"].as_str().unwrap().to_owned();
        assert!(message.starts_with("identity provider unreachable"), "{message}");
    }
}
