//! A whole service assembled from configuration, served over a real socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use plinth::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Deserialize, Serialize)]
struct Item {
    name: String,
}

async fn send(
    addr: SocketAddr,
    method: Method,
    path: &str,
    body: impl Into<Bytes>,
) -> (StatusCode, http::HeaderMap, String) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);

    let request = http::Request::builder()
        .method(method)
        .uri(path)
        .header("host", "localhost")
        .body(Full::new(body.into()))
        .unwrap();

    let response = sender.send_request(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Counts every error the last-resort handler renders.
#[derive(Clone, Default)]
struct CountingResponder {
    rendered: Arc<Mutex<Vec<StatusCode>>>,
}

impl ErrorResponder for CountingResponder {
    fn respond(&self, head: &RequestHead, error: BoxError) -> Response {
        let response = DefaultErrorResponder.respond(head, error);
        self.rendered.lock().unwrap().push(response.status());
        response
    }
}

fn router(responder: CountingResponder) -> Result<Router, RouteError> {
    let mut router = Router::builder().error_handler(responder).build();

    router.post("/items", |req: Request| async move {
        let item: Item = read_json(&req)?;
        Ok::<_, BoxError>(JsonResponse::created(item).into_response()?)
    })?;

    router.get("/items/{name}", |req: Request| async move {
        let name = req.param("name").unwrap_or_default().to_string();
        if name == "secret" {
            return Err(HttpError::forbidden("not yours"));
        }
        Ok(Response::text(StatusCode::OK, name))
    })?;

    Ok(router)
}

#[tokio::test]
async fn test_configured_service_end_to_end() {
    let config = ConfigLoader::new()
        .with_string(
            r#"
            [server]
            http_addr = "127.0.0.1:0"
            shutdown_timeout_secs = 2
            signals = []
            max_body_bytes = 128

            [logging]
            enabled = false
            "#,
            "toml",
        )
        .unwrap()
        .load()
        .unwrap();

    let responder = CountingResponder::default();
    let events: Arc<Mutex<Vec<Event>>> = Arc::default();
    let sink = Arc::clone(&events);

    let server = Server::builder()
        .config(config.server.to_server_config())
        .middleware(RequestLogger::new())
        .middleware(around("server-header", |req: Request, next: BoxHandler| async move {
            let mut response = next.call(req).await;
            response
                .headers_mut()
                .insert("server", http::HeaderValue::from_static("plinth"));
            response
        }))
        .event_listener(move |event: &Event| sink.lock().unwrap().push(event.clone()))
        .handler(router(responder.clone()).unwrap().into_service())
        .build()
        .unwrap();

    let listener = TcpListener::bind(server.config().socket_addr().unwrap())
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

    let (status, headers, body) = send(addr, Method::POST, "/items", r#"{"name":"lamp"}"#).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(headers["server"], "plinth");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap()["name"], "lamp");

    let (status, _, body) = send(addr, Method::GET, "/items/lamp", Bytes::new()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "lamp");

    let (status, _, body) = send(addr, Method::GET, "/items/secret", Bytes::new()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("not yours"));

    let (status, headers, _) = send(addr, Method::DELETE, "/items/lamp", Bytes::new()).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(headers["allow"], "GET, HEAD");

    let (status, _, _) = send(addr, Method::POST, "/items", r#"{"name":"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Rejected before routing, so the responder never sees it. The transport
    // middleware still does.
    let big = format!(r#"{{"name":"{}"}}"#, "x".repeat(256));
    let (status, headers, body) = send(addr, Method::POST, "/items", big).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(headers["server"], "plinth");
    assert!(body.contains("PAYLOAD_TOO_LARGE"));

    assert_eq!(
        *responder.rendered.lock().unwrap(),
        vec![
            StatusCode::FORBIDDEN,
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::BAD_REQUEST,
        ]
    );

    shutdown.trigger(ShutdownReason::Requested);
    let outcome = serving.await.unwrap().unwrap();
    assert_eq!(outcome, ShutdownOutcome::Graceful);

    let events = events.lock().unwrap();
    assert!(matches!(events.first(), Some(Event::Listening { .. })));
    assert!(matches!(events.last(), Some(Event::ShutdownCompleted)));
}
