//! End-to-end tests over a real socket.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper_util::rt::TokioIo;
use plinth_core::{BoxFuture, BoxHandler, HttpError, Request, Response, ResponseExt};
use plinth_extract::{read_json, write_json};
use plinth_middleware::{around, RequestLogger, ResponseLog};
use plinth_router::Router;
use plinth_server::{
    Event, Server, ServerBuilder, ShutdownOutcome, ShutdownReason, ShutdownSignal,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

type Events = Arc<Mutex<Vec<Event>>>;

fn recording(builder: ServerBuilder) -> (ServerBuilder, Events) {
    let events: Events = Arc::default();
    let sink = Arc::clone(&events);
    let builder = builder.event_listener(move |event: &Event| {
        sink.lock().unwrap().push(event.clone());
    });
    (builder, events)
}

async fn send(
    addr: SocketAddr,
    request: http::Request<Full<Bytes>>,
) -> Result<http::Response<Incoming>, hyper::Error> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(conn);
    sender.send_request(request).await
}

fn get(path: &str) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .uri(path)
        .header("host", "localhost")
        .body(Full::new(Bytes::new()))
        .unwrap()
}

fn post(path: &str, body: &'static str) -> http::Request<Full<Bytes>> {
    http::Request::builder()
        .method("POST")
        .uri(path)
        .header("host", "localhost")
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

async fn body_string(response: http::Response<Incoming>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A handler that announces it started, then sleeps.
fn slow_handler(
    started: &Arc<Notify>,
    delay: Duration,
) -> impl Fn(Request) -> BoxFuture<'static, Response> + Send + Sync + 'static {
    let started = Arc::clone(started);
    move |_req: Request| -> BoxFuture<'static, Response> {
        let started = Arc::clone(&started);
        Box::pin(async move {
            started.notify_one();
            tokio::time::sleep(delay).await;
            Response::text(StatusCode::OK, "done")
        })
    }
}

#[tokio::test]
async fn in_flight_request_finishes_before_shutdown() {
    let started = Arc::new(Notify::new());
    let (builder, events) = recording(
        Server::builder()
            .shutdown_timeout(Duration::from_secs(5))
            .handler(slow_handler(&started, Duration::from_millis(200))),
    );
    let server = builder.build().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

    let client = tokio::spawn(send(addr, get("/slow")));
    started.notified().await;
    shutdown.trigger(ShutdownReason::Requested);

    let response = client.await.unwrap().unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "done");

    let outcome = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Graceful);

    let events = events.lock().unwrap().clone();
    assert_eq!(events.first(), Some(&Event::Listening { addr }));
    assert!(events.contains(&Event::ShutdownStarted {
        reason: ShutdownReason::Requested,
        timeout: Duration::from_secs(5),
        active: 1,
    }));
    assert_eq!(events.last(), Some(&Event::ShutdownCompleted));
}

#[tokio::test]
async fn stuck_connection_is_closed_after_timeout() {
    let started = Arc::new(Notify::new());
    let (builder, events) = recording(
        Server::builder()
            .shutdown_timeout(Duration::from_millis(100))
            .handler(slow_handler(&started, Duration::from_secs(60))),
    );
    let server = builder.build().unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

    let client = tokio::spawn(send(addr, get("/stuck")));
    started.notified().await;
    shutdown.trigger(ShutdownReason::Requested);

    let outcome = tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Forced { remaining: 1 });
    assert_eq!(
        events.lock().unwrap().last(),
        Some(&Event::ForcedClose { remaining: 1 })
    );

    let result = tokio::time::timeout(Duration::from_secs(5), client)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_err(), "client should see the connection drop");
}

#[tokio::test]
async fn idle_keep_alive_connection_does_not_block_shutdown() {
    let server = Server::builder()
        .shutdown_timeout(Duration::from_secs(5))
        .handler(|_req: Request| async { Response::text(StatusCode::OK, "hi") })
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

    // Keep the client connection open after the response.
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    let conn = tokio::spawn(conn);
    let response = sender.send_request(get("/")).await.unwrap();
    assert_eq!(body_string(response).await, "hi");

    shutdown.trigger(ShutdownReason::Requested);
    let outcome = tokio::time::timeout(Duration::from_secs(2), serving)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ShutdownOutcome::Graceful);

    drop(sender);
    let _ = conn.await;
}

#[tokio::test]
async fn new_connections_refused_after_shutdown() {
    let server = Server::builder()
        .handler(|_req: Request| async { Response::empty(StatusCode::OK) })
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    shutdown.trigger(ShutdownReason::Requested);

    let outcome = server.serve(listener, shutdown).await.unwrap();
    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn routed_json_requests() {
    #[derive(serde::Deserialize, serde::Serialize)]
    struct Note {
        text: String,
    }

    let mut router = Router::new();
    router
        .post("/notes", |req: Request| async move {
            let note: Note = read_json(&req)?;
            write_json(StatusCode::CREATED, &note)
        })
        .unwrap()
        .get("/fail", |_req: Request| async {
            Err::<Response, _>(HttpError::forbidden("keep out"))
        })
        .unwrap();

    let server = Server::builder()
        .config(plinth_server::ServerConfig::builder().max_body_bytes(64).build())
        .handler(router.into_service())
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

    let created = send(addr, post("/notes", r#"{"text":"hello"}"#)).await.unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(body_string(created).await, r#"{"text":"hello"}"#);

    let malformed = send(addr, post("/notes", "{")).await.unwrap();
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);

    let too_large = send(
        addr,
        post("/notes", r#"{"text":"this body is far longer than the sixty-four byte limit set above"}"#),
    )
    .await
    .unwrap();
    assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let forbidden = send(addr, get("/fail")).await.unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = serde_json::from_str(&body_string(forbidden).await).unwrap();
    assert_eq!(body["error"]["message"], "keep out");

    let missing = send(addr, get("/nope")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    shutdown.trigger(ShutdownReason::Requested);
    serving.await.unwrap().unwrap();
}

#[tokio::test]
async fn oversized_body_passes_transport_middleware() {
    let logged: Arc<Mutex<Vec<StatusCode>>> = Arc::default();
    let sink = Arc::clone(&logged);
    let handler_calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let seen = Arc::clone(&handler_calls);

    let server = Server::builder()
        .config(plinth_server::ServerConfig::builder().max_body_bytes(8).build())
        .middleware(around("observer", move |req: Request, next: BoxHandler| {
            let sink = Arc::clone(&sink);
            async move {
                let response = next.call(req).await;
                if let Some(log) = ResponseLog::of(&response) {
                    sink.lock().unwrap().push(log.status);
                }
                response
            }
        }))
        .middleware(RequestLogger::new())
        .handler(move |_req: Request| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async { Response::empty(StatusCode::OK) }
        })
        .build()
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = ShutdownSignal::new();
    let serving = tokio::spawn(server.serve(listener, shutdown.clone()));

    let response = send(addr, post("/upload", r#"{"payload":"well past eight bytes"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body_string(response).await.contains("PAYLOAD_TOO_LARGE"));

    let response = send(addr, post("/upload", "{}")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        *logged.lock().unwrap(),
        vec![StatusCode::PAYLOAD_TOO_LARGE, StatusCode::OK]
    );
    assert_eq!(handler_calls.load(std::sync::atomic::Ordering::SeqCst), 1);

    shutdown.trigger(ShutdownReason::Requested);
    serving.await.unwrap().unwrap();
}
