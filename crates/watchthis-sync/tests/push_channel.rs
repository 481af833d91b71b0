//! End-to-end checks against an in-process stub of the movie server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};

use watchthis_proto::config::{ApiConfig, Config};
use watchthis_proto::protocol::{MessageKind, OutboundMessage};
use watchthis_sync::catalog::CatalogLoader;
use watchthis_sync::connection::{ConnectionEvent, PushSink};
use watchthis_sync::{
    Channel, ConnectionManager, ConnectionState, Feed, HttpMovieApi, MovieApi, SyncSession,
};

#[derive(Clone, Default)]
struct Stub {
    sessions: Arc<Mutex<Vec<String>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

fn movie_json(id: u64, title: &str) -> Value {
    json!({ "id": id, "title": title, "vote_average": 7.5, "release_date": "2010-07-16" })
}

fn router(stub: Stub) -> Router {
    Router::new()
        .route("/ws/:session_id", get(ws_handler))
        .route("/garbled/:session_id", get(garbled_handler))
        .route("/api/movies/trending", get(|| async { Json(json!([movie_json(1, "Inception")])) }))
        .route("/api/movies/popular", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
        .route(
            "/api/movies/upcoming",
            get(|| async { Json(json!({ "results": [movie_json(3, "Dune")], "page": 1 })) }),
        )
        .route("/api/movies/search", get(search_handler))
        .route("/api/movies/recommendations", post(recommend_handler))
        .with_state(stub)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(stub): State<Stub>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    stub.sessions.lock().await.push(session_id);
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let snapshot = json!({
        "type": "trending_movies",
        "data": [movie_json(1, "Inception"), movie_json(2, "Interstellar")],
    });
    if sender.send(WsMessage::Text(snapshot.to_string())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = receiver.next().await {
        let WsMessage::Text(text) = msg else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        if value.get("type").and_then(Value::as_str) != Some("get_recommendations") {
            continue;
        }
        let movie_id = value.get("movie_id").and_then(Value::as_u64).unwrap_or_default();
        let reply = json!({
            "type": "recommendations",
            "movie_id": movie_id,
            "data": [movie_json(movie_id + 100, "Because you liked it")],
        });
        if sender.send(WsMessage::Text(reply.to_string())).await.is_err() {
            break;
        }
    }
}

async fn garbled_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(garbled_socket)
}

/// Four undecodable frames, one good delta, then a server-side close.
async fn garbled_socket(socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let delta = json!({ "type": "trending_update", "data": [movie_json(5, "Heat")] });
    let frames = [
        "not json".to_string(),
        r#"{"data":[]}"#.to_string(),
        r#"{"type":"trending_update"}"#.to_string(),
        r#"{"type":"trending_update","data":{"id":1}}"#.to_string(),
        delta.to_string(),
    ];
    for frame in frames {
        if sender.send(WsMessage::Text(frame)).await.is_err() {
            return;
        }
    }
    if sender.send(WsMessage::Close(None)).await.is_err() {
        return;
    }
    while let Some(Ok(_)) = receiver.next().await {}
}

async fn search_handler(
    State(stub): State<Stub>,
    Query(params): Query<std::collections::HashMap<String, String>>,
) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    stub.requests.lock().await.push(format!("search {}", q));
    Json(json!({ "results": [movie_json(9, &format!("{} result", q))] }))
}

async fn recommend_handler(State(stub): State<Stub>, Json(body): Json<Value>) -> Json<Value> {
    let movie_id = body.get("movie_id").and_then(Value::as_u64).unwrap_or_default();
    stub.requests.lock().await.push(format!("recommendations {}", movie_id));
    Json(json!([movie_json(movie_id + 200, "Fetched")]))
}

async fn serve(stub: Stub) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("listener bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router(stub)).await.ok();
    });
    addr
}

async fn next_event(events: &mut mpsc::Receiver<ConnectionEvent>) -> ConnectionEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("event before timeout")
        .expect("connection task alive")
}

fn config_for(addr: SocketAddr) -> Config {
    let mut config = Config::default();
    config.api.base_url = format!("http://{}", addr);
    config.push.ws_url = format!("ws://{}/ws", addr);
    config
}

#[tokio::test]
async fn push_channel_lifecycle() {
    let stub = Stub::default();
    let addr = serve(stub.clone()).await;

    let (mut manager, mut events) =
        ConnectionManager::open(&format!("ws://{}/ws", addr), "sess01", Duration::from_secs(5));
    assert_eq!(manager.state(), ConnectionState::Connecting);
    assert_eq!(
        next_event(&mut events).await,
        ConnectionEvent::StateChanged(ConnectionState::Open)
    );
    assert_eq!(stub.sessions.lock().await.as_slice(), ["sess01"]);

    match next_event(&mut events).await {
        ConnectionEvent::Message(msg) => {
            assert_eq!(msg.kind, MessageKind::TrendingSnapshot);
            assert_eq!(msg.payload.len(), 2);
            assert_eq!(msg.payload[1].title, "Interstellar");
        }
        other => panic!("expected trending snapshot, got {:?}", other),
    }

    assert!(manager
        .send(&OutboundMessage::GetRecommendations { movie_id: 42 })
        .is_sent());
    match next_event(&mut events).await {
        ConnectionEvent::Message(msg) => {
            assert_eq!(msg.kind, MessageKind::RecommendationResult);
            assert_eq!(msg.movie_id, Some(42));
            assert_eq!(msg.payload[0].id, 142);
        }
        other => panic!("expected recommendations, got {:?}", other),
    }

    manager.close();
    manager.close();
    assert_eq!(
        next_event(&mut events).await,
        ConnectionEvent::StateChanged(ConnectionState::Closed)
    );
    assert_eq!(manager.state(), ConnectionState::Closed);
    assert!(!manager
        .send(&OutboundMessage::GetRecommendations { movie_id: 1 })
        .is_sent());
}

#[tokio::test]
async fn garbled_frames_are_skipped_until_remote_close() {
    let addr = serve(Stub::default()).await;
    let (manager, mut events) =
        ConnectionManager::open(&format!("ws://{}/garbled", addr), "sess02", Duration::from_secs(5));

    let mut seen = Vec::new();
    loop {
        let ev = next_event(&mut events).await;
        let done = ev == ConnectionEvent::StateChanged(ConnectionState::Closed);
        seen.push(ev);
        if done {
            break;
        }
    }

    assert_eq!(seen.len(), 3, "unexpected events: {:?}", seen);
    assert_eq!(seen[0], ConnectionEvent::StateChanged(ConnectionState::Open));
    match &seen[1] {
        ConnectionEvent::Message(msg) => {
            assert_eq!(msg.kind, MessageKind::TrendingDelta);
            assert_eq!(msg.payload.len(), 1);
            assert_eq!(msg.payload[0].title, "Heat");
        }
        other => panic!("expected trending delta, got {:?}", other),
    }
    assert_eq!(manager.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn http_api_and_catalog() {
    let stub = Stub::default();
    let addr = serve(stub.clone()).await;
    let api = HttpMovieApi::new(&ApiConfig {
        base_url: format!("http://{}/", addr),
        request_timeout_secs: 5,
    })
    .expect("client");

    let catalog = CatalogLoader::load_all(&api).await;
    assert_eq!(catalog.trending.len(), 1);
    assert!(catalog.popular.is_empty());
    assert!(catalog.failed(Feed::Popular));
    assert_eq!(catalog.upcoming[0].title, "Dune");

    let found = api.search("blade runner").await.expect("search");
    assert_eq!(found[0].title, "blade runner result");

    let recs = api.recommendations(7).await.expect("recommendations");
    assert_eq!(recs[0].id, 207);
    assert_eq!(
        stub.requests.lock().await.as_slice(),
        ["search blade runner", "recommendations 7"]
    );
}

#[tokio::test]
async fn session_prefers_push_once_open() {
    let stub = Stub::default();
    let addr = serve(stub.clone()).await;
    let config = config_for(addr);
    let api: Arc<dyn MovieApi> = Arc::new(HttpMovieApi::new(&config.api).expect("client"));
    let mut session = SyncSession::start(config, api);

    let wait = async {
        while session.connection_state() != ConnectionState::Open
            || session.view().trending.len() != 2
        {
            let ev = session.next_event().await.expect("session alive");
            session.handle(ev);
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("open with snapshot");

    let selected = session.view().trending[0].clone();
    assert_eq!(session.select_movie(selected), Channel::Push);
    let wait = async {
        while session.view().recommendations_loading {
            let ev = session.next_event().await.expect("session alive");
            session.handle(ev);
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("push reply");
    assert_eq!(session.view().recommendations[0].id, 101);
    assert!(stub
        .requests
        .lock()
        .await
        .iter()
        .all(|r| !r.starts_with("recommendations")));

    session.shutdown();
    session.shutdown();
}
