use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use pacman_engine::config::load_config;
use pacman_engine::constants::{DEFAULT_LAYOUT, DEFAULT_SAVE_PATH};
use pacman_engine::engine::{Controls, GameEngine};
use pacman_engine::logging::init_tracing;
use pacman_engine::score_store::HighScoreStore;
use pacman_engine::server_protocol::{parse_client_message, ParsedClientMessage};
use pacman_engine::ticker::spawn_interval_driver;
use pacman_engine::types::{GameConfig, GameSummary};
use pacman_engine::world::{load_layout_file, parse_layout, MapSource};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<HighScoreStore>>,
    map_source: Arc<MapSource>,
    config: Arc<GameConfig>,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[tokio::main]
async fn main() {
    init_tracing();

    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let score_path = std::env::var("HIGH_SCORE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SAVE_PATH));

    let map_source = match std::env::var("MAP_PATH") {
        Ok(raw) => load_layout_file(&PathBuf::from(raw)),
        Err(_) => parse_layout(&DEFAULT_LAYOUT),
    };
    let map_source = match map_source {
        Ok(source) => source,
        Err(error) => {
            error!(%error, "failed to load map");
            std::process::exit(1);
        }
    };

    let config_path = std::env::var("GAME_CONFIG").ok().map(PathBuf::from);
    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load game config");
            std::process::exit(1);
        }
    };

    let store = HighScoreStore::new(score_path);
    info!(
        path = %store.path().display(),
        high_score = store.high_score(),
        "high score loaded"
    );

    let state = AppState {
        store: Arc::new(Mutex::new(store)),
        map_source: Arc::new(map_source),
        config: Arc::new(config),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/highscore", get(high_score_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind server socket");

    info!(port, "listening");
    axum::serve(listener, app)
        .await
        .expect("server runtime failed");
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn high_score_handler(State(state): State<AppState>) -> impl IntoResponse {
    let guard = state.store.lock().await;
    Json(guard.build_response())
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// One connection, one game session. The session's engine lives on its own
/// tick task; this task only reads client frames and feeds `Controls`.
async fn handle_socket(state: AppState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(256);

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    let high_score = state.store.lock().await.high_score();
    let seed = rand::random::<u32>();
    let engine = match GameEngine::new(
        state.map_source.as_ref().clone(),
        state.config.as_ref().clone(),
        seed,
        high_score,
    ) {
        Ok(engine) => engine,
        Err(error) => {
            warn!(client = %client_id, %error, "failed to build session");
            let _ = tx
                .send(OutboundMessage::Close {
                    code: 1011,
                    reason: "map unavailable".to_string(),
                })
                .await;
            drop(tx);
            let _ = writer.await;
            return;
        }
    };
    info!(client = %client_id, seed, "session opened");

    let controls = engine.controls();
    send_message(
        &tx,
        &json!({
            "type": "world",
            "clientId": client_id,
            "seed": seed,
            "world": engine.get_world_init(),
            "highScore": high_score,
        }),
    );

    let (summary_tx, summary_rx) = mpsc::unbounded_channel::<GameSummary>();
    let recorder = tokio::spawn(record_summaries(state.store.clone(), summary_rx));

    let tick_tx = tx.clone();
    let driver = spawn_interval_driver(engine, state.config.tick_ms, move |engine| {
        let snapshot = engine.build_snapshot(true);
        let state_message = json!({ "type": "state", "snapshot": snapshot });
        if let Err(mpsc::error::TrySendError::Closed(_)) =
            tick_tx.try_send(OutboundMessage::Text(state_message.to_string()))
        {
            return ControlFlow::Break(());
        }

        if let Some(summary) = engine.take_summary() {
            let game_over = json!({ "type": "game_over", "summary": summary });
            let _ = tick_tx.try_send(OutboundMessage::Text(game_over.to_string()));
            if summary_tx.send(summary).is_err() {
                warn!("high score recorder is gone");
            }
        }
        ControlFlow::Continue(())
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => handle_client_message(&tx, &controls, &client_id, raw.as_str()),
            Message::Binary(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => handle_client_message(&tx, &controls, &client_id, text),
                Err(_) => send_error(&tx, "invalid utf8 message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(client = %client_id, "session closed");
    driver.abort();
    let _ = driver.await;
    let _ = recorder.await;
    drop(tx);
    let _ = writer.await;
}

/// The store is shared by every session; the lock serialises score updates.
async fn record_summaries(
    store: Arc<Mutex<HighScoreStore>>,
    mut summaries: mpsc::UnboundedReceiver<GameSummary>,
) {
    while let Some(summary) = summaries.recv().await {
        let mut guard = store.lock().await;
        guard.record(summary.score);
        debug!(
            score = summary.score,
            level = summary.level,
            ticks = summary.ticks,
            "round recorded"
        );
    }
}

fn handle_client_message(
    tx: &mpsc::Sender<OutboundMessage>,
    controls: &Controls,
    client_id: &str,
    raw: &str,
) {
    let Some(parsed) = parse_client_message(raw) else {
        debug!(client = %client_id, "unparsed client message");
        send_error(tx, "invalid message");
        return;
    };

    match parsed {
        ParsedClientMessage::Key { key } => controls.press(key),
        ParsedClientMessage::Ping { t } => send_message(tx, &json!({ "type": "pong", "t": t })),
    }
}

fn send_message(tx: &mpsc::Sender<OutboundMessage>, message: &Value) {
    if tx.try_send(OutboundMessage::Text(message.to_string())).is_err() {
        debug!("outbound queue full or closed, message dropped");
    }
}

fn send_error(tx: &mpsc::Sender<OutboundMessage>, message: &str) {
    send_message(tx, &json!({ "type": "error", "message": message }));
}

fn make_id(prefix: &str) -> String {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{id}")
}
