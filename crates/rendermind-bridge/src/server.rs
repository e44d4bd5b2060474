//! WebSocket server: `/ws` for UI clients, `/health` for liveness checks.

use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info};

use rendermind_core::session::PendingInstruction;
use rendermind_core::{InstructionPipeline, PipelineError, Session, Transcriber};

use crate::error::{BridgeError, Result};
use crate::hub::{spawn_hub, HubHandle, Membership};
use crate::main_context::MainContext;
use crate::protocol::{ClientMessage, ServerMessage, WireTurn};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 8765;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl BridgeConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthResponse {
    status: String,
}

/// What a request produced.
enum Outcome {
    Reply(ServerMessage),
    /// A chat turn was accepted; its answer is broadcast later.
    Accepted(PendingInstruction),
}

/// Shared state behind every connection.
#[derive(Clone)]
pub struct BridgeState {
    main: MainContext<Session>,
    pipeline: InstructionPipeline,
    transcriber: Option<Arc<dyn Transcriber>>,
    hub: HubHandle,
}

impl BridgeState {
    /// Must be called inside a Tokio runtime: it spawns the hub task.
    pub fn new(main: MainContext<Session>, pipeline: InstructionPipeline) -> Self {
        Self {
            main,
            pipeline,
            transcriber: None,
            hub: spawn_hub(),
        }
    }

    pub fn with_transcriber(mut self, transcriber: Arc<dyn Transcriber>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    async fn handle(&self, text: &str) -> Outcome {
        let message = match ClientMessage::parse(text) {
            Ok(message) => message,
            Err(reply) => return Outcome::Reply(reply),
        };
        let reply = match message {
            ClientMessage::Ping => ServerMessage::pong(),
            ClientMessage::TranscribeAudio { audio } => self.transcribe(audio).await,
            ClientMessage::SendMessage { content, message } => {
                let text = ClientMessage::chat_text(content, message);
                match self.main.call(move |s: &mut Session| s.begin_turn(&text)).await {
                    Ok(Ok(pending)) => return Outcome::Accepted(pending),
                    Ok(Err(err)) => ServerMessage::error(err.to_string()),
                    Err(err) => ServerMessage::error(err.to_string()),
                }
            }
            ClientMessage::GetMessages => {
                match self
                    .main
                    .call(|s: &mut Session| s.log().iter().map(WireTurn::from).collect::<Vec<_>>())
                    .await
                {
                    Ok(messages) => ServerMessage::MessagesList { messages },
                    Err(err) => ServerMessage::error(err.to_string()),
                }
            }
            ClientMessage::ExecuteCode { code } => {
                let result = self
                    .main
                    .call(move |s: &mut Session| {
                        s.execute_code(&code)
                            .map(|_| ())
                            .map_err(|e| PipelineError::from(e).to_string())
                    })
                    .await;
                match result {
                    Ok(result) => ServerMessage::execution(result),
                    Err(err) => ServerMessage::error(err.to_string()),
                }
            }
            ClientMessage::ClearChat => match self.main.schedule(|s: &mut Session| s.clear()) {
                Ok(()) => ServerMessage::ChatCleared { success: true },
                Err(err) => ServerMessage::error(err.to_string()),
            },
        };
        Outcome::Reply(reply)
    }

    async fn transcribe(&self, audio: String) -> ServerMessage {
        let Some(transcriber) = &self.transcriber else {
            return ServerMessage::transcription(Err(
                "speech recognition is not configured".to_string()
            ));
        };
        let bytes = match BASE64.decode(audio.trim()) {
            Ok(bytes) => bytes,
            Err(err) => {
                return ServerMessage::transcription(Err(format!("invalid audio payload: {err}")))
            }
        };
        ServerMessage::transcription(transcriber.transcribe(bytes).await.map_err(|e| e.to_string()))
    }

    /// Generate off the main context, then record and broadcast the answer.
    async fn complete_turn(self, pending: PendingInstruction) {
        let outcome = self
            .pipeline
            .prepare(&pending.instruction, Some(pending.scene))
            .await;
        let failure = outcome.as_ref().err().map(ToString::to_string);
        let recorded = self
            .main
            .call(move |s: &mut Session| {
                let index = s.complete_turn(outcome);
                s.log().get(index).map(WireTurn::from)
            })
            .await;

        let message = match (failure, recorded) {
            (Some(err), _) => ServerMessage::error(err),
            (None, Ok(Some(turn))) => ServerMessage::NewMessage { message: turn },
            (None, Ok(None)) => return,
            (None, Err(err)) => ServerMessage::error(err.to_string()),
        };
        self.hub.broadcast(&message);
    }
}

pub fn router(state: BridgeState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn websocket(State(state): State<BridgeState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: BridgeState) {
    let Membership {
        id,
        mut inbox,
        outbox,
    } = state.hub.join();
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = inbox.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Binary(_)) => {
                let reply = ServerMessage::error("binary messages are not supported");
                if outbox.send(reply.to_json()).is_err() {
                    break;
                }
                continue;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(client = %id, error = %err, "websocket read failed");
                break;
            }
        };

        match state.handle(text.as_str()).await {
            Outcome::Reply(reply) => {
                if outbox.send(reply.to_json()).is_err() {
                    break;
                }
            }
            Outcome::Accepted(pending) => {
                // The acknowledgement is queued before the broadcast can be.
                if outbox.send(ServerMessage::processing().to_json()).is_err() {
                    break;
                }
                tokio::spawn(state.clone().complete_turn(pending));
            }
        }
    }

    state.hub.leave(id);
    drop(outbox);
    writer.abort();
}

/// Bind `config` and serve until `shutdown` resolves.
pub async fn serve<F>(config: &BridgeConfig, state: BridgeState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| BridgeError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(addr = %addr, "bridge listening on ws://{addr}/ws");
    serve_listener(listener, state, shutdown).await
}

/// Serve on an already bound listener.
pub async fn serve_listener<F>(listener: TcpListener, state: BridgeState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("bridge stopped");
    Ok(())
}
