//! IPC server for the rest timer daemon.
//!
//! This module provides Unix Domain Socket IPC functionality:
//! - Server that listens on a Unix socket
//! - Request/response handling for timer and settings commands
//! - Dispatch to the engine through a [`TimerHandle`]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

use crate::settings::{SettingsPatch, SettingsStore, APP_DIR};
use crate::types::{IpcRequest, IpcResponse, ResponseData, TimerSnapshot};

use super::engine::{EngineError, TimerHandle};

// ============================================================================
// Constants
// ============================================================================

/// Socket file name inside the application directory.
const SOCKET_FILE: &str = "breather.sock";

/// Maximum request size in bytes (4KB)
const MAX_REQUEST_SIZE: usize = 4096;

/// Read timeout in seconds
const READ_TIMEOUT_SECS: u64 = 5;

/// Returns `~/.breather/breather.sock`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_socket_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Failed to determine home directory")?;
    Ok(home.join(APP_DIR).join(SOCKET_FILE))
}

// ============================================================================
// IpcError
// ============================================================================

/// IPC-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum IpcError {
    /// Read error
    #[error("Failed to read request: {0}")]
    ReadError(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,

    /// Request too large
    #[error("Request too large (max {MAX_REQUEST_SIZE} bytes)")]
    RequestTooLarge,
}

// ============================================================================
// IpcServer
// ============================================================================

/// Unix Domain Socket IPC server.
pub struct IpcServer {
    /// Unix socket listener
    listener: UnixListener,
    /// Socket path (for cleanup)
    socket_path: PathBuf,
}

impl IpcServer {
    /// Creates a new IPC server bound to the specified socket path.
    ///
    /// If the socket file already exists, it will be removed before binding.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be bound.
    pub fn new(socket_path: &Path) -> Result<Self> {
        if socket_path.exists() {
            std::fs::remove_file(socket_path)
                .with_context(|| format!("Failed to remove existing socket: {:?}", socket_path))?;
        }

        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create socket directory: {:?}", parent))?;
        }

        let listener = UnixListener::bind(socket_path)
            .with_context(|| format!("Failed to bind Unix socket: {:?}", socket_path))?;

        Ok(Self {
            listener,
            socket_path: socket_path.to_path_buf(),
        })
    }

    /// Accepts an incoming client connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be accepted.
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }

    /// Accepts connections forever, handling each on its own task.
    ///
    /// # Errors
    ///
    /// Returns an error if accepting a connection fails.
    pub async fn serve(&self, handler: RequestHandler) -> Result<()> {
        loop {
            let mut stream = self.accept().await?;
            let handler = handler.clone();
            tokio::spawn(async move {
                if let Err(e) = handler.handle_connection(&mut stream).await {
                    warn!("IPC connection failed: {:#}", e);
                }
            });
        }
    }

    /// Receives and deserializes an IPC request from the stream.
    ///
    /// Applies a read timeout to prevent blocking indefinitely.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or deserialization fails.
    pub async fn receive_request(stream: &mut UnixStream) -> Result<IpcRequest> {
        let mut buffer = vec![0u8; MAX_REQUEST_SIZE + 1];

        let read_result = timeout(
            Duration::from_secs(READ_TIMEOUT_SECS),
            stream.read(&mut buffer),
        )
        .await;

        let n = match read_result {
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(IpcError::ReadError(e.to_string()).into()),
            Err(_) => return Err(IpcError::Timeout.into()),
        };

        if n == 0 {
            anyhow::bail!("Connection closed by client");
        }
        if n > MAX_REQUEST_SIZE {
            return Err(IpcError::RequestTooLarge.into());
        }

        let request: IpcRequest = serde_json::from_slice(&buffer[..n])
            .with_context(|| "Failed to deserialize IPC request")?;

        Ok(request)
    }

    /// Serializes and sends an IPC response to the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub async fn send_response(stream: &mut UnixStream, response: &IpcResponse) -> Result<()> {
        let json = serde_json::to_vec(response).context("Failed to serialize IPC response")?;

        stream
            .write_all(&json)
            .await
            .context("Failed to write response")?;
        stream.flush().await.context("Failed to flush response")?;

        Ok(())
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

// ============================================================================
// RequestHandler
// ============================================================================

/// Handles IPC requests by dispatching to the timer engine and settings store.
#[derive(Clone)]
pub struct RequestHandler {
    timer: TimerHandle,
    settings: Arc<SettingsStore>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(timer: TimerHandle, settings: Arc<SettingsStore>) -> Self {
        Self { timer, settings }
    }

    /// Reads one request from the stream and writes the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the response cannot be written.
    pub async fn handle_connection(&self, stream: &mut UnixStream) -> Result<()> {
        let response = match IpcServer::receive_request(stream).await {
            Ok(request) => {
                debug!("IPC request: {:?}", request);
                self.handle(request).await
            }
            Err(e) => IpcResponse::error(format!("Invalid request: {:#}", e)),
        };
        IpcServer::send_response(stream, &response).await
    }

    /// Handles an IPC request and returns the appropriate response.
    pub async fn handle(&self, request: IpcRequest) -> IpcResponse {
        match request {
            IpcRequest::Start => {
                command_response("Working phase started", self.timer.start_working().await)
            }
            IpcRequest::Rest => {
                command_response("Resting phase started", self.timer.start_resting().await)
            }
            IpcRequest::Pause => command_response("Timer paused", self.timer.pause().await),
            IpcRequest::Resume => command_response("Timer resumed", self.timer.resume().await),
            IpcRequest::Skip { generation } => {
                let result = match generation {
                    Some(generation) => self.timer.skip_phase(generation).await,
                    None => self.timer.skip().await,
                };
                command_response("Phase skipped", result)
            }
            IpcRequest::Reset => command_response("Timer reset", self.timer.reset().await),
            IpcRequest::Status => IpcResponse::success(
                "",
                Some(ResponseData::from_snapshot(self.timer.snapshot())),
            ),
            IpcRequest::Settings => IpcResponse::success(
                "",
                Some(ResponseData::from_settings(self.settings.current())),
            ),
            IpcRequest::Configure { patch } => self.handle_configure(&patch),
        }
    }

    /// Handles the configure command.
    fn handle_configure(&self, patch: &SettingsPatch) -> IpcResponse {
        if patch.is_empty() {
            return IpcResponse::error("No settings to change");
        }

        match self.settings.apply(patch) {
            Ok(settings) => IpcResponse::success(
                "Settings updated; they apply from the next phase",
                Some(ResponseData::from_settings(settings)),
            ),
            Err(e) => IpcResponse::error(e.to_string()),
        }
    }
}

fn command_response(message: &str, result: Result<TimerSnapshot, EngineError>) -> IpcResponse {
    match result {
        Ok(snapshot) => IpcResponse::success(message, Some(ResponseData::from_snapshot(snapshot))),
        Err(e) => IpcResponse::error(e.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
