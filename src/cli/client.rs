//! IPC client for communicating with the breather daemon.
//!
//! This module provides:
//! - Unix Domain Socket client
//! - Request/response handling
//! - Connection retry logic
//! - Timeout handling

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::timeout;

use crate::daemon::default_socket_path;
use crate::settings::SettingsPatch;
use crate::types::{IpcRequest, IpcResponse};

// ============================================================================
// Constants
// ============================================================================

/// Connection timeout in seconds
const CONNECTION_TIMEOUT_SECS: u64 = 5;

/// Read/write timeout in seconds
const IO_TIMEOUT_SECS: u64 = 5;

/// Maximum response size in bytes (64KB)
const MAX_RESPONSE_SIZE: u64 = 65536;

/// Maximum retry attempts
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds (base delay, multiplied by attempt number)
const RETRY_DELAY_MS: u64 = 500;

// ============================================================================
// IpcClient
// ============================================================================

/// IPC client for daemon communication.
#[derive(Debug, Clone)]
pub struct IpcClient {
    /// Socket path
    socket_path: PathBuf,
    /// Connection timeout
    timeout: Duration,
}

impl IpcClient {
    /// Creates a new IPC client with the default socket path.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_socket_path(default_socket_path()?))
    }

    /// Creates a new IPC client with a custom socket path.
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: Duration::from_secs(CONNECTION_TIMEOUT_SECS),
        }
    }

    /// Returns the socket path.
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub async fn start(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Start).await
    }

    pub async fn rest(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Rest).await
    }

    pub async fn pause(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Pause).await
    }

    pub async fn resume(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Resume).await
    }

    /// Skips the current phase.
    ///
    /// With a generation, the daemon rejects the skip if that phase already ended.
    pub async fn skip(&self, generation: Option<u64>) -> Result<IpcResponse> {
        self.request(&IpcRequest::Skip { generation }).await
    }

    pub async fn reset(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Reset).await
    }

    pub async fn status(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Status).await
    }

    pub async fn settings(&self) -> Result<IpcResponse> {
        self.request(&IpcRequest::Settings).await
    }

    pub async fn configure(&self, patch: SettingsPatch) -> Result<IpcResponse> {
        self.request(&IpcRequest::Configure { patch }).await
    }

    /// Sends a request and turns an error response into an error.
    async fn request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let response = self.send_request_with_retry(request).await?;
        if response.is_error() {
            anyhow::bail!("{}", response.message);
        }
        Ok(response)
    }

    /// Sends a request to the daemon with retry logic.
    ///
    /// Only transport failures are retried; an error response from the
    /// daemon is returned as is.
    async fn send_request_with_retry(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match self.send_request(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    tracing::warn!("Request failed (attempt {}/{}): {:#}", attempt, MAX_RETRIES, e);
                    last_error = Some(e);

                    if attempt < MAX_RETRIES {
                        let delay = Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt));
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Request was not sent")))
    }

    /// Sends a single request to the daemon.
    async fn send_request(&self, request: &IpcRequest) -> Result<IpcResponse> {
        let mut stream = timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timed out")?
            .with_context(|| {
                format!(
                    "Cannot connect to the daemon at {}. Start it with 'breather daemon'",
                    self.socket_path.display()
                )
            })?;

        let request_json = serde_json::to_string(request).context("Failed to serialize request")?;

        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            stream.write_all(request_json.as_bytes()),
        )
        .await
        .context("Write timed out")?
        .context("Failed to send request")?;

        timeout(Duration::from_secs(IO_TIMEOUT_SECS), stream.flush())
            .await
            .context("Flush timed out")?
            .context("Failed to flush request")?;

        // Shutdown write side to signal end of request
        stream
            .shutdown()
            .await
            .context("Failed to shut down write side")?;

        let mut buffer = Vec::new();
        timeout(
            Duration::from_secs(IO_TIMEOUT_SECS),
            (&mut stream).take(MAX_RESPONSE_SIZE).read_to_end(&mut buffer),
        )
        .await
        .context("Read timed out")?
        .context("Failed to receive response")?;

        if buffer.is_empty() {
            anyhow::bail!("The daemon sent no response");
        }

        serde_json::from_slice(&buffer).context("Failed to parse response")
    }
}

// ============================================================================
// Tests
// ============================================================================
