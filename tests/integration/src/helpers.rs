//! Test helpers for integration tests
//!
//! Provides a self-contained hub server, HTTP request shortcuts and WebSocket
//! client utilities.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use trackit_common::{AppConfig, AppError, JwtService};

/// Secret shared by the test server and the tokens issued by tests
pub const TEST_SECRET: &str = "integration-test-secret-key";

/// How long helpers wait for an expected frame or state change
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client side of a hub WebSocket
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    jwt: JwtService,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), AppError>>,
}

impl TestServer {
    /// Start a new test server with default hub settings
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let jwt = JwtService::new(&config.jwt.secret, config.jwt.token_expiry);

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(trackit_hub::serve(listener, config, async move {
            let _ = signal.await;
        }));

        let client = Client::builder().timeout(WAIT_TIMEOUT).build()?;

        Ok(Self {
            addr,
            client,
            jwt,
            shutdown: Some(shutdown),
            handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL carrying `token` as a query parameter
    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/ws?token={}", self.addr, token)
    }

    /// Issue an access token for a user
    pub fn token(&self, user_id: &str) -> Result<String> {
        Ok(self.jwt.issue_token(user_id)?)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Make a POST request with auth token
    pub async fn post_auth<T: Serialize>(
        &self,
        path: &str,
        token: &str,
        body: &T,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await?)
    }

    /// Open a WebSocket as `user_id`
    pub async fn connect(&self, user_id: &str) -> Result<WsClient> {
        let token = self.token(user_id)?;
        let (socket, _) = connect_async(self.ws_url(&token))
            .await
            .context("WebSocket handshake failed")?;
        Ok(socket)
    }

    /// Fetch `/ws/stats`
    pub async fn stats(&self) -> Result<Value> {
        let response = self.get("/ws/stats").await?;
        assert_json(response, StatusCode::OK).await
    }

    /// Poll the stats endpoint until the hub reports `expected` live connections
    pub async fn wait_for_connections(&self, expected: u64) -> Result<()> {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        loop {
            let stats = self.stats().await?;
            if stats["connections"].as_u64() == Some(expected) {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("expected {expected} live connections, stats: {stats}");
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Trigger graceful shutdown and wait for the server to stop
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        tokio::time::timeout(WAIT_TIMEOUT * 2, &mut self.handle)
            .await
            .context("server did not stop in time")???;
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Create a test configuration; no environment needed
pub fn test_config() -> AppConfig {
    AppConfig::with_secret(TEST_SECRET)
}

/// Next text frame parsed as JSON, skipping keep-alive frames
pub async fn recv_json(socket: &mut WsClient) -> Result<Value> {
    loop {
        let frame = tokio::time::timeout(WAIT_TIMEOUT, socket.next())
            .await
            .context("timed out waiting for a frame")?
            .context("socket closed")??;

        match frame {
            Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            Message::Ping(_) | Message::Pong(_) => {}
            other => anyhow::bail!("unexpected frame: {other:?}"),
        }
    }
}

/// Wait until the server closes the socket
///
/// Accepts a Close frame, end of stream, or a reset connection.
pub async fn expect_closed(socket: &mut WsClient) -> Result<()> {
    loop {
        let frame = tokio::time::timeout(WAIT_TIMEOUT, socket.next())
            .await
            .context("socket still open")?;

        match frame {
            None | Some(Err(_) | Ok(Message::Close(_))) => return Ok(()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
            Some(Ok(other)) => anyhow::bail!("unexpected frame before close: {other:?}"),
        }
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status and return the `error.code` of the JSON error body
pub async fn assert_error(response: Response, expected_status: StatusCode) -> Result<String> {
    let body: Value = assert_json(response, expected_status).await?;
    body["error"]["code"]
        .as_str()
        .map(String::from)
        .context("error body without code")
}
