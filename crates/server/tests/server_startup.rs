use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use tempfile::NamedTempFile;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Create a minimal valid config
fn minimal_config(port: u16) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[engine]
ffmpeg_path = "/nonexistent/ffmpeg"
"#,
        port
    )
}

/// Spawn the server and return a handle
fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_audiokit"))
        .env("AUDIOKIT_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Plain HTTP/1.1 GET returning the raw response text.
async fn http_get(port: u16, path: &str) -> Option<String> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.ok()?;
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n",
        path
    );
    stream.write_all(request.as_bytes()).await.ok()?;
    let mut response = String::new();
    stream.read_to_string(&mut response).await.ok()?;
    Some(response)
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if http_get(port, "/api/v1/health").await.is_some() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let config = write_config(&minimal_config(port));

    let mut server = spawn_server(config.path());

    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    // The engine binary is missing, but nothing loads it until an operation runs.
    let response = http_get(port, "/api/v1/health").await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("\"status\":\"ok\""));
    assert!(response.contains("\"state\":\"unloaded\""));

    server.kill().await.ok();
}

#[tokio::test]
async fn test_invalid_config_exits() {
    let port = get_available_port();
    let config = write_config(&format!(
        "[server]\nport = {}\n\n[defaults]\nbitrate = \"fast\"\n",
        port
    ));

    let mut server = spawn_server(config.path());

    let status = timeout(Duration::from_secs(5), server.wait())
        .await
        .expect("Server should exit on invalid config")
        .unwrap();
    assert!(!status.success());
}

#[tokio::test]
async fn test_missing_config_file_exits() {
    let mut server = spawn_server(std::path::Path::new("/nonexistent/audiokit.toml"));

    let status = timeout(Duration::from_secs(5), server.wait())
        .await
        .expect("Server should exit when the config file is missing")
        .unwrap();
    assert!(!status.success());
}
