use std::{collections::VecDeque, io, path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{self as tokio_io, AsyncReadExt, AsyncWriteExt, DuplexStream},
    time,
};

use expression::{
    App, ClassScore, EmotionClassifier, ImageFetcher, Result, ServerConfig, Url, http,
    server::{self, Listener},
};

const BUF_SIZE: usize = 1 << 16;

struct NoImages;

#[async_trait]
impl ImageFetcher for NoImages {
    async fn head(&self, _url: &Url) -> Result<u16> {
        Ok(404)
    }

    async fn get(&self, url: &Url, _limit: usize) -> Result<Vec<u8>> {
        panic!("unexpected download of {url}")
    }
}

struct NoFaces;

#[async_trait]
impl EmotionClassifier for NoFaces {
    async fn classify(&self, _image: &Path) -> Result<Option<Vec<ClassScore>>> {
        Ok(None)
    }
}

fn app() -> App {
    App::new(ServerConfig::default(), Box::new(NoImages), Box::new(NoFaces))
}

/// Sends `raw` over an in-memory connection and returns everything written back.
async fn exchange(raw: &[u8]) -> io::Result<String> {
    let app = app();
    let (mut client, server_side) = tokio_io::duplex(BUF_SIZE);

    let serve = server::handle_connection(server_side, &app);
    let talk = async {
        client.write_all(raw).await?;
        let mut out = Vec::new();
        client.read_to_end(&mut out).await?;
        Ok::<_, io::Error>(out)
    };

    let (served, out) = tokio::join!(serve, talk);
    served?;
    Ok(String::from_utf8_lossy(&out?).into_owned())
}

#[tokio::test]
async fn get_over_a_connection() -> io::Result<()> {
    let resp = exchange(b"GET /about/ HTTP/1.1\r\nHost: localhost\r\n\r\n").await?;

    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(resp.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(resp.contains("Connection: close\r\n"));
    assert!(resp.contains("<h1>About</h1>"));
    Ok(())
}

#[tokio::test]
async fn head_has_no_body() -> io::Result<()> {
    let resp = exchange(b"HEAD / HTTP/1.1\r\n\r\n").await?;

    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(resp.ends_with("\r\n\r\n"));
    Ok(())
}

#[tokio::test]
async fn posted_form_is_read_from_the_body() -> io::Result<()> {
    let body = "url=http%3A%2F%2Fimg.test%2Fgone.jpg";
    let raw = format!(
        "POST /upload/ HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    let resp = exchange(raw.as_bytes()).await?;

    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(resp.contains("Image not found at specified url."));
    assert!(resp.contains(r#"value="http://img.test/gone.jpg""#));
    Ok(())
}

#[tokio::test]
async fn malformed_requests_get_a_400() -> io::Result<()> {
    for raw in [
        &b"GARBAGE\r\n\r\n"[..],
        b"GET / SPDY/3\r\n\r\n",
        b"GET http://elsewhere/ HTTP/1.1\r\n\r\n",
        b"POST /upload/ HTTP/1.1\r\nContent-Length: lots\r\n\r\n",
        b"POST /upload/ HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n",
    ] {
        let resp = exchange(raw).await?;
        assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{resp}");
    }
    Ok(())
}

#[tokio::test]
async fn oversized_body_gets_a_413() -> io::Result<()> {
    let resp = exchange(b"POST /upload/ HTTP/1.1\r\nContent-Length: 10000000\r\n\r\n").await?;
    assert!(resp.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    Ok(())
}

#[tokio::test]
async fn oversized_head_gets_a_413() -> io::Result<()> {
    // Ends just past the limit, inside the last chunk read.
    let filler = "a".repeat(http::MAX_HEAD_SIZE + 500);
    let raw = format!("GET / HTTP/1.1\r\nX-Filler: {filler}\r\n\r\n");

    let resp = exchange(raw.as_bytes()).await?;
    assert!(resp.starts_with("HTTP/1.1 413 Payload Too Large\r\n"), "{resp}");
    Ok(())
}

#[tokio::test]
async fn silent_peer_is_not_an_error() -> io::Result<()> {
    let app = app();
    let (client, server_side) = tokio_io::duplex(BUF_SIZE);
    drop(client);

    server::handle_connection(server_side, &app).await
}

#[tokio::test]
async fn idle_peer_is_dropped_after_the_deadline() -> io::Result<()> {
    let config = ServerConfig {
        request_timeout: Duration::from_millis(50),
        ..ServerConfig::default()
    };
    let app = App::new(config, Box::new(NoImages), Box::new(NoFaces));
    let (mut client, server_side) = tokio_io::duplex(BUF_SIZE);

    time::timeout(Duration::from_secs(5), server::handle_connection(server_side, &app))
        .await
        .expect("connection still open after the deadline")?;

    let mut out = Vec::new();
    client.read_to_end(&mut out).await?;
    assert!(out.is_empty());
    Ok(())
}

/// Hands out queued connections, then waits forever.
struct Queued(VecDeque<io::Result<DuplexStream>>);

#[async_trait]
impl Listener for Queued {
    type Stream = DuplexStream;

    async fn accept(&mut self) -> io::Result<(DuplexStream, String)> {
        match self.0.pop_front() {
            Some(conn) => conn.map(|stream| (stream, "test-peer".to_string())),
            None => std::future::pending().await,
        }
    }
}

#[tokio::test]
async fn accept_errors_do_not_stop_the_server() -> io::Result<()> {
    let (mut client, server_side) = tokio_io::duplex(BUF_SIZE);
    let listener = Queued(VecDeque::from([
        Err(io::Error::other("too many open files")),
        Ok(server_side),
    ]));
    let serving = tokio::spawn(server::serve(listener, Arc::new(app())));

    client.write_all(b"GET /about/ HTTP/1.1\r\n\r\n").await?;
    let mut out = Vec::new();
    time::timeout(Duration::from_secs(5), client.read_to_end(&mut out))
        .await
        .expect("no response after a failed accept")?;

    assert!(String::from_utf8_lossy(&out).starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(!serving.is_finished());
    serving.abort();
    Ok(())
}
