//! Downloading remote images over plain HTTP.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time,
};

use crate::{
    error::{ExpressionErr, Result},
    http::read_head,
};

/// An absolute `http` or `https` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    /// Path and query, always starting with `/`.
    pub path: String,
}

impl Url {
    /// Parses an absolute URL, returning `None` if it is not one.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        let (scheme, rest) = input.split_once("://")?;
        let scheme = scheme.to_ascii_lowercase();
        let default_port = match scheme.as_str() {
            "http" => 80,
            "https" => 443,
            _ => return None,
        };

        let (authority, path) = match rest.find(['/', '?']) {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, "/"),
        };
        let path = match path.strip_prefix('?') {
            Some(_) => format!("/{path}"),
            None => path.to_string(),
        };

        // Credentials are never forwarded.
        let authority = authority.rsplit('@').next()?;
        let (host, port) = match authority.split_once(':') {
            Some((host, port)) => (host, port.parse().ok()?),
            None => (authority, default_port),
        };

        let valid_host = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'));
        if !valid_host || path.chars().any(char::is_whitespace) {
            return None;
        }

        Some(Self {
            scheme,
            host: host.to_ascii_lowercase(),
            port,
            path,
        })
    }

    fn default_port(&self) -> u16 {
        if self.scheme == "https" { 443 } else { 80 }
    }

    /// `host[:port]`, the port is omitted when it is the scheme's default.
    pub fn authority(&self) -> String {
        if self.port == self.default_port() {
            self.host.clone()
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Resolves a `Location` header against this URL.
    pub fn join(&self, location: &str) -> Option<Self> {
        if location.contains("://") {
            return Self::parse(location);
        }
        if location.starts_with('/') {
            return Some(Self {
                path: location.to_string(),
                ..self.clone()
            });
        }

        let base = self.path.split('?').next().unwrap_or("/");
        let dir = &base[..base.rfind('/').map_or(0, |i| i + 1)];
        Some(Self {
            path: format!("{dir}{location}"),
            ..self.clone()
        })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.authority(), self.path)
    }
}

/// Source of remote images.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Issues a `HEAD` request and returns the final status code.
    async fn head(&self, url: &Url) -> Result<u16>;

    /// Downloads the resource at `url`.
    ///
    /// # Arguments
    /// * `limit` - At most this many body bytes are read, larger bodies are truncated.
    async fn get(&self, url: &Url, limit: usize) -> Result<Vec<u8>>;
}

/// HTTP/1.0 client over a fresh TCP connection per request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
    max_redirects: usize,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_redirects: 3,
        }
    }
}

struct Fetched {
    status: u16,
    location: Option<String>,
    body: Vec<u8>,
}

impl HttpFetcher {
    fn fetch_err(url: &Url, msg: impl Into<String>) -> ExpressionErr {
        ExpressionErr::Fetch {
            url: url.to_string(),
            msg: msg.into(),
        }
    }

    async fn request_once(&self, method: &str, url: &Url, limit: usize) -> Result<Fetched> {
        if url.scheme != "http" {
            return Err(ExpressionErr::UnsupportedScheme(url.scheme.clone()));
        }

        let connect = TcpStream::connect((url.host.as_str(), url.port));
        let mut stream = time::timeout(self.timeout, connect)
            .await
            .map_err(|_| Self::fetch_err(url, "connection timed out"))??;

        let request = format!(
            "{method} {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: expression/0.1\r\nAccept: image/*\r\nConnection: close\r\n\r\n",
            url.path,
            url.authority(),
        );
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let read = async {
            let (head, mut body) = read_head(&mut stream).await?;

            let status = head
                .start_line
                .split_whitespace()
                .nth(1)
                .and_then(|code| code.parse::<u16>().ok())
                .filter(|_| head.start_line.starts_with("HTTP/"))
                .ok_or_else(|| Self::fetch_err(url, format!("bad status line '{}'", head.start_line)))?;

            if head
                .header("transfer-encoding")
                .is_some_and(|te| te.eq_ignore_ascii_case("chunked"))
            {
                return Err(Self::fetch_err(url, "chunked responses are not supported"));
            }

            if method != "HEAD" {
                let want = head.content_length()?.map_or(limit, |len| len.min(limit));
                if body.len() < want {
                    let mut rest = Vec::new();
                    (&mut stream)
                        .take((want - body.len()) as u64)
                        .read_to_end(&mut rest)
                        .await?;
                    body.extend_from_slice(&rest);
                }
                body.truncate(want);
            } else {
                body.clear();
            }

            Ok::<_, ExpressionErr>(Fetched {
                status,
                location: head.header("location").map(str::to_string),
                body,
            })
        };

        time::timeout(self.timeout, read)
            .await
            .map_err(|_| Self::fetch_err(url, "response timed out"))?
    }

    async fn request(&self, method: &str, url: &Url, limit: usize) -> Result<Fetched> {
        let mut url = url.clone();

        for _ in 0..=self.max_redirects {
            let fetched = self.request_once(method, &url, limit).await?;
            log::debug!(status = fetched.status; "{method} {url}");

            match (fetched.status, &fetched.location) {
                (301 | 302 | 303 | 307 | 308, Some(location)) => {
                    url = url
                        .join(location)
                        .ok_or_else(|| Self::fetch_err(&url, format!("bad redirect '{location}'")))?;
                }
                _ => return Ok(fetched),
            }
        }

        Err(Self::fetch_err(&url, "too many redirects"))
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn head(&self, url: &Url) -> Result<u16> {
        Ok(self.request("HEAD", url, 0).await?.status)
    }

    async fn get(&self, url: &Url, limit: usize) -> Result<Vec<u8>> {
        let fetched = self.request("GET", url, limit).await?;
        if fetched.status != 200 {
            return Err(Self::fetch_err(
                url,
                format!("unexpected status {}", fetched.status),
            ));
        }
        Ok(fetched.body)
    }
}
