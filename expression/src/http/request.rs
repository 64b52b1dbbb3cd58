use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{MAX_BODY_SIZE, form::parse_urlencoded, percent_decode, read_head};
use crate::error::{ExpressionErr, Result};

/// The request method, only the ones the router dispatches on get a variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Other(String),
}

impl Method {
    fn parse(s: &str) -> Self {
        match s {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Head => write!(f, "HEAD"),
            Self::Post => write!(f, "POST"),
            Self::Other(m) => write!(f, "{m}"),
        }
    }
}

/// A parsed HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// The percent-decoded path, without the query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Creates a request with no headers and no body, mostly useful to drive the router directly.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates a `POST` request carrying an url-encoded form.
    pub fn form_post(target: &str, fields: &[(&str, &str)]) -> Self {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
            .collect::<Vec<_>>()
            .join("&");

        let mut req = Self::new(Method::Post, target);
        req.headers.push((
            "Content-Type".into(),
            "application/x-www-form-urlencoded".into(),
        ));
        req.body = body.into_bytes();
        req
    }

    /// Returns the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decodes the body as an url-encoded form.
    ///
    /// # Returns
    /// The form fields, empty if the body is of another content type.
    pub fn form(&self) -> Vec<(String, String)> {
        let is_form = self
            .header("content-type")
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"));

        if !is_form {
            return Vec::new();
        }

        parse_urlencoded(&String::from_utf8_lossy(&self.body))
    }
}

fn split_target(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        Some((path, query)) => (percent_decode_path(path), parse_urlencoded(query)),
        None => (percent_decode_path(target), Vec::new()),
    }
}

// `+` is only a space inside query strings and forms.
fn percent_decode_path(path: &str) -> String {
    percent_decode(&path.replace('+', "%2B"))
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            b => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Reads a single request from `rx`.
///
/// # Arguments
/// * `rx` - The connection's reading half.
///
/// # Errors
/// Returns `BadRequest` on a malformed request line or headers,
/// `PayloadTooLarge` when the head or the body are over the limits and
/// `Io` if the connection fails or closes early.
pub async fn read_request<R>(rx: &mut R) -> Result<Request>
where
    R: AsyncRead + Unpin,
{
    let (head, mut body) = read_head(rx).await?;

    let mut parts = head.start_line.split_whitespace();
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ExpressionErr::BadRequest(format!(
            "malformed request line '{}'",
            head.start_line
        )));
    };

    if !version.starts_with("HTTP/1.") {
        return Err(ExpressionErr::BadRequest(format!(
            "unsupported version '{version}'"
        )));
    }
    if !target.starts_with('/') {
        return Err(ExpressionErr::BadRequest(format!(
            "unsupported request target '{target}'"
        )));
    }

    if head
        .header("transfer-encoding")
        .is_some_and(|te| !te.eq_ignore_ascii_case("identity"))
    {
        return Err(ExpressionErr::BadRequest(
            "chunked request bodies are not supported".into(),
        ));
    }

    let len = head.content_length()?.unwrap_or(0);
    if len > MAX_BODY_SIZE {
        return Err(ExpressionErr::PayloadTooLarge {
            limit: MAX_BODY_SIZE,
        });
    }

    if body.len() < len {
        let read = body.len();
        body.resize(len, 0);
        rx.read_exact(&mut body[read..]).await?;
    }
    body.truncate(len);

    let method = Method::parse(method);
    let (path, query) = split_target(target);
    log::debug!("parsed {method} {path} with a {len} byte body");

    Ok(Request {
        method,
        path,
        query,
        headers: head.headers,
        body,
    })
}
