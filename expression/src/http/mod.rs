//! A minimal HTTP/1.x codec, one request per connection.

mod form;
mod request;
mod response;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{ExpressionErr, Result};

pub use form::{parse_urlencoded, percent_decode};
pub use request::{Method, Request, read_request};
pub use response::{Response, Status};

/// Largest accepted request or response head (start line plus headers).
pub const MAX_HEAD_SIZE: usize = 16 * 1024;

/// Largest accepted request body, form posts are tiny.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

const HEAD_END: &[u8] = b"\r\n\r\n";

/// Raw head of a message split into its start line and headers.
#[derive(Debug)]
pub(crate) struct Head {
    pub start_line: String,
    pub headers: Vec<(String, String)>,
}

impl Head {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> Result<Option<usize>> {
        self.header("content-length")
            .map(|len| {
                len.trim().parse().map_err(|_| {
                    ExpressionErr::BadRequest(format!("invalid content-length '{len}'"))
                })
            })
            .transpose()
    }
}

/// Reads a message head, returning it along with any body bytes read past it.
///
/// # Arguments
/// * `rx` - The reader, left positioned somewhere inside the body.
///
/// # Errors
/// Returns `io::ErrorKind::UnexpectedEof` if the peer closes before sending a
/// full head, `PayloadTooLarge` if the head exceeds `MAX_HEAD_SIZE` and
/// `BadRequest` if it is not valid.
pub(crate) async fn read_head<R>(rx: &mut R) -> Result<(Head, Vec<u8>)>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0; 1024];

    let end = loop {
        if let Some(pos) = find(&buf, HEAD_END) {
            break pos;
        }
        if buf.len() > MAX_HEAD_SIZE {
            return Err(ExpressionErr::PayloadTooLarge {
                limit: MAX_HEAD_SIZE,
            });
        }

        let n = rx.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof).into());
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    if end > MAX_HEAD_SIZE {
        return Err(ExpressionErr::PayloadTooLarge {
            limit: MAX_HEAD_SIZE,
        });
    }

    let rest = buf.split_off(end + HEAD_END.len());
    buf.truncate(end);

    let text = String::from_utf8(buf)
        .map_err(|_| ExpressionErr::BadRequest("head is not valid utf-8".into()))?;
    let mut lines = text.split("\r\n");

    let start_line = lines
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| ExpressionErr::BadRequest("missing start line".into()))?
        .to_string();

    let headers = lines
        .map(|line| {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| ExpressionErr::BadRequest(format!("malformed header '{line}'")))?;
            Ok((name.trim().to_string(), value.trim().to_string()))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((
        Head {
            start_line,
            headers,
        },
        rest,
    ))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
