use std::{io, sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    signal, time,
};

use crate::{
    classifier::CommandClassifier,
    config::ServerConfig,
    error::ExpressionErr,
    fetch::HttpFetcher,
    http::{Method, Response, Status, read_request},
    templates,
    views::App,
};

/// Pause after a failed accept, so a full descriptor table is not spun on.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A source of incoming connections.
#[async_trait]
pub trait Listener: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Waits for the next connection.
    ///
    /// # Returns
    /// The connection and a printable peer address.
    async fn accept(&mut self) -> io::Result<(Self::Stream, String)>;
}

#[async_trait]
impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<(TcpStream, String)> {
        let (stream, peer) = TcpListener::accept(self).await?;
        Ok((stream, peer.to_string()))
    }
}

/// Serves a single request on `stream` and closes it.
///
/// # Arguments
/// * `stream` - A connected, bidirectional byte stream.
/// * `app` - The application answering the request.
///
/// # Errors
/// Returns `io::Error` if the response cannot be written, a peer that
/// disconnects or stays silent before sending a request is not an error.
pub async fn handle_connection<S>(stream: S, app: &App) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut rx, mut tx) = tokio::io::split(stream);

    let deadline = app.config().request_timeout;
    let Ok(read) = time::timeout(deadline, read_request(&mut rx)).await else {
        debug!("no request within {deadline:?}, closing");
        return Ok(());
    };

    let (resp, head_only) = match read {
        Ok(req) => (app.handle(&req).await, req.method == Method::Head),
        Err(ExpressionErr::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
            debug!("peer closed before sending a request");
            return Ok(());
        }
        Err(ExpressionErr::Io(e)) => return Err(e),
        Err(ExpressionErr::PayloadTooLarge { limit }) => {
            warn!(limit = limit; "request too large");
            let body = templates::bad_request("The request is too large.");
            (Response::html(Status::PayloadTooLarge, body), false)
        }
        Err(e) => {
            warn!("{e}");
            (Response::html(Status::BadRequest, templates::bad_request(&e.to_string())), false)
        }
    };

    resp.write_to(&mut tx, head_only).await
}

/// Accepts connections forever, each one is served in its own task.
///
/// Accept failures are logged and the loop goes on after a short pause.
pub async fn serve<L: Listener>(mut listener: L, app: Arc<App>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("accepting a connection failed: {e}");
                time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!("connection from {peer}");

        let app = Arc::clone(&app);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &app).await {
                error!("connection with {peer} failed: {e}");
            }
        });
    }
}

/// Builds the application from `config` and serves it until Ctrl-C.
pub async fn run(config: ServerConfig) -> io::Result<()> {
    let addr = config.addr();
    let classifier = CommandClassifier::new(config.classifier.clone(), config.classifier_args.clone());
    let app = Arc::new(App::new(
        config,
        Box::new(HttpFetcher::default()),
        Box::new(classifier),
    ));

    let listener = TcpListener::bind(&addr).await?;
    info!("listening at {addr}");

    tokio::select! {
        _ = serve(listener, app) => {}
        ret = signal::ctrl_c() => {
            ret?;
            info!("received Ctrl-C");
        }
    }

    info!("shutting down");
    Ok(())
}
