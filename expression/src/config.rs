use std::{env, path::PathBuf, time::Duration};

use crate::error::{ExpressionErr, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_CLASSIFIER: &str = "fec-classify";

/// Largest image, in bytes, the upload form accepts.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024;

/// How long a client has to send its request before the connection is dropped.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runtime settings of the web front-end.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the files served under `/static/`, holds the example images.
    pub static_root: PathBuf,
    /// Root of the files served under `/media/`, uploaded images land here.
    pub media_root: PathBuf,
    /// Program invoked with an image path to classify it.
    pub classifier: PathBuf,
    /// Extra arguments passed to the classifier before the image path.
    pub classifier_args: Vec<String>,
    pub max_image_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_root: PathBuf::from("static"),
            media_root: PathBuf::from("media"),
            classifier: PathBuf::from(DEFAULT_CLASSIFIER),
            classifier_args: Vec::new(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Loads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns `ExpressionErr::Config` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads the configuration from an arbitrary key lookup, unset keys take their default.
    ///
    /// # Arguments
    /// * `lookup` - Returns the value of a variable, if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(host) = lookup("HOST") {
            cfg.host = host;
        }
        if let Some(port) = lookup("PORT") {
            cfg.port = port.parse().map_err(|e| ExpressionErr::Config {
                var: "PORT",
                msg: format!("'{port}': {e}"),
            })?;
        }
        if let Some(root) = lookup("EXPRESSION_STATIC_ROOT") {
            cfg.static_root = root.into();
        }
        if let Some(root) = lookup("EXPRESSION_MEDIA_ROOT") {
            cfg.media_root = root.into();
        }
        if let Some(program) = lookup("EXPRESSION_CLASSIFIER") {
            cfg.classifier = program.into();
        }
        if let Some(args) = lookup("EXPRESSION_CLASSIFIER_ARGS") {
            cfg.classifier_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(max) = lookup("EXPRESSION_MAX_IMAGE_BYTES") {
            cfg.max_image_bytes = match max.parse() {
                Ok(0) => {
                    return Err(ExpressionErr::Config {
                        var: "EXPRESSION_MAX_IMAGE_BYTES",
                        msg: "must be greater than zero".into(),
                    });
                }
                Ok(n) => n,
                Err(e) => {
                    return Err(ExpressionErr::Config {
                        var: "EXPRESSION_MAX_IMAGE_BYTES",
                        msg: format!("'{max}': {e}"),
                    });
                }
            };
        }

        if let Some(secs) = lookup("EXPRESSION_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout = match secs.parse() {
                Ok(0) => {
                    return Err(ExpressionErr::Config {
                        var: "EXPRESSION_REQUEST_TIMEOUT_SECS",
                        msg: "must be greater than zero".into(),
                    });
                }
                Ok(n) => Duration::from_secs(n),
                Err(e) => {
                    return Err(ExpressionErr::Config {
                        var: "EXPRESSION_REQUEST_TIMEOUT_SECS",
                        msg: format!("'{secs}': {e}"),
                    });
                }
            };
        }

        Ok(cfg)
    }

    /// The `host:port` address to listen on.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
