//! Web front-end for the facial expression classifier.
//!
//! Users submit the address of an image (or pick one of the bundled examples),
//! the image is run through the pretrained classifier and the per emotion
//! confidences are rendered as a page.

pub mod classifier;
pub mod config;
pub mod emotion;
pub mod error;
pub mod fetch;
pub mod forms;
pub mod http;
pub mod server;
pub mod store;
pub mod templates;
pub mod validation;
pub mod views;

pub use classifier::{CommandClassifier, EmotionClassifier};
pub use config::ServerConfig;
pub use emotion::{ClassScore, Emotion, Score};
pub use error::{ExpressionErr, Result};
pub use fetch::{HttpFetcher, ImageFetcher, Url};
pub use views::App;
