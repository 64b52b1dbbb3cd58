use std::io;

use expression::{ServerConfig, server};

#[tokio::main]
async fn main() -> io::Result<()> {
    env_logger::init();

    let config = ServerConfig::from_env()?;
    log::info!(
        "static files from {}, media in {}, classifier {}",
        config.static_root.display(),
        config.media_root.display(),
        config.classifier.display()
    );

    server::run(config).await
}
