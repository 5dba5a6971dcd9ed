//! WebDriver session management shared by the browser-driven oracles.

use crate::core::config::Config;
use crate::core::error::Result;

use fantoccini::{Client, ClientBuilder};
use serde_json::map::Map as JsonMap;

/// Creates a WebDriver client connection with appropriate capabilities.
///
/// The browser runs headed unless `config.headless` is set: the lookup page's
/// challenge tends to stall in headless Chrome.
pub async fn create_client(config: &Config) -> Result<Client> {
    let webdriver_url = config.webdriver_url.as_str();
    tracing::debug!(target: "oracle", "Connecting to WebDriver at {}...", webdriver_url);

    let mut caps = JsonMap::new();
    let mut chrome_opts = JsonMap::new();

    let mut args = vec![
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--window-size=1920,1080",
        "--disable-extensions",
        "--disable-sync",
        "--disable-translate",
        "--mute-audio",
        "--log-level=1",
    ];
    if config.headless {
        args.push("--headless=new");
        args.push("--disable-gpu");
    }
    chrome_opts.insert("args".to_string(), serde_json::json!(args));

    caps.insert("browserName".to_string(), serde_json::json!("chrome"));
    caps.insert(
        "goog:chromeOptions".to_string(),
        serde_json::json!(chrome_opts),
    );

    tracing::trace!(target: "oracle", "WebDriver capabilities: {:?}", caps);

    let mut builder = ClientBuilder::native();
    builder.capabilities(caps);

    match builder.connect(webdriver_url).await {
        Ok(client) => {
            tracing::info!(target: "oracle", "WebDriver client connected successfully.");
            Ok(client)
        }
        Err(e) => {
            tracing::error!(target: "oracle", "Failed to connect to WebDriver at {}: {}", webdriver_url, e);
            Err(e.into())
        }
    }
}

/// Closes a client connection, logging any errors.
pub async fn close_client(client: Client, label: &str) {
    tracing::debug!(target: "oracle", "{} Closing WebDriver client...", label);
    match client.close().await {
        Ok(()) => tracing::info!(target: "oracle", "{} WebDriver session closed.", label),
        Err(e) => {
            tracing::warn!(target: "oracle", "{} Failed to close WebDriver client cleanly: {}", label, e)
        }
    }
}
