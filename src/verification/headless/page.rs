//! Page-level operations the lookup oracles are built from.
//!
//! The oracles decide ordering, waiting and classification; a [`LookupPage`]
//! only performs single interactions against the browser. Both WebDriver
//! implementations live here.

use super::client::{close_client, create_client};
use crate::core::config::{Config, ScreenPoint};
use crate::core::error::{AppError, Result};

use async_trait::async_trait;
use fantoccini::{Client, Locator};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

/// One lookup page in a browser session. Every method is a single
/// interaction; none of them waits for the page to settle beyond that.
#[async_trait]
pub trait LookupPage: Send + Sync {
    /// Brings the page back to a clean, empty form.
    async fn reload(&self) -> Result<()>;

    /// Single check of the anti-automation challenge.
    async fn challenge_cleared(&self) -> Result<bool>;

    /// Enters `number` (plus notation) and submits the form.
    async fn submit(&self, number: &str) -> Result<()>;

    /// Current text of the result area. An error means "not there yet".
    async fn read_result(&self) -> Result<String>;

    /// Ends the browser session.
    async fn close(self);
}

const CHALLENGE_SUCCESS_ID: &str = "success";
const NUMBER_INPUT_ID: &str = "number";
const SUBMIT_BUTTON_XPATH: &str = "//button[.//span[contains(text(), 'Check Number')]]";
const STATUS_ID: &str = "whatsappStatus";

/// The lookup page addressed through element ids.
pub struct SelectorPage {
    client: Client,
    target_url: String,
    input_timeout: Duration,
}

impl SelectorPage {
    pub async fn open(config: &Config) -> Result<Self> {
        Ok(Self {
            client: create_client(config).await?,
            target_url: config.target_url.clone(),
            input_timeout: config.challenge_timeout,
        })
    }
}

#[async_trait]
impl LookupPage for SelectorPage {
    // A full navigation drops whatever result the previous check left behind.
    async fn reload(&self) -> Result<()> {
        Ok(self.client.goto(&self.target_url).await?)
    }

    async fn challenge_cleared(&self) -> Result<bool> {
        let element = self.client.find(Locator::Id(CHALLENGE_SUCCESS_ID)).await?;
        Ok(element.is_displayed().await?)
    }

    async fn submit(&self, number: &str) -> Result<()> {
        let input = self
            .client
            .wait()
            .at_most(self.input_timeout)
            .for_element(Locator::Id(NUMBER_INPUT_ID))
            .await?;
        input.clear().await?;
        input.send_keys(number).await?;

        self.client
            .find(Locator::XPath(SUBMIT_BUTTON_XPATH))
            .await?
            .click()
            .await?;
        Ok(())
    }

    async fn read_result(&self) -> Result<String> {
        let status = self.client.find(Locator::Id(STATUS_ID)).await?;
        Ok(status.text().await?)
    }

    async fn close(self) {
        close_client(self.client, "[checknumber]").await;
    }
}

// The coordinate-addressed page does not synthesize input events. It asks the
// DOM which element sits at a viewport point and sets, clicks or reads that
// element through injected scripts.
const TYPE_AT_POINT_JS: &str = r#"
const [x, y, value] = arguments;
const el = document.elementFromPoint(x, y);
if (!el || !('value' in el)) { return false; }
el.focus();
const proto = Object.getPrototypeOf(el);
const descriptor = Object.getOwnPropertyDescriptor(proto, 'value');
if (descriptor && descriptor.set) { descriptor.set.call(el, value); } else { el.value = value; }
el.dispatchEvent(new Event('input', { bubbles: true }));
el.dispatchEvent(new Event('change', { bubbles: true }));
return true;
"#;

const CLICK_AT_POINT_JS: &str = r#"
const el = document.elementFromPoint(arguments[0], arguments[1]);
if (!el) { return false; }
el.click();
return true;
"#;

const READ_AT_POINT_JS: &str = r#"
const el = document.elementFromPoint(arguments[0], arguments[1]);
return el ? (el.innerText || el.textContent || '') : '';
"#;

/// Pause between filling the input and clicking, letting the page's input
/// handlers run.
const TYPE_SETTLE: Duration = Duration::from_millis(500);

/// The lookup page addressed by viewport coordinates.
pub struct PositionalPage {
    client: Client,
    input: ScreenPoint,
    button: ScreenPoint,
    result: ScreenPoint,
}

impl PositionalPage {
    pub async fn open(config: &Config) -> Result<Self> {
        let client = create_client(config).await?;
        if let Err(e) = client.goto(&config.target_url).await {
            close_client(client, "[positional]").await;
            return Err(e.into());
        }
        Ok(Self {
            client,
            input: config.input_position,
            button: config.button_position,
            result: config.result_position,
        })
    }

    async fn run_script(&self, script: &str, point: ScreenPoint, extra: Option<&str>) -> Result<serde_json::Value> {
        let mut args = vec![json!(point.x), json!(point.y)];
        if let Some(value) = extra {
            args.push(json!(value));
        }
        Ok(self.client.execute(script, args).await?)
    }
}

#[async_trait]
impl LookupPage for PositionalPage {
    async fn reload(&self) -> Result<()> {
        Ok(self.client.refresh().await?)
    }

    /// The coordinate flow has no challenge step.
    async fn challenge_cleared(&self) -> Result<bool> {
        Ok(true)
    }

    async fn submit(&self, number: &str) -> Result<()> {
        let typed = self.run_script(TYPE_AT_POINT_JS, self.input, Some(number)).await?;
        if typed.as_bool() != Some(true) {
            return Err(AppError::Oracle(format!(
                "No input field at ({}, {})",
                self.input.x, self.input.y
            )));
        }
        sleep(TYPE_SETTLE).await;

        let clicked = self.run_script(CLICK_AT_POINT_JS, self.button, None).await?;
        if clicked.as_bool() != Some(true) {
            return Err(AppError::Oracle(format!(
                "Nothing clickable at ({}, {})",
                self.button.x, self.button.y
            )));
        }
        Ok(())
    }

    async fn read_result(&self) -> Result<String> {
        let text = self.run_script(READ_AT_POINT_JS, self.result, None).await?;
        Ok(text.as_str().unwrap_or_default().to_string())
    }

    async fn close(self) {
        close_client(self.client, "[positional]").await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Knobs and counters shared between a test and its [`FakePage`].
    #[derive(Default)]
    pub(crate) struct FakePageState {
        pub(crate) challenge_clears: AtomicBool,
        pub(crate) fail_reload: AtomicBool,
        pub(crate) fail_submit: AtomicBool,
        pub(crate) fail_read: AtomicBool,
        pub(crate) status: Mutex<String>,
        pub(crate) reloads: AtomicUsize,
        pub(crate) challenge_checks: AtomicUsize,
        pub(crate) submitted: Mutex<Vec<String>>,
        pub(crate) reads: AtomicUsize,
        pub(crate) closes: AtomicUsize,
    }

    impl FakePageState {
        pub(crate) fn with_status(status: &str) -> Arc<Self> {
            let state = Self::default();
            state.challenge_clears.store(true, Ordering::SeqCst);
            *state.status.lock() = status.to_string();
            Arc::new(state)
        }

        pub(crate) fn submits(&self) -> usize {
            self.submitted.lock().len()
        }
    }

    pub(crate) struct FakePage(pub(crate) Arc<FakePageState>);

    fn fault(what: &str) -> AppError {
        AppError::Oracle(format!("{} failed", what))
    }

    #[async_trait]
    impl LookupPage for FakePage {
        async fn reload(&self) -> Result<()> {
            self.0.reloads.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_reload.load(Ordering::SeqCst) {
                return Err(fault("reload"));
            }
            Ok(())
        }

        async fn challenge_cleared(&self) -> Result<bool> {
            self.0.challenge_checks.fetch_add(1, Ordering::SeqCst);
            Ok(self.0.challenge_clears.load(Ordering::SeqCst))
        }

        async fn submit(&self, number: &str) -> Result<()> {
            self.0.submitted.lock().push(number.to_string());
            if self.0.fail_submit.load(Ordering::SeqCst) {
                return Err(fault("submit"));
            }
            Ok(())
        }

        async fn read_result(&self) -> Result<String> {
            self.0.reads.fetch_add(1, Ordering::SeqCst);
            if self.0.fail_read.load(Ordering::SeqCst) {
                return Err(fault("read"));
            }
            Ok(self.0.status.lock().clone())
        }

        async fn close(self) {
            self.0.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}
