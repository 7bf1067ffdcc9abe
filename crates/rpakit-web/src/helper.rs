use std::time::Duration;

use thirtyfour::{components::SelectElement, error::WebDriverError, prelude::*};
use tracing::debug;

use rpakit_core::{errors::Error, Result};

/// Default wait for element operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const IFRAME_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Wait-then-act element operations over a live [`WebDriver`].
///
/// Every method waits for the element to reach the state the action needs
/// (displayed, clickable, present) before touching it, polling every 500 ms
/// up to `timeout`.
pub struct WebHelper {
    driver: WebDriver,
}

impl WebHelper {
    pub fn new(driver: WebDriver) -> Self {
        Self { driver }
    }

    /// Escape hatch for operations the helper does not cover.
    pub fn driver(&self) -> &WebDriver {
        &self.driver
    }

    /// Type text into a visible element.
    pub async fn type_into_element(&self, by: By, text: &str, timeout: Duration) -> Result<()> {
        let elem = self.wait_displayed(by.clone(), timeout).await?;
        elem.send_keys(text)
            .await
            .map_err(|e| wd_err(&by, "send keys", e))
    }

    /// Click an element once it is clickable.
    pub async fn click_element(&self, by: By, timeout: Duration) -> Result<()> {
        let elem = self.wait_clickable(by.clone(), timeout).await?;
        elem.click().await.map_err(|e| wd_err(&by, "click", e))
    }

    /// Clear the text of a visible element.
    pub async fn clear_element_text(&self, by: By, timeout: Duration) -> Result<()> {
        let elem = self.wait_displayed(by.clone(), timeout).await?;
        elem.clear().await.map_err(|e| wd_err(&by, "clear", e))
    }

    /// Select a `<select>` option by its `value` attribute.
    pub async fn select_dropdown_option_by_value(
        &self,
        by: By,
        value: &str,
        timeout: Duration,
    ) -> Result<()> {
        let elem = self.wait_present(by.clone(), timeout).await?;
        let select = SelectElement::new(&elem)
            .await
            .map_err(|e| wd_err(&by, "read select", e))?;
        select
            .select_by_value(value)
            .await
            .map_err(|e| wd_err(&by, "select value", e))
    }

    /// Switch the driver's context into an iframe.
    pub async fn switch_to_iframe(&self, by: By) -> Result<()> {
        let frame = self.wait_present(by.clone(), IFRAME_TIMEOUT).await?;
        frame
            .enter_frame()
            .await
            .map_err(|e| wd_err(&by, "enter frame", e))
    }

    /// Immediate presence check, no waiting.
    pub async fn is_element_present(&self, by: By) -> Result<bool> {
        let found = self
            .driver
            .find_all(by.clone())
            .await
            .map_err(|e| wd_err(&by, "find", e))?;
        Ok(!found.is_empty())
    }

    /// Text content of a visible element. An element that never shows up
    /// yields an empty string, not an error.
    pub async fn get_element_text(&self, by: By, timeout: Duration) -> Result<String> {
        match self.wait_displayed(by.clone(), timeout).await {
            Ok(elem) => elem.text().await.map_err(|e| wd_err(&by, "read text", e)),
            Err(_) => {
                debug!(locator = ?by, "element not found, returning empty text");
                Ok(String::new())
            }
        }
    }

    async fn wait_present(&self, by: By, timeout: Duration) -> Result<WebElement> {
        self.driver
            .query(by.clone())
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await
            .map_err(|e| wd_err(&by, "locate", e))
    }

    async fn wait_displayed(&self, by: By, timeout: Duration) -> Result<WebElement> {
        let elem = self.wait_present(by.clone(), timeout).await?;
        elem.wait_until()
            .wait(timeout, POLL_INTERVAL)
            .displayed()
            .await
            .map_err(|e| wd_err(&by, "wait for display", e))?;
        Ok(elem)
    }

    async fn wait_clickable(&self, by: By, timeout: Duration) -> Result<WebElement> {
        let elem = self.wait_present(by.clone(), timeout).await?;
        elem.wait_until()
            .wait(timeout, POLL_INTERVAL)
            .clickable()
            .await
            .map_err(|e| wd_err(&by, "wait for clickable", e))?;
        Ok(elem)
    }
}

fn wd_err(by: &By, action: &str, e: WebDriverError) -> Error {
    Error::WebDriver(format!("{action} on {by:?} failed: {e}"))
}
