use std::path::PathBuf;
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::{EventLoadEventFired, NavigateParams};
use chromiumoxide::page::Page;
use chromiumoxide::Element;
use futures::StreamExt;

use crate::error::{ProbeError, Result};

/// Poll step for bounded element waits.
const POLL: Duration = Duration::from_millis(250);

/// Ceiling on the page load-event wait during navigation.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ChromeDriver {
    browser: Browser,
    temp_dir: Option<PathBuf>,
}

/// Connection mode for the Chrome browser.
pub enum ConnectionMode {
    /// Launches Chrome (system installation or explicit path).
    Sandboxed {
        chrome_path: Option<String>,
        no_sandbox: bool,
        headless: bool,
    },
    /// Connects to an already-running Chrome on its debug port.
    DebugPort(u16),
}

impl ChromeDriver {
    /// Launch a visible Chrome using the system installation.
    pub async fn launch_sandboxed() -> Result<Self> {
        Self::new(ConnectionMode::Sandboxed {
            chrome_path: None,
            no_sandbox: false,
            headless: false,
        })
        .await
    }

    /// Connect to an existing Chrome on a debug port.
    pub async fn connect_debug_port(port: u16) -> Result<Self> {
        Self::new(ConnectionMode::DebugPort(port)).await
    }

    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        let (browser, temp_dir) = match mode {
            ConnectionMode::Sandboxed {
                chrome_path,
                no_sandbox,
                headless,
            } => {
                // Unique profile dir per instance so parallel runs and tests
                // never share state; cleaned up in Drop.
                let unique_id = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos();
                let temp_dir = std::env::temp_dir().join(format!("vidprobe-{}", unique_id));
                std::fs::create_dir_all(&temp_dir).map_err(|e| {
                    ProbeError::LaunchFailed(format!("Failed to create temp directory: {}", e))
                })?;

                let mut config = if headless {
                    BrowserConfig::builder()
                } else {
                    BrowserConfig::builder().with_head()
                };

                config = config.user_data_dir(&temp_dir);

                // Linux AppArmor workaround
                if no_sandbox {
                    config = config.arg("--no-sandbox");
                }

                if let Some(path) = chrome_path {
                    config = config.chrome_executable(path);
                }

                let built = config.build().map_err(|e| {
                    ProbeError::LaunchFailed(format!(
                        "{}. \n\n\
                         Chrome not found. You can:\n\
                         - Install Chrome: https://www.google.com/chrome/\n\
                         - Ubuntu/Debian: sudo apt install chromium-browser\n\
                         - Or specify a path: --chrome-path /path/to/chrome\n\
                         - Linux sandbox issue? Try: --no-sandbox",
                        e
                    ))
                })?;

                let (browser, mut handler) = Browser::launch(built).await.map_err(|e| {
                    ProbeError::LaunchFailed(format!(
                        "{}. \n\n\
                         Chrome not found. You can:\n\
                         - Install Chrome: https://www.google.com/chrome/\n\
                         - Ubuntu/Debian: sudo apt install chromium-browser\n\
                         - Or specify a path: --chrome-path /path/to/chrome\n\
                         - Linux sandbox issue? Try: --no-sandbox",
                        e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drain browser events
                    }
                });

                (browser, Some(temp_dir))
            }
            ConnectionMode::DebugPort(port) => {
                let url = format!("http://localhost:{}", port);
                let (browser, mut handler) = Browser::connect(&url).await.map_err(|e| {
                    ProbeError::ConnectionFailed(format!(
                        "Failed to connect to Chrome on port {}. \
                         Make sure Chrome is running with --remote-debugging-port={}: {}",
                        port, port, e
                    ))
                })?;

                tokio::spawn(async move {
                    while (handler.next().await).is_some() {
                        // Drain browser events
                    }
                });

                (browser, None)
            }
        };

        Ok(Self { browser, temp_dir })
    }

    /// The current active page, skipping Chrome's own chrome:// pages.
    /// Creates a blank page if the browser has none.
    pub async fn page(&self) -> Result<Page> {
        let pages = self.browser.pages().await?;

        for page in pages.iter() {
            if let Ok(Some(url)) = page.url().await {
                if !url.starts_with("chrome://") {
                    return Ok(page.clone());
                }
            }
        }

        if let Some(page) = pages.last() {
            return Ok(page.clone());
        }

        self.browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProbeError::Other(format!("Failed to create page: {}", e)))
    }

    /// Navigate via CDP `Page.navigate` and wait for the load event.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        let page = self.page().await?;

        log::info!("Navigating to {}", url);

        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|e| ProbeError::NavigationFailed(format!("Invalid URL {}: {}", url, e)))?;

        // Subscribe before navigating so a fast load event is not missed.
        let mut load_events = page
            .event_listener::<EventLoadEventFired>()
            .await
            .map_err(|e| ProbeError::NavigationFailed(e.to_string()))?;

        let response = page.execute(params).await.map_err(|e| {
            let text = e.to_string();
            // "oneshot canceled" means the browser connection is gone
            if text.contains("oneshot canceled") {
                ProbeError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                ProbeError::NavigationFailed(format!("Failed to navigate to {}: {}", url, text))
            }
        })?;

        if let Some(error_text) = response.result.error_text.clone() {
            return Err(ProbeError::NavigationFailed(format!(
                "Navigation error: {}",
                error_text
            )));
        }

        match tokio::time::timeout(LOAD_TIMEOUT, load_events.next()).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                log::warn!("Load event stream closed before firing for {}", url);
            }
            Err(_) => {
                return Err(ProbeError::NavigationTimeout(format!(
                    "No load event within {:?} for {}",
                    LOAD_TIMEOUT, url
                )));
            }
        }

        // Small settle delay for late layout/script work
        tokio::time::sleep(Duration::from_millis(500)).await;

        Ok(())
    }

    /// Current URL of the active page.
    pub async fn current_url(&self) -> Result<String> {
        let page = self.page().await?;
        let url = page
            .url()
            .await
            .map_err(|e| ProbeError::Other(e.to_string()))?
            .ok_or(ProbeError::NoPage)?;
        Ok(url)
    }

    /// Bounded wait for an element to exist in the DOM.
    pub async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let page = self.page().await?;
        let deadline = Instant::now() + timeout;

        loop {
            if let Ok(element) = page.find_element(selector).await {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(ProbeError::ElementNotFound(format!(
                    "{} (waited {:?})",
                    selector, timeout
                )));
            }
            tokio::time::sleep(POLL).await;
        }
    }

    /// Bounded wait for an element to exist and have a non-empty box.
    pub async fn wait_for_visible(&self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;

        loop {
            if self.is_visible(selector).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProbeError::ElementNotFound(format!(
                    "{} not visible within {:?}",
                    selector, timeout
                )));
            }
            tokio::time::sleep(POLL).await;
        }
    }

    /// One-shot visibility probe, no waiting.
    pub async fn is_visible(&self, selector: &str) -> Result<bool> {
        let expr = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             return r.width > 0 && r.height > 0; }})()",
            sel = js_string(selector)
        );
        let value = self.evaluate(&expr).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Visible text of the first element matching `selector`.
    pub async fn element_text(&self, selector: &str) -> Result<String> {
        let page = self.page().await?;
        let text = page
            .find_element(selector)
            .await
            .map_err(|_e| ProbeError::ElementNotFound(selector.to_string()))?
            .inner_text()
            .await
            .map_err(|_e| ProbeError::ElementNotFound(selector.to_string()))?
            .ok_or_else(|| ProbeError::ElementNotFound(selector.to_string()))?;
        Ok(text)
    }

    /// Click the first element matching `selector` (scrolled into view).
    pub async fn click(&self, selector: &str) -> Result<()> {
        let page = self.page().await?;
        page.find_element(selector)
            .await
            .map_err(|_e| ProbeError::ElementNotFound(selector.to_string()))?
            .click()
            .await
            .map_err(|e| ProbeError::Other(format!("Click on {} failed: {}", selector, e)))?;
        Ok(())
    }

    /// Dispatch a raw mouse click at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64, button: MouseButton) -> Result<()> {
        let page = self.page().await?;

        let pressed = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MousePressed)
            .x(x)
            .y(y)
            .button(button.clone())
            .click_count(1)
            .build()
            .map_err(ProbeError::Other)?;
        page.execute(pressed).await?;

        let released = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseReleased)
            .x(x)
            .y(y)
            .button(button)
            .click_count(1)
            .build()
            .map_err(ProbeError::Other)?;
        page.execute(released).await?;

        Ok(())
    }

    /// Dispatch a key down/up pair for a single printable key.
    pub async fn press_key(&self, key: &str) -> Result<()> {
        let page = self.page().await?;

        let down = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyDown)
            .key(key)
            .text(key)
            .build()
            .map_err(ProbeError::Other)?;
        page.execute(down).await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .key(key)
            .build()
            .map_err(ProbeError::Other)?;
        page.execute(up).await?;

        Ok(())
    }

    /// Execute JavaScript in the page context, returning JSON (null on
    /// undefined results).
    pub async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let page = self.page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::Other(format!("Script execution failed: {}", e)))?;
        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    /// Execute JavaScript and deserialize the result.
    pub async fn evaluate_typed<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let page = self.page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| ProbeError::Other(format!("Script execution failed: {}", e)))?;
        result
            .into_value()
            .map_err(|e| ProbeError::Other(format!("Failed to deserialize result: {}", e)))
    }

    /// True while the browser connection responds.
    pub async fn is_alive(&self) -> bool {
        match self.browser.pages().await {
            Ok(pages) => {
                if let Some(page) = pages.first() {
                    matches!(
                        tokio::time::timeout(Duration::from_secs(2), page.url()).await,
                        Ok(Ok(_))
                    )
                } else {
                    true
                }
            }
            Err(_) => false,
        }
    }

    /// Close the browser connection. Consumes the driver so nothing can use
    /// it afterward.
    pub async fn close(mut self) -> Result<()> {
        self.browser
            .close()
            .await
            .map_err(|e| ProbeError::Other(e.to_string()))?;
        Ok(())
    }
}

impl Drop for ChromeDriver {
    fn drop(&mut self) {
        if let Some(temp_dir) = &self.temp_dir {
            if temp_dir.exists() {
                let _ = std::fs::remove_dir_all(temp_dir);
            }
        }
    }
}

/// Quote a Rust string as a JavaScript string literal.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a#video-title"), "\"a#video-title\"");
        assert_eq!(js_string("it's \"here\""), "\"it's \\\"here\\\"\"");
    }
}
