//! Evaluation scope inside a (possibly cross-origin) player iframe.
//!
//! Resolves the iframe element to its frame id, creates an isolated world in
//! that frame, and runs `Runtime.evaluate` against the resulting execution
//! context. Dismissing an interstitial can reload the embedded player, so the
//! scope can be re-attached to pick up the fresh frame.

use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::page::CreateIsolatedWorldParams;
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId};
use chromiumoxide::page::Page;

use crate::error::{ProbeError, Result};

const POLL: Duration = Duration::from_millis(250);

pub struct FrameScope {
    page: Page,
    iframe_selector: String,
    context_id: ExecutionContextId,
}

impl FrameScope {
    /// Attach to the frame hosted by the first element matching
    /// `iframe_selector`.
    pub async fn attach(page: &Page, iframe_selector: &str) -> Result<Self> {
        let context_id = Self::resolve_context(page, iframe_selector).await?;
        Ok(Self {
            page: page.clone(),
            iframe_selector: iframe_selector.to_string(),
            context_id,
        })
    }

    /// Re-resolve the frame after the embedded content may have reloaded.
    pub async fn reattach(&mut self) -> Result<()> {
        self.context_id = Self::resolve_context(&self.page, &self.iframe_selector).await?;
        Ok(())
    }

    async fn resolve_context(page: &Page, iframe_selector: &str) -> Result<ExecutionContextId> {
        let element = page
            .find_element(iframe_selector)
            .await
            .map_err(|_e| ProbeError::ElementNotFound(iframe_selector.to_string()))?;

        let node = element
            .description()
            .await
            .map_err(|e| ProbeError::Other(format!("describe {}: {}", iframe_selector, e)))?;

        let frame_id = node.frame_id.ok_or_else(|| {
            ProbeError::Other(format!("{} does not host a frame", iframe_selector))
        })?;

        let params = CreateIsolatedWorldParams::builder()
            .frame_id(frame_id)
            .world_name("vidprobe")
            .grant_univeral_access(true)
            .build()
            .map_err(ProbeError::Other)?;

        let response = page.execute(params).await?;
        Ok(response.result.execution_context_id.clone())
    }

    /// Evaluate an expression inside the frame, returning JSON (null for
    /// undefined). A thrown exception is an error.
    pub async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .context_id(self.context_id.clone())
            .return_by_value(true)
            .build()
            .map_err(ProbeError::Other)?;

        let response = self.page.execute(params).await?;
        let returns = &response.result;

        if let Some(details) = &returns.exception_details {
            return Err(ProbeError::Other(format!(
                "frame script threw: {}",
                details.text
            )));
        }

        Ok(returns
            .result
            .value
            .clone()
            .unwrap_or(serde_json::Value::Null))
    }

    /// Poll `expression` until it is truthy or `timeout` elapses. The
    /// description is only used for the error message.
    pub async fn wait_for_truthy(
        &self,
        expression: &str,
        timeout: Duration,
        what: &str,
    ) -> Result<serde_json::Value> {
        let deadline = Instant::now() + timeout;
        loop {
            let value = self.evaluate(expression).await?;
            let truthy = match &value {
                serde_json::Value::Null => false,
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::String(s) => !s.is_empty(),
                serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                _ => true,
            };
            if truthy {
                return Ok(value);
            }
            if Instant::now() >= deadline {
                return Err(ProbeError::ElementNotFound(format!(
                    "{} (waited {:?} in {})",
                    what, timeout, self.iframe_selector
                )));
            }
            tokio::time::sleep(POLL).await;
        }
    }
}
