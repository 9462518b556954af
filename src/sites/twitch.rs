//! Twitch random-channel flow.
//!
//! Each iteration reloads the random-channel tools page, which embeds a new
//! channel's player in an iframe. The path to the stats table: dismiss the
//! audience-warning popup if one appears, then Settings → Advanced → check
//! "Video Stats", then read the overlay table rows.

use std::time::Duration;

use crate::browser::chrome::js_string;
use crate::browser::{ChromeDriver, FrameScope};
use crate::config::{DEFAULT_WAIT, SHORT_WAIT};
use crate::error::{ProbeError, Result};
use crate::sampler::{collect_samples, NoHook, SamplePlan, StatsSource};
use crate::session::{FailureReason, IterationOutcome, SubjectDriver};
use crate::telemetry::{StatsValue, TelemetryRecord};

const AUDIENCE_WARNING: &str = "Intended for certain audiences";
const STATS_ROWS_SELECTOR: &str =
    "tbody.tw-table-body tr[data-a-target='player-overlay-video-stats-row']";

#[derive(Debug, Clone)]
pub struct TwitchConfig {
    /// Page that embeds a random channel's player on every load.
    pub source_url: String,
    pub plan: SamplePlan,
    /// Upper bound on popup-dismissal attempts per iteration.
    pub max_dismissals: u32,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            source_url: "https://twitch-tools.rootonline.de/random_channel_previews.php"
                .to_string(),
            plan: SamplePlan::count(10),
            max_dismissals: 3,
        }
    }
}

pub struct TwitchDriver<'a> {
    chrome: &'a ChromeDriver,
    config: TwitchConfig,
}

impl<'a> TwitchDriver<'a> {
    pub fn new(chrome: &'a ChromeDriver, config: TwitchConfig) -> Self {
        Self { chrome, config }
    }

    async fn probe(&mut self, record: &mut TelemetryRecord) -> Result<()> {
        // Each load fetches a fresh random channel.
        self.chrome.navigate(&self.config.source_url).await?;

        self.chrome.wait_for_visible("iframe", DEFAULT_WAIT).await?;
        let page = self.chrome.page().await?;
        let mut frame = FrameScope::attach(&page, "iframe").await?;

        self.dismiss_interstitials(&mut frame).await?;

        if self
            .frame_truthy(&frame, &offline_gate_js(), Duration::from_millis(500))
            .await?
        {
            return Err(ProbeError::Skipped("channel is offline".to_string()));
        }

        self.enable_video_stats(&frame).await?;

        record.source_url = Some(self.chrome.current_url().await?);

        let mut source = TableSource { frame: &frame };
        record.samples = collect_samples(&mut source, &mut NoHook, &self.config.plan).await;

        // Leave the player as found; a failure here is not worth the record.
        if let Err(e) = frame.evaluate(&set_checkbox_js("Video Stats", false)).await {
            log::debug!("could not close the stats panel: {}", e);
        }

        Ok(())
    }

    /// Best-effort, idempotent popup dismissal. Absence is not an error;
    /// clicking may reload the embedded player, so the frame is re-acquired
    /// after each attempt.
    async fn dismiss_interstitials(&self, frame: &mut FrameScope) -> Result<()> {
        for attempt in 1..=self.config.max_dismissals {
            if !self
                .frame_truthy(frame, &button_visible_js(AUDIENCE_WARNING), SHORT_WAIT)
                .await?
            {
                return Ok(());
            }

            log::info!(
                "audience warning present, dismissing (attempt {}/{})",
                attempt,
                self.config.max_dismissals
            );

            frame
                .evaluate(&click_button_js(AUDIENCE_WARNING))
                .await
                .map_err(|e| ProbeError::InterstitialUnhandled(e.to_string()))?;

            tokio::time::sleep(Duration::from_secs(1)).await;
            frame
                .reattach()
                .await
                .map_err(|e| ProbeError::InterstitialUnhandled(e.to_string()))?;
        }

        if self
            .frame_truthy(frame, &button_visible_js(AUDIENCE_WARNING), Duration::from_millis(500))
            .await?
        {
            return Err(ProbeError::InterstitialUnhandled(format!(
                "'{}' still visible after {} attempts",
                AUDIENCE_WARNING, self.config.max_dismissals
            )));
        }

        Ok(())
    }

    async fn enable_video_stats(&self, frame: &FrameScope) -> Result<()> {
        frame
            .wait_for_truthy(&button_visible_js("Settings"), Duration::from_secs(10), "Settings button")
            .await?;
        frame.evaluate(&click_button_js("Settings")).await?;

        frame
            .wait_for_truthy(&menuitem_visible_js("Advanced"), SHORT_WAIT, "Advanced menu item")
            .await?;
        frame.evaluate(&click_menuitem_js("Advanced")).await?;

        frame
            .wait_for_truthy(&checkbox_present_js("Video Stats"), SHORT_WAIT, "Video Stats checkbox")
            .await?;
        frame.evaluate(&set_checkbox_js("Video Stats", true)).await?;

        // The overlay table is the panel; it must actually render rows.
        frame
            .wait_for_truthy(&rows_present_js(), Duration::from_secs(10), "video stats rows")
            .await
            .map_err(|e| ProbeError::PanelNeverVisible(e.to_string()))?;

        Ok(())
    }

    async fn frame_truthy(
        &self,
        frame: &FrameScope,
        expression: &str,
        timeout: Duration,
    ) -> Result<bool> {
        match frame.wait_for_truthy(expression, timeout, "probe").await {
            Ok(_) => Ok(true),
            Err(ProbeError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl SubjectDriver for TwitchDriver<'_> {
    async fn run_iteration(&mut self, iteration: usize) -> IterationOutcome {
        let mut record = TelemetryRecord::new(iteration);
        match self.probe(&mut record).await {
            Ok(()) => IterationOutcome::Completed(record),
            Err(e) => {
                let reason = FailureReason::from(&e);
                IterationOutcome::Failed {
                    reason,
                    partial: record.fail(e.to_string()),
                }
            }
        }
    }
}

struct TableSource<'f> {
    frame: &'f FrameScope,
}

impl StatsSource for TableSource<'_> {
    async fn read_stats(&mut self) -> Option<StatsValue> {
        let value = match self.frame.evaluate(&read_rows_js()).await {
            Ok(value) => value,
            Err(e) => {
                log::debug!("stats row read failed: {}", e);
                return None;
            }
        };
        let obj = value.as_object()?;
        if obj.is_empty() {
            return None;
        }
        let fields = obj
            .iter()
            .map(|(label, v)| (label.clone(), v.as_str().unwrap_or_default().to_string()))
            .collect();
        Some(StatsValue::Fields(fields))
    }
}

// The embedded player is cross-origin, so every lookup runs as script in the
// frame's isolated world. Controls are matched by accessible name the way the
// player labels them.

fn button_visible_js(label: &str) -> String {
    format!(
        "(() => {{ const needle = {label}; \
         const name = el => (el.getAttribute('aria-label') || el.textContent || '').trim(); \
         const btn = Array.from(document.querySelectorAll('button')).find(b => name(b).includes(needle)); \
         if (!btn) return false; \
         const r = btn.getBoundingClientRect(); \
         return r.width > 0 && r.height > 0; }})()",
        label = js_string(label)
    )
}

fn click_button_js(label: &str) -> String {
    format!(
        "(() => {{ const needle = {label}; \
         const name = el => (el.getAttribute('aria-label') || el.textContent || '').trim(); \
         const btn = Array.from(document.querySelectorAll('button')).find(b => name(b).includes(needle)); \
         if (!btn) return false; \
         btn.click(); \
         return true; }})()",
        label = js_string(label)
    )
}

fn menuitem_visible_js(label: &str) -> String {
    format!(
        "(() => {{ const needle = {label}; \
         const item = Array.from(document.querySelectorAll('[role=\"menuitem\"]'))\
             .find(el => (el.textContent || '').trim().includes(needle)); \
         return !!item; }})()",
        label = js_string(label)
    )
}

fn click_menuitem_js(label: &str) -> String {
    format!(
        "(() => {{ const needle = {label}; \
         const item = Array.from(document.querySelectorAll('[role=\"menuitem\"]'))\
             .find(el => (el.textContent || '').trim().includes(needle)); \
         if (!item) return false; \
         item.click(); \
         return true; }})()",
        label = js_string(label)
    )
}

fn checkbox_present_js(label: &str) -> String {
    format!(
        "(() => {{ const needle = {label}; \
         const boxes = Array.from(document.querySelectorAll('input[type=\"checkbox\"], [role=\"checkbox\"]')); \
         const name = el => (el.getAttribute('aria-label') || \
             (el.labels && el.labels[0] ? el.labels[0].textContent : '') || '').trim(); \
         return !!boxes.find(b => name(b).includes(needle)); }})()",
        label = js_string(label)
    )
}

fn set_checkbox_js(label: &str, checked: bool) -> String {
    format!(
        "(() => {{ const needle = {label}; \
         const boxes = Array.from(document.querySelectorAll('input[type=\"checkbox\"], [role=\"checkbox\"]')); \
         const name = el => (el.getAttribute('aria-label') || \
             (el.labels && el.labels[0] ? el.labels[0].textContent : '') || '').trim(); \
         const box = boxes.find(b => name(b).includes(needle)); \
         if (!box) return false; \
         const on = box.checked === true || box.getAttribute('aria-checked') === 'true'; \
         if (on !== {checked}) box.click(); \
         return true; }})()",
        label = js_string(label),
        checked = checked
    )
}

fn offline_gate_js() -> String {
    "(() => !!document.querySelector('[data-a-target=\"player-overlay-content-gate\"]'))()"
        .to_string()
}

fn rows_present_js() -> String {
    format!(
        "(() => document.querySelectorAll({sel}).length > 0)()",
        sel = js_string(STATS_ROWS_SELECTOR)
    )
}

fn read_rows_js() -> String {
    format!(
        "(() => {{ const rows = document.querySelectorAll({sel}); \
         if (!rows.length) return null; \
         const stats = {{}}; \
         for (const row of rows) {{ \
             const cells = row.querySelectorAll('td p'); \
             if (cells.length >= 2) stats[cells[0].textContent.trim()] = cells[1].textContent.trim(); \
         }} \
         return stats; }})()",
        sel = js_string(STATS_ROWS_SELECTOR)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_builders_quote_their_labels() {
        let js = click_button_js(AUDIENCE_WARNING);
        assert!(js.contains("\"Intended for certain audiences\""));
        let js = set_checkbox_js("Video Stats", true);
        assert!(js.contains("\"Video Stats\""));
        assert!(js.contains("!== true"));
    }

    #[test]
    fn default_config_targets_the_tools_page() {
        let config = TwitchConfig::default();
        assert!(config.source_url.contains("random_channel_previews"));
        assert!(config.max_dismissals > 0);
    }
}
