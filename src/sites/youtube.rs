//! YouTube search-and-watch flow.
//!
//! Each iteration searches a random word, opens the first result, skips ad
//! chrome if present, opens the "Stats for nerds" panel through the player's
//! context menu, and samples the panel text while injecting occasional fake
//! user actions.

use std::time::{Duration, Instant};

use chromiumoxide::cdp::browser_protocol::input::MouseButton;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::actions::{ActionPolicy, PlayerAction};
use crate::browser::ChromeDriver;
use crate::config::{DEFAULT_WAIT, SHORT_WAIT};
use crate::error::{ProbeError, Result};
use crate::sampler::{collect_samples, SampleBudget, SamplePlan, StatsSource, TickHook};
use crate::session::{FailureReason, IterationOutcome, SubjectDriver};
use crate::telemetry::{StatsValue, TelemetryRecord};

const PANEL_SELECTOR: &str = ".html5-video-info-panel";

#[derive(Debug, Clone)]
pub struct YoutubeConfig {
    pub base_url: String,
    /// Search queries; one is drawn per iteration.
    pub wordlist: Vec<String>,
    /// Fixed sampling plan; `None` picks a randomized watch time per video.
    pub plan: Option<SamplePlan>,
    pub actions: ActionPolicy,
    /// Bounds for the randomized watch time.
    pub min_watch_secs: f64,
    pub max_watch_secs: f64,
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.youtube.com".to_string(),
            wordlist: crate::wordlist::default_words(),
            plan: None,
            actions: ActionPolicy::default(),
            min_watch_secs: 5.0,
            max_watch_secs: 120.0,
        }
    }
}

pub struct YoutubeDriver<'a> {
    chrome: &'a ChromeDriver,
    config: YoutubeConfig,
    rng: StdRng,
}

impl<'a> YoutubeDriver<'a> {
    pub fn new(chrome: &'a ChromeDriver, config: YoutubeConfig) -> Self {
        Self {
            chrome,
            config,
            rng: StdRng::from_entropy(),
        }
    }

    async fn probe(&mut self, record: &mut TelemetryRecord) -> Result<()> {
        if self.config.wordlist.is_empty() {
            return Err(ProbeError::InvalidInput("empty word list".to_string()));
        }
        let query = self.config.wordlist[self.rng.gen_range(0..self.config.wordlist.len())].clone();
        record.query = Some(query.clone());

        log::info!("searching for '{}'", query);
        self.chrome
            .navigate(&format!(
                "{}/results?search_query={}",
                self.config.base_url, query
            ))
            .await?;

        let href = self
            .wait_for_string(&first_result_js(), SHORT_WAIT)
            .await
            .ok_or_else(|| ProbeError::Skipped(format!("no search results for '{}'", query)))?;

        if !href.starts_with("/watch?v=") {
            return Err(ProbeError::Skipped(format!(
                "first result for '{}' is not a video: {}",
                query, href
            )));
        }

        let video_url = format!("{}{}", self.config.base_url, href);
        log::info!("opening {}", video_url);
        self.chrome.navigate(&video_url).await?;
        record.source_url = Some(video_url);

        self.skip_ad_if_present().await;

        self.chrome.wait_for_selector("video", DEFAULT_WAIT).await?;
        self.chrome
            .wait_for_visible("#movie_player", DEFAULT_WAIT)
            .await?;

        let duration = self
            .chrome
            .evaluate(&video_duration_js())
            .await?
            .as_f64()
            .unwrap_or(f64::NAN);
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ProbeError::Skipped(format!(
                "no valid duration for '{}'",
                query
            )));
        }
        record.duration_secs = Some(duration);

        let plan = match self.config.plan {
            Some(plan) => plan,
            None => {
                let ceiling = (duration * 0.9).min(self.config.max_watch_secs);
                let watch = if ceiling > self.config.min_watch_secs {
                    self.rng.gen_range(self.config.min_watch_secs..ceiling)
                } else {
                    self.config.min_watch_secs
                };
                SamplePlan::duration(Duration::from_secs_f64(watch))
            }
        };
        if let SampleBudget::Duration(watch) = plan.budget {
            record.watched_secs = Some(watch.as_secs_f64());
        }

        // The original keeps watching without the panel, so its absence only
        // degrades the samples to unavailable markers.
        if let Err(e) = self.open_stats_panel().await {
            log::warn!("could not open 'Stats for nerds': {}", e);
        }

        let mut source = PanelSource {
            chrome: self.chrome,
        };
        let mut hook = ActionHook {
            chrome: self.chrome,
            policy: self.config.actions,
            rng: &mut self.rng,
        };
        record.samples = collect_samples(&mut source, &mut hook, &plan).await;

        self.resume_if_paused().await;

        Ok(())
    }

    /// Best-effort ad handling; absence of an ad is the normal case.
    async fn skip_ad_if_present(&self) {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let visible = self
            .chrome
            .is_visible("button.ytp-ad-skip-button")
            .await
            .unwrap_or(false);
        if visible {
            if self.chrome.click("button.ytp-ad-skip-button").await.is_ok() {
                log::info!("skipped ad");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            return;
        }

        match self.chrome.evaluate(&click_skip_text_js()).await {
            Ok(v) if v.as_bool() == Some(true) => {
                log::info!("skipped ad via text match");
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
            Ok(_) => log::debug!("no skippable ad found"),
            Err(e) => log::debug!("ad check failed: {}", e),
        }
    }

    /// Right-click the player center and pick "Stats for nerds" from the
    /// context menu.
    async fn open_stats_panel(&self) -> Result<()> {
        let center = self.chrome.evaluate(&player_center_js()).await?;
        let (x, y) = match (
            center.get("x").and_then(|v| v.as_f64()),
            center.get("y").and_then(|v| v.as_f64()),
        ) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(ProbeError::ElementNotFound(
                    "#movie_player bounding box".to_string(),
                ))
            }
        };

        self.chrome.click_at(x, y, MouseButton::Right).await?;
        tokio::time::sleep(Duration::from_secs(1)).await;

        let clicked = self.chrome.evaluate(&click_stats_menu_js()).await?;
        if clicked.as_bool() != Some(true) {
            return Err(ProbeError::ElementNotFound(
                "'Stats for nerds' context-menu entry".to_string(),
            ));
        }

        self.chrome
            .wait_for_visible(PANEL_SELECTOR, SHORT_WAIT)
            .await
            .map_err(|e| ProbeError::PanelNeverVisible(e.to_string()))?;

        log::info!("'Stats for nerds' panel open");
        Ok(())
    }

    async fn resume_if_paused(&self) {
        match self.chrome.evaluate(&video_paused_js()).await {
            Ok(v) if v.as_bool() == Some(true) => {
                if self.chrome.press_key("k").await.is_ok() {
                    log::info!("resumed playback");
                }
            }
            Ok(_) => {}
            Err(e) => log::debug!("could not check paused state: {}", e),
        }
    }

    /// Poll an expression until it yields a non-empty string.
    async fn wait_for_string(&self, expression: &str, timeout: Duration) -> Option<String> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.chrome.evaluate(expression).await {
                Ok(serde_json::Value::String(s)) if !s.is_empty() => return Some(s),
                Ok(_) => {}
                Err(e) => log::debug!("poll failed: {}", e),
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }
}

impl SubjectDriver for YoutubeDriver<'_> {
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

struct PanelSource<'a> {
    chrome: &'a ChromeDriver,
}

impl StatsSource for PanelSource<'_> {
    async fn read_stats(&mut self) -> Option<StatsValue> {
        let value = match self.chrome.evaluate(&panel_text_js()).await {
            Ok(value) => value,
            Err(e) => {
                log::debug!("panel read failed: {}", e);
                return None;
            }
        };
        match value {
            serde_json::Value::String(text) if !text.is_empty() => Some(StatsValue::Text(text)),
            _ => None,
        }
    }
}

/// Performs at most one weighted fake user action per sampling tick. A player
/// that is not currently clickable skips the action; the tick still samples.
struct ActionHook<'a> {
    chrome: &'a ChromeDriver,
    policy: ActionPolicy,
    rng: &'a mut StdRng,
}

impl TickHook for ActionHook<'_> {
    async fn before_sample(&mut self, tick: u32) {
        if !self.policy.should_act(self.rng) {
            return;
        }

        if self.chrome.click("#movie_player").await.is_err() {
            log::warn!("player not clickable, skipping action on tick {}", tick);
            return;
        }

        let action = PlayerAction::choose(self.rng);
        let presses = action.presses(self.rng);
        for _ in 0..presses {
            if let Err(e) = self.chrome.press_key(action.key()).await {
                log::warn!("key dispatch failed, abandoning action: {}", e);
                return;
            }
        }
        log::info!("injected {:?} x{}", action, presses);

        let pause = self.rng.gen_range(0.5..1.5);
        tokio::time::sleep(Duration::from_secs_f64(pause)).await;
    }
}

fn first_result_js() -> String {
    "(() => { const a = document.querySelector('a#video-title'); \
     return a ? (a.getAttribute('href') || '') : ''; })()"
        .to_string()
}

fn video_duration_js() -> String {
    "(() => { const v = document.querySelector('video'); \
     return v && isFinite(v.duration) ? v.duration : null; })()"
        .to_string()
}

fn video_paused_js() -> String {
    "(() => { const v = document.querySelector('video'); \
     return v ? v.paused : null; })()"
        .to_string()
}

fn player_center_js() -> String {
    "(() => { const p = document.querySelector('#movie_player'); \
     if (!p) return null; \
     const r = p.getBoundingClientRect(); \
     return { x: r.x + r.width / 2, y: r.y + r.height / 2 }; })()"
        .to_string()
}

fn click_stats_menu_js() -> String {
    "(() => { const items = Array.from(document.querySelectorAll('.ytp-menuitem, .ytp-contextmenu .ytp-menuitem-label')); \
     const item = items.find(el => (el.textContent || '').includes('Stats for nerds')); \
     if (!item) return false; \
     item.click(); \
     return true; })()"
        .to_string()
}

fn click_skip_text_js() -> String {
    "(() => { const els = Array.from(document.querySelectorAll('button, span, div')); \
     const el = els.find(e => (e.textContent || '').trim() === 'Skip Ad'); \
     if (!el) return false; \
     el.click(); \
     return true; })()"
        .to_string()
}

fn panel_text_js() -> String {
    format!(
        "(() => {{ const p = document.querySelector({sel}); \
         if (!p) return null; \
         const t = (p.innerText || '').trim(); \
         return t || null; }})()",
        sel = crate::browser::chrome::js_string(PANEL_SELECTOR)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_watch_bounds() {
        let config = YoutubeConfig::default();
        assert!(config.min_watch_secs < config.max_watch_secs);
        assert!(!config.wordlist.is_empty());
        assert!(config.plan.is_none());
    }

    #[test]
    fn menu_js_targets_stats_for_nerds() {
        assert!(click_stats_menu_js().contains("Stats for nerds"));
        assert!(panel_text_js().contains(".html5-video-info-panel"));
    }
}
