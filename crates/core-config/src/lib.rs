//! Configuration loading and parsing.
//!
//! Parses `anchorline.toml` (or an override path provided by the binary)
//! into raw tuning values, then folds them over [`NavTuning::default`] and
//! clamps the result into workable ranges. The raw parsed file is retained
//! alongside the effective tuning so later reloads can re-derive without
//! re-reading disk. Unknown fields are ignored (TOML deserialization
//! tolerance) to allow forward evolution without immediate warnings; a
//! malformed file falls back to defaults rather than aborting startup.

use anyhow::Result;
use core_highlight::FadePlan;
use core_navigate::NavTuning;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct NavigationConfig {
    /// Fractional distance of the anchor's top from the viewport top after
    /// a corrective scroll, in `[0, 1]`.
    pub top_margin_fraction: Option<f64>,
    /// Fraction of the viewport height forming the acceptable resting zone.
    pub optimal_zone_fraction: Option<f64>,
    /// Milliseconds to wait for a header-collapse animation before running
    /// a navigation requested while scrolled to the top.
    pub header_defer_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct SchedulerConfig {
    pub base_interval_ms: Option<u64>,
    pub base_ticks: Option<u32>,
    pub escalated_interval_ms: Option<u64>,
    pub escalated_ticks: Option<u32>,
    /// Container-extent delta (content units) treated as a major layout
    /// change.
    pub reposition_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct HighlightConfig {
    pub hold_ms: Option<u64>,
    pub fade_ms: Option<u64>,
    pub fade_steps: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub navigation: NavigationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub highlight: HighlightConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Original file string, when one was read.
    pub raw: Option<String>,
    /// Parsed (or default) data.
    pub file: ConfigFile,
    /// Defaults overlaid with the file's values, clamped.
    pub effective: NavTuning,
}

/// Best-effort config path following platform conventions (XDG / AppData
/// Roaming). A local `anchorline.toml` in the working directory wins.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("anchorline.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("anchorline").join("anchorline.toml");
    }
    PathBuf::from("anchorline.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    if let Ok(content) = fs::read_to_string(&path) {
        match toml::from_str::<ConfigFile>(&content) {
            Ok(file) => {
                let effective = file.to_tuning();
                info!(target: "config", path = %path.display(), "config_loaded");
                Ok(Config {
                    raw: Some(content),
                    file,
                    effective,
                })
            }
            Err(err) => {
                // Fall back to defaults rather than refusing to start.
                warn!(target: "config", path = %path.display(), %err, "config_parse_failed");
                Ok(Config::default())
            }
        }
    } else {
        Ok(Config::default())
    }
}

impl ConfigFile {
    /// Overlay this file's values on the default tuning and clamp.
    pub fn to_tuning(&self) -> NavTuning {
        let d = NavTuning::default();
        let fade_default = FadePlan::default();
        NavTuning {
            top_margin_fraction: self
                .navigation
                .top_margin_fraction
                .unwrap_or(d.top_margin_fraction),
            optimal_zone_fraction: self
                .navigation
                .optimal_zone_fraction
                .unwrap_or(d.optimal_zone_fraction),
            header_defer: self
                .navigation
                .header_defer_ms
                .map(Duration::from_millis)
                .unwrap_or(d.header_defer),
            base_interval: self
                .scheduler
                .base_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(d.base_interval),
            base_ticks: self.scheduler.base_ticks.unwrap_or(d.base_ticks),
            escalated_interval: self
                .scheduler
                .escalated_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(d.escalated_interval),
            escalated_ticks: self.scheduler.escalated_ticks.unwrap_or(d.escalated_ticks),
            reposition_threshold: self
                .scheduler
                .reposition_threshold
                .unwrap_or(d.reposition_threshold),
            fade: FadePlan {
                hold: self
                    .highlight
                    .hold_ms
                    .map(Duration::from_millis)
                    .unwrap_or(fade_default.hold),
                fade: self
                    .highlight
                    .fade_ms
                    .map(Duration::from_millis)
                    .unwrap_or(fade_default.fade),
                steps: self.highlight.fade_steps.unwrap_or(fade_default.steps),
            },
        }
        .clamped()
    }
}
