// config.rs — 可调参数与启动选项
//
// Tunables live in an optional JSON file:
// - CLI: --config <path>
// - Env: PANOTOUR_CONFIG
// Every field is optional; missing fields keep their defaults.
//
// Launch options:
// - --tour <path>   open a saved tour
// - --image <url>   open a single panorama (path, file:// or http(s)://)
// - --edit          start in authoring mode

use crate::error::ViewerError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine tunables. Defaults reproduce the behaviour of the web viewer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewerConfig {
    /// Radians of rotation per pixel of drag.
    pub drag_sensitivity: f64,
    /// Degrees of FOV per unit of wheel delta.
    pub zoom_speed: f64,
    pub default_fov: f64,
    pub min_fov: f64,
    pub max_fov: f64,
    /// Lower FOV bound used while authoring.
    pub edit_min_fov: f64,
    /// Press/release shorter than this (with no movement) is a tap.
    pub tap_threshold_ms: u64,
    /// Delay before the controls overlay comes back after a gesture.
    pub controls_reveal_ms: u64,
    pub sphere_radius: f64,
    /// Marker distance from the centre, as a fraction of `sphere_radius`.
    pub marker_radius_ratio: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            drag_sensitivity: 0.005,
            zoom_speed: 0.05,
            default_fov: 75.0,
            min_fov: 30.0,
            max_fov: 120.0,
            edit_min_fov: 10.0,
            tap_threshold_ms: 200,
            controls_reveal_ms: 600,
            sphere_radius: 500.0,
            marker_radius_ratio: 0.96,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let text = std::fs::read_to_string(path).map_err(|e| ViewerError::io(path, e))?;
        let config: ViewerConfig = serde_json::from_str(&text)?;
        Ok(config.sanitized())
    }

    /// Loads the file named by the launch options, falling back to defaults
    /// when none is given or the file is unreadable.
    pub fn resolve(options: &LaunchOptions) -> Self {
        let Some(path) = options.config.as_deref() else {
            return Self::default();
        };
        match Self::load(path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using default config");
                Self::default()
            }
        }
    }

    pub fn tap_threshold(&self) -> Duration {
        Duration::from_millis(self.tap_threshold_ms)
    }

    pub fn controls_reveal_delay(&self) -> Duration {
        Duration::from_millis(self.controls_reveal_ms)
    }

    /// Repairs values that would break the clamp invariants.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        self.drag_sensitivity = positive_or(self.drag_sensitivity, defaults.drag_sensitivity, "dragSensitivity");
        self.zoom_speed = positive_or(self.zoom_speed, defaults.zoom_speed, "zoomSpeed");
        self.sphere_radius = positive_or(self.sphere_radius, defaults.sphere_radius, "sphereRadius");
        if !(self.min_fov > 0.0 && self.min_fov < self.max_fov && self.max_fov < 180.0) {
            log::warn!(
                "invalid FOV range [{}, {}], using [{}, {}]",
                self.min_fov,
                self.max_fov,
                defaults.min_fov,
                defaults.max_fov
            );
            self.min_fov = defaults.min_fov;
            self.max_fov = defaults.max_fov;
        }
        if !self.edit_min_fov.is_finite() {
            self.edit_min_fov = defaults.edit_min_fov;
        }
        self.edit_min_fov = self.edit_min_fov.clamp(self.min_fov.min(1.0), self.min_fov);
        if !self.default_fov.is_finite() {
            self.default_fov = defaults.default_fov;
        }
        self.default_fov = self.default_fov.clamp(self.min_fov, self.max_fov);
        if !(self.marker_radius_ratio > 0.0 && self.marker_radius_ratio < 1.0) {
            self.marker_radius_ratio = defaults.marker_radius_ratio;
        }
        self
    }
}

fn positive_or(value: f64, default: f64, name: &str) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        log::warn!("invalid {name} {value}, using {default}");
        default
    }
}

/// What the host window should open with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaunchOptions {
    pub tour: Option<PathBuf>,
    pub image: Option<String>,
    pub edit: bool,
    pub config: Option<PathBuf>,
}

impl LaunchOptions {
    pub fn from_env() -> Self {
        let mut options = Self::parse(std::env::args().skip(1));
        if options.config.is_none() {
            if let Ok(v) = std::env::var("PANOTOUR_CONFIG") {
                if !v.trim().is_empty() {
                    options.config = Some(PathBuf::from(v));
                }
            }
        }
        options
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Self {
        let mut options = Self::default();
        let mut it = args.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "--tour" => options.tour = it.next().map(PathBuf::from),
                "--image" => options.image = it.next(),
                "--config" => options.config = it.next().map(PathBuf::from),
                "--edit" => options.edit = true,
                other => log::warn!("ignoring unknown argument {other}"),
            }
        }
        options
    }
}
