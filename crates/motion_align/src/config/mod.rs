//! Configuration management for motion alignment.
//!
//! This module provides:
//! - TOML-based configuration with `[alignment]`, `[decode]` and `[logging]` sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Defaults for any missing key
//!
//! # Example
//!
//! ```no_run
//! use motion_align::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/align.toml");
//! config.load_or_create().unwrap();
//!
//! let align = config.settings().alignment.to_align_config().unwrap();
//! println!("Searching ±{}s", align.max_lag_seconds);
//!
//! config.settings_mut().alignment.pose_frame_interval_ms = 50;
//! config.update_section(ConfigSection::Alignment).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{AlignmentSettings, ConfigSection, DecodeSettings, LoggingSettings, Settings};
