//! Startup configuration
//!
//! Values come from, in increasing priority: built-in defaults, a TOML file
//! (explicit `--config` path or `<config dir>/padscope/config.toml`), and CLI
//! flags. Everything is fixed once the dashboard starts.

use crate::controller::event_source::SourceSettings;
use crate::controller::semantic::Profile;
use crate::dashboard::Layout;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "padscope";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Command line overrides
#[derive(Debug, Default, Parser)]
#[command(name = "padscope", version, about = "Live terminal dashboard for a gamepad")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Index of the gamepad to open (0 is the first one found)
    #[arg(short, long)]
    pub joystick: Option<usize>,

    #[arg(short, long, value_enum)]
    pub layout: Option<Layout>,

    /// Target refresh rate in Hz
    #[arg(short, long)]
    pub refresh_rate: Option<u32>,

    #[arg(long)]
    pub no_color: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct DashboardConfig {
    pub joystick_index: usize,
    pub num_axes: usize,
    pub num_buttons: usize,
    pub refresh_rate_hz: u32,
    pub layout: Layout,
    pub color: bool,
    pub quit_on_disconnect: bool,
    /// Extra buttons the backend reports as unknown, e.g. back grips
    pub native_buttons: Vec<NativeButton>,
    pub profile: Profile,
}

/// Raw button index for a native event code
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeButton {
    pub code: u32,
    pub index: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            joystick_index: 0,
            num_axes: 6,
            num_buttons: 20,
            refresh_rate_hz: 60,
            layout: Layout::Grouped,
            color: true,
            quit_on_disconnect: true,
            native_buttons: Vec::new(),
            profile: Profile::steam_deck(),
        }
    }
}

impl DashboardConfig {
    /// Resolves file and CLI values into a validated config
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|path| path.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_cli(cli);
        config.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading config from {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(index) = cli.joystick {
            self.joystick_index = index;
        }
        if let Some(layout) = cli.layout {
            self.layout = layout;
        }
        if let Some(rate) = cli.refresh_rate {
            self.refresh_rate_hz = rate;
        }
        if cli.no_color {
            self.color = false;
        }
    }

    /// Rejects values the loop cannot run with; profile/domain mismatches only warn
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_axes == 0 {
            return Err(ConfigError::Invalid("num_axes must be positive".to_string()));
        }
        if self.num_buttons == 0 {
            return Err(ConfigError::Invalid(
                "num_buttons must be positive".to_string(),
            ));
        }
        if self.refresh_rate_hz == 0 || self.refresh_rate_hz > 1000 {
            return Err(ConfigError::Invalid(format!(
                "refresh_rate_hz must be within 1..=1000, got {}",
                self.refresh_rate_hz
            )));
        }

        for problem in self.profile.check_domain(self.num_axes, self.num_buttons) {
            warn!("Profile {}: {}, value will always read 0", self.profile.name, problem);
        }
        Ok(())
    }

    pub fn frame_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.refresh_rate_hz.max(1)))
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            joystick_index: self.joystick_index,
            quit_on_disconnect: self.quit_on_disconnect,
            native_buttons: self
                .native_buttons
                .iter()
                .map(|button| (button.code, button.index))
                .collect(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|mut path| {
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_steam_deck() {
        let config = DashboardConfig::default();
        assert_eq!(config.num_axes, 6);
        assert_eq!(config.num_buttons, 20);
        assert_eq!(config.frame_period(), Duration::from_millis(16));
        assert_eq!(config.profile, Profile::steam_deck());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = DashboardConfig::from_toml(
            r#"
            num_buttons = 24
            layout = "raw"
            native_buttons = [{ code = 704, index = 16 }]
            "#,
        )
        .unwrap();

        assert_eq!(config.num_buttons, 24);
        assert_eq!(config.num_axes, 6);
        assert_eq!(config.layout, Layout::Raw);
        assert_eq!(
            config.native_buttons,
            vec![NativeButton {
                code: 704,
                index: 16
            }]
        );
        assert_eq!(config.profile.name, "Steam Deck");
    }

    #[test]
    fn unknown_layout_is_a_parse_error() {
        assert!(DashboardConfig::from_toml("layout = \"fancy\"").is_err());
    }

    #[test]
    fn zero_domains_are_rejected() {
        let config = DashboardConfig {
            num_axes: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = DashboardConfig {
            num_buttons: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = DashboardConfig {
            refresh_rate_hz: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn small_domain_only_warns() {
        let config = DashboardConfig {
            num_buttons: 10,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn cli_overrides_file_values() {
        let mut config = DashboardConfig::default();
        let cli = Cli::parse_from([
            "padscope",
            "--joystick",
            "1",
            "--layout",
            "raw",
            "-r",
            "30",
            "--no-color",
        ]);

        config.apply_cli(&cli);

        assert_eq!(config.joystick_index, 1);
        assert_eq!(config.layout, Layout::Raw);
        assert_eq!(config.refresh_rate_hz, 30);
        assert!(!config.color);
        assert_eq!(config.frame_period(), Duration::from_millis(33));
    }

    #[test]
    fn missing_explicit_file_is_a_read_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/nonexistent/padscope.toml")),
            ..Default::default()
        };
        assert!(matches!(
            DashboardConfig::load(&cli),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn source_settings_carry_device_options() {
        let mut config = DashboardConfig::default();
        config.joystick_index = 2;
        config.native_buttons.push(NativeButton {
            code: 705,
            index: 17,
        });

        let settings = config.source_settings();
        assert_eq!(settings.joystick_index, 2);
        assert!(settings.quit_on_disconnect);
        assert_eq!(settings.native_buttons.get(&705), Some(&17));
    }
}
