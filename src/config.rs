use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::{data_dir, home_dir};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::{DEFAULT_DWELL, DEFAULT_FRAME_DELAY, PRODUCT_IDS, SCREEN_INTERFACE, VENDOR_ID};
use crate::display::DeviceFilter;
use crate::playback::PlaybackSettings;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional; accessors fill in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub device: Option<DeviceConfig>,
    pub playback: Option<PlaybackConfig>,
}

/// Which HID device to drive
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DeviceConfig {
    pub vendor_id: Option<u16>,
    pub product_ids: Option<Vec<u16>>,
    pub interface: Option<i32>,     // -1 accepts any
}

/// Initial playback parameters (read only, never written back)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PlaybackConfig {
    pub gif_path: Option<PathBuf>,
    pub cycle_folder: Option<PathBuf>,
    pub cycle: Option<bool>,
    pub invert: Option<bool>,
    pub frame_delay_ms: Option<u64>,
    pub dwell_secs: Option<u64>,
    pub start_on_launch: Option<bool>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "oled-gif", about = "Animated GIFs on a USB OLED panel", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// GIF to play in single file mode
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub gif: Option<PathBuf>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub cycle_folder: Option<PathBuf>,
    #[arg(long, action = ArgAction::Set)]
    pub cycle: Option<bool>,
    #[arg(long, action = ArgAction::Set)]
    pub invert: Option<bool>,
    #[arg(long)]
    pub frame_delay_ms: Option<u64>,
    #[arg(long)]
    pub dwell_secs: Option<u64>,
    /// HID interface of the screen, -1 for any
    #[arg(long, allow_negative_numbers = true)]
    pub interface: Option<i32>,
    /// wait for a console `start` instead of playing at launch
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_start: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn device_filter(&self) -> DeviceFilter {
        let device = self.device.clone().unwrap_or_default();
        DeviceFilter {
            vendor_id: device.vendor_id.unwrap_or(VENDOR_ID),
            product_ids: device.product_ids.unwrap_or_else(|| PRODUCT_IDS.to_vec()),
            interface: device.interface.unwrap_or(SCREEN_INTERFACE),
        }
    }

    pub fn playback_settings(&self) -> PlaybackSettings {
        let playback = self.playback();
        PlaybackSettings {
            frame_delay: playback.frame_delay_ms.map(Duration::from_millis).unwrap_or(DEFAULT_FRAME_DELAY),
            dwell: playback.dwell_secs.map(Duration::from_secs).unwrap_or(DEFAULT_DWELL),
            invert: playback.invert.unwrap_or(false),
        }
    }

    pub fn gif_path(&self) -> Option<PathBuf> {
        self.playback().gif_path
    }

    /// Folder scanned in cycle mode; `<data dir>/oled-gif/cycle` unless set.
    pub fn cycle_folder(&self) -> PathBuf {
        self.playback().cycle_folder.unwrap_or_else(default_cycle_folder)
    }

    pub fn cycle_enabled(&self) -> bool {
        self.playback().cycle.unwrap_or(false)
    }

    pub fn start_on_launch(&self) -> bool {
        self.playback().start_on_launch.unwrap_or(true)
    }

    fn playback(&self) -> PlaybackConfig {
        self.playback.clone().unwrap_or_default()
    }
}

fn default_cycle_folder() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("oled-gif")
        .join("cycle")
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layer defaults, YAML and `cli`, then validate.
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/oled-gif/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/oled-gif/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/oled-gif.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["oled-gif.yaml", "config/oled-gif.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    // top-level
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    // device
    match (&mut dst.device, src.device) {
        (None, Some(c)) => dst.device = Some(c),
        (Some(d), Some(s)) => merge_device(d, s),
        _ => {}
    }
    // playback
    match (&mut dst.playback, src.playback) {
        (None, Some(c)) => dst.playback = Some(c),
        (Some(d), Some(s)) => merge_playback(d, s),
        _ => {}
    }
}

fn merge_device(dst: &mut DeviceConfig, src: DeviceConfig) {
    if src.vendor_id.is_some()     { dst.vendor_id = src.vendor_id; }
    if src.product_ids.is_some()   { dst.product_ids = src.product_ids; }
    if src.interface.is_some()     { dst.interface = src.interface; }
}

fn merge_playback(dst: &mut PlaybackConfig, src: PlaybackConfig) {
    if src.gif_path.is_some()        { dst.gif_path = src.gif_path; }
    if src.cycle_folder.is_some()    { dst.cycle_folder = src.cycle_folder; }
    if src.cycle.is_some()           { dst.cycle = src.cycle; }
    if src.invert.is_some()          { dst.invert = src.invert; }
    if src.frame_delay_ms.is_some()  { dst.frame_delay_ms = src.frame_delay_ms; }
    if src.dwell_secs.is_some()      { dst.dwell_secs = src.dwell_secs; }
    if src.start_on_launch.is_some() { dst.start_on_launch = src.start_on_launch; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()       { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                     { cfg.log_level = Some("debug".into()); }

    if let Some(interface) = cli.interface {
        cfg.device.get_or_insert_with(DeviceConfig::default).interface = Some(interface);
    }

    let any_playback = cli.gif.is_some()
        || cli.cycle_folder.is_some()
        || cli.cycle.is_some()
        || cli.invert.is_some()
        || cli.frame_delay_ms.is_some()
        || cli.dwell_secs.is_some()
        || cli.no_start;

    if any_playback && cfg.playback.is_none() {
        cfg.playback = Some(PlaybackConfig::default());
    }
    if let Some(playback) = cfg.playback.as_mut() {
        if cli.gif.is_some()             { playback.gif_path = cli.gif.clone(); }
        if cli.cycle_folder.is_some()    { playback.cycle_folder = cli.cycle_folder.clone(); }
        if cli.cycle.is_some()           { playback.cycle = cli.cycle; }
        if cli.invert.is_some()          { playback.invert = cli.invert; }
        if cli.frame_delay_ms.is_some()  { playback.frame_delay_ms = cli.frame_delay_ms; }
        if cli.dwell_secs.is_some()      { playback.dwell_secs = cli.dwell_secs; }
        if cli.no_start                  { playback.start_on_launch = Some(false); }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(device) = cfg.device.as_ref() {
        if device.product_ids.as_ref().is_some_and(|ids| ids.is_empty()) {
            return Err(ConfigError::Validation("device product_ids must not be empty".into()));
        }
        if let Some(iface) = device.interface {
            if iface < -1 {
                return Err(ConfigError::Validation("device interface must be >= 0, or -1 for any".into()));
            }
        }
    }
    if let Some(playback) = cfg.playback.as_ref() {
        if playback.frame_delay_ms == Some(0) {
            return Err(ConfigError::Validation("playback frame_delay_ms must be > 0".into()));
        }
        if playback.dwell_secs == Some(0) {
            return Err(ConfigError::Validation("playback dwell_secs must be > 0".into()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(yaml: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oled-gif.yaml");
        fs::write(&path, yaml).unwrap();
        (dir, path)
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("oled-gif").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.device_filter(), DeviceFilter::default());
        assert_eq!(cfg.playback_settings(), PlaybackSettings::default());
        assert!(cfg.start_on_launch());
        assert!(!cfg.cycle_enabled());
        assert!(cfg.cycle_folder().ends_with("oled-gif/cycle"));
        assert_eq!(cfg.gif_path(), None);
    }

    #[test]
    fn test_yaml_then_cli() {
        let (_dir, path) = write_config(
            "log_level: warn\n\
             device:\n  vendor_id: 0x1038\n  product_ids: [0x12e0]\n  interface: -1\n\
             playback:\n  gif_path: /tmp/a.gif\n  invert: true\n  frame_delay_ms: 40\n",
        );
        let path = path.to_string_lossy().into_owned();
        let cfg = resolve(&cli(&["--config", &path, "--frame-delay-ms", "25", "--debug"])).unwrap();

        assert_eq!(cfg.log_level(), "debug");
        let filter = cfg.device_filter();
        assert_eq!(filter.product_ids, vec![0x12e0]);
        assert_eq!(filter.interface, -1);

        let settings = cfg.playback_settings();
        assert_eq!(settings.frame_delay, Duration::from_millis(25));
        assert!(settings.invert);
        assert_eq!(cfg.gif_path(), Some(PathBuf::from("/tmp/a.gif")));
    }

    #[test]
    fn test_cycle_mode_uses_folder() {
        let cfg = resolve(&cli(&[
            "--config", "/nonexistent/never.yaml",
        ]));
        assert!(matches!(cfg, Err(ConfigError::Validation(_))));

        let (_dir, path) = write_config("playback:\n  cycle: true\n  cycle_folder: /srv/gifs\n");
        let path = path.to_string_lossy().into_owned();
        let cfg = resolve(&cli(&["--config", &path, "--gif", "x.gif", "--no-start"])).unwrap();
        assert!(cfg.cycle_enabled());
        assert_eq!(cfg.cycle_folder(), PathBuf::from("/srv/gifs"));
        assert_eq!(cfg.gif_path(), Some(PathBuf::from("x.gif")));
        assert!(!cfg.start_on_launch());
    }

    #[test]
    fn test_validation() {
        let (_dir, path) = write_config("device:\n  product_ids: []\n");
        let path = path.to_string_lossy().into_owned();
        assert!(matches!(resolve(&cli(&["--config", &path])), Err(ConfigError::Validation(_))));

        let (_dir, path) = write_config("playback:\n  dwell_secs: 5\n");
        let path = path.to_string_lossy().into_owned();
        assert!(matches!(
            resolve(&cli(&["--config", &path, "--frame-delay-ms", "0"])),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_bad_yaml() {
        let (_dir, path) = write_config("playback: [not, a, map\n");
        let path = path.to_string_lossy().into_owned();
        assert!(matches!(resolve(&cli(&["--config", &path])), Err(ConfigError::Yaml(_))));
    }
}
