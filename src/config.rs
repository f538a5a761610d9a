use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::frequency::FrequencyTable;
use crate::mapper::{ScaleLayout, Schedule, VoiceBankConfig};
use crate::scale::{ROOT_COUNT, ScaleTable};

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("board must be at least 1x1, got {rows}x{cols}")]
    EmptyBoard { rows: usize, cols: usize },
    #[error("random density {0} outside [0, 1]")]
    Density(f64),
    #[error("tick interval must be positive")]
    TickInterval,
    #[error("schedule period `{0}` must be positive")]
    Period(&'static str),
    #[error("key candidate {0} outside 0..12")]
    KeyCandidate(usize),
    #[error("initial root {0} outside 0..12")]
    InitialRoot(usize),
    #[error("no key candidates configured")]
    NoKeyCandidates,
    #[error("{slice} scale slice leaves no notes at root {root}")]
    EmptyScale { slice: &'static str, root: usize },
    #[error("age domain [{0}, {1}] is empty")]
    AgeDomain(f32, f32),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardConfig {
    #[serde(default = "BoardConfig::default_rows")]
    pub rows: usize,
    #[serde(default = "BoardConfig::default_cols")]
    pub cols: usize,
    #[serde(default = "BoardConfig::default_density")]
    pub density: f64,
}

impl BoardConfig {
    fn default_rows() -> usize {
        30
    }
    fn default_cols() -> usize {
        80
    }
    fn default_density() -> f64 {
        0.37
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: Self::default_rows(),
            cols: Self::default_cols(),
            density: Self::default_density(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "SimulationConfig::default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "SimulationConfig::default_start_running")]
    pub start_running: bool,
}

impl SimulationConfig {
    fn default_tick_ms() -> u64 {
        50
    }
    fn default_start_running() -> bool {
        true
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_ms: Self::default_tick_ms(),
            start_running: Self::default_start_running(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_master_volume")]
    pub master_volume: f32,
}

impl AudioConfig {
    fn default_master_volume() -> f32 {
        1.0
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            master_volume: Self::default_master_volume(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub board: BoardConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub schedule: Schedule,
    #[serde(default)]
    pub scales: ScaleLayout,
    #[serde(default)]
    pub voices: VoiceBankConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board.rows == 0 || self.board.cols == 0 {
            return Err(ConfigError::EmptyBoard {
                rows: self.board.rows,
                cols: self.board.cols,
            });
        }
        if !(0.0..=1.0).contains(&self.board.density) {
            return Err(ConfigError::Density(self.board.density));
        }
        if self.simulation.tick_ms == 0 {
            return Err(ConfigError::TickInterval);
        }
        let schedule = &self.schedule;
        for (name, period) in [
            ("key_change", schedule.key_change),
            ("column", schedule.column),
            ("brightest", schedule.brightest),
            ("bass", schedule.bass),
            ("age", schedule.age),
            ("drum", schedule.drum),
        ] {
            if period == 0 {
                return Err(ConfigError::Period(name));
            }
        }
        if schedule.initial_root >= ROOT_COUNT {
            return Err(ConfigError::InitialRoot(schedule.initial_root));
        }
        if schedule.key_candidates.is_empty() {
            return Err(ConfigError::NoKeyCandidates);
        }
        if let Some(bad) = schedule
            .key_candidates
            .iter()
            .find(|root| **root >= ROOT_COUNT)
        {
            return Err(ConfigError::KeyCandidate(*bad));
        }
        let [lo, hi] = schedule.age_domain;
        if hi <= lo {
            return Err(ConfigError::AgeDomain(lo, hi));
        }
        let table = ScaleTable::build(&FrequencyTable::default());
        let roots = std::iter::once(&schedule.initial_root).chain(&schedule.key_candidates);
        for root in roots {
            for (slice, layout) in [
                ("column", &self.scales.column),
                ("bass", &self.scales.bass),
                ("age", &self.scales.age),
            ] {
                if !layout.fits(&table, *root) {
                    return Err(ConfigError::EmptyScale { slice, root: *root });
                }
            }
        }
        Ok(())
    }

    /// Reads `path`, falling back to defaults when it is missing or broken.
    /// A missing file is created as a commented-out template.
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            let loaded = fs::read_to_string(path_obj)
                .map_err(|err| err.to_string())
                .and_then(|contents| {
                    toml::from_str::<AppConfig>(&contents).map_err(|err| err.to_string())
                });
            return match loaded {
                Ok(cfg) => match cfg.validate() {
                    Ok(()) => cfg,
                    Err(err) => {
                        warn!("Invalid config {path}: {err}. Using defaults.");
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!("Failed to load config {path}: {err}. Using defaults.");
                    Self::default()
                }
            };
        }

        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                if let Err(err) = fs::write(path_obj, comment_out(&text)) {
                    warn!("Failed to write default config to {path}: {err}");
                } else {
                    info!("Wrote default config template to {path}");
                }
            }
            Err(err) => warn!("Failed to serialize default config: {err}"),
        }
        default_cfg
    }
}

// Top-level headers stay live so uncommenting a single value is enough.
// Nested headers are commented with their keys: an empty nested table would
// not deserialize.
fn comment_out(text: &str) -> String {
    let mut commented = String::new();
    for line in text.lines() {
        let trimmed = line.trim();
        let top_level_header =
            trimmed.starts_with('[') && trimmed.ends_with(']') && !trimmed.contains('.');
        if trimmed.is_empty() || top_level_header {
            commented.push_str(line);
        } else {
            commented.push_str("# ");
            commented.push_str(line);
        }
        commented.push('\n');
    }
    commented
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::{DecayPolicy, Waveform};

    fn unique_path(name: &str) -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "life_synth_config_test_{}_{}",
            name,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        p
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(cfg.board.rows, 30);
        assert_eq!(cfg.board.cols, 80);
        assert_eq!(cfg.simulation.tick_ms, 50);
        assert_eq!(cfg.schedule.key_change, 192);
        assert_eq!(cfg.voices.drum.decay, DecayPolicy::ActivityScaled(0.001));
    }

    #[test]
    fn load_or_default_writes_commented_template() {
        let path = unique_path("defaults.toml");
        let path_str = path.to_string_lossy().to_string();
        let _ = fs::remove_file(&path);

        let cfg = AppConfig::load_or_default(&path_str);
        assert_eq!(cfg, AppConfig::default());
        let contents = fs::read_to_string(&path).expect("read written config");
        assert!(contents.contains("[board]"));
        assert!(contents.contains("# rows = 30"));
        assert!(contents.contains("# tick_ms = 50"));

        // The template parses back to the defaults.
        let reloaded = AppConfig::load_or_default(&path_str);
        assert_eq!(reloaded, AppConfig::default());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_or_default_reads_partial_file() {
        let path = unique_path("custom.toml");
        let path_str = path.to_string_lossy().to_string();
        fs::write(
            &path,
            "[board]\nrows = 10\ncols = 12\n\n[schedule]\nkey_change = 64\n\n\
             [voices.bass]\nwaveform = \"triangle\"\nrepeat = true\ninitial_gain = 0.1\n\
             mod_depth = 0.0\nmod_rate = 4.0\nrise_time = 0.02\n\
             decay = { mode = \"fixed\", value = 0.25 }\n",
        )
        .unwrap();

        let cfg = AppConfig::load_or_default(&path_str);
        assert_eq!(cfg.board.rows, 10);
        assert_eq!(cfg.board.cols, 12);
        assert_eq!(cfg.board.density, 0.37);
        assert_eq!(cfg.schedule.key_change, 64);
        assert_eq!(cfg.schedule.bass, 8);
        assert_eq!(cfg.voices.bass.waveform, Waveform::Triangle);
        assert_eq!(cfg.voices.bass.decay, DecayPolicy::Fixed(0.25));
        assert_eq!(cfg.voices.age, VoiceBankConfig::default().age);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let path = unique_path("broken.toml");
        let path_str = path.to_string_lossy().to_string();
        fs::write(&path, "[board]\nrows = 0\n").unwrap();
        assert_eq!(AppConfig::load_or_default(&path_str), AppConfig::default());
        fs::write(&path, "this is not toml ===").unwrap();
        assert_eq!(AppConfig::load_or_default(&path_str), AppConfig::default());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn validation_errors() {
        let mut cfg = AppConfig::default();
        cfg.board.density = 1.5;
        assert_eq!(cfg.validate(), Err(ConfigError::Density(1.5)));

        let mut cfg = AppConfig::default();
        cfg.schedule.drum = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::Period("drum")));

        let mut cfg = AppConfig::default();
        cfg.schedule.key_candidates = vec![0, 12];
        assert_eq!(cfg.validate(), Err(ConfigError::KeyCandidate(12)));

        let mut cfg = AppConfig::default();
        cfg.simulation.tick_ms = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::TickInterval));

        let mut cfg = AppConfig::default();
        cfg.schedule.age_domain = [3.0, 1.0];
        assert_eq!(cfg.validate(), Err(ConfigError::AgeDomain(3.0, 1.0)));

        let mut cfg = AppConfig::default();
        cfg.schedule.initial_root = 12;
        assert_eq!(cfg.validate(), Err(ConfigError::InitialRoot(12)));

        let mut cfg = AppConfig::default();
        cfg.scales.bass.skip_low = 60;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::EmptyScale {
                slice: "bass",
                root: 0
            })
        );
    }
}
