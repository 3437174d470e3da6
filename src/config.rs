use std::{fs, io, path::Path};

use ahash::AHashMap;
use anyhow::{anyhow, Context, Result};
use log::{error, info, warn};
use serde::Deserialize;

use crate::gesture::{Direction, Swipe};

/// Settings read from the JSON config file.
///
/// ```json
/// {
///   "threshold": 10.0,
///   "gestureActions": { "3swipe_up": "notify-send up" },
///   "debug": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Minimum average movement, in input units, for a touch to count as a
    /// swipe
    pub threshold: f64,
    /// Shell command to run for each gesture key
    pub gesture_actions: AHashMap<String, String>,
    /// Enables debug logging
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        let gesture_actions = [Direction::Left, Direction::Right, Direction::Up, Direction::Down]
            .into_iter()
            .map(|direction| {
                let swipe = Swipe {
                    fingers: 3,
                    direction,
                };
                let command = format!(
                    "echo '3-finger swipe {} action executed'",
                    direction.name()
                );
                (swipe.key(), command)
            })
            .collect();

        Self {
            threshold: 10.0,
            gesture_actions,
            debug: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
        Self::parse(&contents).with_context(|| format!("failed to parse {path:?}"))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config = serde_json::from_str(contents)?;
        Ok(config)
    }

    /// Takes the result of [`Config::load`] for `path`, falling back to the
    /// default config if the file was missing or couldn't be parsed.
    pub fn or_default(path: &Path, loaded: Result<Self>) -> Self {
        match loaded {
            Ok(config) => {
                info!("Loaded config from {path:?}");
                config
            }
            Err(err)
                if err
                    .downcast_ref::<io::Error>()
                    .is_some_and(|err| err.kind() == io::ErrorKind::NotFound) =>
            {
                warn!("Could not open config file {path:?}, using default configuration");
                Self::default()
            }
            Err(err) => {
                error!("{err:#}, using default configuration");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(anyhow!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            ));
        }

        for key in self.gesture_actions.keys() {
            if Swipe::parse_key(key).is_none() {
                warn!("Gesture {key:?} will never be triggered: expected a key like \"3swipe_up\"");
            }
        }
        Ok(())
    }
}
