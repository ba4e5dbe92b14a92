//! Server settings: a JSON file, overridden by command-line flags.

use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use framegraph_core::scheduler::frame_period;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("frame_rate must be a positive finite number with a representable period, got {0}")]
    FrameRate(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address of the WebSocket control endpoint.
    pub listen: SocketAddr,
    /// Render ticks per second.
    pub frame_rate: f64,
    /// Graph document loaded at startup and written back on shutdown.
    pub graph_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 7351)),
            frame_rate: 50.0,
            graph_file: None,
        }
    }
}

/// Values given on the command line; `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<SocketAddr>,
    pub frame_rate: Option<f64>,
    pub graph_file: Option<PathBuf>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if given, apply `overrides`, and validate the result.
    pub fn resolve(path: Option<&Path>, overrides: Overrides) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };

        if let Some(listen) = overrides.listen {
            settings.listen = listen;
        }
        if let Some(frame_rate) = overrides.frame_rate {
            settings.frame_rate = frame_rate;
        }
        if overrides.graph_file.is_some() {
            settings.graph_file = overrides.graph_file;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        frame_period(self.frame_rate)
            .map(|_| ())
            .map_err(|_| SettingsError::FrameRate(self.frame_rate))
    }
}
