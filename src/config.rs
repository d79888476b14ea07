use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mapbox::MapboxStatic;
use crate::models::Split;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_DELAY: Duration = Duration::from_millis(150);

/// Everything the run needs: the Mapbox parameters, the data layout, and
/// the fixed pacing constants. Passed into each component explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub mapbox: MapboxStatic,
    pub train_csv: PathBuf,
    pub test_csv: PathBuf,
    pub image_dir: PathBuf,
    pub log_file: PathBuf,
    pub request_timeout: Duration,
    pub request_delay: Duration,
}

impl Config {
    /// Reads configuration from the environment. `MAPBOX_TOKEN` is required;
    /// `DATA_DIR` defaults to `data`.
    pub fn from_env() -> Result<Self> {
        let token = env::var("MAPBOX_TOKEN").context("MAPBOX_TOKEN must be set")?;
        let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
        Ok(Self::new(token, data_dir))
    }

    pub fn new(token: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            mapbox: MapboxStatic::new(token),
            train_csv: data_dir.join("train.csv"),
            test_csv: data_dir.join("test.csv"),
            image_dir: data_dir.join("images"),
            log_file: data_dir.join("logs").join("image_download_log.csv"),
            request_timeout: REQUEST_TIMEOUT,
            request_delay: REQUEST_DELAY,
        }
    }

    pub fn source_csv(&self, split: Split) -> &Path {
        match split {
            Split::Train => &self.train_csv,
            Split::Test => &self.test_csv,
        }
    }

    pub fn split_image_dir(&self, split: Split) -> PathBuf {
        self.image_dir.join(split.as_str())
    }

    pub fn image_path(&self, split: Split, id: &str) -> PathBuf {
        self.split_image_dir(split).join(format!("{}.png", id))
    }

    /// Creates the image and log directories. Invoked once by the entry
    /// point, not as a side effect of loading any component.
    pub fn ensure_directories(&self) -> Result<()> {
        for split in Split::ALL {
            let dir = self.split_image_dir(split);
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create image directory {}", dir.display()))?;
        }
        if let Some(log_dir) = self.log_file.parent() {
            fs::create_dir_all(log_dir)
                .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
        }
        Ok(())
    }
}
