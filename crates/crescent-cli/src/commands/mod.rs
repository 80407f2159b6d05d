use std::path::{Path, PathBuf};

use anyhow::Context as _;
use crescent_core::CrescentConfig;
use crescent_state::ModelStore;

pub mod events;
pub mod forecast;
pub mod init;
pub mod models;
pub mod summary;
pub mod train;

const STORE_FILE: &str = "models.redb";

/// Settings shared by every subcommand.
pub struct Context {
    pub data_dir: PathBuf,
    pub config: CrescentConfig,
}

impl Context {
    pub fn load(data_dir: PathBuf, config_path: &Path) -> anyhow::Result<Self> {
        let config = CrescentConfig::load_or_default(config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        Ok(Self { data_dir, config })
    }

    pub fn open_store(&self) -> anyhow::Result<ModelStore> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("creating {}", self.data_dir.display()))?;
        Ok(ModelStore::open(&self.data_dir.join(STORE_FILE))?)
    }
}
