use directories::ProjectDirs;
use std::path::PathBuf;

pub const APP_QUALIFIER: &str = "io";
pub const APP_ORG: &str = "lockgate";
pub const APP_NAME: &str = "lockgate";

pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dirs = ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .ok_or_else(|| anyhow::anyhow!("cannot determine data directory"))?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Default location of the durable token store.
pub fn default_store_path() -> anyhow::Result<PathBuf> {
    Ok(data_dir()?.join("tokens.json"))
}
