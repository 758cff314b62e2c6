use crate::{AppSettings, RawSettings};
use color_eyre::eyre::Result;
use config::{Config, File};
use std::path::Path;

pub fn load_settings_from_path(path: &Path, include_env: bool) -> Result<AppSettings> {
    if include_env {
        dotenv::from_path(".env").ok();
    }

    let mut builder = Config::builder().add_source(File::from(path));
    if include_env {
        builder = builder.add_source(
            config::Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );
    }

    let raw_settings = builder.build()?.try_deserialize::<RawSettings>()?;
    Ok(raw_settings.into())
}

pub fn load_app_settings() -> Result<AppSettings> {
    let config_path = Path::new("config/settings.yaml").canonicalize()?;
    load_settings_from_path(&config_path, true)
}
