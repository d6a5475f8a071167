use std::path::PathBuf;
use std::sync::OnceLock;

static EXE_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the directory containing the executable.
pub fn get_exe_dir() -> &'static PathBuf {
    EXE_DIR.get_or_init(|| {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Returns the logs directory: `<exe_dir>/logs/`
pub fn get_logs_dir() -> PathBuf {
    get_exe_dir().join("logs")
}

/// Returns the default config file: `<exe_dir>/config.json`
pub fn get_default_config_path() -> PathBuf {
    get_exe_dir().join("config.json")
}

/// Returns the per-user data directory used for models and tessdata.
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dashcam-stamp")
}

/// Returns the model directory: `<data_dir>/models/`
pub fn get_models_dir() -> PathBuf {
    get_data_dir().join("models")
}

/// Returns the local tessdata directory: `<data_dir>/tessdata/`
pub fn get_tessdata_dir() -> PathBuf {
    get_data_dir().join("tessdata")
}

/// Ensures the logs directory exists. Call at startup.
pub fn ensure_directories() -> std::io::Result<()> {
    std::fs::create_dir_all(get_logs_dir())?;
    Ok(())
}
