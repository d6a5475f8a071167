use anyhow::Result;
use clap::Parser;
use tracing::error;

use dashcam_stamp::cli::{execute, Cli};
use dashcam_stamp::config::load_config;
use dashcam_stamp::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)?;

    // Route panics through the log file as well
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        error!("[PANIC]{} {}", location, msg);
    }));

    let config = load_config(cli.config.as_deref());

    if let Err(e) = execute(cli.command, &config) {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
