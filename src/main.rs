use log::{error, info};

mod audio;
mod config;
mod document;
mod import;
mod playback;
mod position;
mod shell;
mod speech;
mod state;
mod util;
mod voice;

use config::ReaderConfig;
use state::AppState;

fn main() {
    if let Err(err) = util::logging::init() {
        eprintln!("Failed to initialise logger: {err}");
    }
    info!("Starting audiobook reader");

    let config = ReaderConfig::from_env();
    let (state, events) = match AppState::initialise(&config) {
        Ok(wired) => wired,
        Err(err) => {
            error!("Startup failed: {err:?}");
            eprintln!("Startup failed: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = shell::run(state, events) {
        error!("Reader shell error: {err:?}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn logger_creates_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(temp_dir.path()).unwrap();
        let result = util::logging::init();
        std::env::set_current_dir(original_dir).unwrap();
        result.unwrap();
        assert!(temp_dir.path().join("logs").exists());
    }
}
