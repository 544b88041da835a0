//! HtmlWallpaper
//!
//! Shows one local HTML page (clock, animation, dashboard...) through
//! WebView2 in a borderless, always-on-top window covering the primary
//! display. Escape closes it.

pub mod document;
pub mod error;
pub mod host_window;
pub mod settings;
pub mod webview;
pub mod window_layer;

use log::{error, info, LevelFilter};

pub use error::{Result, ShellError};
pub use settings::{BuildMode, ShellSettings};

/// Initialize logging based on debug/release mode
fn init_logging() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .format_target(true)
        .try_init();
}

/// Bring the surface up and pump messages until it is closed.
/// Returns the message loop's exit code.
#[cfg(target_os = "windows")]
pub fn run() -> Result<i32> {
    use log::warn;

    use crate::host_window::{init_com, message_loop, HostWindow};
    use crate::window_layer::{reassert_fullscreen, Win32Display, Win32Surface};

    let settings = ShellSettings::default();

    init_com();

    let window = HostWindow::create(&settings)?;
    window.show();
    reassert_fullscreen(&Win32Display, &Win32Surface::new(window.hwnd()));

    let uri = document::current_document_uri(&settings);
    if let Err(e) = webview::start_webview(window.hwnd(), window.renderer(), uri) {
        warn!("Failed to start WebView2 initialization: {}", e);
    }

    let code = message_loop();
    drop(window);
    Ok(code)
}

#[cfg(not(target_os = "windows"))]
pub fn run() -> Result<i32> {
    Err(ShellError::UnsupportedPlatform)
}

/// Main entry point
pub fn main() {
    init_logging();
    info!("Starting HtmlWallpaper v{}", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(code) => {
            info!("Surface closed");
            std::process::exit(code);
        }
        Err(e) => {
            error!("HtmlWallpaper failed to start: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_run_unsupported_off_windows() {
        assert!(matches!(run(), Err(ShellError::UnsupportedPlatform)));
    }

    #[test]
    fn test_logging_init_is_idempotent() {
        init_logging();
        init_logging();
    }
}
