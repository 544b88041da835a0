//! Shell settings
//!
//! Everything here is fixed at compile time. The shell takes no flags,
//! reads no environment variables and persists nothing.

use std::time::Duration;

/// Which document location is used. Chosen by the build profile only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// Debug builds: a fixed path on the developer machine.
    Development,
    /// Release builds: `index.html` next to the executable.
    Release,
}

impl BuildMode {
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Release
        }
    }
}

/// Virtual-key code of Escape.
pub const VK_ESCAPE_CODE: u16 = 0x1B;

#[derive(Debug, Clone)]
pub struct ShellSettings {
    /// Window class registered for the host surface.
    pub class_name: &'static str,
    pub window_title: &'static str,
    /// File looked up next to the executable in release builds.
    pub document_file: &'static str,
    pub development_uri: &'static str,
    pub cancel_timer_id: usize,
    pub cancel_poll_interval: Duration,
    pub cancel_key: u16,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            class_name: "HtmlWallpaperWindow",
            window_title: "",
            document_file: "index.html",
            development_uri: "file:///C:/workspaces/my_work/HtmlWallpaper/index.html",
            cancel_timer_id: 1,
            cancel_poll_interval: Duration::from_millis(100),
            cancel_key: VK_ESCAPE_CODE,
        }
    }
}

impl ShellSettings {
    /// Poll interval as the millisecond count the OS timer expects.
    pub fn cancel_poll_millis(&self) -> u32 {
        u32::try_from(self.cancel_poll_interval.as_millis()).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = ShellSettings::default();
        assert_eq!(settings.cancel_poll_millis(), 100);
        assert_eq!(settings.cancel_key, 0x1B);
        assert_eq!(settings.cancel_timer_id, 1);
        assert_eq!(settings.document_file, "index.html");
    }

    #[test]
    fn test_build_mode_follows_profile() {
        let expected = if cfg!(debug_assertions) {
            BuildMode::Development
        } else {
            BuildMode::Release
        };
        assert_eq!(BuildMode::current(), expected);
    }

    #[test]
    fn test_poll_interval_saturates() {
        let settings = ShellSettings {
            cancel_poll_interval: Duration::from_secs(u64::MAX / 1000),
            ..ShellSettings::default()
        };
        assert_eq!(settings.cancel_poll_millis(), u32::MAX);
    }
}
