//! Document Locator
//!
//! Resolves the `file:///` URI of the HTML page shown on the surface.
//! A missing file is not detected here; the renderer just shows nothing.

use log::{debug, warn};

use crate::settings::{BuildMode, ShellSettings};

const FILE_URI_PREFIX: &str = "file:///";

/// Build the document URI for `mode`.
///
/// `exe_path` is only consulted in [`BuildMode::Release`]. Separators are
/// normalized to `/`; nothing is percent-encoded.
pub fn document_uri(mode: BuildMode, exe_path: &str, settings: &ShellSettings) -> String {
    match mode {
        BuildMode::Development => settings.development_uri.to_string(),
        BuildMode::Release => {
            let exe_dir = exe_path
                .rfind(|c| c == '\\' || c == '/')
                .map(|idx| &exe_path[..idx]);

            let html_path = match exe_dir {
                Some(dir) => format!("{}\\{}", dir, settings.document_file),
                None => settings.document_file.to_string(),
            };

            format!("{}{}", FILE_URI_PREFIX, html_path.replace('\\', "/"))
        }
    }
}

/// Resolve the URI for the running executable and the active build mode.
pub fn current_document_uri(settings: &ShellSettings) -> String {
    let exe_path = match std::env::current_exe() {
        Ok(path) => path.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Could not resolve executable path: {}", e);
            String::new()
        }
    };

    let uri = document_uri(BuildMode::current(), &exe_path, settings);
    debug!("Document URI: {}", uri);
    uri
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_uri_next_to_exe() {
        let settings = ShellSettings::default();
        let uri = document_uri(
            BuildMode::Release,
            r"C:\Program Files\HtmlWallpaper\html-wallpaper.exe",
            &settings,
        );
        assert_eq!(uri, "file:///C:/Program Files/HtmlWallpaper/index.html");
    }

    #[test]
    fn test_release_uri_mixed_separators() {
        let settings = ShellSettings::default();
        let uri = document_uri(BuildMode::Release, r"D:\tools/wall\app.exe", &settings);
        assert_eq!(uri, "file:///D:/tools/wall/index.html");
    }

    #[test]
    fn test_release_uri_without_directory() {
        let settings = ShellSettings::default();
        assert_eq!(
            document_uri(BuildMode::Release, "app.exe", &settings),
            "file:///index.html"
        );
        assert_eq!(
            document_uri(BuildMode::Release, "", &settings),
            "file:///index.html"
        );
    }

    #[test]
    fn test_development_uri_ignores_exe_location() {
        let settings = ShellSettings::default();
        let a = document_uri(BuildMode::Development, r"C:\a\b.exe", &settings);
        let b = document_uri(BuildMode::Development, "/somewhere/else", &settings);
        assert_eq!(a, "file:///C:/workspaces/my_work/HtmlWallpaper/index.html");
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_document_file() {
        let settings = ShellSettings {
            document_file: "clock.html",
            ..ShellSettings::default()
        };
        let uri = document_uri(BuildMode::Release, r"E:\w\x.exe", &settings);
        assert_eq!(uri, "file:///E:/w/clock.html");
    }

    #[test]
    fn test_current_uri_is_file_uri() {
        let uri = current_document_uri(&ShellSettings::default());
        assert!(uri.starts_with("file:///"));
        assert!(uri.ends_with("index.html"));
        assert!(!uri.contains('\\'));
    }
}
