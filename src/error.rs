//! Crate error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    /// A Win32 / COM call failed.
    #[cfg(target_os = "windows")]
    #[error("windows API call failed: {0}")]
    Windows(#[from] windows::core::Error),

    #[error("{function} failed")]
    Os { function: &'static str },

    #[error("renderer initialization already started")]
    AlreadyInitializing,

    #[error("renderer engine reported failure: {0}")]
    Renderer(String),

    #[error("the host surface is only available on Windows")]
    UnsupportedPlatform,
}

pub type Result<T> = std::result::Result<T, ShellError>;
