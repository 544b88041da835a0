//! Window Layer — full-screen, always-on-top placement of the host surface
//!
//! The placement is computed from the primary display only and reapplied
//! whenever the window is (de)activated or the display configuration
//! changes, so the surface keeps covering the screen above other windows.

use log::{debug, warn};

use crate::error::Result;

// ============================================================================
// Geometry
// ============================================================================

/// Primary display size in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

/// Rectangle in window/client coordinates, same layout as Win32 `RECT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn from_size(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub bounds: Rect,
    pub topmost: bool,
    pub visible: bool,
}

impl Placement {
    /// Cover `(0,0)-(width,height)` of the primary display, topmost and shown.
    pub fn fullscreen(screen: ScreenSize) -> Self {
        Self {
            bounds: Rect::from_size(screen.width, screen.height),
            topmost: true,
            visible: true,
        }
    }
}

// ============================================================================
// OS seams
// ============================================================================

pub trait PrimaryDisplay {
    fn primary_size(&self) -> ScreenSize;
}

pub trait SurfaceWindow {
    fn apply_placement(&self, placement: &Placement) -> Result<()>;
}

/// Reapply full-screen topmost placement. Failures are logged, never raised.
pub fn reassert_fullscreen(display: &impl PrimaryDisplay, surface: &impl SurfaceWindow) {
    let placement = Placement::fullscreen(display.primary_size());
    debug!(
        "Placing surface at {}x{} (topmost)",
        placement.bounds.width(),
        placement.bounds.height()
    );

    if let Err(e) = surface.apply_placement(&placement) {
        warn!("Failed to apply full-screen placement: {}", e);
    }
}

// ============================================================================
// Windows implementation
// ============================================================================

#[cfg(target_os = "windows")]
pub use win32::{client_rect, Win32Display, Win32Surface};

#[cfg(target_os = "windows")]
mod win32 {
    use log::warn;
    use windows::Win32::Foundation::{HWND, RECT};
    use windows::Win32::UI::WindowsAndMessaging::{
        GetClientRect, GetSystemMetrics, SetWindowPos, HWND_NOTOPMOST, HWND_TOPMOST,
        SET_WINDOW_POS_FLAGS, SM_CXSCREEN, SM_CYSCREEN, SWP_SHOWWINDOW,
    };

    use super::{Placement, PrimaryDisplay, Rect, ScreenSize, SurfaceWindow};
    use crate::error::Result;

    impl From<RECT> for Rect {
        fn from(r: RECT) -> Self {
            Self {
                left: r.left,
                top: r.top,
                right: r.right,
                bottom: r.bottom,
            }
        }
    }

    impl From<Rect> for RECT {
        fn from(r: Rect) -> Self {
            RECT {
                left: r.left,
                top: r.top,
                right: r.right,
                bottom: r.bottom,
            }
        }
    }

    /// Current client area of `hwnd`; empty when the query fails.
    pub fn client_rect(hwnd: HWND) -> Rect {
        let mut rect = RECT::default();
        match unsafe { GetClientRect(hwnd, &mut rect) } {
            Ok(()) => rect.into(),
            Err(e) => {
                warn!("GetClientRect failed: {}", e);
                Rect::default()
            }
        }
    }

    /// Primary monitor metrics via `GetSystemMetrics`.
    pub struct Win32Display;

    impl PrimaryDisplay for Win32Display {
        fn primary_size(&self) -> ScreenSize {
            unsafe {
                ScreenSize {
                    width: GetSystemMetrics(SM_CXSCREEN),
                    height: GetSystemMetrics(SM_CYSCREEN),
                }
            }
        }
    }

    pub struct Win32Surface {
        hwnd: HWND,
    }

    impl Win32Surface {
        pub fn new(hwnd: HWND) -> Self {
            Self { hwnd }
        }
    }

    impl SurfaceWindow for Win32Surface {
        fn apply_placement(&self, placement: &Placement) -> Result<()> {
            let insert_after = if placement.topmost {
                HWND_TOPMOST
            } else {
                HWND_NOTOPMOST
            };
            let flags = if placement.visible {
                SWP_SHOWWINDOW
            } else {
                SET_WINDOW_POS_FLAGS(0)
            };
            let b = placement.bounds;

            unsafe {
                SetWindowPos(
                    self.hwnd,
                    insert_after,
                    b.left,
                    b.top,
                    b.width(),
                    b.height(),
                    flags,
                )?;
            }
            Ok(())
        }
    }
}
