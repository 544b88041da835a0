//! Host Window — the full-screen popup that carries the renderer viewport
//!
//! Window messages are translated into [`HostEvent`]s and fed to
//! [`HostController`], which decides what to do and answers with
//! [`HostAction`]s. The Windows side executes those actions only after every
//! borrow is released, since most Win32 calls re-enter the window procedure.
//!
//! Escape is detected twice: by polling the async key state every 100 ms
//! (WebView2 takes keyboard focus and swallows key messages) and through
//! plain `WM_KEYDOWN` when the host window itself has focus.

use log::{debug, info};

use crate::settings::ShellSettings;
use crate::window_layer::Rect;

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Uninitialized,
    Created,
    Running,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Created,
    Timer(usize),
    /// Carries the client area after the resize.
    Resized(Rect),
    ActivationChanged,
    DisplayChanged,
    KeyDown(u16),
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    StartTimer { id: usize, interval_ms: u32 },
    StopTimer { id: usize },
    ResizeViewport(Rect),
    ReassertPlacement,
    DestroyWindow,
    Quit(i32),
}

/// Async (focus independent) keyboard state.
pub trait KeyboardState {
    fn is_key_down(&self, vk: u16) -> bool;
}

pub struct HostController {
    state: HostState,
    settings: ShellSettings,
}

impl HostController {
    pub fn new(settings: ShellSettings) -> Self {
        Self {
            state: HostState::Uninitialized,
            settings,
        }
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn handle(&mut self, event: HostEvent, keys: &impl KeyboardState) -> Vec<HostAction> {
        if self.state == HostState::Destroyed {
            debug!("Ignoring {:?} after destroy", event);
            return Vec::new();
        }

        if self.state == HostState::Created && event != HostEvent::Created {
            self.state = HostState::Running;
        }

        match event {
            HostEvent::Created => {
                self.state = HostState::Created;
                vec![HostAction::StartTimer {
                    id: self.settings.cancel_timer_id,
                    interval_ms: self.settings.cancel_poll_millis(),
                }]
            }
            HostEvent::Timer(id) if id == self.settings.cancel_timer_id => {
                if keys.is_key_down(self.settings.cancel_key) {
                    info!("Cancel key held, closing surface");
                    vec![HostAction::DestroyWindow]
                } else {
                    Vec::new()
                }
            }
            HostEvent::Timer(_) => Vec::new(),
            HostEvent::Resized(client) => vec![HostAction::ResizeViewport(client)],
            HostEvent::ActivationChanged | HostEvent::DisplayChanged => {
                vec![HostAction::ReassertPlacement]
            }
            HostEvent::KeyDown(vk) if vk == self.settings.cancel_key => {
                info!("Cancel key pressed, closing surface");
                vec![HostAction::DestroyWindow]
            }
            HostEvent::KeyDown(_) => Vec::new(),
            HostEvent::Destroyed => {
                self.state = HostState::Destroyed;
                vec![
                    HostAction::StopTimer {
                        id: self.settings.cancel_timer_id,
                    },
                    HostAction::Quit(0),
                ]
            }
        }
    }
}

// ============================================================================
// Windows implementation
// ============================================================================

#[cfg(target_os = "windows")]
pub use win32::{init_com, message_loop, HostWindow};

#[cfg(target_os = "windows")]
mod win32 {
    use std::cell::RefCell;
    use std::rc::Rc;

    use log::{debug, info, warn};
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, WPARAM};
    use windows::Win32::Graphics::Gdi::{GetStockObject, UpdateWindow, BLACK_BRUSH, HBRUSH};
    use windows::Win32::System::Com::{CoInitializeEx, COINIT_APARTMENTTHREADED};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::UI::Input::KeyboardAndMouse::GetAsyncKeyState;
    use windows::Win32::UI::WindowsAndMessaging::{
        CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW,
        GetWindowLongPtrW, KillTimer, PostQuitMessage, RegisterClassExW, SetTimer,
        SetWindowLongPtrW, ShowWindow, TranslateMessage, CREATESTRUCTW, GWLP_USERDATA, HMENU,
        MSG, SW_SHOW, WM_ACTIVATE, WM_CREATE, WM_DESTROY, WM_DISPLAYCHANGE, WM_KEYDOWN,
        WM_NCCREATE, WM_NCDESTROY, WM_SIZE, WM_TIMER, WNDCLASSEXW, WS_EX_TOPMOST, WS_POPUP,
    };

    use super::{HostAction, HostController, HostEvent, KeyboardState};
    use crate::error::{Result, ShellError};
    use crate::settings::ShellSettings;
    use crate::webview::{RendererAdapter, SharedAdapter};
    use crate::window_layer::{
        client_rect, reassert_fullscreen, PrimaryDisplay, Win32Display, Win32Surface,
    };

    /// Per-window state, reachable from the window procedure via
    /// `GWLP_USERDATA`.
    struct WindowContext {
        host: RefCell<HostController>,
        renderer: SharedAdapter,
    }

    struct AsyncKeyboard;

    impl KeyboardState for AsyncKeyboard {
        fn is_key_down(&self, vk: u16) -> bool {
            let state = unsafe { GetAsyncKeyState(i32::from(vk)) };
            (state as u16 & 0x8000) != 0
        }
    }

    /// COM must be in STA mode on the UI thread before WebView2 is created.
    pub fn init_com() {
        match unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }.ok() {
            Ok(()) => debug!("COM initialized (STA)"),
            Err(e) => warn!("COM init failed (STA): {}", e),
        }
    }

    pub struct HostWindow {
        hwnd: HWND,
        context: Box<WindowContext>,
        // Class and title strings must outlive the window.
        _class_name: HSTRING,
        _title: HSTRING,
    }

    impl HostWindow {
        /// Register the window class and create the borderless topmost popup
        /// at primary-display size.
        pub fn create(settings: &ShellSettings) -> Result<Self> {
            let class_name = HSTRING::from(settings.class_name);
            let title = HSTRING::from(settings.window_title);

            let hmodule = unsafe { GetModuleHandleW(PCWSTR::null())? };
            let hinstance = HINSTANCE(hmodule.0);

            register_class(hinstance, &class_name)?;

            let context = Box::new(WindowContext {
                host: RefCell::new(HostController::new(settings.clone())),
                renderer: Rc::new(RefCell::new(RendererAdapter::new())),
            });
            let context_ptr: *const WindowContext = &*context;

            let screen = Win32Display.primary_size();
            let hwnd = unsafe {
                CreateWindowExW(
                    WS_EX_TOPMOST,
                    PCWSTR(class_name.as_ptr()),
                    PCWSTR(title.as_ptr()),
                    WS_POPUP,
                    0,
                    0,
                    screen.width,
                    screen.height,
                    HWND::default(),
                    HMENU::default(),
                    hinstance,
                    Some(context_ptr.cast()),
                )?
            };
            info!("Host window created ({}x{})", screen.width, screen.height);

            Ok(Self {
                hwnd,
                context,
                _class_name: class_name,
                _title: title,
            })
        }

        pub fn hwnd(&self) -> HWND {
            self.hwnd
        }

        pub fn renderer(&self) -> SharedAdapter {
            self.context.renderer.clone()
        }

        pub fn show(&self) {
            unsafe {
                let _ = ShowWindow(self.hwnd, SW_SHOW);
                let _ = UpdateWindow(self.hwnd);
            }
        }
    }

    impl Drop for HostWindow {
        fn drop(&mut self) {
            // Normally already cleared by WM_NCDESTROY.
            unsafe {
                SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0);
            }
        }
    }

    fn register_class(hinstance: HINSTANCE, class_name: &HSTRING) -> Result<()> {
        let background = unsafe { HBRUSH(GetStockObject(BLACK_BRUSH).0) };

        let wc = WNDCLASSEXW {
            cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
            lpfnWndProc: Some(wnd_proc),
            hInstance: hinstance,
            hbrBackground: background,
            lpszClassName: PCWSTR(class_name.as_ptr()),
            ..Default::default()
        };

        if unsafe { RegisterClassExW(&wc) } == 0 {
            return Err(ShellError::Os {
                function: "RegisterClassExW",
            });
        }
        Ok(())
    }

    /// Pump messages until `WM_QUIT`; returns its exit code.
    pub fn message_loop() -> i32 {
        let mut msg = MSG::default();
        loop {
            let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };
            match ret.0 {
                0 => break,
                -1 => {
                    warn!("GetMessageW failed, leaving message loop");
                    break;
                }
                _ => unsafe {
                    let _ = TranslateMessage(&msg);
                    DispatchMessageW(&msg);
                },
            }
        }
        msg.wParam.0 as i32
    }

    unsafe extern "system" fn wnd_proc(
        hwnd: HWND,
        msg: u32,
        wparam: WPARAM,
        lparam: LPARAM,
    ) -> LRESULT {
        if msg == WM_NCCREATE {
            let create = &*(lparam.0 as *const CREATESTRUCTW);
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, create.lpCreateParams as isize);
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
        if msg == WM_NCDESTROY {
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }

        let context = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const WindowContext;
        if context.is_null() {
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }
        let context = &*context;

        let event = match msg {
            WM_CREATE => HostEvent::Created,
            WM_TIMER => HostEvent::Timer(wparam.0),
            WM_SIZE => HostEvent::Resized(client_rect(hwnd)),
            WM_ACTIVATE => HostEvent::ActivationChanged,
            WM_DISPLAYCHANGE => HostEvent::DisplayChanged,
            WM_KEYDOWN => HostEvent::KeyDown(wparam.0 as u16),
            WM_DESTROY => HostEvent::Destroyed,
            _ => return DefWindowProcW(hwnd, msg, wparam, lparam),
        };

        let actions = context.host.borrow_mut().handle(event, &AsyncKeyboard);
        for action in actions {
            perform(hwnd, context, action);
        }
        LRESULT(0)
    }

    fn perform(hwnd: HWND, context: &WindowContext, action: HostAction) {
        match action {
            HostAction::StartTimer { id, interval_ms } => {
                if unsafe { SetTimer(hwnd, id, interval_ms, None) } == 0 {
                    warn!("{}", ShellError::Os { function: "SetTimer" });
                }
            }
            HostAction::StopTimer { id } => {
                if let Err(e) = unsafe { KillTimer(hwnd, id) } {
                    warn!("KillTimer failed: {}", e);
                }
            }
            HostAction::ResizeViewport(client) => match context.renderer.try_borrow() {
                Ok(renderer) => renderer.resize(client),
                Err(_) => debug!("Renderer busy, skipping viewport resize"),
            },
            HostAction::ReassertPlacement => {
                reassert_fullscreen(&Win32Display, &Win32Surface::new(hwnd));
            }
            HostAction::DestroyWindow => {
                if let Err(e) = unsafe { DestroyWindow(hwnd) } {
                    warn!("DestroyWindow failed: {}", e);
                }
            }
            HostAction::Quit(code) => unsafe { PostQuitMessage(code) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::VK_ESCAPE_CODE;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeKeyboard {
        escape_down: Cell<bool>,
    }

    impl KeyboardState for FakeKeyboard {
        fn is_key_down(&self, vk: u16) -> bool {
            vk == VK_ESCAPE_CODE && self.escape_down.get()
        }
    }

    fn created() -> (HostController, FakeKeyboard) {
        let mut host = HostController::new(ShellSettings::default());
        let keys = FakeKeyboard::default();
        host.handle(HostEvent::Created, &keys);
        (host, keys)
    }

    #[test]
    fn test_create_starts_cancel_poll() {
        let mut host = HostController::new(ShellSettings::default());
        assert_eq!(host.state(), HostState::Uninitialized);

        let actions = host.handle(HostEvent::Created, &FakeKeyboard::default());
        assert_eq!(
            actions,
            vec![HostAction::StartTimer {
                id: 1,
                interval_ms: 100
            }]
        );
        assert_eq!(host.state(), HostState::Created);
    }

    #[test]
    fn test_running_after_first_event() {
        let (mut host, keys) = created();
        host.handle(HostEvent::Timer(1), &keys);
        assert_eq!(host.state(), HostState::Running);
    }

    #[test]
    fn test_poll_without_key_does_nothing() {
        let (mut host, keys) = created();
        for _ in 0..10 {
            assert!(host.handle(HostEvent::Timer(1), &keys).is_empty());
        }
    }

    #[test]
    fn test_held_escape_destroys_on_next_tick() {
        let (mut host, keys) = created();
        assert!(host.handle(HostEvent::Timer(1), &keys).is_empty());

        keys.escape_down.set(true);
        assert_eq!(
            host.handle(HostEvent::Timer(1), &keys),
            vec![HostAction::DestroyWindow]
        );
    }

    #[test]
    fn test_foreign_timer_ignored() {
        let (mut host, keys) = created();
        keys.escape_down.set(true);
        assert!(host.handle(HostEvent::Timer(42), &keys).is_empty());
    }

    #[test]
    fn test_escape_keydown_destroys_immediately() {
        let (mut host, keys) = created();
        assert_eq!(
            host.handle(HostEvent::KeyDown(VK_ESCAPE_CODE), &keys),
            vec![HostAction::DestroyWindow]
        );
        assert!(host.handle(HostEvent::KeyDown(0x41), &keys).is_empty());
    }

    #[test]
    fn test_resize_forwards_client_area() {
        let (mut host, keys) = created();
        let client = Rect::from_size(1600, 900);
        assert_eq!(
            host.handle(HostEvent::Resized(client), &keys),
            vec![HostAction::ResizeViewport(client)]
        );
    }

    #[test]
    fn test_activation_and_display_change_reassert_placement() {
        let (mut host, keys) = created();
        assert_eq!(
            host.handle(HostEvent::ActivationChanged, &keys),
            vec![HostAction::ReassertPlacement]
        );
        assert_eq!(
            host.handle(HostEvent::DisplayChanged, &keys),
            vec![HostAction::ReassertPlacement]
        );
    }

    #[test]
    fn test_destroy_stops_timer_and_quits() {
        let (mut host, keys) = created();
        assert_eq!(
            host.handle(HostEvent::Destroyed, &keys),
            vec![HostAction::StopTimer { id: 1 }, HostAction::Quit(0)]
        );
        assert_eq!(host.state(), HostState::Destroyed);

        keys.escape_down.set(true);
        assert!(host.handle(HostEvent::Timer(1), &keys).is_empty());
        assert!(host.handle(HostEvent::DisplayChanged, &keys).is_empty());
        assert_eq!(host.state(), HostState::Destroyed);
    }

    #[test]
    fn test_events_before_create_still_handled() {
        let mut host = HostController::new(ShellSettings::default());
        let keys = FakeKeyboard::default();
        assert_eq!(
            host.handle(HostEvent::ActivationChanged, &keys),
            vec![HostAction::ReassertPlacement]
        );
        assert_eq!(host.state(), HostState::Uninitialized);
    }

    #[test]
    fn test_cancel_key_is_configurable() {
        let settings = ShellSettings {
            cancel_key: 0x51,
            ..ShellSettings::default()
        };
        let mut host = HostController::new(settings);
        let keys = FakeKeyboard::default();
        host.handle(HostEvent::Created, &keys);

        assert!(host
            .handle(HostEvent::KeyDown(VK_ESCAPE_CODE), &keys)
            .is_empty());
        assert_eq!(
            host.handle(HostEvent::KeyDown(0x51), &keys),
            vec![HostAction::DestroyWindow]
        );
    }
}
