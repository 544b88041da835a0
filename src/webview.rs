//! Embedded renderer (WebView2) adapter
//!
//! Initialization is a two-step handshake driven by completion callbacks
//! that the engine schedules on the UI thread's message loop:
//!
//! `Idle -> AwaitingEnvironment -> AwaitingController -> Ready`
//!
//! Any failure along the way parks the adapter in `Stalled`. Nothing is
//! retried and nothing is shown to the user; the surface simply stays black.

use log::{debug, info, warn};

use crate::error::{Result, ShellError};
use crate::window_layer::Rect;

/// Navigable content surface of a controller.
pub trait RendererDocument {
    fn navigate(&self, uri: &str) -> Result<()>;
}

/// One renderer instance bound to the host window.
pub trait RendererController {
    type Document: RendererDocument;

    /// Set the viewport rectangle inside the host window.
    fn set_bounds(&self, bounds: Rect) -> Result<()>;

    fn document(&self) -> Result<Self::Document>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPhase {
    Idle,
    AwaitingEnvironment,
    AwaitingController,
    Ready,
    /// The engine failed or handed back a null controller. Terminal.
    Stalled,
}

pub struct RendererAdapter<C: RendererController> {
    phase: InitPhase,
    controller: Option<C>,
    document: Option<C::Document>,
}

impl<C: RendererController> Default for RendererAdapter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: RendererController> RendererAdapter<C> {
    pub fn new() -> Self {
        Self {
            phase: InitPhase::Idle,
            controller: None,
            document: None,
        }
    }

    pub fn phase(&self) -> InitPhase {
        self.phase
    }

    pub fn controller(&self) -> Option<&C> {
        self.controller.as_ref()
    }

    pub fn document(&self) -> Option<&C::Document> {
        self.document.as_ref()
    }

    /// Mark the environment request as issued. Only one initialization per
    /// process is allowed.
    pub fn begin(&mut self) -> Result<()> {
        if self.phase != InitPhase::Idle {
            return Err(ShellError::AlreadyInitializing);
        }
        self.phase = InitPhase::AwaitingEnvironment;
        debug!("Renderer: requesting environment");
        Ok(())
    }

    /// Environment completion. Hands the environment back when the caller
    /// should go on and request a controller.
    pub fn environment_ready<E>(&mut self, environment: Result<E>) -> Option<E> {
        if self.phase != InitPhase::AwaitingEnvironment {
            warn!("Renderer: unexpected environment completion in {:?}", self.phase);
            return None;
        }

        match environment {
            Ok(env) => {
                self.phase = InitPhase::AwaitingController;
                debug!("Renderer: environment ready, requesting controller");
                Some(env)
            }
            Err(e) => {
                self.stall(e);
                None
            }
        }
    }

    /// Controller completion. With a controller: keep it, size its viewport
    /// to `client` and navigate its document to `uri`. Without one: stall.
    pub fn controller_ready(
        &mut self,
        result: Result<()>,
        controller: Option<C>,
        client: Rect,
        uri: &str,
    ) {
        if self.phase != InitPhase::AwaitingController {
            warn!("Renderer: unexpected controller completion in {:?}", self.phase);
            return;
        }
        if let Err(e) = result {
            self.stall(e);
            return;
        }
        let Some(controller) = controller else {
            self.stall(ShellError::Renderer("controller handle was null".into()));
            return;
        };

        match controller.document() {
            Ok(document) => self.document = Some(document),
            Err(e) => warn!("Renderer: failed to get document: {}", e),
        }

        if let Err(e) = controller.set_bounds(client) {
            warn!("Renderer: failed to set initial bounds: {}", e);
        }

        if let Some(document) = &self.document {
            info!("Renderer: navigating to {}", uri);
            if let Err(e) = document.navigate(uri) {
                warn!("Renderer: navigation failed: {}", e);
            }
        }

        self.controller = Some(controller);
        self.phase = InitPhase::Ready;
    }

    /// Keep the viewport synced with the host client area. No-op until a
    /// controller exists.
    pub fn resize(&self, client: Rect) {
        if let Some(controller) = &self.controller {
            if let Err(e) = controller.set_bounds(client) {
                warn!("Renderer: failed to resize viewport: {}", e);
            }
        }
    }

    /// Give up on initialization, e.g. when a request could not be issued.
    pub fn stall(&mut self, reason: ShellError) {
        warn!("Renderer: initialization stalled: {}", reason);
        self.phase = InitPhase::Stalled;
    }
}

// ============================================================================
// WebView2 binding
// ============================================================================

#[cfg(target_os = "windows")]
pub use webview2::{start_webview, SharedAdapter, WebView2Controller, WebView2Document};

#[cfg(target_os = "windows")]
mod webview2 {
    use std::cell::RefCell;
    use std::rc::Rc;

    use webview2_com::Microsoft::Web::WebView2::Win32::{
        CreateCoreWebView2Environment, ICoreWebView2, ICoreWebView2Controller,
        ICoreWebView2Environment,
    };
    use webview2_com::{
        CreateCoreWebView2ControllerCompletedHandler,
        CreateCoreWebView2EnvironmentCompletedHandler,
    };
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Foundation::HWND;

    use super::{RendererAdapter, RendererController, RendererDocument};
    use crate::error::{Result, ShellError};
    use crate::window_layer::{client_rect, Rect};

    pub struct WebView2Controller(ICoreWebView2Controller);

    pub struct WebView2Document(ICoreWebView2);

    impl RendererController for WebView2Controller {
        type Document = WebView2Document;

        fn set_bounds(&self, bounds: Rect) -> Result<()> {
            unsafe { self.0.SetBounds(bounds.into())? };
            Ok(())
        }

        fn document(&self) -> Result<WebView2Document> {
            let webview = unsafe { self.0.CoreWebView2()? };
            Ok(WebView2Document(webview))
        }
    }

    impl RendererDocument for WebView2Document {
        fn navigate(&self, uri: &str) -> Result<()> {
            let uri = HSTRING::from(uri);
            unsafe { self.0.Navigate(PCWSTR(uri.as_ptr()))? };
            Ok(())
        }
    }

    /// Adapter shared between the window procedure and the completion
    /// handlers. Both only ever run on the UI thread.
    pub type SharedAdapter = Rc<RefCell<RendererAdapter<WebView2Controller>>>;

    /// Kick off environment creation. Returns as soon as the request is
    /// issued; the rest happens in completion handlers.
    pub fn start_webview(hwnd: HWND, adapter: SharedAdapter, uri: String) -> Result<()> {
        adapter.borrow_mut().begin()?;

        let env_adapter = adapter.clone();
        let handler = CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(
            move |result: windows::core::Result<()>,
                  environment: Option<ICoreWebView2Environment>|
                  -> windows::core::Result<()> {
                let environment = match (result, environment) {
                    (Ok(()), Some(env)) => Ok(env),
                    (Ok(()), None) => Err(ShellError::Renderer(
                        "environment handle was null".into(),
                    )),
                    (Err(e), _) => Err(ShellError::from(e)),
                };

                let ready = env_adapter.borrow_mut().environment_ready(environment);
                if let Some(environment) = ready {
                    request_controller(hwnd, &environment, env_adapter, uri);
                }
                Ok(())
            },
        ));

        if let Err(e) = unsafe { CreateCoreWebView2Environment(&handler) } {
            adapter.borrow_mut().stall(ShellError::from(e.clone()));
            return Err(e.into());
        }
        Ok(())
    }

    fn request_controller(
        hwnd: HWND,
        environment: &ICoreWebView2Environment,
        adapter: SharedAdapter,
        uri: String,
    ) {
        let ctrl_adapter = adapter.clone();
        let handler = CreateCoreWebView2ControllerCompletedHandler::create(Box::new(
            move |result: windows::core::Result<()>,
                  controller: Option<ICoreWebView2Controller>|
                  -> windows::core::Result<()> {
                let client = client_rect(hwnd);
                ctrl_adapter.borrow_mut().controller_ready(
                    result.map_err(ShellError::from),
                    controller.map(WebView2Controller),
                    client,
                    &uri,
                );
                Ok(())
            },
        ));

        if let Err(e) = unsafe { environment.CreateCoreWebView2Controller(hwnd, &handler) } {
            adapter.borrow_mut().stall(ShellError::from(e));
        }
    }
}
