use anyhow::{Context, Result};
use logo_studio::launcher::{self, Launch};
use logo_studio::server::AppServer;
use raw_window_handle::{HasWindowHandle, RawWindowHandle};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    LoadImageW, SendMessageW, ICON_BIG, ICON_SMALL, IMAGE_ICON, LR_DEFAULTSIZE, LR_SHARED,
    WM_SETICON,
};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::windows::EventLoopBuilderExtWindows;
use winit::window::{Window, WindowId};
use wry::{WebView, WebViewBuilder};

pub fn run() -> Result<()> {
    let Launch { server, .. } = launcher::start(launcher::parse_args())?;

    let url = server.url();
    let event_loop = build_event_loop().context("failed to create event loop")?;

    let mut app = DesktopApp::new(url, server);
    event_loop
        .run_app(&mut app)
        .context("event loop terminated unexpectedly")?;

    Ok(())
}

/// Native window hosting the studio page in a webview.
struct DesktopApp {
    url: String,
    window: Option<Window>,
    webview: Option<WebView>,
    server: Option<AppServer>,
}

impl DesktopApp {
    fn new(url: String, server: AppServer) -> Self {
        Self {
            url,
            window: None,
            webview: None,
            server: Some(server),
        }
    }

    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        if self.window.is_some() {
            return Ok(());
        }

        let attrs = Window::default_attributes()
            .with_title("Logo Studio")
            .with_inner_size(LogicalSize::new(1180.0, 820.0))
            .with_min_inner_size(LogicalSize::new(720.0, 560.0));

        let window = event_loop
            .create_window(attrs)
            .context("failed to create main window")?;
        apply_window_icon(&window);

        let webview = WebViewBuilder::new()
            .with_url(&self.url)
            .build(&window)
            .context("failed to build webview")?;

        self.webview = Some(webview);
        self.window = Some(window);
        Ok(())
    }

    fn shutdown_server(&mut self) {
        if let Some(mut server) = self.server.take() {
            server.stop();
        }
    }
}

impl ApplicationHandler for DesktopApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.init_window(event_loop) {
            tracing::error!("{err:#}");
            self.shutdown_server();
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if matches!(event, WindowEvent::CloseRequested) {
            self.shutdown_server();
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown_server();
    }
}

fn build_event_loop() -> Result<EventLoop<()>> {
    let mut builder = EventLoop::builder();
    // DPI mode comes from the app manifest when one is embedded.
    builder.with_dpi_aware(false);
    builder.build().map_err(Into::into)
}

fn apply_window_icon(window: &Window) {
    let Some(hwnd) = hwnd_from_window(window) else {
        tracing::debug!("window handle unavailable; skipping icon");
        return;
    };

    let Some(icon_handle) = load_icon_handle_from_resource() else {
        tracing::debug!("no embedded icon resource");
        return;
    };

    unsafe {
        SendMessageW(hwnd, WM_SETICON, ICON_BIG as usize, icon_handle);
        SendMessageW(hwnd, WM_SETICON, ICON_SMALL as usize, icon_handle);
    }
}

fn hwnd_from_window(window: &Window) -> Option<*mut core::ffi::c_void> {
    let handle = window.window_handle().ok()?;
    match handle.as_raw() {
        RawWindowHandle::Win32(win32) => Some(win32.hwnd.get() as *mut core::ffi::c_void),
        _ => None,
    }
}

fn load_icon_handle_from_resource() -> Option<isize> {
    let module = unsafe { GetModuleHandleW(core::ptr::null()) };
    if module.is_null() {
        return None;
    }

    // winres embeds the primary icon as the first icon resource.
    let icon_resource_id = 1usize as *const u16;
    let handle = unsafe {
        LoadImageW(
            module,
            icon_resource_id,
            IMAGE_ICON,
            0,
            0,
            LR_DEFAULTSIZE | LR_SHARED,
        )
    };

    if handle.is_null() {
        None
    } else {
        Some(handle as isize)
    }
}
