use std::{fs, path::PathBuf, sync::mpsc};

use webview2_com::{
    CreateCoreWebView2ControllerCompletedHandler, CreateCoreWebView2EnvironmentCompletedHandler,
    Microsoft::Web::WebView2::Win32::*,
    WebMessageReceivedEventHandler,
};
use windows::{
    core::{PCWSTR, PWSTR},
    Win32::Foundation::{E_POINTER, HWND, RECT},
    Win32::UI::WindowsAndMessaging::GetClientRect,
};

use super::hwnd;
use crate::{
    events::{self, decode_page_message, EngineEvent, PageCommand},
    info,
    pages::build_page,
    paths,
    platform::{RenderRequest, Renderer, RendererKind, WindowHandle},
    utility::{path_to_file_url, to_wstring},
    warn, DEBUG_NAME,
};

pub fn create_environment() -> Result<ICoreWebView2Environment, String> {
    let (tx, rx) = mpsc::channel();

    CreateCoreWebView2EnvironmentCompletedHandler::wait_for_async_operation(
        Box::new(|handler| unsafe {
            CreateCoreWebView2Environment(&handler).map_err(webview2_com::Error::WindowsError)
        }),
        Box::new(move |error_code, environment| {
            error_code?;
            let _ = tx.send(environment.ok_or_else(|| windows::core::Error::from(E_POINTER)));
            Ok(())
        }),
    )
    .map_err(|e| format!("CreateCoreWebView2Environment failed: {e:?}"))?;

    rx.recv()
        .map_err(|_| "Failed to receive WebView2 environment".to_string())?
        .map_err(|e| format!("WebView2 environment unavailable: {e:?}"))
}

fn create_controller(
    environment: &ICoreWebView2Environment,
    window: HWND,
) -> Result<ICoreWebView2Controller, String> {
    let (tx, rx) = mpsc::channel();
    let environment = environment.clone();

    CreateCoreWebView2ControllerCompletedHandler::wait_for_async_operation(
        Box::new(move |handler| unsafe {
            environment
                .CreateCoreWebView2Controller(window, &handler)
                .map_err(webview2_com::Error::WindowsError)
        }),
        Box::new(move |error_code, controller| {
            error_code?;
            let _ = tx.send(controller.ok_or_else(|| windows::core::Error::from(E_POINTER)));
            Ok(())
        }),
    )
    .map_err(|e| format!("CreateCoreWebView2Controller failed: {e:?}"))?;

    rx.recv()
        .map_err(|_| "Failed to receive WebView2 controller".to_string())?
        .map_err(|e| format!("WebView2 controller unavailable: {e:?}"))
}

/// A WebView2 controller filling one surface window. Image, video and
/// stream content are all HTML pages generated per load.
pub struct WebViewRenderer {
    controller: ICoreWebView2Controller,
    webview: ICoreWebView2,
    message_token: i64,
    page_path: PathBuf,
}

impl WebViewRenderer {
    pub fn create(
        environment: &ICoreWebView2Environment,
        window: WindowHandle,
        kind: RendererKind,
        generation: u64,
    ) -> Result<Self, String> {
        let hwnd = hwnd(window);
        let controller = create_controller(environment, hwnd)?;

        let mut client = RECT::default();
        unsafe {
            GetClientRect(hwnd, &mut client)
                .map_err(|e| format!("GetClientRect failed: {e:?}"))?;
            controller
                .SetBounds(RECT {
                    left: 0,
                    top: 0,
                    right: client.right - client.left,
                    bottom: client.bottom - client.top,
                })
                .map_err(|e| format!("WebView2 SetBounds failed: {e:?}"))?;
            controller
                .SetIsVisible(true)
                .map_err(|e| format!("WebView2 SetIsVisible failed: {e:?}"))?;
        }

        let webview = unsafe {
            controller
                .CoreWebView2()
                .map_err(|e| format!("WebView2 CoreWebView2 unavailable: {e:?}"))?
        };

        let message_token = subscribe_page_messages(&webview, generation)?;
        let page_path = paths::page_dir().join(format!(
            "page_{}_{generation}.html",
            std::process::id()
        ));

        info!(
            "[{DEBUG_NAME}][WEBVIEW] {:?} renderer ready for hwnd={:?} generation={generation}",
            kind, hwnd
        );

        Ok(Self {
            controller,
            webview,
            message_token,
            page_path,
        })
    }
}

/// Page notifications are stamped with `generation` and queued for the UI
/// loop.
fn subscribe_page_messages(webview: &ICoreWebView2, generation: u64) -> Result<i64, String> {
    let handler = WebMessageReceivedEventHandler::create(Box::new(move |_sender, args| {
        if let Some(args) = args {
            let mut raw = PWSTR::null();
            unsafe { args.TryGetWebMessageAsString(&mut raw)? };
            let message = webview2_com::take_pwstr(raw);
            if let Some(event) = decode_page_message(&message) {
                events::post(EngineEvent::Playback { generation, event });
            }
        }
        Ok(())
    }));

    let mut token = 0i64;
    unsafe { webview.add_WebMessageReceived(&handler, &mut token) }
        .map_err(|e| format!("WebView2 add_WebMessageReceived failed: {e:?}"))?;
    Ok(token)
}

impl Renderer for WebViewRenderer {
    fn load(&mut self, request: &RenderRequest) -> Result<(), String> {
        let html = build_page(request);
        if let Some(dir) = self.page_path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("cannot create {}: {e}", dir.display()))?;
        }
        fs::write(&self.page_path, html)
            .map_err(|e| format!("cannot write {}: {e}", self.page_path.display()))?;

        let url = path_to_file_url(&self.page_path);
        let url_wide = to_wstring(&url);
        unsafe { self.webview.Navigate(PCWSTR(url_wide.as_ptr())) }
            .map_err(|e| format!("WebView2 Navigate failed for '{url}': {e:?}"))
    }

    fn command(&mut self, command: PageCommand) -> Result<(), String> {
        let payload = to_wstring(&command.to_json());
        unsafe { self.webview.PostWebMessageAsJson(PCWSTR(payload.as_ptr())) }
            .map_err(|e| format!("WebView2 PostWebMessageAsJson failed: {e:?}"))
    }
}

impl Drop for WebViewRenderer {
    fn drop(&mut self) {
        unsafe {
            let _ = self.webview.remove_WebMessageReceived(self.message_token);
            let _ = self.controller.Close();
        }
        if self.page_path.exists() {
            if let Err(e) = fs::remove_file(&self.page_path) {
                warn!(
                    "[{DEBUG_NAME}][WEBVIEW] could not remove {}: {e}",
                    self.page_path.display()
                );
            }
        }
    }
}
