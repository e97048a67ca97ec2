//! In-memory platform used by the unit tests.

use std::{
    cell::{Ref, RefCell, RefMut},
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    process,
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use crate::{
    events::PageCommand,
    platform::{
        RenderRequest, Renderer, RendererKind, ScreenRect, ShellWindows, SurfacePlatform, TimerId,
        TimerScheduler, WallpaperStore, WindowHandle,
    },
    shell_locator::{ICON_VIEW_CLASS, LAYER_CLASS, PROGMAN_CLASS},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellLayout {
    /// Layer is the `WorkerW` after the icon host; spawned on request.
    Classic,
    /// Icons live in `Progman`, layer is its `WorkerW` child.
    ProgmanChild,
    NoLayer,
    NoProgman,
    AccessDenied,
}

impl ShellLayout {
    pub const PROGMAN: WindowHandle = WindowHandle(1);
    pub const ICON_HOST: WindowHandle = WindowHandle(10);
    pub const CLASSIC_LAYER: WindowHandle = WindowHandle(11);
    pub const CHILD_LAYER: WindowHandle = WindowHandle(12);
    pub const ICON_VIEW: WindowHandle = WindowHandle(20);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCall {
    Reparent(WindowHandle, WindowHandle),
    EmbeddedStyle(WindowHandle),
    SendToBottom(WindowHandle),
    DegradedStyle(WindowHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RendererCall {
    Load(RenderRequest),
    Command(PageCommand),
}

#[derive(Debug)]
pub struct FakeState {
    pub layout: ShellLayout,
    pub layer_spawned: bool,
    pub layer_requests: u32,
    pub settle_calls: Vec<Duration>,
    pub fail_layer_request: bool,

    next_window: isize,
    pub created: Vec<WindowHandle>,
    pub alive: HashSet<WindowHandle>,
    pub visible: HashSet<WindowHandle>,
    pub destroyed: Vec<WindowHandle>,
    pub surface_calls: Vec<SurfaceCall>,
    pub waits: Vec<Duration>,
    pub fail_reparent: bool,
    pub fail_send_to_bottom: bool,
    pub fail_destroy: bool,
    pub fail_renderer_create: bool,
    pub fail_renderer_load: bool,

    /// Renderers handed out, by generation.
    pub renderers_created: Vec<(u64, RendererKind)>,
    /// Calls stamped with the generation the renderer was created for.
    pub renderer_calls: Vec<(u64, RendererCall)>,

    pub wallpaper: String,
    pub wallpaper_sets: Vec<String>,
    pub registry_wallpaper: Option<String>,
    pub fill_style_set: bool,
    pub fail_set_wallpaper: bool,
    pub existing_paths: HashSet<PathBuf>,

    next_timer: usize,
    pub armed_timers: Vec<TimerId>,
    pub timer_intervals: Vec<Duration>,
}

impl FakeState {
    fn new(layout: ShellLayout) -> Self {
        Self {
            layout,
            layer_spawned: false,
            layer_requests: 0,
            settle_calls: Vec::new(),
            fail_layer_request: false,
            next_window: 100,
            created: Vec::new(),
            alive: HashSet::new(),
            visible: HashSet::new(),
            destroyed: Vec::new(),
            surface_calls: Vec::new(),
            waits: Vec::new(),
            fail_reparent: false,
            fail_send_to_bottom: false,
            fail_destroy: false,
            fail_renderer_create: false,
            fail_renderer_load: false,
            renderers_created: Vec::new(),
            renderer_calls: Vec::new(),
            wallpaper: String::new(),
            wallpaper_sets: Vec::new(),
            registry_wallpaper: None,
            fill_style_set: false,
            fail_set_wallpaper: false,
            existing_paths: HashSet::new(),
            next_timer: 1,
            armed_timers: Vec::new(),
            timer_intervals: Vec::new(),
        }
    }

    pub fn loads(&self, generation: u64) -> Vec<RenderRequest> {
        self.renderer_calls
            .iter()
            .filter(|(g, _)| *g == generation)
            .filter_map(|(_, call)| match call {
                RendererCall::Load(request) => Some(request.clone()),
                RendererCall::Command(_) => None,
            })
            .collect()
    }

    pub fn commands(&self, generation: u64, command: PageCommand) -> usize {
        self.renderer_calls
            .iter()
            .filter(|(g, call)| *g == generation && *call == RendererCall::Command(command))
            .count()
    }

    /// (window, class) pairs in Z-order.
    fn top_levels(&self) -> Vec<(WindowHandle, &'static str)> {
        match self.layout {
            ShellLayout::Classic if self.layer_spawned => vec![
                (ShellLayout::ICON_HOST, LAYER_CLASS),
                (ShellLayout::CLASSIC_LAYER, LAYER_CLASS),
                (ShellLayout::PROGMAN, PROGMAN_CLASS),
            ],
            ShellLayout::Classic => vec![
                (ShellLayout::ICON_HOST, LAYER_CLASS),
                (ShellLayout::PROGMAN, PROGMAN_CLASS),
            ],
            ShellLayout::ProgmanChild | ShellLayout::NoLayer => {
                vec![(ShellLayout::PROGMAN, PROGMAN_CLASS)]
            }
            ShellLayout::NoProgman | ShellLayout::AccessDenied => Vec::new(),
        }
    }

    fn children(&self, parent: WindowHandle) -> Vec<(WindowHandle, &'static str)> {
        match (self.layout, parent) {
            (ShellLayout::Classic, ShellLayout::ICON_HOST) => {
                vec![(ShellLayout::ICON_VIEW, ICON_VIEW_CLASS)]
            }
            (ShellLayout::ProgmanChild, ShellLayout::PROGMAN) => vec![
                (ShellLayout::ICON_VIEW, ICON_VIEW_CLASS),
                (ShellLayout::CHILD_LAYER, LAYER_CLASS),
            ],
            (ShellLayout::NoLayer, ShellLayout::PROGMAN) => {
                vec![(ShellLayout::ICON_VIEW, ICON_VIEW_CLASS)]
            }
            _ => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct FakePlatform {
    state: Rc<RefCell<FakeState>>,
}

impl FakePlatform {
    pub const SCREEN: ScreenRect = ScreenRect {
        left: -1920,
        top: 0,
        width: 3840,
        height: 1080,
    };

    pub fn with_layout(layout: ShellLayout) -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeState::new(layout))),
        }
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, FakeState> {
        self.state.borrow_mut()
    }

    pub fn add_existing_path(&self, path: impl Into<PathBuf>) {
        self.state_mut().existing_paths.insert(path.into());
    }

    /// Simulates the window disappearing underneath us (explorer restart).
    pub fn kill_window(&self, window: WindowHandle) {
        self.state_mut().alive.remove(&window);
    }

    pub fn renderer(&self, generation: u64) -> Box<dyn Renderer> {
        Box::new(FakeRenderer {
            generation,
            state: Rc::clone(&self.state),
        })
    }
}

impl ShellWindows for FakePlatform {
    fn find_top_level(&mut self, class: &str) -> Result<Option<WindowHandle>, String> {
        let state = self.state();
        if state.layout == ShellLayout::AccessDenied {
            return Err("access denied (0x80070005)".to_string());
        }
        Ok(state
            .top_levels()
            .into_iter()
            .find(|(_, c)| *c == class)
            .map(|(w, _)| w))
    }

    fn top_level_windows(&mut self) -> Result<Vec<WindowHandle>, String> {
        Ok(self.state().top_levels().into_iter().map(|(w, _)| w).collect())
    }

    fn find_window_after(
        &mut self,
        parent: Option<WindowHandle>,
        after: Option<WindowHandle>,
        class: &str,
    ) -> Result<Option<WindowHandle>, String> {
        let state = self.state();
        let windows = match parent {
            Some(parent) => state.children(parent),
            None => state.top_levels(),
        };
        let start = match after {
            Some(after) => match windows.iter().position(|(w, _)| *w == after) {
                Some(index) => index + 1,
                None => return Ok(None),
            },
            None => 0,
        };
        Ok(windows[start..]
            .iter()
            .find(|(_, c)| *c == class)
            .map(|(w, _)| *w))
    }

    fn request_layer(&mut self, _progman: WindowHandle, _timeout: Duration) -> Result<(), String> {
        let mut state = self.state_mut();
        state.layer_requests += 1;
        state.layer_spawned = true;
        if state.fail_layer_request {
            return Err("timed out".to_string());
        }
        Ok(())
    }

    fn settle(&mut self, delay: Duration) {
        self.state_mut().settle_calls.push(delay);
    }
}

impl SurfacePlatform for FakePlatform {
    fn virtual_screen(&self) -> ScreenRect {
        Self::SCREEN
    }

    fn create_surface_window(&mut self, _bounds: ScreenRect) -> Result<WindowHandle, String> {
        let mut state = self.state_mut();
        state.next_window += 1;
        let window = WindowHandle(state.next_window);
        state.created.push(window);
        state.alive.insert(window);
        Ok(window)
    }

    fn create_renderer(
        &mut self,
        _window: WindowHandle,
        kind: RendererKind,
        generation: u64,
    ) -> Result<Box<dyn Renderer>, String> {
        if self.state().fail_renderer_create {
            return Err("WebView2 runtime missing".to_string());
        }
        self.state_mut().renderers_created.push((generation, kind));
        Ok(Box::new(FakeRenderer {
            generation,
            state: Rc::clone(&self.state),
        }))
    }

    fn reparent(&mut self, window: WindowHandle, parent: WindowHandle) -> Result<(), String> {
        let mut state = self.state_mut();
        if state.fail_reparent {
            return Err("SetParent failed".to_string());
        }
        state.surface_calls.push(SurfaceCall::Reparent(window, parent));
        Ok(())
    }

    fn apply_embedded_style(&mut self, window: WindowHandle) -> Result<(), String> {
        self.state_mut().surface_calls.push(SurfaceCall::EmbeddedStyle(window));
        Ok(())
    }

    fn send_to_bottom(&mut self, window: WindowHandle) -> Result<(), String> {
        let mut state = self.state_mut();
        state.surface_calls.push(SurfaceCall::SendToBottom(window));
        if state.fail_send_to_bottom {
            return Err("SetWindowPos failed".to_string());
        }
        Ok(())
    }

    fn apply_degraded_style(&mut self, window: WindowHandle) -> Result<(), String> {
        self.state_mut().surface_calls.push(SurfaceCall::DegradedStyle(window));
        Ok(())
    }

    fn show(&mut self, window: WindowHandle) -> Result<(), String> {
        self.state_mut().visible.insert(window);
        Ok(())
    }

    fn is_window_alive(&self, window: WindowHandle) -> bool {
        self.state().alive.contains(&window)
    }

    fn destroy_window(&mut self, window: WindowHandle) -> Result<(), String> {
        let mut state = self.state_mut();
        state.alive.remove(&window);
        state.visible.remove(&window);
        if state.fail_destroy {
            return Err("DestroyWindow failed".to_string());
        }
        state.destroyed.push(window);
        Ok(())
    }

    fn wait(&mut self, delay: Duration) {
        self.state_mut().waits.push(delay);
    }
}

impl WallpaperStore for FakePlatform {
    fn current_wallpaper(&self) -> Result<Option<String>, String> {
        let wallpaper = self.state().wallpaper.clone();
        Ok((!wallpaper.is_empty()).then_some(wallpaper))
    }

    fn registry_wallpaper(&self) -> Result<Option<String>, String> {
        Ok(self.state().registry_wallpaper.clone())
    }

    fn set_fill_style(&mut self) -> Result<(), String> {
        self.state_mut().fill_style_set = true;
        Ok(())
    }

    fn set_wallpaper(&mut self, path: &str) -> Result<(), String> {
        let mut state = self.state_mut();
        if state.fail_set_wallpaper {
            return Err("SystemParametersInfoW failed".to_string());
        }
        state.wallpaper = path.to_string();
        state.wallpaper_sets.push(path.to_string());
        Ok(())
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.state().existing_paths.contains(path)
    }
}

impl TimerScheduler for FakePlatform {
    fn arm_timer(&mut self, interval: Duration) -> Result<TimerId, String> {
        let mut state = self.state_mut();
        let id = TimerId(state.next_timer);
        state.next_timer += 1;
        state.armed_timers.push(id);
        state.timer_intervals.push(interval);
        Ok(id)
    }

    fn disarm_timer(&mut self, id: TimerId) {
        self.state_mut().armed_timers.retain(|t| *t != id);
    }
}

struct FakeRenderer {
    generation: u64,
    state: Rc<RefCell<FakeState>>,
}

impl Renderer for FakeRenderer {
    fn load(&mut self, request: &RenderRequest) -> Result<(), String> {
        let mut state = self.state.borrow_mut();
        state
            .renderer_calls
            .push((self.generation, RendererCall::Load(request.clone())));
        if state.fail_renderer_load {
            return Err("navigation failed".to_string());
        }
        Ok(())
    }

    fn command(&mut self, command: PageCommand) -> Result<(), String> {
        self.state
            .borrow_mut()
            .renderer_calls
            .push((self.generation, RendererCall::Command(command)));
        Ok(())
    }
}

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_dir() -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!("livewall-tests-{}-{n}", process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn temp_media(name: &str, bytes: &[u8]) -> PathBuf {
    let path = temp_dir().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

/// Writes a small real image; the format follows the extension.
pub fn temp_image(name: &str) -> PathBuf {
    let path = temp_dir().join(name);
    image::RgbImage::from_pixel(8, 8, image::Rgb([30, 60, 90]))
        .save(&path)
        .unwrap();
    path
}

/// Writes a real animated GIF with one frame per delay.
pub fn temp_gif(name: &str, delays_ms: &[u32]) -> PathBuf {
    let path = temp_dir().join(name);
    let frames = delays_ms.iter().map(|ms| {
        image::Frame::from_parts(
            image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 40, 40, 255])),
            0,
            0,
            image::Delay::from_numer_denom_ms(*ms, 1),
        )
    });
    let mut encoder = image::codecs::gif::GifEncoder::new(fs::File::create(&path).unwrap());
    encoder.encode_frames(frames).unwrap();
    drop(encoder);
    path
}
