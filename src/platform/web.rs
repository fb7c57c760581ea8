//! Browser shell
//!
//! Wires the simulation to the page: animation frames drive the frame
//! driver, a timer drives housekeeping, the relay socket feeds ingestion.
//! Everything runs on the page's single thread.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, EventTarget, MessageEvent, MouseEvent, WebSocket};

use super::canvas::{CanvasSurface, SurfaceError};
use crate::feed::{ReconnectBackoff, RelayMessage};
use crate::housekeeping;
use crate::ingest::IngestionAdapter;
use crate::settings::Settings;
use crate::sim::explosion::detonate_at;
use crate::sim::{FrameDriver, SimulationState};

/// Canvas element id
pub const CANVAS_ID: &str = "canvas";

/// Everything the callbacks share
struct App {
    state: SimulationState,
    driver: FrameDriver,
    adapter: IngestionAdapter,
    surface: CanvasSurface,
}

impl App {
    fn on_relay_text(&mut self, text: &str) {
        match RelayMessage::decode(text) {
            Ok(RelayMessage::Stats(stats)) => self.state.stats = stats,
            Ok(RelayMessage::Candles(candles)) => self.driver.chart.set_candles(candles),
            Ok(RelayMessage::Candle(candle)) => self.driver.chart.push_candle(candle),
            Ok(message) => {
                let now = js_sys::Date::now();
                self.adapter
                    .admit(message.into_events(), &mut self.state, now);
            }
            Err(e) => log::warn!("{}", e),
        }
    }
}

/// DOM listener owned by the shell so `stop` can detach it
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

/// Relay socket and its handlers
struct FeedLink {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl FeedLink {
    fn detach(&self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
    }
}

/// Running visualization; `stop` tears it down
pub struct WebShell {
    app: Rc<RefCell<App>>,
    stopped: Cell<bool>,
    raf_id: Cell<Option<i32>>,
    interval_id: Cell<Option<i32>>,
    frame_callback: RefCell<Option<Closure<dyn FnMut(f64)>>>,
    sweep_callback: RefCell<Option<Closure<dyn FnMut()>>>,
    feed_url: Option<String>,
    feed: RefCell<Option<FeedLink>>,
    backoff: RefCell<ReconnectBackoff>,
    reconnect_id: Cell<Option<i32>>,
    reconnect_callback: RefCell<Option<Closure<dyn FnMut()>>>,
    listeners: RefCell<Vec<Listener>>,
}

impl WebShell {
    fn schedule_frame(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Some(callback) = self.frame_callback.borrow().as_ref() {
            let id = window
                .request_animation_frame(callback.as_ref().unchecked_ref())
                .ok();
            self.raf_id.set(id);
        }
    }

    /// Reopen the relay after the current backoff delay
    fn schedule_reconnect(&self) {
        if self.stopped.get() || self.reconnect_id.get().is_some() {
            return;
        }
        let Some(window) = web_sys::window() else {
            return;
        };
        let delay = self.backoff.borrow_mut().next_delay_ms();
        if let Some(callback) = self.reconnect_callback.borrow().as_ref() {
            match window.set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                delay as i32,
            ) {
                Ok(id) => {
                    log::info!("Reconnecting to relay in {} ms", delay);
                    self.reconnect_id.set(Some(id));
                }
                Err(e) => log::warn!("Reconnect timer unavailable: {:?}", e),
            }
        }
    }

    fn listen(&self, target: &EventTarget, kind: &'static str, callback: Closure<dyn FnMut(Event)>) {
        let function: &js_sys::Function = callback.as_ref().unchecked_ref();
        if let Err(e) = target.add_event_listener_with_callback(kind, function) {
            log::warn!("Cannot listen for {}: {:?}", kind, e);
            return;
        }
        self.listeners.borrow_mut().push(Listener {
            target: target.clone(),
            kind,
            callback,
        });
    }

    /// Cancel the pending frame, timers and reconnect, close the feed and
    /// detach page listeners. Must not be called from inside the frame
    /// callback.
    pub fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        if let Some(window) = web_sys::window() {
            if let Some(id) = self.raf_id.take() {
                let _ = window.cancel_animation_frame(id);
            }
            if let Some(id) = self.interval_id.take() {
                window.clear_interval_with_handle(id);
            }
            if let Some(id) = self.reconnect_id.take() {
                window.clear_timeout_with_handle(id);
            }
        }
        if let Some(link) = self.feed.borrow_mut().take() {
            link.detach();
            let _ = link.socket.close();
        }
        for listener in self.listeners.borrow_mut().drain(..) {
            let _ = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.callback.as_ref().unchecked_ref(),
            );
        }
        // Dropping the callbacks breaks the shell <-> closure cycles
        self.frame_callback.borrow_mut().take();
        self.sweep_callback.borrow_mut().take();
        self.reconnect_callback.borrow_mut().take();
        log::info!("Liquidation Rain stopped");
    }
}

/// Relay endpoint: `data-feed` on the canvas, else `/ws` on this host
fn feed_url(surface: &CanvasSurface) -> Option<String> {
    if let Some(url) = surface.canvas().get_attribute("data-feed") {
        return Some(url);
    }
    let location = web_sys::window()?.location();
    let scheme = match location.protocol().ok()?.as_str() {
        "https:" => "wss",
        _ => "ws",
    };
    Some(format!("{}://{}/ws", scheme, location.host().ok()?))
}

/// Start the visualization on `#canvas`
pub fn run(settings: Settings) -> Result<Rc<WebShell>, SurfaceError> {
    let mut surface = CanvasSurface::attach(CANVAS_ID)?;
    let viewport = surface.fit();

    let mut settings = settings;
    if settings.seed == 0 {
        settings.seed = js_sys::Date::now() as u64;
    }
    log::info!(
        "Liquidation Rain starting ({}x{}, seed {})",
        viewport.width,
        viewport.height,
        settings.seed
    );

    let adapter = IngestionAdapter::new(js_sys::Date::now(), &settings);
    let sweep_interval = settings.housekeeping_interval_ms;
    let feed_url = feed_url(&surface);
    let app = Rc::new(RefCell::new(App {
        state: SimulationState::new(settings, viewport),
        driver: FrameDriver::new(),
        adapter,
        surface,
    }));

    let shell = Rc::new(WebShell {
        app,
        stopped: Cell::new(false),
        raf_id: Cell::new(None),
        interval_id: Cell::new(None),
        frame_callback: RefCell::new(None),
        sweep_callback: RefCell::new(None),
        feed_url,
        feed: RefCell::new(None),
        backoff: RefCell::new(ReconnectBackoff::default()),
        reconnect_id: Cell::new(None),
        reconnect_callback: RefCell::new(None),
        listeners: RefCell::new(Vec::new()),
    });

    start_frames(&shell);
    start_housekeeping(&shell, sweep_interval);
    start_feed(&shell);
    setup_input_handlers(&shell);

    log::info!("Liquidation Rain running");
    Ok(shell)
}

fn start_frames(shell: &Rc<WebShell>) {
    let this = Rc::clone(shell);
    *shell.frame_callback.borrow_mut() = Some(Closure::new(move |now: f64| {
        if this.stopped.get() {
            return;
        }
        {
            let mut app = this.app.borrow_mut();
            let App {
                state,
                driver,
                surface,
                ..
            } = &mut *app;
            driver.frame(state, now, surface);
        }
        this.schedule_frame();
    }));
    shell.schedule_frame();
}

fn start_housekeeping(shell: &Rc<WebShell>, interval_ms: f64) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let app = Rc::clone(&shell.app);
    let callback = Closure::<dyn FnMut()>::new(move || {
        let mut app = app.borrow_mut();
        let App { state, adapter, .. } = &mut *app;
        let now = state.clock_ms;
        housekeeping::sweep(state, adapter, now);
    });
    match window.set_interval_with_callback_and_timeout_and_arguments_0(
        callback.as_ref().unchecked_ref(),
        interval_ms as i32,
    ) {
        Ok(id) => shell.interval_id.set(Some(id)),
        Err(e) => log::warn!("Housekeeping timer unavailable: {:?}", e),
    }
    *shell.sweep_callback.borrow_mut() = Some(callback);
}

fn start_feed(shell: &Rc<WebShell>) {
    if shell.feed_url.is_none() {
        log::warn!("No relay endpoint; running without a feed");
        return;
    }
    let weak = Rc::downgrade(shell);
    *shell.reconnect_callback.borrow_mut() = Some(Closure::new(move || {
        if let Some(shell) = weak.upgrade() {
            shell.reconnect_id.set(None);
            connect_feed(&shell);
        }
    }));
    connect_feed(shell);
}

fn connect_feed(shell: &Rc<WebShell>) {
    if shell.stopped.get() {
        return;
    }
    let Some(url) = shell.feed_url.as_deref() else {
        return;
    };
    if let Some(old) = shell.feed.borrow_mut().take() {
        old.detach();
        let _ = old.socket.close();
    }
    let socket = match WebSocket::new(url) {
        Ok(socket) => socket,
        Err(e) => {
            log::warn!("Cannot open relay {}: {:?}", url, e);
            shell.schedule_reconnect();
            return;
        }
    };
    log::info!("Connecting to relay {}", url);

    let on_open = {
        let weak = Rc::downgrade(shell);
        Closure::<dyn FnMut(_)>::new(move |_event: Event| {
            if let Some(shell) = weak.upgrade() {
                shell.backoff.borrow_mut().reset();
                log::info!("Relay connected");
            }
        })
    };
    socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));

    let on_message = {
        let app = Rc::clone(&shell.app);
        Closure::<dyn FnMut(_)>::new(move |event: MessageEvent| {
            if let Some(text) = event.data().as_string() {
                app.borrow_mut().on_relay_text(&text);
            }
        })
    };
    socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

    let on_close = {
        let weak: Weak<WebShell> = Rc::downgrade(shell);
        Closure::<dyn FnMut(_)>::new(move |event: CloseEvent| {
            log::warn!("Relay closed ({}): {}", event.code(), event.reason());
            if let Some(shell) = weak.upgrade() {
                shell.schedule_reconnect();
            }
        })
    };
    socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

    *shell.feed.borrow_mut() = Some(FeedLink {
        socket,
        _on_open: on_open,
        _on_message: on_message,
        _on_close: on_close,
    });
}

fn setup_input_handlers(shell: &Rc<WebShell>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    // Click to detonate
    {
        let app = Rc::clone(&shell.app);
        let canvas = shell.app.borrow().surface.canvas().clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |event: Event| {
            let Some(event) = event.dyn_ref::<MouseEvent>() else {
                return;
            };
            let mut app = app.borrow_mut();
            let point = app
                .surface
                .to_local(event.client_x() as f64, event.client_y() as f64);
            if let Some(id) = detonate_at(&mut app.state, point) {
                log::debug!("Clicked {}", id);
            }
        });
        shell.listen(&canvas, "click", closure);
    }

    // Pause while the tab is hidden
    {
        let app = Rc::clone(&shell.app);
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
            let mut app = app.borrow_mut();
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                app.driver.pause();
            } else {
                app.driver.resume();
            }
        });
        shell.listen(&document, "visibilitychange", closure);
    }

    // Follow the canvas size
    {
        let app = Rc::clone(&shell.app);
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
            let mut app = app.borrow_mut();
            let viewport = app.surface.fit();
            app.state.resize(viewport);
        });
        shell.listen(&window, "resize", closure);
    }

    // Tear down on navigation away. Leaked rather than owned by the shell,
    // since `stop` would otherwise drop it mid-call; it only holds a Weak.
    {
        let weak = Rc::downgrade(shell);
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: Event| {
            if let Some(shell) = weak.upgrade() {
                shell.stop();
            }
        });
        let _ = window.add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
        closure.forget();
    }
}
