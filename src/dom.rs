//! Model of the hosting document: the page's own window realm, the
//! registry of attached (invisible) frames, and the timer queue used for
//! deferred teardown.
//!
//! Everything here is thread local. Engine values are not `Send`, so a
//! context and every environment derived from it live and die on the
//! thread that created them.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use boa_engine::{Context, JsResult, JsValue, Source};
use tracing::debug;

struct FrameElement {
    id: u64,
    name: String,
}

struct Timer {
    due: Instant,
    callback: Box<dyn FnOnce()>,
}

thread_local! {
    static WINDOW: RefCell<Option<Context>> = const { RefCell::new(None) };
    static FRAMES: RefCell<Vec<FrameElement>> = const { RefCell::new(Vec::new()) };
    static TIMERS: RefCell<Vec<Timer>> = const { RefCell::new(Vec::new()) };
}

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Runs `f` against the page's own window realm, creating it on first use.
///
/// The window borrow is held for the duration of `f`; code evaluated in it
/// must not reenter `with_window`.
pub fn with_window<R>(f: impl FnOnce(&mut Context) -> R) -> R {
    WINDOW.with(|cell| {
        let mut slot = cell.borrow_mut();
        let window = slot.get_or_insert_with(Context::default);
        f(window)
    })
}

/// Evaluates `code` in the window realm.
pub fn eval_in_window(code: &str) -> JsResult<JsValue> {
    with_window(|window| window.eval(Source::from_bytes(code)))
}

/// Drains the window realm's microtask queue (promise reactions).
pub fn run_window_jobs() {
    with_window(|window| {
        let _ = window.run_jobs();
    });
}

/// Registers a frame under a fresh id and returns it.
pub(crate) fn attach_frame(name: &str) -> u64 {
    let id = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    FRAMES.with(|frames| {
        frames.borrow_mut().push(FrameElement {
            id,
            name: name.to_string(),
        });
    });
    debug!(frame = id, name, "frame attached");
    id
}

pub(crate) fn detach_frame(id: u64) {
    FRAMES.with(|frames| frames.borrow_mut().retain(|frame| frame.id != id));
    debug!(frame = id, "frame detached");
}

/// Number of frames currently attached to the document.
pub fn frame_count() -> usize {
    FRAMES.with(|frames| frames.borrow().len())
}

/// Names of the currently attached frames, oldest first.
pub fn frame_names() -> Vec<String> {
    FRAMES.with(|frames| frames.borrow().iter().map(|f| f.name.clone()).collect())
}

/// Schedules a callback to fire once `delay` has elapsed, the next time
/// the timer queue is drained.
pub(crate) fn schedule(delay: Duration, callback: Box<dyn FnOnce()>) {
    let due = Instant::now() + delay;
    TIMERS.with(|timers| timers.borrow_mut().push(Timer { due, callback }));
    debug!(?delay, "teardown timer scheduled");
}

/// Fires every timer whose deadline has passed. Callbacks run outside the
/// queue borrow, so they may schedule further timers.
pub fn run_due_timers() {
    loop {
        let due = TIMERS.with(|timers| {
            let mut timers = timers.borrow_mut();
            let now = Instant::now();
            timers
                .iter()
                .position(|timer| timer.due <= now)
                .map(|index| timers.remove(index))
        });
        match due {
            Some(timer) => (timer.callback)(),
            None => break,
        }
    }
}
