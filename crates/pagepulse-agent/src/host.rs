//! The contract between the agent and its hosting environment.
//!
//! The agent never reaches into globals or patches host APIs: the host hands
//! it a clock and a page observer at init, and forwards lifecycle and
//! navigation [`Signal`]s as they happen.

use chrono::{DateTime, Utc};

/// Time source. Injected so dwell and debounce accounting are deterministic
/// under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Point-in-time description of the hosting page. Captured once per enqueued
/// event so common fields reflect enqueue time, not flush time.
#[derive(Debug, Clone, Default)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    pub referrer: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    /// True when the page is not currently visible to the user.
    pub hidden: bool,
}

/// Host-supplied view of the current page.
pub trait PageObserver: Send + Sync {
    fn snapshot(&self) -> PageSnapshot;
}

/// User-interaction classes that refresh dwell freshness metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Pointer,
    Scroll,
    Key,
    Touch,
}

/// Lifecycle and navigation signals the host forwards to
/// [`crate::agent::Agent::observe`].
///
/// `BeforeUnload` and `PageHide` are interchangeable leave signals — hosts
/// send whichever their device-class lifecycle produces. `RouteChange` must
/// be sent *before* the new location is committed so the departing page is
/// measured under its own URL.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    VisibilityChanged { hidden: bool },
    Interaction(InteractionKind),
    BeforeUnload,
    PageHide,
    /// An SPA push-style navigation to `url`.
    RouteChange { url: String },
    /// Back/forward traversal.
    HistoryPop,
    /// Fragment navigation to `url` (hash routing mode).
    HashChange { url: String },
}
