use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use pagepulse_core::config::{AgentConfig, InitOptions, RouterMode};
use pagepulse_core::dwell::DwellTracker;
use pagepulse_core::error::ConfigError;
use pagepulse_core::event::{BaseData, EventPayload, QueuedEvent};
use pagepulse_core::guard::LeaveGuard;
use pagepulse_core::identity::{self, KeyValueStore};

use crate::delivery::{DeliveryChannel, Transport};
use crate::host::{Clock, PageObserver, PageSnapshot, Signal};
use crate::queue::EventQueue;

/// Host-supplied collaborators handed to [`Agent::init`].
pub struct HostHooks {
    pub store: Arc<dyn KeyValueStore>,
    pub page: Arc<dyn PageObserver>,
    pub clock: Arc<dyn Clock>,
    pub transport: Arc<dyn Transport>,
}

/// Per-instance session bookkeeping. Mutated only under its mutex, inside
/// signal handlers — never held across a transmission.
struct SessionState {
    session_start_ms: i64,
    page_start_ms: i64,
    /// URL of the page currently being measured. For SPA navigations this is
    /// the agent's own record, advanced only after a leave is finalized, so
    /// the departing page is reported under its own URL.
    page_url: String,
    page_referrer: String,
    dwell: DwellTracker,
}

struct AgentInner {
    config: AgentConfig,
    visitor_id: String,
    session_id: String,
    session: Mutex<SessionState>,
    guard: Mutex<LeaveGuard>,
    queue: EventQueue,
    delivery: DeliveryChannel,
    page: Arc<dyn PageObserver>,
    clock: Arc<dyn Clock>,
}

/// A telemetry capture agent instance.
///
/// All state is owned by the instance — no globals — so independent agents
/// can coexist (one per embedded site, or per test). Construct with
/// [`Agent::init`] inside a Tokio runtime; dropping the agent stops its
/// background flush loop.
pub struct Agent {
    inner: Arc<AgentInner>,
    flush_task: JoinHandle<()>,
}

impl Agent {
    /// Validate `options`, resolve identity, snapshot initial page state, and
    /// start the interval flush loop.
    ///
    /// Configuration errors are fatal and leave nothing behind: identifiers
    /// are only read or persisted after validation passes.
    pub fn init(options: InitOptions, hooks: HostHooks) -> Result<Self, ConfigError> {
        let config = AgentConfig::resolve(options)?;

        let now = hooks.clock.now();
        let visitor_id = identity::get_or_create_visitor_id(hooks.store.as_ref(), now);
        let session_id = identity::get_or_create_session_id(hooks.store.as_ref(), now);

        let snapshot = hooks.page.snapshot();
        let now_ms = now.timestamp_millis();
        let session = SessionState {
            session_start_ms: now_ms,
            page_start_ms: now_ms,
            page_url: snapshot.url,
            page_referrer: snapshot.referrer,
            dwell: DwellTracker::new(now_ms, !snapshot.hidden),
        };

        let inner = Arc::new(AgentInner {
            delivery: DeliveryChannel::new(
                config.endpoint.clone(),
                config.debug,
                hooks.transport,
            ),
            queue: EventQueue::new(config.batch_size, config.delivery_mode),
            visitor_id,
            session_id,
            session: Mutex::new(session),
            guard: Mutex::new(LeaveGuard::new()),
            page: hooks.page,
            clock: hooks.clock,
            config,
        });

        debug!(
            app_id = %inner.config.app_id,
            session_id = %inner.session_id,
            visitor_id = %inner.visitor_id,
            "agent initialized"
        );

        let flush_task = spawn_flush_loop(&inner);
        Ok(Self { inner, flush_task })
    }

    /// Queue a custom interaction event. May trigger an immediate flush when
    /// the batch-size threshold is reached.
    pub async fn track_event(
        &self,
        category: &str,
        action: &str,
        label: Option<String>,
        value: Option<f64>,
    ) {
        self.inner
            .enqueue(EventPayload::Event {
                category: category.to_string(),
                action: action.to_string(),
                label,
                value,
            })
            .await;
    }

    /// Manual page-leave trigger. Idempotent per navigation: the debounce
    /// guard collapses this with any overlapping host signal.
    pub async fn track_page_leave(&self) {
        self.inner.leave().await;
    }

    /// Drain the queue and attempt delivery. Empty queue is a no-op; a failed
    /// batch returns to the front of the queue for the next cycle.
    pub async fn flush(&self) {
        self.inner.flush().await;
    }

    /// Forward a host lifecycle or navigation signal.
    pub async fn observe(&self, signal: Signal) {
        self.inner.observe(signal).await;
    }

    /// Number of events currently buffered.
    pub async fn pending_events(&self) -> usize {
        self.inner.queue.len().await
    }

    pub fn visitor_id(&self) -> &str {
        &self.inner.visitor_id
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    /// Stop the background flush loop and deliver anything still buffered.
    pub async fn shutdown(self) {
        self.flush_task.abort();
        self.inner.flush().await;
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        self.flush_task.abort();
    }
}

impl AgentInner {
    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn base_data(&self, snapshot: &PageSnapshot) -> BaseData {
        BaseData {
            app_id: self.config.app_id.clone(),
            screen_width: snapshot.screen_width,
            screen_height: snapshot.screen_height,
            viewport_width: snapshot.viewport_width,
            viewport_height: snapshot.viewport_height,
            user_agent: snapshot.user_agent.clone(),
            timestamp: self.clock.now(),
            session_id: self.session_id.clone(),
            visitor_id: self.visitor_id.clone(),
        }
    }

    async fn enqueue(&self, payload: EventPayload) {
        let snapshot = self.page.snapshot();
        let event = QueuedEvent {
            base: self.base_data(&snapshot),
            payload,
        };
        if self.queue.push(event).await {
            self.flush().await;
        }
    }

    async fn flush(&self) {
        let batch = self.queue.take_all().await;
        if batch.is_empty() {
            return;
        }
        if let Err(batch) = self.delivery.transmit(batch).await {
            self.queue.requeue_front(batch).await;
        }
    }

    async fn observe(&self, signal: Signal) {
        match signal {
            Signal::VisibilityChanged { hidden } => {
                let now_ms = self.now_ms();
                let mut session = self.session.lock().await;
                session.dwell.on_visibility_change(hidden, now_ms);
            }
            Signal::Interaction(_) => {
                let now_ms = self.now_ms();
                let mut session = self.session.lock().await;
                session.dwell.record_interaction(now_ms);
            }
            Signal::BeforeUnload | Signal::PageHide => {
                self.leave().await;
            }
            Signal::RouteChange { url } => {
                if self.route_tracking_enabled() {
                    self.leave().await;
                    self.advance_page(url).await;
                }
            }
            Signal::HistoryPop => {
                if self.route_tracking_enabled() {
                    self.leave().await;
                }
            }
            Signal::HashChange { url } => {
                if self.config.router_mode == RouterMode::Hash {
                    self.leave().await;
                    self.advance_page(url).await;
                }
            }
        }
    }

    fn route_tracking_enabled(&self) -> bool {
        self.config.auto_track_router && self.config.router_mode == RouterMode::History
    }

    /// Shift the referrer chain after a finalized SPA navigation: the page
    /// just left becomes the referrer of the one being entered.
    async fn advance_page(&self, url: String) {
        let mut session = self.session.lock().await;
        session.page_referrer = std::mem::replace(&mut session.page_url, url);
    }

    /// Finalize the current page if the debounce guard honors the request:
    /// compute dwell time, queue a pageview carrying it, reset dwell
    /// accounting, and force an immediate flush — the browsing context may be
    /// torn down before another cycle runs.
    async fn leave(&self) {
        let now = self.clock.now();
        let now_ms = now.timestamp_millis();
        {
            let mut guard = self.guard.lock().await;
            if !guard.should_track(now_ms) {
                debug!("page leave suppressed by debounce guard");
                return;
            }
        }

        let snapshot = self.page.snapshot();
        let payload = {
            let mut session = self.session.lock().await;
            let session_duration = session.dwell.dwell_ms(now_ms);
            debug!(
                session_start_ms = session.session_start_ms,
                page_start_ms = session.page_start_ms,
                session_duration,
                "page leave honored"
            );
            let payload = EventPayload::Pageview {
                session_duration,
                page_url: session.page_url.clone(),
                page_title: snapshot.title.clone(),
                page_referrer: session.page_referrer.clone(),
            };
            session.page_start_ms = now_ms;
            session.dwell.reset(now_ms);
            payload
        };

        let event = QueuedEvent {
            base: self.base_data(&snapshot),
            payload,
        };
        // Bypass batch gating: enqueue directly, then force the flush.
        self.queue.push(event).await;
        self.flush().await;
    }
}

/// Interval flush loop, bounding worst-case staleness of buffered events.
/// Holds only a weak reference so a dropped agent ends the loop.
fn spawn_flush_loop(inner: &Arc<AgentInner>) -> JoinHandle<()> {
    let weak = Arc::downgrade(inner);
    let interval = inner.config.flush_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; skip it so the loop waits a
        // full interval before its first flush.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(inner) = weak.upgrade() else { break };
            inner.flush().await;
        }
    })
}
