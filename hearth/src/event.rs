//! Synchronous publish/subscribe primitive.
//!
//! `Observable` is the event channel apps and the environment bridge use to
//! announce transitions. Dispatch is synchronous and in subscription order:
//! `trigger` returns only after every handler ran (or one of them failed).
//!
//! # Dispatch Rules
//!
//! - Many handlers per event; each `on` call adds one.
//! - Handlers are invoked on a snapshot of the subscriber list, so a handler
//!   added during dispatch first fires on the next `trigger`.
//! - No lock is held while a handler runs. Handlers may re-enter the
//!   observable (or anything else) freely.
//! - The first failing handler stops dispatch and its error is returned.
//!
//! # Example
//!
//! ```
//! use hearth::event::Observable;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Door { Opened }
//!
//! let door: Observable<Door, str, String> = Observable::new();
//! door.on(Door::Opened, |who| {
//!     assert_eq!(who, "alice");
//!     Ok(())
//! });
//! door.trigger(Door::Opened, "alice").unwrap();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::BoxError;

/// Shared handler signature.
type Handler<P: ?Sized, Err> = Arc<dyn Fn(&P) -> Result<(), Err> + Send + Sync>;

/// A per-instance event namespace.
///
/// `E` names the events, `P` is the payload passed by reference to every
/// handler and `Err` is what a failing handler returns.
pub struct Observable<E, P: ?Sized, Err = BoxError> {
    handlers: RwLock<HashMap<E, Vec<Handler<P, Err>>>>,
}

impl<E, P, Err> Observable<E, P, Err>
where
    E: Copy + Eq + Hash,
    P: ?Sized,
{
    /// Create an observable with no subscribers.
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribe `handler` to `event`.
    pub fn on<F>(&self, event: E, handler: F)
    where
        F: Fn(&P) -> Result<(), Err> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(event)
            .or_default()
            .push(Arc::new(handler));
    }

    /// Invoke every handler subscribed to `event`, in subscription order.
    pub fn trigger(&self, event: E, payload: &P) -> Result<(), Err> {
        let snapshot: Vec<Handler<P, Err>> = match self.handlers.read().get(&event) {
            Some(handlers) => handlers.clone(),
            None => return Ok(()),
        };

        for handler in snapshot {
            handler(payload)?;
        }
        Ok(())
    }

    /// Number of handlers subscribed to `event`.
    pub fn listener_count(&self, event: E) -> usize {
        self.handlers.read().get(&event).map_or(0, Vec::len)
    }
}

impl<E, P, Err> Default for Observable<E, P, Err>
where
    E: Copy + Eq + Hash,
    P: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, P: ?Sized, Err> fmt::Debug for Observable<E, P, Err>
where
    E: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        let mut map = f.debug_map();
        for (event, list) in handlers.iter() {
            map.entry(event, &list.len());
        }
        map.finish()
    }
}

/// Events an app announces while it transitions.
///
/// The four initialization events fire exactly once each, in declaration
/// order. `End` fires at most once, after the end callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// Before the setup queue is drained.
    SetupBefore,
    /// After every setup callback ran.
    SetupAfter,
    /// Before the start callback.
    StartBefore,
    /// After the start callback.
    StartAfter,
    /// After the end callback of an unloading app.
    End,
}

impl LifecycleEvent {
    /// Every event, in firing order.
    pub const ALL: [LifecycleEvent; 5] = [
        LifecycleEvent::SetupBefore,
        LifecycleEvent::SetupAfter,
        LifecycleEvent::StartBefore,
        LifecycleEvent::StartAfter,
        LifecycleEvent::End,
    ];

    /// Conventional event name (`setup:before`, `end`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::SetupBefore => "setup:before",
            LifecycleEvent::SetupAfter => "setup:after",
            LifecycleEvent::StartBefore => "start:before",
            LifecycleEvent::StartAfter => "start:after",
            LifecycleEvent::End => "end",
        }
    }

    /// Parse a conventional event name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable carrying an app's lifecycle events.
pub type LifecycleEvents = Observable<LifecycleEvent, Config, BoxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Ping {
        A,
        B,
    }

    #[test]
    fn test_handlers_run_in_subscription_order() {
        let obs: Observable<Ping, u32, String> = Observable::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in 0..3 {
            let seen = Arc::clone(&seen);
            obs.on(Ping::A, move |value| {
                seen.lock().push((tag, *value));
                Ok(())
            });
        }

        obs.trigger(Ping::A, &7).unwrap();
        assert_eq!(*seen.lock(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_events_are_namespaced() {
        let obs: Observable<Ping, (), String> = Observable::new();
        let hits = Arc::new(Mutex::new(0));
        let h = Arc::clone(&hits);
        obs.on(Ping::A, move |_| {
            *h.lock() += 1;
            Ok(())
        });

        obs.trigger(Ping::B, &()).unwrap();
        assert_eq!(*hits.lock(), 0);
        assert_eq!(obs.listener_count(Ping::A), 1);
        assert_eq!(obs.listener_count(Ping::B), 0);
    }

    #[test]
    fn test_failure_stops_dispatch() {
        let obs: Observable<Ping, (), String> = Observable::new();
        let reached = Arc::new(Mutex::new(false));

        obs.on(Ping::A, |_| Err("first".to_string()));
        let r = Arc::clone(&reached);
        obs.on(Ping::A, move |_| {
            *r.lock() = true;
            Ok(())
        });

        assert_eq!(obs.trigger(Ping::A, &()), Err("first".to_string()));
        assert!(!*reached.lock());
    }

    #[test]
    fn test_handler_added_during_dispatch_waits_for_next_trigger() {
        let obs: Arc<Observable<Ping, (), String>> = Arc::new(Observable::new());
        let late_hits = Arc::new(Mutex::new(0));

        let inner_obs = Arc::clone(&obs);
        let inner_hits = Arc::clone(&late_hits);
        obs.on(Ping::A, move |_| {
            let hits = Arc::clone(&inner_hits);
            inner_obs.on(Ping::B, move |_| {
                *hits.lock() += 1;
                Ok(())
            });
            Ok(())
        });

        obs.trigger(Ping::A, &()).unwrap();
        assert_eq!(obs.listener_count(Ping::B), 1);
        obs.trigger(Ping::B, &()).unwrap();
        assert_eq!(*late_hits.lock(), 1);
    }

    #[test]
    fn test_lifecycle_event_names() {
        assert_eq!(LifecycleEvent::SetupBefore.to_string(), "setup:before");
        assert_eq!(
            LifecycleEvent::from_name("start:after"),
            Some(LifecycleEvent::StartAfter)
        );
        assert_eq!(LifecycleEvent::from_name("start"), None);
    }
}
