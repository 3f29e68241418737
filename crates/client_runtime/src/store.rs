//! The long-lived state container: snapshot ownership, dispatch, subscriptions, and the
//! reducer-emitted effect queue.
//!
//! The store is single-threaded by construction (`Rc`/`RefCell`). Build one explicitly and pass
//! it by reference; tests create as many isolated stores as they need.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    rc::Rc,
};

use leptos::logging;

use crate::{
    error::StoreError,
    model::{ClientConfig, StoreState},
    reducer::{reduce_store, RuntimeEffect, StoreAction},
};

type Listener = Rc<dyn Fn(&Rc<StoreState>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Handle returned by [`Store::subscribe`].
pub struct Subscription(u64);

struct StoreInner {
    state: Rc<StoreState>,
    version: u64,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    effects: Vec<RuntimeEffect>,
}

/// Marks a dispatch in progress. Dropping it, including while a listener unwinds, reopens
/// the store and discards anything still queued.
struct DispatchGuard<'a> {
    store: &'a Store,
}

impl<'a> DispatchGuard<'a> {
    fn enter(store: &'a Store) -> Self {
        store.dispatching.set(true);
        Self { store }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let dropped = std::mem::take(&mut *self.store.pending.borrow_mut());
        if !dropped.is_empty() {
            logging::warn!(
                "store dispatch aborted; discarding {} queued action(s)",
                dropped.len()
            );
        }
        self.store.dispatching.set(false);
    }
}

/// Owner of the current [`StoreState`] snapshot.
pub struct Store {
    inner: RefCell<StoreInner>,
    pending: RefCell<VecDeque<StoreAction>>,
    dispatching: Cell<bool>,
}

impl Default for Store {
    fn default() -> Self {
        Self::with_state(StoreState::default())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Store")
            .field("version", &inner.version)
            .field("listeners", &inner.listeners.len())
            .field("queued_effects", &inner.effects.len())
            .finish()
    }
}

impl Store {
    pub fn new(config: ClientConfig) -> Self {
        Self::with_state(StoreState::with_config(config))
    }

    pub fn with_state(state: StoreState) -> Self {
        Self {
            inner: RefCell::new(StoreInner {
                state: Rc::new(state),
                version: 0,
                listeners: Vec::new(),
                next_listener_id: 1,
                effects: Vec::new(),
            }),
            pending: RefCell::new(VecDeque::new()),
            dispatching: Cell::new(false),
        }
    }

    /// Current snapshot. Holding it never blocks later dispatches.
    pub fn get_state(&self) -> Rc<StoreState> {
        Rc::clone(&self.inner.borrow().state)
    }

    /// Number of commits so far. Dispatches that change nothing do not count.
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Applies `action`, commits the resulting snapshot, and notifies subscribers.
    ///
    /// A dispatch that leaves every slice untouched commits nothing and notifies nobody.
    /// Dispatches issued from inside a listener are queued and applied, in order, once the
    /// current commit has finished notifying; their errors are logged rather than returned.
    ///
    /// # Errors
    ///
    /// Returns the reducer's [`StoreError`]; the previous snapshot stays current.
    pub fn dispatch(&self, action: StoreAction) -> Result<(), StoreError> {
        if self.dispatching.get() {
            self.pending.borrow_mut().push_back(action);
            return Ok(());
        }

        let _guard = DispatchGuard::enter(self);
        let result = self.commit(action);
        loop {
            let next = self.pending.borrow_mut().pop_front();
            let Some(queued) = next else {
                break;
            };
            if let Err(err) = self.commit(queued) {
                logging::warn!("queued store dispatch rejected: {err}");
            }
        }
        result
    }

    fn commit(&self, action: StoreAction) -> Result<(), StoreError> {
        let current = self.get_state();
        let (next, effects) = reduce_store(&current, action)?;

        let changed = !next.same_slices(&current);
        let (snapshot, listeners) = {
            let mut inner = self.inner.borrow_mut();
            inner.effects.extend(effects);
            if !changed {
                return Ok(());
            }
            let snapshot = Rc::new(next);
            inner.state = Rc::clone(&snapshot);
            inner.version += 1;
            let listeners = inner
                .listeners
                .iter()
                .map(|(_, listener)| Rc::clone(listener))
                .collect::<Vec<_>>();
            (snapshot, listeners)
        };

        for listener in listeners {
            listener(&snapshot);
        }
        Ok(())
    }

    /// Registers `listener` to run after every commit, in subscription order.
    pub fn subscribe(&self, listener: impl Fn(&Rc<StoreState>) + 'static) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Rc::new(listener)));
        Subscription(id)
    }

    /// Removes a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.listeners.len();
        inner.listeners.retain(|(id, _)| *id != subscription.0);
        inner.listeners.len() != before
    }

    /// Drains queued side-effect intents in emission order.
    pub fn take_effects(&self) -> Vec<RuntimeEffect> {
        std::mem::take(&mut self.inner.borrow_mut().effects)
    }
}
