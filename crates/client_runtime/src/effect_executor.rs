//! Runtime effect-queue executor for reducer-emitted side effects.

use client_host::PrefsStore;
use leptos::logging;

use crate::{persistence, reducer::RuntimeEffect, store::Store};

/// Host hook for effects that touch the view layer.
pub trait EffectHost {
    /// Moves keyboard focus into the window `id`.
    fn focus_window_input(&self, id: &str);
}

/// Host that has no view layer to focus.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessEffectHost;

impl EffectHost for HeadlessEffectHost {
    fn focus_window_input(&self, _id: &str) {}
}

/// Drains the store's effect queue and runs each effect in emission order.
///
/// Persistence failures are logged and do not stop the drain. Effects queued while draining
/// (by nested dispatches) are picked up before returning. Returns how many effects ran.
pub async fn execute_effects<S, H>(
    store: &Store,
    prefs: &S,
    host: &H,
    auth_token: Option<&str>,
) -> usize
where
    S: PrefsStore + ?Sized,
    H: EffectHost + ?Sized,
{
    let mut executed = 0;
    loop {
        let queued = store.take_effects();
        if queued.is_empty() {
            return executed;
        }
        for effect in queued {
            run_effect(store, prefs, host, auth_token, &effect).await;
            executed += 1;
        }
    }
}

async fn run_effect<S, H>(
    store: &Store,
    prefs: &S,
    host: &H,
    auth_token: Option<&str>,
    effect: &RuntimeEffect,
) where
    S: PrefsStore + ?Sized,
    H: EffectHost + ?Sized,
{
    match effect {
        RuntimeEffect::PersistWindowLayout => {
            let state = store.get_state();
            if let Err(err) = persistence::persist_window_layout(prefs, &state.windows).await {
                logging::warn!("persist window layout failed: {err}");
            }
        }
        RuntimeEffect::PersistSession => {
            let state = store.get_state();
            if let Err(err) = persistence::persist_session(prefs, &state, auth_token).await {
                logging::warn!("persist session failed: {err}");
            }
        }
        RuntimeEffect::FocusWindowInput(id) => host.focus_window_input(id),
    }
}
