// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Push-based invalidation signals.
//!
//! A [`Signal`] is a multicast listener set with activation hooks fired on
//! the 0→1 and 1→0 listener transitions, so derived signals attach to their
//! upstream only while somebody is actually observing them. An
//! [`UpstreamSignal`] filters upstream emissions through a monotonically
//! increasing version accessor and re-emits at most once per strictly
//! greater version observed. The graph is single-threaded by design.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::version::Versions;

/// Identifier for a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<RefCell<dyn FnMut()>>;

#[derive(Default)]
struct SignalInner {
    next_id: u64,
    listeners: Vec<(u64, Callback)>,
    on_activate: Option<Callback>,
    on_deactivate: Option<Callback>,
}

/// Multicast invalidation channel.
///
/// Cloning a `Signal` clones the handle, not the listener set.
#[derive(Clone, Default)]
pub struct Signal {
    inner: Rc<RefCell<SignalInner>>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a signal with activation hooks already installed.
    pub fn with_hooks(
        on_activate: impl FnMut() + 'static,
        on_deactivate: impl FnMut() + 'static,
    ) -> Self {
        let signal = Self::new();
        signal.set_hooks(on_activate, on_deactivate);
        signal
    }

    /// Install activation hooks. `on_activate` fires exactly when the
    /// listener set transitions from zero to one, `on_deactivate` on the
    /// reverse transition.
    pub fn set_hooks(
        &self,
        on_activate: impl FnMut() + 'static,
        on_deactivate: impl FnMut() + 'static,
    ) {
        let mut inner = self.inner.borrow_mut();
        inner.on_activate = Some(Rc::new(RefCell::new(on_activate)));
        inner.on_deactivate = Some(Rc::new(RefCell::new(on_deactivate)));
    }

    /// Register a listener.
    pub fn add(&self, listener: impl FnMut() + 'static) -> ListenerId {
        let (id, hook) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Rc::new(RefCell::new(listener))));
            let hook = if inner.listeners.len() == 1 {
                inner.on_activate.clone()
            } else {
                None
            };
            (id, hook)
        };
        if let Some(hook) = hook {
            (hook.borrow_mut())();
        }
        ListenerId(id)
    }

    /// Remove a listener; unknown ids are ignored.
    pub fn remove(&self, id: ListenerId) {
        let hook = {
            let mut inner = self.inner.borrow_mut();
            let before = inner.listeners.len();
            inner.listeners.retain(|(listener, _)| *listener != id.0);
            if before > inner.listeners.len() && inner.listeners.is_empty() {
                inner.on_deactivate.clone()
            } else {
                None
            }
        };
        if let Some(hook) = hook {
            (hook.borrow_mut())();
        }
    }

    /// Register a listener that detaches when the guard is dropped.
    pub fn subscribe(&self, listener: impl FnMut() + 'static) -> Subscription {
        Subscription {
            signal: self.clone(),
            id: self.add(listener),
        }
    }

    /// Invoke every listener registered at the time of the call.
    pub fn emit(&self) {
        let listeners: Vec<Callback> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            (listener.borrow_mut())();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    pub fn downgrade(&self) -> WeakSignal {
        WeakSignal {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// Weak handle to a signal; breaks reference cycles in derived graphs.
#[derive(Clone)]
pub struct WeakSignal {
    inner: Weak<RefCell<SignalInner>>,
}

impl WeakSignal {
    pub fn upgrade(&self) -> Option<Signal> {
        self.inner.upgrade().map(|inner| Signal { inner })
    }
}

/// Listener registration released deterministically on drop.
pub struct Subscription {
    signal: Signal,
    id: ListenerId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.signal.remove(self.id);
    }
}

/// A signal derived from an upstream signal plus a monotonically increasing
/// version accessor.
///
/// While observed, it holds a subscription to the upstream; each upstream
/// emission is forwarded at most once per strictly greater version, which
/// collapses N upstream emissions into at most one downstream notification
/// and suppresses notification entirely when the tracked quantity has not
/// advanced. Unobserved, it is fully detached from the upstream.
pub struct UpstreamSignal {
    signal: Signal,
}

impl UpstreamSignal {
    pub fn new(upstream: Signal, version: impl Fn() -> u64 + 'static) -> Self {
        let version = Rc::new(version);
        let last_seen = Rc::new(Cell::new(0u64));
        let guard: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let signal = Signal::new();
        let weak = signal.downgrade();

        let on_activate = {
            let upstream = upstream.clone();
            let version = version.clone();
            let last_seen = last_seen.clone();
            let guard = guard.clone();
            move || {
                last_seen.set((*version)());
                let subscription = upstream.subscribe({
                    let version = version.clone();
                    let last_seen = last_seen.clone();
                    let weak = weak.clone();
                    move || {
                        let current = (*version)();
                        if current > last_seen.get() {
                            last_seen.set(current);
                            if let Some(signal) = weak.upgrade() {
                                signal.emit();
                            }
                        }
                    }
                });
                *guard.borrow_mut() = Some(subscription);
            }
        };
        let on_deactivate = {
            let guard = guard.clone();
            move || {
                guard.borrow_mut().take();
            }
        };
        signal.set_hooks(on_activate, on_deactivate);

        Self { signal }
    }

    /// The derived signal consumers subscribe to.
    pub fn signal(&self) -> Signal {
        self.signal.clone()
    }
}

/// Lazily creates and caches one derived signal per component index for a
/// single entity, so a consumer can observe "this component on this entity"
/// without being woken by unrelated mutations.
#[derive(Clone)]
pub struct ComponentSignalMapper {
    inner: Rc<MapperInner>,
}

struct MapperInner {
    entity: u32,
    upstream: Signal,
    versions: Rc<Versions>,
    signals: RefCell<FxHashMap<u32, UpstreamSignal>>,
}

impl ComponentSignalMapper {
    pub(crate) fn new(entity: u32, upstream: Signal, versions: Rc<Versions>) -> Self {
        Self {
            inner: Rc::new(MapperInner {
                entity,
                upstream,
                versions,
                signals: RefCell::new(FxHashMap::default()),
            }),
        }
    }

    /// The derived signal for one component index.
    pub fn signal(&self, component: usize) -> Signal {
        let component = component as u32;
        let mut signals = self.inner.signals.borrow_mut();
        signals
            .entry(component)
            .or_insert_with(|| {
                let versions = self.inner.versions.clone();
                let entity = self.inner.entity;
                UpstreamSignal::new(self.inner.upstream.clone(), move || {
                    versions.component(entity, component)
                })
            })
            .signal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_hooks_fire_on_transitions() {
        let activated = Rc::new(Cell::new(0u32));
        let deactivated = Rc::new(Cell::new(0u32));
        let signal = Signal::with_hooks(
            {
                let activated = activated.clone();
                move || activated.set(activated.get() + 1)
            },
            {
                let deactivated = deactivated.clone();
                move || deactivated.set(deactivated.get() + 1)
            },
        );

        let a = signal.add(|| {});
        assert_eq!(activated.get(), 1);
        let b = signal.add(|| {});
        assert_eq!(activated.get(), 1);

        signal.remove(a);
        assert_eq!(deactivated.get(), 0);
        signal.remove(b);
        assert_eq!(deactivated.get(), 1);

        // removing an unknown id must not re-fire the hook
        signal.remove(b);
        assert_eq!(deactivated.get(), 1);
    }

    #[test]
    fn test_emit_reaches_every_listener() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0u32));
        let _a = signal.subscribe({
            let count = count.clone();
            move || count.set(count.get() + 1)
        });
        let _b = signal.subscribe({
            let count = count.clone();
            move || count.set(count.get() + 1)
        });
        signal.emit();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_subscription_detaches_on_drop() {
        let signal = Signal::new();
        {
            let _guard = signal.subscribe(|| {});
            assert_eq!(signal.listener_count(), 1);
        }
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn test_upstream_filters_by_version() {
        let upstream = Signal::new();
        let version = Rc::new(Cell::new(0u64));
        let derived = UpstreamSignal::new(upstream.clone(), {
            let version = version.clone();
            move || version.get()
        });

        let fired = Rc::new(Cell::new(0u32));
        let signal = derived.signal();
        let _sub = signal.subscribe({
            let fired = fired.clone();
            move || fired.set(fired.get() + 1)
        });

        // version unchanged: emission is suppressed
        upstream.emit();
        assert_eq!(fired.get(), 0);

        // one version advance, several upstream emissions: one notification
        version.set(3);
        upstream.emit();
        upstream.emit();
        assert_eq!(fired.get(), 1);

        version.set(4);
        upstream.emit();
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_upstream_attaches_only_while_observed() {
        let upstream = Signal::new();
        let derived = UpstreamSignal::new(upstream.clone(), || 0);
        assert_eq!(upstream.listener_count(), 0);

        let guard = derived.signal().subscribe(|| {});
        assert_eq!(upstream.listener_count(), 1);

        drop(guard);
        assert_eq!(upstream.listener_count(), 0);
    }

    #[test]
    fn test_changes_before_subscription_are_not_replayed() {
        let upstream = Signal::new();
        let version = Rc::new(Cell::new(7u64));
        let derived = UpstreamSignal::new(upstream.clone(), {
            let version = version.clone();
            move || version.get()
        });

        let fired = Rc::new(Cell::new(0u32));
        let _sub = derived.signal().subscribe({
            let fired = fired.clone();
            move || fired.set(fired.get() + 1)
        });

        // the version was already 7 when the subscription attached
        upstream.emit();
        assert_eq!(fired.get(), 0);
    }
}
