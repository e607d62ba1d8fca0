use std::cell::Cell;
use std::rc::Rc;

use chunk_store::prelude::*;

fn store() -> EntityStore {
    let mut store = EntityStore::new();
    store.register_component("pos", Box::new(VectorComponent::new(2)));
    store.register_component("vel", Box::new(VectorComponent::new(2)));
    store
}

fn counter() -> (Rc<Cell<u32>>, impl FnMut()) {
    let count = Rc::new(Cell::new(0u32));
    let clone = count.clone();
    (count, move || clone.set(clone.get() + 1))
}

#[test]
fn test_master_signal_emits_once_per_commit() {
    let mut store = store();
    let (fired, listener) = counter();
    let signal = store.signal();
    let _sub = signal.subscribe(listener);

    let e = store.create();
    store.set_component(e, "pos", [0.0f32, 0.0]).unwrap();
    assert_eq!(fired.get(), 0);

    store.commit();
    assert_eq!(fired.get(), 1);

    // nothing changed since: the version did not advance, no emission
    store.commit();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_component_signal_ignores_unrelated_mutations() {
    let mut store = store();
    let e = store.create();
    store.set_component(e, "pos", [0.0f32, 0.0]).unwrap();
    store.set_component(e, "vel", [0.0f32, 0.0]).unwrap();
    store.commit();

    let (fired, listener) = counter();
    let pos_signal = store.component_signal(e, "pos").unwrap();
    let _sub = pos_signal.subscribe(listener);

    store.set_component(e, "vel", [1.0f32, 0.0]).unwrap();
    store.commit();
    assert_eq!(fired.get(), 0);

    store.set_component(e, "pos", [1.0f32, 0.0]).unwrap();
    store.commit();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_component_signal_ignores_other_entities() {
    let mut store = store();
    let a = store.create();
    let b = store.create();
    store.set_component(a, "pos", [0.0f32, 0.0]).unwrap();
    store.set_component(b, "pos", [0.0f32, 0.0]).unwrap();
    store.commit();

    let (fired, listener) = counter();
    let _sub = store
        .component_signal(a, "pos")
        .unwrap()
        .subscribe(listener);

    store.set_component(b, "pos", [5.0f32, 5.0]).unwrap();
    store.commit();
    assert_eq!(fired.get(), 0);
}

#[test]
fn test_mapper_caches_signals_per_component() {
    let mut store = store();
    let e = store.create();
    store.commit();

    let first = store.component_signal(e, "pos").unwrap();
    let _sub = first.subscribe(|| {});
    // the cached signal is the same underlying channel
    let second = store.component_signal(e, "pos").unwrap();
    assert_eq!(second.listener_count(), 1);
}

#[test]
fn test_component_signal_collapses_writes_per_commit() {
    let mut store = store();
    let e = store.create();
    store.set_component(e, "pos", [0.0f32, 0.0]).unwrap();
    store.commit();

    let (fired, listener) = counter();
    let _sub = store
        .component_signal(e, "pos")
        .unwrap()
        .subscribe(listener);

    // three writes in one tick collapse into one notification
    store.set_component(e, "pos", [1.0f32, 0.0]).unwrap();
    store.set_component(e, "pos", [2.0f32, 0.0]).unwrap();
    store.set_component(e, "pos", [3.0f32, 0.0]).unwrap();
    store.commit();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_atom_signals_after_commit() {
    let mut store = store();
    let atom = store.atom(&AtomDescriptor::new("selection", Value::Int(0)));
    assert_eq!(atom.state(), Value::Int(0));

    let (fired, listener) = counter();
    let _sub = atom.signal().subscribe(listener);

    atom.set_state(7i64);
    assert_eq!(atom.state(), Value::Int(7));
    // deferred: nothing until the commit barrier
    assert_eq!(fired.get(), 0);

    store.commit();
    assert_eq!(fired.get(), 1);

    store.commit();
    assert_eq!(fired.get(), 1);
}

#[test]
fn test_atom_is_found_not_recreated() {
    let mut store = store();
    let atom = store.atom(&AtomDescriptor::new("selection", Value::Int(0)));
    atom.set_state(3i64);

    let again = store.atom(&AtomDescriptor::new("selection", Value::Int(0)));
    assert_eq!(again.state(), Value::Int(3));
    assert_eq!(again.name(), "selection");
}

#[test]
fn test_atom_not_woken_by_entity_mutations() {
    let mut store = store();
    let atom = store.atom(&AtomDescriptor::new("selection", Value::Int(0)));
    let (fired, listener) = counter();
    let _sub = atom.signal().subscribe(listener);

    let e = store.create();
    store.set_component(e, "pos", [0.0f32, 0.0]).unwrap();
    store.commit();
    assert_eq!(fired.get(), 0);
}

#[test]
fn test_unsubscribed_consumer_detaches_from_master() {
    let mut store = store();
    let e = store.create();
    store.commit();

    let master = store.signal();
    let derived = store.component_signal(e, "pos").unwrap();
    assert_eq!(master.listener_count(), 0);

    let sub = derived.subscribe(|| {});
    assert_eq!(master.listener_count(), 1);
    drop(sub);
    assert_eq!(master.listener_count(), 0);
}

#[test]
fn test_two_consumers_one_upstream_subscription() {
    let mut store = store();
    let e = store.create();
    store.set_component(e, "pos", [0.0f32, 0.0]).unwrap();
    store.commit();

    let master = store.signal();
    let derived = store.component_signal(e, "pos").unwrap();
    let (fired_a, listener_a) = counter();
    let (fired_b, listener_b) = counter();
    let _a = derived.subscribe(listener_a);
    let _b = derived.subscribe(listener_b);
    assert_eq!(master.listener_count(), 1);

    store.set_component(e, "pos", [1.0f32, 0.0]).unwrap();
    store.commit();
    assert_eq!(fired_a.get(), 1);
    assert_eq!(fired_b.get(), 1);
}
