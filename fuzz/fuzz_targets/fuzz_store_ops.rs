#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use dmlayer_core::{Callback, DataLayer, StoreConfig, StoreError, ValueKind};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Create { name: Vec<u8> },
    SetNumber { name: Vec<u8>, tag: u64, value: u64 },
    SetBinary { name: Vec<u8>, tag: u64, bytes: Vec<u8> },
    Clear { name: Vec<u8>, tag: u64 },
    Notify { name: Vec<u8>, tag: u64 },
    AddObserver { name: Vec<u8>, slot: u8 },
    RemoveObserver { name: Vec<u8>, slot: u8 },
    Toggle { name: Vec<u8>, slot: u8, enabled: bool },
    Observe { name: Vec<u8>, quiet: u8 },
    Release,
}

const SLOTS: usize = 4;

fuzz_target!(|ops: Vec<FuzzOp>| {
    let store = DataLayer::with_config(StoreConfig::default().with_max_binary_len(256));
    let hits = Rc::new(Cell::new(0usize));
    let callbacks: Vec<Callback> = (0..SLOTS)
        .map(|_| {
            let hits = Rc::clone(&hits);
            Callback::new(move |store, n| {
                hits.set(hits.get() + 1);
                // Reentrant reads must never panic.
                let _ = store.variable_type(n.name);
            })
        })
        .collect();
    let slot = |i: u8| &callbacks[usize::from(i) % SLOTS];

    for op in ops.into_iter().take(256) {
        let before = hits.get();
        let invoked = match op {
            FuzzOp::Create { name } => store.create_variable(name).map(|_| 0),
            FuzzOp::SetNumber { name, tag, value } => {
                let result = store.set_number(&name, tag, value);
                if result.is_ok() {
                    assert_eq!(store.number(&name), Ok(value));
                }
                result
            }
            FuzzOp::SetBinary { name, tag, bytes } => {
                let result = store.set_binary(&name, tag, &bytes);
                match &result {
                    Ok(_) => assert_eq!(store.binary(&name).as_deref(), Ok(bytes.as_slice())),
                    Err(StoreError::AllocationFailure { .. }) => {
                        assert_eq!(store.variable_type(&name), Ok(ValueKind::None));
                    }
                    Err(_) => {}
                }
                result
            }
            FuzzOp::Clear { name, tag } => store.clear_variable(name, tag),
            FuzzOp::Notify { name, tag } => store.notify_only(name, tag),
            FuzzOp::AddObserver { name, slot: i } => store.add_observer(name, slot(i)).map(|()| 0),
            FuzzOp::RemoveObserver { name, slot: i } => {
                store.remove_observer(name, slot(i)).map(|()| 0)
            }
            FuzzOp::Toggle { name, slot: i, enabled } => {
                store.set_observer_enabled(name, slot(i), enabled).map(|()| 0)
            }
            FuzzOp::Observe { name, quiet } => {
                let producer = store.clone();
                let mut yields = 0u8;
                let target = name.clone();
                store
                    .observe_variable(&name, &mut || {
                        if yields == quiet {
                            let _ = producer.notify_only(&target, u64::from(quiet));
                        }
                        yields = yields.saturating_add(1);
                    })
                    .map(|_| hits.get() - before)
            }
            // Teardown notices are not counted by release.
            FuzzOp::Release => store.release().map(|()| hits.get() - before),
        };
        if let Ok(count) = invoked {
            assert_eq!(hits.get() - before, count);
        }
        if !store.is_enabled() {
            assert!(matches!(store.variables(), Err(StoreError::Disabled)));
        }
    }
});
