//! E2E: producer/consumer over a cooperative store.
//!
//! Producers are round-robin scheduled state machines; the consumer waits with
//! `observe_variable`, and its yield primitive runs one scheduler round.
//!
//! Validates:
//! 1. Every wake reports the tag of the producer that notified last.
//! 2. The observer callback sees every value, in order, with the right tag.
//! 3. `Created` is delivered once, then only `Changed`.
//! 4. Releasing the store while a consumer waits ends the wait with `Disabled`.

#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use dmlayer_core::{Callback, DataLayer, NotifyKind, StoreError, UserTag};

const VARIABLE: &str = "THREAD/PRODUCE/VALUE";

/// One logical producer: publishes `0..rounds` under its own tag.
struct Producer {
    id: UserTag,
    next: u64,
    rounds: u64,
}

impl Producer {
    fn step(&mut self, store: &DataLayer) -> bool {
        if self.next >= self.rounds {
            return false;
        }
        store.set_number(VARIABLE, self.id, self.next).unwrap();
        self.next += 1;
        true
    }
}

/// Round-robin over producers; each round steps the next producer that still
/// has work.
struct Scheduler {
    producers: Vec<Producer>,
    cursor: usize,
}

impl Scheduler {
    fn new(count: u64, rounds: u64) -> Self {
        Self {
            producers: (1..=count)
                .map(|id| Producer {
                    id,
                    next: 0,
                    rounds,
                })
                .collect(),
            cursor: 0,
        }
    }

    /// Run one scheduler turn. Returns `false` once every producer is done.
    fn round(&mut self, store: &DataLayer) -> bool {
        for _ in 0..self.producers.len() {
            let index = self.cursor;
            self.cursor = (self.cursor + 1) % self.producers.len();
            if self.producers[index].step(store) {
                return true;
            }
        }
        false
    }
}

#[test]
fn consumer_sees_every_produced_value() {
    let store = DataLayer::new();
    store.create_variable(VARIABLE).unwrap();

    let seen: Rc<RefCell<Vec<(UserTag, u64, NotifyKind)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let consumer = Callback::new(move |store, n| {
        let value = store.number(n.name).unwrap();
        sink.borrow_mut().push((n.user_tag, value, n.kind));
    });
    store.add_observer(VARIABLE, &consumer).unwrap();

    let scheduler = RefCell::new(Scheduler::new(3, 10));
    let producer_store = store.clone();
    let mut wakes = Vec::new();
    loop {
        let mut idle = false;
        let result = store.observe_variable(VARIABLE, &mut || {
            if !scheduler.borrow_mut().round(&producer_store) {
                idle = true;
                // Nothing left to produce; end the wait with a final signal.
                producer_store.notify_only(VARIABLE, 0).unwrap();
            }
        });
        let tag = result.unwrap();
        if idle {
            assert_eq!(tag, 0);
            break;
        }
        wakes.push(tag);
    }

    // Producers 1, 2, 3 take turns; each wake follows exactly one publish.
    let expected_tags: Vec<UserTag> = (0..30).map(|i| (i % 3) + 1).collect();
    assert_eq!(wakes, expected_tags);

    let seen = seen.borrow();
    let publishes: Vec<_> = seen
        .iter()
        .filter(|(_, _, kind)| *kind != NotifyKind::Notify)
        .collect();
    assert_eq!(publishes.len(), 30);
    assert_eq!(publishes[0].2, NotifyKind::Created);
    assert!(
        publishes[1..]
            .iter()
            .all(|(_, _, kind)| *kind == NotifyKind::Changed)
    );
    for (i, (tag, value, _)) in publishes.iter().enumerate() {
        assert_eq!(*tag, (i as u64 % 3) + 1);
        assert_eq!(*value, i as u64 / 3);
    }

    let info = store.variable(VARIABLE).unwrap();
    assert_eq!(info.event_counter, 31);
    assert_eq!(info.user_tag, 0);
}

#[test]
fn release_during_wait_fails_the_waiter() {
    let store = DataLayer::new();
    store.create_variable("x").unwrap();

    let deleted = Rc::new(RefCell::new(0usize));
    let deleted_sink = Rc::clone(&deleted);
    store
        .add_observer(
            "x",
            &Callback::new(move |_, n| {
                if n.kind == NotifyKind::Deleted {
                    *deleted_sink.borrow_mut() += 1;
                }
            }),
        )
        .unwrap();

    let other = store.clone();
    let mut turns = 0;
    let err = store
        .observe_variable("x", &mut || {
            turns += 1;
            if turns == 4 {
                other.release().unwrap();
            }
        })
        .unwrap_err();

    assert_eq!(err, StoreError::Disabled);
    assert_eq!(turns, 4);
    assert_eq!(*deleted.borrow(), 1);
}

#[test]
fn listing_reflects_registration_order() {
    let store = DataLayer::new();
    store.set_number("first", 1, 1).unwrap();
    store.set_binary("second", 2, b"\x01\x02").unwrap();
    store.create_variable("third").unwrap();

    let listing = store.variables().unwrap();
    let names: Vec<&str> = listing.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, ["third", "second", "first"]);

    let rows: Vec<String> = listing.iter().map(ToString::to_string).collect();
    assert!(rows[0].contains("none"));
    assert!(rows[1].contains("binary"));
    assert!(rows[1].contains("\t2/"));
    assert!(rows[2].contains("number"));
}
