//! Producer/consumer scenarios.
//!
//! Producers publish an incrementing counter under their own tag. A consumer
//! observer reads every value back, and the consumer loop waits on the same
//! variable, logging which producer woke it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use dmlayer_core::{
    Callback, DataLayer, SharedCallback, SharedDataLayer, StoreConfig, StoreError, UserTag,
    VariableInfo,
};
use serde::Serialize;

use crate::error::{DemoError, Result};
use crate::scheduler::{Scheduler, Step, Task};

pub const VARIABLE: &str = "THREAD/PRODUCE/VALUE";

/// Tag of the final notify that ends the consumer loop. Producer ids start at 1.
pub const FINISHED: UserTag = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub producers: u64,
    pub rounds: u64,
    pub config: StoreConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub mode: &'static str,
    pub producers: u64,
    pub rounds: u64,
    /// Values seen by the observer callback, per producer id.
    pub consumed: BTreeMap<UserTag, u64>,
    /// Times the waiting consumer woke up.
    pub wakes: u64,
    pub variables: Vec<VariableInfo>,
}

impl Report {
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "mode={} producers={} rounds={} wakes={}\n",
            self.mode, self.producers, self.rounds, self.wakes
        );
        for (producer, count) in &self.consumed {
            out.push_str(&format!("producer {producer}: {count} values\n"));
        }
        for info in &self.variables {
            out.push_str(&format!("{info}\n"));
        }
        out
    }
}

fn validate(settings: &Settings) -> Result<()> {
    if settings.producers == 0 {
        return Err(DemoError::invalid("--producers must be at least 1"));
    }
    if settings.rounds == 0 {
        return Err(DemoError::invalid("--rounds must be at least 1"));
    }
    Ok(())
}

// ── Cooperative ─────────────────────────────────────────────────────────

struct Producer {
    name: String,
    id: UserTag,
    next: u64,
    rounds: u64,
}

impl Task for Producer {
    fn name(&self) -> &str {
        &self.name
    }

    fn step(&mut self, store: &DataLayer) -> Result<Step> {
        store.set_number(VARIABLE, self.id, self.next)?;
        self.next += 1;
        Ok(if self.next >= self.rounds {
            Step::Done
        } else {
            Step::Pending
        })
    }
}

/// Run producers and the consumer on one OS thread.
///
/// The consumer's yield primitive runs one scheduler round. When every
/// producer is done, the yield sends a [`FINISHED`] notify to end the wait.
pub fn run_cooperative(settings: &Settings) -> Result<Report> {
    validate(settings)?;
    let store = DataLayer::with_config(settings.config);
    store.create_variable(VARIABLE)?;

    let consumed: Rc<RefCell<BTreeMap<UserTag, u64>>> = Rc::default();
    let sink = Rc::clone(&consumed);
    let consumer = Callback::new(move |store, n| {
        if n.user_tag == FINISHED {
            return;
        }
        match store.number(n.name) {
            Ok(value) => {
                tracing::debug!(
                    message = "demo.consume",
                    producer = n.user_tag,
                    value,
                    kind = %n.kind
                );
                *sink.borrow_mut().entry(n.user_tag).or_default() += 1;
            }
            Err(err) => tracing::warn!(message = "demo.consume.failed", error = %err),
        }
    });
    store.add_observer(VARIABLE, &consumer)?;

    let mut scheduler = Scheduler::new();
    for id in 1..=settings.producers {
        scheduler.spawn(Producer {
            name: format!("producer-{id}"),
            id,
            next: 0,
            rounds: settings.rounds,
        });
    }

    let mut wakes = 0u64;
    let mut failure: Option<DemoError> = None;
    loop {
        let tag = store.observe_variable(VARIABLE, &mut || {
            let finished = match scheduler.run_round(&store) {
                Ok(ran) => !ran,
                Err(err) => {
                    failure.get_or_insert(err);
                    true
                }
            };
            if finished && let Err(err) = store.notify_only(VARIABLE, FINISHED) {
                failure.get_or_insert(err.into());
            }
        })?;
        if let Some(err) = failure.take() {
            return Err(err);
        }
        if tag == FINISHED {
            break;
        }
        wakes += 1;
        tracing::info!(message = "demo.wake", producer = tag);
    }

    let variables = store.variables()?;
    store.release()?;
    let consumed = consumed.borrow().clone();
    Ok(Report {
        mode: "cooperative",
        producers: settings.producers,
        rounds: settings.rounds,
        consumed,
        wakes,
        variables,
    })
}

// ── Threaded ────────────────────────────────────────────────────────────

const CONSUMER_POLL: Duration = Duration::from_millis(50);

/// Run each producer on its own OS thread against a [`SharedDataLayer`].
pub fn run_threaded(settings: &Settings) -> Result<Report> {
    validate(settings)?;
    let store = SharedDataLayer::with_config(settings.config);
    store.create_variable(VARIABLE)?;

    let consumed: Arc<Mutex<BTreeMap<UserTag, u64>>> = Arc::default();
    let sink = Arc::clone(&consumed);
    let consumer = SharedCallback::new(move |store, n| {
        if n.user_tag == FINISHED {
            return;
        }
        if store.number(n.name).is_ok() {
            let mut counts = sink.lock().unwrap_or_else(PoisonError::into_inner);
            *counts.entry(n.user_tag).or_default() += 1;
        }
    });
    store.add_observer(VARIABLE, &consumer)?;

    let waiter = {
        let store = store.clone();
        thread::Builder::new()
            .name("consumer".into())
            .spawn(move || -> std::result::Result<u64, StoreError> {
                let mut wakes = 0u64;
                loop {
                    match store.observe_variable_timeout(VARIABLE, CONSUMER_POLL)? {
                        Some(FINISHED) => return Ok(wakes),
                        Some(producer) => {
                            wakes += 1;
                            tracing::info!(message = "demo.wake", producer);
                        }
                        None => {
                            // The finishing notify may land between two waits.
                            let info = store.variable(VARIABLE)?;
                            if info.event_counter > 0 && info.user_tag == FINISHED {
                                return Ok(wakes);
                            }
                        }
                    }
                }
            })
            .map_err(|source| DemoError::Spawn {
                name: "consumer".into(),
                source,
            })?
    };

    let mut producers = Vec::new();
    for id in 1..=settings.producers {
        let store = store.clone();
        let rounds = settings.rounds;
        let name = format!("producer-{id}");
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || -> std::result::Result<(), StoreError> {
                for n in 0..rounds {
                    store.set_number(VARIABLE, id, n)?;
                }
                Ok(())
            })
            .map_err(|source| DemoError::Spawn {
                name: name.clone(),
                source,
            })?;
        producers.push((name, handle));
    }
    for (name, handle) in producers {
        handle
            .join()
            .map_err(|_| DemoError::WorkerPanicked { name })??;
    }
    store.set_number(VARIABLE, FINISHED, 0)?;

    let wakes = waiter.join().map_err(|_| DemoError::WorkerPanicked {
        name: "consumer".into(),
    })??;

    let variables = store.variables()?;
    store.release()?;
    let consumed = consumed
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    Ok(Report {
        mode: "threaded",
        producers: settings.producers,
        rounds: settings.rounds,
        consumed,
        wakes,
        variables,
    })
}
