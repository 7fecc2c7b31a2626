//! Minimal round-robin scheduler for cooperative logical threads.
//!
//! Each task is a state machine advanced one step per turn. A turn ends when
//! the step returns; nothing is preempted.

use dmlayer_core::DataLayer;

use crate::error::Result;

/// What a task reports after one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// More work remains.
    Pending,
    /// The task is finished and will not be stepped again.
    Done,
}

pub trait Task {
    fn name(&self) -> &str;

    fn step(&mut self, store: &DataLayer) -> Result<Step>;
}

#[derive(Default)]
pub struct Scheduler {
    tasks: Vec<Box<dyn Task>>,
    cursor: usize,
    turns: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, task: impl Task + 'static) {
        self.tasks.push(Box::new(task));
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Steps executed so far.
    #[must_use]
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Step the next ready task once.
    ///
    /// Returns `Ok(false)` when there is nothing left to run.
    pub fn run_round(&mut self, store: &DataLayer) -> Result<bool> {
        if self.tasks.is_empty() {
            return Ok(false);
        }
        let index = self.cursor % self.tasks.len();
        let step = self.tasks[index].step(store)?;
        self.turns += 1;
        match step {
            Step::Pending => self.cursor = index + 1,
            Step::Done => {
                let task = self.tasks.remove(index);
                tracing::debug!(message = "demo.task.done", task = task.name());
                self.cursor = index;
            }
        }
        Ok(true)
    }
}
