//! What starts an update cycle.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt::Display;

/// Reason an update cycle was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Initial,
    Timer,
    Manual,
    Reconnected,
}

impl Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Trigger::Initial => "initial",
                Trigger::Timer => "timer",
                Trigger::Manual => "manual",
                Trigger::Reconnected => "reconnected",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Refresh(Trigger),
    /// Connectivity to the price source was lost.
    Offline,
}

#[async_trait]
pub trait Scheduler: Send {
    /// Waits for the next event. `None` ends the run.
    async fn next_event(&mut self) -> Option<Event>;
}

/// Replays a fixed list of events, then ends.
#[derive(Debug, Default)]
pub struct ScriptedScheduler {
    events: VecDeque<Event>,
}

impl ScriptedScheduler {
    pub fn new(events: impl IntoIterator<Item = Event>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Scheduler for ScriptedScheduler {
    async fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }
}
