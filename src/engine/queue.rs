//! Pending command strings, drained one at a time by the dispatch loop.

use std::collections::VecDeque;

/// Where loaded commands go relative to what is already queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Ahead of everything already queued
    #[default]
    Front,
    /// After everything already queued
    Back,
    /// Instead of everything already queued
    Replace,
}

impl std::str::FromStr for Placement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" | "i" | "front" => Ok(Placement::Front),
            "append" | "a" | "back" => Ok(Placement::Back),
            "replace" | "r" => Ok(Placement::Replace),
            other => Err(format!("placement must be insert, append or replace, not '{}'", other)),
        }
    }
}

/// Ordered list of command strings.
///
/// # Examples
///
/// ```
/// use tello_console::engine::queue::{CommandQueue, Placement};
///
/// let mut queue = CommandQueue::from_lines(["takeoff", "land"]);
/// queue.load(["command"], Placement::Front);
/// assert_eq!(queue.pop_front().as_deref(), Some("command"));
/// assert_eq!(queue.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    commands: VecDeque<String>,
}

impl CommandQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Add `lines` at `placement`, keeping their relative order.
    pub fn load<I, S>(&mut self, lines: I, placement: Placement)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let incoming: Vec<String> = lines.into_iter().map(Into::into).collect();
        match placement {
            Placement::Front => {
                for line in incoming.into_iter().rev() {
                    self.commands.push_front(line);
                }
            }
            Placement::Back => self.commands.extend(incoming),
            Placement::Replace => self.commands = incoming.into(),
        }
    }

    pub fn push_front(&mut self, command: impl Into<String>) {
        self.commands.push_front(command.into());
    }

    pub fn push_back(&mut self, command: impl Into<String>) {
        self.commands.push_back(command.into());
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.commands.pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().map(String::as_str)
    }
}
