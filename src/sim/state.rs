//! Widget lifecycle state machine
//!
//! Transitions are requested at any time through intents, queued as
//! [`Command`]s, and committed one per cycle boundary in
//! [`GameStateManager::update_after_cycle`]. A command only commits if it
//! targets the unique successor of the current status; anything else is
//! dropped without error.

use std::collections::VecDeque;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::signal::StateChange;
use crate::consts::COMPLETE_LEVELS;
use crate::error::SwarmError;
use crate::settings::Properties;

/// Lifecycle status, in commit order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    NotStarted,
    Started,
    Free,
    Result,
    ResultAnimation,
    RestartAnimation,
    Restart,
}

impl Status {
    /// Fixed cyclic order
    pub const ORDER: [Status; 7] = [
        Status::NotStarted,
        Status::Started,
        Status::Free,
        Status::Result,
        Status::ResultAnimation,
        Status::RestartAnimation,
        Status::Restart,
    ];

    pub fn index(self) -> usize {
        Self::ORDER.iter().position(|s| *s == self).unwrap_or(0)
    }

    /// The only status that may follow this one
    pub fn next(self) -> Status {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }
}

/// Outcome that drives which result animation plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum GameResult {
    #[default]
    None,
    Pause,
    Stop,
    Completed,
    Failed,
    Replay,
}

impl GameResult {
    pub fn is_success(self) -> bool {
        matches!(self, GameResult::Completed | GameResult::Replay)
    }
}

/// Deferred transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Free,
    Stop,
    /// `hold_delay` seconds pass between the result animation and the restart
    Complete { level: u8, replay: bool, hold_delay: f64 },
    Fail,
    ResultAnimation,
    RestartAnimation,
    Restart,
}

/// Host-facing intent names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Start,
    Free,
    Stop,
    Pause,
    /// Reveal the scene once the host is ready to draw it
    ShowVisual,
    Success(u8),
    Fail,
    ResultAnimation,
    RestartAnimation,
    Restart,
}

impl FromStr for Intent {
    type Err = SwarmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Intent::Start),
            "free" => Ok(Intent::Free),
            "stop" => Ok(Intent::Stop),
            "pause" => Ok(Intent::Pause),
            "showVisual" => Ok(Intent::ShowVisual),
            "success" => Ok(Intent::Success(1)),
            "success2" => Ok(Intent::Success(2)),
            "success3" => Ok(Intent::Success(3)),
            "fail" => Ok(Intent::Fail),
            "resultAnimation" => Ok(Intent::ResultAnimation),
            "restartAnimation" => Ok(Intent::RestartAnimation),
            "restart" => Ok(Intent::Restart),
            _ => Err(SwarmError::UnknownIntent(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
struct QueuedCommand {
    command: Command,
    /// Seconds to wait once this entry reaches the head of the queue
    delay: f64,
    /// Set when the delay is armed
    ready_at: Option<f64>,
}

/// Single source of truth for the widget phase
#[derive(Debug, Clone, Default)]
pub struct GameStateManager {
    status: Status,
    result: GameResult,
    /// Success level (1..=3), 0 when no success is active
    level: u8,
    is_paused: bool,
    /// Host has asked for the scene to be shown; survives resets
    is_visible: bool,
    queue: VecDeque<QueuedCommand>,
    /// Monotonic simulation clock (seconds)
    clock: f64,
    /// Committed transitions not yet collected by the orchestrator
    transitions: Vec<StateChange>,
}

impl GameStateManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Advance the clock used for delayed commands
    pub fn advance_clock(&mut self, dt: f32) {
        self.clock += dt as f64;
    }

    /// Host entry point: `set("success2", false)`, `set("pause", true)`, ...
    ///
    /// `flag` is the replay flag for success intents and the paused flag for
    /// `pause`; other intents ignore it.
    pub fn set(&mut self, name: &str, flag: bool, properties: &Properties) -> crate::Result<()> {
        let intent: Intent = name
            .parse()
            .inspect_err(|_| log::debug!("Unknown intent {:?}", name))?;
        self.apply_intent(intent, flag, properties);
        Ok(())
    }

    pub fn apply_intent(&mut self, intent: Intent, flag: bool, properties: &Properties) {
        match intent {
            Intent::Start => self.set_start(),
            Intent::Free => self.set_free(),
            Intent::Stop => self.set_stop(),
            Intent::Pause => {
                if flag {
                    self.pause()
                } else {
                    self.resume()
                }
            }
            Intent::ShowVisual => self.show_visual(),
            Intent::Success(level) => {
                self.set_complete(level, flag, properties.complete_hold_delay(level) as f64)
            }
            Intent::Fail => self.set_fail(),
            Intent::ResultAnimation => self.set_result_animation(),
            Intent::RestartAnimation => self.set_restart_animation(),
            Intent::Restart => self.set_restart(),
        }
    }

    fn push(&mut self, command: Command, delay: f64) {
        log::debug!("Queued {:?} (delay {:.2}s)", command, delay);
        self.queue.push_back(QueuedCommand {
            command,
            delay,
            ready_at: None,
        });
    }

    pub fn set_start(&mut self) {
        self.push(Command::Start, 0.0);
    }

    pub fn set_free(&mut self) {
        self.push(Command::Free, 0.0);
    }

    pub fn set_stop(&mut self) {
        self.push(Command::Stop, 0.0);
    }

    /// Queue a success result; the restart animation is held back by `hold_delay`
    /// seconds after the result animation begins.
    pub fn set_complete(&mut self, level: u8, replay: bool, hold_delay: f64) {
        let level = level.clamp(1, COMPLETE_LEVELS as u8);
        self.push(
            Command::Complete {
                level,
                replay,
                hold_delay,
            },
            0.0,
        );
    }

    pub fn set_complete1(&mut self, replay: bool, hold_delay: f64) {
        self.set_complete(1, replay, hold_delay);
    }

    pub fn set_complete2(&mut self, replay: bool, hold_delay: f64) {
        self.set_complete(2, replay, hold_delay);
    }

    pub fn set_complete3(&mut self, replay: bool, hold_delay: f64) {
        self.set_complete(3, replay, hold_delay);
    }

    pub fn set_fail(&mut self) {
        self.push(Command::Fail, 0.0);
    }

    pub fn set_result_animation(&mut self) {
        self.push(Command::ResultAnimation, 0.0);
    }

    pub fn set_restart_animation(&mut self) {
        self.push(Command::RestartAnimation, 0.0);
    }

    pub fn set_restart(&mut self) {
        self.push(Command::Restart, 0.0);
    }

    /// Freeze immediately (a paused frame never reaches a cycle boundary)
    pub fn pause(&mut self) {
        if !self.is_paused {
            log::info!("Paused");
        }
        self.is_paused = true;
        if self.result == GameResult::None {
            self.result = GameResult::Pause;
        }
    }

    pub fn show_visual(&mut self) {
        if !self.is_visible {
            log::info!("Visual shown");
        }
        self.is_visible = true;
    }

    pub fn resume(&mut self) {
        if self.is_paused {
            log::info!("Resumed");
            self.is_paused = false;
            if self.result == GameResult::Pause {
                self.result = GameResult::None;
            }
        }
    }

    /// Only the unique successor of the current status may be committed
    fn can_update_status(&self, next: Status) -> bool {
        let allowed = self.status.next() == next;
        if !allowed {
            log::debug!("Ignoring transition {:?} -> {:?}", self.status, next);
        }
        allowed
    }

    fn update_status(&mut self, next: Status) -> bool {
        if !self.can_update_status(next) {
            return false;
        }
        log::info!(
            "Status {:?} -> {:?} (result {:?}, level {})",
            self.status,
            next,
            self.result,
            self.level
        );
        self.status = next;
        self.transitions.push(StateChange {
            status: self.status,
            result: self.result,
            level: self.level,
        });
        true
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Start => {
                self.update_status(Status::Started);
            }
            Command::Free => {
                self.update_status(Status::Free);
            }
            Command::Stop => {
                self.commit_result(GameResult::Stop, 0);
            }
            Command::Complete {
                level,
                replay,
                hold_delay,
            } => {
                let result = if replay {
                    GameResult::Replay
                } else {
                    GameResult::Completed
                };
                // The restart only exists once the result is real; it goes
                // first so nothing queued later can slip in ahead of it
                if self.commit_result(result, level) {
                    log::debug!("Queued {:?} (delay {:.2}s)", Command::RestartAnimation, hold_delay);
                    self.queue.push_front(QueuedCommand {
                        command: Command::RestartAnimation,
                        delay: hold_delay,
                        ready_at: None,
                    });
                }
            }
            Command::Fail => {
                self.commit_result(GameResult::Failed, 0);
            }
            Command::ResultAnimation => {
                self.update_status(Status::ResultAnimation);
            }
            Command::RestartAnimation => {
                self.update_status(Status::RestartAnimation);
            }
            Command::Restart => {
                self.update_status(Status::Restart);
            }
        }
    }

    fn commit_result(&mut self, result: GameResult, level: u8) -> bool {
        if !self.can_update_status(Status::Result) {
            return false;
        }
        self.result = result;
        self.level = level;
        self.update_status(Status::Result)
    }

    /// Called once per completed cycle.
    ///
    /// `hold` is set while an error block is still falling; nothing moves
    /// until it lands. Otherwise the transient statuses advance on their own
    /// and then at most one queued command is drained.
    pub fn update_after_cycle(&mut self, hold: bool) {
        if hold {
            log::trace!("Transitions held by error block");
            return;
        }

        match self.status {
            Status::Started => {
                self.update_status(Status::Free);
            }
            Status::Result => {
                self.update_status(Status::ResultAnimation);
            }
            _ => {}
        }

        self.drain_one();
    }

    fn drain_one(&mut self) {
        let clock = self.clock;
        let Some(head) = self.queue.front_mut() else {
            return;
        };
        let ready_at = *head.ready_at.get_or_insert(clock + head.delay);
        if clock < ready_at {
            return;
        }
        if let Some(entry) = self.queue.pop_front() {
            self.apply(entry.command);
        }
    }

    /// Hand over committed transitions, oldest first
    pub fn take_transitions(&mut self) -> Vec<StateChange> {
        std::mem::take(&mut self.transitions)
    }

    /// Back to NOT_STARTED with an empty queue (the clock keeps running)
    pub fn reset(&mut self) {
        if self.status != Status::NotStarted {
            log::info!("Status {:?} -> {:?} (reset)", self.status, Status::NotStarted);
        }
        self.status = Status::NotStarted;
        self.result = GameResult::None;
        self.level = 0;
        self.is_paused = false;
        self.queue.clear();
        self.transitions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;


    fn statuses(changes: &[StateChange]) -> Vec<Status> {
        changes.iter().map(|c| c.status).collect()
    }

    #[test]
    fn test_status_order_is_cyclic() {
        assert_eq!(Status::NotStarted.next(), Status::Started);
        assert_eq!(Status::ResultAnimation.next(), Status::RestartAnimation);
        assert_eq!(Status::Restart.next(), Status::NotStarted);
        for (i, s) in Status::ORDER.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn test_intents_are_deferred() {
        let mut gsm = GameStateManager::new();
        gsm.set("start", false, &Properties::default()).unwrap();
        assert_eq!(gsm.status(), Status::NotStarted);
        assert_eq!(gsm.queued_len(), 1);

        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Started);
        assert_eq!(statuses(&gsm.take_transitions()), vec![Status::Started]);
    }

    #[test]
    fn test_auto_advance_started_and_result() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.update_after_cycle(false);
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Free);

        gsm.set_fail();
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Result);
        assert_eq!(gsm.result(), GameResult::Failed);
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::ResultAnimation);
    }

    #[test]
    fn test_out_of_order_requests_are_dropped() {
        let mut gsm = GameStateManager::new();
        gsm.set_fail();
        gsm.set_restart();
        gsm.set_free();
        for _ in 0..3 {
            gsm.update_after_cycle(false);
        }
        assert_eq!(gsm.status(), Status::NotStarted);
        assert_eq!(gsm.result(), GameResult::None);
        assert_eq!(gsm.queued_len(), 0);
        assert!(gsm.take_transitions().is_empty());
    }

    #[test]
    fn test_one_command_per_cycle_in_fifo_order() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.set_stop();
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Started);
        assert_eq!(gsm.queued_len(), 1);
        // Started auto-advances to Free, then Stop drains
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Result);
        assert_eq!(gsm.result(), GameResult::Stop);
    }

    #[test]
    fn test_hold_blocks_everything() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.update_after_cycle(true);
        assert_eq!(gsm.status(), Status::NotStarted);
        gsm.update_after_cycle(false);
        gsm.update_after_cycle(true);
        assert_eq!(gsm.status(), Status::Started);
    }

    #[test]
    fn test_complete_holds_restart_animation() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.update_after_cycle(false);
        gsm.update_after_cycle(false);
        gsm.set("success2", false, &Properties::default()).unwrap();

        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Result);
        assert_eq!(gsm.result(), GameResult::Completed);
        assert_eq!(gsm.level(), 2);

        // Enters the result animation and arms the 4s hold
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::ResultAnimation);

        for _ in 0..39 {
            gsm.advance_clock(0.1);
            gsm.update_after_cycle(false);
        }
        assert_eq!(gsm.status(), Status::ResultAnimation);

        gsm.advance_clock(0.2);
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::RestartAnimation);
        assert_eq!(gsm.queued_len(), 0);
    }

    #[test]
    fn test_replay_flag() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.update_after_cycle(false);
        gsm.update_after_cycle(false);
        gsm.set("success3", true, &Properties::default()).unwrap();
        gsm.update_after_cycle(false);
        assert_eq!(gsm.result(), GameResult::Replay);
        assert!(gsm.result().is_success());
        assert_eq!(gsm.level(), 3);
    }

    #[test]
    fn test_pause_is_immediate() {
        let mut gsm = GameStateManager::new();
        gsm.set("pause", true, &Properties::default()).unwrap();
        assert!(gsm.is_paused());
        assert_eq!(gsm.result(), GameResult::Pause);
        gsm.set("pause", false, &Properties::default()).unwrap();
        assert!(!gsm.is_paused());
        assert_eq!(gsm.result(), GameResult::None);
    }

    #[test]
    fn test_unknown_intent() {
        let mut gsm = GameStateManager::new();
        let err = gsm.set("explode", false, &Properties::default()).unwrap_err();
        assert!(matches!(err, SwarmError::UnknownIntent(name) if name == "explode"));
        assert_eq!(gsm.queued_len(), 0);
    }

    #[test]
    fn test_rejected_success_leaves_no_hold_behind() {
        let mut gsm = GameStateManager::new();
        gsm.set("success3", true, &Properties::default()).unwrap();
        gsm.set("start", false, &Properties::default()).unwrap();
        assert_eq!(gsm.queued_len(), 2);

        // Complete is out of order here and takes nothing with it
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::NotStarted);
        assert_eq!(gsm.queued_len(), 1);

        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Started);
        assert_eq!(gsm.queued_len(), 0);
        assert_eq!(statuses(&gsm.take_transitions()), vec![Status::Started]);
    }

    #[test]
    fn test_restart_hold_runs_ahead_of_later_requests() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.update_after_cycle(false);
        gsm.update_after_cycle(false);
        gsm.set_complete1(false, 2.0);
        gsm.set_restart();

        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Result);
        assert_eq!(gsm.queued_len(), 2);

        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::ResultAnimation);
        gsm.advance_clock(2.0);
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::RestartAnimation);
        gsm.update_after_cycle(false);
        assert_eq!(gsm.status(), Status::Restart);
    }

    #[test]
    fn test_show_visual_is_immediate_and_survives_reset() {
        let mut gsm = GameStateManager::new();
        assert!(!gsm.is_visible());
        gsm.set("showVisual", false, &Properties::default()).unwrap();
        assert!(gsm.is_visible());
        assert_eq!(gsm.queued_len(), 0);
        assert_eq!(gsm.status(), Status::NotStarted);
        gsm.reset();
        assert!(gsm.is_visible());
    }

    #[test]
    fn test_reset() {
        let mut gsm = GameStateManager::new();
        gsm.set_start();
        gsm.set_free();
        gsm.update_after_cycle(false);
        gsm.reset();
        assert_eq!(gsm.status(), Status::NotStarted);
        assert_eq!(gsm.queued_len(), 0);
        assert!(gsm.take_transitions().is_empty());
    }
}
