//! Session state shared by the dialogue and memory flows.
//!
//! All mutations go through named transitions so that the invariants hold
//! no matter which flow touches the record:
//! - `logic_balance` stays within `[0, 100]`
//! - at most one dialogue request is in flight (`is_thinking`)
//! - `generation` only moves forward, and only on reset

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest and highest logic balance (0 = pure emotion, 100 = pure logic)
pub const LOGIC_BALANCE_MIN: f64 = 0.0;
pub const LOGIC_BALANCE_MAX: f64 = 100.0;

/// Behavioral style applied to the assistant's replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersonalityMode {
    Mentor,
    Commander,
    Therapist,
    Hacker,
    Ultron,
}

impl PersonalityMode {
    pub fn all() -> &'static [PersonalityMode] {
        &[
            PersonalityMode::Mentor,
            PersonalityMode::Commander,
            PersonalityMode::Therapist,
            PersonalityMode::Hacker,
            PersonalityMode::Ultron,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mentor => "MENTOR",
            Self::Commander => "COMMANDER",
            Self::Therapist => "THERAPIST",
            Self::Hacker => "HACKER",
            Self::Ultron => "ULTRON",
        }
    }
}

impl Default for PersonalityMode {
    fn default() -> Self {
        Self::Mentor
    }
}

impl fmt::Display for PersonalityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonalityMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown personality mode: {wanted}"))
    }
}

/// Clamp a model-reported balance into `[0, 100]`; NaN falls back to the midpoint
pub fn clamp_logic_balance(value: f64) -> f64 {
    if value.is_nan() {
        return (LOGIC_BALANCE_MIN + LOGIC_BALANCE_MAX) / 2.0;
    }
    value.clamp(LOGIC_BALANCE_MIN, LOGIC_BALANCE_MAX)
}

/// Token handed out by `begin_dispatch`; ties a reply to the session it was sent from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTicket {
    pub generation: u64,
    pub personality: PersonalityMode,
}

/// Why a dispatch was not started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchBlocked {
    KillSwitched,
    Busy,
}

/// Mutable per-process session record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    personality_mode: PersonalityMode,
    logic_balance: f64,
    is_thinking: bool,
    is_kill_switched: bool,
    is_auto_learning: bool,
    generation: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            personality_mode: PersonalityMode::Mentor,
            logic_balance: 50.0,
            is_thinking: false,
            is_kill_switched: false,
            is_auto_learning: true,
            generation: 0,
        }
    }
}

impl SessionState {
    pub fn new(auto_learning: bool) -> Self {
        Self {
            is_auto_learning: auto_learning,
            ..Default::default()
        }
    }

    pub fn personality_mode(&self) -> PersonalityMode {
        self.personality_mode
    }

    pub fn logic_balance(&self) -> f64 {
        self.logic_balance
    }

    pub fn is_thinking(&self) -> bool {
        self.is_thinking
    }

    pub fn is_kill_switched(&self) -> bool {
        self.is_kill_switched
    }

    pub fn is_auto_learning(&self) -> bool {
        self.is_auto_learning
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// idle -> thinking. Refused while kill-switched or already thinking.
    pub fn begin_dispatch(&mut self) -> std::result::Result<DispatchTicket, DispatchBlocked> {
        if self.is_kill_switched {
            return Err(DispatchBlocked::KillSwitched);
        }
        if self.is_thinking {
            return Err(DispatchBlocked::Busy);
        }
        self.is_thinking = true;
        Ok(DispatchTicket {
            generation: self.generation,
            personality: self.personality_mode,
        })
    }

    /// thinking -> idle. Runs on success and failure alike.
    pub fn finish_dispatch(&mut self) {
        self.is_thinking = false;
    }

    /// Whether a reply for `ticket` still belongs to the current session
    pub fn is_current(&self, ticket: &DispatchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Adopt the persona and balance reported by the model
    pub fn apply_reply(&mut self, personality: PersonalityMode, logic_balance: f64) {
        self.personality_mode = personality;
        self.logic_balance = clamp_logic_balance(logic_balance);
    }

    /// Flip the kill switch; returns the new value
    pub fn toggle_kill_switch(&mut self) -> bool {
        self.is_kill_switched = !self.is_kill_switched;
        self.is_kill_switched
    }

    pub fn set_auto_learning(&mut self, enabled: bool) {
        self.is_auto_learning = enabled;
    }

    /// Start a fresh conversation; replies still in flight become stale
    pub fn reset(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
