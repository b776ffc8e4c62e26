use serde::Serialize;

use super::{Minute, PlayerRef};

/// Which team an event or stat line belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CardKind {
    Yellow,
    Red,
}

/// An in-match event from the report timeline.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Goal {
        scorer: PlayerRef,
        minute: Minute,
        side: Side,
        assist: Option<PlayerRef>,
    },
    Card {
        player: PlayerRef,
        minute: Minute,
        side: Side,
        card: CardKind,
    },
    Substitution {
        player_in: PlayerRef,
        /// The report sometimes omits the replaced player.
        player_out: Option<PlayerRef>,
        minute: Minute,
        side: Side,
    },
}

impl Event {
    pub fn minute(&self) -> Minute {
        match self {
            Event::Goal { minute, .. }
            | Event::Card { minute, .. }
            | Event::Substitution { minute, .. } => *minute,
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Event::Goal { side, .. }
            | Event::Card { side, .. }
            | Event::Substitution { side, .. } => *side,
        }
    }

    /// The player this event is primarily about (scorer, carded
    /// player, or the player coming on).
    pub fn player(&self) -> &PlayerRef {
        match self {
            Event::Goal { scorer, .. } => scorer,
            Event::Card { player, .. } => player,
            Event::Substitution { player_in, .. } => player_in,
        }
    }
}

/// A credited assist, recorded alongside the goal it set up.
#[derive(Debug, Clone, Serialize)]
pub struct AssistRecord {
    pub player: PlayerRef,
    pub minute: Minute,
    pub side: Side,
}
