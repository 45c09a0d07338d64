//! Position stance and the trade event log.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};

/// Direction of an open trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Order side of a trade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// The simulator's current stance. Exactly one at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    pub fn direction(self) -> Option<Direction> {
        match self {
            Position::Flat => None,
            Position::Long => Some(Direction::Long),
            Position::Short => Some(Direction::Short),
        }
    }

    /// +1 long, -1 short, 0 flat.
    pub fn sign(self) -> f64 {
        self.direction().map_or(0.0, Direction::sign)
    }
}

impl From<Direction> for Position {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => Position::Long,
            Direction::Short => Position::Short,
        }
    }
}

/// One append-only trade log record.
///
/// Serialized flat as `{event, date, price, type, [returns,] direction}`
/// where `type` is the order side.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeEvent {
    Entry {
        date: DateTime<Utc>,
        price: f64,
        direction: Direction,
    },
    Exit {
        date: DateTime<Utc>,
        price: f64,
        /// Raw price return `(exit - entry) / entry`, before direction.
        returns: f64,
        direction: Direction,
    },
}

impl TradeEvent {
    pub fn date(&self) -> DateTime<Utc> {
        match self {
            TradeEvent::Entry { date, .. } | TradeEvent::Exit { date, .. } => *date,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            TradeEvent::Entry { price, .. } | TradeEvent::Exit { price, .. } => *price,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            TradeEvent::Entry { direction, .. } | TradeEvent::Exit { direction, .. } => *direction,
        }
    }

    /// Realized return for exits, `None` for entries.
    pub fn returns(&self) -> Option<f64> {
        match self {
            TradeEvent::Entry { .. } => None,
            TradeEvent::Exit { returns, .. } => Some(*returns),
        }
    }

    pub fn is_exit(&self) -> bool {
        matches!(self, TradeEvent::Exit { .. })
    }

    /// Buying opens a long or covers a short; selling does the reverse.
    pub fn side(&self) -> Side {
        match (self, self.direction()) {
            (TradeEvent::Entry { .. }, Direction::Long)
            | (TradeEvent::Exit { .. }, Direction::Short) => Side::Buy,
            (TradeEvent::Entry { .. }, Direction::Short)
            | (TradeEvent::Exit { .. }, Direction::Long) => Side::Sell,
        }
    }
}

impl Serialize for TradeEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (event, fields) = match self {
            TradeEvent::Entry { .. } => ("entry", 5),
            TradeEvent::Exit { .. } => ("exit", 6),
        };
        let mut state = serializer.serialize_struct("TradeEvent", fields)?;
        state.serialize_field("event", event)?;
        state.serialize_field("date", &self.date())?;
        state.serialize_field("price", &self.price())?;
        state.serialize_field("type", &self.side())?;
        if let Some(returns) = self.returns() {
            state.serialize_field("returns", &returns)?;
        }
        state.serialize_field("direction", &self.direction())?;
        state.end()
    }
}
