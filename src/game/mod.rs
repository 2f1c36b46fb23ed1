//! In-memory game state: participants, cards, pairing and fan-out.

pub mod broadcast;
pub mod cards;
pub mod error;
pub mod pairing;
pub mod registry;
pub mod session;

pub use error::{ErrorKind, GameError};
pub use session::{Session, SessionSettings};
