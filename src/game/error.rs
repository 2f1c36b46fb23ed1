//! Recoverable game errors, reported back to the originating connection.

/// Broad category of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    State,
    ResourceExhausted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("please enter a valid name")]
    EmptyName,
    #[error("already joined")]
    AlreadyJoined,
    #[error("must join first")]
    NotJoined,
    #[error("already confirmed")]
    AlreadyConfirmed,
    #[error("role already declared")]
    RoleAlreadyDeclared,
    #[error("role must be screen or mobile")]
    UndeclarableRole,
    #[error("screens cannot join the game")]
    ScreenCannotJoin,
    #[error("at least 2 confirmed participants are required to start pairing ({eligible} eligible)")]
    InsufficientParticipants { eligible: usize },
    #[error("no cards left")]
    CardsExhausted,
    #[error("unknown connection")]
    UnknownConnection,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GameError::EmptyName | GameError::AlreadyJoined => ErrorKind::Validation,
            GameError::CardsExhausted => ErrorKind::ResourceExhausted,
            GameError::NotJoined
            | GameError::AlreadyConfirmed
            | GameError::RoleAlreadyDeclared
            | GameError::UndeclarableRole
            | GameError::ScreenCannotJoin
            | GameError::InsufficientParticipants { .. }
            | GameError::UnknownConnection => ErrorKind::State,
        }
    }
}
