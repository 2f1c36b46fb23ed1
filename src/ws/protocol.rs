//! JSON messages exchanged over the WebSocket.

use serde::{Deserialize, Serialize};

use crate::game::cards::CardPublic;
use crate::game::pairing::Group;
use crate::game::registry::{ParticipantPublic, Role};
use crate::util::id::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join { name: String },
    Confirm,
    DeclareRole { role: Role },
    AdminStartPairing,
    AdminReset,
    Ping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantState {
    pub total_joined: usize,
    pub total_confirmed: usize,
    pub total_connections: usize,
    pub participants: Vec<ParticipantPublic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome { connection_id: ConnectionId },
    JoinAccepted { name: String },
    JoinRejected { reason: String },
    ConfirmAccepted,
    ConfirmRejected { reason: String },
    CardAssigned { card_id: u32 },
    YourPairing { partner: Option<Partner>, group: u32 },
    RoleRejected { reason: String },
    ParticipantState(ParticipantState),
    CardPoolState { cards: Vec<CardPublic> },
    PairingResults { groups: Vec<Group> },
    CardRevealed { card_id: u32, name: String },
    PairingError { reason: String },
    PairingComplete,
    GameReset,
    Error { message: String },
    Pong,
}
