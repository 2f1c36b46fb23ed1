//! Participant records keyed by connection.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::GameError;
use crate::util::id::ConnectionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Unknown,
    Screen,
    Mobile,
}

#[derive(Debug, Clone, Default)]
pub struct Participant {
    pub name: Option<String>,
    pub role: Role,
    pub joined: bool,
    pub confirmed: bool,
    pub card_id: Option<u32>,
    pub group: Option<u32>,
    seq: u64,
}

impl Participant {
    pub fn is_mobile(&self) -> bool {
        self.role == Role::Mobile
    }

    /// Ok when a confirmation may proceed.
    pub fn check_confirmable(&self) -> Result<(), GameError> {
        if !self.is_mobile() || !self.joined {
            return Err(GameError::NotJoined);
        }
        if self.confirmed {
            return Err(GameError::AlreadyConfirmed);
        }
        Ok(())
    }
}

/// A confirmed participant that can be handed to the pairing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: ConnectionId,
    pub name: String,
    pub card_id: Option<u32>,
}

/// Entry of the public participant list shown on screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantPublic {
    pub name: String,
    pub confirmed: bool,
}

#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<ConnectionId, Participant>,
    next_seq: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, id: ConnectionId) -> &Participant {
        self.register_as(id, Role::Unknown)
    }

    pub(crate) fn register_as(&mut self, id: ConnectionId, role: Role) -> &Participant {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(id, Participant { role, seq, ..Participant::default() });
        &self.entries[&id]
    }

    pub fn get(&self, id: ConnectionId) -> Result<&Participant, GameError> {
        self.entries.get(&id).ok_or(GameError::UnknownConnection)
    }

    fn get_mut(&mut self, id: ConnectionId) -> Result<&mut Participant, GameError> {
        self.entries.get_mut(&id).ok_or(GameError::UnknownConnection)
    }

    pub fn declare_role(&mut self, id: ConnectionId, role: Role) -> Result<(), GameError> {
        let p = self.get_mut(id)?;
        if p.role != Role::Unknown {
            return Err(GameError::RoleAlreadyDeclared);
        }
        if role == Role::Unknown {
            return Err(GameError::UndeclarableRole);
        }
        p.role = role;
        Ok(())
    }

    /// Join under `name`, which is trimmed before it is stored. An unknown role becomes
    /// mobile.
    pub fn join(&mut self, id: ConnectionId, name: &str) -> Result<&str, GameError> {
        let p = self.get_mut(id)?;
        if p.role == Role::Screen {
            return Err(GameError::ScreenCannotJoin);
        }
        if p.joined {
            return Err(GameError::AlreadyJoined);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::EmptyName);
        }
        p.role = Role::Mobile;
        p.joined = true;
        let stored = p.name.insert(name.to_string());
        Ok(stored.as_str())
    }

    pub fn confirm(&mut self, id: ConnectionId, card_id: Option<u32>) -> Result<(), GameError> {
        let p = self.get_mut(id)?;
        p.check_confirmable()?;
        p.confirmed = true;
        p.card_id = card_id;
        Ok(())
    }

    pub fn assign_group(&mut self, id: ConnectionId, group: u32) {
        if let Some(p) = self.entries.get_mut(&id) {
            p.group = Some(group);
        }
    }

    pub fn remove(&mut self, id: ConnectionId) -> Option<Participant> {
        self.entries.remove(&id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Participants in registration order.
    fn ordered(&self) -> Vec<(ConnectionId, &Participant)> {
        let mut all: Vec<_> = self.entries.iter().map(|(id, p)| (*id, p)).collect();
        all.sort_by_key(|(_, p)| p.seq);
        all
    }

    /// Confirmed mobile participants, in registration order. With `require_card` only those
    /// holding a card qualify.
    pub fn eligible(&self, require_card: bool) -> Vec<Candidate> {
        self.ordered()
            .into_iter()
            .filter(|(_, p)| p.is_mobile() && p.confirmed)
            .filter(|(_, p)| !require_card || p.card_id.is_some())
            .filter_map(|(id, p)| {
                let name = p.name.clone()?;
                Some(Candidate { id, name, card_id: p.card_id })
            })
            .collect()
    }

    /// Joined mobile participants that have not confirmed yet, in registration order.
    pub fn unconfirmed(&self) -> Vec<ConnectionId> {
        self.ordered()
            .into_iter()
            .filter(|(_, p)| p.is_mobile() && p.joined && !p.confirmed)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn joined_count(&self) -> usize {
        self.entries.values().filter(|p| p.is_mobile() && p.joined).count()
    }

    pub fn confirmed_count(&self) -> usize {
        self.entries.values().filter(|p| p.is_mobile() && p.confirmed).count()
    }

    pub fn public_list(&self) -> Vec<ParticipantPublic> {
        self.ordered()
            .into_iter()
            .filter(|(_, p)| p.is_mobile())
            .filter_map(|(_, p)| {
                let name = p.name.clone()?;
                Some(ParticipantPublic { name, confirmed: p.confirmed })
            })
            .collect()
    }
}
