//! Pool of visual cards drawn on confirmation and revealed at pairing time.

use serde::{Deserialize, Serialize};

use crate::util::id::ConnectionId;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("card roster is configured but empty")]
    EmptyRoster,
    #[error("card pool size must be at least 1")]
    ZeroSize,
    #[error("card pool size {0} exceeds the largest card id")]
    TooLarge(usize),
}

#[derive(Debug, Clone)]
pub struct Card {
    pub id: u32,
    /// Fixed at initialization when the pool is built from a roster.
    pub bound_name: Option<String>,
    pub claimed_by: Option<ConnectionId>,
    pub revealed: bool,
    revealed_name: Option<String>,
}

impl Card {
    fn new(id: u32, bound_name: Option<String>) -> Self {
        Self { id, bound_name, claimed_by: None, revealed: false, revealed_name: None }
    }

    pub fn is_available(&self) -> bool {
        self.claimed_by.is_none() && !self.revealed
    }

    /// Name shown for this card, only once it has been revealed.
    pub fn display_name(&self) -> Option<&str> {
        if !self.revealed {
            return None;
        }
        self.bound_name.as_deref().or(self.revealed_name.as_deref())
    }
}

/// What the screen sees of a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPublic {
    pub id: u32,
    pub claimed: bool,
    pub revealed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CardPool {
    cards: Vec<Card>,
}

impl CardPool {
    /// Build a pool of `size` cards numbered from 1. A roster, when given, decides the
    /// size and binds one name to each card.
    pub fn initialize(size: usize, roster: Option<Vec<String>>) -> Result<Self, PoolError> {
        let size = roster.as_ref().map_or(size, Vec::len);
        let last_id = u32::try_from(size).map_err(|_| PoolError::TooLarge(size))?;
        let cards = match roster {
            Some(names) if names.is_empty() => return Err(PoolError::EmptyRoster),
            Some(names) => names
                .into_iter()
                .zip(1u32..)
                .map(|(name, id)| Card::new(id, Some(name)))
                .collect(),
            None if size == 0 => return Err(PoolError::ZeroSize),
            None => (1..=last_id).map(|id| Card::new(id, None)).collect(),
        };
        Ok(Self { cards })
    }

    /// Reset every card to available and unrevealed.
    pub fn rebuild(&mut self) {
        for card in &mut self.cards {
            *card = Card::new(card.id, card.bound_name.take());
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn available(&self) -> usize {
        self.cards.iter().filter(|c| c.is_available()).count()
    }

    pub fn get(&self, id: u32) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    fn get_mut(&mut self, id: u32) -> Option<&mut Card> {
        self.cards.iter_mut().find(|c| c.id == id)
    }

    /// Claim the first available card in index order. `None` means the pool is exhausted.
    pub fn claim_next(&mut self, claimant: ConnectionId) -> Option<u32> {
        let card = self.cards.iter_mut().find(|c| c.is_available())?;
        card.claimed_by = Some(claimant);
        Some(card.id)
    }

    /// Return a claimed card to the pool. Revealed cards stay put; returns whether the
    /// card became available.
    pub fn release(&mut self, id: u32) -> bool {
        match self.get_mut(id) {
            Some(card) if !card.revealed && card.claimed_by.is_some() => {
                card.claimed_by = None;
                true
            }
            _ => false,
        }
    }

    /// Mark a card revealed under `name`. Revealing again changes nothing.
    pub fn reveal(&mut self, id: u32, name: &str) -> Option<&Card> {
        let card = self.get_mut(id)?;
        if !card.revealed {
            card.revealed = true;
            card.revealed_name = Some(name.to_string());
        }
        Some(card)
    }

    pub fn public_state(&self) -> Vec<CardPublic> {
        self.cards
            .iter()
            .map(|c| CardPublic {
                id: c.id,
                claimed: c.claimed_by.is_some(),
                revealed: c.revealed,
                name: c.display_name().map(str::to_string),
            })
            .collect()
    }
}
