//! Random pairing of confirmed participants.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::GameError;
use super::registry::Candidate;
use crate::util::id::ConnectionId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: ConnectionId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub group: u32,
    pub members: Vec<Member>,
    /// Set on the trailing singleton when the participant count is odd.
    pub unpaired: bool,
}

impl Group {
    /// The other member of the group, as seen by `me`.
    pub fn partner_of(&self, me: ConnectionId) -> Option<&Member> {
        if self.unpaired {
            return None;
        }
        self.members.iter().find(|m| m.id != me)
    }
}

/// Shuffle the candidates and split them into consecutive pairs. Groups are numbered from 1
/// in shuffled order; an odd leftover ends up alone in the last group.
pub fn pair<R: Rng + ?Sized>(candidates: &[Candidate], rng: &mut R) -> Result<Vec<Group>, GameError> {
    if candidates.len() < 2 {
        return Err(GameError::InsufficientParticipants { eligible: candidates.len() });
    }
    let mut shuffled = candidates.to_vec();
    shuffled.shuffle(rng);

    let groups = shuffled
        .chunks(2)
        .zip(1u32..)
        .map(|(chunk, group)| Group {
            group,
            members: chunk.iter().map(|c| Member { id: c.id, name: c.name.clone() }).collect(),
            unpaired: chunk.len() == 1,
        })
        .collect();
    Ok(groups)
}
