//! Fan-out of server messages to live connections.

use std::collections::{HashMap, HashSet};

use tokio::sync::mpsc;

use super::registry::Role;
use crate::util::id::ConnectionId;
use crate::ws::protocol::ServerMessage;

/// Sending half of a connection's outbound queue.
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

#[derive(Debug, Default)]
pub struct Broadcaster {
    outboxes: HashMap<ConnectionId, Outbox>,
    screens: HashSet<ConnectionId>,
    mobiles: HashSet<ConnectionId>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, id: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(id, outbox);
    }

    pub fn detach(&mut self, id: ConnectionId) {
        self.outboxes.remove(&id);
        self.screens.remove(&id);
        self.mobiles.remove(&id);
    }

    pub fn subscribe(&mut self, id: ConnectionId, role: Role) {
        match role {
            Role::Screen => {
                self.mobiles.remove(&id);
                self.screens.insert(id);
            }
            Role::Mobile => {
                self.screens.remove(&id);
                self.mobiles.insert(id);
            }
            Role::Unknown => {
                self.screens.remove(&id);
                self.mobiles.remove(&id);
            }
        }
    }

    /// Drop every mobile subscription, leaving those connections attached but unaddressed.
    pub fn clear_mobiles(&mut self) {
        self.mobiles.clear();
    }

    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.outboxes.keys().copied().collect()
    }

    pub fn is_screen(&self, id: ConnectionId) -> bool {
        self.screens.contains(&id)
    }

    pub fn connections(&self) -> usize {
        self.outboxes.len()
    }

    pub fn send_to(&self, id: ConnectionId, msg: ServerMessage) {
        if let Some(tx) = self.outboxes.get(&id) {
            if tx.send(msg).is_err() {
                tracing::debug!(%id, "outbox closed");
            }
        }
    }

    pub fn to_screens(&self, msg: &ServerMessage) {
        for id in &self.screens {
            self.send_to(*id, msg.clone());
        }
    }

    pub fn to_mobiles(&self, msg: &ServerMessage) {
        for id in &self.mobiles {
            self.send_to(*id, msg.clone());
        }
    }

    pub fn to_all(&self, msg: &ServerMessage) {
        for id in self.outboxes.keys() {
            self.send_to(*id, msg.clone());
        }
    }
}
