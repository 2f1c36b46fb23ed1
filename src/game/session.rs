//! The game session: one owned state object that every inbound event goes through.

use rand::Rng;

use super::broadcast::{Broadcaster, Outbox};
use super::cards::{CardPool, PoolError};
use super::error::{ErrorKind, GameError};
use super::pairing::{self, Group};
use super::registry::{Registry, Role};
use crate::util::id::ConnectionId;
use crate::ws::protocol::{ClientMessage, ParticipantState, Partner, ServerMessage};

pub const DEFAULT_CARD_COUNT: usize = 50;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub card_count: usize,
    /// Name roster; its length overrides `card_count`.
    pub card_names: Option<Vec<String>>,
    /// Whether confirming draws a card.
    pub draw_cards: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { card_count: DEFAULT_CARD_COUNT, card_names: None, draw_cards: true }
    }
}

/// Outcome of force-confirming everyone who joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub confirmed: usize,
    pub cards_assigned: usize,
    pub left_unconfirmed: usize,
}

#[derive(Debug)]
pub struct Session {
    registry: Registry,
    pool: CardPool,
    pairings: Vec<Group>,
    hub: Broadcaster,
    draw_cards: bool,
}

impl Session {
    pub fn new(settings: SessionSettings) -> Result<Self, PoolError> {
        let pool = CardPool::initialize(settings.card_count, settings.card_names)?;
        tracing::info!(cards = pool.len(), draw_cards = settings.draw_cards, "session initialized");
        Ok(Self {
            registry: Registry::new(),
            pool,
            pairings: Vec::new(),
            hub: Broadcaster::new(),
            draw_cards: settings.draw_cards,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pool(&self) -> &CardPool {
        &self.pool
    }

    pub fn pairings(&self) -> &[Group] {
        &self.pairings
    }

    /// Register a new connection whose outbound messages go to `outbox`.
    pub fn connect(&mut self, outbox: Outbox) -> ConnectionId {
        let id = ConnectionId::new();
        self.registry.register(id);
        self.hub.attach(id, outbox);
        tracing::info!(%id, connections = self.hub.connections(), "connected");
        self.hub.send_to(id, ServerMessage::Welcome { connection_id: id });
        self.publish_state();
        id
    }

    /// Forget a connection. A card it claimed but that was never revealed goes back to the
    /// pool.
    pub fn disconnect(&mut self, id: ConnectionId) {
        self.hub.detach(id);
        let Some(participant) = self.registry.remove(id) else {
            tracing::debug!(%id, "disconnect of unregistered connection");
            return;
        };
        tracing::info!(%id, role = ?participant.role, name = ?participant.name, "disconnected");
        if let Some(card_id) = participant.card_id {
            if self.pool.release(card_id) {
                tracing::info!(%id, card_id, "recycled card");
            }
        }
        self.publish_state();
    }

    /// Apply one inbound message, answering rejections to the sender.
    pub fn handle(&mut self, id: ConnectionId, msg: ClientMessage) {
        match msg {
            ClientMessage::Join { name } => {
                if let Err(err) = self.join(id, &name) {
                    self.reject(id, &err, |reason| ServerMessage::JoinRejected { reason });
                }
            }
            ClientMessage::Confirm => {
                if let Err(err) = self.confirm(id) {
                    self.reject(id, &err, |reason| ServerMessage::ConfirmRejected { reason });
                }
            }
            ClientMessage::DeclareRole { role } => {
                if let Err(err) = self.declare_role(id, role) {
                    self.reject(id, &err, |reason| ServerMessage::RoleRejected { reason });
                }
            }
            ClientMessage::AdminStartPairing => {
                // screens already heard about a failure
                if let Err(err) = self.start_pairing(&mut rand::thread_rng()) {
                    if !self.hub.is_screen(id) {
                        self.reject(id, &err, |reason| ServerMessage::PairingError { reason });
                    }
                }
            }
            ClientMessage::AdminReset => self.reset(),
            ClientMessage::Ping => self.hub.send_to(id, ServerMessage::Pong),
        }
    }

    fn reject(&self, id: ConnectionId, err: &GameError, event: impl FnOnce(String) -> ServerMessage) {
        match err.kind() {
            ErrorKind::ResourceExhausted => tracing::warn!(%id, %err, "rejected"),
            kind => tracing::debug!(%id, ?kind, %err, "rejected"),
        }
        self.hub.send_to(id, event(err.to_string()));
    }

    pub fn declare_role(&mut self, id: ConnectionId, role: Role) -> Result<(), GameError> {
        self.registry.declare_role(id, role)?;
        self.hub.subscribe(id, role);
        tracing::info!(%id, ?role, "role declared");
        // a fresh screen catches up on everything through the snapshot
        self.publish_state();
        Ok(())
    }

    pub fn join(&mut self, id: ConnectionId, name: &str) -> Result<String, GameError> {
        let name = self.registry.join(id, name)?.to_string();
        self.hub.subscribe(id, Role::Mobile);
        tracing::info!(%id, %name, "joined");
        self.hub.send_to(id, ServerMessage::JoinAccepted { name: name.clone() });
        self.publish_state();
        Ok(name)
    }

    /// Confirm participation, drawing the next free card when drawing is enabled.
    pub fn confirm(&mut self, id: ConnectionId) -> Result<Option<u32>, GameError> {
        let card_id = self.confirm_quietly(id)?;
        self.publish_state();
        Ok(card_id)
    }

    fn confirm_quietly(&mut self, id: ConnectionId) -> Result<Option<u32>, GameError> {
        self.registry.get(id)?.check_confirmable()?;
        let card_id = if self.draw_cards {
            Some(self.pool.claim_next(id).ok_or(GameError::CardsExhausted)?)
        } else {
            None
        };
        if let Err(err) = self.registry.confirm(id, card_id) {
            if let Some(card_id) = card_id {
                self.pool.release(card_id);
            }
            return Err(err);
        }
        tracing::info!(%id, ?card_id, "confirmed");
        self.hub.send_to(id, ServerMessage::ConfirmAccepted);
        if let Some(card_id) = card_id {
            self.hub.send_to(id, ServerMessage::CardAssigned { card_id });
        }
        Ok(card_id)
    }

    /// Pair every eligible participant and reveal their cards. Returns the number of
    /// groups. With fewer than two eligible participants nothing changes and screens are
    /// told why.
    pub fn start_pairing<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<usize, GameError> {
        let candidates = self.registry.eligible(self.draw_cards);
        let groups = match pairing::pair(&candidates, rng) {
            Ok(groups) => groups,
            Err(err) => {
                tracing::warn!(eligible = candidates.len(), "not enough participants to pair");
                self.hub.to_screens(&ServerMessage::PairingError { reason: err.to_string() });
                return Err(err);
            }
        };
        tracing::info!(participants = candidates.len(), groups = groups.len(), "pairing generated");

        for group in &groups {
            for member in &group.members {
                self.registry.assign_group(member.id, group.group);
            }
        }
        let mut reveals = Vec::new();
        for candidate in &candidates {
            if let Some(card_id) = candidate.card_id {
                if let Some(card) = self.pool.reveal(card_id, &candidate.name) {
                    let name = card.display_name().unwrap_or(&candidate.name).to_string();
                    reveals.push((card_id, name));
                }
            }
        }
        self.pairings = groups;
        self.publish_state();

        for (card_id, name) in reveals {
            self.hub.to_screens(&ServerMessage::CardRevealed { card_id, name });
        }
        for group in &self.pairings {
            for member in &group.members {
                let partner = group.partner_of(member.id).map(|p| Partner { name: p.name.clone() });
                self.hub.send_to(member.id, ServerMessage::YourPairing { partner, group: group.group });
            }
        }
        self.hub.to_screens(&ServerMessage::PairingComplete);
        Ok(self.pairings.len())
    }

    /// Wipe participants, cards and pairings. Connections stay open: screens remain
    /// screens, everyone else starts over with an unknown role.
    pub fn reset(&mut self) {
        tracing::info!("resetting game state");
        self.hub.to_all(&ServerMessage::GameReset);
        self.registry.clear();
        self.pool.rebuild();
        self.pairings.clear();
        self.hub.clear_mobiles();
        for id in self.hub.connection_ids() {
            let role = if self.hub.is_screen(id) { Role::Screen } else { Role::Unknown };
            self.registry.register_as(id, role);
        }
        self.publish_state();
    }

    /// Debug tooling: confirm everyone who joined but has not confirmed yet.
    pub fn simulate_all_confirmed(&mut self) -> SimulationReport {
        let mut report = SimulationReport::default();
        for id in self.registry.unconfirmed() {
            match self.confirm_quietly(id) {
                Ok(card_id) => {
                    report.confirmed += 1;
                    report.cards_assigned += usize::from(card_id.is_some());
                }
                Err(err) => {
                    report.left_unconfirmed += 1;
                    self.hub.send_to(id, ServerMessage::ConfirmRejected { reason: err.to_string() });
                }
            }
        }
        tracing::info!(?report, "simulated confirmations");
        self.publish_state();
        report
    }

    pub fn participant_state(&self) -> ParticipantState {
        ParticipantState {
            total_joined: self.registry.joined_count(),
            total_confirmed: self.registry.confirmed_count(),
            total_connections: self.hub.connections(),
            participants: self.registry.public_list(),
        }
    }

    /// Republish the full public state to every screen.
    fn publish_state(&self) {
        self.hub.to_screens(&ServerMessage::ParticipantState(self.participant_state()));
        self.hub.to_screens(&ServerMessage::CardPoolState { cards: self.pool.public_state() });
        self.hub.to_screens(&ServerMessage::PairingResults { groups: self.pairings.clone() });
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;

    struct Client {
        id: ConnectionId,
        rx: UnboundedReceiver<ServerMessage>,
    }

    impl Client {
        fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    fn session(cards: usize) -> Session {
        Session::new(SessionSettings { card_count: cards, ..SessionSettings::default() }).unwrap()
    }

    fn connect(session: &mut Session) -> Client {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = session.connect(tx);
        Client { id, rx }
    }

    fn confirmed_mobile(session: &mut Session, name: &str) -> Client {
        let client = connect(session);
        session.join(client.id, name).unwrap();
        session.confirm(client.id).unwrap();
        client
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    #[test]
    fn join_twice_is_rejected_with_already_joined() {
        let mut s = session(5);
        let mut alice = connect(&mut s);
        s.handle(alice.id, ClientMessage::Join { name: "Alice".into() });
        s.handle(alice.id, ClientMessage::Join { name: "Alice".into() });
        let msgs = alice.drain();
        assert!(msgs.contains(&ServerMessage::JoinAccepted { name: "Alice".into() }));
        assert_eq!(msgs.last(), Some(&ServerMessage::JoinRejected { reason: "already joined".into() }));
    }

    #[test]
    fn confirm_before_join_is_rejected() {
        let mut s = session(5);
        let mut bob = connect(&mut s);
        s.handle(bob.id, ClientMessage::Confirm);
        assert_eq!(bob.drain().last(), Some(&ServerMessage::ConfirmRejected { reason: "must join first".into() }));
        assert_eq!(s.pool().available(), 5);
    }

    #[test]
    fn confirm_draws_card_and_notifies() {
        let mut s = session(5);
        let mut alice = connect(&mut s);
        s.join(alice.id, "Alice").unwrap();
        alice.drain();
        assert_eq!(s.confirm(alice.id), Ok(Some(1)));
        assert_eq!(alice.drain(), [ServerMessage::ConfirmAccepted, ServerMessage::CardAssigned { card_id: 1 }]);
        assert_eq!(s.confirm(alice.id), Err(GameError::AlreadyConfirmed));
    }

    #[test]
    fn exhausted_pool_rejects_without_confirming() {
        let mut s = session(1);
        confirmed_mobile(&mut s, "Alice");
        let mut bob = connect(&mut s);
        s.join(bob.id, "Bob").unwrap();
        s.handle(bob.id, ClientMessage::Confirm);
        assert_eq!(bob.drain().last(), Some(&ServerMessage::ConfirmRejected { reason: "no cards left".into() }));
        assert!(!s.registry().get(bob.id).unwrap().confirmed);
    }

    #[test]
    fn confirm_without_card_drawing_claims_nothing() {
        let mut s = Session::new(SessionSettings { draw_cards: false, ..SessionSettings::default() }).unwrap();
        let a = confirmed_mobile(&mut s, "A");
        let b = confirmed_mobile(&mut s, "B");
        assert_eq!(s.pool().available(), DEFAULT_CARD_COUNT);
        assert_eq!(s.registry().get(a.id).unwrap().card_id, None);
        assert_eq!(s.start_pairing(&mut rng()), Ok(1));
        assert_eq!(s.registry().get(b.id).unwrap().group, Some(1));
    }

    #[test]
    fn disconnect_recycles_unrevealed_card() {
        let mut s = session(5);
        let mut early = Vec::new();
        for name in ["A", "B", "C", "D"] {
            early.push(confirmed_mobile(&mut s, name));
        }
        let fifth = confirmed_mobile(&mut s, "E");
        assert_eq!(s.registry().get(fifth.id).unwrap().card_id, Some(5));

        s.disconnect(fifth.id);
        assert!(s.pool().get(5).unwrap().is_available());
        assert!(s.registry().get(fifth.id).is_err());

        let late = confirmed_mobile(&mut s, "F");
        assert_eq!(s.registry().get(late.id).unwrap().card_id, Some(5));
    }

    #[test]
    fn revealed_card_survives_disconnect() {
        let mut s = session(5);
        let a = confirmed_mobile(&mut s, "A");
        confirmed_mobile(&mut s, "B");
        s.start_pairing(&mut rng()).unwrap();
        s.disconnect(a.id);
        let card = s.pool().get(1).unwrap();
        assert!(card.revealed);
        assert_eq!(card.display_name(), Some("A"));
        assert_eq!(s.pool().available(), 3);
    }

    #[test]
    fn three_participants_make_one_pair_and_one_singleton() {
        let mut s = session(10);
        let mut screen = connect(&mut s);
        s.declare_role(screen.id, Role::Screen).unwrap();
        let mut clients: Vec<Client> = ["A", "B", "C"].into_iter().map(|n| confirmed_mobile(&mut s, n)).collect();
        screen.drain();
        for c in &mut clients {
            c.drain();
        }

        assert_eq!(s.start_pairing(&mut rng()), Ok(2));
        let groups = s.pairings();
        assert_eq!(groups.iter().filter(|g| g.members.len() == 2).count(), 1);
        assert_eq!(groups.iter().filter(|g| g.unpaired).count(), 1);

        let mut with_partner = 0;
        let mut alone = 0;
        for c in &mut clients {
            let pairing = c.drain().into_iter().find_map(|m| match m {
                ServerMessage::YourPairing { partner, group } => Some((partner, group)),
                _ => None,
            });
            match pairing {
                Some((Some(_), _)) => with_partner += 1,
                Some((None, group)) => {
                    alone += 1;
                    assert_eq!(group, 2);
                }
                None => panic!("participant got no pairing"),
            }
        }
        assert_eq!((with_partner, alone), (2, 1));

        let screen_msgs = screen.drain();
        let revealed: Vec<u32> = screen_msgs
            .iter()
            .filter_map(|m| match m {
                ServerMessage::CardRevealed { card_id, .. } => Some(*card_id),
                _ => None,
            })
            .collect();
        assert_eq!(revealed, [1, 2, 3]);
        assert_eq!(screen_msgs.last(), Some(&ServerMessage::PairingComplete));
        assert!(s.pool().public_state().iter().take(3).all(|c| c.revealed && c.name.is_some()));
    }

    #[test]
    fn pairing_with_one_participant_fails_without_changes() {
        let mut s = session(5);
        let mut screen = connect(&mut s);
        s.declare_role(screen.id, Role::Screen).unwrap();
        let mut alone = confirmed_mobile(&mut s, "A");
        screen.drain();
        alone.drain();

        s.handle(alone.id, ClientMessage::AdminStartPairing);
        assert!(s.pairings().is_empty());
        assert!(!s.pool().get(1).unwrap().revealed);
        assert!(matches!(screen.drain().as_slice(), [ServerMessage::PairingError { .. }]));
        assert!(matches!(alone.drain().as_slice(), [ServerMessage::PairingError { .. }]));
    }

    #[test]
    fn pairing_again_replaces_previous_result() {
        let mut s = session(10);
        for name in ["A", "B", "C", "D"] {
            confirmed_mobile(&mut s, name);
        }
        s.start_pairing(&mut rng()).unwrap();
        confirmed_mobile(&mut s, "E");
        assert_eq!(s.start_pairing(&mut rng()), Ok(3));
        assert_eq!(s.pairings().iter().map(|g| g.members.len()).sum::<usize>(), 5);
    }

    #[test]
    fn reset_clears_everything_but_keeps_screens() {
        let mut s = session(4);
        let mut screen = connect(&mut s);
        s.declare_role(screen.id, Role::Screen).unwrap();
        let mut a = confirmed_mobile(&mut s, "A");
        confirmed_mobile(&mut s, "B");
        s.start_pairing(&mut rng()).unwrap();
        screen.drain();
        a.drain();

        s.handle(a.id, ClientMessage::AdminReset);

        // one fresh record per live connection, none of them in the game
        assert_eq!(s.registry().len(), 3);
        assert_eq!(s.registry().joined_count(), 0);
        assert_eq!(s.registry().confirmed_count(), 0);
        assert!(s.registry().eligible(false).is_empty());
        assert!(s.registry().public_list().is_empty());
        assert!(s.pairings().is_empty());
        assert_eq!(s.pool().available(), 4);
        assert!(s.pool().public_state().iter().all(|c| !c.claimed && !c.revealed));
        assert_eq!(s.registry().get(screen.id).unwrap().role, Role::Screen);
        assert_eq!(s.registry().get(a.id).unwrap().role, Role::Unknown);

        assert_eq!(a.drain(), [ServerMessage::GameReset]);
        let screen_msgs = screen.drain();
        assert_eq!(screen_msgs.first(), Some(&ServerMessage::GameReset));
        assert!(screen_msgs.contains(&ServerMessage::PairingResults { groups: vec![] }));

        s.join(a.id, "A again").unwrap();
        assert_eq!(s.confirm(a.id), Ok(Some(1)));
    }

    #[test]
    fn late_screen_sees_revealed_cards_and_pairings() {
        let mut s = session(3);
        confirmed_mobile(&mut s, "A");
        confirmed_mobile(&mut s, "B");
        s.start_pairing(&mut rng()).unwrap();

        let mut screen = connect(&mut s);
        s.handle(screen.id, ClientMessage::DeclareRole { role: Role::Screen });
        let msgs = screen.drain();
        let cards = msgs
            .iter()
            .find_map(|m| match m {
                ServerMessage::CardPoolState { cards } => Some(cards.clone()),
                _ => None,
            })
            .unwrap();
        let names: Vec<_> = cards.iter().filter_map(|c| c.name.clone()).collect();
        assert_eq!(names.len(), 2);
        assert!(msgs.iter().any(|m| matches!(m, ServerMessage::PairingResults { groups } if groups.len() == 1)));
    }

    #[test]
    fn role_cannot_be_redeclared() {
        let mut s = session(3);
        let mut c = connect(&mut s);
        s.handle(c.id, ClientMessage::DeclareRole { role: Role::Screen });
        c.drain();
        s.handle(c.id, ClientMessage::DeclareRole { role: Role::Mobile });
        assert_eq!(c.drain(), [ServerMessage::RoleRejected { reason: "role already declared".into() }]);
    }

    #[test]
    fn declaring_unknown_role_is_rejected() {
        let mut s = session(3);
        let mut c = connect(&mut s);
        c.drain();
        s.handle(c.id, ClientMessage::DeclareRole { role: Role::Unknown });
        assert_eq!(
            c.drain(),
            [ServerMessage::RoleRejected { reason: "role must be screen or mobile".into() }]
        );
        assert_eq!(s.registry().get(c.id).unwrap().role, Role::Unknown);
    }

    #[test]
    fn simulate_confirms_until_cards_run_out() {
        let mut s = session(2);
        let mut clients = Vec::new();
        for name in ["A", "B", "C"] {
            let c = connect(&mut s);
            s.join(c.id, name).unwrap();
            clients.push(c);
        }
        let report = s.simulate_all_confirmed();
        assert_eq!(report, SimulationReport { confirmed: 2, cards_assigned: 2, left_unconfirmed: 1 });
        assert_eq!(s.registry().confirmed_count(), 2);
        assert_eq!(s.pool().available(), 0);
        assert!(s.pool().public_state().iter().all(|c| c.claimed));
    }

    #[test]
    fn participant_state_counts_roles() {
        let mut s = session(5);
        let screen = connect(&mut s);
        s.declare_role(screen.id, Role::Screen).unwrap();
        confirmed_mobile(&mut s, "A");
        let b = connect(&mut s);
        s.join(b.id, "B").unwrap();
        connect(&mut s);

        let state = s.participant_state();
        assert_eq!(state.total_joined, 2);
        assert_eq!(state.total_confirmed, 1);
        assert_eq!(state.total_connections, 4);
        assert_eq!(state.participants.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(), ["A", "B"]);
    }
}
