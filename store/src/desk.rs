use std::sync::Arc;

use tracing::{info, warn};

use tambola_core::{DEFAULT_MAX_ATTEMPTS, Registry};
use tambola_types::{DeviceId, PlayerName};

use crate::{GameStore, Registration, Result};

/// Issues tickets to players: one unique ticket per device.
pub struct TicketDesk {
    store: Arc<GameStore>,
    registry: Registry<Arc<GameStore>>,
    max_attempts: u32,
}

impl TicketDesk {
    pub fn new(store: Arc<GameStore>) -> Self {
        Self::with_max_attempts(store, DEFAULT_MAX_ATTEMPTS)
    }

    pub fn with_max_attempts(store: Arc<GameStore>, max_attempts: u32) -> Self {
        Self {
            registry: Registry::new(Arc::clone(&store)),
            store,
            max_attempts,
        }
    }

    #[must_use]
    pub fn store(&self) -> &GameStore {
        &self.store
    }

    /// Register `name` on `device_id`, issuing a fresh unique ticket.
    ///
    /// A device that already holds a ticket gets it back unchanged. Two
    /// concurrent registrations for the same device both end up with the
    /// ticket that won the insert; the loser's fingerprint stays recorded.
    pub fn register(&self, device_id: &DeviceId, name: &PlayerName) -> Result<Registration> {
        if let Some(player) = self.store.player_by_device(device_id)? {
            info!(player = %player.id, "Device already registered");
            return Ok(Registration::Existing(player));
        }

        let issued = self.registry.generate_unique_ticket(self.max_attempts)?;
        if !issued.is_unique() {
            warn!(
                device = %device_id,
                attempts = issued.attempts(),
                "Registering player with a duplicate ticket"
            );
        }
        self.store.insert_player(device_id, name, &issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desk() -> TicketDesk {
        TicketDesk::new(Arc::new(GameStore::open_in_memory().unwrap()))
    }

    #[test]
    fn register_issues_one_ticket_per_device() {
        let desk = desk();
        let device = DeviceId::generate();
        let name = PlayerName::new("Asha").unwrap();

        let first = desk.register(&device, &name).unwrap();
        assert!(first.is_new());
        assert!(first.player().unique_ticket);

        let again = desk.register(&device, &name).unwrap();
        assert!(!again.is_new());
        assert_eq!(again.player(), first.player());
        assert_eq!(desk.store().fingerprint_count().unwrap(), 1);
    }

    #[test]
    fn distinct_devices_get_distinct_tickets() {
        let desk = desk();
        let mut tickets = Vec::new();
        for i in 0..50 {
            let name = PlayerName::new(format!("p{i}")).unwrap();
            let player = desk
                .register(&DeviceId::generate(), &name)
                .unwrap()
                .into_player();
            assert!(!tickets.contains(&player.ticket));
            tickets.push(player.ticket);
        }
        assert_eq!(desk.store().player_count().unwrap(), 50);
    }

    #[test]
    fn zero_attempts_still_issues() {
        let desk = TicketDesk::with_max_attempts(Arc::new(GameStore::open_in_memory().unwrap()), 0);
        let name = PlayerName::new("Zed").unwrap();
        let registration = desk.register(&DeviceId::generate(), &name).unwrap();
        assert!(registration.player().unique_ticket);
    }
}
