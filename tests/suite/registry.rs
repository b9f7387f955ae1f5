//! Uniqueness across the in-memory and SQLite-backed registries.

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use tambola_core::{DEFAULT_MAX_ATTEMPTS, Generator, MemoryFingerprints, Registry};
use tambola_store::{GameStore, TicketDesk};
use tambola_types::{DeviceId, Fingerprint, PlayerName};

use crate::common::temp_store;

#[test]
fn thousand_sequential_issuances_are_distinct() {
    let registry = Registry::in_memory();
    let mut generator = Generator::seeded(2024);
    let mut seen = HashSet::new();
    for _ in 0..1_000 {
        let issued = registry.generate_unique(&mut generator, DEFAULT_MAX_ATTEMPTS).unwrap();
        assert!(issued.is_unique());
        assert!(seen.insert(issued.fingerprint().clone()));
    }
    assert_eq!(registry.len().unwrap(), 1_000);
}

#[test]
fn shared_memory_registry_across_threads() {
    let registry = Arc::new(Registry::new(MemoryFingerprints::new()));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                (0..100)
                    .map(|_| registry.generate_unique_ticket(DEFAULT_MAX_ATTEMPTS).unwrap())
                    .map(|issued| issued.fingerprint().clone())
                    .collect::<Vec<Fingerprint>>()
            })
        })
        .collect();

    let mut all = HashSet::new();
    for handle in handles {
        for fingerprint in handle.join().unwrap() {
            assert!(all.insert(fingerprint));
        }
    }
    assert_eq!(all.len(), 400);
}

#[test]
fn sqlite_registry_is_atomic_across_connections() {
    let (dir, _store) = temp_store();
    let path = dir.path().join("tambola.db");

    // Every thread races the same seed sequence through its own connection,
    // so each candidate is contended by all of them.
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            thread::spawn(move || {
                let registry = Registry::new(GameStore::open(&path).unwrap());
                let mut generator = Generator::seeded(11);
                (0..25)
                    .filter_map(|_| {
                        let ticket = generator.generate();
                        registry.register(&ticket).unwrap().then(|| ticket.fingerprint())
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        winners.extend(handle.join().unwrap());
    }
    let distinct: HashSet<_> = winners.iter().cloned().collect();
    assert_eq!(winners.len(), distinct.len());
    assert_eq!(winners.len(), 25);
}

#[test]
fn issued_fingerprints_survive_restart() {
    let (dir, store) = temp_store();
    let path = dir.path().join("tambola.db");
    let desk = TicketDesk::new(Arc::clone(&store));
    let player = desk
        .register(&DeviceId::generate(), &PlayerName::new("Dev").unwrap())
        .unwrap()
        .into_player();
    drop(desk);
    drop(store);

    let reopened = Registry::new(GameStore::open(&path).unwrap());
    assert!(reopened.is_registered(&player.ticket).unwrap());
    assert!(!reopened.register(&player.ticket).unwrap());
}

#[test]
fn concurrent_desk_registrations_get_distinct_tickets() {
    let (_dir, store) = temp_store();
    let desk = Arc::new(TicketDesk::new(store));
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let desk = Arc::clone(&desk);
            thread::spawn(move || {
                (0..10)
                    .map(|i| {
                        let name = PlayerName::new(format!("t{t}-{i}")).unwrap();
                        desk.register(&DeviceId::generate(), &name)
                            .unwrap()
                            .into_player()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut tickets = HashSet::new();
    for handle in handles {
        for player in handle.join().unwrap() {
            assert!(player.unique_ticket);
            assert!(tickets.insert(player.fingerprint));
        }
    }
    assert_eq!(tickets.len(), 80);
    assert_eq!(desk.store().player_count().unwrap(), 80);
}

#[test]
fn same_device_racing_registrations_share_one_player() {
    let (_dir, store) = temp_store();
    let desk = Arc::new(TicketDesk::new(store));
    let device = DeviceId::generate();
    let handles: Vec<_> = (0..6)
        .map(|_| {
            let desk = Arc::clone(&desk);
            let device = device.clone();
            thread::spawn(move || {
                desk.register(&device, &PlayerName::new("Same").unwrap())
                    .unwrap()
                    .into_player()
            })
        })
        .collect();

    let players: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(players.iter().all(|p| p == &players[0]));
    assert_eq!(desk.store().player_count().unwrap(), 1);
}
