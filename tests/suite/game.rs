//! A full game: registration, calling, claims, export.

use std::fs;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use tambola_core::ClaimError;
use tambola_store::{StoreError, TicketDesk};
use tambola_types::{ClaimStatus, DeviceId, PlayerName, PrizeKind, Ticket};

use crate::common::temp_store;

#[test]
fn full_game_round_trip() {
    let (dir, store) = temp_store();
    let desk = TicketDesk::new(Arc::clone(&store));

    let alice = DeviceId::generate();
    let bob = DeviceId::generate();
    let alice_ticket = desk
        .register(&alice, &PlayerName::new("Alice").unwrap())
        .unwrap()
        .into_player()
        .ticket;
    desk.register(&bob, &PlayerName::new("Bob").unwrap())
        .unwrap();

    for number in alice_ticket.row_numbers(0) {
        store.call_number(number).unwrap();
    }

    let early = store
        .submit_claim(&alice, PrizeKind::EarlyFive, false)
        .unwrap();
    let top = store.submit_claim(&alice, PrizeKind::TopLine, false).unwrap();
    assert!(early.verified && top.verified);

    store.approve_claim(top.id).unwrap();
    store.reject_claim(early.id).unwrap();

    let bob_top = store.submit_claim(&bob, PrizeKind::TopLine, true).unwrap_err();
    assert!(matches!(
        bob_top,
        StoreError::Claim(ClaimError::AlreadyAwarded(PrizeKind::TopLine))
    ));

    // Call everything else; full house becomes verifiable for both.
    let mut rng = StdRng::seed_from_u64(8);
    while store.call_next(&mut rng).is_ok() {}
    assert!(store.called_numbers().unwrap().is_complete());

    let full = store
        .submit_claim(&bob, PrizeKind::FullHouse, false)
        .unwrap();
    assert!(full.verified);
    store.approve_claim(full.id).unwrap();

    let statuses: Vec<_> = store
        .list_claims()
        .unwrap()
        .into_iter()
        .map(|c| (c.prize, c.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            (PrizeKind::EarlyFive, ClaimStatus::Rejected),
            (PrizeKind::TopLine, ClaimStatus::Approved),
            (PrizeKind::FullHouse, ClaimStatus::Approved),
        ]
    );

    let path = dir.path().join("export.json");
    store.export_json(&path).unwrap();
    let exported: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(exported["called"].as_array().unwrap().len(), 90);
    assert_eq!(exported["claims"].as_array().unwrap().len(), 3);

    let tickets: Vec<Ticket> = exported["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| serde_json::from_value(p["ticket"].clone()).unwrap())
        .collect();
    assert!(tickets.contains(&alice_ticket));

    store.reset_game().unwrap();
    assert!(store.called_numbers().unwrap().is_empty());
    assert!(store.list_claims().unwrap().is_empty());
    assert_eq!(store.player_count().unwrap(), 2);
}

#[test]
fn deleting_a_player_drops_their_claims() {
    let (_dir, store) = temp_store();
    let desk = TicketDesk::new(Arc::clone(&store));
    let device = DeviceId::generate();
    let player = desk
        .register(&device, &PlayerName::new("Temp").unwrap())
        .unwrap()
        .into_player();
    store
        .submit_claim(&device, PrizeKind::FourCorners, true)
        .unwrap();

    assert!(store.delete_player(player.id).unwrap());
    assert!(store.list_claims().unwrap().is_empty());
    assert_eq!(store.player_by_device(&device).unwrap(), None);
}
