//! Called numbers and prize claims for the current game.

use anyhow::Context;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use tracing::info;

use tambola_core::claims::{self, ClaimError};
use tambola_core::draw_number;
use tambola_types::{
    CallError, CalledNumbers, ClaimId, ClaimStatus, DeviceId, PlayerId, PrizeKind, TicketCode,
};

use crate::players::find_by_device;
use crate::{GameStore, Result, StoreError, now_iso8601};

/// A prize claim and its approval state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claim {
    pub id: ClaimId,
    pub player_id: PlayerId,
    pub player_name: String,
    pub ticket_code: TicketCode,
    pub prize: PrizeKind,
    pub status: ClaimStatus,
    /// Whether the pattern was complete against the called numbers at
    /// submission time.
    pub verified: bool,
    pub claimed_at: String,
    pub decided_at: Option<String>,
}

const CLAIM_SELECT: &str = "SELECT p.id, p.player_id, u.name, p.ticket_code, p.prize_type, \
     p.status, p.verified, p.claimed_at, p.decided_at \
     FROM prizes p JOIN players u ON u.id = p.player_id";

struct ClaimRow {
    id: i64,
    player_id: i64,
    player_name: String,
    ticket_code: String,
    prize: String,
    status: String,
    verified: bool,
    claimed_at: String,
    decided_at: Option<String>,
}

fn read_claim(row: &Row<'_>) -> rusqlite::Result<ClaimRow> {
    Ok(ClaimRow {
        id: row.get(0)?,
        player_id: row.get(1)?,
        player_name: row.get(2)?,
        ticket_code: row.get(3)?,
        prize: row.get(4)?,
        status: row.get(5)?,
        verified: row.get(6)?,
        claimed_at: row.get(7)?,
        decided_at: row.get(8)?,
    })
}

impl ClaimRow {
    fn into_claim(self) -> Result<Claim> {
        let id = self.id;
        let corrupt = |reason: String| StoreError::Corrupt {
            table: "prizes",
            id,
            reason,
        };
        Ok(Claim {
            id: ClaimId::new(self.id),
            player_id: PlayerId::new(self.player_id),
            player_name: self.player_name,
            ticket_code: TicketCode::parse(&self.ticket_code).map_err(|e| corrupt(e.to_string()))?,
            prize: PrizeKind::parse(&self.prize).map_err(|e| corrupt(e.to_string()))?,
            status: ClaimStatus::parse(&self.status).map_err(|e| corrupt(e.to_string()))?,
            verified: self.verified,
            claimed_at: self.claimed_at,
            decided_at: self.decided_at,
        })
    }
}

fn load_called(db: &Connection) -> Result<CalledNumbers> {
    let mut stmt = db
        .prepare("SELECT number FROM called_numbers ORDER BY seq ASC")
        .context("Failed to prepare called numbers query")?;
    let numbers = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .context("Failed to query called numbers")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read called number")?;

    let mut called = CalledNumbers::new();
    for number in numbers {
        let value = u8::try_from(number).map_err(|_| StoreError::Corrupt {
            table: "called_numbers",
            id: number,
            reason: "number out of range".to_string(),
        })?;
        called.push(value)?;
    }
    Ok(called)
}

fn load_claim(db: &Connection, id: ClaimId) -> Result<Claim> {
    let sql = format!("{CLAIM_SELECT} WHERE p.id = ?1");
    let row = db
        .query_row(&sql, params![id.value()], read_claim)
        .optional()
        .context("Failed to look up claim")?;
    match row {
        Some(row) => row.into_claim(),
        None => Err(ClaimError::NotFound(id).into()),
    }
}

fn prize_awarded(db: &Connection, prize: PrizeKind) -> Result<bool> {
    let awarded = db
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM prizes WHERE prize_type = ?1 AND status = 'approved')",
            params![prize.as_str()],
            |row| row.get(0),
        )
        .context("Failed to check awarded prizes")?;
    Ok(awarded)
}

/// Whether `player` already has a claim for `prize` that is not rejected.
fn has_open_claim(db: &Connection, player: PlayerId, prize: PrizeKind) -> Result<bool> {
    let mut stmt = db
        .prepare("SELECT id, status FROM prizes WHERE player_id = ?1 AND prize_type = ?2")
        .context("Failed to prepare open claims query")?;
    let rows = stmt
        .query_map(params![player.value(), prize.as_str()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })
        .context("Failed to query open claims")?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("Failed to read claim status")?;

    for (id, status) in rows {
        let status = ClaimStatus::parse(&status).map_err(|e| StoreError::Corrupt {
            table: "prizes",
            id,
            reason: e.to_string(),
        })?;
        if status.is_open() {
            return Ok(true);
        }
    }
    Ok(false)
}

impl GameStore {
    /// Numbers called so far, in call order.
    pub fn called_numbers(&self) -> Result<CalledNumbers> {
        load_called(&self.conn())
    }

    /// Record `number` as called.
    pub fn call_number(&self, number: u8) -> Result<CalledNumbers> {
        let mut db = self.conn();
        let tx = db.transaction().context("Failed to start call transaction")?;
        let mut called = load_called(&tx)?;
        called.push(number)?;
        tx.execute(
            "INSERT INTO called_numbers (number, called_at) VALUES (?1, ?2)",
            params![i64::from(number), now_iso8601()],
        )
        .context("Failed to record called number")?;
        tx.commit().context("Failed to commit called number")?;
        info!(number, count = called.len(), "Number called");
        Ok(called)
    }

    /// Draw and record the next number. Errors with [`CallError::Exhausted`]
    /// once all 90 numbers are out.
    pub fn call_next<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<u8> {
        let mut db = self.conn();
        let tx = db.transaction().context("Failed to start call transaction")?;
        let called = load_called(&tx)?;
        let number = draw_number(&called, rng).ok_or(CallError::Exhausted)?;
        tx.execute(
            "INSERT INTO called_numbers (number, called_at) VALUES (?1, ?2)",
            params![i64::from(number), now_iso8601()],
        )
        .context("Failed to record called number")?;
        tx.commit().context("Failed to commit called number")?;
        info!(number, count = called.len() + 1, "Number called");
        Ok(number)
    }

    /// Clear called numbers and claims. Players and issued fingerprints stay.
    pub fn reset_game(&self) -> Result<()> {
        self.conn()
            .execute_batch("DELETE FROM prizes; DELETE FROM called_numbers;")
            .context("Failed to reset game")?;
        info!("Game reset");
        Ok(())
    }

    /// File a claim for `prize` on behalf of the player at `device_id`.
    ///
    /// The pattern is checked against the numbers called so far. Incomplete
    /// patterns are refused unless `allow_unverified` is set, in which case
    /// the claim is stored with `verified = false` for an admin to judge.
    pub fn submit_claim(
        &self,
        device_id: &DeviceId,
        prize: PrizeKind,
        allow_unverified: bool,
    ) -> Result<Claim> {
        let mut db = self.conn();
        let tx = db.transaction().context("Failed to start claim transaction")?;

        let player = find_by_device(&tx, device_id)?
            .ok_or_else(|| StoreError::UnknownPlayer(device_id.to_string()))?;

        if prize_awarded(&tx, prize)? {
            return Err(ClaimError::AlreadyAwarded(prize).into());
        }

        if has_open_claim(&tx, player.id, prize)? {
            return Err(ClaimError::DuplicateClaim(prize).into());
        }

        let called = load_called(&tx)?;
        let check = claims::check_claim(prize, &player.ticket, &called);
        let verified = check.is_complete();
        if !verified && !allow_unverified {
            check.into_result()?;
        }

        tx.execute(
            "INSERT INTO prizes (player_id, ticket_code, prize_type, status, verified, claimed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                player.id.value(),
                player.ticket_code.as_str(),
                prize.as_str(),
                ClaimStatus::Pending.as_str(),
                verified,
                now_iso8601(),
            ],
        )
        .context("Failed to insert claim")?;
        let id = ClaimId::new(tx.last_insert_rowid());
        let claim = load_claim(&tx, id)?;
        tx.commit().context("Failed to commit claim")?;

        info!(claim = %id, player = %player.id, prize = prize.as_str(), verified, "Claim submitted");
        Ok(claim)
    }

    pub fn approve_claim(&self, id: ClaimId) -> Result<Claim> {
        self.decide_claim(id, ClaimStatus::Approved)
    }

    pub fn reject_claim(&self, id: ClaimId) -> Result<Claim> {
        self.decide_claim(id, ClaimStatus::Rejected)
    }

    fn decide_claim(&self, id: ClaimId, status: ClaimStatus) -> Result<Claim> {
        let mut db = self.conn();
        let tx = db.transaction().context("Failed to start claim transaction")?;

        let claim = load_claim(&tx, id)?;
        claims::transition(id, claim.status, status)?;
        if status == ClaimStatus::Approved && prize_awarded(&tx, claim.prize)? {
            return Err(ClaimError::AlreadyAwarded(claim.prize).into());
        }

        tx.execute(
            "UPDATE prizes SET status = ?1, decided_at = ?2 WHERE id = ?3",
            params![status.as_str(), now_iso8601(), id.value()],
        )
        .context("Failed to update claim")?;
        let claim = load_claim(&tx, id)?;
        tx.commit().context("Failed to commit claim decision")?;

        info!(claim = %id, status = status.as_str(), prize = claim.prize.as_str(), "Claim decided");
        Ok(claim)
    }

    /// All claims in submission order.
    pub fn list_claims(&self) -> Result<Vec<Claim>> {
        let db = self.conn();
        let sql = format!("{CLAIM_SELECT} ORDER BY p.id ASC");
        let mut stmt = db.prepare(&sql).context("Failed to prepare claims query")?;
        let rows = stmt
            .query_map([], read_claim)
            .context("Failed to query claims")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read claim row")?;
        rows.into_iter().map(ClaimRow::into_claim).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tambola_core::{Generator, Registry};
    use tambola_types::{PlayerName, Ticket};

    fn register(store: &GameStore, seed: u64) -> (DeviceId, Ticket) {
        let issued = Registry::new(store)
            .generate_unique(&mut Generator::seeded(seed), 10)
            .unwrap();
        let device = DeviceId::generate();
        let name = PlayerName::new(format!("player-{seed}")).unwrap();
        let player = store
            .insert_player(&device, &name, &issued)
            .unwrap()
            .into_player();
        (device, player.ticket)
    }

    fn call_row(store: &GameStore, ticket: &Ticket, row: usize) {
        for number in ticket.row_numbers(row) {
            if !store.called_numbers().unwrap().contains(number) {
                store.call_number(number).unwrap();
            }
        }
    }

    #[test]
    fn call_number_rejects_repeat() {
        let store = GameStore::open_in_memory().unwrap();
        store.call_number(17).unwrap();
        let err = store.call_number(17).unwrap_err();
        assert!(matches!(err, StoreError::Call(CallError::AlreadyCalled(17))));
        let err = store.call_number(0).unwrap_err();
        assert!(matches!(err, StoreError::Call(CallError::OutOfRange(0))));
    }

    #[test]
    fn call_next_exhausts_after_ninety() {
        let store = GameStore::open_in_memory().unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        for _ in 0..90 {
            store.call_next(&mut rng).unwrap();
        }
        assert!(store.called_numbers().unwrap().is_complete());
        let err = store.call_next(&mut rng).unwrap_err();
        assert!(matches!(err, StoreError::Call(CallError::Exhausted)));
    }

    #[test]
    fn incomplete_claim_is_refused() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, _) = register(&store, 1);
        let err = store
            .submit_claim(&device, PrizeKind::TopLine, false)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Claim(ClaimError::NotComplete { marked: 0, needed: 5, .. })
        ));
        assert!(store.list_claims().unwrap().is_empty());
    }

    #[test]
    fn unverified_claim_allowed_when_configured() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, _) = register(&store, 1);
        let claim = store
            .submit_claim(&device, PrizeKind::FullHouse, true)
            .unwrap();
        assert!(!claim.verified);
        assert_eq!(claim.status, ClaimStatus::Pending);
    }

    #[test]
    fn claim_lifecycle() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, ticket) = register(&store, 2);
        call_row(&store, &ticket, 0);

        let claim = store
            .submit_claim(&device, PrizeKind::TopLine, false)
            .unwrap();
        assert!(claim.verified);
        assert_eq!(claim.player_name, "player-2");

        let dup = store
            .submit_claim(&device, PrizeKind::TopLine, false)
            .unwrap_err();
        assert!(matches!(
            dup,
            StoreError::Claim(ClaimError::DuplicateClaim(PrizeKind::TopLine))
        ));

        let approved = store.approve_claim(claim.id).unwrap();
        assert_eq!(approved.status, ClaimStatus::Approved);
        assert!(approved.decided_at.is_some());

        let again = store.reject_claim(claim.id).unwrap_err();
        assert!(matches!(
            again,
            StoreError::Claim(ClaimError::AlreadyDecided { .. })
        ));
    }

    #[test]
    fn prize_awarded_only_once() {
        let store = GameStore::open_in_memory().unwrap();
        let (first, _) = register(&store, 3);
        let (second, _) = register(&store, 4);

        let a = store.submit_claim(&first, PrizeKind::FullHouse, true).unwrap();
        let b = store
            .submit_claim(&second, PrizeKind::FullHouse, true)
            .unwrap();
        store.approve_claim(a.id).unwrap();

        let err = store.approve_claim(b.id).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Claim(ClaimError::AlreadyAwarded(PrizeKind::FullHouse))
        ));
        let err = store
            .submit_claim(&second, PrizeKind::FullHouse, true)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Claim(ClaimError::AlreadyAwarded(PrizeKind::FullHouse))
        ));
    }

    #[test]
    fn rejected_claim_can_be_refiled() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, _) = register(&store, 5);
        let claim = store
            .submit_claim(&device, PrizeKind::EarlyFive, true)
            .unwrap();
        store.reject_claim(claim.id).unwrap();
        assert!(
            store
                .submit_claim(&device, PrizeKind::EarlyFive, true)
                .is_ok()
        );
    }

    #[test]
    fn pending_claim_blocks_refiling() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, _) = register(&store, 8);
        store
            .submit_claim(&device, PrizeKind::MiddleLine, true)
            .unwrap();
        let err = store
            .submit_claim(&device, PrizeKind::MiddleLine, true)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Claim(ClaimError::DuplicateClaim(PrizeKind::MiddleLine))
        ));
        // A different prize is still open to the same player.
        assert!(
            store
                .submit_claim(&device, PrizeKind::BottomLine, true)
                .is_ok()
        );
    }

    #[test]
    fn corrupt_claim_status_is_reported() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, _) = register(&store, 9);
        let claim = store
            .submit_claim(&device, PrizeKind::TopLine, true)
            .unwrap();
        store
            .conn()
            .execute(
                "UPDATE prizes SET status = 'lost' WHERE id = ?1",
                params![claim.id.value()],
            )
            .unwrap();
        let err = store
            .submit_claim(&device, PrizeKind::TopLine, true)
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { table: "prizes", .. }));
    }

    #[test]
    fn unknown_device_and_claim() {
        let store = GameStore::open_in_memory().unwrap();
        let err = store
            .submit_claim(&DeviceId::generate(), PrizeKind::TopLine, true)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownPlayer(_)));
        let err = store.approve_claim(ClaimId::new(99)).unwrap_err();
        assert!(matches!(err, StoreError::Claim(ClaimError::NotFound(_))));
    }

    #[test]
    fn reset_clears_game_state_only() {
        let store = GameStore::open_in_memory().unwrap();
        let (device, _) = register(&store, 6);
        store.call_number(5).unwrap();
        store
            .submit_claim(&device, PrizeKind::EarlyFive, true)
            .unwrap();

        store.reset_game().unwrap();
        assert!(store.called_numbers().unwrap().is_empty());
        assert!(store.list_claims().unwrap().is_empty());
        assert_eq!(store.player_count().unwrap(), 1);
        assert_eq!(store.fingerprint_count().unwrap(), 1);
    }
}
