//! Ticket generation.
//!
//! Generation runs in two phases:
//!
//! 1. **Layout.** Decide which cells are filled. Column counts are a random
//!    partition of 15 into 9 parts in `[1, 3]`; columns are then placed in
//!    non-increasing count order, each into the rows with the most remaining
//!    capacity. This is the Gale-Ryser greedy construction, so row sums always
//!    land on exactly 5 without any repair loop.
//! 2. **Values.** Each column draws its numbers without replacement from its
//!    [`ColumnRange`] and writes them top to bottom in ascending order.
//!
//! If the randomized layout ever fails to validate, a deterministic
//! round-robin layout is used instead. Callers never see an error.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::warn;

use tambola_types::{
    COLUMNS, ColumnRange, Grid, MAX_PER_COLUMN, NUMBERS_PER_ROW, NUMBERS_PER_TICKET, ROWS, Ticket,
};

/// Filled/blank mask for a ticket.
type Layout = [[bool; COLUMNS]; ROWS];

/// Anything that can hand out candidate tickets.
pub trait TicketSource {
    fn next_ticket(&mut self) -> Ticket;
}

/// Random ticket generator over an injectable RNG.
#[derive(Debug, Clone)]
pub struct Generator<R> {
    rng: R,
}

impl<R: Rng> Generator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate(&mut self) -> Ticket {
        generate_ticket_with(&mut self.rng)
    }
}

impl Generator<StdRng> {
    /// Deterministic generator; the same seed always yields the same tickets.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TicketSource for Generator<R> {
    fn next_ticket(&mut self) -> Ticket {
        self.generate()
    }
}

/// Generate one ticket from the thread-local RNG.
#[must_use]
pub fn generate_ticket() -> Ticket {
    generate_ticket_with(&mut rand::rng())
}

/// Generate one ticket from `rng`.
pub fn generate_ticket_with<R: Rng + ?Sized>(rng: &mut R) -> Ticket {
    if let Some(layout) = random_layout(rng) {
        match Ticket::new(fill_values(&layout, rng)) {
            Ok(ticket) => return ticket,
            Err(err) => warn!(%err, "Random layout produced an invalid ticket"),
        }
    } else {
        warn!("Random layout did not converge");
    }

    warn!("Falling back to round-robin layout");
    Ticket::new(fill_values(&round_robin_layout(), rng))
        .expect("round-robin layout always satisfies ticket invariants")
}

/// Random partition of 15 into 9 column counts, each in `[1, 3]`.
fn column_counts<R: Rng + ?Sized>(rng: &mut R) -> [usize; COLUMNS] {
    let mut counts = [1usize; COLUMNS];
    for _ in COLUMNS..NUMBERS_PER_TICKET {
        let open: Vec<usize> = (0..COLUMNS)
            .filter(|column| counts[*column] < MAX_PER_COLUMN)
            .collect();
        let pick = open[rng.random_range(0..open.len())];
        counts[pick] += 1;
    }
    counts
}

fn random_layout<R: Rng + ?Sized>(rng: &mut R) -> Option<Layout> {
    let counts = column_counts(rng);

    let mut order: Vec<usize> = (0..COLUMNS).collect();
    shuffle(&mut order, rng);
    // Stable sort keeps the shuffled order among equal counts.
    order.sort_by(|a, b| counts[*b].cmp(&counts[*a]));

    let mut capacity = [NUMBERS_PER_ROW; ROWS];
    let mut layout = [[false; COLUMNS]; ROWS];
    for column in order {
        let mut rows: Vec<usize> = (0..ROWS).collect();
        shuffle(&mut rows, rng);
        rows.sort_by(|a, b| capacity[*b].cmp(&capacity[*a]));

        for &row in rows.iter().take(counts[column]) {
            if capacity[row] == 0 {
                return None;
            }
            capacity[row] -= 1;
            layout[row][column] = true;
        }
    }

    capacity.iter().all(|left| *left == 0).then_some(layout)
}

/// Deterministic layout: one cell per column in row `column % 3`, then the
/// remaining cells go to the emptiest row and, within it, the emptiest free
/// column.
fn round_robin_layout() -> Layout {
    let mut layout = [[false; COLUMNS]; ROWS];
    let mut row_counts = [0usize; ROWS];
    let mut column_counts = [0usize; COLUMNS];

    for column in 0..COLUMNS {
        let row = column % ROWS;
        layout[row][column] = true;
        row_counts[row] += 1;
        column_counts[column] += 1;
    }

    for _ in COLUMNS..NUMBERS_PER_TICKET {
        let Some(row) = (0..ROWS)
            .filter(|row| row_counts[*row] < NUMBERS_PER_ROW)
            .min_by_key(|row| row_counts[*row])
        else {
            break;
        };
        let Some(column) = (0..COLUMNS)
            .filter(|column| !layout[row][*column] && column_counts[*column] < MAX_PER_COLUMN)
            .min_by_key(|column| column_counts[*column])
        else {
            break;
        };
        layout[row][column] = true;
        row_counts[row] += 1;
        column_counts[column] += 1;
    }

    layout
}

fn fill_values<R: Rng + ?Sized>(layout: &Layout, rng: &mut R) -> Grid {
    let mut grid = [[0u8; COLUMNS]; ROWS];
    for column in 0..COLUMNS {
        let rows: Vec<usize> = (0..ROWS).filter(|row| layout[*row][column]).collect();
        let mut pool: Vec<u8> = ColumnRange::for_column(column).values().collect();

        // Partial Fisher-Yates: the first `rows.len()` slots become the sample.
        for i in 0..rows.len() {
            let j = rng.random_range(i..pool.len());
            pool.swap(i, j);
        }
        let mut picked = pool[..rows.len()].to_vec();
        picked.sort_unstable();

        for (row, value) in rows.into_iter().zip(picked) {
            grid[row][column] = value;
        }
    }
    grid
}

fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    let len = items.len();
    for i in 0..len.saturating_sub(1) {
        let j = rng.random_range(i..len);
        items.swap(i, j);
    }
}
