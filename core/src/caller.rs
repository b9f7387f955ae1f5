use rand::Rng;

use tambola_types::CalledNumbers;

/// Pick the next number uniformly from those not yet called.
///
/// Returns `None` once all 90 numbers are out.
pub fn draw_number<R: Rng + ?Sized>(called: &CalledNumbers, rng: &mut R) -> Option<u8> {
    let remaining = called.uncalled();
    if remaining.is_empty() {
        return None;
    }
    Some(remaining[rng.random_range(0..remaining.len())])
}
