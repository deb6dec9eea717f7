//! The draw: a single gift cycle over every participant.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::{DrawError, Event, Token, MIN_PARTICIPANTS};

/// Shuffles the participants and links each one to the next, closing the
/// loop at the end. The result is one directed cycle of length n, so nobody
/// draws themselves and every participant is drawn exactly once.
///
/// Fails without touching the event if it was already drawn or has fewer
/// than [`MIN_PARTICIPANTS`].
pub fn run_draw<R: Rng + ?Sized>(event: &mut Event, rng: &mut R) -> Result<(), DrawError> {
    if event.draw_done {
        return Err(DrawError::AlreadyDrawn);
    }
    let n = event.participants.len();
    if n < MIN_PARTICIPANTS {
        return Err(DrawError::InsufficientParticipants(n));
    }

    // HashMap order is unspecified; sort so a seeded rng reproduces a draw.
    let mut order: Vec<Token> = event.participants.keys().cloned().collect();
    order.sort_unstable();
    order.shuffle(rng);

    for (i, giver) in order.iter().enumerate() {
        let recipient = order[(i + 1) % n].clone();
        if let Some(participant) = event.participants.get_mut(giver) {
            participant.gift_for = Some(recipient);
        }
    }
    event.draw_done = true;
    Ok(())
}
