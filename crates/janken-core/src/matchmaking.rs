//! Waiting → start transition from a registry snapshot.
//!
//! The game is strictly two-player and the registry has no room
//! partitioning. With three or more rows the opponent is simply the first
//! row (in snapshot order) that is not the triggering connection; no
//! attempt is made at N-player pairing.

use crate::connection::{Connection, DEFAULT_DISPLAY_NAME};
use crate::message::BroadcastMessage;

/// Derive the message for a matchmaking broadcast.
///
/// Uses [`DEFAULT_DISPLAY_NAME`] for an opponent row without a name.
pub fn evaluate(snapshot: &[Connection], triggering_id: &str) -> BroadcastMessage {
    evaluate_with_default(snapshot, triggering_id, DEFAULT_DISPLAY_NAME)
}

/// [`evaluate`] with a configurable placeholder name.
///
/// - `len <= 1` → `wait`
/// - `len >= 2` → `start`, naming the first row whose id differs from
///   `triggering_id`
///
/// If `triggering_id` is not in the snapshot (its row was deleted between
/// connect and this read) the length still decides, and every row is an
/// opponent candidate.
pub fn evaluate_with_default(
    snapshot: &[Connection],
    triggering_id: &str,
    default_name: &str,
) -> BroadcastMessage {
    if snapshot.len() <= 1 {
        return BroadcastMessage::Wait;
    }

    // Registry ids are unique, so with two or more rows at least one differs.
    match snapshot.iter().find(|c| c.id != triggering_id) {
        Some(opponent) => BroadcastMessage::Start {
            opponent: opponent.name_or(default_name).to_string(),
        },
        None => BroadcastMessage::Wait,
    }
}
