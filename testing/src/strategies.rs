//! Proptest strategies.

use eventpass_core::inventory::TierSpec;
use eventpass_core::types::{EventId, UserId};
use proptest::prelude::*;
use uuid::Uuid;

/// Arbitrary event ids.
pub fn event_id() -> impl Strategy<Value = EventId> {
    any::<u128>().prop_map(|bits| EventId::from_uuid(Uuid::from_u128(bits)))
}

/// Arbitrary user ids.
pub fn user_id() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|bits| UserId::from_uuid(Uuid::from_u128(bits)))
}

/// Tier specs that pass validation under the default inventory.
pub fn valid_tier() -> impl Strategy<Value = TierSpec> {
    (
        prop_oneof![Just("Regular"), Just("VIP")],
        0..100_000_i64,
        0..1_000_i64,
    )
        .prop_map(|(name, price, remaining)| TierSpec::new(name, price, remaining))
}

/// One step of a registration/check-in workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Attendee `n` registers
    Register(usize),
    /// Attendee `n`'s code is scanned
    CheckIn(usize),
    /// A code for attendee `n` is scanned without them ever registering
    ScanUnregistered(usize),
}

/// Sequences of steps over a pool of `attendees` attendees.
pub fn steps(attendees: usize, max_len: usize) -> impl Strategy<Value = Vec<Step>> {
    let attendee = 0..attendees;
    prop::collection::vec(
        prop_oneof![
            attendee.clone().prop_map(Step::Register),
            attendee.clone().prop_map(Step::CheckIn),
            attendee.prop_map(Step::ScanUnregistered),
        ],
        0..max_len,
    )
}
