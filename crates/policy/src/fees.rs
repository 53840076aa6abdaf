//! Fee catalog publishing.

use campusdesk_core::{Actor, Role};

use crate::decision::{Decision, DenyReason};

pub fn check_fee_write(actor: &Actor) -> Decision {
    match actor.role {
        Role::BursaryAdmin | Role::SystemAdmin => Decision::Allow,
        _ => Decision::Deny(DenyReason::FeeManagement),
    }
}
