//! Wiring and contention errors raised by the hardware primitives.

use thiserror::Error;

/// A hardware model fault.
///
/// None of these can happen while a correctly wired machine runs a
/// well-formed program; they exist so that wiring regressions surface as
/// errors instead of silently propagating stale data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HwError {
    #[error("read of undefined signal `{0}`")]
    UndefinedSignal(&'static str),

    #[error("multiplexer `{0}` selected an input that was never driven")]
    UnconnectedMuxInput(&'static str),

    #[error("bus `{bus}` is owned by driver {owner} but driver {claimant} tried to claim it")]
    BusContention {
        bus: &'static str,
        owner: u32,
        claimant: u32,
    },

    #[error("driver {id} does not own bus `{bus}`")]
    NotBusOwner { bus: &'static str, id: u32 },

    #[error("bus `{0}` ran out of driver ids")]
    BusIdsExhausted(&'static str),
}
