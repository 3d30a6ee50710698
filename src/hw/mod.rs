//! Clocked hardware primitives.
//!
//! Everything the CPU is wired from:
//! - [`Signal`] - a combinational wire that is either driven this cycle or undefined
//! - [`Register`] - a clocked cell that holds its value until a new one is latched
//! - [`Mux`] - an n-way selector keyed by a control enum
//! - [`Bus`] - a shared line that only one driver may own at a time

mod error;
pub mod signal;
pub mod register;
pub mod mux;
pub mod bus;

pub use error::HwError;
pub use signal::Signal;
pub use register::Register;
pub use mux::Mux;
pub use bus::{Bus, BusId};
