//! Combinational wires.
//!
//! A [`Signal`] carries a value only for the cycle in which something drove
//! it. Every consumer reads through [`Signal::get`], which fails on an
//! undefined wire, so a stage that depends on an output nobody produced this
//! cycle is caught immediately.

use crate::hw::HwError;

/// A named value cell with an explicit defined/undefined state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T: Copy> Signal<T> {
    /// Create an undefined signal.
    pub const fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    /// Create a signal that is already driven.
    pub const fn with_value(name: &'static str, value: T) -> Self {
        Self {
            name,
            value: Some(value),
        }
    }

    /// Drive the signal. It stays defined until [`Signal::undefine`].
    #[inline]
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Stop driving the signal.
    #[inline]
    pub fn undefine(&mut self) {
        self.value = None;
    }

    /// Read the driven value.
    ///
    /// # Errors
    /// [`HwError::UndefinedSignal`] if nothing drove the signal.
    #[inline]
    pub fn get(&self) -> Result<T, HwError> {
        self.value.ok_or(HwError::UndefinedSignal(self.name))
    }

    /// Read without treating an undefined wire as a fault.
    #[inline]
    pub fn peek(&self) -> Option<T> {
        self.value
    }

    #[inline]
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
