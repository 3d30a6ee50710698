//! Shared, single-driver lines.

use crate::hw::{HwError, Signal};

/// Identifies one driver attached to a [`Bus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusId(u32);

/// A bidirectional line that any attached component may drive, one at a time.
///
/// A driver must [`claim`](Bus::claim) the bus before driving it. Two
/// drivers holding the bus in the same cycle is a contention fault.
#[derive(Debug, Clone)]
pub struct Bus<T> {
    name: &'static str,
    line: Signal<T>,
    owner: Option<BusId>,
    next_id: u32,
}

impl<T: Copy> Bus<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            line: Signal::new(name),
            owner: None,
            next_id: 0,
        }
    }

    /// Allocate an id for a new driver.
    pub fn register_id(&mut self) -> Result<BusId, HwError> {
        let id = self.next_id;
        self.next_id = id
            .checked_add(1)
            .ok_or(HwError::BusIdsExhausted(self.name))?;
        Ok(BusId(id))
    }

    /// Take exclusive ownership of the bus.
    pub fn claim(&mut self, id: BusId) -> Result<(), HwError> {
        match self.owner {
            Some(owner) => Err(HwError::BusContention {
                bus: self.name,
                owner: owner.0,
                claimant: id.0,
            }),
            None => {
                self.owner = Some(id);
                Ok(())
            }
        }
    }

    /// Give up ownership. The driven value stays on the line.
    pub fn surrender(&mut self, id: BusId) -> Result<(), HwError> {
        self.check_owner(id)?;
        self.owner = None;
        Ok(())
    }

    /// Put a value on the line.
    pub fn drive(&mut self, id: BusId, value: T) -> Result<(), HwError> {
        self.check_owner(id)?;
        self.line.set(value);
        Ok(())
    }

    /// Read whatever is on the line.
    pub fn read(&self) -> Result<T, HwError> {
        self.line.get()
    }

    pub fn owner(&self) -> Option<BusId> {
        self.owner
    }

    /// Drop ownership and let the line float.
    pub fn release(&mut self) {
        self.owner = None;
        self.line.undefine();
    }

    fn check_owner(&self, id: BusId) -> Result<(), HwError> {
        if self.owner == Some(id) {
            Ok(())
        } else {
            Err(HwError::NotBusOwner {
                bus: self.name,
                id: id.0,
            })
        }
    }
}
