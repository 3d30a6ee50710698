//! Clocked storage.

use crate::hw::Signal;

/// A clocked cell: a committed value `Q` and a pending value `Q-next`.
///
/// [`Register::drive`] only stages a value; reads keep returning the old
/// value until [`Register::tick`]. A register that nobody drives during a
/// cycle holds its value across the clock edge.
#[derive(Debug, Clone, Copy)]
pub struct Register<T> {
    q: T,
    q_next: Signal<T>,
}

impl<T: Copy> Register<T> {
    /// Create a register holding `initial`.
    pub const fn new(name: &'static str, initial: T) -> Self {
        Self {
            q: initial,
            q_next: Signal::new(name),
        }
    }

    /// Stage the value to latch on the next clock edge.
    #[inline]
    pub fn drive(&mut self, value: T) {
        self.q_next.set(value);
    }

    /// Clock edge: commit the staged value, if any.
    #[inline]
    pub fn tick(&mut self) {
        if let Some(next) = self.q_next.peek() {
            self.q = next;
        }
        self.q_next.undefine();
    }

    /// The committed value.
    #[inline]
    pub fn read(&self) -> T {
        self.q
    }

    /// The value staged for the next edge, if any.
    pub fn pending(&self) -> Option<T> {
        self.q_next.peek()
    }

    pub fn name(&self) -> &'static str {
        self.q_next.name()
    }
}

impl<T: Copy + Default> Register<T> {
    /// Create a register holding `T::default()`.
    pub fn zeroed(name: &'static str) -> Self {
        Self::new(name, T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drive_does_not_affect_read_until_tick() {
        let mut reg = Register::new("r", 1i32);
        reg.drive(42);
        assert_eq!(reg.read(), 1);
        assert_eq!(reg.pending(), Some(42));

        reg.tick();
        assert_eq!(reg.read(), 42);
        assert_eq!(reg.pending(), None);
    }

    #[test]
    fn test_holds_value_when_not_driven() {
        let mut reg = Register::new("r", 0u8);
        reg.drive(9);
        reg.tick();
        reg.tick();
        reg.tick();
        assert_eq!(reg.read(), 9);
    }

    #[test]
    fn test_last_drive_wins() {
        let mut reg: Register<i32> = Register::zeroed("r");
        reg.drive(1);
        reg.drive(2);
        reg.tick();
        assert_eq!(reg.read(), 2);
    }
}
