//! N-way multiplexers.

use std::collections::HashMap;
use std::hash::Hash;

use crate::hw::{HwError, Signal};

/// Selects one of several driven inputs by a control key.
///
/// Keys are small `Copy` enums (or `bool`). Inputs and the select line are
/// combinational and are cleared by [`Mux::undefine`] at the start of
/// every cycle.
#[derive(Debug, Clone)]
pub struct Mux<K, V> {
    name: &'static str,
    inputs: HashMap<K, V>,
    select: Signal<K>,
}

impl<K, V> Mux<K, V>
where
    K: Copy + Eq + Hash,
    V: Copy,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inputs: HashMap::new(),
            select: Signal::new(name),
        }
    }

    /// Drive the input connected to `key`.
    pub fn set_input(&mut self, key: K, value: V) {
        self.inputs.insert(key, value);
    }

    /// Drive the select line.
    pub fn select(&mut self, key: K) {
        self.select.set(key);
    }

    /// The input currently selected.
    ///
    /// # Errors
    /// [`HwError::UndefinedSignal`] if the select line is not driven, or
    /// [`HwError::UnconnectedMuxInput`] if the selected input is not.
    pub fn output(&self) -> Result<V, HwError> {
        let key = self.select.get()?;
        self.inputs
            .get(&key)
            .copied()
            .ok_or(HwError::UnconnectedMuxInput(self.name))
    }

    /// Clear every input and the select line.
    pub fn undefine(&mut self) {
        self.inputs.clear();
        self.select.undefine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Key {
        One,
        Two,
        Three,
    }

    #[test]
    fn test_selects_driven_input() {
        let mut mux = Mux::new("test mux");
        mux.set_input(Key::One, 1);
        mux.set_input(Key::Two, 2);
        mux.set_input(Key::Three, 3);

        mux.select(Key::One);
        assert_eq!(mux.output(), Ok(1));
        mux.select(Key::Three);
        assert_eq!(mux.output(), Ok(3));

        mux.set_input(Key::Three, -3);
        assert_eq!(mux.output(), Ok(-3));
    }

    #[test]
    fn test_bool_keys() {
        let mut mux = Mux::new("flag mux");
        mux.set_input(true, 10u32);
        mux.set_input(false, 20u32);
        mux.select(false);
        assert_eq!(mux.output(), Ok(20));
    }

    #[test]
    fn test_unconnected_input() {
        let mut mux: Mux<Key, i32> = Mux::new("test mux");
        mux.set_input(Key::One, 1);
        mux.select(Key::Two);
        assert_eq!(mux.output(), Err(HwError::UnconnectedMuxInput("test mux")));
    }

    #[test]
    fn test_undefine_clears_everything() {
        let mut mux = Mux::new("test mux");
        mux.set_input(Key::One, 1);
        mux.select(Key::One);
        mux.undefine();
        assert_eq!(mux.output(), Err(HwError::UndefinedSignal("test mux")));

        mux.select(Key::One);
        assert!(mux.output().is_err());
    }
}
