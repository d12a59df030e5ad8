use crate::NUM_KEYS;

/// Latch for the 16-key hex keypad.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypad {
    keys: [bool; NUM_KEYS],
}

impl Keypad {
    /// Indices outside 0..16 are ignored.
    pub fn set(&mut self, idx: usize, pressed: bool) {
        if let Some(key) = self.keys.get_mut(idx) {
            *key = pressed;
        }
    }

    /// Register values of 16 and up never name a pressed key.
    pub fn is_down(&self, key: u8) -> bool {
        self.keys.get(key as usize).copied().unwrap_or(false)
    }

    /// Lowest-numbered key currently held.
    pub fn first_down(&self) -> Option<u8> {
        self.keys.iter().position(|&down| down).map(|idx| idx as u8)
    }

    pub fn release_all(&mut self) {
        self.keys = [false; NUM_KEYS];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_index_is_ignored() {
        let mut keypad = Keypad::default();
        keypad.set(16, true);
        keypad.set(usize::MAX, true);
        assert_eq!(keypad.first_down(), None);
        assert!(!keypad.is_down(16));
    }

    #[test]
    fn first_down_prefers_lowest_index() {
        let mut keypad = Keypad::default();
        keypad.set(0xB, true);
        keypad.set(0x3, true);
        assert_eq!(keypad.first_down(), Some(0x3));
        keypad.set(0x3, false);
        assert_eq!(keypad.first_down(), Some(0xB));
    }
}
