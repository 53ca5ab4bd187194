use std::hash::Hasher;

use crate::state::FloodState;

/// A deterministic FNV-1a 64-bit hasher.
///
/// `DefaultHasher` is randomly keyed per process, so it cannot fingerprint
/// flood states across runs.
#[derive(Debug)]
pub struct FnvHasher {
    state: u64,
}

impl Default for FnvHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FnvHasher {
    const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;

    pub fn new() -> Self {
        Self {
            state: Self::OFFSET_BASIS,
        }
    }
}

impl Hasher for FnvHasher {
    fn finish(&self) -> u64 {
        self.state
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= byte as u64;
            self.state = self.state.wrapping_mul(Self::PRIME);
        }
    }
}

/// Fingerprint of the flooded set, independent of platform endianness.
pub fn flood_state_hash(state: &FloodState) -> u64 {
    let mut hasher = FnvHasher::new();
    hasher.write(&(state.count() as u64).to_le_bytes());
    for position in state.iter() {
        hasher.write(&position.x.to_le_bytes());
        hasher.write(&position.y.to_le_bytes());
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    #[test]
    fn empty_input_hashes_to_offset_basis() {
        assert_eq!(FnvHasher::new().finish(), 0xcbf29ce484222325);
    }

    #[test]
    fn equal_states_hash_equal() {
        let mut a = FloodState::new();
        let mut b = FloodState::new();
        a.add(Position::new(1, 2));
        a.add(Position::new(3, 4));
        b.add(Position::new(3, 4));
        b.add(Position::new(1, 2));
        assert_eq!(flood_state_hash(&a), flood_state_hash(&b));

        b.add(Position::new(0, 0));
        assert_ne!(flood_state_hash(&a), flood_state_hash(&b));
    }
}
