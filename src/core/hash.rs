//! State Hashing for Verification
//!
//! Provides deterministic hashing of simulation state for:
//! - Replay validation
//! - Comparing two runs fed the same inputs

use sha2::{Sha256, Digest};
use super::rect::Rect;
use super::vec2::Vec2;

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for simulation state.
///
/// Wraps SHA-256 with helpers for the simulation's value types.
/// Floats are hashed by bit pattern. Order of updates is critical.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for simulation state.
    pub fn for_sim_state() -> Self {
        Self::new(b"KUNAI_STATE_V1")
    }

    /// Create hasher for input recordings.
    pub fn for_inputs() -> Self {
        Self::new(b"KUNAI_INPUTS_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f32 value (bit pattern, little-endian).
    #[inline]
    pub fn update_f32(&mut self, value: f32) {
        self.update_u32(value.to_bits());
    }

    /// Update with a Vec2.
    #[inline]
    pub fn update_vec2(&mut self, value: Vec2) {
        self.update_f32(value.x);
        self.update_f32(value.y);
    }

    /// Update with a Rect.
    #[inline]
    pub fn update_rect(&mut self, value: &Rect) {
        self.update_f32(value.x);
        self.update_f32(value.y);
        self.update_f32(value.w);
        self.update_f32(value.h);
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute state hash for replay verification.
///
/// This function is called by `Simulation::compute_hash()`.
/// The closure adds component-specific data.
pub fn compute_state_hash<F>(tick: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_sim_state();

    // Always hash the tick first
    hasher.update_u32(tick);

    add_state(&mut hasher);

    hasher.finalize()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_hasher_determinism() {
        let make_hash = || {
            let mut hasher = StateHasher::for_sim_state();
            hasher.update_u32(100);
            hasher.update_f32(5.5);
            hasher.update_vec2(Vec2::new(1.0, 2.0));
            hasher.update_rect(&Rect::new(0.0, 0.0, 32.0, 60.0));
            hasher.update_bool(true);
            hasher.finalize()
        };

        assert_eq!(make_hash(), make_hash());
    }

    #[test]
    fn test_hash_order_matters() {
        let hash1 = {
            let mut h = StateHasher::new(b"test");
            h.update_f32(1.0);
            h.update_f32(2.0);
            h.finalize()
        };

        let hash2 = {
            let mut h = StateHasher::new(b"test");
            h.update_f32(2.0);
            h.update_f32(1.0);
            h.finalize()
        };

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_domain_separation() {
        let mut a = StateHasher::for_sim_state();
        let mut b = StateHasher::for_inputs();
        a.update_u32(7);
        b.update_u32(7);
        assert_ne!(a.finalize(), b.finalize());
    }

    #[test]
    fn test_negative_zero_hashes_differently() {
        let a = compute_state_hash(1, |h| h.update_f32(0.0));
        let b = compute_state_hash(1, |h| h.update_f32(-0.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(100, |hasher| {
            hasher.update_f32(5.0);
            hasher.update_bool(true);
        });
        let hash2 = compute_state_hash(100, |hasher| {
            hasher.update_f32(5.0);
            hasher.update_bool(true);
        });
        assert_eq!(hash, hash2);

        let hash3 = compute_state_hash(101, |hasher| {
            hasher.update_f32(5.0);
            hasher.update_bool(true);
        });
        assert_ne!(hash, hash3);
    }
}
