//! Reusable rollback buffers for lattice engines.

/// Scratch buffers for repeated lattice valuations.
///
/// Buffers grow on demand and never shrink, so a pool sized for the largest
/// step count serves every smaller lattice without reallocating. An arena is
/// shared only by explicit `Arc<Mutex<_>>` handoff to an engine.
#[derive(Debug, Clone, Default)]
pub struct PricingArena {
    pub value_buffer: Vec<f64>,
    pub state_buffer: Vec<f64>,
}

impl PricingArena {
    /// Creates an arena sized for lattices of up to `max_steps` steps.
    pub fn with_capacity(max_steps: usize) -> Self {
        Self {
            value_buffer: Vec::with_capacity(max_steps.saturating_add(1)),
            state_buffer: Vec::with_capacity(max_steps.saturating_add(1)),
        }
    }

    #[inline]
    fn ensure_len(buffer: &mut Vec<f64>, n: usize) {
        if buffer.len() < n {
            buffer.resize(n, 0.0);
        }
    }

    /// Returns a mutable value-layer slice with length `n`.
    #[inline]
    pub fn value_slice(&mut self, n: usize) -> &mut [f64] {
        Self::ensure_len(&mut self.value_buffer, n);
        &mut self.value_buffer[..n]
    }

    /// Returns value and per-node state slices (both length `n`) together.
    #[inline]
    pub fn value_and_state_slices(&mut self, n: usize) -> (&mut [f64], &mut [f64]) {
        Self::ensure_len(&mut self.value_buffer, n);
        Self::ensure_len(&mut self.state_buffer, n);
        (&mut self.value_buffer[..n], &mut self.state_buffer[..n])
    }
}
