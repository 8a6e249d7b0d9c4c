//! Price grids sized exactly from the step count.
//!
//! [`TriangularGrid`] stores a recombining binomial tree in one contiguous
//! buffer: layer `i` holds `i + 1` nodes starting at offset `i * (i + 1) / 2`,
//! node `(i, j)` being the state after `j` up-moves. [`LogLattice`] stores one
//! asset's log-spaced prices over offsets `-N..=N` at index `offset + N`.

/// Recombining binomial price grid with `(steps + 1) * (steps + 2) / 2` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangularGrid {
    steps: usize,
    nodes: Vec<f64>,
}

#[inline(always)]
fn layer_start(step: usize) -> usize {
    step * (step + 1) / 2
}

impl TriangularGrid {
    /// Builds the CRR price grid `spot * up^j * down^(i - j)`.
    ///
    /// Each layer starts from `spot * down^i` and multiplies by `up / down`,
    /// so no `powf` is evaluated inside the double loop.
    pub fn crr(spot: f64, up: f64, down: f64, steps: usize) -> Self {
        let mut nodes = Vec::with_capacity(layer_start(steps + 1));
        let ratio = up / down;
        let mut base = spot;
        for i in 0..=steps {
            let mut s = base;
            for _ in 0..=i {
                nodes.push(s);
                s *= ratio;
            }
            base *= down;
        }
        Self { steps, nodes }
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Price at node `(step, j)`, `0 <= j <= step`.
    #[inline(always)]
    pub fn get(&self, step: usize, j: usize) -> f64 {
        debug_assert!(j <= step && step <= self.steps);
        self.nodes[layer_start(step) + j]
    }

    /// All `step + 1` prices of one time layer, ascending in `j`.
    #[inline]
    pub fn layer(&self, step: usize) -> &[f64] {
        let start = layer_start(step);
        &self.nodes[start..start + step + 1]
    }
}

/// One asset's log-price lattice over offsets `-N..=N`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLattice {
    steps: usize,
    prices: Vec<f64>,
}

impl LogLattice {
    /// Builds `spot * exp(offset * dx)` for every offset in `-steps..=steps`.
    pub fn new(spot: f64, dx: f64, steps: usize) -> Self {
        let growth = dx.exp();
        let mut prices = Vec::with_capacity(2 * steps + 1);
        let mut s = spot * (-(steps as f64) * dx).exp();
        for _ in 0..=(2 * steps) {
            prices.push(s);
            s *= growth;
        }
        // Pin the centre node to the exact spot.
        prices[steps] = spot;
        Self { steps, prices }
    }

    /// Price at node `(step, ups)`: offset `2 * ups - step`.
    #[inline(always)]
    pub fn at_node(&self, step: usize, ups: usize) -> f64 {
        debug_assert!(ups <= step && step <= self.steps);
        // offset + N = 2 * ups - step + N, never negative since step <= N.
        self.prices[2 * ups + self.steps - step]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn triangular_grid_matches_closed_form_nodes() {
        let (spot, up) = (100.0, 1.1_f64);
        let down = 1.0 / up;
        let grid = TriangularGrid::crr(spot, up, down, 6);
        assert_eq!((0..=6).map(|i| grid.layer(i).len()).sum::<usize>(), 28);
        for i in 0..=6 {
            for j in 0..=i {
                let expected = spot * up.powi(j as i32) * down.powi((i - j) as i32);
                assert_relative_eq!(grid.get(i, j), expected, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn every_layer_is_strictly_increasing() {
        let up = (0.2_f64 * 0.01_f64.sqrt()).exp();
        let grid = TriangularGrid::crr(50.0, up, 1.0 / up, 40);
        for i in 0..=40 {
            assert!(grid.layer(i).windows(2).all(|w| w[1] > w[0]));
        }
        assert_eq!(grid.get(0, 0), 50.0);
    }

    #[test]
    fn log_lattice_is_symmetric_around_spot() {
        let dx = 0.05;
        let lattice = LogLattice::new(80.0, dx, 10);
        assert_eq!(lattice.at_node(0, 0), 80.0);
        assert_eq!(lattice.at_node(10, 5), 80.0);
        for k in 1..=5 {
            let up = lattice.at_node(10, 5 + k);
            let down = lattice.at_node(10, 5 - k);
            let offset = 2.0 * k as f64;
            assert_relative_eq!(up * down, 80.0 * 80.0, max_relative = 1e-12);
            assert_relative_eq!(up, 80.0 * (offset * dx).exp(), max_relative = 1e-12);
        }
        let top: Vec<f64> = (0..=10).map(|ups| lattice.at_node(10, ups)).collect();
        assert!(top.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn node_indexing_recombines_across_steps() {
        let lattice = LogLattice::new(100.0, 0.1, 4);
        // Two steps up-then-down return to the centre at every depth.
        assert_eq!(lattice.at_node(2, 1), lattice.at_node(0, 0));
        assert_eq!(lattice.at_node(4, 2), lattice.at_node(0, 0));
        // Offset 2 * ups - step: (3, 2) and (1, 1) both sit one step above spot.
        assert_eq!(lattice.at_node(3, 2), lattice.at_node(1, 1));
        assert!(lattice.at_node(4, 0) < lattice.at_node(2, 0));
        assert_relative_eq!(lattice.at_node(4, 4), 100.0 * 0.4_f64.exp(), max_relative = 1e-12);
    }
}
