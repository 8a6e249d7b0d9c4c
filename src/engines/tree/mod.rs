//! Tree-based pricing engines.

pub mod binomial;
pub mod convertible;
pub mod crr;
pub mod grid;
pub mod two_asset_tree;

pub use binomial::BinomialTreeEngine;
pub use convertible::{ConversionBlending, ConvertibleTreeEngine, DebtDiscounting};
pub use crr::CrrStep;
pub use grid::{LogLattice, TriangularGrid};
pub use two_asset_tree::{JointProbabilities, TwoAssetTreeEngine};
