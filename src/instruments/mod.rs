//! Instrument definitions priced by the lattice engines.

pub mod call_schedule;
pub mod convertible;
pub mod spread;
pub mod vanilla;

pub use call_schedule::{CallSchedule, NOT_CALLABLE};
pub use convertible::{ConvertibleBond, CouponFlows};
pub use spread::SpreadOption;
pub use vanilla::VanillaOption;
