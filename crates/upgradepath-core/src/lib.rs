mod catalog;
mod skip_range;

pub use catalog::{Bundle, Catalog, Channel, Package};
pub use skip_range::{precedence, RangeComparator, RangeOp, SkipRange};
