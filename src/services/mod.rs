pub mod comparator;

pub use comparator::{Comparator, Comparison, RISK_NOTE, TOP_PER_CATEGORY};
