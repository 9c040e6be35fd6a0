mod field;

pub use field::{SyntheticField, correlation};
