//! Data export: full JSON backup and patient CSV.

mod backup;
mod csv;

pub use backup::*;
pub use csv::*;
