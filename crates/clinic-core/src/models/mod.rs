//! Domain models for the clinic.

mod bags;
mod consent;
mod patient;
mod treatment;
mod user;
mod validation;
mod visit;

pub use bags::*;
pub use consent::*;
pub use patient::*;
pub use treatment::*;
pub use user::*;
pub use validation::*;
pub use visit::*;
