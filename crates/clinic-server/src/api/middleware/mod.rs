//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Session validator (protected routes only)
//! 2. Access logger

pub mod audit;
pub mod auth;
