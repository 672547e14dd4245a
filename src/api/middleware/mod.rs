//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Rate limiter: reject early, save resources
//! 2. Auth validator: session credential check, injects `AccountContext`
//! 3. Audit logger: records after auth, has the actor

pub mod audit;
pub mod auth;
pub mod rate;
