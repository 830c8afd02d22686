// ABOUTME: Container engine facade and its Docker Engine API implementation.
// ABOUTME: Capability traits live in `traits`; `BollardRuntime` implements them.

mod bollard;
mod traits;

pub use bollard::BollardRuntime;
pub use traits::*;
