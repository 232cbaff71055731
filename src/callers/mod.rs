//! Variant callers (§4.10): thin consumers of the traversal engine and the
//! graph's edge/coverage queries. Both callers recover `WalkTerminated`
//! locally and keep scanning, per §7's recovery rule for that error kind.

pub mod breakpoint;
pub mod bubble;

pub use breakpoint::{find_breakpoints, BreakpointCall};
pub use bubble::{find_bubbles, BubbleCall};
