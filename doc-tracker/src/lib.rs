pub mod adaptive_skip;
pub mod lucas_kanade;
pub mod optical_flow;
pub mod smoother;
pub mod temporal;

pub use adaptive_skip::AdaptiveSkip;
pub use optical_flow::{Mode, OpticalFlowTracker};
pub use smoother::QuadSmoother;
pub use temporal::{FrameAction, TemporalTracker};
