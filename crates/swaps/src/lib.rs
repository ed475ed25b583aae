//! Swap workflow.

pub mod swap;

pub use swap::{
    ApproveSwap, CompleteSwap, MarkSwapInTransit, OpenSwap, RejectSwap, Swap, SwapApproved,
    SwapCommand, SwapCompleted, SwapEvent, SwapKind, SwapMarkedInTransit, SwapOpened,
    SwapRejected, SwapStatus,
};
