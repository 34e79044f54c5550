pub mod engine;
pub mod requisition;
pub mod termination;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use engine::{
    ApprovalFlow, FlowAction, FlowEngine, FlowError, FlowStatus, TransitionContext,
    TransitionOutcome,
};
