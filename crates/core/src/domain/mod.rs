pub mod org;
pub mod request;
pub mod requisition;
pub mod termination;
pub mod transfer;
pub mod vacancy;
