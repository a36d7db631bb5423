pub mod pipeline_coordinator;
pub mod pipeline_error;
pub mod responses;
