pub mod comfy;
pub mod materialize;
pub mod orchestrator;
pub mod queue;
pub mod retry;
pub mod storage;
pub mod store;
pub mod upload;
pub mod validation;
pub mod warmup;
pub mod worker;
