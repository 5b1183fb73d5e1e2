pub mod history;
pub mod job;
pub mod request;
pub mod response;
