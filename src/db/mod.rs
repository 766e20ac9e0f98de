pub mod executor;
pub mod policy;
pub mod upload;
