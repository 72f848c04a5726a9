pub mod config;
pub mod error;
pub mod request;
pub mod result;
