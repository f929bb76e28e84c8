pub mod error;
pub mod path;
pub mod report;
pub mod request;
pub mod rules;
