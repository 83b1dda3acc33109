pub mod request;
pub mod resume;
