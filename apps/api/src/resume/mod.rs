// Résumé tailoring: the pipeline, the section mapper, and the HTTP handlers in front of them.

pub mod handlers;
pub mod mapper;
pub mod pipeline;

pub use mapper::MergePolicy;
pub use pipeline::Pipeline;
