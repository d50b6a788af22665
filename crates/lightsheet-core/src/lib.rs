pub mod artifacts;
pub mod consts;
pub mod convert;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod paths;
pub mod pipeline;
pub mod report;
pub mod resources;
