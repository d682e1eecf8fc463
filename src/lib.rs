pub mod cli;
pub mod config;
pub mod context;
pub mod docker;
pub mod env;
pub mod error;
pub mod image;
pub mod logging;
pub mod mock;
pub mod packer;
pub mod pipeline;
pub mod runner;
pub mod template;
pub mod version;

pub use error::{PublishError, Result};
pub use pipeline::{Pipeline, RunReport, Stage};
