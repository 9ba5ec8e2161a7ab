#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod core;
pub mod diagnostics;
mod error;
pub mod fs;
#[cfg(feature = "logging")]
pub mod logging;
mod options;
mod project;
mod rule;
mod scheduler;
mod state;
mod task;
#[cfg(test)]
mod testing;
mod utils;

pub use crate::core::Signature;
pub use crate::error::*;
pub use crate::fs::{DiskFileSystem, FileSystem, MemoryFileSystem, Resource};
pub use crate::options::Options;
pub use crate::project::{BUILD_DIRECTORY, Context, Project, STATE_FILE};
pub use crate::rule::{Failure, Registry, Rule};
pub use crate::state::State;
pub use crate::task::{Task, TaskBuilder, TaskResult};
