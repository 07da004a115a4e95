#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]
pub mod acquisition;
pub mod configs;
pub mod downloads;
pub mod environment;
pub mod extract;
pub mod repository;
pub mod version;

pub mod error;
pub mod progress;

pub mod fs;

pub mod consts;

pub use consts::*;

pub use tokio_util::sync::CancellationToken;
