#![forbid(unsafe_code)]

//! Shared library behind the `acquire` and `watermark` binaries.

pub mod config;
pub mod logging;
pub mod params;
pub mod pipeline;
pub mod stages;
pub mod tools;
pub mod watermark;
pub mod ytdlp;
