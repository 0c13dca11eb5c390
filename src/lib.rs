// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod attempt;
pub mod attention;
pub mod config;
pub mod error;
pub mod grading;
pub mod history;
pub mod logging;
pub mod proctor;
pub mod quiz;
pub mod runtime;
pub mod session;
pub mod timer;
pub mod util;
