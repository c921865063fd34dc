//! Process-wide async runtime setup.

use tokio::runtime::{Builder, Runtime};

/// Builds the runtime that drives a CLI command.
///
/// Windows gets a single current-thread event loop for the notebook child
/// process; other platforms use the multi-thread scheduler.
pub fn build_runtime() -> std::io::Result<Runtime> {
    let mut builder = if cfg!(windows) {
        Builder::new_current_thread()
    } else {
        Builder::new_multi_thread()
    };
    builder.enable_all().build()
}
