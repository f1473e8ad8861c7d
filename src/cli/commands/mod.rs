//! CLI command implementations.

mod chat;
mod config;
mod fetch;
mod run;

pub use chat::run_chat;
pub use config::run_config;
pub use fetch::run_fetch;
pub use run::run_pipeline;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancel `token` on the next Ctrl-C. Abort the handle once the guarded
/// work finishes.
fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    })
}
