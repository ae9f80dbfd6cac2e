//! Launch environment for the watchdog layer.
//!
//! User entries from `[watchdog.env]` are written first and the derived
//! `function_process` binding last, so the derived value always reflects the
//! resolved process type even if a user entry shares its name.

use crate::config::WatchdogConfig;
use crate::constants::FUNCTION_PROCESS_ENV;
use crate::error::Result;
use crate::layers::Layer;
use tracing::debug;

/// Writes the launch-time env bindings for `config` into `layer`.
///
/// Stops at the first failed write.
pub fn configure_launch_env<L: Layer>(layer: &L, config: &WatchdogConfig) -> Result<()> {
    for (key, value) in &config.env {
        if key == FUNCTION_PROCESS_ENV {
            debug!(key = %key, "user env entry overridden by derived binding");
        }
        layer.default_launch_env(key, value)?;
    }

    let launcher = config.launcher_command();
    layer.default_launch_env(FUNCTION_PROCESS_ENV, &launcher)?;

    debug!(
        layer = layer.name(),
        env_vars = config.env.len() + 1,
        function_process = %launcher,
        "configured launch env"
    );
    Ok(())
}
