use tracing::warn;

use crate::persist::launch::LaunchFlagStore;

/// Decides at startup whether to show onboarding.
///
/// The flag is read once and written back straight away, so onboarding is
/// shown at most once per install. A failed read counts as "already launched".
pub fn should_show_onboarding<S: LaunchFlagStore + ?Sized>(store: &mut S) -> bool {
    match store.read_first_launch_flag() {
        Ok(None) => {
            if let Err(err) = store.mark_launched() {
                warn!(%err, "failed to record first launch");
            }
            true
        }
        Ok(Some(_)) => false,
        Err(err) => {
            warn!(%err, "first-launch check failed");
            false
        }
    }
}
