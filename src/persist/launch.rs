//! Persistent first-launch flag.

use super::PersistResult;

/// Storage key of the first-launch flag.
pub const FIRST_LAUNCH_KEY: &str = "@proj1/isFirstLaunch";

/// Backing store for the flag read once at startup.
///
/// An absent value means the app has never launched on this install.
pub trait LaunchFlagStore: Send {
    /// Raw stored value, `None` before the first launch.
    fn read_first_launch_flag(&self) -> PersistResult<Option<String>>;
    /// Records that the app has launched.
    fn mark_launched(&mut self) -> PersistResult<()>;
}

/// Process-local flag store for tests and hosts without a database.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFlagStore {
    value: Option<String>,
}

impl InMemoryFlagStore {
    /// Store that has already seen a launch.
    pub fn launched() -> Self {
        Self {
            value: Some("false".to_string()),
        }
    }
}

impl LaunchFlagStore for InMemoryFlagStore {
    fn read_first_launch_flag(&self) -> PersistResult<Option<String>> {
        Ok(self.value.clone())
    }

    fn mark_launched(&mut self) -> PersistResult<()> {
        self.value = Some("false".to_string());
        Ok(())
    }
}
