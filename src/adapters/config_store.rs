//! In-memory configuration store.
//!
//! Implements [`ConfigPort`] over the compiled-in [`OvenConfig`].  The
//! firmware has no persistent settings; replacing the profile at runtime
//! goes through the same validation a stored config would.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::OvenConfig;

pub struct InMemoryConfig {
    current: OvenConfig,
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self::new(OvenConfig::default())
    }
}

impl InMemoryConfig {
    pub fn new(initial: OvenConfig) -> Self {
        Self { current: initial }
    }
}

impl ConfigPort for InMemoryConfig {
    fn load(&self) -> Result<OvenConfig, ConfigError> {
        self.current.validate()?;
        Ok(self.current.clone())
    }

    fn save(&mut self, config: &OvenConfig) -> Result<(), ConfigError> {
        if let Err(e) = config.validate() {
            warn!(target: "Core", "Config rejected: {e}");
            return Err(e);
        }
        self.current = config.clone();
        info!(target: "Core", "Config replaced");
        Ok(())
    }
}
