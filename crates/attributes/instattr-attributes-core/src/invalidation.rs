//! Invalidation: turn trigger names into `needs_update` flags.

use log::{debug, trace};

use crate::error::AttributeError;
use crate::registry::AttributeRegistry;

impl<R, C> AttributeRegistry<R, C> {
    /// Flag every attribute mapped to `trigger` for recomputation.
    ///
    /// Returns the names that were flagged. `noAlloc` attributes are never
    /// flagged since nothing here can compute them. An unknown trigger is an
    /// error and leaves every flag as it was.
    pub fn invalidate(&mut self, trigger: &str) -> Result<Vec<String>, AttributeError> {
        let Some(targets) = self.triggers.get(trigger) else {
            return Err(AttributeError::UnknownTrigger {
                trigger: trigger.to_string(),
                known: self.entries.keys().cloned().collect(),
            });
        };

        let mut flagged = Vec::with_capacity(targets.len());
        for name in targets {
            let Some(entry) = self.entries.get_mut(name) else {
                continue;
            };
            if entry.computation.is_external() {
                trace!("'{}' is noAlloc, ignoring trigger '{}'", name, trigger);
                continue;
            }
            entry.needs_update = true;
            flagged.push(name.clone());
        }
        debug!("invalidated {:?} via '{}'", flagged, trigger);
        Ok(flagged)
    }

    /// Flag every computed attribute, as if each name were invalidated.
    pub fn invalidate_all(&mut self) -> Vec<String> {
        let mut flagged = Vec::with_capacity(self.entries.len());
        for (name, entry) in self.entries.iter_mut() {
            if entry.computation.is_external() {
                continue;
            }
            entry.needs_update = true;
            flagged.push(name.clone());
        }
        debug!("invalidated all attributes ({})", flagged.len());
        flagged
    }
}
