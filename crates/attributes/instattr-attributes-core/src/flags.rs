//! Change and redraw bookkeeping.
//!
//! Flags are raised by successful updates and accepted overrides and are
//! only ever cleared on request.

use crate::descriptor::AttributeView;
use crate::registry::AttributeRegistry;

impl<R, C> AttributeRegistry<R, C> {
    /// Attributes whose `changed` flag is set. With `clear`, the flags are
    /// reset in the same call, so a change is reported at most once.
    pub fn changed(&mut self, clear: bool) -> Vec<AttributeView<'_>> {
        let mut hits = Vec::new();
        for (index, entry) in self.entries.values_mut().enumerate() {
            if entry.changed {
                hits.push(index);
                if clear {
                    entry.changed = false;
                }
            }
        }
        hits.into_iter()
            .filter_map(|index| self.entries.get_index(index))
            .map(|(name, entry)| AttributeView {
                changed: true,
                ..entry.view(name)
            })
            .collect()
    }

    /// Read the redraw flag, optionally clearing it.
    pub fn needs_redraw(&mut self, clear: bool) -> bool {
        let redraw = self.needs_redraw;
        if clear {
            self.needs_redraw = false;
        }
        redraw
    }

    pub fn set_needs_redraw(&mut self) {
        self.needs_redraw = true;
    }
}
