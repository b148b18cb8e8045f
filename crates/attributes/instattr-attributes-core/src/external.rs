//! External buffer overrides.
//!
//! Hosts can hand in a buffer for an attribute instead of letting it be
//! computed, in two ways:
//! - per cycle through the update's buffer map: an attribute that was fed
//!   from the map and is missing from the next map goes back to computed;
//! - with [`set_external_buffer`](AttributeRegistry::set_external_buffer):
//!   the buffer stays until it is cleared with `None` or replaced by a map
//!   entry.
//!
//! Every offered buffer is checked before any attribute is touched.

use std::sync::Arc;

use hashbrown::HashMap;
use instattr_buffer_core::NumericBuffer;
use log::debug;

use crate::descriptor::{AttributeEntry, Computation, Storage};
use crate::error::AttributeError;
use crate::registry::AttributeRegistry;

/// External buffers for one update cycle, keyed by attribute name.
pub type ExternalBuffers = HashMap<String, Arc<NumericBuffer>>;

/// Result of offering a buffer to one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Override {
    /// No buffer was given; the attribute is (again) computed.
    Computed,
    /// Accepted, and the same buffer as last cycle.
    Unchanged,
    /// Accepted, and a different buffer from last cycle.
    Replaced,
}

impl<R, C> AttributeRegistry<R, C> {
    /// Offer `buffer` as the contents of attribute `name` until it is cleared
    /// with `None`. Update cycles whose buffer map does not name the
    /// attribute keep it.
    ///
    /// Unknown names are an error unless `ignore_unknown` is set, in which case
    /// they are skipped. A rejected buffer leaves the attribute untouched.
    pub fn set_external_buffer(
        &mut self,
        name: &str,
        buffer: Option<Arc<NumericBuffer>>,
        instance_count: usize,
        ignore_unknown: bool,
    ) -> Result<Option<Override>, AttributeError> {
        let Some(entry) = self.entries.get_mut(name) else {
            if ignore_unknown {
                return Ok(None);
            }
            return Err(AttributeError::UnknownAttribute {
                name: name.to_string(),
            });
        };
        let result = match buffer {
            Some(buffer) => {
                check(name, entry, &buffer, instance_count)?;
                entry.pinned = true;
                accept(name, entry, buffer)
            }
            None => release(name, entry),
        };
        if result == Override::Replaced {
            self.needs_redraw = true;
        }
        Ok(Some(result))
    }

    /// Apply one cycle's worth of external buffers to every attribute.
    ///
    /// Unknown names and every offered buffer are checked up front, so a
    /// failing map leaves all attributes as they were. Returns the attributes
    /// now backed by an external buffer.
    pub(crate) fn apply_external_buffers(
        &mut self,
        buffers: Option<&ExternalBuffers>,
        instance_count: usize,
        ignore_unknown: bool,
    ) -> Result<Vec<String>, AttributeError> {
        if let Some(buffers) = buffers {
            if !ignore_unknown {
                if let Some(unknown) = buffers.keys().find(|n| !self.entries.contains_key(n.as_str())) {
                    return Err(AttributeError::UnknownAttribute {
                        name: unknown.clone(),
                    });
                }
            }
            for (name, entry) in &self.entries {
                if let Some(buffer) = buffers.get(name) {
                    check(name, entry, buffer, instance_count)?;
                }
            }
        }

        let mut external = Vec::new();
        for (name, entry) in self.entries.iter_mut() {
            let result = match buffers.and_then(|b| b.get(name)) {
                Some(buffer) => {
                    entry.pinned = false;
                    accept(name, entry, Arc::clone(buffer))
                }
                None if entry.pinned => {
                    entry.needs_update = false;
                    Override::Unchanged
                }
                None => release(name, entry),
            };
            match result {
                Override::Computed => {}
                Override::Unchanged => external.push(name.clone()),
                Override::Replaced => {
                    self.needs_redraw = true;
                    external.push(name.clone());
                }
            }
        }
        Ok(external)
    }
}

/// Reject a buffer of the wrong kind, or one too short for an
/// accessor-driven attribute at `instance_count` records.
fn check<R, C>(
    name: &str,
    entry: &AttributeEntry<R, C>,
    buffer: &NumericBuffer,
    instance_count: usize,
) -> Result<(), AttributeError> {
    if buffer.kind() != entry.kind {
        return Err(AttributeError::TypeMismatch {
            attribute: name.to_string(),
            expected: entry.kind,
            actual: buffer.kind(),
        });
    }
    if matches!(entry.computation, Computation::Accessor(_)) {
        let required = instance_count * entry.size;
        if buffer.len() < required {
            return Err(AttributeError::SizeMismatch {
                attribute: name.to_string(),
                required,
                actual: buffer.len(),
            });
        }
    }
    Ok(())
}

fn accept<R, C>(name: &str, entry: &mut AttributeEntry<R, C>, buffer: Arc<NumericBuffer>) -> Override {
    entry.needs_update = false;
    entry.needs_alloc = false;
    let same = matches!(&entry.storage, Storage::External(prev) if Arc::ptr_eq(prev, &buffer));
    if same {
        return Override::Unchanged;
    }
    debug!("'{}' now uses an external buffer ({} elements)", name, buffer.len());
    entry.storage = Storage::External(buffer);
    entry.changed = true;
    Override::Replaced
}

fn release<R, C>(name: &str, entry: &mut AttributeEntry<R, C>) -> Override {
    entry.pinned = false;
    if entry.is_external_buffer() {
        debug!("'{}' no longer external, returning to computed", name);
        entry.storage = Storage::Empty;
    }
    Override::Computed
}

#[cfg(test)]
mod tests {
    use instattr_buffer_core::ElementKind;

    use super::*;
    use crate::descriptor::AttributeSpec;

    fn registry() -> AttributeRegistry<f64> {
        let mut reg = AttributeRegistry::new();
        reg.register(
            [
                ("positions", AttributeSpec::accessor("getPosition").size(2)),
                ("custom", AttributeSpec::updater(|_args| {}).size(1)),
            ],
            false,
        )
        .expect("register");
        reg
    }

    #[test]
    fn identity_decides_changed() {
        let mut reg = registry();
        let buf = Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 6));
        let first = reg.set_external_buffer("positions", Some(buf.clone()), 3, false);
        assert_eq!(first, Ok(Some(Override::Replaced)));
        assert!(reg.needs_redraw);

        reg.needs_redraw = false;
        reg.entries["positions"].changed = false;
        let again = reg.set_external_buffer("positions", Some(buf), 3, false);
        assert_eq!(again, Ok(Some(Override::Unchanged)));
        assert!(!reg.needs_redraw);
        assert!(!reg.entries["positions"].changed);

        // Equal contents but a different allocation still counts as new.
        let copy = Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 6));
        let third = reg.set_external_buffer("positions", Some(copy), 3, false);
        assert_eq!(third, Ok(Some(Override::Replaced)));
    }

    #[test]
    fn rejects_wrong_kind_and_short_buffers() {
        let mut reg = registry();
        let ints = Arc::new(NumericBuffer::zeroed(ElementKind::Int32, 6));
        let err = reg.set_external_buffer("positions", Some(ints), 3, false);
        assert!(matches!(err, Err(AttributeError::TypeMismatch { .. })));

        let short = Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 5));
        let err = reg.set_external_buffer("positions", Some(short), 3, false);
        assert_eq!(
            err,
            Err(AttributeError::SizeMismatch {
                attribute: "positions".into(),
                required: 6,
                actual: 5,
            })
        );
        assert!(!reg.entries["positions"].is_external_buffer());
        assert!(reg.entries["positions"].needs_update);
    }

    #[test]
    fn updater_attributes_skip_the_size_check() {
        let mut reg = registry();
        let tiny = Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 1));
        let accepted = reg.set_external_buffer("custom", Some(tiny), 10, false);
        assert_eq!(accepted, Ok(Some(Override::Replaced)));
    }

    #[test]
    fn unknown_names_error_unless_ignored() {
        let mut reg = registry();
        let buf = Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 2));
        assert_eq!(
            reg.set_external_buffer("missing", Some(buf.clone()), 1, false),
            Err(AttributeError::UnknownAttribute {
                name: "missing".into()
            })
        );
        assert_eq!(reg.set_external_buffer("missing", Some(buf), 1, true), Ok(None));
    }

    #[test]
    fn failing_map_leaves_every_attribute_untouched() {
        let mut reg = registry();
        reg.register([("normals", AttributeSpec::accessor("getNormal").size(2))], false)
            .expect("register");
        let mut buffers = ExternalBuffers::new();
        buffers.insert(
            "positions".to_string(),
            Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 6)),
        );
        buffers.insert(
            "normals".to_string(),
            Arc::new(NumericBuffer::zeroed(ElementKind::Int32, 6)),
        );

        let err = reg.apply_external_buffers(Some(&buffers), 3, false);
        assert!(matches!(err, Err(AttributeError::TypeMismatch { ref attribute, .. }) if attribute == "normals"));
        let positions = &reg.entries["positions"];
        assert!(!positions.is_external_buffer());
        assert!(!positions.changed);
        assert!(positions.needs_update);
        assert!(!reg.needs_redraw);
    }

    #[test]
    fn pinned_buffers_outlive_cycles_without_a_map_entry() {
        let mut reg = registry();
        let buf = Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 6));
        reg.set_external_buffer("positions", Some(buf), 3, false)
            .expect("accepted");

        let external = reg.apply_external_buffers(None, 3, false).expect("apply");
        assert_eq!(external, vec!["positions".to_string()]);
        assert!(reg.entries["positions"].is_external_buffer());

        // A map entry takes over; once it disappears the attribute is computed again.
        let mut buffers = ExternalBuffers::new();
        buffers.insert(
            "positions".to_string(),
            Arc::new(NumericBuffer::zeroed(ElementKind::Float32, 6)),
        );
        reg.apply_external_buffers(Some(&buffers), 3, false).expect("apply");
        assert!(reg.apply_external_buffers(None, 3, false).expect("apply").is_empty());
        assert!(!reg.entries["positions"].is_external_buffer());
    }
}
