//! Update executor: allocate flagged buffers, then fill every attribute that
//! needs an update through its bulk updater or the standard accessor loop.

use instattr_buffer_core::NumericBuffer;
use log::{debug, trace, warn};

use crate::accessor::{Accessors, Components, MAX_COMPONENTS};
use crate::descriptor::{AttributeEntry, Computation, Storage, UpdateArgs};
use crate::error::AttributeError;
use crate::registry::AttributeRegistry;

/// Number of leading elements checked for finiteness after an update.
const SENTINEL_LEN: usize = 4;

/// What one executor pass did.
#[derive(Debug, Default)]
pub(crate) struct ExecOutcome {
    pub allocated: Vec<String>,
    pub updated: Vec<String>,
}

impl<R, C> AttributeRegistry<R, C> {
    /// Run after [`plan`](Self::plan). Stops at the first failing attribute;
    /// attributes handled before it keep their new contents and flags.
    pub(crate) fn run(
        &mut self,
        instance_count: usize,
        records: &[R],
        accessors: Option<&Accessors<'_, R>>,
        context: &mut C,
    ) -> Result<ExecOutcome, AttributeError> {
        let mut outcome = ExecOutcome::default();
        let alloc_records = instance_count.max(1);

        for (name, entry) in self.entries.iter_mut() {
            if !entry.needs_alloc {
                continue;
            }
            trace!(
                "allocating '{}': {} records x {} {}",
                name,
                alloc_records,
                entry.size,
                entry.kind
            );
            let buffer = NumericBuffer::zeroed(entry.kind, entry.size * alloc_records);
            entry.storage = Storage::Owned(buffer);
            entry.needs_alloc = false;
            entry.needs_update = true;
            outcome.allocated.push(name.clone());
        }

        for (name, entry) in self.entries.iter_mut() {
            if !entry.needs_update || entry.is_external_buffer() {
                continue;
            }
            let computation = entry.computation.clone();
            let Storage::Owned(buffer) = &mut entry.storage else {
                debug!("'{}' has no buffer to update, skipping", name);
                continue;
            };

            match computation {
                Computation::Updater(update) => {
                    update(UpdateArgs {
                        attribute: name,
                        buffer,
                        size: entry.size,
                        records,
                        instance_count,
                        context: &mut *context,
                    });
                }
                Computation::Accessor(accessor) => {
                    let Some(f) = accessors.and_then(|a| a.get(&accessor)) else {
                        return Err(AttributeError::MissingAccessor {
                            attribute: name.clone(),
                            accessor,
                        });
                    };
                    let written = pack_records(buffer, entry.size, &entry.default_value, records, f);
                    if written < records.len() {
                        warn!(
                            "'{}' holds {} records; {} trailing records were not written",
                            name,
                            written,
                            records.len() - written
                        );
                    }
                }
                Computation::External => {
                    debug!("'{}' is noAlloc, skipping update", name);
                    continue;
                }
            }

            check_sentinel(name, entry)?;
            entry.needs_update = false;
            entry.changed = true;
            self.needs_redraw = true;
            outcome.updated.push(name.clone());
        }

        Ok(outcome)
    }
}

/// Pack accessor output for each record into consecutive `size`-wide slots.
/// Missing or non-finite components take the default. Returns the number of
/// records written, which is capped by the buffer's capacity.
fn pack_records<R>(
    buffer: &mut NumericBuffer,
    size: usize,
    defaults: &Components,
    records: &[R],
    accessor: &dyn Fn(&R) -> Components,
) -> usize {
    let capacity = buffer.len() / size;
    let mut scratch = [0.0f64; MAX_COMPONENTS];
    let mut written = 0;
    for (i, record) in records.iter().take(capacity).enumerate() {
        let raw = accessor(record);
        for (k, slot) in scratch[..size].iter_mut().enumerate() {
            *slot = match raw.get(k) {
                Some(v) if v.is_finite() => v,
                _ => defaults.get(k).unwrap_or(0.0),
            };
        }
        buffer.write_components(i * size, &scratch[..size]);
        written += 1;
    }
    written
}

fn check_sentinel<R, C>(name: &str, entry: &AttributeEntry<R, C>) -> Result<(), AttributeError> {
    let Some(buffer) = entry.buffer() else {
        return Ok(());
    };
    if buffer.len() < SENTINEL_LEN {
        return Ok(());
    }
    let valid = (0..SENTINEL_LEN).all(|i| buffer.get(i).is_some_and(f64::is_finite));
    if valid {
        Ok(())
    } else {
        Err(AttributeError::CorruptAttribute {
            attribute: name.to_string(),
        })
    }
}
