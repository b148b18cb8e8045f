//! Attribute registry and trigger index.
//!
//! Entries are kept in registration order; the trigger index is rebuilt from
//! that order after every batch so lookups are deterministic.

use indexmap::IndexMap;
use log::debug;

use crate::descriptor::{AttributeEntry, AttributeSpec, AttributeTable, AttributeView};
use crate::error::AttributeError;

pub struct AttributeRegistry<R, C = ()> {
    pub(crate) entries: IndexMap<String, AttributeEntry<R, C>>,
    /// trigger name -> attribute names, in registration order.
    pub(crate) triggers: IndexMap<String, Vec<String>>,
    pub(crate) needs_redraw: bool,
}

impl<R, C> AttributeRegistry<R, C> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            triggers: IndexMap::new(),
            needs_redraw: false,
        }
    }

    /// Validate and insert a batch of attributes.
    ///
    /// Every spec is validated before anything is inserted, so a failing batch
    /// leaves the registry untouched. Re-registering a name replaces the old
    /// entry with a fresh one (no buffer, flags reset).
    pub fn register<I, N>(&mut self, batch: I, force_instanced: bool) -> Result<(), AttributeError>
    where
        I: IntoIterator<Item = (N, AttributeSpec<R, C>)>,
        N: Into<String>,
    {
        let mut built = Vec::new();
        for (name, spec) in batch {
            let name = name.into();
            let entry = spec.build(&name, force_instanced)?;
            built.push((name, entry));
        }
        for (name, entry) in built {
            debug!("registered attribute '{}' ({:?})", name, entry.computation);
            self.entries.insert(name, entry);
        }
        self.rebuild_triggers();
        Ok(())
    }

    /// Remove the named attributes. Absent names are ignored.
    /// Returns how many attributes were removed.
    pub fn unregister<I, N>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        let mut removed = 0;
        for name in names {
            if self.entries.shift_remove(name.as_ref()).is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.rebuild_triggers();
        }
        removed
    }

    /// Rebuild the trigger -> attributes index. Each attribute is its own
    /// trigger; its accessor name and aliases map to it as well.
    pub(crate) fn rebuild_triggers(&mut self) {
        self.triggers.clear();
        for (name, entry) in &self.entries {
            let own = std::iter::once(name.as_str());
            for trigger in own.chain(entry.trigger_names()) {
                let targets = self.triggers.entry(trigger.to_string()).or_default();
                if !targets.iter().any(|t| t == name) {
                    targets.push(name.clone());
                }
            }
        }
    }

    /// Attribute names that `trigger` invalidates.
    pub fn trigger_targets(&self, trigger: &str) -> Option<&[String]> {
        self.triggers.get(trigger).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<AttributeView<'_>> {
        self.entries
            .get_key_value(name)
            .map(|(name, entry)| entry.view(name))
    }

    pub fn table(&self) -> AttributeTable<'_> {
        AttributeTable::new(
            self.entries
                .iter()
                .map(|(name, entry)| entry.view(name))
                .collect(),
        )
    }
}

impl<R, C> Default for AttributeRegistry<R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C> std::fmt::Debug for AttributeRegistry<R, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeRegistry")
            .field("attributes", &self.entries.keys().collect::<Vec<_>>())
            .field("triggers", &self.triggers)
            .field("needs_redraw", &self.needs_redraw)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Registry = AttributeRegistry<f64>;
    type Spec = AttributeSpec<f64>;

    #[test]
    fn failed_batch_registers_nothing() {
        let mut reg = Registry::new();
        let err = reg
            .register(
                [
                    ("positions", Spec::accessor("getPosition").size(3)),
                    ("radius", Spec::accessor("getRadius").size(7)),
                ],
                false,
            )
            .unwrap_err();
        assert!(matches!(err, AttributeError::Definition { ref attribute, .. } if attribute == "radius"));
        assert!(reg.is_empty());
        assert!(reg.trigger_targets("getPosition").is_none());
    }

    #[test]
    fn trigger_index_covers_names_accessors_and_aliases() {
        let mut reg = Registry::new();
        reg.register(
            [
                (
                    "sourcePositions",
                    Spec::accessor("getSourcePosition").size(3).alias("getPath"),
                ),
                (
                    "targetPositions",
                    Spec::accessor("getTargetPosition").size(3).alias("getPath"),
                ),
            ],
            false,
        )
        .expect("register");

        assert_eq!(
            reg.trigger_targets("getPath"),
            Some(&["sourcePositions".to_string(), "targetPositions".to_string()][..])
        );
        assert_eq!(
            reg.trigger_targets("sourcePositions"),
            Some(&["sourcePositions".to_string()][..])
        );
        assert_eq!(
            reg.trigger_targets("getTargetPosition"),
            Some(&["targetPositions".to_string()][..])
        );
    }

    #[test]
    fn unregister_ignores_absent_names_and_reindexes() {
        let mut reg = Registry::new();
        reg.register(
            [
                ("a", Spec::accessor("getA").size(1)),
                ("b", Spec::accessor("getB").size(1)),
            ],
            false,
        )
        .expect("register");

        assert_eq!(reg.unregister(["a", "missing"]), 1);
        assert_eq!(reg.unregister(["a"]), 0);
        assert!(reg.trigger_targets("getA").is_none());
        assert_eq!(reg.names().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn register_instanced_forces_flag() {
        let mut reg = Registry::new();
        reg.register([("offsets", Spec::accessor("getOffset").size(2))], true)
            .expect("register");
        assert!(reg.get("offsets").is_some_and(|v| v.instanced));
    }
}
