//! AttributeManager: public surface tying the registry to one update cycle.
//!
//! Methods:
//! - register, register_instanced, register_json, unregister
//! - invalidate, invalidate_all
//! - update (override → plan → execute → flags → transitions)
//! - attributes, attribute, changed, needs_redraw, set_needs_redraw
//! - enable_transitions, update_transition, shader_attributes

use std::fmt;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use instattr_buffer_core::NumericBuffer;
use log::{debug, warn};

use crate::accessor::Accessors;
use crate::config::Config;
use crate::descriptor::{AttributeSpec, AttributeTable, AttributeView, Updaters};
use crate::error::AttributeError;
use crate::external::{ExternalBuffers, Override};
use crate::registry::AttributeRegistry;
use crate::stored_attributes::parse_attribute_defs_json;
use crate::transition::{DeviceCapabilities, TransitionDriver, TransitionOptions};

/// Inputs for one update cycle.
pub struct UpdateParams<'a, R, C = ()> {
    pub instance_count: usize,
    pub records: &'a [R],
    pub accessors: Option<&'a Accessors<'a, R>>,
    /// External buffers for this cycle. Attributes missing from the map are
    /// computed unless pinned with `AttributeManager::set_external_buffer`.
    pub buffers: Option<&'a ExternalBuffers>,
    /// Passed to every bulk updater.
    pub context: &'a mut C,
    /// New transition settings, forwarded to the driver when present.
    pub transitions: Option<&'a TransitionOptions>,
    /// Skip buffers for names that are not registered instead of failing.
    pub ignore_unknown_buffers: bool,
}

impl<'a, R, C> UpdateParams<'a, R, C> {
    pub fn new(instance_count: usize, records: &'a [R], context: &'a mut C) -> Self {
        Self {
            instance_count,
            records,
            accessors: None,
            buffers: None,
            context,
            transitions: None,
            ignore_unknown_buffers: false,
        }
    }

    pub fn accessors(mut self, accessors: &'a Accessors<'a, R>) -> Self {
        self.accessors = Some(accessors);
        self
    }

    pub fn buffers(mut self, buffers: &'a ExternalBuffers) -> Self {
        self.buffers = Some(buffers);
        self
    }

    pub fn transitions(mut self, options: &'a TransitionOptions) -> Self {
        self.transitions = Some(options);
        self
    }

    pub fn ignore_unknown_buffers(mut self, ignore: bool) -> Self {
        self.ignore_unknown_buffers = ignore;
        self
    }
}

/// What one update cycle did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateReport {
    pub instance_count: usize,
    /// Attributes that got a fresh buffer.
    pub allocated: Vec<String>,
    /// Attributes recomputed by an updater or accessor.
    pub updated: Vec<String>,
    /// Attributes backed by an external buffer this cycle.
    pub external: Vec<String>,
    /// Time spent allocating and computing; `None` when nothing needed work.
    pub elapsed: Option<Duration>,
}

impl UpdateReport {
    /// True when the cycle allocated and computed nothing.
    pub fn is_idle(&self) -> bool {
        self.allocated.is_empty() && self.updated.is_empty()
    }
}

pub struct AttributeManager<R, C = ()> {
    cfg: Config,
    registry: AttributeRegistry<R, C>,
    instance_count: usize,
    transition_options: TransitionOptions,
    transitions: Option<Box<dyn TransitionDriver>>,
}

impl<R, C> AttributeManager<R, C> {
    pub fn new(cfg: Config) -> Self {
        Self {
            transition_options: cfg.transitions.clone(),
            cfg,
            registry: AttributeRegistry::new(),
            instance_count: 0,
            transitions: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.cfg.id
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Instance count of the most recent update.
    pub fn instance_count(&self) -> usize {
        self.instance_count
    }

    /// Register a batch of attributes. Nothing is registered if any spec is invalid.
    pub fn register<I, N>(&mut self, batch: I) -> Result<(), AttributeError>
    where
        I: IntoIterator<Item = (N, AttributeSpec<R, C>)>,
        N: Into<String>,
    {
        self.registry.register(batch, false)
    }

    /// Like [`register`](Self::register), marking every attribute as per-instance.
    pub fn register_instanced<I, N>(&mut self, batch: I) -> Result<(), AttributeError>
    where
        I: IntoIterator<Item = (N, AttributeSpec<R, C>)>,
        N: Into<String>,
    {
        self.registry.register(batch, true)
    }

    /// Register attributes from JSON definitions; see
    /// [`parse_attribute_defs_json`] for the format.
    pub fn register_json(&mut self, json: &str, updaters: &Updaters<R, C>) -> Result<(), AttributeError> {
        let specs = parse_attribute_defs_json(json, updaters)?;
        self.registry.register(specs, false)
    }

    /// Remove attributes by name; absent names are ignored.
    pub fn unregister<I, N>(&mut self, names: I) -> usize
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        self.registry.unregister(names)
    }

    pub fn invalidate(&mut self, trigger: &str) -> Result<Vec<String>, AttributeError> {
        self.registry.invalidate(trigger)
    }

    pub fn invalidate_all(&mut self) -> Vec<String> {
        self.registry.invalidate_all()
    }

    /// Pin an external buffer to `name` outside of an update cycle. It stays
    /// until cleared with `None` or replaced through [`UpdateParams::buffers`].
    pub fn set_external_buffer(
        &mut self,
        name: &str,
        buffer: Option<std::sync::Arc<NumericBuffer>>,
        ignore_unknown: bool,
    ) -> Result<Option<Override>, AttributeError> {
        self.registry
            .set_external_buffer(name, buffer, self.instance_count, ignore_unknown)
    }

    /// Run one update cycle.
    ///
    /// External buffers are applied first, then buffers are planned. When
    /// nothing needs allocation or recomputation no callback runs. Finally the
    /// transition driver, if any, sees the resulting attribute table.
    pub fn update(&mut self, params: UpdateParams<'_, R, C>) -> Result<UpdateReport, AttributeError> {
        let UpdateParams {
            instance_count,
            records,
            accessors,
            buffers,
            context,
            transitions,
            ignore_unknown_buffers,
        } = params;

        self.instance_count = instance_count;
        let mut report = UpdateReport {
            instance_count,
            ..UpdateReport::default()
        };

        report.external =
            self.registry
                .apply_external_buffers(buffers, instance_count, ignore_unknown_buffers)?;

        if self.registry.plan(instance_count) {
            debug!("{}: updating attributes for {} instances", self.cfg.id, instance_count);
            let start = Instant::now();
            let outcome = self.registry.run(instance_count, records, accessors, context)?;
            let elapsed = start.elapsed();
            debug!(
                "{}: updated {:?} in {:.2}ms",
                self.cfg.id,
                outcome.updated,
                elapsed.as_secs_f64() * 1000.0
            );
            report.allocated = outcome.allocated;
            report.updated = outcome.updated;
            report.elapsed = Some(elapsed);
        }

        if let Some(options) = transitions {
            self.transition_options = options.clone();
        }
        if let Some(driver) = self.transitions.as_mut() {
            if let Some(options) = transitions {
                driver.set_options(options);
            }
            driver.update(&self.registry.table());
        }

        Ok(report)
    }

    pub fn attributes(&self) -> AttributeTable<'_> {
        self.registry.table()
    }

    pub fn attribute(&self, name: &str) -> Option<AttributeView<'_>> {
        self.registry.get(name)
    }

    /// Attributes changed since the flags were last cleared.
    pub fn changed(&mut self, clear: bool) -> Vec<AttributeView<'_>> {
        self.registry.changed(clear)
    }

    pub fn needs_redraw(&mut self, clear: bool) -> bool {
        self.registry.needs_redraw(clear)
    }

    pub fn set_needs_redraw(&mut self) {
        self.registry.set_needs_redraw();
    }

    /// Attach a transition driver if the device supports it. `build` gets the
    /// manager id and the current transition options.
    pub fn enable_transitions<T, F>(&mut self, caps: &DeviceCapabilities, build: F) -> bool
    where
        T: TransitionDriver + 'static,
        F: FnOnce(&str, &TransitionOptions) -> T,
    {
        if !T::is_supported(caps) {
            warn!("{}: transitions are not supported on this device", self.cfg.id);
            return false;
        }
        let driver = build(&self.cfg.id, &self.transition_options);
        self.transitions = Some(Box::new(driver));
        true
    }

    pub fn has_transitions(&self) -> bool {
        self.transitions.is_some()
    }

    /// Advance transitions. Raises the redraw flag when anything moved.
    pub fn update_transition(&mut self) -> bool {
        let moved = self.transitions.as_mut().is_some_and(|d| d.run());
        if moved {
            self.registry.set_needs_redraw();
        }
        moved
    }

    /// Buffers to bind for drawing: transition output where a driver
    /// provides one, otherwise each attribute's own buffer.
    pub fn shader_attributes(&self) -> Vec<(&str, &NumericBuffer)> {
        let overrides: HashMap<&str, &NumericBuffer> = self
            .transitions
            .as_ref()
            .map(|d| d.attributes().into_iter().collect())
            .unwrap_or_default();

        self.registry
            .entries
            .iter()
            .filter_map(|(name, entry)| {
                let own = entry.buffer()?;
                let buffer = overrides.get(name.as_str()).copied().unwrap_or(own);
                Some((name.as_str(), buffer))
            })
            .collect()
    }
}

impl<R, C> Default for AttributeManager<R, C> {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl<R, C> fmt::Debug for AttributeManager<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeManager")
            .field("id", &self.cfg.id)
            .field("instance_count", &self.instance_count)
            .field("registry", &self.registry)
            .field("transitions", &self.transitions.is_some())
            .finish()
    }
}
