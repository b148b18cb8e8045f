//! Attribute descriptors.
//!
//! Hosts describe an attribute with an [`AttributeSpec`]. Registration
//! validates it into an [`AttributeEntry`], which the registry owns together
//! with the attribute's buffer and lifecycle flags. Callers only ever see an
//! entry through an [`AttributeView`].

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use hashbrown::HashMap;
use instattr_buffer_core::{ElementKind, NumericBuffer};

use crate::accessor::{Components, MAX_COMPONENTS};
use crate::error::AttributeError;

/// Arguments handed to a bulk updater.
pub struct UpdateArgs<'a, R, C> {
    pub attribute: &'a str,
    /// Sized for at least `instance_count` records of `size` components.
    pub buffer: &'a mut NumericBuffer,
    pub size: usize,
    pub records: &'a [R],
    pub instance_count: usize,
    pub context: &'a mut C,
}

/// A bulk updater fills the whole buffer itself.
pub type Updater<R, C> = Rc<dyn Fn(UpdateArgs<'_, R, C>)>;

/// How an attribute's buffer gets its contents.
pub enum Computation<R, C> {
    /// A bulk updater writes all components.
    Updater(Updater<R, C>),
    /// The named accessor is run once per record.
    Accessor(String),
    /// `noAlloc`: the host always supplies the buffer.
    External,
}

impl<R, C> Computation<R, C> {
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self, Computation::External)
    }
}

impl<R, C> Clone for Computation<R, C> {
    fn clone(&self) -> Self {
        match self {
            Computation::Updater(f) => Computation::Updater(Rc::clone(f)),
            Computation::Accessor(name) => Computation::Accessor(name.clone()),
            Computation::External => Computation::External,
        }
    }
}

impl<R, C> fmt::Debug for Computation<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Computation::Updater(_) => f.write_str("Updater(..)"),
            Computation::Accessor(name) => f.debug_tuple("Accessor").field(name).finish(),
            Computation::External => f.write_str("External"),
        }
    }
}

/// Named bulk updaters, referenced by JSON attribute definitions.
pub struct Updaters<R, C = ()> {
    map: HashMap<String, Updater<R, C>>,
}

impl<R, C> Updaters<R, C> {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn insert<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(UpdateArgs<'_, R, C>) + 'static,
    {
        self.map.insert(name.into(), Rc::new(f));
    }

    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(UpdateArgs<'_, R, C>) + 'static,
    {
        self.insert(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Updater<R, C>> {
        self.map.get(name)
    }
}

impl<R, C> Default for Updaters<R, C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-facing attribute description, validated at registration.
pub struct AttributeSpec<R, C = ()> {
    size: Option<usize>,
    kind: ElementKind,
    clamped: bool,
    accessor: Option<String>,
    updater: Option<Updater<R, C>>,
    no_alloc: bool,
    aliases: Vec<String>,
    default_value: Option<Components>,
    is_indexed: bool,
    instanced: bool,
}

impl<R, C> AttributeSpec<R, C> {
    /// Empty spec. Fails validation unless a computation or `no_alloc` is added.
    pub fn new() -> Self {
        Self {
            size: None,
            kind: ElementKind::Float32,
            clamped: false,
            accessor: None,
            updater: None,
            no_alloc: false,
            aliases: Vec::new(),
            default_value: None,
            is_indexed: false,
            instanced: false,
        }
    }

    /// Filled per record by the named accessor.
    pub fn accessor(name: impl Into<String>) -> Self {
        Self::new().with_accessor(name)
    }

    /// Filled by a bulk updater.
    pub fn updater<F>(f: F) -> Self
    where
        F: Fn(UpdateArgs<'_, R, C>) + 'static,
    {
        Self::new().with_updater(Rc::new(f))
    }

    /// Never allocated or computed; the host supplies the buffer.
    pub fn no_alloc() -> Self {
        let mut spec = Self::new();
        spec.no_alloc = true;
        spec
    }

    /// Set the accessor name. Combined with an updater, the name only acts as
    /// a trigger.
    pub fn with_accessor(mut self, name: impl Into<String>) -> Self {
        self.accessor = Some(name.into());
        self
    }

    pub fn with_updater(mut self, f: Updater<R, C>) -> Self {
        self.updater = Some(f);
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn clamped(mut self, clamped: bool) -> Self {
        self.clamped = clamped;
        self
    }

    /// Extra trigger name that also invalidates this attribute.
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.aliases.push(name.into());
        self
    }

    pub fn default_value(mut self, value: impl Into<Components>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn indexed(mut self) -> Self {
        self.is_indexed = true;
        self
    }

    pub fn instanced(mut self, instanced: bool) -> Self {
        self.instanced = instanced;
        self
    }

    /// Validate into a fresh entry with no buffer and reset flags.
    pub(crate) fn build(
        self,
        name: &str,
        force_instanced: bool,
    ) -> Result<AttributeEntry<R, C>, AttributeError> {
        if name.is_empty() {
            return Err(AttributeError::definition(name, "name must not be empty"));
        }
        let size = match (self.size, self.is_indexed) {
            (Some(size), _) => size,
            (None, true) => 1,
            (None, false) => return Err(AttributeError::definition(name, "size is required")),
        };
        if !(1..=MAX_COMPONENTS).contains(&size) {
            return Err(AttributeError::definition(
                name,
                format!("size must be between 1 and {MAX_COMPONENTS}, got {size}"),
            ));
        }

        let computation = match (self.updater, &self.accessor, self.no_alloc) {
            (Some(_), _, true) | (None, Some(_), true) => {
                return Err(AttributeError::definition(
                    name,
                    "noAlloc cannot be combined with an accessor or update function",
                ))
            }
            (Some(f), _, false) => Computation::Updater(f),
            (None, Some(accessor), false) => {
                if accessor.is_empty() {
                    return Err(AttributeError::definition(name, "accessor must not be empty"));
                }
                Computation::Accessor(accessor.clone())
            }
            (None, None, true) => Computation::External,
            (None, None, false) => {
                return Err(AttributeError::definition(
                    name,
                    "needs an accessor, an update function or noAlloc",
                ))
            }
        };

        let kind = if self.clamped {
            self.kind.clamped()
        } else {
            self.kind
        };
        let needs_update = !computation.is_external();

        Ok(AttributeEntry {
            size,
            kind,
            computation,
            accessor: self.accessor,
            aliases: self.aliases,
            default_value: self.default_value.unwrap_or(DEFAULT_VALUE),
            is_indexed: self.is_indexed,
            instanced: self.instanced || force_instanced,
            storage: Storage::Empty,
            needs_alloc: false,
            needs_update,
            changed: false,
            pinned: false,
        })
    }
}

impl<R, C> Default for AttributeSpec<R, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, C> fmt::Debug for AttributeSpec<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("size", &self.size)
            .field("kind", &self.kind)
            .field("accessor", &self.accessor)
            .field("updater", &self.updater.is_some())
            .field("no_alloc", &self.no_alloc)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

const DEFAULT_VALUE: Components = Components::EMPTY;

/// Where an attribute's data currently lives.
#[derive(Debug)]
pub(crate) enum Storage {
    Empty,
    Owned(NumericBuffer),
    External(Arc<NumericBuffer>),
}

/// Registered attribute: descriptor plus mutable lifecycle state.
#[derive(Debug)]
pub(crate) struct AttributeEntry<R, C> {
    pub(crate) size: usize,
    pub(crate) kind: ElementKind,
    pub(crate) computation: Computation<R, C>,
    pub(crate) accessor: Option<String>,
    pub(crate) aliases: Vec<String>,
    pub(crate) default_value: Components,
    pub(crate) is_indexed: bool,
    pub(crate) instanced: bool,
    pub(crate) storage: Storage,
    pub(crate) needs_alloc: bool,
    pub(crate) needs_update: bool,
    pub(crate) changed: bool,
    /// External buffer set through `set_external_buffer`; survives cycles
    /// whose buffer map does not mention the attribute.
    pub(crate) pinned: bool,
}

impl<R, C> AttributeEntry<R, C> {
    pub(crate) fn buffer(&self) -> Option<&NumericBuffer> {
        match &self.storage {
            Storage::Empty => None,
            Storage::Owned(buf) => Some(buf),
            Storage::External(buf) => Some(buf.as_ref()),
        }
    }

    #[inline]
    pub(crate) fn is_external_buffer(&self) -> bool {
        matches!(self.storage, Storage::External(_))
    }

    /// Records the current buffer can hold.
    pub(crate) fn capacity_records(&self) -> usize {
        self.buffer().map_or(0, |b| b.len() / self.size)
    }

    /// Default for component `k`; components past the configured default are 0.
    #[inline]
    pub(crate) fn default_component(&self, k: usize) -> f64 {
        self.default_value.get(k).unwrap_or(0.0)
    }

    /// Trigger names this attribute answers to besides its own name.
    pub(crate) fn trigger_names(&self) -> impl Iterator<Item = &str> {
        self.accessor
            .as_deref()
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str))
    }

    pub(crate) fn view<'a>(&'a self, name: &'a str) -> AttributeView<'a> {
        AttributeView {
            name,
            size: self.size,
            kind: self.kind,
            buffer: self.buffer(),
            accessor: self.accessor.as_deref(),
            is_external: self.is_external_buffer(),
            no_alloc: self.computation.is_external(),
            is_indexed: self.is_indexed,
            instanced: self.instanced,
            needs_update: self.needs_update,
            changed: self.changed,
        }
    }
}

/// Read-only snapshot of one attribute.
#[derive(Copy, Clone, Debug)]
pub struct AttributeView<'a> {
    pub name: &'a str,
    pub size: usize,
    pub kind: ElementKind,
    pub buffer: Option<&'a NumericBuffer>,
    pub accessor: Option<&'a str>,
    pub is_external: bool,
    pub no_alloc: bool,
    pub is_indexed: bool,
    pub instanced: bool,
    pub needs_update: bool,
    pub changed: bool,
}

impl AttributeView<'_> {
    /// Records the buffer can hold (0 without a buffer).
    pub fn capacity_records(&self) -> usize {
        self.buffer.map_or(0, |b| b.len() / self.size)
    }
}

/// All attributes in registration order.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable<'a> {
    views: Vec<AttributeView<'a>>,
}

impl<'a> AttributeTable<'a> {
    pub(crate) fn new(views: Vec<AttributeView<'a>>) -> Self {
        Self { views }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeView<'a>> {
        self.views.iter().find(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeView<'a>> {
        self.views.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.views.iter().map(|v| v.name)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

impl<'a> IntoIterator for AttributeTable<'a> {
    type Item = AttributeView<'a>;
    type IntoIter = std::vec::IntoIter<AttributeView<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.views.into_iter()
    }
}
