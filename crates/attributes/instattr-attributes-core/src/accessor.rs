//! Accessor outputs and the per-update accessor bindings.
//!
//! An accessor maps one record to up to four raw components. [`Components`]
//! is a fixed-capacity value so the packing loop never allocates; anything
//! past the fourth component is dropped, and components an accessor leaves
//! out are filled from the attribute's default value.

use hashbrown::HashMap;

/// Maximum components per record.
pub const MAX_COMPONENTS: usize = 4;

/// Raw output of an accessor for one record.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Components {
    values: [f64; MAX_COMPONENTS],
    len: usize,
}

impl Components {
    /// No components: every slot takes the default value.
    pub const EMPTY: Components = Components {
        values: [0.0; MAX_COMPONENTS],
        len: 0,
    };

    /// Copy up to four components from `values`.
    pub fn from_slice(values: &[f64]) -> Self {
        let len = values.len().min(MAX_COMPONENTS);
        let mut out = Components::EMPTY;
        out.values[..len].copy_from_slice(&values[..len]);
        out.len = len;
        out
    }

    /// Component `k`, if the accessor produced one.
    #[inline]
    pub fn get(&self, k: usize) -> Option<f64> {
        if k < self.len {
            Some(self.values[k])
        } else {
            None
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.len]
    }
}

impl Default for Components {
    fn default() -> Self {
        Components::EMPTY
    }
}

impl From<f64> for Components {
    fn from(v: f64) -> Self {
        Components::from_slice(&[v])
    }
}

impl From<f32> for Components {
    fn from(v: f32) -> Self {
        Components::from(v as f64)
    }
}

impl From<i32> for Components {
    fn from(v: i32) -> Self {
        Components::from(v as f64)
    }
}

impl From<u32> for Components {
    fn from(v: u32) -> Self {
        Components::from(v as f64)
    }
}

impl<const N: usize> From<[f64; N]> for Components {
    fn from(v: [f64; N]) -> Self {
        Components::from_slice(&v)
    }
}

impl<const N: usize> From<[f32; N]> for Components {
    fn from(v: [f32; N]) -> Self {
        let mut out = Components::EMPTY;
        for (slot, x) in out.values.iter_mut().zip(v) {
            *slot = x as f64;
        }
        out.len = N.min(MAX_COMPONENTS);
        out
    }
}

impl From<&[f64]> for Components {
    fn from(v: &[f64]) -> Self {
        Components::from_slice(v)
    }
}

impl From<Vec<f64>> for Components {
    fn from(v: Vec<f64>) -> Self {
        Components::from_slice(&v)
    }
}

impl<T: Into<Components>> From<Option<T>> for Components {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or_default()
    }
}

type AccessorFn<'a, R> = Box<dyn Fn(&R) -> Components + 'a>;

/// Named accessor functions bound for one update cycle.
pub struct Accessors<'a, R> {
    fns: HashMap<String, AccessorFn<'a, R>>,
}

impl<'a, R> Accessors<'a, R> {
    pub fn new() -> Self {
        Self {
            fns: HashMap::new(),
        }
    }

    /// Bind `name` to `f`, replacing any previous binding.
    pub fn insert<F, T>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&R) -> T + 'a,
        T: Into<Components>,
    {
        self.fns
            .insert(name.into(), Box::new(move |r: &R| -> Components { f(r).into() }));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<F, T>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&R) -> T + 'a,
        T: Into<Components>,
    {
        self.insert(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<&(dyn Fn(&R) -> Components + 'a)> {
        self.fns.get(name).map(|f| f.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }
}

impl<R> Default for Accessors<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> std::fmt::Debug for Accessors<'_, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.fns.keys()).finish()
    }
}
