use indexmap::IndexMap;
use instattr_buffer_core::resolve;
use serde::Deserialize;

use crate::descriptor::{AttributeSpec, Updaters};
use crate::error::AttributeError;

/// Public API: parse JSON attribute definitions into registrable specs, in
/// document order.
///
/// ```json
/// {
///   "positions": { "size": 3, "accessor": "getPosition", "update": "calcPositions" },
///   "colors":    { "size": 4, "type": "uint8", "clamped": true,
///                  "accessor": ["getFillColor", "getStyle"], "defaultValue": [0, 0, 0, 255] }
/// }
/// ```
///
/// Notes:
/// - `accessor` may be a list; the first entry is the accessor, the rest are aliases.
/// - `update` names a bulk updater in `updaters`; an unknown name is a definition error.
/// - `type` takes any tag understood by [`instattr_buffer_core::resolve`] (default float32).
/// - `defaultValue` may be a single number or a list.
pub fn parse_attribute_defs_json<R, C>(
    s: &str,
    updaters: &Updaters<R, C>,
) -> Result<Vec<(String, AttributeSpec<R, C>)>, AttributeError> {
    let defs: IndexMap<String, StoredAttribute> =
        serde_json::from_str(s).map_err(|e| AttributeError::Json(e.to_string()))?;

    let mut specs = Vec::with_capacity(defs.len());
    for (name, def) in defs {
        let spec = to_spec(&name, def, updaters)?;
        specs.push((name, spec));
    }
    Ok(specs)
}

fn to_spec<R, C>(
    name: &str,
    def: StoredAttribute,
    updaters: &Updaters<R, C>,
) -> Result<AttributeSpec<R, C>, AttributeError> {
    let mut spec = if def.no_alloc {
        AttributeSpec::no_alloc()
    } else {
        AttributeSpec::new()
    };

    if let Some(tag) = &def.ty {
        let kind = resolve(tag, def.clamped)
            .map_err(|e| AttributeError::definition(name, e.to_string()))?;
        spec = spec.kind(kind);
    }
    spec = spec.clamped(def.clamped);

    let mut accessors = def.accessor.map(OneOrMany::into_vec).unwrap_or_default().into_iter();
    if let Some(accessor) = accessors.next() {
        spec = spec.with_accessor(accessor);
    }
    for alias in accessors.chain(def.accessor_aliases) {
        spec = spec.alias(alias);
    }

    if let Some(update) = &def.update {
        let Some(f) = updaters.get(update) else {
            return Err(AttributeError::definition(
                name,
                format!("unknown update function '{update}'"),
            ));
        };
        spec = spec.with_updater(f.clone());
    }

    if let Some(size) = def.size {
        spec = spec.size(size);
    }
    if let Some(default) = def.default_value {
        spec = spec.default_value(default.into_vec());
    }
    if def.is_indexed {
        spec = spec.indexed();
    }
    Ok(spec.instanced(def.instanced))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct StoredAttribute {
    #[serde(default)]
    size: Option<usize>,
    #[serde(default, rename = "type")]
    ty: Option<String>,
    #[serde(default)]
    clamped: bool,
    #[serde(default)]
    accessor: Option<OneOrMany<String>>,
    #[serde(default)]
    accessor_aliases: Vec<String>,
    #[serde(default)]
    update: Option<String>,
    #[serde(default)]
    no_alloc: bool,
    #[serde(default)]
    is_indexed: bool,
    #[serde(default)]
    instanced: bool,
    #[serde(default)]
    default_value: Option<OneOrMany<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}
