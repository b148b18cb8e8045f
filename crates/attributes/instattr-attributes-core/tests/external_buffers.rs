use std::cell::Cell;
use std::sync::Arc;

use instattr_attributes_core::{
    Accessors, AttributeError, AttributeManager, AttributeSpec, ElementKind, ExternalBuffers,
    NumericBuffer, Override, UpdateParams,
};

fn manager() -> AttributeManager<[f64; 2]> {
    let mut mgr = AttributeManager::default();
    mgr.register([
        ("positions", AttributeSpec::accessor("getPosition").size(2)),
        ("indices", AttributeSpec::no_alloc().indexed().kind(ElementKind::Uint32)),
    ])
    .unwrap();
    mgr
}

fn external(name: &str, buffer: &Arc<NumericBuffer>) -> ExternalBuffers {
    let mut buffers = ExternalBuffers::new();
    buffers.insert(name.to_string(), Arc::clone(buffer));
    buffers
}

const DATA: [[f64; 2]; 3] = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

#[test]
fn external_buffer_takes_precedence_over_invalidation() {
    let mut mgr = manager();
    let calls = Cell::new(0usize);
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| {
        calls.set(calls.get() + 1);
        *r
    });

    mgr.update(UpdateParams::new(3, &DATA, &mut ()).accessors(&accessors))
        .unwrap();
    assert_eq!(calls.get(), 3);
    mgr.changed(true);
    mgr.needs_redraw(true);

    mgr.invalidate("getPosition").unwrap();
    let supplied = Arc::new(NumericBuffer::from(vec![0.5f32; 6]));
    let buffers = external("positions", &supplied);
    let report = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&buffers),
        )
        .unwrap();

    assert_eq!(calls.get(), 3, "accessor must not run for an external attribute");
    assert!(report.updated.is_empty());
    assert_eq!(report.external, vec!["positions".to_string()]);

    let positions = mgr.attribute("positions").unwrap();
    assert!(positions.is_external);
    assert!(!positions.needs_update);
    assert!(positions.changed);
    assert_eq!(positions.buffer, Some(supplied.as_ref()));
    assert!(mgr.needs_redraw(true));
}

#[test]
fn same_buffer_again_is_not_a_change() {
    let mut mgr = manager();
    let supplied = Arc::new(NumericBuffer::from(vec![0.0f32; 6]));
    let buffers = external("positions", &supplied);
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| *r);

    mgr.update(
        UpdateParams::new(3, &DATA, &mut ())
            .accessors(&accessors)
            .buffers(&buffers),
    )
    .unwrap();
    assert_eq!(mgr.changed(true).len(), 1);
    assert!(mgr.needs_redraw(true));

    let report = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&buffers),
        )
        .unwrap();
    assert!(report.is_idle());
    assert!(mgr.changed(true).is_empty());
    assert!(!mgr.needs_redraw(false));
}

#[test]
fn dropping_the_buffer_returns_to_computed() {
    let mut mgr = manager();
    let supplied = Arc::new(NumericBuffer::from(vec![0.0f32; 6]));
    let buffers = external("positions", &supplied);
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| *r);

    mgr.update(
        UpdateParams::new(3, &DATA, &mut ())
            .accessors(&accessors)
            .buffers(&buffers),
    )
    .unwrap();

    let report = mgr
        .update(UpdateParams::new(3, &DATA, &mut ()).accessors(&accessors))
        .unwrap();
    assert_eq!(report.allocated, vec!["positions".to_string()]);
    assert_eq!(report.updated, vec!["positions".to_string()]);
    let positions = mgr.attribute("positions").unwrap();
    assert!(!positions.is_external);
    assert_eq!(
        positions.buffer.unwrap().to_f64_vec(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
}

#[test]
fn rejected_buffers_fail_the_cycle() {
    let mut mgr = manager();
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| *r);

    let doubles = Arc::new(NumericBuffer::from(vec![0.0f64; 6]));
    let err = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&external("positions", &doubles)),
        )
        .unwrap_err();
    assert_eq!(
        err,
        AttributeError::TypeMismatch {
            attribute: "positions".into(),
            expected: ElementKind::Float32,
            actual: ElementKind::Float64,
        }
    );

    let short = Arc::new(NumericBuffer::from(vec![0.0f32; 5]));
    let err = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&external("positions", &short)),
        )
        .unwrap_err();
    assert!(matches!(err, AttributeError::SizeMismatch { required: 6, actual: 5, .. }));

    let positions = mgr.attribute("positions").unwrap();
    assert!(!positions.is_external);
    assert!(positions.needs_update);
}

#[test]
fn unknown_buffer_names_error_unless_ignored() {
    let mut mgr = manager();
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| *r);
    let stray = Arc::new(NumericBuffer::from(vec![0.0f32; 6]));
    let buffers = external("normals", &stray);

    let err = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&buffers),
        )
        .unwrap_err();
    assert_eq!(
        err,
        AttributeError::UnknownAttribute {
            name: "normals".into()
        }
    );
    assert!(mgr.attribute("positions").unwrap().buffer.is_none());

    let report = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&buffers)
                .ignore_unknown_buffers(true),
        )
        .unwrap();
    assert_eq!(report.updated, vec!["positions".to_string()]);
}

#[test]
fn no_alloc_attributes_are_fed_from_outside() {
    let mut mgr = manager();
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| *r);
    let indices = Arc::new(NumericBuffer::from(vec![0u32, 1, 2, 2, 1, 0]));

    mgr.update(
        UpdateParams::new(3, &DATA, &mut ())
            .accessors(&accessors)
            .buffers(&external("indices", &indices)),
    )
    .unwrap();

    let bound: Vec<&str> = mgr.shader_attributes().into_iter().map(|(n, _)| n).collect();
    assert_eq!(bound, vec!["positions", "indices"]);
    assert_eq!(mgr.attribute("indices").unwrap().buffer, Some(indices.as_ref()));
}

#[test]
fn set_external_buffer_outside_a_cycle() {
    let mut mgr = manager();
    let supplied = Arc::new(NumericBuffer::from(vec![0.0f32; 2]));
    assert_eq!(
        mgr.set_external_buffer("positions", Some(Arc::clone(&supplied)), false),
        Ok(Some(Override::Replaced))
    );
    assert_eq!(
        mgr.set_external_buffer("positions", Some(supplied), false),
        Ok(Some(Override::Unchanged))
    );
    assert_eq!(
        mgr.set_external_buffer("positions", None, false),
        Ok(Some(Override::Computed))
    );
    assert!(mgr.attribute("positions").unwrap().buffer.is_none());
    assert_eq!(mgr.set_external_buffer("normals", None, true), Ok(None));
}

#[test]
fn set_external_buffer_survives_later_updates() {
    let mut mgr = manager();
    let calls = Cell::new(0usize);
    let accessors = Accessors::new().with("getPosition", |r: &[f64; 2]| {
        calls.set(calls.get() + 1);
        *r
    });
    mgr.update(UpdateParams::new(3, &DATA, &mut ()).accessors(&accessors))
        .unwrap();
    assert_eq!(calls.get(), 3);

    mgr.invalidate("getPosition").unwrap();
    let supplied = Arc::new(NumericBuffer::from(vec![0.5f32; 6]));
    mgr.set_external_buffer("positions", Some(Arc::clone(&supplied)), false)
        .unwrap();

    let report = mgr
        .update(UpdateParams::new(3, &DATA, &mut ()).accessors(&accessors))
        .unwrap();
    assert_eq!(calls.get(), 3, "accessor must not run while the override is set");
    assert_eq!(report.external, vec!["positions".to_string()]);
    let positions = mgr.attribute("positions").unwrap();
    assert!(positions.is_external);
    assert!(!positions.needs_update);
    assert_eq!(positions.buffer, Some(supplied.as_ref()));

    // Clearing the override hands the attribute back to the accessor.
    mgr.set_external_buffer("positions", None, false).unwrap();
    mgr.update(UpdateParams::new(3, &DATA, &mut ()).accessors(&accessors))
        .unwrap();
    assert_eq!(calls.get(), 6);
    assert!(!mgr.attribute("positions").unwrap().is_external);
}

#[test]
fn one_bad_buffer_rejects_the_whole_map() {
    let mut mgr: AttributeManager<[f64; 2]> = AttributeManager::default();
    mgr.register([
        ("a", AttributeSpec::accessor("getA").size(2)),
        ("b", AttributeSpec::accessor("getB").size(2)),
    ])
    .unwrap();
    let accessors = Accessors::new()
        .with("getA", |r: &[f64; 2]| *r)
        .with("getB", |r: &[f64; 2]| *r);

    let mut buffers = ExternalBuffers::new();
    buffers.insert("a".into(), Arc::new(NumericBuffer::from(vec![0.0f32; 6])));
    buffers.insert("b".into(), Arc::new(NumericBuffer::from(vec![0i32; 6])));

    let err = mgr
        .update(
            UpdateParams::new(3, &DATA, &mut ())
                .accessors(&accessors)
                .buffers(&buffers),
        )
        .unwrap_err();
    assert!(matches!(err, AttributeError::TypeMismatch { ref attribute, .. } if attribute == "b"));
    let a = mgr.attribute("a").unwrap();
    assert!(!a.is_external);
    assert!(!a.changed);
    assert!(!mgr.needs_redraw(false));

    // Without the map, `a` is computed as usual.
    let report = mgr
        .update(UpdateParams::new(3, &DATA, &mut ()).accessors(&accessors))
        .unwrap();
    assert_eq!(report.updated, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(
        mgr.attribute("a").unwrap().buffer.unwrap().to_f64_vec(),
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
    );
}
