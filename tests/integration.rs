//! Integration tests for the client runtime over the in-memory transport.

use simlink::protocol::SimObjectDataBuilder;
use simlink::{
    ConnectionConfig, DataType, Directive, MemoryTransport, Period, RequestFlags, Revision,
    SimConnection, SimValue, SubscribeOptions, VariableSpec,
};
use std::sync::Arc;
use std::time::Duration;

fn connect() -> SimConnection<MemoryTransport> {
    SimConnection::open(
        MemoryTransport::new().with_echo(),
        ConnectionConfig {
            poll_interval: Duration::from_millis(5),
            ..Default::default()
        },
    )
    .unwrap()
}

fn alt_spec() -> VariableSpec {
    VariableSpec::new("ALT")
        .units("feet")
        .data_type(DataType::Float64)
        .epsilon(0.5)
}

// --- Definitions ---

#[test]
fn test_same_specs_reuse_definition() {
    let mut sc = connect();
    let specs = [
        VariableSpec::new("PLANE ALTITUDE"),
        VariableSpec::new("AIRSPEED INDICATED").units("knots"),
    ];

    let first = sc.subscribe(&specs, SubscribeOptions::default()).unwrap();
    let second = sc.subscribe(&specs, SubscribeOptions::default()).unwrap();

    assert!(Arc::ptr_eq(first.definition(), second.definition()));
    assert_ne!(first.request_id(), second.request_id());

    let adds = sc
        .transport()
        .sent()
        .into_iter()
        .filter(|d| matches!(d, Directive::AddToDataDefinition { .. }))
        .count();
    assert_eq!(adds, 2);
}

#[test]
fn test_units_resolved_from_catalog() {
    let mut sc = connect();
    let sub = sc
        .subscribe(
            &[
                VariableSpec::new("plane_altitude"),
                VariableSpec::new("TITLE"),
                VariableSpec::new("KOHLSMAN SETTING HG").units("hectopascals"),
            ],
            SubscribeOptions::default(),
        )
        .unwrap();

    assert_eq!(
        sub.units(),
        vec![
            ("plane_altitude".to_string(), "feet".to_string()),
            ("TITLE".to_string(), String::new()),
            ("KOHLSMAN SETTING HG".to_string(), "hectopascal".to_string()),
        ]
    );
    assert_eq!(
        sub.definition().types(),
        &[DataType::Float64, DataType::FixedString(256), DataType::Float64]
    );
}

// --- Subscriptions ---

#[test]
fn test_tagged_updates_stamp_revisions_without_epsilon_filtering() {
    let mut sc = connect();
    let sub = sc
        .subscribe(&[alt_spec()], SubscribeOptions::default())
        .unwrap();
    let define_id = sub.definition().id();

    sc.transport_mut().push(
        SimObjectDataBuilder::new(sub.request_id(), define_id)
            .tagged()
            .tagged_f64(0, 1000.25)
            .build(),
    );
    assert!(sc.receive(None).unwrap());
    assert_eq!(sub.get("ALT"), Some(SimValue::Float64(1000.25)));
    assert_eq!(sub.data().read().revision_of("ALT"), Some(Revision(1)));

    // Smaller than the epsilon, still applied.
    sc.transport_mut().push(
        SimObjectDataBuilder::new(sub.request_id(), define_id)
            .tagged()
            .tagged_f64(0, 1000.4)
            .build(),
    );
    assert!(sc.receive(None).unwrap());
    assert_eq!(sub.get("ALT"), Some(SimValue::Float64(1000.4)));
    assert_eq!(sub.data().read().revision_of("ALT"), Some(Revision(2)));
}

#[test]
fn test_tagged_order_does_not_change_final_values() {
    let mut sc = connect();
    let specs: Vec<VariableSpec> = ["A", "B", "C", "D"]
        .into_iter()
        .map(|name| VariableSpec::new(name).units("feet"))
        .collect();
    let forward = sc.subscribe(&specs, SubscribeOptions::default()).unwrap();
    let reverse = sc.subscribe(&specs, SubscribeOptions::default()).unwrap();
    let define_id = forward.definition().id();

    let mut fwd = SimObjectDataBuilder::new(forward.request_id(), define_id).tagged();
    let mut rev = SimObjectDataBuilder::new(reverse.request_id(), define_id).tagged();
    for i in 0..4u32 {
        fwd = fwd.tagged_f64(i, f64::from(i) * 10.0);
        rev = rev.tagged_f64(3 - i, f64::from(3 - i) * 10.0);
    }
    sc.transport_mut().push(fwd.build());
    sc.transport_mut().push(rev.build());
    assert!(sc.receive(None).unwrap());

    for name in ["A", "B", "C", "D"] {
        assert_eq!(forward.get(name), reverse.get(name));
    }
    assert_eq!(forward.latest(), Revision(4));
    assert_eq!(reverse.latest(), Revision(4));
}

#[test]
fn test_untagged_fills_first_entries_only() {
    let mut sc = connect();
    let specs: Vec<VariableSpec> = ["A", "B", "C"]
        .into_iter()
        .map(|name| VariableSpec::new(name).units("feet"))
        .collect();
    let sub = sc
        .subscribe(&specs, SubscribeOptions::default().flags(RequestFlags::DEFAULT))
        .unwrap();

    let record = SimObjectDataBuilder::new(sub.request_id(), sub.definition().id())
        .f64(1.0)
        .f64(2.0)
        .f64(99.0)
        .define_count(2)
        .build();
    sc.transport_mut().push(record);
    assert!(sc.receive(None).unwrap());

    let data = sub.snapshot();
    assert_eq!(data.len(), 2);
    assert_eq!(data.get("A"), Some(&SimValue::Float64(1.0)));
    assert_eq!(data.get("B"), Some(&SimValue::Float64(2.0)));
    assert!(!data.contains_key("C"));
}

#[test]
fn test_changed_since_tracks_deltas() {
    let mut sc = connect();
    let specs = [
        VariableSpec::new("A").units("feet"),
        VariableSpec::new("B").units("feet"),
    ];
    let sub = sc.subscribe(&specs, SubscribeOptions::default()).unwrap();
    let define_id = sub.definition().id();

    sc.transport_mut().push(
        SimObjectDataBuilder::new(sub.request_id(), define_id)
            .tagged()
            .tagged_f64(0, 1.0)
            .tagged_f64(1, 2.0)
            .build(),
    );
    sc.receive(None).unwrap();
    let seen = sub.latest();
    assert!(sub.changed_since(seen).is_empty());

    sc.transport_mut().push(
        SimObjectDataBuilder::new(sub.request_id(), define_id)
            .tagged()
            .tagged_f64(1, 3.0)
            .build(),
    );
    sc.receive(None).unwrap();
    assert_eq!(
        sub.changed_since(seen),
        vec![("B".to_string(), SimValue::Float64(3.0))]
    );
}

#[test]
fn test_callbacks_run_once_per_update() {
    let mut sc = connect();
    let values = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let seen = Arc::clone(&values);
    let sub = sc
        .subscribe_with_callback(&[alt_spec()], SubscribeOptions::default(), move |data| {
            seen.lock().push(data.get("ALT").cloned());
        })
        .unwrap();

    for v in [1.0, 2.0, 3.0] {
        sc.transport_mut().push(
            SimObjectDataBuilder::new(sub.request_id(), sub.definition().id())
                .tagged()
                .tagged_f64(0, v)
                .build(),
        );
    }
    sc.receive(None).unwrap();

    // All records were applied before the callbacks ran.
    assert_eq!(
        *values.lock(),
        vec![Some(SimValue::Float64(3.0)); 3]
    );
}

// --- Reads and writes ---

#[test]
fn test_set_values_then_snapshot_round_trip() {
    let mut sc = connect();
    sc.set_values(&[
        VariableSpec::new("PLANE ALTITUDE").value(1500.0),
        VariableSpec::new("GEAR HANDLE POSITION").value(1),
        VariableSpec::new("ATC ID").value("N172SP"),
    ])
    .unwrap();

    let data = sc
        .get_snapshot(
            &[
                VariableSpec::new("PLANE ALTITUDE"),
                VariableSpec::new("GEAR HANDLE POSITION"),
                VariableSpec::new("ATC ID"),
            ],
            Some(Duration::from_millis(200)),
        )
        .unwrap();

    assert_eq!(data.get("PLANE ALTITUDE"), Some(&SimValue::Float64(1500.0)));
    assert_eq!(data.get("GEAR HANDLE POSITION"), Some(&SimValue::Int32(1)));
    assert_eq!(data.get("ATC ID"), Some(&SimValue::String("N172SP".into())));
    assert_eq!(sc.definitions().len(), 1);
}

#[test]
fn test_set_value_and_get_datum() {
    let mut sc = connect();
    sc.set_value("KOHLSMAN SETTING HG", 29.92, Some("inHg")).unwrap();

    let value = sc
        .get_datum("KOHLSMAN SETTING HG", Some("inHg"), Some(Duration::from_millis(200)))
        .unwrap();
    assert_eq!(value, Some(SimValue::Float64(29.92)));
}

#[test]
fn test_set_values_wire_form() {
    let mut sc = connect();
    sc.set_value("PLANE ALTITUDE", 1200.0, None).unwrap();

    match sc.transport().sent().last() {
        Some(Directive::SetDataOnSimObject {
            object_id,
            flags,
            array_count,
            unit_size,
            data,
            ..
        }) => {
            assert_eq!(*object_id, 0);
            assert_eq!(*flags, 0);
            assert_eq!(*array_count, 0);
            assert_eq!(*unit_size, 8);
            assert_eq!(data, &1200.0f64.to_le_bytes().to_vec());
        }
        other => panic!("Expected SetDataOnSimObject, got {:?}", other),
    }
}

#[test]
fn test_snapshot_request_is_single_and_untagged() {
    let mut sc = connect();
    sc.get_snapshot(&["PLANE ALTITUDE".into()], Some(Duration::from_millis(10)))
        .unwrap();

    let request = sc
        .transport()
        .sent()
        .into_iter()
        .find(|d| matches!(d, Directive::RequestDataOnSimObject { .. }));
    match request {
        Some(Directive::RequestDataOnSimObject {
            period,
            flags,
            limit,
            ..
        }) => {
            assert_eq!(period, Period::Once);
            assert_eq!(flags, RequestFlags::DEFAULT);
            assert_eq!(limit, 1);
        }
        other => panic!("Expected RequestDataOnSimObject, got {:?}", other),
    }
    assert_eq!(sc.subscription_count(), 0);
}

// --- Events ---

#[test]
fn test_event_spellings_share_client_id() {
    let mut sc = connect();
    let a = sc.send_event("Kohlsman_Inc", 0).unwrap();
    let b = sc.send_event("KOHLSMAN_INC", 0).unwrap();
    assert_eq!(a, b);

    let maps = sc
        .transport()
        .sent()
        .into_iter()
        .filter(|d| matches!(d, Directive::MapClientEventToSimEvent { .. }))
        .count();
    assert_eq!(maps, 1);
}

// --- Session ---

#[test]
fn test_server_info_after_first_receive() {
    let mut sc = connect();
    assert!(sc.server_info().is_none());
    assert!(sc.receive(Some(Duration::from_millis(50))).unwrap());
    let info = sc.server_info().unwrap();
    assert_eq!(info.application_name, "MemoryTransport");
    assert_eq!(info.protocol_version.0, simlink::protocol::PROTOCOL_VERSION);
}

#[test]
fn test_config_file_drives_connection() {
    use std::io::Write;

    let dir = tempfile::TempDir::new().unwrap();
    let catalog_path = dir.path().join("vars.json");
    std::fs::write(
        &catalog_path,
        r#"{"VARIABLES": {"FUEL LEVEL": {"name": "FUEL LEVEL", "units_std": "gallons", "dimensions": "Volume"}},
            "UNITS": {"GALLONS": {"name_std": "gallons", "dimensions": "Volume"}}}"#,
    )
    .unwrap();

    let config_path = dir.path().join("config.json");
    let mut file = std::fs::File::create(&config_path).unwrap();
    write!(
        file,
        r#"{{"client_name": "fuel-panel", "catalog_path": {:?}}}"#,
        catalog_path.to_str().unwrap()
    )
    .unwrap();
    drop(file);

    let config = ConnectionConfig::from_json_file(&config_path).unwrap();
    let mut sc = SimConnection::open(MemoryTransport::new(), config).unwrap();
    assert_eq!(sc.transport().client_name(), Some("fuel-panel"));

    let sub = sc
        .subscribe(&["fuel_level".into()], SubscribeOptions::default())
        .unwrap();
    assert_eq!(sub.units(), vec![("fuel_level".to_string(), "gallons".to_string())]);
}
