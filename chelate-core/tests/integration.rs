//! End-to-end tests for the mapping contract over an in-memory store.

use chelate_core::{
    Chelate, ChelateError, Complex, Decimal, MemoryStore, Rational, Span, Timestamp, Value,
};
use indexmap::IndexMap;

fn sample_values() -> Vec<Value> {
    vec![
        Value::Null,
        Value::Bool(true),
        Value::Bool(false),
        Value::Int(-7),
        Value::Int(i64::MAX),
        Value::Float(0.125),
        Value::Complex(Complex::new(1.0, -1.0)),
        Value::Decimal(Decimal::new(314, -2)),
        Value::Rational(Rational::new(-2, 6).unwrap()),
        Value::Char('λ'),
        Value::Text("plain text".into()),
        Value::Text(String::new()),
        Value::Bytes(vec![0u8, 255, 128]),
        Value::Timestamp(Timestamp::new(86_400, 1)),
        Value::Span(Span::new(-3600, 0)),
        Value::Uuid(uuid::Uuid::new_v4()),
        Value::Seq(vec![Value::Int(1), Value::from("two")]),
    ]
}

#[test]
fn stores_and_returns_every_value_kind() {
    let mut m = Chelate::new(MemoryStore::new());
    for (i, value) in sample_values().into_iter().enumerate() {
        let key = Value::Int(i as i64);
        m.insert(key.clone(), value.clone()).unwrap();
        assert_eq!(m.get(key).unwrap(), value);
    }
}

#[test]
fn stored_values_survive_without_the_cache() {
    // Same namespace, second instance: everything comes back from the store.
    let store = MemoryStore::new();
    let ns = "survival";

    let values = sample_values();

    let mut writer = Chelate::open(store.clone(), ns);
    for (i, value) in values.iter().enumerate() {
        writer.insert(Value::Int(i as i64), value.clone()).unwrap();
    }

    let mut reader = Chelate::open(store, ns);
    for (i, value) in values.iter().enumerate() {
        assert_eq!(reader.get(Value::Int(i as i64)).unwrap(), *value);
    }
}

#[test]
fn nan_survives_a_store_round_trip() {
    let store = MemoryStore::new();
    let mut writer = Chelate::open(store.clone(), "nan");
    writer.insert("nan", f64::NAN).unwrap();

    let mut reader = Chelate::open(store, "nan");
    match reader.get("nan").unwrap() {
        Value::Float(f) => assert!(f.is_nan()),
        other => panic!("expected float, got {:?}", other),
    }
}

#[test]
fn cross_instance_durability() {
    let store = MemoryStore::new();
    let mut a = Chelate::open(store.clone(), "shared");
    a.insert("k", "written by a").unwrap();

    let mut b = Chelate::open(store, "shared");
    assert_eq!(b.get("k").unwrap(), Value::from("written by a"));
    assert!(b.contains("k").unwrap());
}

#[test]
fn mapping_contract_scenario() {
    let mut m = Chelate::new(MemoryStore::new());
    assert_eq!(m.len().unwrap(), 0);

    m.insert("10", "ten").unwrap();
    m.insert("20", "twenty").unwrap();
    m.insert("30", "thirty").unwrap();

    m.remove("20").unwrap();

    let mut keys = m.keys().unwrap();
    keys.sort_by_key(|k| k.to_string());
    assert_eq!(keys, vec![Value::from("10"), Value::from("30")]);
    assert_eq!(m.len().unwrap(), 2);

    assert_eq!(m.get_or("15", "fifteen").unwrap(), Value::from("fifteen"));

    assert_eq!(m.set_default("40", "forty").unwrap(), Value::from("forty"));
    m.remove("40").unwrap();

    assert_eq!(m.pop("10").unwrap(), Value::from("ten"));
    assert!(!m.contains("10").unwrap());

    let (k, _) = m.pop_item().unwrap();
    assert!(!m.contains(k).unwrap());

    m.clear().unwrap();
    assert_eq!(m.len().unwrap(), 0);
    assert!(matches!(m.pop_item(), Err(ChelateError::Empty)));
}

#[test]
fn update_then_compare_with_plain_mapping() {
    let mut m = Chelate::new(MemoryStore::new());
    m.update([("10", "ten"), ("20", "twenty")]).unwrap();

    let mut expected = IndexMap::new();
    // Insertion order differs on purpose; comparison is content-based.
    expected.insert(Value::from("20"), Value::from("twenty"));
    expected.insert(Value::from("10"), Value::from("ten"));
    assert!(m.content_eq(Some(&expected)).unwrap());
    assert_eq!(m.materialize().unwrap(), expected);
}

#[test]
fn two_instances_compare_equal_by_content() {
    let store = MemoryStore::new();
    let mut a = Chelate::open(store.clone(), "cmp");
    a.update([("10", "ten"), ("20", "twenty")]).unwrap();

    let mut b = Chelate::open(store, "cmp");
    let snapshot = a.materialize().unwrap();
    assert!(b.content_eq(Some(&snapshot)).unwrap());

    b.insert("30", "thirty").unwrap();
    assert!(!b.content_eq(Some(&snapshot)).unwrap());
}

#[test]
fn values_and_items_agree() {
    let mut m = Chelate::new(MemoryStore::new());
    m.insert("a", 1i64).unwrap();
    m.insert("b", 2i64).unwrap();

    let items = m.items().unwrap();
    let values = m.values().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(
        values,
        items.into_iter().map(|(_, v)| v).collect::<Vec<_>>()
    );
}

#[test]
fn nested_containers_round_trip_through_the_store() {
    let store = MemoryStore::new();
    let mut inner = IndexMap::new();
    inner.insert(Value::from("a"), Value::from("b"));
    let mut outer = IndexMap::new();
    outer.insert(Value::from("stuff"), Value::Map(inner));

    let mut writer = Chelate::open(store.clone(), "nested");
    writer.insert(1i64, Value::Map(outer.clone())).unwrap();

    let mut reader = Chelate::open(store, "nested");
    assert_eq!(reader.get(1i64).unwrap(), Value::Map(outer));
}
