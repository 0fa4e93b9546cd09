use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{TypedKey, TypedLabelMap};

#[test]
fn set_then_get_round_trips() {
    let map = TypedLabelMap::new();
    let key: TypedKey<i64> = TypedKey::new("n");
    map.set(&key, 3);
    assert_eq!(map.get(&key), Some(3));
}

#[test]
fn get_on_absent_key_is_none() {
    let map = TypedLabelMap::new();
    let key: TypedKey<i64> = TypedKey::new("missing");
    assert_eq!(map.get(&key), None);
}

#[test]
fn get_or_default_falls_back() {
    let map = TypedLabelMap::new();
    let key: TypedKey<String> = TypedKey::new("name");
    assert_eq!(map.get_or_default(&key, "anonymous".to_string()), "anonymous");
    map.set(&key, "alice".to_string());
    assert_eq!(map.get_or_default(&key, "anonymous".to_string()), "alice");
}

#[test]
fn delete_removes_value() {
    let map = TypedLabelMap::new();
    let key: TypedKey<i64> = TypedKey::new("n");
    map.set(&key, 1);
    map.delete(&key);
    assert_eq!(map.get(&key), None);
}

#[test]
fn keys_reflects_present_entries() {
    let map = TypedLabelMap::new();
    map.set(&TypedKey::<i64>::new("a"), 1);
    map.set(&TypedKey::<i64>::new("b"), 2);
    let mut keys = map.keys();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
}

#[test]
#[should_panic(expected = "programmer error: type mismatch")]
fn mismatched_type_retrieval_panics() {
    let map = TypedLabelMap::new();
    let k1: TypedKey<i64> = TypedKey::new("n");
    let k2: TypedKey<String> = TypedKey::new("n");
    map.set(&k1, 3);
    let _ = map.get(&k2);
}

#[test]
fn clone_map_is_independent_new_container() {
    let map = TypedLabelMap::new();
    let key: TypedKey<i64> = TypedKey::new("n");
    map.set(&key, 1);

    let cloned = map.clone_map();
    assert_eq!(cloned.get(&key), Some(1));

    // Mutating the original after cloning must not affect the clone.
    map.set(&key, 2);
    assert_eq!(map.get(&key), Some(2));
    assert_eq!(cloned.get(&key), Some(1));
}

#[test]
fn readonly_view_shares_storage_with_source() {
    let map = TypedLabelMap::new();
    let key: TypedKey<i64> = TypedKey::new("n");
    let view = map.as_readonly();

    assert_eq!(view.get(&key), None);
    map.set(&key, 42);
    assert_eq!(view.get(&key), Some(42));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn get_or_compute_invokes_generator_exactly_once() {
    let map = Arc::new(TypedLabelMap::new());
    let key: TypedKey<i64> = TypedKey::new("computed");
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..100 {
        let map = map.clone();
        let key = key.clone();
        let calls = calls.clone();
        handles.push(tokio::spawn(async move {
            map.get_or_compute(&key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                7
            })
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.into_iter().all(|v| v == 7));
}

#[test]
fn get_or_compute_on_distinct_keys_runs_independently() {
    let map = TypedLabelMap::new();
    let a: TypedKey<i64> = TypedKey::new("a");
    let b: TypedKey<i64> = TypedKey::new("b");

    assert_eq!(map.get_or_compute(&a, || 1), 1);
    assert_eq!(map.get_or_compute(&b, || 2), 2);
    // Already-computed keys don't re-invoke the generator.
    assert_eq!(map.get_or_compute(&a, || panic!("should not run again")), 1);
}
