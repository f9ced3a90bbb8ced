//! End-to-end scenarios against the public API.
//!
//! Run with: `cargo test --test plant_scenarios`

#![allow(clippy::pedantic)]
#![expect(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use weed::{
    CustomSeed, InitFlags, LeafFlags, PlantPtr, RawPtr, SeedType, Value, Values,
    WEED_ABI_VERSION_MIN, Weed, WeedError, leaf_copy,
};

#[test]
fn scenario_a_set_and_get_int() {
    common::init_tracing();
    let p = common::plant(1);

    p.set("x", Values::from(vec![5])).unwrap();
    assert_eq!(p.get("x", 0).unwrap(), Value::Int(5));
    assert_eq!(p.seed_type("x"), Some(SeedType::Int));
    assert_eq!(p.num_elements("x"), 1);
}

#[test]
fn scenario_b_string_sizes_follow_abi() {
    let current = common::plant(1);
    current.set("name", Values::from(vec!["hello"])).unwrap();
    assert_eq!(current.element_size("name", 0), 6);
    assert_eq!(
        current.get("name", 0).unwrap(),
        Value::String(Some("hello".into()))
    );

    let legacy = Weed::init(WEED_ABI_VERSION_MIN, InitFlags::empty())
        .unwrap()
        .plant_new(1);
    legacy.set("name", Values::from(vec!["hello"])).unwrap();
    assert_eq!(legacy.element_size("name", 0), 5);
    assert_eq!(legacy.get_bytes("name", 0).unwrap(), b"hello");

    let backported = Weed::init(WEED_ABI_VERSION_MIN, InitFlags::BACKPORT_BUGFIXES)
        .unwrap()
        .plant_new(1);
    backported.set("name", Values::from(vec!["hello"])).unwrap();
    assert_eq!(backported.element_size("name", 0), 6);
}

#[test]
fn scenario_c_undeletable_leaf_survives() {
    let p = common::plant(1);
    p.set("x", Values::from(vec![5])).unwrap();
    p.set_flags("x", LeafFlags::UNDELETABLE).unwrap();

    assert_eq!(p.delete("x").unwrap_err(), WeedError::Undeletable);
    assert_eq!(p.get("x", 0).unwrap(), Value::Int(5));

    // Undeletable does not mean immutable.
    p.set("x", Values::from(vec![6])).unwrap();
    assert_eq!(p.get("x", 0).unwrap(), Value::Int(6));
}

#[test]
fn scenario_d_racing_creators_make_one_leaf() {
    common::init_tracing();
    for _ in 0..200 {
        let p = common::plant(1);
        common::run_on_threads(&p, 2, |plant, t| {
            if t == 0 {
                plant.set("y", Values::from(vec![5])).unwrap();
            } else {
                plant.append("y", Values::from(vec![1, 2])).unwrap();
            }
        });

        let keys = p.list_leaves();
        assert_eq!(keys.iter().filter(|k| *k == "y").count(), 1);
        let y = p.get_all("y").unwrap();
        assert!(
            y == Values::from(vec![5]) || y == Values::from(vec![5, 1, 2]),
            "unexpected {y:?}"
        );
    }
}

#[test]
fn scenario_e_seed_mismatch_keeps_value() {
    let p = common::plant(1);
    p.set("x", Values::from(vec![5])).unwrap();
    assert_eq!(
        p.set("x", Values::from(vec!["five"])).unwrap_err(),
        WeedError::WrongSeedType
    );
    assert_eq!(p.get("x", 0).unwrap(), Value::Int(5));
}

#[test]
fn immutable_leaf_can_still_be_deleted() {
    let p = common::plant(1);
    p.set("frozen", Values::from(vec![1.5])).unwrap();
    p.set_flags("frozen", LeafFlags::IMMUTABLE).unwrap();

    assert_eq!(
        p.set("frozen", Values::from(vec![2.5])).unwrap_err(),
        WeedError::Immutable
    );
    assert_eq!(p.get("frozen", 0).unwrap(), Value::Double(1.5));
    p.delete("frozen").unwrap();
    assert!(!p.has_leaf("frozen"));
}

#[test]
fn null_and_empty_strings_are_distinct() {
    let p = common::plant(1);
    p.set("s", Values::from(vec![None, Some(String::new())]))
        .unwrap();

    assert_eq!(p.get("s", 0).unwrap(), Value::String(None));
    assert_eq!(p.get("s", 1).unwrap(), Value::String(Some(String::new())));
    assert_eq!(p.element_size("s", 0), 0);
    assert_eq!(p.element_size("s", 1), 1);
}

#[test]
fn pointer_family_seeds() {
    let p = common::plant(1);
    let child = common::plant(2);

    p.set("cb", Values::func_ptrs(vec![RawPtr::from_addr(0x40)]))
        .unwrap();
    p.set("data", Values::void_ptrs(vec![RawPtr::NULL, RawPtr::from_addr(8)]))
        .unwrap();
    p.set("children", Values::plant_ptrs(&[&child])).unwrap();

    assert_eq!(p.seed_type("cb"), Some(SeedType::FuncPtr));
    assert_eq!(p.element_size("data", 1), size_of::<usize>());
    let Value::PlantPtr(ptr) = p.get("children", 0).unwrap() else {
        panic!("expected a plant pointer");
    };
    assert!(ptr.points_to(&child));
    assert_ne!(ptr, PlantPtr::null());
}

#[test]
fn custom_seed_round_trip() {
    let p = common::plant(1);
    let custom = CustomSeed::new(2048).unwrap();
    let seed = SeedType::Custom(custom);
    p.set(
        "blob",
        Values::custom(seed, vec![RawPtr::from_addr(0x10), RawPtr::from_addr(0x20)]).unwrap(),
    )
    .unwrap();

    assert_eq!(p.seed_type("blob"), Some(seed));
    assert_eq!(
        p.get("blob", 1).unwrap(),
        Value::Custom(custom, RawPtr::from_addr(0x20))
    );
    assert_eq!(WeedError::Custom(1500).code(), 1500);
}

#[test]
fn custom_values_cannot_claim_builtin_seeds() {
    let p = common::plant(1);
    for seed in [SeedType::String, SeedType::Int64, SeedType::VoidPtr] {
        assert_eq!(
            Values::custom(seed, vec![RawPtr::from_addr(8)]).unwrap_err(),
            WeedError::WrongSeedType
        );
    }
    // Code 5 is int64; it is not a custom seed.
    assert_eq!(CustomSeed::new(5), None);
    assert_eq!(SeedType::custom(5), None);

    // A leaf built from a custom seed reports a custom seed everywhere.
    let seed = SeedType::custom(1024).unwrap();
    p.set("blob", Values::custom(seed, vec![RawPtr::from_addr(0x30)]).unwrap())
        .unwrap();
    assert_eq!(p.seed_type("blob"), Some(seed));
    assert_eq!(p.element_size("blob", 0), size_of::<usize>());
    assert_eq!(p.get_bytes("blob", 0).unwrap().len(), size_of::<usize>());
    assert_eq!(p.get_value::<String>("blob"), Err(WeedError::WrongSeedType));
    assert_eq!(
        p.set("blob", Values::from(vec!["text"])).unwrap_err(),
        WeedError::WrongSeedType
    );
}

#[test]
fn nested_plants_outlive_parent_references() {
    let parent = common::plant(1);
    let child = common::plant(2);
    child.set("depth", Values::from(vec![1])).unwrap();
    parent.set_value("child", PlantPtr::new(&child)).unwrap();

    let reached = parent
        .get_value::<PlantPtr>("child")
        .unwrap()
        .upgrade()
        .unwrap();
    assert!(Arc::ptr_eq(&reached, &child));
    assert_eq!(reached.get_value::<i32>("depth").unwrap(), 1);
}

#[test]
fn copy_between_plants() {
    let a = common::plant(1);
    let b = common::plant(1);
    a.set("xs", Values::from(vec![1_i64, 2, 3])).unwrap();
    leaf_copy(&b, "ys", &a, "xs").unwrap();

    a.set("xs", Values::from(vec![9_i64])).unwrap();
    assert_eq!(b.get_all("ys").unwrap(), Values::from(vec![1_i64, 2, 3]));
}

#[test]
fn freed_plant_answers_not_found() {
    let p = common::plant(1);
    p.set("a", Values::from(vec![true])).unwrap();
    p.free().unwrap();

    assert!(p.list_leaves().is_empty());
    assert!(!p.has_leaf("a"));
    assert_eq!(p.plant_type().unwrap_err(), WeedError::NoSuchLeaf);
    assert_eq!(
        p.append("a", Values::from(vec![false])).unwrap_err(),
        WeedError::NoSuchLeaf
    );
}
