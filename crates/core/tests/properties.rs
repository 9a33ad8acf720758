use equate_core::{Factory, Reflect, StaticFactory};
use proptest::prelude::*;

#[derive(Debug, Clone, Reflect)]
struct Parcel {
    id: i64,
    weight: f64,
    label: String,
    dims: Vec<i32>,
    scans: Vec<f32>,
    note: Option<String>,
}

static PARCEL_EQ: StaticFactory<Parcel> = StaticFactory::new(|| Factory::reflect().build());

fn same_f64(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a.to_bits() == b.to_bits()
}

fn same_f32s(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x.is_nan() && y.is_nan()) || x.to_bits() == y.to_bits())
}

fn fieldwise_equal(a: &Parcel, b: &Parcel) -> bool {
    a.id == b.id
        && same_f64(a.weight, b.weight)
        && a.label == b.label
        && a.dims == b.dims
        && same_f32s(&a.scans, &b.scans)
        && a.note == b.note
}

fn parcel() -> impl Strategy<Value = Parcel> {
    (
        -3i64..3,
        prop_oneof![Just(f64::NAN), Just(0.0), Just(-0.0), -2.0f64..2.0],
        "[ab]{0,2}",
        prop::collection::vec(-2i32..2, 0..3),
        prop::collection::vec(prop_oneof![Just(f32::NAN), -1.0f32..1.0], 0..3),
        prop::option::of("[ab]{0,1}"),
    )
        .prop_map(|(id, weight, label, dims, scans, note)| Parcel {
            id,
            weight,
            label,
            dims,
            scans,
            note,
        })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    })]

    /// Property: every instance equals itself and a structural copy.
    #[test]
    fn equality_is_reflexive(p in parcel()) {
        prop_assert!(PARCEL_EQ.equal(&p, &p));
        prop_assert!(PARCEL_EQ.equal(&p, &p.clone()));
    }

    /// Property: argument order never matters.
    #[test]
    fn equality_is_symmetric(a in parcel(), b in parcel()) {
        prop_assert_eq!(PARCEL_EQ.equal(&a, &b), PARCEL_EQ.equal(&b, &a));
    }

    /// Property: equal instances hash alike, and repeated hashing is stable.
    #[test]
    fn equal_instances_hash_alike(a in parcel(), b in parcel()) {
        if PARCEL_EQ.equal(&a, &b) {
            prop_assert_eq!(PARCEL_EQ.hash(&a), PARCEL_EQ.hash(&b));
        }
        prop_assert_eq!(PARCEL_EQ.hash(&a), PARCEL_EQ.hash(&a.clone()));
    }

    /// Property: the factory agrees with a hand-written member-by-member
    /// comparison under NaN-equivalent float semantics.
    #[test]
    fn equality_matches_member_comparison(a in parcel(), b in parcel()) {
        prop_assert_eq!(PARCEL_EQ.equal(&a, &b), fieldwise_equal(&a, &b));
    }

    /// Property: equality is transitive across chains of copies.
    #[test]
    fn equality_is_transitive(a in parcel(), b in parcel(), c in parcel()) {
        if PARCEL_EQ.equal(&a, &b) && PARCEL_EQ.equal(&b, &c) {
            prop_assert!(PARCEL_EQ.equal(&a, &c));
        }
    }
}
