//! Comparison dispatch: one strategy variant per value-kind family.
//!
//! The variant is picked once, when the factory is built, so evaluating a
//! member never inspects its type again.

use std::borrow::Cow;

use crate::array::{self, ElementKind};
use crate::descriptor::{Access, ArrayFn, EqualFn, HashFn, MemberDescriptor, ScalarFn, ValueKind};
use crate::value::ScalarKind;

/// Equality and hash contribution for one member.
pub(crate) enum Strategy<T> {
    Scalar {
        name: Cow<'static, str>,
        kind: ScalarKind,
        get: ScalarFn<T>,
    },
    Reference {
        name: Cow<'static, str>,
        equal: EqualFn<T>,
        hash: HashFn<T>,
    },
    Array {
        name: Cow<'static, str>,
        kind: ElementKind,
        get: ArrayFn<T>,
    },
    ObjectArray {
        name: Cow<'static, str>,
        equal: EqualFn<T>,
        hash: HashFn<T>,
    },
}

impl<T> Strategy<T> {
    pub(crate) fn name(&self) -> &str {
        match self {
            Strategy::Scalar { name, .. }
            | Strategy::Reference { name, .. }
            | Strategy::Array { name, .. }
            | Strategy::ObjectArray { name, .. } => name,
        }
    }

    pub(crate) fn kind(&self) -> ValueKind {
        match self {
            Strategy::Scalar { kind, .. } => ValueKind::Scalar(*kind),
            Strategy::Reference { .. } => ValueKind::Reference,
            Strategy::Array { kind, .. } => ValueKind::Array(*kind),
            Strategy::ObjectArray { .. } => ValueKind::Array(ElementKind::Object),
        }
    }

    pub(crate) fn equal(&self, a: &T, b: &T) -> bool {
        match self {
            Strategy::Scalar { get, .. } => get(a) == get(b),
            Strategy::Reference { equal, .. } | Strategy::ObjectArray { equal, .. } => equal(a, b),
            Strategy::Array { get, .. } => array::views_equal(get(a), get(b)),
        }
    }

    pub(crate) fn hash(&self, value: &T) -> i32 {
        match self {
            Strategy::Scalar { get, .. } => get(value).contribution(),
            Strategy::Reference { hash, .. } | Strategy::ObjectArray { hash, .. } => hash(value),
            Strategy::Array { get, .. } => array::view_hash(get(value)),
        }
    }
}

/// Picks the strategy for a selected member. Placement-only accessors have
/// no strategy.
pub(crate) fn dispatch<T>(descriptor: MemberDescriptor<T>) -> Option<Strategy<T>> {
    let MemberDescriptor {
        name, kind, access, ..
    } = descriptor;
    let strategy = match (kind, access) {
        (ValueKind::Scalar(kind), Access::Scalar(get)) => Strategy::Scalar { name, kind, get },
        (ValueKind::Array(ElementKind::Object), Access::Pair { equal, hash }) => {
            Strategy::ObjectArray { name, equal, hash }
        }
        (ValueKind::Reference, Access::Pair { equal, hash }) => {
            Strategy::Reference { name, equal, hash }
        }
        (ValueKind::Array(kind), Access::Array(get)) => Strategy::Array { name, kind, get },
        _ => return None,
    };
    Some(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::DEFAULT_ORDER;

    struct Sample {
        ratio: f64,
        label: Option<String>,
        samples: Option<Vec<f32>>,
        nested: Vec<Vec<i16>>,
    }

    fn descriptor(name: &'static str, (kind, access): (ValueKind, Access<Sample>)) -> MemberDescriptor<Sample> {
        MemberDescriptor {
            name: name.into(),
            kind,
            order: DEFAULT_ORDER,
            access,
        }
    }

    fn strategies() -> Vec<Strategy<Sample>> {
        vec![
            descriptor("ratio", Access::scalar(|s: &Sample| s.ratio)),
            descriptor("label", Access::reference(|s: &Sample| s.label.as_ref())),
            descriptor("samples", Access::array(|s: &Sample| s.samples.as_ref())),
            descriptor("nested", Access::object_array(|s: &Sample| Some(&s.nested))),
        ]
        .into_iter()
        .filter_map(dispatch)
        .collect()
    }

    fn sample() -> Sample {
        Sample {
            ratio: f64::NAN,
            label: Some("a".into()),
            samples: Some(vec![1.0, 2.0]),
            nested: vec![vec![1], vec![2, 3]],
        }
    }

    #[test]
    fn each_kind_gets_its_variant() {
        let kinds: Vec<_> = strategies().iter().map(Strategy::kind).collect();
        assert_eq!(
            kinds,
            [
                ValueKind::Scalar(ScalarKind::F64),
                ValueKind::Reference,
                ValueKind::Array(ElementKind::F32),
                ValueKind::Array(ElementKind::Object),
            ]
        );
        assert_eq!(strategies()[1].name(), "label");
    }

    #[test]
    fn copies_compare_equal_member_by_member() {
        let (a, b) = (sample(), sample());
        for strategy in strategies() {
            assert!(strategy.equal(&a, &b), "{} differs", strategy.name());
            assert_eq!(strategy.hash(&a), strategy.hash(&b));
        }
    }

    #[test]
    fn absent_values_only_match_absent_values() {
        let a = sample();
        let mut b = sample();
        b.label = None;
        b.samples = None;
        let strategies = strategies();

        assert!(!strategies[1].equal(&a, &b));
        assert!(!strategies[2].equal(&a, &b));
        assert!(strategies[1].equal(&b, &b));
        assert_eq!(strategies[1].hash(&b), 0);
        assert_eq!(strategies[2].hash(&b), 0);
    }

    #[test]
    fn nested_element_changes_are_seen() {
        let a = sample();
        let mut b = sample();
        b.nested[1][1] = 4;
        assert!(!strategies()[3].equal(&a, &b));
    }

    #[test]
    fn placement_accessors_have_no_strategy() {
        let opaque = MemberDescriptor::<Sample> {
            name: "eq".into(),
            kind: ValueKind::Reference,
            order: DEFAULT_ORDER,
            access: Access::Opaque,
        };
        assert!(dispatch(opaque).is_none());
    }
}
