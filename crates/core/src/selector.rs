//! Member selection: which members of a layout take part, and in what order.

use std::any::TypeId;
use std::borrow::Cow;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::descriptor::{Access, DEFAULT_ORDER, MemberDescriptor, SlotFn};
use crate::error::{EquateError, EquateResult};
use crate::layout::{Layout, Level, MemberDef, Role, Storage};

/// Selection mode. Exactly one is active per factory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Start from nothing; add named or include-marked members.
    Inclusion,
    /// Start from everything eligible; remove named or exclude-marked members.
    Exclusion,
}

/// Highest level whose members are still eligible.
#[derive(Debug, Clone)]
pub(crate) enum Boundary {
    Type { id: TypeId, name: &'static str },
    Named(String),
}

impl Boundary {
    fn matches<T>(&self, level: &Level<T>) -> bool {
        match self {
            Boundary::Type { id, .. } => level.type_id == *id,
            Boundary::Named(name) => level.is_named(name),
        }
    }

    fn describe(&self) -> &str {
        match self {
            Boundary::Type { name, .. } => name,
            Boundary::Named(name) => name,
        }
    }
}

/// Selection options collected by the builder.
#[derive(Debug, Clone, Default)]
pub(crate) struct Policy {
    pub(crate) boundary: Option<Boundary>,
    pub(crate) include_transient: bool,
    pub(crate) excluded: Vec<String>,
    pub(crate) included: Vec<String>,
    pub(crate) mode: Option<Mode>,
}

impl Policy {
    /// Feeds every option that changes the resulting factory into `state`.
    pub(crate) fn fingerprint<H: Hasher>(&self, state: &mut H) {
        match &self.boundary {
            None => 0u8.hash(state),
            Some(Boundary::Type { id, .. }) => {
                1u8.hash(state);
                id.hash(state);
            }
            Some(Boundary::Named(name)) => {
                2u8.hash(state);
                name.hash(state);
            }
        }
        self.include_transient.hash(state);
        self.excluded.hash(state);
        self.included.hash(state);
        self.mode.hash(state);
    }
}

/// Outcome of selection, in evaluation order.
pub(crate) struct Selection<T> {
    pub(crate) mode: Mode,
    pub(crate) members: Vec<MemberDescriptor<T>>,
    /// Selected members declared mutable.
    pub(crate) mutable: Vec<Cow<'static, str>>,
    pub(crate) cache_slot: Option<SlotFn<T>>,
}

pub(crate) fn select<T: 'static>(layout: Layout<T>, policy: &Policy) -> EquateResult<Selection<T>> {
    let type_name = layout.type_name();
    let mut levels = layout.levels;

    check_placement(type_name, &levels)?;

    let depth = match &policy.boundary {
        None => levels.len(),
        Some(boundary) => match levels.iter().position(|l| boundary.matches(l)) {
            Some(index) => index + 1,
            None => return Err(EquateError::unknown_boundary(type_name, boundary.describe())),
        },
    };

    let mut cache_slot = None;
    let mut eligible = Vec::new();
    for (index, level) in levels.drain(..).enumerate() {
        for member in level.members {
            if member.role == Role::HashCache && member.storage == Storage::Instance {
                // An ancestor's cache belongs to the ancestor's own factory.
                if index == 0 && cache_slot.is_none() {
                    if let Access::Slot(slot) = member.access {
                        cache_slot = Some(slot);
                    }
                }
                continue;
            }
            if index >= depth {
                tracing::trace!(type_name, member = %member.name, "above ancestor boundary");
                continue;
            }
            if member.role != Role::Data || member.storage == Storage::Shared {
                continue;
            }
            if member.transient && !policy.include_transient {
                tracing::trace!(type_name, member = %member.name, "transient member skipped");
                continue;
            }
            eligible.push((index, member));
        }
    }
    // Outermost ancestor first, declaration order within a level.
    eligible.sort_by_key(|(index, _)| std::cmp::Reverse(*index));
    let eligible: Vec<MemberDef<T>> = eligible.into_iter().map(|(_, m)| m).collect();

    for name in policy.included.iter().chain(&policy.excluded) {
        if !eligible.iter().any(|m| m.name == name.as_str()) {
            return Err(EquateError::unknown_member(type_name, name.clone()));
        }
    }

    let mode = resolve_mode(type_name, policy, &eligible)?;
    let mut chosen: Vec<MemberDef<T>> = match mode {
        Mode::Exclusion => eligible
            .into_iter()
            .filter(|m| !m.excluded && !policy.excluded.iter().any(|n| m.name == n.as_str()))
            .collect(),
        Mode::Inclusion => {
            let mut chosen: Vec<_> = eligible
                .into_iter()
                .filter(|m| m.included || policy.included.iter().any(|n| m.name == n.as_str()))
                .collect();
            // Stable: ties keep encounter order.
            chosen.sort_by_key(|m| m.order.unwrap_or(DEFAULT_ORDER));
            chosen
        }
    };

    let mutable = chosen
        .iter()
        .filter(|m| m.mutable)
        .map(|m| m.name.clone())
        .collect();

    let members = chosen
        .drain(..)
        .filter_map(|m| {
            let kind = m.kind?;
            tracing::trace!(type_name, member = %m.name, ?kind, "member selected");
            Some(MemberDescriptor {
                order: m.order.unwrap_or(DEFAULT_ORDER),
                name: m.name,
                kind,
                access: m.access,
            })
        })
        .collect();

    Ok(Selection {
        mode,
        members,
        mutable,
        cache_slot,
    })
}

/// Factories belong to the type, tags and caches to the instance.
fn check_placement<T>(type_name: &str, levels: &[Level<T>]) -> EquateResult<()> {
    for member in levels.iter().flat_map(|l| &l.members) {
        match (member.role, member.storage) {
            (Role::Factory, Storage::Instance) => {
                return Err(EquateError::misplaced_factory(type_name, member.name.clone()));
            }
            (Role::HashCache, Storage::Shared) => {
                return Err(EquateError::misplaced_tag(type_name, member.name.clone()));
            }
            _ => {}
        }
    }
    Ok(())
}

fn resolve_mode<T>(type_name: &str, policy: &Policy, eligible: &[MemberDef<T>]) -> EquateResult<Mode> {
    let named_inclusion = !policy.included.is_empty();
    let named_exclusion = !policy.excluded.is_empty();

    match (policy.mode, named_inclusion, named_exclusion) {
        (_, true, true)
        | (Some(Mode::Exclusion), true, false)
        | (Some(Mode::Inclusion), false, true) => Err(EquateError::ambiguous(type_name)),
        (Some(mode), _, _) => Ok(mode),
        (None, true, false) => Ok(Mode::Inclusion),
        (None, false, true) => Ok(Mode::Exclusion),
        (None, false, false) => {
            let marked_in = eligible.iter().any(|m| m.included);
            let marked_out = eligible.iter().any(|m| m.excluded);
            match (marked_in, marked_out) {
                (true, true) => Err(EquateError::ambiguous(type_name)),
                (true, false) => Ok(Mode::Inclusion),
                _ => Ok(Mode::Exclusion),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::HashCache;
    use crate::layout::Reflect;

    struct Root {
        r: i32,
    }

    struct Middle {
        root: Root,
        m: i32,
    }

    struct Leaf {
        middle: Middle,
        l: i32,
        scratch: i32,
        hash: HashCache,
    }

    impl Reflect for Root {
        fn layout() -> Layout<Self> {
            Layout::new().member(MemberDef::scalar("r", |v: &Root| v.r))
        }
    }

    impl Reflect for Middle {
        fn layout() -> Layout<Self> {
            Layout::new()
                .member(MemberDef::scalar("m", |v: &Middle| v.m))
                .parent(Root::layout(), |v: &Middle| &v.root)
        }
    }

    impl Reflect for Leaf {
        fn layout() -> Layout<Self> {
            Layout::new()
                .member(MemberDef::scalar("l", |v: &Leaf| v.l))
                .member(MemberDef::scalar("scratch", |v: &Leaf| v.scratch).transient())
                .member(MemberDef::hash_cache("hash", |v: &Leaf| &v.hash))
                .parent(Middle::layout(), |v: &Leaf| &v.middle)
        }
    }

    fn names<T>(selection: &Selection<T>) -> Vec<&str> {
        selection.members.iter().map(|m| m.name.as_ref()).collect()
    }

    fn select_leaf(policy: Policy) -> EquateResult<Selection<Leaf>> {
        select(Leaf::layout(), &policy)
    }

    #[test]
    fn exclusion_mode_walks_outermost_ancestor_first() {
        let selection = select_leaf(Policy::default()).unwrap();
        assert_eq!(selection.mode, Mode::Exclusion);
        assert_eq!(names(&selection), ["r", "m", "l"]);
        assert!(selection.cache_slot.is_some());
    }

    #[test]
    fn boundary_stops_at_the_named_level() {
        let selection = select_leaf(Policy {
            boundary: Some(Boundary::Type {
                id: TypeId::of::<Middle>(),
                name: "Middle",
            }),
            ..Policy::default()
        })
        .unwrap();
        assert_eq!(names(&selection), ["m", "l"]);

        let own_only = select_leaf(Policy {
            boundary: Some(Boundary::Named("Leaf".into())),
            ..Policy::default()
        })
        .unwrap();
        assert_eq!(names(&own_only), ["l"]);
    }

    #[test]
    fn unknown_boundary_is_rejected() {
        let err = select_leaf(Policy {
            boundary: Some(Boundary::Named("Elsewhere".into())),
            ..Policy::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, EquateError::UnknownBoundary { .. }));
    }

    #[test]
    fn names_above_the_boundary_do_not_resolve() {
        let err = select_leaf(Policy {
            boundary: Some(Boundary::Named("Middle".into())),
            excluded: vec!["r".into()],
            ..Policy::default()
        })
        .err()
        .unwrap();
        assert_eq!(err, EquateError::unknown_member(std::any::type_name::<Leaf>(), "r"));
    }

    #[test]
    fn transient_members_need_opt_in() {
        let err = select_leaf(Policy {
            included: vec!["scratch".into()],
            ..Policy::default()
        })
        .err()
        .unwrap();
        assert!(matches!(err, EquateError::UnknownMember { .. }));

        let selection = select_leaf(Policy {
            include_transient: true,
            ..Policy::default()
        })
        .unwrap();
        assert_eq!(names(&selection), ["r", "m", "l", "scratch"]);
    }

    #[test]
    fn named_inclusion_keeps_encounter_order_on_equal_keys() {
        let selection = select_leaf(Policy {
            included: vec!["l".into(), "r".into()],
            ..Policy::default()
        })
        .unwrap();
        assert_eq!(selection.mode, Mode::Inclusion);
        assert_eq!(names(&selection), ["r", "l"]);
    }

    #[test]
    fn named_exclusion_removes_members() {
        let selection = select_leaf(Policy {
            excluded: vec!["m".into()],
            ..Policy::default()
        })
        .unwrap();
        assert_eq!(names(&selection), ["r", "l"]);
    }

    #[test]
    fn conflicting_lists_are_ambiguous() {
        let both = select_leaf(Policy {
            included: vec!["l".into()],
            excluded: vec!["m".into()],
            ..Policy::default()
        });
        assert!(matches!(both, Err(EquateError::AmbiguousMode { .. })));

        let against_mode = select_leaf(Policy {
            mode: Some(Mode::Exclusion),
            included: vec!["l".into()],
            ..Policy::default()
        });
        assert!(matches!(against_mode, Err(EquateError::AmbiguousMode { .. })));
    }

    struct Marked {
        first: i32,
        second: i32,
        third: i32,
        fourth: i32,
        last: i32,
        ignored: i32,
    }

    impl Reflect for Marked {
        fn layout() -> Layout<Self> {
            Layout::new()
                .member(MemberDef::scalar("third", |v: &Marked| v.third).order(30))
                .member(MemberDef::scalar("fourth", |v: &Marked| v.fourth).include())
                .member(MemberDef::scalar("first", |v: &Marked| v.first).order(10))
                .member(MemberDef::scalar("last", |v: &Marked| v.last).order(1010))
                .member(MemberDef::scalar("second", |v: &Marked| v.second).order(20).exclude())
                .member(MemberDef::scalar("ignored", |v: &Marked| v.ignored).exclude())
        }
    }

    #[test]
    fn mixed_markers_without_a_mode_are_ambiguous() {
        let result = select(Marked::layout(), &Policy::default());
        assert!(matches!(result, Err(EquateError::AmbiguousMode { .. })));
    }

    #[test]
    fn inclusion_mode_orders_by_key_and_ignores_exclude_markers() {
        let selection = select(
            Marked::layout(),
            &Policy {
                mode: Some(Mode::Inclusion),
                ..Policy::default()
            },
        )
        .unwrap();
        assert_eq!(names(&selection), ["first", "second", "third", "fourth", "last"]);
        assert_eq!(selection.members[3].order, DEFAULT_ORDER);
    }

    #[test]
    fn exclusion_mode_ignores_include_markers() {
        let selection = select(
            Marked::layout(),
            &Policy {
                mode: Some(Mode::Exclusion),
                ..Policy::default()
            },
        )
        .unwrap();
        assert_eq!(names(&selection), ["third", "fourth", "first", "last"]);
    }

    struct Misplaced {
        n: i32,
    }

    static SHARED_CACHE: HashCache = HashCache::new();

    #[test]
    fn instance_factory_members_are_misplaced() {
        let layout = Layout::new()
            .member(MemberDef::scalar("n", |v: &Misplaced| v.n))
            .member(MemberDef::factory("eq"));
        let result = select(layout, &Policy::default());
        assert!(matches!(result, Err(EquateError::MisplacedFactory { .. })));

        let shared = Layout::new()
            .member(MemberDef::scalar("n", |v: &Misplaced| v.n))
            .member(MemberDef::factory("EQ").shared());
        assert_eq!(names(&select(shared, &Policy::default()).unwrap()), ["n"]);
    }

    #[test]
    fn shared_hash_caches_are_misplaced() {
        let layout = Layout::new()
            .member(MemberDef::scalar("n", |v: &Misplaced| v.n))
            .member(MemberDef::hash_cache("CACHE", |_: &Misplaced| &SHARED_CACHE).shared());
        let result = select(layout, &Policy::default());
        assert_eq!(
            result.err(),
            Some(EquateError::misplaced_tag(std::any::type_name::<Misplaced>(), "CACHE"))
        );
    }

    struct Child {
        leaf: Leaf,
        c: i32,
    }

    impl Reflect for Child {
        fn layout() -> Layout<Self> {
            Layout::new()
                .member(MemberDef::scalar("c", |v: &Child| v.c))
                .parent(Leaf::layout(), |v: &Child| &v.leaf)
        }
    }

    #[test]
    fn cache_slot_comes_from_the_own_level_only() {
        let selection = select(Child::layout(), &Policy::default()).unwrap();
        assert_eq!(names(&selection), ["r", "m", "l", "c"]);
        assert!(selection.cache_slot.is_none());
    }

    #[test]
    fn mutable_selected_members_are_reported() {
        let layout = Layout::new()
            .member(MemberDef::scalar("n", |v: &Misplaced| v.n).mutable());
        let selection = select(layout, &Policy::default()).unwrap();
        assert_eq!(selection.mutable, ["n"]);
    }
}
