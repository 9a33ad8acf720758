//! Configuration error model.

use thiserror::Error;

/// Result type used by every builder in this crate.
pub type EquateResult<T> = Result<T, EquateError>;

/// Configuration/programming error detected while building a [`Factory`].
///
/// Every variant is raised eagerly, at build time. Evaluating equality or a
/// hash on a built factory never fails.
///
/// [`Factory`]: crate::Factory
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EquateError {
    /// An included/excluded name does not resolve to an eligible member.
    #[error("{type_name}: no eligible member named `{member}`")]
    UnknownMember { type_name: String, member: String },

    /// The requested ancestor boundary is not part of the type's hierarchy.
    #[error("{type_name}: `{boundary}` is not an ancestor level")]
    UnknownBoundary { type_name: String, boundary: String },

    /// Inclusion and exclusion rules are both in play and no mode was chosen.
    #[error("{type_name}: cannot tell inclusion mode from exclusion mode")]
    AmbiguousMode { type_name: String },

    /// A factory lives at instance scope (or is rebuilt for every instance).
    #[error("{type_name}: factory `{site}` must be held in type-level storage")]
    MisplacedFactory { type_name: String, site: String },

    /// A tag or hash cache lives in type-level storage.
    #[error("{type_name}: `{member}` must be held per instance")]
    MisplacedTag { type_name: String, member: String },

    /// The explicit builder finished without any registered member.
    #[error("{type_name}: no members registered")]
    NoMembers { type_name: String },

    /// An explicit accessor captures state instead of reading its argument.
    #[error("{type_name}: accessor for `{member}` captures its environment")]
    CapturingAccessor { type_name: String, member: String },

    /// The explicit builder saw the same member name twice.
    #[error("{type_name}: member `{member}` registered twice")]
    DuplicateMember { type_name: String, member: String },

    /// Hash caching was requested but the type declares no cache slot.
    #[error("{type_name}: hash caching requires a HashCache member")]
    MissingCacheSlot { type_name: String },

    /// Hash caching was requested while a contributing member is mutable.
    #[error("{type_name}: cannot cache hash, `{member}` is mutable")]
    MutableMember { type_name: String, member: String },

    /// A configuration document could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl EquateError {
    pub fn unknown_member(type_name: &str, member: impl Into<String>) -> Self {
        Self::UnknownMember {
            type_name: type_name.to_string(),
            member: member.into(),
        }
    }

    pub fn unknown_boundary(type_name: &str, boundary: impl Into<String>) -> Self {
        Self::UnknownBoundary {
            type_name: type_name.to_string(),
            boundary: boundary.into(),
        }
    }

    pub fn ambiguous(type_name: &str) -> Self {
        Self::AmbiguousMode {
            type_name: type_name.to_string(),
        }
    }

    pub fn misplaced_factory(type_name: &str, site: impl Into<String>) -> Self {
        Self::MisplacedFactory {
            type_name: type_name.to_string(),
            site: site.into(),
        }
    }

    pub fn misplaced_tag(type_name: &str, member: impl Into<String>) -> Self {
        Self::MisplacedTag {
            type_name: type_name.to_string(),
            member: member.into(),
        }
    }

    pub fn no_members(type_name: &str) -> Self {
        Self::NoMembers {
            type_name: type_name.to_string(),
        }
    }

    pub fn capturing(type_name: &str, member: impl Into<String>) -> Self {
        Self::CapturingAccessor {
            type_name: type_name.to_string(),
            member: member.into(),
        }
    }

    pub fn duplicate(type_name: &str, member: impl Into<String>) -> Self {
        Self::DuplicateMember {
            type_name: type_name.to_string(),
            member: member.into(),
        }
    }

    pub fn missing_cache_slot(type_name: &str) -> Self {
        Self::MissingCacheSlot {
            type_name: type_name.to_string(),
        }
    }

    pub fn mutable_member(type_name: &str, member: impl Into<String>) -> Self {
        Self::MutableMember {
            type_name: type_name.to_string(),
            member: member.into(),
        }
    }
}

impl From<serde_json::Error> for EquateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
