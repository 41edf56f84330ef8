//! Versions: time-bounded revisions of an item

use crate::{Interval, ItemUri};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a version based on UUIDv7
///
/// UUIDv7 sorts chronologically, so ids generated by the ingest path order
/// the same way the versions were created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionId(u128);

impl VersionId {
    /// Generate a new UUIDv7-based VersionId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a VersionId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a VersionId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid UUID string: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Lifecycle state of a version (and of the artifacts rendered from it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Uploaded, not yet approved for publication
    Draft,
    /// Approved and publishable
    Active,
    /// Withdrawn; never a composition candidate
    Deleted,
}

impl LifecycleState {
    /// Get the state name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Draft => "draft",
            LifecycleState::Active => "active",
            LifecycleState::Deleted => "deleted",
        }
    }

    /// Parse a state from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(LifecycleState::Draft),
            "active" => Some(LifecycleState::Active),
            "deleted" => Some(LifecycleState::Deleted),
            _ => None,
        }
    }
}

impl std::str::FromStr for LifecycleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid lifecycle state: {}", s))
    }
}

/// Kind of reference from one version to another item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Embed the currently valid version of the target here
    Composition,
    /// Plain hyperlink; does not participate in tree expansion
    Link,
}

impl ReferenceKind {
    /// Get the kind name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Composition => "composition",
            ReferenceKind::Link => "link",
        }
    }

    /// Parse a kind from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "composition" => Some(ReferenceKind::Composition),
            "link" => Some(ReferenceKind::Link),
            _ => None,
        }
    }
}

/// Reference from a version to another item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Referenced item
    pub target: ItemUri,
    /// How the item is referenced
    pub kind: ReferenceKind,
}

impl Reference {
    /// Composition reference to `target`
    pub fn composition(target: impl Into<ItemUri>) -> Self {
        Self {
            target: target.into(),
            kind: ReferenceKind::Composition,
        }
    }

    /// Link reference to `target`
    pub fn link(target: impl Into<ItemUri>) -> Self {
        Self {
            target: target.into(),
            kind: ReferenceKind::Link,
        }
    }
}

/// Opaque key of a content blob in the content source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentRef(String);

impl ContentRef {
    /// Wrap a blob key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The blob key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One time-bounded revision of an item's content
#[derive(Debug, Clone, PartialEq)]
pub struct Version {
    /// Unique identifier
    pub id: VersionId,

    /// Owning item
    pub item: ItemUri,

    /// Stable ordering among the item's versions (ascending = older)
    pub sequence: u64,

    /// Validity interval
    pub interval: Interval,

    /// Declared content type, selects the merger
    pub content_type: String,

    /// Blob holding the raw content
    pub content: ContentRef,

    /// Lifecycle state
    pub state: LifecycleState,

    /// Who approved this version, if anyone
    pub approver: Option<String>,

    /// Free-form metadata
    pub metadata: BTreeMap<String, String>,

    /// References to other items, in document order
    pub references: Vec<Reference>,
}

impl Version {
    /// Create an active version with a fresh id and no references
    pub fn new(
        item: impl Into<ItemUri>,
        sequence: u64,
        interval: Interval,
        content_type: impl Into<String>,
        content: ContentRef,
    ) -> Self {
        Self {
            id: VersionId::new(),
            item: item.into(),
            sequence,
            interval,
            content_type: content_type.into(),
            content,
            state: LifecycleState::Active,
            approver: None,
            metadata: BTreeMap::new(),
            references: Vec::new(),
        }
    }

    /// Add a reference
    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    /// Set the lifecycle state
    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    /// Composition targets in document order (duplicates kept)
    pub fn composition_targets(&self) -> impl Iterator<Item = &ItemUri> {
        self.references
            .iter()
            .filter(|r| r.kind == ReferenceKind::Composition)
            .map(|r| &r.target)
    }

    /// True if at least one composition reference exists
    pub fn has_composition(&self) -> bool {
        self.composition_targets().next().is_some()
    }

    /// True if this version composes `item`
    pub fn composes(&self, item: &ItemUri) -> bool {
        self.composition_targets().any(|t| t == item)
    }

    /// True if the version has been withdrawn
    pub fn is_deleted(&self) -> bool {
        self.state == LifecycleState::Deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn version() -> Version {
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Version::new(
            "root.json",
            1,
            Interval::starting_at(t),
            "text/plain",
            ContentRef::new("blob"),
        )
    }

    #[test]
    fn test_only_composition_references_count() {
        let v = version().with_reference(Reference::link("other.json"));
        assert!(!v.has_composition());

        let v = v.with_reference(Reference::composition("part.json"));
        assert!(v.has_composition());
        assert!(v.composes(&ItemUri::new("part.json")));
        assert!(!v.composes(&ItemUri::new("other.json")));
    }

    #[test]
    fn test_version_id_display_and_parse() {
        let id = VersionId::new();
        let parsed = VersionId::from_string(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
        assert!(VersionId::from_string("nope").is_err());
    }

    #[test]
    fn test_state_parse() {
        assert_eq!(LifecycleState::parse("ACTIVE"), Some(LifecycleState::Active));
        assert_eq!("draft".parse::<LifecycleState>(), Ok(LifecycleState::Draft));
        assert!(LifecycleState::parse("archived").is_none());
        assert_eq!(ReferenceKind::parse("link"), Some(ReferenceKind::Link));
    }
}
