//! Domain object types shown in the browsers
//!
//! A `DataObject` is the local image of one remote entity. Identity is the
//! pair (kind, id) carried by `ObjectKey`: ids are only unique per kind, so
//! a dataset and an image may share the same numeric id.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric id of a remote object, unique per `DataKind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub i64);

/// Id of a user (experimenter) owning objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Id of a group objects are shared in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub i64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user {}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group {}", self.0)
    }
}

/// Kind of remote object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Project,
    Dataset,
    Image,
    Screen,
    Plate,
    TagSet,
    Tag,
    File,
    Group,
    Experimenter,
}

impl DataKind {
    /// Whether objects of this kind hold children in the hierarchy
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Project | Self::Dataset | Self::Screen | Self::TagSet | Self::Group
        )
    }

    /// Whether a `child` may be linked under an object of this kind
    ///
    /// Only these parent/child pairs form valid links:
    /// project → dataset, dataset → image, screen → plate,
    /// tag set → tag, group → experimenter.
    #[must_use]
    pub const fn accepts(self, child: Self) -> bool {
        matches!(
            (self, child),
            (Self::Project, Self::Dataset)
                | (Self::Dataset, Self::Image)
                | (Self::Screen, Self::Plate)
                | (Self::TagSet, Self::Tag)
                | (Self::Group, Self::Experimenter)
        )
    }

    /// Human readable label
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Dataset => "dataset",
            Self::Image => "image",
            Self::Screen => "screen",
            Self::Plate => "plate",
            Self::TagSet => "tag set",
            Self::Tag => "tag",
            Self::File => "file",
            Self::Group => "group",
            Self::Experimenter => "experimenter",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of a remote object: its kind plus its id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: DataKind,
    pub id: ObjectId,
}

impl ObjectKey {
    #[must_use]
    pub const fn new(kind: DataKind, id: i64) -> Self {
        Self {
            kind,
            id: ObjectId(id),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Kind of annotation that can be attached to an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Tag,
    File,
    Comment,
    Rating,
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Tag => "tags",
            Self::File => "attachments",
            Self::Comment => "comments",
            Self::Rating => "ratings",
        };
        f.write_str(label)
    }
}

/// Local image of a remote domain object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataObject {
    pub id: ObjectId,
    pub kind: DataKind,
    pub name: String,

    /// Owner of the object; `None` for system objects such as groups
    #[serde(default)]
    pub owner: Option<UserId>,

    #[serde(default)]
    pub group: Option<GroupId>,

    /// Number of children on the server, known before they are loaded
    #[serde(default)]
    pub child_count: usize,

    #[serde(default)]
    pub annotations: Vec<AnnotationKind>,
}

impl DataObject {
    /// Create an object with no owner, children or annotations
    #[must_use]
    pub fn new(kind: DataKind, id: i64, name: impl Into<String>) -> Self {
        Self {
            id: ObjectId(id),
            kind,
            name: name.into(),
            owner: None,
            group: None,
            child_count: 0,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub const fn with_group(mut self, group: GroupId) -> Self {
        self.group = Some(group);
        self
    }

    #[must_use]
    pub const fn with_child_count(mut self, count: usize) -> Self {
        self.child_count = count;
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: Vec<AnnotationKind>) -> Self {
        self.annotations = annotations;
        self
    }

    /// Identity of this object
    #[must_use]
    pub const fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind,
            id: self.id,
        }
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.id)
    }
}

/// Thumbnail bytes for an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub image: ObjectId,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}
