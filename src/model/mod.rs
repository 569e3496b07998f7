//! Domain model: remote object types and the arena tree the browsers use

pub mod tree;
pub mod types;

pub use tree::{NodeId, Tree, TreeNode, TreeVisitor};
pub use types::{
    AnnotationKind, DataKind, DataObject, GroupId, ObjectId, ObjectKey, Thumbnail, UserId,
};
