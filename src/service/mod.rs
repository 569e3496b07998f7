//! Data service abstraction
//!
//! The viewer never talks to the remote server directly. Every asynchronous
//! unit of work a loader performs goes through `DataService`, which keeps the
//! wire protocol out of the core and lets tests run against `MemoryService`.
//!
//! # Architecture
//!
//! ```text
//! TreeViewer ──dispatch──► Loader ──(worker thread)──► DataService
//!     ▲                                                    │
//!     └────────────── LoaderMessage (channel) ◄────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod types;

pub use error::{Result, ServiceError};
pub use memory::MemoryService;
pub use types::{DeleteDescriptor, RootQuery, Scope, TransferRequest};

use crate::model::{DataObject, ObjectId, ObjectKey, Thumbnail};

/// Remote operations a loader can perform
///
/// Implementations are called from worker threads and must be thread safe.
pub trait DataService: Send + Sync {
    /// Load the top level objects of a browser
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot answer the query.
    fn load_roots(&self, query: &RootQuery) -> Result<Vec<DataObject>>;

    /// Load the direct children of a container
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the parent does not exist.
    fn load_children(&self, parent: ObjectKey, scope: Scope) -> Result<Vec<DataObject>>;

    /// Create an object, optionally linked under `parent`
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is missing or cannot hold the object.
    fn create(&self, object: DataObject, parent: Option<ObjectKey>) -> Result<DataObject>;

    /// Replace the stored fields of an existing object
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the object does not exist.
    fn update(&self, object: DataObject) -> Result<DataObject>;

    /// Remove a single object, leaving its children orphaned
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if the object does not exist.
    fn remove(&self, object: ObjectKey) -> Result<()>;

    /// Apply the links and unlinks of a paste atomically
    ///
    /// # Errors
    ///
    /// Returns an error if any object is missing or any link is incompatible;
    /// nothing is changed in that case.
    fn transfer(&self, request: &TransferRequest) -> Result<()>;

    /// Delete a batch of objects, returning every key that was deleted
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if any target is missing; nothing is
    /// deleted in that case.
    fn delete(&self, batch: &[DeleteDescriptor]) -> Result<Vec<ObjectKey>>;

    /// Fetch thumbnails for images
    ///
    /// # Errors
    ///
    /// Returns an error if any id is not a known image.
    fn thumbnails(&self, images: &[ObjectId]) -> Result<Vec<Thumbnail>>;

    /// Apply the rendering settings of `source` to the images in `targets`
    ///
    /// # Errors
    ///
    /// Returns an error if the source or a target is missing or unsuitable.
    fn paste_rendering_settings(
        &self,
        source: ObjectId,
        targets: &[ObjectKey],
    ) -> Result<Vec<ObjectId>>;

    /// Restore default rendering settings for the images in `targets`
    ///
    /// # Errors
    ///
    /// Returns an error if a target is missing or unsuitable.
    fn reset_rendering_settings(&self, targets: &[ObjectKey]) -> Result<Vec<ObjectId>>;
}
