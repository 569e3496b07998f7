//! Tagged loader work and result payloads

use crate::model::{DataObject, ObjectId, ObjectKey, Thumbnail};
use crate::service::{DataService, DeleteDescriptor, Result, RootQuery, Scope, TransferRequest};
use std::fmt;

/// The asynchronous operation a loader performs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Top level of a browser
    Roots(RootQuery),

    /// Children of one container
    Children { parent: ObjectKey, scope: Scope },

    Create {
        object: DataObject,
        parent: Option<ObjectKey>,
    },

    Update(DataObject),

    Remove(DataObject),

    /// Combined link/unlink of a paste
    Transfer(TransferRequest),

    Delete(Vec<DeleteDescriptor>),

    Thumbnails(Vec<ObjectId>),

    PasteSettings {
        source: ObjectId,
        targets: Vec<ObjectKey>,
    },

    ResetSettings(Vec<ObjectKey>),
}

/// Discriminant of a `LoadRequest`, used in logs and by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadKind {
    Roots,
    Children,
    Create,
    Update,
    Remove,
    Transfer,
    Delete,
    Thumbnails,
    PasteSettings,
    ResetSettings,
}

impl fmt::Display for LoadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Roots => "roots",
            Self::Children => "children",
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Transfer => "transfer",
            Self::Delete => "delete",
            Self::Thumbnails => "thumbnails",
            Self::PasteSettings => "paste-settings",
            Self::ResetSettings => "reset-settings",
        };
        f.write_str(name)
    }
}

/// Successful result of a loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Roots(Vec<DataObject>),
    Children {
        parent: ObjectKey,
        children: Vec<DataObject>,
    },
    Created {
        object: DataObject,
        parent: Option<ObjectKey>,
    },
    Updated(DataObject),
    Removed(DataObject),
    Transferred(TransferRequest),
    Deleted(Vec<ObjectKey>),
    Thumbnails(Vec<Thumbnail>),
    /// Images whose rendering settings were pasted or reset
    SettingsApplied(Vec<ObjectId>),
}

impl LoadRequest {
    #[must_use]
    pub const fn kind(&self) -> LoadKind {
        match self {
            Self::Roots(_) => LoadKind::Roots,
            Self::Children { .. } => LoadKind::Children,
            Self::Create { .. } => LoadKind::Create,
            Self::Update(_) => LoadKind::Update,
            Self::Remove(_) => LoadKind::Remove,
            Self::Transfer(_) => LoadKind::Transfer,
            Self::Delete(_) => LoadKind::Delete,
            Self::Thumbnails(_) => LoadKind::Thumbnails,
            Self::PasteSettings { .. } => LoadKind::PasteSettings,
            Self::ResetSettings(_) => LoadKind::ResetSettings,
        }
    }

    /// Object a create, update or remove request saves
    #[must_use]
    pub fn subject(&self) -> Option<ObjectKey> {
        match self {
            Self::Create { object, .. } | Self::Update(object) | Self::Remove(object) => {
                Some(object.key())
            }
            _ => None,
        }
    }

    /// Whether the request changes server-side data
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(
            self,
            Self::Roots(_) | Self::Children { .. } | Self::Thumbnails(_)
        )
    }

    /// Run the request against a data service
    ///
    /// # Errors
    ///
    /// Propagates the service error unchanged.
    pub fn execute(self, service: &dyn DataService) -> Result<LoadOutcome> {
        match self {
            Self::Roots(query) => service.load_roots(&query).map(LoadOutcome::Roots),
            Self::Children { parent, scope } => service
                .load_children(parent, scope)
                .map(|children| LoadOutcome::Children { parent, children }),
            Self::Create { object, parent } => service
                .create(object, parent)
                .map(|object| LoadOutcome::Created { object, parent }),
            Self::Update(object) => service.update(object).map(LoadOutcome::Updated),
            Self::Remove(object) => service
                .remove(object.key())
                .map(|()| LoadOutcome::Removed(object)),
            Self::Transfer(request) => service
                .transfer(&request)
                .map(|()| LoadOutcome::Transferred(request)),
            Self::Delete(batch) => service.delete(&batch).map(LoadOutcome::Deleted),
            Self::Thumbnails(images) => service.thumbnails(&images).map(LoadOutcome::Thumbnails),
            Self::PasteSettings { source, targets } => service
                .paste_rendering_settings(source, &targets)
                .map(LoadOutcome::SettingsApplied),
            Self::ResetSettings(targets) => service
                .reset_rendering_settings(&targets)
                .map(LoadOutcome::SettingsApplied),
        }
    }
}
