//! In-memory data service
//!
//! Holds objects and parent → child links behind a mutex. Used by the tests
//! and by the CLI shell; can be seeded from a JSON fixture.

use super::error::{Result, ServiceError};
use super::types::{DeleteDescriptor, RootQuery, Scope, TransferRequest};
use super::DataService;
use crate::model::{
    AnnotationKind, DataKind, DataObject, GroupId, ObjectId, ObjectKey, Thumbnail, UserId,
};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Store {
    objects: BTreeMap<ObjectKey, DataObject>,
    /// Parent → ordered children
    links: BTreeMap<ObjectKey, Vec<ObjectKey>>,
    /// Image → image whose rendering settings it uses (absent = defaults)
    rendering: BTreeMap<ObjectId, ObjectId>,
    /// Message for the next call to fail with
    failure: Option<String>,
    calls: usize,
}

impl Store {
    fn begin(&mut self) -> Result<()> {
        self.calls += 1;
        match self.failure.take() {
            Some(message) => Err(ServiceError::Unavailable(message)),
            None => Ok(()),
        }
    }

    fn require(&self, key: ObjectKey) -> Result<&DataObject> {
        self.objects.get(&key).ok_or(ServiceError::NotFound(key))
    }

    fn has_parent(&self, key: ObjectKey) -> bool {
        self.links.values().any(|children| children.contains(&key))
    }

    fn with_count(&self, object: &DataObject) -> DataObject {
        let mut out = object.clone();
        out.child_count = self.links.get(&object.key()).map_or(0, Vec::len);
        out
    }

    fn link(&mut self, parent: ObjectKey, child: ObjectKey) {
        let children = self.links.entry(parent).or_default();
        if !children.contains(&child) {
            children.push(child);
        }
    }

    fn unlink(&mut self, parent: ObjectKey, child: ObjectKey) {
        if let Some(children) = self.links.get_mut(&parent) {
            children.retain(|c| *c != child);
        }
    }

    fn next_id(&self, kind: DataKind) -> ObjectId {
        let max = self
            .objects
            .keys()
            .filter(|key| key.kind == kind)
            .map(|key| key.id.0)
            .max()
            .unwrap_or(0);
        ObjectId(max + 1)
    }

    fn descendants(&self, key: ObjectKey, out: &mut BTreeSet<ObjectKey>) {
        if let Some(children) = self.links.get(&key) {
            for child in children {
                if out.insert(*child) {
                    self.descendants(*child, out);
                }
            }
        }
    }

    /// Images addressed by a rendering settings target
    fn images_of(&self, target: ObjectKey) -> Result<Vec<ObjectId>> {
        self.require(target)?;
        match target.kind {
            DataKind::Image => Ok(vec![target.id]),
            DataKind::Dataset => Ok(self
                .links
                .get(&target)
                .into_iter()
                .flatten()
                .filter(|child| child.kind == DataKind::Image)
                .map(|child| child.id)
                .collect()),
            other => Err(ServiceError::InvalidData(format!(
                "rendering settings cannot be applied to a {other}"
            ))),
        }
    }
}

/// Thread-safe in-memory implementation of `DataService`
#[derive(Debug, Default)]
pub struct MemoryService {
    store: Mutex<Store>,
}

#[derive(Deserialize)]
struct FixtureEntry {
    #[serde(flatten)]
    object: DataObject,
    #[serde(default)]
    parent: Option<ObjectKey>,
}

impl MemoryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a service from a JSON array of objects with optional `parent`
    ///
    /// ```
    /// # use treeviewer::service::MemoryService;
    /// let json = r#"[
    ///     {"id": 1, "kind": "project", "name": "P"},
    ///     {"id": 1, "kind": "dataset", "name": "D", "parent": {"kind": "project", "id": 1}}
    /// ]"#;
    /// let service = MemoryService::from_json(json).unwrap();
    /// assert_eq!(service.object_count(), 2);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::InvalidData` if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<FixtureEntry> = serde_json::from_str(json)
            .map_err(|e| ServiceError::InvalidData(format!("invalid fixture: {e}")))?;
        let service = Self::new();
        for entry in entries {
            service.insert(entry.object, entry.parent);
        }
        Ok(service)
    }

    /// Seeded hierarchy covering every browser kind
    #[must_use]
    pub fn sample() -> Self {
        let alice = UserId(1);
        let bob = UserId(2);
        let lab = GroupId(1);
        let service = Self::new();
        let own = |object: DataObject, owner: UserId| object.with_owner(owner).with_group(lab);

        let survey = ObjectKey::new(DataKind::Project, 1);
        let liver = ObjectKey::new(DataKind::Dataset, 1);
        let kidney = ObjectKey::new(DataKind::Dataset, 2);
        let unsorted = ObjectKey::new(DataKind::Dataset, 3);
        let archive = ObjectKey::new(DataKind::Project, 2);
        let old_scans = ObjectKey::new(DataKind::Dataset, 4);
        let panel = ObjectKey::new(DataKind::Screen, 1);
        let review = ObjectKey::new(DataKind::TagSet, 1);
        let imaging = ObjectKey::new(DataKind::Group, 1);

        service.insert(own(DataObject::new(DataKind::Project, 1, "Tissue survey"), alice), None);
        service.insert(
            own(DataObject::new(DataKind::Dataset, 1, "Liver"), alice)
                .with_annotations(vec![AnnotationKind::Comment]),
            Some(survey),
        );
        service.insert(
            own(DataObject::new(DataKind::Image, 1, "liver-01.tif"), alice)
                .with_annotations(vec![AnnotationKind::Tag, AnnotationKind::Rating]),
            Some(liver),
        );
        service.insert(own(DataObject::new(DataKind::Image, 2, "liver-02.tif"), alice), Some(liver));
        service.insert(own(DataObject::new(DataKind::Dataset, 2, "Kidney"), alice), Some(survey));
        service.insert(own(DataObject::new(DataKind::Image, 3, "kidney-01.tif"), alice), Some(kidney));
        service.insert(own(DataObject::new(DataKind::Dataset, 3, "Unsorted"), alice), None);
        service.insert(own(DataObject::new(DataKind::Image, 4, "scratch.tif"), alice), Some(unsorted));

        service.insert(own(DataObject::new(DataKind::Project, 2, "Archive"), bob), None);
        service.insert(own(DataObject::new(DataKind::Dataset, 4, "Old scans"), bob), Some(archive));
        service.insert(own(DataObject::new(DataKind::Image, 5, "scan-1998.tif"), bob), Some(old_scans));

        service.insert(own(DataObject::new(DataKind::Screen, 1, "Drug panel"), alice), None);
        service.insert(own(DataObject::new(DataKind::Plate, 1, "Plate 1"), alice), Some(panel));
        service.insert(own(DataObject::new(DataKind::Plate, 2, "Plate 2"), alice), Some(panel));

        service.insert(own(DataObject::new(DataKind::TagSet, 1, "Review"), alice), None);
        service.insert(own(DataObject::new(DataKind::Tag, 1, "approved"), alice), Some(review));
        service.insert(own(DataObject::new(DataKind::Tag, 2, "rejected"), alice), Some(review));
        service.insert(own(DataObject::new(DataKind::Tag, 3, "follow-up"), alice), None);

        service.insert(own(DataObject::new(DataKind::File, 1, "protocol.pdf"), alice), None);

        service.insert(DataObject::new(DataKind::Group, 1, "Imaging lab"), None);
        service.insert(DataObject::new(DataKind::Experimenter, 1, "alice"), Some(imaging));
        service.insert(DataObject::new(DataKind::Experimenter, 2, "bob"), Some(imaging));

        service
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an object (and its link to `parent`) without any validation
    pub fn insert(&self, object: DataObject, parent: Option<ObjectKey>) {
        let mut store = self.store();
        let key = object.key();
        store.objects.insert(key, object);
        if let Some(parent) = parent {
            store.link(parent, key);
        }
    }

    /// Make the next service call fail with `ServiceError::Unavailable`
    pub fn fail_next(&self, message: impl Into<String>) {
        self.store().failure = Some(message.into());
    }

    #[must_use]
    pub fn object(&self, key: ObjectKey) -> Option<DataObject> {
        let store = self.store();
        store.objects.get(&key).map(|object| store.with_count(object))
    }

    #[must_use]
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.store().objects.contains_key(&key)
    }

    #[must_use]
    pub fn children_of(&self, parent: ObjectKey) -> Vec<ObjectKey> {
        self.store().links.get(&parent).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn parents_of(&self, child: ObjectKey) -> Vec<ObjectKey> {
        self.store()
            .links
            .iter()
            .filter(|(_, children)| children.contains(&child))
            .map(|(parent, _)| *parent)
            .collect()
    }

    /// Image whose settings `image` currently uses, if not the defaults
    #[must_use]
    pub fn rendering_source(&self, image: ObjectId) -> Option<ObjectId> {
        self.store().rendering.get(&image).copied()
    }

    #[must_use]
    pub fn object_count(&self) -> usize {
        self.store().objects.len()
    }

    /// Number of service calls made so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.store().calls
    }
}

impl DataService for MemoryService {
    fn load_roots(&self, query: &RootQuery) -> Result<Vec<DataObject>> {
        let mut store = self.store();
        store.begin()?;

        let visible = |object: &DataObject| {
            object.owner.is_none_or(|owner| owner == query.scope.user)
                && object.group.is_none_or(|group| group == query.scope.group)
        };

        Ok(store
            .objects
            .values()
            .filter(|object| query.kinds.contains(&object.kind))
            .filter(|object| visible(object))
            .filter(|object| !query.orphans_only || !store.has_parent(object.key()))
            .map(|object| store.with_count(object))
            .collect())
    }

    fn load_children(&self, parent: ObjectKey, _scope: Scope) -> Result<Vec<DataObject>> {
        let mut store = self.store();
        store.begin()?;
        store.require(parent)?;

        Ok(store
            .links
            .get(&parent)
            .into_iter()
            .flatten()
            .filter_map(|child| store.objects.get(child))
            .map(|object| store.with_count(object))
            .collect())
    }

    fn create(&self, mut object: DataObject, parent: Option<ObjectKey>) -> Result<DataObject> {
        let mut store = self.store();
        store.begin()?;

        if let Some(parent) = parent {
            let parent_kind = store.require(parent)?.kind;
            if !parent_kind.accepts(object.kind) {
                return Err(ServiceError::Incompatible {
                    parent: parent_kind,
                    child: object.kind,
                });
            }
        }

        object.id = store.next_id(object.kind);
        let key = object.key();
        store.objects.insert(key, object.clone());
        if let Some(parent) = parent {
            store.link(parent, key);
        }
        Ok(store.with_count(&object))
    }

    fn update(&self, object: DataObject) -> Result<DataObject> {
        let mut store = self.store();
        store.begin()?;
        store.require(object.key())?;

        store.objects.insert(object.key(), object.clone());
        Ok(store.with_count(&object))
    }

    fn remove(&self, object: ObjectKey) -> Result<()> {
        let mut store = self.store();
        store.begin()?;
        store.require(object)?;

        store.objects.remove(&object);
        store.links.remove(&object);
        for children in store.links.values_mut() {
            children.retain(|child| *child != object);
        }
        Ok(())
    }

    fn transfer(&self, request: &TransferRequest) -> Result<()> {
        let mut store = self.store();
        store.begin()?;

        for (target, children) in &request.links {
            let parent_kind = store.require(*target)?.kind;
            for child in children {
                store.require(child.key())?;
                if !parent_kind.accepts(child.kind) {
                    return Err(ServiceError::Incompatible {
                        parent: parent_kind,
                        child: child.kind,
                    });
                }
            }
        }
        for (parent, children) in &request.unlinks {
            store.require(*parent)?;
            for child in children {
                store.require(child.key())?;
            }
        }

        for (parent, children) in &request.unlinks {
            for child in children {
                store.unlink(*parent, child.key());
            }
        }
        for (target, children) in &request.links {
            for child in children {
                store.link(*target, child.key());
            }
        }
        Ok(())
    }

    fn delete(&self, batch: &[DeleteDescriptor]) -> Result<Vec<ObjectKey>> {
        let mut store = self.store();
        store.begin()?;

        for descriptor in batch {
            store.require(descriptor.object)?;
        }

        let mut doomed = BTreeSet::new();
        for descriptor in batch {
            doomed.insert(descriptor.object);
            if descriptor.delete_contents {
                store.descendants(descriptor.object, &mut doomed);
            }
        }

        for key in &doomed {
            store.objects.remove(key);
            store.links.remove(key);
            if key.kind == DataKind::Image {
                store.rendering.remove(&key.id);
            }
        }
        for children in store.links.values_mut() {
            children.retain(|child| !doomed.contains(child));
        }
        Ok(doomed.into_iter().collect())
    }

    fn thumbnails(&self, images: &[ObjectId]) -> Result<Vec<Thumbnail>> {
        let mut store = self.store();
        store.begin()?;

        images
            .iter()
            .map(|id| {
                let object = store.require(ObjectKey {
                    kind: DataKind::Image,
                    id: *id,
                })?;
                Ok(Thumbnail {
                    image: *id,
                    width: 96,
                    height: 96,
                    data: object.name.as_bytes().to_vec(),
                })
            })
            .collect()
    }

    fn paste_rendering_settings(
        &self,
        source: ObjectId,
        targets: &[ObjectKey],
    ) -> Result<Vec<ObjectId>> {
        let mut store = self.store();
        store.begin()?;
        store.require(ObjectKey {
            kind: DataKind::Image,
            id: source,
        })?;

        let mut images = Vec::new();
        for target in targets {
            images.extend(store.images_of(*target)?);
        }
        for image in &images {
            if *image != source {
                store.rendering.insert(*image, source);
            }
        }
        Ok(images)
    }

    fn reset_rendering_settings(&self, targets: &[ObjectKey]) -> Result<Vec<ObjectId>> {
        let mut store = self.store();
        store.begin()?;

        let mut images = Vec::new();
        for target in targets {
            images.extend(store.images_of(*target)?);
        }
        for image in &images {
            store.rendering.remove(image);
        }
        Ok(images)
    }
}
