//! State owned by one viewer session
//!
//! Only the orchestrator mutates the model, and only on the control thread.

use super::copy::CopyBuffer;
use super::finder::Finder;
use super::state::LifecycleState;
use crate::browser::{Browser, BrowserKind};
use crate::loader::{Loader, LoaderContext, LoaderId};
use crate::model::{DataObject, NodeId, ObjectId, ObjectKey, Thumbnail};
use crate::service::Scope;
use moka::sync::Cache;
use std::collections::BTreeMap;
use std::time::Duration;

/// Kind of change reported to `TreeViewer::on_data_object_save`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOperation {
    /// Created under `parent` (or at the top level)
    Create { parent: Option<ObjectKey> },
    Update,
    Remove,
}

/// The loader in the single pending slot and where its result goes
#[derive(Debug)]
pub struct PendingLoad {
    pub loader: Loader,
    /// Browser the result is routed to; `None` fans out to all
    pub browser: Option<BrowserKind>,
    pub node: Option<NodeId>,
}

pub struct TreeViewerModel {
    state: LifecycleState,
    browsers: BTreeMap<BrowserKind, Box<dyn Browser>>,
    selected: Option<BrowserKind>,
    pending: Option<PendingLoad>,
    copy_buffer: Option<CopyBuffer>,
    rendering_source: Option<ObjectId>,
    scope: Scope,
    context: LoaderContext,
    thumbnails: Cache<ObjectId, Thumbnail>,
    finder: Finder,
}

impl TreeViewerModel {
    #[must_use]
    pub fn new(
        browsers: Vec<Box<dyn Browser>>,
        scope: Scope,
        context: LoaderContext,
        cache_capacity: u64,
        cache_ttl: Duration,
    ) -> Self {
        let thumbnails = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(cache_capacity)
            .build();

        Self {
            state: LifecycleState::New,
            browsers: browsers
                .into_iter()
                .map(|browser| (browser.browser_type(), browser))
                .collect(),
            selected: None,
            pending: None,
            copy_buffer: None,
            rendering_source: None,
            scope,
            context,
            thumbnails,
            finder: Finder::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Set the state, returning the previous one
    pub fn set_state(&mut self, state: LifecycleState) -> LifecycleState {
        std::mem::replace(&mut self.state, state)
    }

    #[must_use]
    pub fn browser(&self, kind: BrowserKind) -> Option<&dyn Browser> {
        self.browsers.get(&kind).map(AsRef::as_ref)
    }

    pub fn browser_mut(&mut self, kind: BrowserKind) -> Option<&mut (dyn Browser + 'static)> {
        self.browsers.get_mut(&kind).map(AsMut::as_mut)
    }

    pub fn browsers(&self) -> impl Iterator<Item = &dyn Browser> {
        self.browsers.values().map(AsRef::as_ref)
    }

    pub fn browsers_mut(&mut self) -> impl Iterator<Item = &mut (dyn Browser + 'static)> {
        self.browsers.values_mut().map(AsMut::as_mut)
    }

    #[must_use]
    pub fn browser_kinds(&self) -> Vec<BrowserKind> {
        self.browsers.keys().copied().collect()
    }

    #[must_use]
    pub const fn selected_browser(&self) -> Option<BrowserKind> {
        self.selected
    }

    pub fn set_selected_browser(&mut self, kind: Option<BrowserKind>) -> Option<BrowserKind> {
        std::mem::replace(&mut self.selected, kind)
    }

    /// Put a loader in the pending slot; refuses if the slot is taken
    pub fn attach(&mut self, pending: PendingLoad) -> Result<(), PendingLoad> {
        if self.pending.is_some() {
            return Err(pending);
        }
        self.pending = Some(pending);
        Ok(())
    }

    pub fn pending_mut(&mut self) -> Option<&mut PendingLoad> {
        self.pending.as_mut()
    }

    #[must_use]
    pub fn pending_id(&self) -> Option<LoaderId> {
        self.pending.as_ref().map(|p| p.loader.id())
    }

    /// Object saved by the pending loader, if it is a save
    #[must_use]
    pub fn pending_subject(&self) -> Option<ObjectKey> {
        self.pending.as_ref().and_then(|p| p.loader.subject())
    }

    /// Take the pending load if it is the one identified by `id`
    pub fn take_pending(&mut self, id: LoaderId) -> Option<PendingLoad> {
        if self.pending_id() == Some(id) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Cancel and clear the pending load
    pub fn cancel_pending(&mut self) -> Option<LoaderId> {
        let pending = self.pending.take()?;
        pending.loader.cancel();
        Some(pending.loader.id())
    }

    #[must_use]
    pub const fn copy_buffer(&self) -> Option<&CopyBuffer> {
        self.copy_buffer.as_ref()
    }

    pub fn set_copy_buffer(&mut self, buffer: Option<CopyBuffer>) -> Option<CopyBuffer> {
        std::mem::replace(&mut self.copy_buffer, buffer)
    }

    #[must_use]
    pub const fn rendering_source(&self) -> Option<ObjectId> {
        self.rendering_source
    }

    pub fn set_rendering_source(&mut self, source: Option<ObjectId>) {
        self.rendering_source = source;
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.scope
    }

    pub fn set_scope(&mut self, scope: Scope) {
        self.scope = scope;
    }

    #[must_use]
    pub const fn context(&self) -> &LoaderContext {
        &self.context
    }

    #[must_use]
    pub fn cached_thumbnail(&self, image: ObjectId) -> Option<Thumbnail> {
        self.thumbnails.get(&image)
    }

    pub fn cache_thumbnails(&self, thumbnails: &[Thumbnail]) {
        for thumbnail in thumbnails {
            self.thumbnails.insert(thumbnail.image, thumbnail.clone());
        }
    }

    pub fn invalidate_thumbnails(&self, images: &[ObjectId]) {
        for image in images {
            self.thumbnails.invalidate(image);
        }
    }

    #[must_use]
    pub const fn finder(&self) -> &Finder {
        &self.finder
    }

    pub fn finder_mut(&mut self) -> &mut Finder {
        &mut self.finder
    }

    /// Drop search results that refer to removed objects
    pub fn forget_objects(&mut self, keys: &[ObjectKey]) {
        let kept: Vec<DataObject> = self
            .finder
            .results()
            .iter()
            .filter(|object| !keys.contains(&object.key()))
            .cloned()
            .collect();
        self.finder.set_results(kept);

        let hit = self
            .copy_buffer
            .as_ref()
            .is_some_and(|buffer| buffer.keys().iter().any(|key| keys.contains(key)));
        if hit {
            self.copy_buffer = None;
        }
    }

    /// Tear everything down; the state becomes `Discarded`
    pub fn discard(&mut self) -> LifecycleState {
        self.cancel_pending();
        for browser in self.browsers.values_mut() {
            browser.cancel();
            browser.discard();
        }
        self.selected = None;
        self.copy_buffer = None;
        self.rendering_source = None;
        self.finder = Finder::new();
        self.thumbnails.invalidate_all();
        self.set_state(LifecycleState::Discarded)
    }
}
