//! The viewer state machine
//!
//! Every public command first checks the lifecycle state and fails fast with
//! `ViewerError::IllegalState` when the state forbids it. Commands that need
//! remote work attach a loader to the single pending slot, move to a busy
//! state and return at once; `process_pending` later applies the result on
//! the calling thread and returns to `Ready`.
//!
//! ```text
//!            activate            dispatch
//!   New ─────────────► Ready ─────────────► LoadingData / LoadingSelection
//!                        ▲                  LoadingThumbnail / Saving
//!                        └── result, failure or cancel ──┘
//!
//!   any state ── discard ──► Discarded
//! ```

use super::copy::{CommandOutcome, CopyBuffer, CopyMode, NodeRef, Rejection};
use super::delete::{DeletableObject, DeletionRequest};
use super::error::{Result, ViewerError};
use super::finder::sync_editor;
use super::model::{DataOperation, PendingLoad, TreeViewerModel};
use super::state::LifecycleState;
use crate::browser::{Browser, BrowserKind, TreeBrowser};
use crate::config::ViewerConfig;
use crate::editor::{Editor, EditorPane};
use crate::events::{EventBus, ViewerEvent};
use crate::loader::{
    Executor, LoadKind, LoadOutcome, LoadRequest, LoaderContext, LoaderId, LoaderMessage,
    RayonExecutor,
};
use crate::model::{DataKind, DataObject, GroupId, NodeId, ObjectId, ObjectKey, UserId};
use crate::service::{DataService, RootQuery, Scope};
use crate::ui::{Answer, ConfirmationPolicy, DialoguerConfirm, Notifier, StdoutNotifier};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

const READY: &[LifecycleState] = &[LifecycleState::Ready];

/// Builder for `TreeViewer`
pub struct TreeViewerBuilder {
    service: Arc<dyn DataService>,
    scope: Scope,
    executor: Option<Arc<dyn Executor>>,
    editor: Option<Box<dyn Editor>>,
    notifier: Option<Box<dyn Notifier>>,
    confirmation: Option<Box<dyn ConfirmationPolicy>>,
    config: ViewerConfig,
}

impl TreeViewerBuilder {
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = Some(executor);
        self
    }

    #[must_use]
    pub fn editor(mut self, editor: Box<dyn Editor>) -> Self {
        self.editor = Some(editor);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn confirmation(mut self, confirmation: Box<dyn ConfirmationPolicy>) -> Self {
        self.confirmation = Some(confirmation);
        self
    }

    #[must_use]
    pub fn config(mut self, config: ViewerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the viewer in the `New` state
    ///
    /// Without an explicit executor a rayon pool of
    /// `config.worker_threads` threads is started.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the pool cannot
    /// be started.
    pub fn build(self) -> Result<TreeViewer> {
        self.config.validate()?;

        let executor = match self.executor {
            Some(executor) => executor,
            None => Arc::new(RayonExecutor::new(self.config.worker_threads)?),
        };
        let (context, results) = LoaderContext::new(self.service, executor);

        let browsers: Vec<Box<dyn Browser>> = self
            .config
            .browsers
            .iter()
            .map(|kind| Box::new(TreeBrowser::new(*kind)) as Box<dyn Browser>)
            .collect();

        let model = TreeViewerModel::new(
            browsers,
            self.scope,
            context,
            self.config.thumbnail_cache_capacity,
            self.config.thumbnail_ttl(),
        );

        Ok(TreeViewer {
            model,
            results,
            editor: self.editor.unwrap_or_else(|| Box::new(EditorPane::new())),
            notifier: self
                .notifier
                .unwrap_or_else(|| Box::new(StdoutNotifier::new())),
            confirmation: self
                .confirmation
                .unwrap_or_else(|| Box::new(DialoguerConfirm::new())),
            events: EventBus::new(),
            config: self.config,
        })
    }
}

/// Orchestrator of one viewer session
pub struct TreeViewer {
    model: TreeViewerModel,
    results: Receiver<LoaderMessage>,
    editor: Box<dyn Editor>,
    notifier: Box<dyn Notifier>,
    confirmation: Box<dyn ConfirmationPolicy>,
    events: EventBus,
    config: ViewerConfig,
}

impl TreeViewer {
    /// Start building a viewer browsing `scope` through `service`
    #[must_use]
    pub fn builder(service: Arc<dyn DataService>, scope: Scope) -> TreeViewerBuilder {
        TreeViewerBuilder {
            service,
            scope,
            executor: None,
            editor: None,
            notifier: None,
            confirmation: None,
            config: ViewerConfig::default(),
        }
    }

    // ---- reads -------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.model.state()
    }

    #[must_use]
    pub const fn selected_browser(&self) -> Option<BrowserKind> {
        self.model.selected_browser()
    }

    #[must_use]
    pub fn browser(&self, kind: BrowserKind) -> Option<&dyn Browser> {
        self.model.browser(kind)
    }

    #[must_use]
    pub fn browser_kinds(&self) -> Vec<BrowserKind> {
        self.model.browser_kinds()
    }

    /// Id of the loader in the pending slot
    #[must_use]
    pub fn pending_loader(&self) -> Option<LoaderId> {
        self.model.pending_id()
    }

    #[must_use]
    pub const fn scope(&self) -> Scope {
        self.model.scope()
    }

    #[must_use]
    pub const fn config(&self) -> &ViewerConfig {
        &self.config
    }

    #[must_use]
    pub const fn copy_buffer(&self) -> Option<&CopyBuffer> {
        self.model.copy_buffer()
    }

    #[must_use]
    pub fn has_data_to_copy(&self) -> bool {
        self.model
            .copy_buffer()
            .is_some_and(|buffer| !buffer.nodes.is_empty())
    }

    /// Kind of the buffered objects, if they share one
    #[must_use]
    pub fn copy_kind(&self) -> Option<DataKind> {
        self.model.copy_buffer().and_then(CopyBuffer::kind)
    }

    #[must_use]
    pub const fn rendering_source(&self) -> Option<ObjectId> {
        self.model.rendering_source()
    }

    #[must_use]
    pub const fn is_finder_visible(&self) -> bool {
        self.model.finder().is_visible()
    }

    #[must_use]
    pub fn search_results(&self) -> &[DataObject] {
        self.model.finder().results()
    }

    pub fn subscribe(&mut self) -> Receiver<ViewerEvent> {
        self.events.subscribe()
    }

    /// Sender on the result channel, for hosts delivering results themselves
    #[must_use]
    pub fn result_sender(&self) -> Sender<LoaderMessage> {
        self.model.context().sender()
    }

    // ---- lifecycle ---------------------------------------------------

    /// Select and display the default browser and become `Ready`
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless the viewer is `New`.
    pub fn activate(&mut self) -> Result<()> {
        self.require("activate", &[LifecycleState::New])?;

        let kind = self.config.default_browser;
        let browser = self
            .model
            .browser_mut(kind)
            .ok_or(ViewerError::UnknownBrowser(kind))?;
        browser.activate();
        self.model.set_selected_browser(Some(kind));

        self.events.publish(&ViewerEvent::SelectedBrowserChanged {
            previous: None,
            current: kind,
        });
        self.events.publish(&ViewerEvent::BrowserDisplayChanged {
            kind,
            displayed: true,
        });
        self.transition(LifecycleState::Ready);
        Ok(())
    }

    /// Tear the session down; repeated calls are no-ops
    pub fn discard(&mut self) {
        if self.state() == LifecycleState::Discarded {
            return;
        }
        let cancelled = self.model.pending_id();
        let from = self.model.discard();
        self.editor.set_root_object(None, None);
        debug!(?cancelled, "Viewer discarded");
        self.publish_state(from, LifecycleState::Discarded);
    }

    /// Cancel the pending loader and every browser's own loads
    ///
    /// Safe to call repeatedly; after discard it does nothing.
    pub fn cancel(&mut self) {
        if self.state() == LifecycleState::Discarded {
            return;
        }
        if let Some(id) = self.model.cancel_pending() {
            debug!(%id, "Cancelled pending loader");
        }
        for browser in self.model.browsers_mut() {
            browser.cancel();
        }
        if self.state().is_busy() {
            self.transition(LifecycleState::Ready);
        }
    }

    // ---- browsers ----------------------------------------------------

    /// Make `kind` the working browser
    ///
    /// Unsaved editor data is saved or dropped first, as the user decides.
    /// If the browser has never been loaded its top level is fetched, also
    /// when `kind` is already selected.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, `UnknownBrowser` if `kind`
    /// is not registered, or a prompt failure.
    pub fn set_selected_browser(&mut self, kind: BrowserKind) -> Result<CommandOutcome> {
        self.require("switch browser", READY)?;
        if self.model.browser(kind).is_none() {
            return Err(ViewerError::UnknownBrowser(kind));
        }
        let previous = self.model.selected_browser();
        if previous == Some(kind) {
            if self.model.browser(kind).is_some_and(|browser| browser.roots_loaded()) {
                return Ok(CommandOutcome::Completed);
            }
            let request = LoadRequest::Roots(self.root_query(kind));
            let id = self.dispatch(request, LifecycleState::LoadingData, Some(kind), None);
            return Ok(CommandOutcome::Dispatched(id));
        }
        if !self.resolve_unsaved("Save changes before switching browser?")? {
            return Ok(self.reject("Switch browser", Rejection::Declined));
        }

        if let Some(old) = previous.and_then(|k| self.model.browser_mut(k)) {
            old.set_selected(false);
        }
        let was_displayed = self
            .model
            .browser(kind)
            .is_some_and(|browser| browser.is_displayed());
        let needs_roots = match self.model.browser_mut(kind) {
            Some(browser) => {
                browser.activate();
                !browser.roots_loaded()
            }
            None => return Err(ViewerError::UnknownBrowser(kind)),
        };
        self.model.set_selected_browser(Some(kind));
        self.model.finder_mut().clear_results();
        self.sync_selection(kind);

        debug!(?previous, current = %kind, "Selected browser changed");
        self.events.publish(&ViewerEvent::SelectedBrowserChanged {
            previous,
            current: kind,
        });
        if !was_displayed {
            self.events.publish(&ViewerEvent::BrowserDisplayChanged {
                kind,
                displayed: true,
            });
        }

        if needs_roots {
            let request = LoadRequest::Roots(self.root_query(kind));
            let id = self.dispatch(request, LifecycleState::LoadingData, Some(kind), None);
            return Ok(CommandOutcome::Dispatched(id));
        }
        Ok(CommandOutcome::Completed)
    }

    /// Toggle whether `kind` is shown, returning the new visibility
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready` or `UnknownBrowser`.
    pub fn display_browser(&mut self, kind: BrowserKind) -> Result<bool> {
        self.require("display browser", READY)?;
        let browser = self
            .model
            .browser_mut(kind)
            .ok_or(ViewerError::UnknownBrowser(kind))?;
        let displayed = !browser.is_displayed();
        browser.set_displayed(displayed);

        self.events
            .publish(&ViewerEvent::BrowserDisplayChanged { kind, displayed });
        Ok(displayed)
    }

    /// Reload the top level of the working browser
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn refresh_tree(&mut self) -> Result<CommandOutcome> {
        self.require("refresh", READY)?;
        let kind = self.working_browser()?;
        if let Some(browser) = self.model.browser_mut(kind) {
            browser.refresh_tree();
        }
        self.model.finder_mut().clear_results();

        let request = LoadRequest::Roots(self.root_query(kind));
        let id = self.dispatch(request, LifecycleState::LoadingData, Some(kind), None);
        Ok(CommandOutcome::Dispatched(id))
    }

    // ---- selection ---------------------------------------------------

    /// Select nodes in a browser and sync the editor
    ///
    /// Selecting a single container whose children are not loaded starts a
    /// `LoadingData` cycle for that node only.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, `UnknownBrowser`, or
    /// `UnknownNode` for an id missing from the browser.
    pub fn select_nodes(&mut self, kind: BrowserKind, nodes: &[NodeId]) -> Result<CommandOutcome> {
        self.require("select", READY)?;
        let browser = self
            .model
            .browser_mut(kind)
            .ok_or(ViewerError::UnknownBrowser(kind))?;
        if let Some(missing) = nodes.iter().find(|id| !browser.tree().contains(**id)) {
            return Err(ViewerError::UnknownNode {
                browser: kind,
                node: *missing,
            });
        }
        browser.set_selected_nodes(nodes);

        let lazy = match nodes {
            [single] => browser
                .node(*single)
                .filter(|node| node.object.kind.is_container() && !node.children_loaded)
                .map(|node| (*single, node.key())),
            _ => None,
        };
        self.sync_selection(kind);

        if let Some((node, parent)) = lazy {
            let request = LoadRequest::Children {
                parent,
                scope: self.model.scope(),
            };
            let id = self.dispatch(request, LifecycleState::LoadingData, Some(kind), Some(node));
            return Ok(CommandOutcome::Dispatched(id));
        }
        Ok(CommandOutcome::Completed)
    }

    /// Open `node`: select it and (re)load its contents for display
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, `UnknownBrowser` or
    /// `UnknownNode`.
    pub fn browse(&mut self, kind: BrowserKind, node: NodeId) -> Result<CommandOutcome> {
        self.require("browse", READY)?;
        let object = self.node_object(kind, node)?;
        if let Some(browser) = self.model.browser_mut(kind) {
            browser.set_selected_nodes(&[node]);
        }
        self.sync_selection(kind);

        if !object.kind.is_container() {
            return Ok(CommandOutcome::Completed);
        }
        let request = LoadRequest::Children {
            parent: object.key(),
            scope: self.model.scope(),
        };
        let id = self.dispatch(
            request,
            LifecycleState::LoadingSelection,
            Some(kind),
            Some(node),
        );
        Ok(CommandOutcome::Dispatched(id))
    }

    /// Lazily load a node's children through the browser's own loader
    ///
    /// The viewer state does not change.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, `UnknownBrowser` or
    /// `UnknownNode`.
    pub fn expand_node(&mut self, kind: BrowserKind, node: NodeId) -> Result<CommandOutcome> {
        self.require("expand", READY)?;
        self.node_object(kind, node)?;
        let scope = self.model.scope();
        let context = self.model.context().clone();
        let browser = self
            .model
            .browser_mut(kind)
            .ok_or(ViewerError::UnknownBrowser(kind))?;

        Ok(browser
            .expand(node, scope, &context)
            .map_or(CommandOutcome::Completed, CommandOutcome::Dispatched))
    }

    // ---- copy / cut / paste ------------------------------------------

    /// Fill the copy buffer
    ///
    /// With `CopyMode::Cut` the nodes are flagged in every browser; they are
    /// moved only when pasted.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, or `InvalidArgument` for an
    /// empty node list.
    pub fn set_nodes_to_copy(&mut self, nodes: Vec<NodeRef>, mode: CopyMode) -> Result<()> {
        self.require("copy", READY)?;
        if nodes.is_empty() {
            return Err(ViewerError::InvalidArgument(
                "no nodes to copy".to_string(),
            ));
        }

        let buffer = CopyBuffer::new(nodes, mode);
        let keys = buffer.keys();
        for browser in self.model.browsers_mut() {
            browser.mark_cut(&[], false);
            if mode == CopyMode::Cut {
                browser.mark_cut(&keys, true);
            }
        }
        debug!(count = keys.len(), ?mode, "Copy buffer filled");
        self.model.set_copy_buffer(Some(buffer));
        Ok(())
    }

    /// Copy or cut the working browser's selection
    ///
    /// # Errors
    ///
    /// Same as `set_nodes_to_copy`.
    pub fn copy_selection(&mut self, mode: CopyMode) -> Result<CommandOutcome> {
        self.require("copy", READY)?;
        let kind = self.working_browser()?;
        let nodes: Vec<NodeRef> = match self.model.browser(kind) {
            Some(browser) => browser
                .selected_displays()
                .into_iter()
                .filter_map(|id| {
                    let object = browser.node(id)?.object.clone();
                    let parent = browser.parent_object(id).map(|p| p.key());
                    Some(NodeRef::new(object, parent))
                })
                .collect(),
            None => Vec::new(),
        };
        if nodes.is_empty() {
            return Ok(self.reject("Copy", Rejection::EmptySelection));
        }
        self.set_nodes_to_copy(nodes, mode)?;
        Ok(CommandOutcome::Completed)
    }

    /// Empty the copy buffer ("explicit deselect")
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn clear_copy_buffer(&mut self) -> Result<()> {
        self.require("clear copy buffer", READY)?;
        self.model.set_copy_buffer(None);
        for browser in self.model.browsers_mut() {
            browser.mark_cut(&[], false);
        }
        Ok(())
    }

    /// Paste the copy buffer into `targets`
    ///
    /// Business-rule violations come back as `CommandOutcome::Rejected` and
    /// leave everything unchanged.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn paste(&mut self, targets: &[DataObject]) -> Result<CommandOutcome> {
        self.require("paste", READY)?;
        let plan = match self.model.copy_buffer() {
            Some(buffer) => buffer.plan_paste(targets),
            None => Err(Rejection::EmptyCopyBuffer),
        };
        let request = match plan {
            Ok(request) => request,
            Err(rejection) => return Ok(self.reject("Paste", rejection)),
        };

        self.model.set_copy_buffer(None);
        for browser in self.model.browsers_mut() {
            browser.mark_cut(&[], false);
        }
        let id = self.dispatch(
            LoadRequest::Transfer(request),
            LifecycleState::Saving,
            None,
            None,
        );
        Ok(CommandOutcome::Dispatched(id))
    }

    /// Paste into the working browser's selection
    ///
    /// # Errors
    ///
    /// Same as `paste`.
    pub fn paste_into_selection(&mut self) -> Result<CommandOutcome> {
        self.require("paste", READY)?;
        let targets = self.selected_objects()?;
        self.paste(&targets)
    }

    // ---- delete ------------------------------------------------------

    /// Delete objects after asking the confirmation policy
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, `InvalidArgument` for an empty
    /// list, or a prompt failure.
    pub fn delete_objects(&mut self, objects: &[DataObject]) -> Result<CommandOutcome> {
        self.require("delete", READY)?;
        if objects.is_empty() {
            return Err(ViewerError::InvalidArgument(
                "no objects to delete".to_string(),
            ));
        }

        let targets = objects
            .iter()
            .map(|object| DeletableObject::inspect(object.clone(), self.loaded_children(object.key())))
            .collect();
        let mut request = DeletionRequest::new(targets);

        if self.config.confirm_delete {
            let question = format!("Delete {}?", request.summary());
            if self.confirmation.confirm(&question)? != Answer::Yes {
                return Ok(self.reject("Delete", Rejection::Declined));
            }
        }
        if request.has_content() {
            match self
                .confirmation
                .confirm("Also delete the contents of the selected containers?")?
            {
                Answer::Yes => request.delete_contents = true,
                Answer::No => request.delete_contents = false,
                Answer::Cancel => return Ok(self.reject("Delete", Rejection::Declined)),
            }
        }
        let found = request.annotations_found();
        if !found.is_empty() {
            let labels: Vec<String> = found.iter().map(ToString::to_string).collect();
            let question = format!("Also delete the attached {}?", labels.join(", "));
            match self.confirmation.confirm(&question)? {
                Answer::Yes => request.annotation_kinds = found,
                Answer::No => request.annotation_kinds.clear(),
                Answer::Cancel => return Ok(self.reject("Delete", Rejection::Declined)),
            }
        }

        let id = self.dispatch(
            LoadRequest::Delete(request.descriptors()),
            LifecycleState::Saving,
            None,
            None,
        );
        Ok(CommandOutcome::Dispatched(id))
    }

    /// Delete the working browser's selection
    ///
    /// # Errors
    ///
    /// Same as `delete_objects`.
    pub fn delete_selection(&mut self) -> Result<CommandOutcome> {
        self.require("delete", READY)?;
        let objects = self.selected_objects()?;
        if objects.is_empty() {
            return Ok(self.reject("Delete", Rejection::EmptySelection));
        }
        self.delete_objects(&objects)
    }

    // ---- save --------------------------------------------------------

    /// Create, update or remove one object on the server
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn save_object(
        &mut self,
        object: DataObject,
        operation: DataOperation,
    ) -> Result<CommandOutcome> {
        self.require("save", READY)?;
        let request = match operation {
            DataOperation::Create { parent } => LoadRequest::Create { object, parent },
            DataOperation::Update => LoadRequest::Update(object),
            DataOperation::Remove => LoadRequest::Remove(object),
        };
        let id = self.dispatch(request, LifecycleState::Saving, None, None);
        Ok(CommandOutcome::Dispatched(id))
    }

    /// Reflect a saved object in every browser and the editor
    ///
    /// Called when a save loader completes; hosts may call it for saves made
    /// elsewhere. A viewer in `Saving` returns to `Ready` only when the
    /// pending loader saves this same object; any other pending loader keeps
    /// running.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready` or `Saving`.
    pub fn on_data_object_save(
        &mut self,
        object: DataObject,
        operation: DataOperation,
    ) -> Result<()> {
        self.require(
            "apply saved object",
            &[LifecycleState::Ready, LifecycleState::Saving],
        )?;
        let key = object.key();
        self.apply_saved(&object, operation);
        if self.state() != LifecycleState::Saving {
            return Ok(());
        }
        if self.model.pending_subject() == Some(key) {
            self.model.cancel_pending();
            self.transition(LifecycleState::Ready);
        } else {
            debug!(
                object = %key,
                loader = ?self.model.pending_id(),
                "Saved elsewhere, pending loader kept"
            );
        }
        Ok(())
    }

    // ---- thumbnails and rendering settings ---------------------------

    /// Show thumbnails for an image node or the loaded images of a container
    ///
    /// Cached thumbnails are attached at once; only missing ones are loaded.
    /// A container whose contents are not loaded yet is rejected.
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, `UnknownBrowser` or
    /// `UnknownNode`.
    pub fn retrieve_thumbnails(&mut self, kind: BrowserKind, node: NodeId) -> Result<CommandOutcome> {
        self.require("load thumbnails", READY)?;
        let object = self.node_object(kind, node)?;
        let contents_loaded = self
            .model
            .browser(kind)
            .and_then(|browser| browser.node(node))
            .is_some_and(|n| n.children_loaded);
        if object.kind != DataKind::Image && !contents_loaded {
            return Ok(self.reject("Thumbnails", Rejection::ContentsNotLoaded));
        }
        let images: Vec<ObjectId> = if object.kind == DataKind::Image {
            vec![object.id]
        } else {
            self.model
                .browser(kind)
                .map(|browser| {
                    browser
                        .tree()
                        .children(node)
                        .iter()
                        .filter_map(|child| browser.node(*child))
                        .filter(|child| child.object.kind == DataKind::Image)
                        .map(|child| child.object.id)
                        .collect()
                })
                .unwrap_or_default()
        };

        let mut cached = Vec::new();
        let mut missing = Vec::new();
        for image in images {
            match self.model.cached_thumbnail(image) {
                Some(thumbnail) => cached.push(thumbnail),
                None => missing.push(image),
            }
        }

        if let Some(browser) = self.model.browser_mut(kind) {
            browser.set_thumbnails(&cached);
        }
        if missing.is_empty() {
            trace!(cached = cached.len(), "All thumbnails served from cache");
            return Ok(CommandOutcome::Completed);
        }

        let id = self.dispatch(
            LoadRequest::Thumbnails(missing),
            LifecycleState::LoadingThumbnail,
            Some(kind),
            Some(node),
        );
        Ok(CommandOutcome::Dispatched(id))
    }

    /// Remember `image` as the source for a rendering settings paste
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn copy_rendering_settings(&mut self, image: &DataObject) -> Result<CommandOutcome> {
        self.require("copy rendering settings", READY)?;
        if image.kind != DataKind::Image {
            return Ok(self.reject(
                "Rendering settings",
                Rejection::InvalidSettingsTarget(image.kind),
            ));
        }
        self.model.set_rendering_source(Some(image.id));
        Ok(CommandOutcome::Completed)
    }

    /// Apply the copied rendering settings to images or datasets
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn paste_rendering_settings(&mut self, targets: &[DataObject]) -> Result<CommandOutcome> {
        self.require("paste rendering settings", READY)?;
        let Some(source) = self.model.rendering_source() else {
            return Ok(self.reject("Rendering settings", Rejection::NoRenderingSettings));
        };
        let targets = match Self::settings_targets(targets) {
            Ok(targets) => targets,
            Err(rejection) => return Ok(self.reject("Rendering settings", rejection)),
        };
        let id = self.dispatch(
            LoadRequest::PasteSettings { source, targets },
            LifecycleState::Saving,
            None,
            None,
        );
        Ok(CommandOutcome::Dispatched(id))
    }

    /// Restore default rendering settings on images or datasets
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn reset_rendering_settings(&mut self, targets: &[DataObject]) -> Result<CommandOutcome> {
        self.require("reset rendering settings", READY)?;
        let targets = match Self::settings_targets(targets) {
            Ok(targets) => targets,
            Err(rejection) => return Ok(self.reject("Rendering settings", rejection)),
        };
        let id = self.dispatch(
            LoadRequest::ResetSettings(targets),
            LifecycleState::Saving,
            None,
            None,
        );
        Ok(CommandOutcome::Dispatched(id))
    }

    // ---- user / group ------------------------------------------------

    /// Browse another user's data
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, or a prompt failure.
    pub fn set_user(&mut self, user: UserId) -> Result<CommandOutcome> {
        self.require("switch user", READY)?;
        let scope = self.model.scope();
        if scope.user == user {
            return Ok(CommandOutcome::Completed);
        }
        self.switch_scope(Scope::new(user, scope.group), "Switch user")
    }

    /// Browse another group's data
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`, or a prompt failure.
    pub fn set_group(&mut self, group: GroupId) -> Result<CommandOutcome> {
        self.require("switch group", READY)?;
        let scope = self.model.scope();
        if scope.group == group {
            return Ok(CommandOutcome::Completed);
        }
        self.switch_scope(Scope::new(scope.user, group), "Switch group")
    }

    // ---- finder ------------------------------------------------------

    /// Show or hide the finder
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` once discarded.
    pub fn show_finder(&mut self, visible: bool) -> Result<()> {
        if self.state() == LifecycleState::Discarded {
            return Err(self.illegal("show finder"));
        }
        if self.model.finder_mut().set_visible(visible) {
            self.events
                .publish(&ViewerEvent::FinderVisibilityChanged(visible));
        }
        Ok(())
    }

    /// Record results found by the finder
    ///
    /// # Errors
    ///
    /// Returns `IllegalState` unless `Ready`.
    pub fn set_search_results(&mut self, results: Vec<DataObject>) -> Result<()> {
        self.require("set search results", READY)?;
        self.model.finder_mut().set_results(results);
        Ok(())
    }

    // ---- result delivery ---------------------------------------------

    /// Apply every result already delivered, returning how many were applied
    pub fn process_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.results.try_recv() {
            if self.handle_message(message) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait up to `timeout` for one result and apply it
    ///
    /// Returns whether a result was applied.
    pub fn wait_for_result(&mut self, timeout: Duration) -> bool {
        self.results
            .recv_timeout(timeout)
            .is_ok_and(|message| self.handle_message(message))
    }

    /// Apply results until no load is outstanding or `timeout` passes
    ///
    /// Returns whether the viewer is idle.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.process_pending();
            let busy = self.state().is_busy()
                || self.model.browsers().any(|browser| browser.pending_loads() > 0);
            if !busy {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.wait_for_result(deadline - now);
        }
    }

    fn handle_message(&mut self, message: LoaderMessage) -> bool {
        let LoaderMessage { id, kind, result } = message;

        if self.state() == LifecycleState::Discarded {
            trace!(%id, %kind, "Dropping result after discard");
            return false;
        }

        let owner = self
            .model
            .browsers_mut()
            .find_map(|browser| browser.release_load(id).then(|| browser.browser_type()));
        if let Some(owner) = owner {
            match result {
                Ok(LoadOutcome::Children { parent, children }) => {
                    if let Some(browser) = self.model.browser_mut(owner) {
                        browser.set_children(parent, &children);
                    }
                }
                Ok(other) => trace!(%id, ?other, "Unexpected result for browser load"),
                Err(error) => {
                    warn!(%id, browser = %owner, %error, "Browser load failed");
                    self.notifier.notify_error("Load failed", &error.to_string());
                }
            }
            return true;
        }

        let Some(pending) = self.model.take_pending(id) else {
            trace!(%id, %kind, "Dropping stale result");
            return false;
        };

        let from = self.model.set_state(LifecycleState::Ready);
        match result {
            Ok(outcome) => self.apply_outcome(&pending, outcome),
            Err(error) => {
                warn!(%id, %kind, %error, "Loader failed");
                self.notifier
                    .notify_error(Self::failure_title(kind), &error.to_string());
            }
        }
        self.publish_state(from, LifecycleState::Ready);
        true
    }

    fn apply_outcome(&mut self, pending: &PendingLoad, outcome: LoadOutcome) {
        match outcome {
            LoadOutcome::Roots(objects) => {
                if let Some(browser) = pending.browser.and_then(|k| self.model.browser_mut(k)) {
                    browser.set_roots(objects);
                }
            }
            LoadOutcome::Children { parent, children } => match pending.browser {
                Some(kind) => {
                    if let Some(browser) = self.model.browser_mut(kind) {
                        browser.set_children(parent, &children);
                    }
                }
                None => {
                    for browser in self.model.browsers_mut() {
                        browser.set_children(parent, &children);
                    }
                }
            },
            LoadOutcome::Created { object, parent } => {
                self.apply_saved(&object, DataOperation::Create { parent });
            }
            LoadOutcome::Updated(object) => self.apply_saved(&object, DataOperation::Update),
            LoadOutcome::Removed(object) => self.apply_saved(&object, DataOperation::Remove),
            LoadOutcome::Transferred(request) => {
                for browser in self.model.browsers_mut() {
                    browser.apply_transfer(&request);
                }
                debug!(objects = request.object_count(), "Paste applied");
            }
            LoadOutcome::Deleted(keys) => {
                let mut removed = 0;
                for browser in self.model.browsers_mut() {
                    removed += browser.remove_tree_nodes(&keys);
                }
                self.model.forget_objects(&keys);
                self.editor.set_root_object(None, None);
                debug!(deleted = keys.len(), nodes = removed, "Delete applied");
            }
            LoadOutcome::Thumbnails(thumbnails) => {
                self.model.cache_thumbnails(&thumbnails);
                for browser in self.model.browsers_mut() {
                    browser.set_thumbnails(&thumbnails);
                }
            }
            LoadOutcome::SettingsApplied(images) => {
                self.model.invalidate_thumbnails(&images);
                self.notifier.notify_info(
                    "Rendering settings",
                    &format!("Updated {} image(s)", images.len()),
                );
            }
        }
    }

    fn apply_saved(&mut self, object: &DataObject, operation: DataOperation) {
        let owner = Some(object.owner.unwrap_or(self.model.scope().user));
        match operation {
            DataOperation::Create { parent } => {
                for browser in self.model.browsers_mut() {
                    browser.add_object(parent, object);
                }
                self.editor.set_root_object(Some(object.clone()), owner);
            }
            DataOperation::Update => {
                for browser in self.model.browsers_mut() {
                    browser.update_object(object);
                }
                self.editor.set_root_object(Some(object.clone()), owner);
            }
            DataOperation::Remove => {
                let keys = [object.key()];
                for browser in self.model.browsers_mut() {
                    browser.remove_tree_nodes(&keys);
                }
                self.model.forget_objects(&keys);
                self.editor.set_root_object(None, None);
            }
        }
    }

    // ---- internals ---------------------------------------------------

    fn illegal(&self, operation: &'static str) -> ViewerError {
        ViewerError::IllegalState {
            operation,
            state: self.state(),
        }
    }

    fn require(&self, operation: &'static str, allowed: &[LifecycleState]) -> Result<()> {
        if allowed.contains(&self.state()) {
            Ok(())
        } else {
            debug!(operation, state = %self.state(), "Operation refused");
            Err(self.illegal(operation))
        }
    }

    fn transition(&mut self, to: LifecycleState) {
        let from = self.model.set_state(to);
        self.publish_state(from, to);
    }

    fn publish_state(&mut self, from: LifecycleState, to: LifecycleState) {
        if from != to {
            debug!(%from, %to, "State changed");
            self.events.publish(&ViewerEvent::StateChanged { from, to });
        }
    }

    /// Attach a loader to the pending slot, go busy, then start it
    fn dispatch(
        &mut self,
        request: LoadRequest,
        busy: LifecycleState,
        browser: Option<BrowserKind>,
        node: Option<NodeId>,
    ) -> LoaderId {
        let loader = self.model.context().loader(request);
        let id = loader.id();
        debug!(%id, kind = %loader.kind(), state = %busy, "Dispatching loader");

        debug_assert!(
            self.model.pending_id().is_none(),
            "loader dispatched while another is pending"
        );
        if let Err(refused) = self.model.attach(PendingLoad {
            loader,
            browser,
            node,
        }) {
            warn!(
                %id,
                pending = ?self.model.pending_id(),
                "Pending slot occupied, loader not started"
            );
            refused.loader.cancel();
            return id;
        }
        self.transition(busy);
        if let Some(pending) = self.model.pending_mut() {
            pending.loader.load();
        }
        id
    }

    fn reject(&self, title: &str, rejection: Rejection) -> CommandOutcome {
        info!(title, %rejection, "Command rejected");
        self.notifier.notify_info(title, &rejection.to_string());
        CommandOutcome::Rejected(rejection)
    }

    /// Ask whether to save unsaved editor data; false if the user cancelled
    fn resolve_unsaved(&mut self, question: &str) -> Result<bool> {
        if !self.editor.has_data_to_save() {
            return Ok(true);
        }
        match self.confirmation.confirm(question)? {
            Answer::Yes => self.editor.save_data(),
            Answer::No => self.editor.clear_data_to_save(),
            Answer::Cancel => return Ok(false),
        }
        Ok(true)
    }

    fn switch_scope(&mut self, scope: Scope, title: &str) -> Result<CommandOutcome> {
        let question = format!("Save changes before you {}?", title.to_lowercase());
        if !self.resolve_unsaved(&question)? {
            return Ok(self.reject(title, Rejection::Declined));
        }
        let kind = self.working_browser()?;

        self.model.set_scope(scope);
        for browser in self.model.browsers_mut() {
            browser.refresh_tree();
        }
        self.model.set_copy_buffer(None);
        self.model.finder_mut().clear_results();
        self.editor.set_root_object(None, None);
        debug!(user = %scope.user, group = %scope.group, "Scope changed");

        let request = LoadRequest::Roots(self.root_query(kind));
        let id = self.dispatch(request, LifecycleState::LoadingData, Some(kind), None);
        Ok(CommandOutcome::Dispatched(id))
    }

    fn working_browser(&self) -> Result<BrowserKind> {
        self.model
            .selected_browser()
            .ok_or(ViewerError::UnknownBrowser(self.config.default_browser))
    }

    fn root_query(&self, kind: BrowserKind) -> RootQuery {
        RootQuery {
            kinds: kind.root_kinds(),
            orphans_only: kind.orphans_only(),
            scope: self.model.scope(),
        }
    }

    fn node_object(&self, kind: BrowserKind, node: NodeId) -> Result<DataObject> {
        let browser = self
            .model
            .browser(kind)
            .ok_or(ViewerError::UnknownBrowser(kind))?;
        browser
            .node(node)
            .map(|n| n.object.clone())
            .ok_or(ViewerError::UnknownNode {
                browser: kind,
                node,
            })
    }

    fn selected_objects(&self) -> Result<Vec<DataObject>> {
        let kind = self.working_browser()?;
        Ok(self
            .model
            .browser(kind)
            .map(|browser| browser.selected_objects())
            .unwrap_or_default())
    }

    fn sync_selection(&mut self, kind: BrowserKind) {
        let selected = self
            .model
            .browser(kind)
            .map(|browser| browser.selected_objects())
            .unwrap_or_default();
        let user = self.model.scope().user;
        sync_editor(self.editor.as_mut(), &selected, user);
    }

    /// Most children any browser has loaded for `key`
    fn loaded_children(&self, key: ObjectKey) -> usize {
        self.model
            .browsers()
            .flat_map(|browser| {
                browser
                    .find_nodes(key)
                    .into_iter()
                    .map(|id| browser.tree().children(id).len())
                    .collect::<Vec<_>>()
            })
            .max()
            .unwrap_or(0)
    }

    fn settings_targets(targets: &[DataObject]) -> std::result::Result<Vec<ObjectKey>, Rejection> {
        if targets.is_empty() {
            return Err(Rejection::NoTargets);
        }
        if let Some(bad) = targets
            .iter()
            .find(|t| !matches!(t.kind, DataKind::Image | DataKind::Dataset))
        {
            return Err(Rejection::InvalidSettingsTarget(bad.kind));
        }
        Ok(targets.iter().map(DataObject::key).collect())
    }

    const fn failure_title(kind: LoadKind) -> &'static str {
        match kind {
            LoadKind::Roots | LoadKind::Children => "Load failed",
            LoadKind::Thumbnails => "Thumbnails unavailable",
            LoadKind::Transfer => "Paste failed",
            LoadKind::Delete => "Delete failed",
            LoadKind::PasteSettings | LoadKind::ResetSettings => "Rendering settings failed",
            LoadKind::Create | LoadKind::Update | LoadKind::Remove => "Save failed",
        }
    }
}

impl Drop for TreeViewer {
    fn drop(&mut self) {
        self.model.cancel_pending();
        for browser in self.model.browsers_mut() {
            browser.cancel();
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod orchestrator_tests;
