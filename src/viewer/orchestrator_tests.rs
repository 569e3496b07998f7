use super::TreeViewer;
use crate::browser::BrowserKind;
use crate::editor::EditorPane;
use crate::events::ViewerEvent;
use crate::loader::{LoadKind, LoadOutcome, LoaderMessage, ManualExecutor};
use crate::model::{DataKind, DataObject, GroupId, NodeId, ObjectId, ObjectKey, UserId};
use crate::service::{MemoryService, Scope};
use crate::ui::{Answer, MessageLevel, RecordingNotifier, ScriptedConfirm};
use crate::viewer::{
    CommandOutcome, CopyMode, DataOperation, LifecycleState, NodeRef, Rejection, ViewerError,
};
use proptest::prelude::*;
use std::sync::Arc;

const CONTAINERS: BrowserKind = BrowserKind::ContainerExplorer;

struct Harness {
    viewer: TreeViewer,
    executor: ManualExecutor,
    service: Arc<MemoryService>,
    editor: EditorPane,
    notifier: RecordingNotifier,
    confirm: ScriptedConfirm,
}

impl Harness {
    fn new(confirm: ScriptedConfirm) -> Self {
        let service = Arc::new(MemoryService::sample());
        let executor = ManualExecutor::new();
        let editor = EditorPane::new();
        let notifier = RecordingNotifier::new();
        let viewer = TreeViewer::builder(service.clone(), Scope::new(UserId(1), GroupId(1)))
            .executor(Arc::new(executor.clone()))
            .editor(Box::new(editor.clone()))
            .notifier(Box::new(notifier.clone()))
            .confirmation(Box::new(confirm.clone()))
            .build()
            .unwrap();

        Self {
            viewer,
            executor,
            service,
            editor,
            notifier,
            confirm,
        }
    }

    /// Activated, with the container explorer's top level loaded
    fn ready(confirm: ScriptedConfirm) -> Self {
        let mut harness = Self::new(confirm);
        harness.viewer.activate().unwrap();
        harness.viewer.refresh_tree().unwrap();
        harness.run();
        assert_eq!(harness.viewer.state(), LifecycleState::Ready);
        harness
    }

    fn run(&mut self) -> usize {
        self.executor.run_all();
        self.viewer.process_pending()
    }

    fn nodes(&self, kind: BrowserKind, key: ObjectKey) -> Vec<NodeId> {
        self.viewer.browser(kind).unwrap().find_nodes(key)
    }

    fn node(&self, kind: BrowserKind, key: ObjectKey) -> NodeId {
        self.nodes(kind, key)[0]
    }

    fn object(&self, kind: BrowserKind, key: ObjectKey) -> DataObject {
        let browser = self.viewer.browser(kind).unwrap();
        browser.node(browser.find_nodes(key)[0]).unwrap().object.clone()
    }

    fn expand(&mut self, key: ObjectKey) {
        let node = self.node(CONTAINERS, key);
        self.viewer.expand_node(CONTAINERS, node).unwrap();
        self.run();
    }

    fn child_keys(&self, kind: BrowserKind, parent: ObjectKey) -> Vec<ObjectKey> {
        let browser = self.viewer.browser(kind).unwrap();
        let node = browser.find_nodes(parent)[0];
        browser
            .tree()
            .children(node)
            .iter()
            .map(|child| browser.node(*child).unwrap().key())
            .collect()
    }
}

fn key(kind: DataKind, id: i64) -> ObjectKey {
    ObjectKey::new(kind, id)
}

fn no_prompts() -> ScriptedConfirm {
    ScriptedConfirm::new(Vec::<Answer>::new())
}

#[test]
fn test_activate_selects_and_displays_default_browser() {
    let mut harness = Harness::new(no_prompts());
    let events = harness.viewer.subscribe();
    assert_eq!(harness.viewer.state(), LifecycleState::New);

    harness.viewer.activate().unwrap();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert_eq!(harness.viewer.selected_browser(), Some(CONTAINERS));
    let browser = harness.viewer.browser(CONTAINERS).unwrap();
    assert!(browser.is_displayed());
    assert!(browser.is_selected());

    let received: Vec<ViewerEvent> = events.try_iter().collect();
    assert!(received.contains(&ViewerEvent::SelectedBrowserChanged {
        previous: None,
        current: CONTAINERS,
    }));
    assert!(received.contains(&ViewerEvent::StateChanged {
        from: LifecycleState::New,
        to: LifecycleState::Ready,
    }));

    let again = harness.viewer.activate();
    assert!(matches!(again, Err(ViewerError::IllegalState { .. })));
}

#[test]
fn test_commands_before_activation_fail() {
    let mut harness = Harness::new(no_prompts());
    assert!(matches!(
        harness.viewer.refresh_tree(),
        Err(ViewerError::IllegalState {
            state: LifecycleState::New,
            ..
        })
    ));
}

#[test]
fn test_refresh_loads_visible_top_level() {
    let harness = Harness::ready(no_prompts());
    let browser = harness.viewer.browser(CONTAINERS).unwrap();

    assert!(browser.roots_loaded());
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Project, 1)).len(), 1);
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Dataset, 3)).len(), 1);
    // Owned by another user, or not an orphan
    assert!(harness.nodes(CONTAINERS, key(DataKind::Project, 2)).is_empty());
    assert!(harness.nodes(CONTAINERS, key(DataKind::Dataset, 1)).is_empty());
}

#[test]
fn test_copy_then_paste_links_image_once() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Dataset, 3));
    harness.expand(key(DataKind::Project, 1));
    harness.expand(key(DataKind::Dataset, 1));
    let events = harness.viewer.subscribe();

    let image = harness.object(CONTAINERS, key(DataKind::Image, 4));
    let liver = harness.object(CONTAINERS, key(DataKind::Dataset, 1));
    harness
        .viewer
        .set_nodes_to_copy(
            vec![NodeRef::new(image, Some(key(DataKind::Dataset, 3)))],
            CopyMode::Copy,
        )
        .unwrap();

    let outcome = harness.viewer.paste(&[liver]).unwrap();
    assert!(outcome.loader().is_some());
    assert_eq!(harness.viewer.state(), LifecycleState::Saving);
    assert!(!harness.viewer.has_data_to_copy());

    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    let linked = harness.service.children_of(key(DataKind::Dataset, 1));
    assert_eq!(
        linked.iter().filter(|k| **k == key(DataKind::Image, 4)).count(),
        1
    );
    assert!(
        harness
            .service
            .children_of(key(DataKind::Dataset, 3))
            .contains(&key(DataKind::Image, 4))
    );
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Image, 4)).len(), 2);

    let received: Vec<ViewerEvent> = events.try_iter().collect();
    assert_eq!(
        received,
        vec![
            ViewerEvent::StateChanged {
                from: LifecycleState::Ready,
                to: LifecycleState::Saving,
            },
            ViewerEvent::StateChanged {
                from: LifecycleState::Saving,
                to: LifecycleState::Ready,
            },
        ]
    );
}

#[test]
fn test_cut_then_paste_moves_image() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Dataset, 3));
    harness.expand(key(DataKind::Project, 1));
    harness.expand(key(DataKind::Dataset, 2));

    let image = harness.object(CONTAINERS, key(DataKind::Image, 4));
    let kidney = harness.object(CONTAINERS, key(DataKind::Dataset, 2));
    harness
        .viewer
        .set_nodes_to_copy(
            vec![NodeRef::new(image, Some(key(DataKind::Dataset, 3)))],
            CopyMode::Cut,
        )
        .unwrap();
    let cut_node = harness.node(CONTAINERS, key(DataKind::Image, 4));
    assert!(
        harness
            .viewer
            .browser(CONTAINERS)
            .unwrap()
            .node(cut_node)
            .unwrap()
            .cut
    );

    harness.viewer.paste(&[kidney]).unwrap();
    harness.run();

    assert!(harness.service.children_of(key(DataKind::Dataset, 3)).is_empty());
    assert!(
        harness
            .service
            .children_of(key(DataKind::Dataset, 2))
            .contains(&key(DataKind::Image, 4))
    );
    assert!(harness.child_keys(CONTAINERS, key(DataKind::Dataset, 3)).is_empty());
    assert!(
        harness
            .child_keys(CONTAINERS, key(DataKind::Dataset, 2))
            .contains(&key(DataKind::Image, 4))
    );
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Image, 4)).len(), 1);
}

#[test]
fn test_paste_into_incompatible_target_is_rejected() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Dataset, 3));
    let image = harness.object(CONTAINERS, key(DataKind::Image, 4));
    let tag = DataObject::new(DataKind::Tag, 3, "follow-up");
    let calls = harness.service.call_count();

    harness
        .viewer
        .set_nodes_to_copy(
            vec![NodeRef::new(image, Some(key(DataKind::Dataset, 3)))],
            CopyMode::Copy,
        )
        .unwrap();
    let outcome = harness.viewer.paste(&[tag]).unwrap();

    assert_eq!(
        outcome,
        CommandOutcome::Rejected(Rejection::Incompatible {
            parent: DataKind::Tag,
            child: DataKind::Image,
        })
    );
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    assert!(harness.viewer.has_data_to_copy());
    assert_eq!(harness.service.call_count(), calls);
    assert!(harness.service.children_of(key(DataKind::Tag, 3)).is_empty());
    assert_eq!(harness.notifier.count(MessageLevel::Info), 1);
}

#[test]
fn test_paste_with_empty_buffer_is_rejected() {
    let mut harness = Harness::ready(no_prompts());
    let dataset = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    assert_eq!(
        harness.viewer.paste(&[dataset]).unwrap(),
        CommandOutcome::Rejected(Rejection::EmptyCopyBuffer)
    );
}

#[test]
fn test_empty_copy_is_invalid_argument() {
    let mut harness = Harness::ready(no_prompts());
    let result = harness.viewer.set_nodes_to_copy(Vec::new(), CopyMode::Copy);
    assert!(matches!(result, Err(ViewerError::InvalidArgument(_))));
    assert!(!harness.viewer.has_data_to_copy());
}

#[test]
fn test_cancel_drops_late_result() {
    let mut harness = Harness::ready(no_prompts());
    let before = harness.viewer.browser(CONTAINERS).unwrap().tree().len();

    let id = harness.viewer.refresh_tree().unwrap().loader().unwrap();
    assert_eq!(harness.viewer.state(), LifecycleState::LoadingData);

    harness.viewer.cancel();
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());

    // The cancelled worker sends nothing
    assert_eq!(harness.run(), 0);

    // A result delivered anyway is ignored
    harness
        .viewer
        .result_sender()
        .send(LoaderMessage {
            id,
            kind: LoadKind::Roots,
            result: Ok(LoadOutcome::Roots(vec![DataObject::new(
                DataKind::Project,
                99,
                "late",
            )])),
        })
        .unwrap();
    assert_eq!(harness.viewer.process_pending(), 0);
    assert!(harness.nodes(CONTAINERS, key(DataKind::Project, 99)).is_empty());
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);

    // Refresh cleared the tree before the cancel
    assert!(harness.viewer.browser(CONTAINERS).unwrap().tree().len() < before);
    harness.viewer.cancel();
}

#[test]
fn test_discard_drops_in_flight_result() {
    let mut harness = Harness::ready(no_prompts());
    let project = harness.node(CONTAINERS, key(DataKind::Project, 1));
    let id = harness
        .viewer
        .browse(CONTAINERS, project)
        .unwrap()
        .loader()
        .unwrap();
    assert_eq!(harness.viewer.state(), LifecycleState::LoadingSelection);

    harness.viewer.discard();
    assert_eq!(harness.viewer.state(), LifecycleState::Discarded);
    assert!(harness.editor.snapshot().root.is_none());

    harness
        .viewer
        .result_sender()
        .send(LoaderMessage {
            id,
            kind: LoadKind::Children,
            result: Ok(LoadOutcome::Children {
                parent: key(DataKind::Project, 1),
                children: vec![DataObject::new(DataKind::Dataset, 1, "Liver")],
            }),
        })
        .unwrap();
    assert_eq!(harness.run(), 0);

    assert!(harness.viewer.browser(CONTAINERS).unwrap().tree().is_empty());
    assert!(harness.editor.snapshot().root.is_none());
    assert_eq!(harness.viewer.state(), LifecycleState::Discarded);

    harness.viewer.discard();
    harness.viewer.cancel();
    assert_eq!(harness.viewer.state(), LifecycleState::Discarded);
}

#[test]
fn test_mutations_after_discard_are_illegal() {
    let mut harness = Harness::ready(no_prompts());
    let dataset = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    harness.viewer.discard();
    let calls = harness.service.call_count();

    assert!(matches!(
        harness.viewer.paste(&[dataset.clone()]),
        Err(ViewerError::IllegalState { .. })
    ));
    assert!(matches!(
        harness.viewer.delete_objects(&[dataset]),
        Err(ViewerError::IllegalState { .. })
    ));
    assert!(matches!(
        harness.viewer.set_selected_browser(BrowserKind::TagExplorer),
        Err(ViewerError::IllegalState { .. })
    ));
    assert!(matches!(
        harness.viewer.show_finder(true),
        Err(ViewerError::IllegalState { .. })
    ));
    assert_eq!(harness.service.call_count(), calls);
    assert!(harness.confirm.asked().is_empty());
    assert!(harness.viewer.selected_browser().is_none());
}

#[test]
fn test_busy_viewer_refuses_second_command() {
    let mut harness = Harness::ready(no_prompts());
    harness.viewer.refresh_tree().unwrap();
    let pending = harness.viewer.pending_loader();

    assert!(matches!(
        harness.viewer.refresh_tree(),
        Err(ViewerError::IllegalState {
            state: LifecycleState::LoadingData,
            ..
        })
    ));
    assert!(matches!(
        harness.viewer.set_selected_browser(BrowserKind::TagExplorer),
        Err(ViewerError::IllegalState { .. })
    ));
    assert_eq!(harness.viewer.pending_loader(), pending);
    assert_eq!(harness.executor.pending(), 1);
}

#[test]
fn test_failed_load_notifies_and_recovers() {
    let mut harness = Harness::ready(no_prompts());
    harness.service.fail_next("connection reset");

    harness.viewer.refresh_tree().unwrap();
    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    let errors: Vec<_> = harness
        .notifier
        .messages()
        .into_iter()
        .filter(|n| n.level == MessageLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("connection reset"));
}

#[test]
fn test_delete_dataset_with_contents() {
    let confirm = ScriptedConfirm::new([Answer::Yes, Answer::Yes, Answer::Yes]);
    let mut harness = Harness::ready(confirm);

    // Load a second browser that shows the same images
    harness
        .viewer
        .set_selected_browser(BrowserKind::ImageExplorer)
        .unwrap();
    harness.run();
    assert_eq!(
        harness.nodes(BrowserKind::ImageExplorer, key(DataKind::Image, 1)).len(),
        1
    );
    assert_eq!(
        harness.viewer.set_selected_browser(CONTAINERS).unwrap(),
        CommandOutcome::Completed
    );

    harness.expand(key(DataKind::Project, 1));
    harness.expand(key(DataKind::Dataset, 1));
    let liver = harness.object(CONTAINERS, key(DataKind::Dataset, 1));
    let node = harness.node(CONTAINERS, key(DataKind::Dataset, 1));
    harness.viewer.select_nodes(CONTAINERS, &[node]).unwrap();
    assert!(harness.editor.snapshot().root.is_some());

    let outcome = harness.viewer.delete_objects(&[liver]).unwrap();
    assert!(outcome.loader().is_some());
    assert_eq!(harness.viewer.state(), LifecycleState::Saving);
    assert_eq!(harness.executor.pending(), 1);
    assert_eq!(harness.confirm.asked().len(), 3);

    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    for gone in [
        key(DataKind::Dataset, 1),
        key(DataKind::Image, 1),
        key(DataKind::Image, 2),
    ] {
        assert!(!harness.service.contains(gone));
        assert!(harness.nodes(CONTAINERS, gone).is_empty());
        assert!(harness.nodes(BrowserKind::ImageExplorer, gone).is_empty());
    }
    assert!(harness.service.contains(key(DataKind::Image, 3)));
    assert!(harness.editor.snapshot().root.is_none());
}

#[test]
fn test_delete_keeping_contents() {
    let confirm = ScriptedConfirm::new([Answer::Yes, Answer::No]);
    let mut harness = Harness::ready(confirm);
    let unsorted = harness.object(CONTAINERS, key(DataKind::Dataset, 3));

    harness.viewer.delete_objects(&[unsorted]).unwrap();
    harness.run();

    assert!(!harness.service.contains(key(DataKind::Dataset, 3)));
    assert!(harness.service.contains(key(DataKind::Image, 4)));
    assert!(harness.nodes(CONTAINERS, key(DataKind::Dataset, 3)).is_empty());
}

#[test]
fn test_declined_delete_changes_nothing() {
    let confirm = ScriptedConfirm::new([Answer::No]);
    let mut harness = Harness::ready(confirm);
    let unsorted = harness.object(CONTAINERS, key(DataKind::Dataset, 3));

    let outcome = harness.viewer.delete_objects(&[unsorted]).unwrap();

    assert_eq!(outcome, CommandOutcome::Rejected(Rejection::Declined));
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.service.contains(key(DataKind::Dataset, 3)));
    assert!(matches!(
        harness.viewer.delete_objects(&[]),
        Err(ViewerError::InvalidArgument(_))
    ));
}

#[test]
fn test_selecting_unloaded_container_loads_its_subtree() {
    let mut harness = Harness::ready(no_prompts());
    let project = harness.node(CONTAINERS, key(DataKind::Project, 1));

    let outcome = harness.viewer.select_nodes(CONTAINERS, &[project]).unwrap();
    assert!(outcome.loader().is_some());
    assert_eq!(harness.viewer.state(), LifecycleState::LoadingData);

    let state = harness.editor.snapshot();
    assert_eq!(
        state.root.map(|object| object.key()),
        Some(key(DataKind::Project, 1))
    );
    assert_eq!(state.owner, Some(UserId(1)));
    assert!(state.single_selection);

    harness.run();
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert_eq!(harness.child_keys(CONTAINERS, key(DataKind::Project, 1)).len(), 2);
    // Still a single root per object
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Project, 1)).len(), 1);
}

#[test]
fn test_multiple_selection_sets_related_nodes() {
    let mut harness = Harness::ready(no_prompts());
    let project = harness.node(CONTAINERS, key(DataKind::Project, 1));
    let unsorted = harness.node(CONTAINERS, key(DataKind::Dataset, 3));

    let outcome = harness
        .viewer
        .select_nodes(CONTAINERS, &[project, unsorted])
        .unwrap();

    assert_eq!(outcome, CommandOutcome::Completed);
    let state = harness.editor.snapshot();
    assert!(!state.single_selection);
    assert_eq!(state.related.len(), 1);

    let missing = harness.viewer.select_nodes(CONTAINERS, &[NodeId(999)]);
    assert!(matches!(missing, Err(ViewerError::UnknownNode { .. })));
}

#[test]
fn test_switching_browser_asks_about_unsaved_data() {
    let confirm = ScriptedConfirm::new([Answer::Cancel, Answer::Yes]);
    let mut harness = Harness::ready(confirm);
    harness.editor.mark_dirty();

    let declined = harness
        .viewer
        .set_selected_browser(BrowserKind::TagExplorer)
        .unwrap();
    assert_eq!(declined, CommandOutcome::Rejected(Rejection::Declined));
    assert_eq!(harness.viewer.selected_browser(), Some(CONTAINERS));

    let events = harness.viewer.subscribe();
    let switched = harness
        .viewer
        .set_selected_browser(BrowserKind::TagExplorer)
        .unwrap();
    assert!(switched.loader().is_some());
    assert_eq!(harness.editor.snapshot().saves, 1);
    assert_eq!(harness.viewer.selected_browser(), Some(BrowserKind::TagExplorer));
    assert!(!harness.viewer.browser(CONTAINERS).unwrap().is_selected());
    assert!(events.try_iter().any(|event| event
        == ViewerEvent::SelectedBrowserChanged {
            previous: Some(CONTAINERS),
            current: BrowserKind::TagExplorer,
        }));

    harness.run();
    assert_eq!(
        harness.nodes(BrowserKind::TagExplorer, key(DataKind::TagSet, 1)).len(),
        1
    );
    assert_eq!(
        harness.nodes(BrowserKind::TagExplorer, key(DataKind::Tag, 3)).len(),
        1
    );
}

#[test]
fn test_unregistered_browser_is_an_error() {
    let service = Arc::new(MemoryService::sample());
    let config = crate::config::ViewerConfig {
        browsers: vec![CONTAINERS],
        ..Default::default()
    };
    let mut viewer = TreeViewer::builder(service, Scope::new(UserId(1), GroupId(1)))
        .executor(Arc::new(ManualExecutor::new()))
        .notifier(Box::new(RecordingNotifier::new()))
        .confirmation(Box::new(no_prompts()))
        .config(config)
        .build()
        .unwrap();
    viewer.activate().unwrap();

    assert!(matches!(
        viewer.set_selected_browser(BrowserKind::FileExplorer),
        Err(ViewerError::UnknownBrowser(BrowserKind::FileExplorer))
    ));
    assert_eq!(viewer.browser_kinds(), vec![CONTAINERS]);
}

#[test]
fn test_invalid_config_fails_build() {
    let config = crate::config::ViewerConfig {
        worker_threads: 0,
        ..Default::default()
    };
    let result = TreeViewer::builder(
        Arc::new(MemoryService::new()),
        Scope::new(UserId(1), GroupId(1)),
    )
    .config(config)
    .build();
    assert!(matches!(result, Err(ViewerError::Config(_))));
}

#[test]
fn test_display_browser_toggles() {
    let mut harness = Harness::ready(no_prompts());
    let events = harness.viewer.subscribe();

    assert!(harness.viewer.display_browser(BrowserKind::FileExplorer).unwrap());
    assert!(!harness.viewer.display_browser(BrowserKind::FileExplorer).unwrap());
    assert_eq!(events.try_iter().count(), 2);
}

#[test]
fn test_thumbnails_are_cached() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Project, 1));
    harness.expand(key(DataKind::Dataset, 1));
    let liver = harness.node(CONTAINERS, key(DataKind::Dataset, 1));

    let first = harness.viewer.retrieve_thumbnails(CONTAINERS, liver).unwrap();
    assert!(first.loader().is_some());
    assert_eq!(harness.viewer.state(), LifecycleState::LoadingThumbnail);
    harness.run();

    let image = harness.node(CONTAINERS, key(DataKind::Image, 1));
    let browser = harness.viewer.browser(CONTAINERS).unwrap();
    let thumbnail = browser.node(image).unwrap().thumbnail.clone().unwrap();
    assert_eq!(thumbnail.data, b"liver-01.tif".to_vec());

    let calls = harness.service.call_count();
    let second = harness.viewer.retrieve_thumbnails(CONTAINERS, liver).unwrap();
    assert_eq!(second, CommandOutcome::Completed);
    assert_eq!(harness.service.call_count(), calls);
}

#[test]
fn test_rendering_settings_round_trip() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Project, 1));
    harness.expand(key(DataKind::Dataset, 1));
    let kidney = harness.object(CONTAINERS, key(DataKind::Dataset, 2));
    let source = harness.object(CONTAINERS, key(DataKind::Image, 1));
    let project = harness.object(CONTAINERS, key(DataKind::Project, 1));

    assert_eq!(
        harness.viewer.paste_rendering_settings(&[kidney.clone()]).unwrap(),
        CommandOutcome::Rejected(Rejection::NoRenderingSettings)
    );

    harness.viewer.copy_rendering_settings(&source).unwrap();
    assert_eq!(harness.viewer.rendering_source(), Some(ObjectId(1)));
    assert_eq!(
        harness.viewer.paste_rendering_settings(&[project]).unwrap(),
        CommandOutcome::Rejected(Rejection::InvalidSettingsTarget(DataKind::Project))
    );

    harness.viewer.paste_rendering_settings(&[kidney.clone()]).unwrap();
    assert_eq!(harness.viewer.state(), LifecycleState::Saving);
    harness.run();
    assert_eq!(harness.service.rendering_source(ObjectId(3)), Some(ObjectId(1)));

    harness.viewer.reset_rendering_settings(&[kidney]).unwrap();
    harness.run();
    assert_eq!(harness.service.rendering_source(ObjectId(3)), None);
    assert_eq!(harness.notifier.count(MessageLevel::Info), 4);
}

#[test]
fn test_save_create_and_update() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Project, 1));

    let draft = DataObject::new(DataKind::Dataset, 0, "Lung");
    harness
        .viewer
        .save_object(
            draft,
            DataOperation::Create {
                parent: Some(key(DataKind::Project, 1)),
            },
        )
        .unwrap();
    assert_eq!(harness.viewer.state(), LifecycleState::Saving);
    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(
        harness
            .child_keys(CONTAINERS, key(DataKind::Project, 1))
            .contains(&key(DataKind::Dataset, 5))
    );
    assert_eq!(
        harness.editor.snapshot().root.map(|object| object.name),
        Some("Lung".to_string())
    );

    let mut renamed = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    renamed.name = "Triage".to_string();
    harness
        .viewer
        .on_data_object_save(renamed, DataOperation::Update)
        .unwrap();
    assert_eq!(
        harness.object(CONTAINERS, key(DataKind::Dataset, 3)).name,
        "Triage"
    );
}

#[test]
fn test_save_remove_clears_copy_buffer() {
    let mut harness = Harness::ready(no_prompts());
    let unsorted = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    harness
        .viewer
        .set_nodes_to_copy(vec![NodeRef::new(unsorted.clone(), None)], CopyMode::Copy)
        .unwrap();

    harness
        .viewer
        .save_object(unsorted, DataOperation::Remove)
        .unwrap();
    harness.run();

    assert!(harness.nodes(CONTAINERS, key(DataKind::Dataset, 3)).is_empty());
    assert!(!harness.viewer.has_data_to_copy());
    assert!(!harness.service.contains(key(DataKind::Dataset, 3)));
}

#[test]
fn test_switching_user_reloads_scope() {
    let mut harness = Harness::ready(no_prompts());
    let outcome = harness.viewer.set_user(UserId(2)).unwrap();
    assert!(outcome.loader().is_some());
    harness.run();

    assert_eq!(harness.viewer.scope().user, UserId(2));
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Project, 2)).len(), 1);
    assert!(harness.nodes(CONTAINERS, key(DataKind::Project, 1)).is_empty());
    assert_eq!(
        harness.viewer.set_user(UserId(2)).unwrap(),
        CommandOutcome::Completed
    );
}

#[test]
fn test_finder_visibility_and_results() {
    let mut harness = Harness::ready(no_prompts());
    let events = harness.viewer.subscribe();

    harness.viewer.show_finder(true).unwrap();
    harness.viewer.show_finder(true).unwrap();
    assert!(harness.viewer.is_finder_visible());
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![ViewerEvent::FinderVisibilityChanged(true)]
    );

    let unsorted = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    harness
        .viewer
        .set_search_results(vec![unsorted.clone()])
        .unwrap();
    assert_eq!(harness.viewer.search_results(), &[unsorted]);

    harness.viewer.refresh_tree().unwrap();
    assert!(harness.viewer.search_results().is_empty());
    // Visibility can change while busy
    harness.viewer.show_finder(false).unwrap();
}

#[test]
fn test_browser_expansion_does_not_block_viewer() {
    let mut harness = Harness::ready(no_prompts());
    let project = harness.node(CONTAINERS, key(DataKind::Project, 1));

    let outcome = harness.viewer.expand_node(CONTAINERS, project).unwrap();
    assert!(outcome.loader().is_some());
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());

    harness.viewer.cancel();
    assert_eq!(harness.run(), 0);
    assert!(harness.child_keys(CONTAINERS, key(DataKind::Project, 1)).is_empty());
}

#[test]
fn test_reselecting_unloaded_default_browser_loads_roots() {
    let mut harness = Harness::new(no_prompts());
    harness.viewer.activate().unwrap();
    assert!(!harness.viewer.browser(CONTAINERS).unwrap().roots_loaded());

    let outcome = harness.viewer.set_selected_browser(CONTAINERS).unwrap();
    assert!(outcome.loader().is_some());
    assert_eq!(harness.viewer.state(), LifecycleState::LoadingData);
    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.browser(CONTAINERS).unwrap().roots_loaded());
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Project, 1)).len(), 1);
    assert_eq!(
        harness.viewer.set_selected_browser(CONTAINERS).unwrap(),
        CommandOutcome::Completed
    );
}

#[test]
fn test_unrelated_save_keeps_pending_delete() {
    let confirm = ScriptedConfirm::new([Answer::Yes, Answer::No]);
    let mut harness = Harness::ready(confirm);
    let unsorted = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    harness.viewer.delete_objects(&[unsorted]).unwrap();
    let pending = harness.viewer.pending_loader();
    assert!(pending.is_some());

    let mut renamed = harness.object(CONTAINERS, key(DataKind::Project, 1));
    renamed.name = "Tissue atlas".to_string();
    harness
        .viewer
        .on_data_object_save(renamed, DataOperation::Update)
        .unwrap();

    assert_eq!(harness.viewer.state(), LifecycleState::Saving);
    assert_eq!(harness.viewer.pending_loader(), pending);
    assert_eq!(
        harness.object(CONTAINERS, key(DataKind::Project, 1)).name,
        "Tissue atlas"
    );

    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(!harness.service.contains(key(DataKind::Dataset, 3)));
    assert!(harness.nodes(CONTAINERS, key(DataKind::Dataset, 3)).is_empty());
}

#[test]
fn test_matching_save_finishes_pending_update() {
    let mut harness = Harness::ready(no_prompts());
    let mut renamed = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    renamed.name = "Triage".to_string();
    harness
        .viewer
        .save_object(renamed.clone(), DataOperation::Update)
        .unwrap();
    assert_eq!(harness.viewer.state(), LifecycleState::Saving);

    harness
        .viewer
        .on_data_object_save(renamed, DataOperation::Update)
        .unwrap();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    assert_eq!(
        harness.object(CONTAINERS, key(DataKind::Dataset, 3)).name,
        "Triage"
    );
    assert_eq!(harness.run(), 0);
}

#[test]
fn test_thumbnails_for_unloaded_container_are_rejected() {
    let mut harness = Harness::ready(no_prompts());
    let unsorted = harness.node(CONTAINERS, key(DataKind::Dataset, 3));
    let calls = harness.service.call_count();

    let outcome = harness.viewer.retrieve_thumbnails(CONTAINERS, unsorted).unwrap();

    assert_eq!(outcome, CommandOutcome::Rejected(Rejection::ContentsNotLoaded));
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    assert_eq!(harness.service.call_count(), calls);
    assert_eq!(harness.notifier.count(MessageLevel::Info), 1);

    harness.expand(key(DataKind::Dataset, 3));
    let unsorted = harness.node(CONTAINERS, key(DataKind::Dataset, 3));
    let outcome = harness.viewer.retrieve_thumbnails(CONTAINERS, unsorted).unwrap();
    assert!(outcome.loader().is_some());
    harness.run();

    let image = harness.node(CONTAINERS, key(DataKind::Image, 4));
    let browser = harness.viewer.browser(CONTAINERS).unwrap();
    assert!(browser.node(image).unwrap().thumbnail.is_some());
}

#[test]
fn test_failed_paste_leaves_trees_unchanged() {
    let mut harness = Harness::ready(no_prompts());
    harness.expand(key(DataKind::Dataset, 3));
    harness.expand(key(DataKind::Project, 1));
    harness.expand(key(DataKind::Dataset, 2));

    let image = harness.object(CONTAINERS, key(DataKind::Image, 4));
    let kidney = harness.object(CONTAINERS, key(DataKind::Dataset, 2));
    harness
        .viewer
        .set_nodes_to_copy(
            vec![NodeRef::new(image, Some(key(DataKind::Dataset, 3)))],
            CopyMode::Cut,
        )
        .unwrap();
    harness.service.fail_next("write refused");

    harness.viewer.paste(&[kidney]).unwrap();
    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    assert!(!harness.viewer.has_data_to_copy());
    assert_eq!(harness.notifier.count(MessageLevel::Error), 1);
    assert_eq!(
        harness.child_keys(CONTAINERS, key(DataKind::Dataset, 3)),
        vec![key(DataKind::Image, 4)]
    );
    assert!(
        !harness
            .child_keys(CONTAINERS, key(DataKind::Dataset, 2))
            .contains(&key(DataKind::Image, 4))
    );
    let cut_node = harness.node(CONTAINERS, key(DataKind::Image, 4));
    assert!(
        !harness
            .viewer
            .browser(CONTAINERS)
            .unwrap()
            .node(cut_node)
            .unwrap()
            .cut
    );
    assert_eq!(
        harness.service.parents_of(key(DataKind::Image, 4)),
        vec![key(DataKind::Dataset, 3)]
    );
}

#[test]
fn test_failed_delete_keeps_nodes() {
    let confirm = ScriptedConfirm::new([Answer::Yes, Answer::Yes]);
    let mut harness = Harness::ready(confirm);
    harness.expand(key(DataKind::Dataset, 3));
    let unsorted = harness.object(CONTAINERS, key(DataKind::Dataset, 3));
    harness.service.fail_next("write refused");

    harness.viewer.delete_objects(&[unsorted]).unwrap();
    harness.run();

    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    assert_eq!(harness.notifier.count(MessageLevel::Error), 1);
    assert!(harness.service.contains(key(DataKind::Dataset, 3)));
    assert!(harness.service.contains(key(DataKind::Image, 4)));
    assert_eq!(harness.nodes(CONTAINERS, key(DataKind::Dataset, 3)).len(), 1);
    assert_eq!(
        harness.child_keys(CONTAINERS, key(DataKind::Dataset, 3)),
        vec![key(DataKind::Image, 4)]
    );
}

#[test]
fn test_failed_expansion_leaves_viewer_ready() {
    let mut harness = Harness::ready(no_prompts());
    let project = harness.node(CONTAINERS, key(DataKind::Project, 1));
    harness.service.fail_next("connection reset");

    let outcome = harness.viewer.expand_node(CONTAINERS, project).unwrap();
    assert!(outcome.loader().is_some());
    harness.run();

    let browser = harness.viewer.browser(CONTAINERS).unwrap();
    assert_eq!(harness.viewer.state(), LifecycleState::Ready);
    assert!(harness.viewer.pending_loader().is_none());
    assert_eq!(browser.pending_loads(), 0);
    assert!(!browser.node(project).unwrap().children_loaded);
    assert!(browser.tree().children(project).is_empty());
    assert_eq!(harness.notifier.count(MessageLevel::Error), 1);

    // A later expansion retries
    harness.expand(key(DataKind::Project, 1));
    assert_eq!(harness.child_keys(CONTAINERS, key(DataKind::Project, 1)).len(), 2);
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Refresh,
    SelectFirst,
    BrowseFirst,
    ExpandFirst,
    Copy,
    PasteIntoFirst,
    Thumbnails,
    SwitchBrowser(usize),
    Cancel,
    RunOne,
    RunAll,
    Drain,
    FailNext,
}

fn command() -> impl Strategy<Value = Command> {
    prop_oneof![
        Just(Command::Refresh),
        Just(Command::SelectFirst),
        Just(Command::BrowseFirst),
        Just(Command::ExpandFirst),
        Just(Command::Copy),
        Just(Command::PasteIntoFirst),
        Just(Command::Thumbnails),
        (0..6usize).prop_map(Command::SwitchBrowser),
        Just(Command::Cancel),
        Just(Command::RunOne),
        Just(Command::RunAll),
        Just(Command::Drain),
        Just(Command::FailNext),
    ]
}

fn apply(harness: &mut Harness, command: Command) {
    let kind = harness.viewer.selected_browser().unwrap_or(CONTAINERS);
    let first = harness
        .viewer
        .browser(kind)
        .and_then(|browser| browser.tree().roots().first().copied());
    let first_object = first.and_then(|id| {
        harness
            .viewer
            .browser(kind)
            .and_then(|browser| browser.node(id))
            .map(|node| node.object.clone())
    });

    // Refusals are expected here; only the invariants matter
    match command {
        Command::Refresh => {
            let _ = harness.viewer.refresh_tree();
        }
        Command::SelectFirst => {
            if let Some(id) = first {
                let _ = harness.viewer.select_nodes(kind, &[id]);
            }
        }
        Command::BrowseFirst => {
            if let Some(id) = first {
                let _ = harness.viewer.browse(kind, id);
            }
        }
        Command::ExpandFirst => {
            if let Some(id) = first {
                let _ = harness.viewer.expand_node(kind, id);
            }
        }
        Command::Copy => {
            let _ = harness.viewer.copy_selection(CopyMode::Copy);
        }
        Command::PasteIntoFirst => {
            if let Some(object) = first_object {
                let _ = harness.viewer.paste(&[object]);
            }
        }
        Command::Thumbnails => {
            if let Some(id) = first {
                let _ = harness.viewer.retrieve_thumbnails(kind, id);
            }
        }
        Command::SwitchBrowser(index) => {
            let _ = harness.viewer.set_selected_browser(BrowserKind::all()[index]);
        }
        Command::Cancel => harness.viewer.cancel(),
        Command::RunOne => {
            harness.executor.run_next();
        }
        Command::RunAll => {
            harness.executor.run_all();
        }
        Command::Drain => {
            harness.viewer.process_pending();
        }
        Command::FailNext => harness.service.fail_next("unavailable"),
    }
}

proptest! {
    #[test]
    fn prop_single_flight_and_recovery(commands in prop::collection::vec(command(), 1..40)) {
        let mut harness = Harness::new(no_prompts().with_fallback(Answer::Yes));
        harness.viewer.activate().unwrap();

        for command in commands {
            apply(&mut harness, command);
            let state = harness.viewer.state();
            prop_assert_eq!(harness.viewer.pending_loader().is_some(), state.is_busy());
        }

        harness.run();
        prop_assert_eq!(harness.viewer.state(), LifecycleState::Ready);
        prop_assert!(harness.viewer.pending_loader().is_none());
    }
}
