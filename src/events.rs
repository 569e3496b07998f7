//! Typed change notifications published by the viewer
//!
//! Subscribers get their own `Receiver`; a subscriber that drops it is
//! forgotten on the next publish.

use crate::browser::BrowserKind;
use crate::viewer::LifecycleState;
use std::sync::mpsc::{self, Receiver, Sender};

/// Something observable changed in a viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerEvent {
    StateChanged {
        from: LifecycleState,
        to: LifecycleState,
    },
    SelectedBrowserChanged {
        previous: Option<BrowserKind>,
        current: BrowserKind,
    },
    FinderVisibilityChanged(bool),
    BrowserDisplayChanged {
        kind: BrowserKind,
        displayed: bool,
    },
}

/// Publish/subscribe channel fan-out
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<ViewerEvent>>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<ViewerEvent> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    pub fn publish(&mut self, event: &ViewerEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
