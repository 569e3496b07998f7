//! Scripted UI doubles for tests and non-interactive runs

use super::error::{Result, UiError};
use super::input::{Answer, ConfirmationPolicy};
use super::output::{MessageLevel, Notification, Notifier};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Confirmation policy answering from a queue
///
/// Every question asked is recorded. Once the queue is empty the fallback
/// answer is used; without a fallback the question fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConfirm {
    answers: Arc<Mutex<VecDeque<Answer>>>,
    asked: Arc<Mutex<Vec<String>>>,
    fallback: Option<Answer>,
}

impl ScriptedConfirm {
    /// Answer with `answers` in order, then fail
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Arc::new(Mutex::new(answers.into_iter().collect())),
            asked: Arc::new(Mutex::new(Vec::new())),
            fallback: None,
        }
    }

    /// Give `answer` once the queue runs out
    #[must_use]
    pub const fn with_fallback(mut self, answer: Answer) -> Self {
        self.fallback = Some(answer);
        self
    }

    /// Questions asked so far, in order
    #[must_use]
    pub fn asked(&self) -> Vec<String> {
        lock(&self.asked).clone()
    }
}

impl ConfirmationPolicy for ScriptedConfirm {
    fn confirm(&self, question: &str) -> Result<Answer> {
        lock(&self.asked).push(question.to_string());
        lock(&self.answers)
            .pop_front()
            .or(self.fallback)
            .ok_or_else(|| UiError::NoAnswer(question.to_string()))
    }
}

/// Notifier that keeps every notification
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Notification> {
        lock(&self.messages).clone()
    }

    #[must_use]
    pub fn count(&self, level: MessageLevel) -> usize {
        lock(&self.messages)
            .iter()
            .filter(|n| n.level == level)
            .count()
    }

    fn push(&self, level: MessageLevel, title: &str, message: &str) {
        lock(&self.messages).push(Notification {
            level,
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}

impl Notifier for RecordingNotifier {
    fn notify_info(&self, title: &str, message: &str) {
        self.push(MessageLevel::Info, title, message);
    }

    fn notify_warning(&self, title: &str, message: &str) {
        self.push(MessageLevel::Warning, title, message);
    }

    fn notify_error(&self, title: &str, message: &str) {
        self.push(MessageLevel::Error, title, message);
    }
}
