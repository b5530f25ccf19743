// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded FIFO of pending suggestions.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use pulse_core::issue::IssueKind;
use pulse_core::suggestion::{Suggestion, SuggestionType};
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

/// Result of offering a suggestion to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The suggestion is now pending.
    Queued,
    /// A suggestion with the same type and issue is already pending.
    Duplicate,
    /// The queue is full; the suggestion was discarded.
    Dropped,
}

/// FIFO of pending suggestions, unique per `(type, issue)` pair.
pub struct SuggestionQueue {
    sender: Sender<Suggestion>,
    receiver: Receiver<Suggestion>,
    // Keys of the pending suggestions. Held for writing while the channel is
    // touched so that keys and contents never disagree.
    pending: RwLock<HashSet<(SuggestionType, IssueKind)>>,
}

impl SuggestionQueue {
    /// Creates a queue holding at most `capacity` suggestions (at least one).
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity.max(1));
        Self {
            sender,
            receiver,
            pending: RwLock::new(HashSet::new()),
        }
    }

    /// Offers a suggestion without blocking.
    pub fn push(&self, suggestion: Suggestion) -> QueueOutcome {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        let key = suggestion.dedup_key();
        if pending.contains(&key) {
            return QueueOutcome::Duplicate;
        }

        match self.sender.try_send(suggestion) {
            Ok(()) => {
                pending.insert(key);
                QueueOutcome::Queued
            }
            Err(TrySendError::Full(dropped)) => {
                log::warn!(
                    "Advisor: suggestion queue full, dropping '{}' for {:?}.",
                    dropped.title(),
                    dropped.issue()
                );
                QueueOutcome::Dropped
            }
            Err(TrySendError::Disconnected(_)) => QueueOutcome::Dropped,
        }
    }

    /// Removes the oldest pending suggestion.
    pub fn pop(&self) -> Option<Suggestion> {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        let suggestion = self.receiver.try_recv().ok()?;
        pending.remove(&suggestion.dedup_key());
        Some(suggestion)
    }

    /// Returns `true` if a suggestion for this pair is pending.
    pub fn contains(&self, key: &(SuggestionType, IssueKind)) -> bool {
        self.pending
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.sender.capacity().unwrap_or(0)
    }

    /// Discards every pending suggestion and returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.write().unwrap_or_else(PoisonError::into_inner);
        let removed = self.receiver.try_iter().count();
        pending.clear();
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::context::AnalysisContext;
    use pulse_core::suggestion::SuggestionDraft;
    use std::collections::BTreeMap;

    fn suggestion(suggestion_type: SuggestionType, issue: IssueKind) -> Suggestion {
        Suggestion::new(SuggestionDraft {
            suggestion_type,
            issue,
            context: AnalysisContext::Normal,
            title: suggestion_type.description().to_string(),
            description: String::new(),
            priority: 5,
            difficulty: 1,
            impact: 3,
            estimated_minutes: 1,
            steps: Vec::new(),
            warnings: Vec::new(),
            requirements: Vec::new(),
            related_settings: BTreeMap::new(),
            auto_apply: None,
        })
    }

    #[test]
    fn test_duplicate_keys_are_not_queued_twice() {
        let queue = SuggestionQueue::new(8);
        let a = suggestion(SuggestionType::ReduceParticles, IssueKind::LowFps);
        let b = suggestion(SuggestionType::ReduceParticles, IssueKind::LowFps);
        assert_eq!(queue.push(a), QueueOutcome::Queued);
        assert_eq!(queue.push(b), QueueOutcome::Duplicate);
        assert_eq!(queue.len(), 1);

        // Same type for a different issue is a different key.
        let c = suggestion(SuggestionType::ReduceParticles, IssueKind::CriticalFps);
        assert_eq!(queue.push(c), QueueOutcome::Queued);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fifo_order_and_key_release() {
        let queue = SuggestionQueue::new(8);
        queue.push(suggestion(SuggestionType::ReduceParticles, IssueKind::LowFps));
        queue.push(suggestion(SuggestionType::RestartGame, IssueKind::MemoryLeak));

        let first = queue.pop().unwrap();
        assert_eq!(first.suggestion_type(), SuggestionType::ReduceParticles);
        assert!(!queue.contains(&(SuggestionType::ReduceParticles, IssueKind::LowFps)));

        // Released key can be queued again.
        let again = suggestion(SuggestionType::ReduceParticles, IssueKind::LowFps);
        assert_eq!(queue.push(again), QueueOutcome::Queued);
        assert_eq!(
            queue.pop().unwrap().suggestion_type(),
            SuggestionType::RestartGame
        );
    }

    #[test]
    fn test_full_queue_drops() {
        let queue = SuggestionQueue::new(1);
        queue.push(suggestion(SuggestionType::ReduceParticles, IssueKind::LowFps));
        let outcome = queue.push(suggestion(SuggestionType::RestartGame, IssueKind::MemoryLeak));
        assert_eq!(outcome, QueueOutcome::Dropped);
        assert!(!queue.contains(&(SuggestionType::RestartGame, IssueKind::MemoryLeak)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear() {
        let queue = SuggestionQueue::new(4);
        queue.push(suggestion(SuggestionType::ReduceParticles, IssueKind::LowFps));
        queue.push(suggestion(SuggestionType::RestartGame, IssueKind::MemoryLeak));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
        assert!(queue.pop().is_none());
        assert_eq!(queue.capacity(), 4);
    }
}
