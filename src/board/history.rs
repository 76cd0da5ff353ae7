//! Recently-viewed history.
//!
//! A duplicate-free, insertion-ordered sequence of task ids with the most
//! recently viewed id last. Backed by a doubly-linked arena: the links live
//! in a `HashMap<TaskId, Node>`, so append, move-to-end and remove-by-id are
//! all O(1) regardless of position. A plain ordered container would make
//! remove-by-id O(n), which is exactly what this structure exists to avoid.
//!
//! No capacity is enforced; bounding the history is a caller policy.

use std::collections::HashMap;

use crate::task::TaskId;

#[derive(Debug, Clone, Copy)]
struct Node {
    prev: Option<TaskId>,
    next: Option<TaskId>,
}

/// Ordered record of recently accessed items.
#[derive(Debug, Default)]
pub struct ViewHistory {
    nodes: HashMap<TaskId, Node>,
    head: Option<TaskId>,
    tail: Option<TaskId>,
}

impl ViewHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an id to the end of the sequence.
    ///
    /// If the id is already present its old entry is removed first, so the id
    /// moves to the most-recently-viewed position and never duplicates.
    pub fn record_view(&mut self, id: TaskId) {
        self.unlink(id);

        let prev = self.tail;
        self.nodes.insert(id, Node { prev, next: None });
        match prev {
            Some(tail_id) => {
                if let Some(tail) = self.nodes.get_mut(&tail_id) {
                    tail.next = Some(id);
                }
            }
            None => self.head = Some(id),
        }
        self.tail = Some(id);
    }

    /// Remove an id from anywhere in the sequence. Absent ids are a no-op.
    pub fn remove(&mut self, id: TaskId) {
        self.unlink(id);
    }

    /// Ids in view order, oldest first.
    pub fn ids(&self) -> Vec<TaskId> {
        let mut ordered = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(id) = cursor {
            ordered.push(id);
            cursor = self.nodes.get(&id).and_then(|node| node.next);
        }
        ordered
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    fn unlink(&mut self, id: TaskId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        match node.prev {
            Some(prev_id) => {
                if let Some(prev) = self.nodes.get_mut(&prev_id) {
                    prev.next = node.next;
                }
            }
            None => self.head = node.next,
        }
        match node.next {
            Some(next_id) => {
                if let Some(next) = self.nodes.get_mut(&next_id) {
                    next.prev = node.prev;
                }
            }
            None => self.tail = node.prev,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_keep_insertion_order() {
        let mut history = ViewHistory::new();
        history.record_view(1);
        history.record_view(2);
        history.record_view(3);
        assert_eq!(history.ids(), vec![1, 2, 3]);
    }

    #[test]
    fn repeat_view_moves_to_end_without_duplicating() {
        let mut history = ViewHistory::new();
        history.record_view(1);
        history.record_view(2);
        history.record_view(3);
        history.record_view(1);
        assert_eq!(history.ids(), vec![2, 3, 1]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn remove_head_middle_and_tail_preserve_remaining_order() {
        let mut history = ViewHistory::new();
        for id in 1..=5 {
            history.record_view(id);
        }
        history.remove(1); // head
        assert_eq!(history.ids(), vec![2, 3, 4, 5]);
        history.remove(4); // middle
        assert_eq!(history.ids(), vec![2, 3, 5]);
        history.remove(5); // tail
        assert_eq!(history.ids(), vec![2, 3]);
    }

    #[test]
    fn remove_absent_id_is_a_noop() {
        let mut history = ViewHistory::new();
        history.record_view(7);
        history.remove(99);
        assert_eq!(history.ids(), vec![7]);
    }

    #[test]
    fn remove_last_entry_empties_the_sequence() {
        let mut history = ViewHistory::new();
        history.record_view(1);
        history.remove(1);
        assert!(history.is_empty());
        assert_eq!(history.ids(), Vec::<TaskId>::new());
        // still usable afterwards
        history.record_view(2);
        assert_eq!(history.ids(), vec![2]);
    }
}
