//! Draft selection state for the forum post selection dialog
//!
//! The buffer starts from the committed selection, takes toggles while
//! Open, and is frozen once committed or discarded. Rendering is a
//! projection of the buffer (see `entries` and `selection::view`).

use std::collections::BTreeSet;
use thiserror::Error;

use super::types::*;
use crate::forum::PostId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("You have already selected the max number of posts allowed ({max}).")]
    Limit { max: usize },
    #[error("This selection was already {0}")]
    Closed(SelectionStatus),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SelectionBuffer {
    initial: Vec<PostRef>,
    selected: Vec<PostRef>,
    max: usize,
    status: SelectionStatus,
}

fn id_set(entries: &[PostRef]) -> BTreeSet<PostId> {
    entries.iter().map(|e| e.post_id).collect()
}

impl SelectionBuffer {
    /// Open a buffer seeded with the currently committed selection
    pub fn open(initial: Vec<PostRef>, max: usize) -> Self {
        Self {
            selected: initial.clone(),
            initial,
            max,
            status: SelectionStatus::Open,
        }
    }

    pub fn initial(&self) -> &[PostRef] {
        &self.initial
    }

    pub fn selected(&self) -> &[PostRef] {
        &self.selected
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn status(&self) -> SelectionStatus {
        self.status
    }

    pub fn is_selected(&self, post_id: PostId) -> bool {
        self.selected.iter().any(|e| e.post_id == post_id)
    }

    fn ensure_open(&self) -> Result<(), SelectionError> {
        match self.status {
            SelectionStatus::Open => Ok(()),
            closed => Err(SelectionError::Closed(closed)),
        }
    }

    /// Remove the entry if selected, otherwise append it.
    ///
    /// Appending past `max` fails with `Limit` and leaves the selection as
    /// it was.
    pub fn toggle(&mut self, entry: PostRef) -> Result<(), SelectionError> {
        self.ensure_open()?;

        if self.is_selected(entry.post_id) {
            self.selected.retain(|e| e.post_id != entry.post_id);
            return Ok(());
        }
        if self.selected.len() >= self.max {
            return Err(SelectionError::Limit { max: self.max });
        }
        self.selected.push(entry);
        Ok(())
    }

    /// Whether the selected ids differ from `initial`, ignoring order
    pub fn has_changes(&self, initial: &[PostRef]) -> bool {
        id_set(&self.selected) != id_set(initial)
    }

    /// Freeze the buffer and hand back its entries in selection order
    pub fn commit(&mut self) -> Result<Vec<PostRef>, SelectionError> {
        self.ensure_open()?;
        self.status = SelectionStatus::Committed;
        Ok(self.selected.clone())
    }

    pub fn discard(&mut self) -> Result<(), SelectionError> {
        self.ensure_open()?;
        self.status = SelectionStatus::Discarded;
        Ok(())
    }

    /// Candidates with their draft inclusion flag
    pub fn entries(&self, candidates: &[PostRef]) -> Vec<BufferEntry> {
        candidates
            .iter()
            .map(|&post| BufferEntry {
                post,
                included: self.is_selected(post.post_id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: PostId) -> PostRef {
        PostRef {
            post_id: id,
            topic_id: 100 + id,
            forum_id: 1,
        }
    }

    const A: PostId = 1;
    const B: PostId = 2;
    const C: PostId = 3;

    fn ids(buffer: &SelectionBuffer) -> Vec<PostId> {
        buffer.selected().iter().map(|e| e.post_id).collect()
    }

    #[test]
    fn test_limit_scenario() {
        let mut buffer = SelectionBuffer::open(vec![post(A)], 2);

        buffer.toggle(post(B)).unwrap();
        assert_eq!(ids(&buffer), vec![A, B]);

        assert_eq!(buffer.toggle(post(C)), Err(SelectionError::Limit { max: 2 }));
        assert_eq!(ids(&buffer), vec![A, B]);

        buffer.toggle(post(A)).unwrap();
        assert_eq!(ids(&buffer), vec![B]);
    }

    #[test]
    fn test_toggle_twice_restores_selection() {
        let mut buffer = SelectionBuffer::open(vec![post(A)], 3);
        let before = buffer.selected().to_vec();

        buffer.toggle(post(B)).unwrap();
        buffer.toggle(post(B)).unwrap();
        assert_eq!(buffer.selected(), before.as_slice());

        buffer.toggle(post(A)).unwrap();
        buffer.toggle(post(A)).unwrap();
        assert_eq!(ids(&buffer), vec![A]);
    }

    #[test]
    fn test_each_rejected_add_signals_once() {
        let mut buffer = SelectionBuffer::open(vec![post(A)], 1);
        let errors = [post(B), post(C)]
            .into_iter()
            .filter(|&p| buffer.toggle(p).is_err())
            .count();
        assert_eq!(errors, 2);
        assert_eq!(ids(&buffer), vec![A]);
    }

    #[test]
    fn test_zero_max_rejects_everything() {
        let mut buffer = SelectionBuffer::open(vec![], 0);
        assert!(buffer.toggle(post(A)).is_err());
        assert!(buffer.selected().is_empty());
    }

    #[test]
    fn test_has_changes_ignores_order() {
        let initial = vec![post(A), post(B)];
        let mut buffer = SelectionBuffer::open(initial.clone(), 3);
        assert!(!buffer.has_changes(&initial));

        buffer.toggle(post(A)).unwrap();
        buffer.toggle(post(A)).unwrap();
        // Now [B, A]
        assert_eq!(ids(&buffer), vec![B, A]);
        assert!(!buffer.has_changes(&initial));

        buffer.toggle(post(C)).unwrap();
        assert!(buffer.has_changes(&initial));
    }

    #[test]
    fn test_commit_freezes_buffer() {
        let mut buffer = SelectionBuffer::open(vec![], 2);
        buffer.toggle(post(B)).unwrap();
        buffer.toggle(post(A)).unwrap();

        assert_eq!(buffer.commit().unwrap(), vec![post(B), post(A)]);
        assert_eq!(buffer.status(), SelectionStatus::Committed);
        assert_eq!(
            buffer.toggle(post(C)),
            Err(SelectionError::Closed(SelectionStatus::Committed))
        );
        assert!(buffer.discard().is_err());
        assert_eq!(ids(&buffer), vec![B, A]);
    }

    #[test]
    fn test_discard_is_terminal() {
        let mut buffer = SelectionBuffer::open(vec![post(A)], 2);
        buffer.discard().unwrap();

        assert_eq!(buffer.status(), SelectionStatus::Discarded);
        assert!(buffer.commit().is_err());
        assert!(buffer.toggle(post(B)).is_err());
    }

    #[test]
    fn test_entries_project_inclusion() {
        let buffer = SelectionBuffer::open(vec![post(B)], 2);
        let entries = buffer.entries(&[post(A), post(B)]);
        assert_eq!(
            entries,
            vec![
                BufferEntry { post: post(A), included: false },
                BufferEntry { post: post(B), included: true },
            ]
        );
    }

    #[test]
    fn test_limit_message() {
        let err = SelectionError::Limit { max: 2 };
        assert_eq!(
            err.to_string(),
            "You have already selected the max number of posts allowed (2)."
        );
    }
}
