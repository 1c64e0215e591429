//! Selection Module
//!
//! Forum post responses: a student picks up to `max_forum_posts` of their
//! own forum posts to attach to a submission. Picks are drafted in a
//! `SelectionBuffer` and only reach the submission when committed.

pub mod api;
pub mod buffer;
pub mod state;
pub mod types;
pub mod view;

pub use buffer::{SelectionBuffer, SelectionError};
pub use types::{
    BufferEntry, ForumPostGroup, PostRef, SelectablePost, SelectionStatus, SelectionView,
    ToggleSelectionResponse, TopicPostGroup,
};
