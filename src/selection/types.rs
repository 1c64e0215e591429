//! Type definitions for the Selection module

use candid::CandidType;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::forum::{ForumId, Post, PostId, TopicId};
use crate::submission::SubmissionId;

/// Reference to a forum post chosen for a forum post response
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PostRef {
    pub post_id: PostId,
    pub topic_id: TopicId,
    pub forum_id: ForumId,
}

/// A candidate post with its draft "included" flag
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferEntry {
    pub post: PostRef,
    pub included: bool,
}

/// Lifecycle of a selection dialog. Committed and Discarded are terminal.
#[derive(CandidType, Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionStatus {
    #[default]
    Open,
    Committed,
    Discarded,
}

impl fmt::Display for SelectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionStatus::Open => "open",
            SelectionStatus::Committed => "committed",
            SelectionStatus::Discarded => "discarded",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Dialog View Types
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct SelectablePost {
    pub post: Post,
    pub included: bool,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct TopicPostGroup {
    pub topic_id: TopicId,
    pub title: String,
    pub posts: Vec<SelectablePost>,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct ForumPostGroup {
    pub forum_id: ForumId,
    pub forum_name: String,
    pub topics: Vec<TopicPostGroup>,
    /// Expanded when the dialog opens if it holds an initially selected post
    pub expanded_on_load: bool,
}

/// Everything the post selection dialog renders
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct SelectionView {
    pub submission_id: SubmissionId,
    pub status: SelectionStatus,
    pub selected: Vec<PostRef>,
    pub selected_count: u32,
    pub max_posts: u32,
    /// The confirm button is enabled only when the selection changed
    pub confirm_enabled: bool,
    pub forums: Vec<ForumPostGroup>,
}

/// Result of toggling a post. A rejected toggle carries a notification
/// for the user and an unchanged view.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct ToggleSelectionResponse {
    pub view: SelectionView,
    pub notification: Option<String>,
}
