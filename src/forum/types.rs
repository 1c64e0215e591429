//! Type definitions for the Forum module

use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

use crate::types::{CourseId, Timestamp};

// =============================================================================
// ID Type Aliases
// =============================================================================

pub type ForumId = u64;
pub type TopicId = u64;
pub type PostId = u64;
pub type VideoId = u64;

// =============================================================================
// Forum Types
// =============================================================================

/// A course forum, grouping forum topics
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct Forum {
    pub id: ForumId,
    pub course_id: CourseId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
}

/// What a topic is attached to.
///
/// Forum topics live in a forum and carry their own title. Video topics are
/// comment threads anchored at a point of a course video.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub enum TopicKind {
    Forum { forum_id: ForumId, title: String },
    Video { video_id: VideoId, timestamp_secs: u32 },
}

/// Discussion topic
///
/// A topic is created together with its first post and is never left
/// without posts.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct Topic {
    pub id: TopicId,
    pub course_id: CourseId,
    pub kind: TopicKind,
    /// Post IDs in creation order
    pub post_ids: Vec<PostId>,
    pub creator: Principal,
    /// Locked topics accept no new posts
    pub locked: bool,
    /// Hidden topics are only listed for staff
    pub hidden: bool,
    pub created_at: Timestamp,
}

impl Topic {
    pub fn forum_id(&self) -> Option<ForumId> {
        match &self.kind {
            TopicKind::Forum { forum_id, .. } => Some(*forum_id),
            TopicKind::Video { .. } => None,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            TopicKind::Forum { title, .. } => Some(title),
            TopicKind::Video { .. } => None,
        }
    }
}

/// Post in a topic, immutable once created
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct Post {
    pub id: PostId,
    pub topic_id: TopicId,
    pub creator: Principal,
    pub text: String,
    pub created_at: Timestamp,
}

/// Record that a user has seen a post. Absence means unread.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ReadMark {
    pub user: Principal,
    pub post_id: PostId,
    pub read_at: Timestamp,
}

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct CreateForumArgs {
    pub course_id: CourseId,
    pub name: String,
    pub description: Option<String>,
}

/// Arguments for starting a topic; `text` becomes the first post
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct CreateTopicArgs {
    pub course_id: CourseId,
    pub kind: TopicKind,
    pub text: String,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct CreatePostArgs {
    pub topic_id: TopicId,
    pub text: String,
}

/// Topic summary as listed on a forum index page
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct TopicSummary {
    pub topic: Topic,
    pub post_count: u64,
    pub unread: bool,
    pub unread_posts: u64,
    pub subscribed: bool,
}

/// One page of a topic as seen by a user
///
/// `newly_read` lists the posts of this page that were unread before the
/// view; the client highlights them.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug)]
pub struct TopicView {
    pub topic: Topic,
    pub posts: Vec<Post>,
    pub newly_read: Vec<PostId>,
    pub total_posts: u64,
    pub offset: u64,
}
