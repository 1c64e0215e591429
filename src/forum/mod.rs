//! Forum Module
//!
//! Course forums, discussion topics (forum and video topics) and posts,
//! together with per-user read tracking.
//!
//! Key Features:
//! - Topics are created with their first post and deleted with all posts
//! - Idempotent read marks per (user, post)
//! - Viewing a topic page marks the loaded posts as read
//! - Locked and hidden topics, topic subscriptions

pub mod api;
pub mod read_tracker;
pub mod state;
pub mod types;
pub mod validation;

pub use types::{
    CreateForumArgs, CreatePostArgs, CreateTopicArgs, Forum, ForumId, Post, PostId, Topic,
    TopicId, TopicKind, TopicSummary, TopicView,
};
