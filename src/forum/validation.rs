//! Validation logic for the Forum module

use super::types::*;
use crate::error::{CourseError, Result};
use crate::types::CanisterConfig;

/// Validate a forum, course or topic title
pub fn validate_title(title: &str, config: &CanisterConfig) -> Result<()> {
    if title.trim().is_empty() {
        return Err(CourseError::Validation("Title cannot be empty".to_string()));
    }
    if title.chars().count() > config.max_title_len {
        return Err(CourseError::Validation(format!(
            "Title too long (max {} characters)",
            config.max_title_len
        )));
    }
    Ok(())
}

/// Validate post text
pub fn validate_post_text(text: &str, config: &CanisterConfig) -> Result<()> {
    if text.trim().is_empty() {
        return Err(CourseError::Validation("Post cannot be empty".to_string()));
    }
    if text.len() > config.max_post_len {
        return Err(CourseError::Validation(format!(
            "Post too long (max {} bytes)",
            config.max_post_len
        )));
    }
    Ok(())
}

/// Validate the arguments for starting a topic
pub fn validate_create_topic(args: &CreateTopicArgs, config: &CanisterConfig) -> Result<()> {
    if let TopicKind::Forum { title, .. } = &args.kind {
        validate_title(title, config)?;
    }
    validate_post_text(&args.text, config)
}
