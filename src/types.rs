use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

// =============================================================================
// Common Types
// =============================================================================

pub type CourseId = u64;
pub type Timestamp = u64;

// =============================================================================
// Course Types
// =============================================================================

/// Course record - the tenant boundary for forums and assessments
#[derive(Clone, Debug, CandidType, Deserialize, Serialize)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub created_by: Principal,
    pub created_at: Timestamp,
}

/// Role of a user within a course
#[derive(Clone, Copy, Debug, CandidType, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum CourseRole {
    Student,
    TeachingAssistant,
    Manager,
    Owner,
}

impl Default for CourseRole {
    fn default() -> Self {
        CourseRole::Student
    }
}

impl CourseRole {
    /// Teaching assistants and above
    pub fn is_staff(self) -> bool {
        self >= CourseRole::TeachingAssistant
    }

    /// Managers and owners may administer the whole course
    pub fn is_manager(self) -> bool {
        self >= CourseRole::Manager
    }
}

/// Membership of a principal in a course
#[derive(Clone, Debug, CandidType, Deserialize, Serialize)]
pub struct CourseUser {
    pub course_id: CourseId,
    pub principal: Principal,
    pub name: String,
    pub role: CourseRole,
    /// Phantom users are hidden from course statistics
    pub phantom: bool,
    pub joined_at: Timestamp,
}

/// Request to create a course
#[derive(Clone, Debug, CandidType, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    /// Display name of the creator, who becomes the course owner
    pub owner_name: String,
}

/// Request to enrol a principal in a course
#[derive(Clone, Debug, CandidType, Deserialize)]
pub struct AddCourseUserRequest {
    pub course_id: CourseId,
    pub principal: Principal,
    pub name: String,
    pub role: Option<CourseRole>,
    pub phantom: Option<bool>,
}

// =============================================================================
// Configuration
// =============================================================================

/// Runtime limits, settable by controllers
#[derive(Clone, Debug, CandidType, Deserialize, Serialize, PartialEq)]
pub struct CanisterConfig {
    /// Maximum course, forum and topic title length
    pub max_title_len: usize,
    /// Maximum post text length in bytes
    pub max_post_len: usize,
    /// Posts loaded per topic page view
    pub topic_page_size: u64,
    /// Upper bound for an assessment's forum post limit
    pub max_forum_posts_cap: u32,
}

impl Default for CanisterConfig {
    fn default() -> Self {
        Self {
            max_title_len: 200,
            max_post_len: 10 * 1024,
            topic_page_size: 50,
            max_forum_posts_cap: 10,
        }
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Pagination params
#[derive(Clone, Debug, CandidType, Deserialize)]
pub struct PaginationParams {
    pub offset: Option<u64>,
    pub limit: Option<u64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            offset: Some(0),
            limit: Some(50),
        }
    }
}

/// Paginated response wrapper
#[derive(Clone, Debug, CandidType, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}
