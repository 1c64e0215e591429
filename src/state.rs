use crate::forum::state::{StableForumState, FORUM_STATE};
use crate::submission::state::{StableSubmissionState, SUBMISSION_STATE};
use crate::types::*;
use candid::Principal;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// State structure for the Course Core canister
#[derive(Default)]
pub struct State {
    // Access control
    pub controllers: Vec<Principal>,
    pub config: CanisterConfig,

    // Courses and memberships
    pub courses: BTreeMap<CourseId, Course>,
    pub course_users: BTreeMap<(CourseId, Principal), CourseUser>,
    pub next_course_id: CourseId,
}

impl State {
    pub fn new() -> Self {
        Self {
            controllers: Vec::new(),
            config: CanisterConfig::default(),
            courses: BTreeMap::new(),
            course_users: BTreeMap::new(),
            next_course_id: 1,
        }
    }

    /// Check if a principal is a controller
    pub fn is_controller(&self, principal: &Principal) -> bool {
        self.controllers.contains(principal)
    }

    /// Get list of controllers
    pub fn get_controllers(&self) -> Vec<Principal> {
        self.controllers.clone()
    }

    // =========================================================================
    // Course Operations
    // =========================================================================

    /// Create a course; the creator is enrolled as its owner
    pub fn create_course(
        &mut self,
        owner: Principal,
        request: CreateCourseRequest,
        now: Timestamp,
    ) -> Course {
        let id = self.next_course_id;
        self.next_course_id += 1;

        let course = Course {
            id,
            title: request.title,
            created_by: owner,
            created_at: now,
        };

        self.courses.insert(id, course.clone());
        self.course_users.insert(
            (id, owner),
            CourseUser {
                course_id: id,
                principal: owner,
                name: request.owner_name,
                role: CourseRole::Owner,
                phantom: false,
                joined_at: now,
            },
        );

        course
    }

    pub fn get_course(&self, id: CourseId) -> Option<&Course> {
        self.courses.get(&id)
    }

    /// Enrol or update a course user. Returns the stored record.
    pub fn upsert_course_user(&mut self, request: AddCourseUserRequest, now: Timestamp) -> CourseUser {
        let key = (request.course_id, request.principal);
        let joined_at = self
            .course_users
            .get(&key)
            .map(|existing| existing.joined_at)
            .unwrap_or(now);

        let user = CourseUser {
            course_id: request.course_id,
            principal: request.principal,
            name: request.name,
            role: request.role.unwrap_or_default(),
            phantom: request.phantom.unwrap_or(false),
            joined_at,
        };

        self.course_users.insert(key, user.clone());
        user
    }

    pub fn get_course_user(&self, course_id: CourseId, principal: &Principal) -> Option<&CourseUser> {
        self.course_users.get(&(course_id, *principal))
    }

    /// Role of a principal in a course, `None` if not enrolled
    pub fn course_role(&self, course_id: CourseId, principal: &Principal) -> Option<CourseRole> {
        self.get_course_user(course_id, principal).map(|u| u.role)
    }

    /// All users of a course
    pub fn get_course_users(&self, course_id: CourseId) -> Vec<CourseUser> {
        self.course_users
            .iter()
            .filter(|((cid, _), _)| *cid == course_id)
            .map(|(_, user)| user.clone())
            .collect()
    }

    /// One page of a course's users, ordered by principal
    pub fn get_course_users_page(
        &self,
        course_id: CourseId,
        pagination: PaginationParams,
    ) -> PaginatedResponse<CourseUser> {
        let offset = pagination.offset.unwrap_or(0);
        let limit = pagination.limit.unwrap_or(50).min(100);
        let users = self.get_course_users(course_id);

        PaginatedResponse {
            total: users.len() as u64,
            items: users
                .into_iter()
                .skip(usize::try_from(offset).unwrap_or(usize::MAX))
                .take(usize::try_from(limit).unwrap_or(usize::MAX))
                .collect(),
            offset,
            limit,
        }
    }

    /// Courses the principal is enrolled in
    pub fn get_user_courses(&self, principal: &Principal) -> Vec<Course> {
        self.course_users
            .keys()
            .filter(|(_, p)| p == principal)
            .filter_map(|(course_id, _)| self.courses.get(course_id))
            .cloned()
            .collect()
    }
}

thread_local! {
    pub static STATE: RefCell<State> = RefCell::new(State::new());
}

/// Helper function to access the canister state
pub fn with_state<F, R>(f: F) -> R
where
    F: FnOnce(&State) -> R,
{
    STATE.with(|state| f(&state.borrow()))
}

/// Helper function to mutably access the canister state
pub fn with_state_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut State) -> R,
{
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Serializable state for upgrades
#[derive(candid::CandidType, serde::Deserialize, Clone)]
pub struct StableState {
    pub controllers: Vec<Principal>,
    #[serde(default)]
    pub config: Option<CanisterConfig>,
    pub courses: Vec<(CourseId, Course)>,
    pub course_users: Vec<CourseUser>,
    pub next_course_id: CourseId,
    #[serde(default)]
    pub forum_state: Option<StableForumState>,
    #[serde(default)]
    pub submission_state: Option<StableSubmissionState>,
}

impl From<&State> for StableState {
    fn from(state: &State) -> Self {
        let forum_state = FORUM_STATE.with(|fs| Some(StableForumState::from(&*fs.borrow())));
        let submission_state =
            SUBMISSION_STATE.with(|ss| Some(StableSubmissionState::from(&*ss.borrow())));

        StableState {
            controllers: state.controllers.clone(),
            config: Some(state.config.clone()),
            courses: state.courses.iter().map(|(k, v)| (*k, v.clone())).collect(),
            course_users: state.course_users.values().cloned().collect(),
            next_course_id: state.next_course_id,
            forum_state,
            submission_state,
        }
    }
}

impl From<StableState> for State {
    fn from(stable: StableState) -> Self {
        // Restore module state to thread-locals
        if let Some(fs) = stable.forum_state {
            FORUM_STATE.with(|state| {
                *state.borrow_mut() = fs.into();
            });
        }
        if let Some(ss) = stable.submission_state {
            SUBMISSION_STATE.with(|state| {
                *state.borrow_mut() = ss.into();
            });
        }

        State {
            controllers: stable.controllers,
            config: stable.config.unwrap_or_default(),
            courses: stable.courses.into_iter().collect(),
            course_users: stable
                .course_users
                .into_iter()
                .map(|user| ((user.course_id, user.principal), user))
                .collect(),
            next_course_id: stable.next_course_id,
        }
    }
}
