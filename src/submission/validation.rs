//! Validation logic for the Submission module

use super::types::*;
use crate::error::{CourseError, Result};
use crate::forum::validation::validate_title;
use crate::types::CanisterConfig;

/// Validate a workflow transition
pub fn validate_transition(current: WorkflowState, target: WorkflowState) -> Result<()> {
    use WorkflowState::{Attempting, Graded, Submitted, Unstarted};

    match (current, target) {
        (Unstarted, Attempting) => Ok(()),
        (Attempting, Submitted) => Ok(()),
        (Submitted, Graded) => Ok(()),
        // Unsubmit
        (Submitted, Attempting) | (Graded, Attempting) => Ok(()),
        (from, to) => Err(CourseError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }),
    }
}

/// Validate a grade against the assessment's maximum
pub fn validate_grade(grade: f64, assessment: &Assessment) -> Result<()> {
    if !grade.is_finite() || grade < 0.0 {
        return Err(CourseError::Validation("Grade must be a non-negative number".to_string()));
    }
    if grade > assessment.maximum_grade {
        return Err(CourseError::Validation(format!(
            "Grade exceeds the maximum of {:.1}",
            assessment.maximum_grade
        )));
    }
    Ok(())
}

/// Validate assessment creation arguments
pub fn validate_create_assessment(args: &CreateAssessmentArgs, config: &CanisterConfig) -> Result<()> {
    validate_title(&args.title, config)?;

    if !args.maximum_grade.is_finite() || args.maximum_grade < 0.0 {
        return Err(CourseError::Validation(
            "Maximum grade must be a non-negative number".to_string(),
        ));
    }
    if let Some(max_posts) = args.max_forum_posts {
        if max_posts > config.max_forum_posts_cap {
            return Err(CourseError::Validation(format!(
                "At most {} forum posts can be required",
                config.max_forum_posts_cap
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowState::*;

    #[test]
    fn test_forward_transitions() {
        assert!(validate_transition(Unstarted, Attempting).is_ok());
        assert!(validate_transition(Attempting, Submitted).is_ok());
        assert!(validate_transition(Submitted, Graded).is_ok());
    }

    #[test]
    fn test_unsubmit_transitions() {
        assert!(validate_transition(Submitted, Attempting).is_ok());
        assert!(validate_transition(Graded, Attempting).is_ok());
    }

    #[test]
    fn test_skips_and_regressions_rejected() {
        assert!(validate_transition(Unstarted, Submitted).is_err());
        assert!(validate_transition(Attempting, Graded).is_err());
        assert!(validate_transition(Graded, Submitted).is_err());
        assert!(validate_transition(Attempting, Unstarted).is_err());
        assert_eq!(
            validate_transition(Graded, Graded),
            Err(CourseError::InvalidTransition {
                from: "graded".to_string(),
                to: "graded".to_string(),
            })
        );
    }

    #[test]
    fn test_grade_bounds() {
        let assessment = Assessment {
            id: 1,
            course_id: 1,
            title: "Quiz".to_string(),
            maximum_grade: 10.0,
            password_protected: false,
            max_forum_posts: 0,
            created_at: 0,
        };
        assert!(validate_grade(0.0, &assessment).is_ok());
        assert!(validate_grade(10.0, &assessment).is_ok());
        assert!(validate_grade(10.5, &assessment).is_err());
        assert!(validate_grade(-1.0, &assessment).is_err());
        assert!(validate_grade(f64::NAN, &assessment).is_err());
    }

    #[test]
    fn test_forum_post_cap() {
        let config = CanisterConfig::default();
        let args = CreateAssessmentArgs {
            course_id: 1,
            title: "Reflection".to_string(),
            maximum_grade: 5.0,
            password_protected: None,
            max_forum_posts: Some(config.max_forum_posts_cap + 1),
        };
        assert!(validate_create_assessment(&args, &config).is_err());
    }
}
