/// Property tests for assignment eligibility
/// The eligibility predicate is the single definition shared by the
/// decision engine, the aggregator, and both storage backends.
use chrono::{Duration, Utc};
use proptest::prelude::*;
use warden_domain::{
    entities::RoleAssignment,
    value_objects::{CompanyId, ProjectId, RoleId, UserId},
};

fn assignment() -> RoleAssignment {
    RoleAssignment::new(UserId::new(), RoleId::new(), CompanyId::new())
}

proptest! {
    /// Eligibility is the conjunction of active, unexpired, and in-scope;
    /// flipping any single dimension to false kills eligibility.
    #[test]
    fn prop_eligibility_is_conjunction(
        active in any::<bool>(),
        expiry_offset_hours in -720i64..720,
        has_expiry in any::<bool>(),
        scoped in any::<bool>(),
        request_matches in any::<bool>(),
        request_has_project in any::<bool>(),
    ) {
        let now = Utc::now();
        let assignment_project = ProjectId::new();
        let other_project = ProjectId::new();

        let mut a = assignment();
        a.is_active = active;
        if has_expiry {
            a.expires_at = Some(now + Duration::hours(expiry_offset_hours));
        }
        if scoped {
            a.project_id = Some(assignment_project);
        }

        let request_project = if !request_has_project {
            None
        } else if request_matches {
            Some(assignment_project)
        } else {
            Some(other_project)
        };

        let expect_active = active;
        let expect_unexpired = !has_expiry || expiry_offset_hours > 0;
        // A missing request project matches everything; a company-wide
        // assignment matches everything; otherwise projects must agree.
        let expect_in_scope = !request_has_project || !scoped || request_matches;

        let expected = expect_active && expect_unexpired && expect_in_scope;
        prop_assert_eq!(a.is_eligible(request_project.as_ref(), now), expected);
    }

    /// A company-wide assignment is eligible for every project.
    #[test]
    fn prop_company_wide_matches_every_project(request_has_project in any::<bool>()) {
        let a = assignment();
        let project = request_has_project.then(ProjectId::new);
        prop_assert!(a.is_eligible(project.as_ref(), Utc::now()));
    }

    /// Expiry exactly at or before `now` behaves identically to an
    /// absent assignment.
    #[test]
    fn prop_past_expiry_never_eligible(age_hours in 0i64..1000) {
        let now = Utc::now();
        let a = assignment().with_expiry(now - Duration::hours(age_hours));
        prop_assert!(!a.is_eligible(None, now));
    }
}
