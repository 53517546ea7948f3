//! Search predicates for each listing endpoint

use chrono::NaiveDate;
use uuid::Uuid;

use super::error::FilterError;
use super::filter::Filter;
use super::types::{Page, SortDirection};
use crate::api::courses::SearchCourseRequest;
use crate::api::subjects::SearchSubjectRequest;
use crate::api::user_courses::SearchUserCourseRequest;
use crate::api::users::SearchUserRequest;
use crate::database::models::{Course, Subject, User, UserCourse};

pub fn users(request: &SearchUserRequest, birth_date: Option<NaiveDate>) -> Result<Filter, FilterError> {
    let mut filter = Filter::new(User::TABLE)?
        .like_if_present("username", &request.username)
        .like_if_present("email", &request.email)
        .like_if_present("phone_number", &request.phone_number)
        .eq_if_nonzero("grade_level", request.grade_level);
    if let Some(date) = birth_date {
        filter = filter.eq("birth_date", date);
    }
    filter
        .order("created_at", SortDirection::Desc)
        .paginate(Page::new(request.page, request.size))
}

pub fn subjects(request: &SearchSubjectRequest) -> Result<Filter, FilterError> {
    Filter::new(Subject::TABLE)?
        .like_if_present("subject_name", &request.subject_name)
        .order("created_at", SortDirection::Desc)
        .paginate(Page::new(request.page, request.size))
}

pub fn courses(request: &SearchCourseRequest) -> Result<Filter, FilterError> {
    Filter::new(Course::TABLE)?
        .like_if_present("course_name", &request.course_name)
        .eq_uuid_if_valid("subject_id", &request.subject_id)
        .eq_if_nonzero("grade_level", request.grade_level)
        .order("created_at", SortDirection::Desc)
        .paginate(Page::new(request.page, request.size))
}

/// Grants, optionally narrowed by user, course, or the course's subject.
/// `owner` forces the user condition regardless of the request.
pub fn user_courses(request: &SearchUserCourseRequest, owner: Option<Uuid>) -> Result<Filter, FilterError> {
    let mut filter = Filter::new(UserCourse::TABLE)?;
    filter = match owner {
        Some(user_id) => filter.eq("user_id", user_id),
        None => filter.eq_uuid_if_valid("user_id", &request.user_id),
    };
    filter = filter.eq_uuid_if_valid("course_id", &request.course_id);

    match Uuid::parse_str(&request.subject_id) {
        Ok(subject_id) => {
            filter = filter
                .join(Course::TABLE, "courses.id", "users_courses.course_id")
                .eq("courses.subject_id", subject_id);
        }
        Err(_) if !request.subject_id.is_empty() => {
            tracing::debug!("Ignoring malformed identifier filter subject_id={}", request.subject_id);
        }
        Err(_) => {}
    }

    filter
        .order_nulls_last("accessed_at", SortDirection::Desc)
        .paginate(Page::new(request.page, request.size))
}
