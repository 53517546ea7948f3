use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::validation::Validator;
use super::{now_utc, parse_ref, Paged, ServiceError};
use crate::api::user_courses::{
    SearchUserCourseRequest, UserCourseListResponse, UserCourseRequest, UserCourseResponse,
};
use crate::clock::Clock;
use crate::database::models::UserCourse;
use crate::database::{transaction, Store};
use crate::filter::search;

#[derive(Clone)]
pub struct UserCourseService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl UserCourseService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Grant one user access to every listed course, all or nothing.
    /// A course may appear once per request and only if the user does not hold it yet.
    pub async fn create(&self, request: UserCourseRequest) -> Result<Vec<UserCourseResponse>, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                Validator::new().required("user_id", &request.user_id).finish()?;
                if request.course_ids.is_empty() {
                    warn!("No courses provided in grant request");
                    return Ok(vec![]);
                }

                let user_id = parse_ref(&request.user_id, "User")?;
                let user = tx.users().find_by_id(user_id).await?.ok_or_else(|| {
                    warn!("User {} not found for grant", user_id);
                    ServiceError::not_found("User")
                })?;

                let mut grants: Vec<UserCourse> = Vec::with_capacity(request.course_ids.len());
                for raw in &request.course_ids {
                    let course_id = parse_ref(raw, "Course")?;
                    if grants.iter().any(|g| g.course_id == course_id) {
                        Validator::new()
                            .reject("course_ids", format!("Course {} is listed more than once", course_id))
                            .finish()?;
                    }
                    let course = tx.courses().find_by_id(course_id).await?.ok_or_else(|| {
                        warn!("Course {} not found for grant", course_id);
                        ServiceError::not_found("Course")
                    })?;
                    if tx.user_courses().find_by_user_and_course(user_id, course_id).await?.is_some() {
                        warn!("User {} already holds course {}", user_id, course_id);
                        return Err(ServiceError::Conflict(format!("User already has access to course {}", course_id)));
                    }
                    let mut grant = UserCourse::new(user_id, course_id);
                    grant.user = Some(user.clone());
                    grant.course = Some(course);
                    grants.push(grant);
                }

                tx.user_courses().create_batch(&grants).await?;
                Ok(grants.iter().map(UserCourseResponse::from).collect())
            })
        })
        .await
    }

    /// Open a granted course: stamps `accessed_at` with the current time
    pub async fn get(&self, user_id: Uuid, course_id: Uuid) -> Result<UserCourseResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let mut grant = tx
                    .user_courses()
                    .find_by_user_and_course(user_id, course_id)
                    .await?
                    .ok_or_else(|| {
                        warn!("User {} has no grant for course {}", user_id, course_id);
                        ServiceError::not_found("Course")
                    })?;
                grant.accessed_at = Some(now_utc(clock.as_ref()));
                tx.user_courses().update(&grant).await?;
                Ok(UserCourseResponse::from(&grant))
            })
        })
        .await
    }

    /// Grants matching the request; `owner` pins the search to one user
    pub async fn search(
        &self,
        request: SearchUserCourseRequest,
        owner: Option<Uuid>,
    ) -> Result<Paged<UserCourseListResponse>, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                Validator::new().paging(request.page, request.size).finish()?;
                let filter = search::user_courses(&request, owner)?;
                let (grants, total) = tx.user_courses().search(&filter).await?;
                let items = grants.iter().map(UserCourseListResponse::from).collect();
                Ok(Paged::new(items, request.page, request.size, total))
            })
        })
        .await
    }

    pub async fn delete(&self, id: Uuid) -> Result<UserCourseResponse, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let grant = tx.user_courses().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Grant {} not found for delete", id);
                    ServiceError::not_found("User course")
                })?;
                tx.user_courses().delete(id).await?;
                Ok(UserCourseResponse::from(&grant))
            })
        })
        .await
    }
}
