use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::database::Store;
use crate::services::{CourseService, SubjectService, UserCourseService, UserService};
use crate::storage::FileRepository;

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<dyn Store>,
    users: UserService,
    subjects: SubjectService,
    courses: CourseService,
    user_courses: UserCourseService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        files: Arc<dyn FileRepository>,
    ) -> Self {
        let users = UserService::new(store.clone(), clock.clone(), config.security.clone());
        let subjects = SubjectService::new(store.clone(), clock.clone());
        let courses = CourseService::new(store.clone(), clock.clone(), files);
        let user_courses = UserCourseService::new(store.clone(), clock);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                users,
                subjects,
                courses,
                user_courses,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.inner.store
    }

    pub fn users(&self) -> &UserService {
        &self.inner.users
    }

    pub fn subjects(&self) -> &SubjectService {
        &self.inner.subjects
    }

    pub fn courses(&self) -> &CourseService {
        &self.inner.courses
    }

    pub fn user_courses(&self) -> &UserCourseService {
        &self.inner.user_courses
    }
}
