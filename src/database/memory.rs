//! In-process storage driver selected by `memory://`.
//!
//! One transaction runs at a time: `begin` takes the store lock and works on a copy
//! of the tables, `commit` swaps the copy in. Foreign keys, unique emails and
//! cascading deletes mirror the Postgres schema.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Course, Subject, User, UserCourse};
use crate::database::repository::{
    CourseRepository, Repository, Store, SubjectRepository, Transaction, UserCourseRepository, UserRepository,
};
use crate::filter::Filter;

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    subjects: HashMap<Uuid, Subject>,
    courses: HashMap<Uuid, Course>,
    user_courses: HashMap<Uuid, UserCourse>,
}

/// Row counts per table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub users: usize,
    pub subjects: usize,
    pub courses: usize,
    pub user_courses: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed row counts
    pub async fn counts(&self) -> TableCounts {
        let tables = self.tables.lock().await;
        TableCounts {
            users: tables.users.len(),
            subjects: tables.subjects.len(),
            courses: tables.courses.len(),
            user_courses: tables.user_courses.len(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            working,
        }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<Tables>>,
    working: Tables,
}

impl MemoryTransaction {
    fn tables(&mut self) -> Result<&mut Tables, DatabaseError> {
        if self.guard.is_none() {
            return Err(DatabaseError::TransactionClosed);
        }
        Ok(&mut self.working)
    }
}

impl Tables {
    fn course_with_subject(&self, course: &Course) -> Course {
        let mut course = course.clone();
        course.subject = self.subjects.get(&course.subject_id).cloned();
        course
    }

    fn grant_with_relations(&self, grant: &UserCourse) -> UserCourse {
        let mut grant = grant.clone();
        grant.user = self.users.get(&grant.user_id).cloned();
        grant.course = self.courses.get(&grant.course_id).map(|c| self.course_with_subject(c));
        grant
    }

    fn email_taken(&self, email: &str, except: Uuid) -> bool {
        self.users.values().any(|u| u.email == email && u.id != except)
    }

    fn grant_taken(&self, grant: &UserCourse) -> bool {
        self.user_courses
            .values()
            .any(|g| g.user_id == grant.user_id && g.course_id == grant.course_id && g.id != grant.id)
    }

    fn check_course_refs(&self, course: &Course) -> Result<(), DatabaseError> {
        if !self.subjects.contains_key(&course.subject_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "courses.subject_id {} does not exist",
                course.subject_id
            )));
        }
        Ok(())
    }

    fn check_grant_refs(&self, grant: &UserCourse) -> Result<(), DatabaseError> {
        if !self.users.contains_key(&grant.user_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "users_courses.user_id {} does not exist",
                grant.user_id
            )));
        }
        if !self.courses.contains_key(&grant.course_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "users_courses.course_id {} does not exist",
                grant.course_id
            )));
        }
        Ok(())
    }

    fn delete_course_cascade(&mut self, id: Uuid) {
        self.courses.remove(&id);
        self.user_courses.retain(|_, g| g.course_id != id);
    }
}

fn stripped_course(course: &Course) -> Course {
    Course { subject: None, ..course.clone() }
}

fn stripped_grant(grant: &UserCourse) -> UserCourse {
    UserCourse {
        user: None,
        course: None,
        ..grant.clone()
    }
}

fn missing(table: &str, id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("{} {}", table, id))
}

#[async_trait]
impl Repository<User> for MemoryTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    async fn create(&mut self, user: &User) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        if tables.email_taken(&user.email, user.id) {
            return Err(DatabaseError::UniqueViolation(format!("users.email {}", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update(&mut self, user: &User) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        if !tables.users.contains_key(&user.id) {
            return Err(missing(User::TABLE, user.id));
        }
        if tables.email_taken(&user.email, user.id) {
            return Err(DatabaseError::UniqueViolation(format!("users.email {}", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        tables.users.remove(&id).ok_or_else(|| missing(User::TABLE, id))?;
        tables.user_courses.retain(|_, g| g.user_id != id);
        Ok(())
    }

    async fn create_batch(&mut self, users: &[User]) -> Result<(), DatabaseError> {
        for user in users {
            Repository::<User>::create(&mut *self, user).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<User>, i64), DatabaseError> {
        let tables = &*self.tables()?;
        Ok(filter.apply(tables.users.values().cloned()))
    }
}

#[async_trait]
impl UserRepository for MemoryTransaction {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables()?.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl Repository<Subject> for MemoryTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Subject>, DatabaseError> {
        Ok(self.tables()?.subjects.get(&id).cloned())
    }

    async fn create(&mut self, subject: &Subject) -> Result<(), DatabaseError> {
        self.tables()?.subjects.insert(subject.id, subject.clone());
        Ok(())
    }

    async fn update(&mut self, subject: &Subject) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        if !tables.subjects.contains_key(&subject.id) {
            return Err(missing(Subject::TABLE, subject.id));
        }
        tables.subjects.insert(subject.id, subject.clone());
        Ok(())
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        tables.subjects.remove(&id).ok_or_else(|| missing(Subject::TABLE, id))?;
        let orphaned: Vec<Uuid> = tables
            .courses
            .values()
            .filter(|c| c.subject_id == id)
            .map(|c| c.id)
            .collect();
        for course_id in orphaned {
            tables.delete_course_cascade(course_id);
        }
        Ok(())
    }

    async fn create_batch(&mut self, subjects: &[Subject]) -> Result<(), DatabaseError> {
        for subject in subjects {
            Repository::<Subject>::create(&mut *self, subject).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<Subject>, i64), DatabaseError> {
        let tables = &*self.tables()?;
        Ok(filter.apply(tables.subjects.values().cloned()))
    }
}

impl SubjectRepository for MemoryTransaction {}

#[async_trait]
impl Repository<Course> for MemoryTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        let tables = &*self.tables()?;
        Ok(tables.courses.get(&id).map(|c| tables.course_with_subject(c)))
    }

    async fn create(&mut self, course: &Course) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        tables.check_course_refs(course)?;
        tables.courses.insert(course.id, stripped_course(course));
        Ok(())
    }

    async fn update(&mut self, course: &Course) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        if !tables.courses.contains_key(&course.id) {
            return Err(missing(Course::TABLE, course.id));
        }
        tables.check_course_refs(course)?;
        tables.courses.insert(course.id, stripped_course(course));
        Ok(())
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        if !tables.courses.contains_key(&id) {
            return Err(missing(Course::TABLE, id));
        }
        tables.delete_course_cascade(id);
        Ok(())
    }

    async fn create_batch(&mut self, courses: &[Course]) -> Result<(), DatabaseError> {
        for course in courses {
            Repository::<Course>::create(&mut *self, course).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<Course>, i64), DatabaseError> {
        let tables = &*self.tables()?;
        let loaded = tables.courses.values().map(|c| tables.course_with_subject(c));
        Ok(filter.apply(loaded))
    }
}

impl CourseRepository for MemoryTransaction {}

#[async_trait]
impl Repository<UserCourse> for MemoryTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserCourse>, DatabaseError> {
        let tables = &*self.tables()?;
        Ok(tables.user_courses.get(&id).map(|g| tables.grant_with_relations(g)))
    }

    async fn create(&mut self, grant: &UserCourse) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        tables.check_grant_refs(grant)?;
        if tables.grant_taken(grant) {
            return Err(DatabaseError::UniqueViolation(format!(
                "users_courses ({}, {})",
                grant.user_id, grant.course_id
            )));
        }
        tables.user_courses.insert(grant.id, stripped_grant(grant));
        Ok(())
    }

    async fn update(&mut self, grant: &UserCourse) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        if !tables.user_courses.contains_key(&grant.id) {
            return Err(missing(UserCourse::TABLE, grant.id));
        }
        tables.check_grant_refs(grant)?;
        tables.user_courses.insert(grant.id, stripped_grant(grant));
        Ok(())
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        let tables = self.tables()?;
        tables
            .user_courses
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing(UserCourse::TABLE, id))
    }

    async fn create_batch(&mut self, grants: &[UserCourse]) -> Result<(), DatabaseError> {
        for grant in grants {
            Repository::<UserCourse>::create(&mut *self, grant).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<UserCourse>, i64), DatabaseError> {
        let tables = &*self.tables()?;
        // Relations are loaded first so joined columns such as `courses.subject_id` resolve
        let loaded = tables.user_courses.values().map(|g| tables.grant_with_relations(g));
        Ok(filter.apply(loaded))
    }
}

#[async_trait]
impl UserCourseRepository for MemoryTransaction {
    async fn find_by_user_and_course(
        &mut self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<UserCourse>, DatabaseError> {
        let tables = &*self.tables()?;
        Ok(tables
            .user_courses
            .values()
            .find(|g| g.user_id == user_id && g.course_id == course_id)
            .map(|g| tables.grant_with_relations(g)))
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn users(&mut self) -> &mut dyn UserRepository {
        self
    }

    fn subjects(&mut self) -> &mut dyn SubjectRepository {
        self
    }

    fn courses(&mut self) -> &mut dyn CourseRepository {
        self
    }

    fn user_courses(&mut self) -> &mut dyn UserCourseRepository {
        self
    }

    async fn commit(&mut self) -> Result<(), DatabaseError> {
        let mut guard = self.guard.take().ok_or(DatabaseError::TransactionClosed)?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        self.guard.take().ok_or(DatabaseError::TransactionClosed)?;
        self.working = Tables::default();
        Ok(())
    }
}
