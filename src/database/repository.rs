use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Course, Subject, User, UserCourse};
use crate::filter::Filter;

/// Row-level access to one table, scoped to an open transaction
#[async_trait]
pub trait Repository<T: Send + Sync>: Send {
    /// Fetch by primary key with related records eager-loaded
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<T>, DatabaseError>;

    async fn create(&mut self, entity: &T) -> Result<(), DatabaseError>;

    /// Rewrite every column of an existing row; `NotFound` when the id is unknown
    async fn update(&mut self, entity: &T) -> Result<(), DatabaseError>;

    /// `NotFound` when the id is unknown; dependants cascade
    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError>;

    async fn create_batch(&mut self, entities: &[T]) -> Result<(), DatabaseError>;

    /// Page of matches plus the unpaginated match count
    async fn search(&mut self, filter: &Filter) -> Result<(Vec<T>, i64), DatabaseError>;
}

#[async_trait]
pub trait UserRepository: Repository<User> {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError>;
}

pub trait SubjectRepository: Repository<Subject> {}

pub trait CourseRepository: Repository<Course> {}

#[async_trait]
pub trait UserCourseRepository: Repository<UserCourse> {
    async fn find_by_user_and_course(
        &mut self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<UserCourse>, DatabaseError>;
}

/// An open unit of work. Dropping it without `commit` discards its writes.
#[async_trait]
pub trait Transaction: Send {
    fn users(&mut self) -> &mut dyn UserRepository;
    fn subjects(&mut self) -> &mut dyn SubjectRepository;
    fn courses(&mut self) -> &mut dyn CourseRepository;
    fn user_courses(&mut self) -> &mut dyn UserCourseRepository;

    async fn commit(&mut self) -> Result<(), DatabaseError>;
    async fn rollback(&mut self) -> Result<(), DatabaseError>;
}

/// Storage driver: hands out transactions
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError>;
    async fn ping(&self) -> Result<(), DatabaseError>;
}

/// Run `f` inside a transaction: commit when it returns `Ok`, roll back when it returns `Err`.
///
/// ```ignore
/// let subject = transaction(store.as_ref(), move |tx| {
///     Box::pin(async move {
///         tx.subjects().create(&subject).await?;
///         Ok::<_, ServiceError>(subject)
///     })
/// })
/// .await?;
/// ```
pub async fn transaction<T, E, F>(store: &dyn Store, f: F) -> Result<T, E>
where
    F: for<'t> FnOnce(&'t mut (dyn Transaction + 'static)) -> BoxFuture<'t, Result<T, E>>,
    E: From<DatabaseError>,
{
    let mut tx = store.begin().await?;
    match f(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!("Rollback failed: {}", rollback_err);
            }
            Err(err)
        }
    }
}
