//! Postgres storage driver

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::{Course, Subject, User, UserCourse};
use crate::database::query_builder::{select_ids, QueryBuilder};
use crate::database::repository::{
    CourseRepository, Repository, Store, SubjectRepository, Transaction, UserCourseRepository, UserRepository,
};
use crate::filter::Filter;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>, DatabaseError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx: Some(tx) }))
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Open Postgres transaction; dropped without commit it rolls back
pub struct PgTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgTransaction {
    fn conn(&mut self) -> Result<&mut PgConnection, DatabaseError> {
        self.tx.as_deref_mut().ok_or(DatabaseError::TransactionClosed)
    }
}

fn expect_one(rows_affected: u64, table: &str, id: Uuid) -> Result<(), DatabaseError> {
    if rows_affected == 0 {
        return Err(DatabaseError::NotFound(format!("{} {}", table, id)));
    }
    Ok(())
}

async fn delete_row(conn: &mut PgConnection, table: &str, id: Uuid) -> Result<(), DatabaseError> {
    let query = format!("DELETE FROM \"{}\" WHERE \"id\" = $1", table);
    let result = sqlx::query(&query)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
    expect_one(result.rows_affected(), table, id)
}

async fn attach_subjects(conn: &mut PgConnection, courses: &mut [Course]) -> Result<(), DatabaseError> {
    let ids: Vec<Uuid> = courses.iter().map(|c| c.subject_id).collect();
    let subjects: HashMap<Uuid, Subject> = select_ids::<Subject>(conn, Subject::TABLE, ids)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    for course in courses.iter_mut() {
        course.subject = subjects.get(&course.subject_id).cloned();
    }
    Ok(())
}

async fn attach_grant_relations(conn: &mut PgConnection, grants: &mut [UserCourse]) -> Result<(), DatabaseError> {
    let user_ids: Vec<Uuid> = grants.iter().map(|g| g.user_id).collect();
    let course_ids: Vec<Uuid> = grants.iter().map(|g| g.course_id).collect();

    let users: HashMap<Uuid, User> = select_ids::<User>(conn, User::TABLE, user_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let mut courses = select_ids::<Course>(conn, Course::TABLE, course_ids).await?;
    attach_subjects(conn, &mut courses).await?;
    let courses: HashMap<Uuid, Course> = courses.into_iter().map(|c| (c.id, c)).collect();

    for grant in grants.iter_mut() {
        grant.user = users.get(&grant.user_id).cloned();
        grant.course = courses.get(&grant.course_id).cloned();
    }
    Ok(())
}

#[async_trait]
impl Repository<User> for PgTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn()?;
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?)
    }

    async fn create(&mut self, user: &User) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        sqlx::query(
            "INSERT INTO users (id, username, email, password, phone_number, grade_level, role, avatar_url, \
             birth_date, token, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.phone_number)
        .bind(user.grade_level)
        .bind(&user.role)
        .bind(&user.avatar_url)
        .bind(user.birth_date)
        .bind(&user.token)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn update(&mut self, user: &User) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        let result = sqlx::query(
            "UPDATE users SET username = $2, email = $3, password = $4, phone_number = $5, grade_level = $6, \
             role = $7, avatar_url = $8, birth_date = $9, token = $10, updated_at = $11 WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password)
        .bind(&user.phone_number)
        .bind(user.grade_level)
        .bind(&user.role)
        .bind(&user.avatar_url)
        .bind(user.birth_date)
        .bind(&user.token)
        .bind(user.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        expect_one(result.rows_affected(), User::TABLE, user.id)
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        delete_row(self.conn()?, User::TABLE, id).await
    }

    async fn create_batch(&mut self, users: &[User]) -> Result<(), DatabaseError> {
        for user in users {
            Repository::<User>::create(&mut *self, user).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<User>, i64), DatabaseError> {
        QueryBuilder::<User>::new(filter).select_page(self.conn()?).await
    }
}

#[async_trait]
impl UserRepository for PgTransaction {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, DatabaseError> {
        let conn = self.conn()?;
        Ok(sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&mut *conn)
            .await?)
    }
}

#[async_trait]
impl Repository<Subject> for PgTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Subject>, DatabaseError> {
        let conn = self.conn()?;
        Ok(sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?)
    }

    async fn create(&mut self, subject: &Subject) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        sqlx::query("INSERT INTO subjects (id, subject_name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(subject.id)
            .bind(&subject.subject_name)
            .bind(subject.created_at)
            .bind(subject.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn update(&mut self, subject: &Subject) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        let result = sqlx::query("UPDATE subjects SET subject_name = $2, updated_at = $3 WHERE id = $1")
            .bind(subject.id)
            .bind(&subject.subject_name)
            .bind(subject.updated_at)
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        expect_one(result.rows_affected(), Subject::TABLE, subject.id)
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        delete_row(self.conn()?, Subject::TABLE, id).await
    }

    async fn create_batch(&mut self, subjects: &[Subject]) -> Result<(), DatabaseError> {
        for subject in subjects {
            Repository::<Subject>::create(&mut *self, subject).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<Subject>, i64), DatabaseError> {
        QueryBuilder::<Subject>::new(filter).select_page(self.conn()?).await
    }
}

impl SubjectRepository for PgTransaction {}

#[async_trait]
impl Repository<Course> for PgTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        let conn = self.conn()?;
        let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        match course {
            Some(course) => {
                let mut loaded = [course];
                attach_subjects(conn, &mut loaded).await?;
                let [course] = loaded;
                Ok(Some(course))
            }
            None => Ok(None),
        }
    }

    async fn create(&mut self, course: &Course) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        sqlx::query(
            "INSERT INTO courses (id, course_name, content, grade_level, subject_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(course.id)
        .bind(&course.course_name)
        .bind(&course.content)
        .bind(course.grade_level)
        .bind(course.subject_id)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn update(&mut self, course: &Course) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        let result = sqlx::query(
            "UPDATE courses SET course_name = $2, content = $3, grade_level = $4, subject_id = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(course.id)
        .bind(&course.course_name)
        .bind(&course.content)
        .bind(course.grade_level)
        .bind(course.subject_id)
        .bind(course.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        expect_one(result.rows_affected(), Course::TABLE, course.id)
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        delete_row(self.conn()?, Course::TABLE, id).await
    }

    async fn create_batch(&mut self, courses: &[Course]) -> Result<(), DatabaseError> {
        for course in courses {
            Repository::<Course>::create(&mut *self, course).await?;
        }
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<Course>, i64), DatabaseError> {
        let conn = self.conn()?;
        let (mut courses, total) = QueryBuilder::<Course>::new(filter).select_page(conn).await?;
        attach_subjects(conn, &mut courses).await?;
        Ok((courses, total))
    }
}

impl CourseRepository for PgTransaction {}

#[async_trait]
impl Repository<UserCourse> for PgTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> Result<Option<UserCourse>, DatabaseError> {
        let conn = self.conn()?;
        let grant = sqlx::query_as::<_, UserCourse>("SELECT * FROM users_courses WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        let mut grants: Vec<UserCourse> = grant.into_iter().collect();
        attach_grant_relations(conn, &mut grants).await?;
        Ok(grants.pop())
    }

    async fn create(&mut self, grant: &UserCourse) -> Result<(), DatabaseError> {
        Repository::<UserCourse>::create_batch(&mut *self, std::slice::from_ref(grant)).await
    }

    async fn update(&mut self, grant: &UserCourse) -> Result<(), DatabaseError> {
        let conn = self.conn()?;
        let result =
            sqlx::query("UPDATE users_courses SET user_id = $2, course_id = $3, accessed_at = $4 WHERE id = $1")
                .bind(grant.id)
                .bind(grant.user_id)
                .bind(grant.course_id)
                .bind(grant.accessed_at)
                .execute(&mut *conn)
                .await
                .map_err(DatabaseError::from_sqlx)?;
        expect_one(result.rows_affected(), UserCourse::TABLE, grant.id)
    }

    async fn delete(&mut self, id: Uuid) -> Result<(), DatabaseError> {
        delete_row(self.conn()?, UserCourse::TABLE, id).await
    }

    /// Single multi-row INSERT
    async fn create_batch(&mut self, grants: &[UserCourse]) -> Result<(), DatabaseError> {
        if grants.is_empty() {
            return Ok(());
        }
        let conn = self.conn()?;
        let mut builder = sqlx::QueryBuilder::<Postgres>::new(
            "INSERT INTO users_courses (id, user_id, course_id, accessed_at) ",
        );
        builder.push_values(grants, |mut row, grant| {
            row.push_bind(grant.id)
                .push_bind(grant.user_id)
                .push_bind(grant.course_id)
                .push_bind(grant.accessed_at);
        });
        builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }

    async fn search(&mut self, filter: &Filter) -> Result<(Vec<UserCourse>, i64), DatabaseError> {
        let conn = self.conn()?;
        let (mut grants, total) = QueryBuilder::<UserCourse>::new(filter).select_page(conn).await?;
        attach_grant_relations(conn, &mut grants).await?;
        Ok((grants, total))
    }
}

#[async_trait]
impl UserCourseRepository for PgTransaction {
    async fn find_by_user_and_course(
        &mut self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<Option<UserCourse>, DatabaseError> {
        let conn = self.conn()?;
        let grant = sqlx::query_as::<_, UserCourse>(
            "SELECT * FROM users_courses WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&mut *conn)
        .await?;
        let mut grants: Vec<UserCourse> = grant.into_iter().collect();
        attach_grant_relations(conn, &mut grants).await?;
        Ok(grants.pop())
    }
}

#[async_trait]
impl Transaction for PgTransaction {
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
        let tx = self.tx.take().ok_or(DatabaseError::TransactionClosed)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DatabaseError> {
        let tx = self.tx.take().ok_or(DatabaseError::TransactionClosed)?;
        tx.rollback().await?;
        Ok(())
    }
}
