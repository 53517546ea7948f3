use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::validation::{Validate, Validator};
use super::{now_utc, Paged, ServiceError};
use crate::api::subjects::{SearchSubjectRequest, SubjectRequest, SubjectResponse, UpdateSubjectRequest};
use crate::clock::Clock;
use crate::database::models::Subject;
use crate::database::{transaction, Store};
use crate::filter::search;

impl Validate for SubjectRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        Validator::new()
            .required("subject_name", &self.subject_name)
            .max_len("subject_name", &self.subject_name, 100)
            .finish()
    }
}

impl Validate for UpdateSubjectRequest {
    fn validate(&self) -> Result<(), ServiceError> {
        Validator::new().max_len("subject_name", &self.subject_name, 100).finish()
    }
}

#[derive(Clone)]
pub struct SubjectService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl SubjectService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, request: SubjectRequest) -> Result<SubjectResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;
                let now = now_utc(clock.as_ref());
                let subject = Subject {
                    id: Uuid::new_v4(),
                    subject_name: request.subject_name,
                    created_at: now,
                    updated_at: now,
                };
                tx.subjects().create(&subject).await?;
                Ok(SubjectResponse::from(&subject))
            })
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<SubjectResponse, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let subject = tx.subjects().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Subject {} not found", id);
                    ServiceError::not_found("Subject")
                })?;
                Ok(SubjectResponse::from(&subject))
            })
        })
        .await
    }

    pub async fn search(&self, request: SearchSubjectRequest) -> Result<Paged<SubjectResponse>, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                Validator::new().paging(request.page, request.size).finish()?;
                let filter = search::subjects(&request)?;
                let (subjects, total) = tx.subjects().search(&filter).await?;
                let items = subjects.iter().map(SubjectResponse::from).collect();
                Ok(Paged::new(items, request.page, request.size, total))
            })
        })
        .await
    }

    pub async fn update(&self, id: Uuid, request: UpdateSubjectRequest) -> Result<SubjectResponse, ServiceError> {
        let clock = self.clock.clone();
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                request.validate()?;
                let mut subject = tx.subjects().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Subject {} not found for update", id);
                    ServiceError::not_found("Subject")
                })?;
                if !request.subject_name.is_empty() {
                    subject.subject_name = request.subject_name;
                }
                subject.updated_at = now_utc(clock.as_ref());
                tx.subjects().update(&subject).await?;
                Ok(SubjectResponse::from(&subject))
            })
        })
        .await
    }

    /// Courses of the subject and their grants go with it
    pub async fn delete(&self, id: Uuid) -> Result<SubjectResponse, ServiceError> {
        transaction(self.store.as_ref(), move |tx| {
            Box::pin(async move {
                let subject = tx.subjects().find_by_id(id).await?.ok_or_else(|| {
                    warn!("Subject {} not found for delete", id);
                    ServiceError::not_found("Subject")
                })?;
                tx.subjects().delete(id).await?;
                Ok(SubjectResponse::from(&subject))
            })
        })
        .await
    }
}
