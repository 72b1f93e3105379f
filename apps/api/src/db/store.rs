//! Multi-step operations layered over [`Queries`].
//!
//! None of these run inside a transaction: a failure part-way leaves the rows written
//! so far in place.

use std::ops::Deref;
use std::sync::Arc;

use tracing::debug;

use crate::db::models::{CreateUserSkillParams, Pagination, User, UserSkill, UserSkillInput};
use crate::db::queries::Queries;
use crate::db::DbResult;

/// Shared handle to the row store. Dereferences to the underlying [`Queries`].
#[derive(Clone)]
pub struct Store {
    queries: Arc<dyn Queries>,
}

impl Deref for Store {
    type Target = dyn Queries;

    fn deref(&self) -> &Self::Target {
        self.queries.as_ref()
    }
}

impl Store {
    pub fn new(queries: Arc<dyn Queries>) -> Self {
        Self { queries }
    }

    /// Inserts one skill row per input, in order. Stops at the first failure.
    pub async fn create_multiple_user_skills(
        &self,
        user_id: i32,
        skills: &[UserSkillInput],
    ) -> DbResult<Vec<UserSkill>> {
        let mut created = Vec::with_capacity(skills.len());
        for input in skills {
            let skill = self
                .create_user_skill(CreateUserSkillParams {
                    user_id,
                    skill: input.skill.clone(),
                    experience: input.experience,
                })
                .await?;
            created.push(skill);
        }
        Ok(created)
    }

    /// Inserts one skill row per input, in order. Stops at the first failure.
    pub async fn create_multiple_job_skills(&self, job_id: i32, skills: &[String]) -> DbResult<()> {
        for skill in skills {
            self.create_job_skill(job_id, skill).await?;
        }
        Ok(())
    }

    /// Removes a job's skills, then the job itself.
    pub async fn delete_job_posting(&self, job_id: i32) -> DbResult<()> {
        self.delete_job_skills_by_job_id(job_id).await?;
        self.delete_job(job_id).await?;
        debug!("Deleted job posting {job_id}");
        Ok(())
    }

    /// The user row plus the first page of their skills.
    pub async fn get_user_details_by_email(&self, email: &str) -> DbResult<(User, Vec<UserSkill>)> {
        let user = self.get_user_by_email(email).await?;
        let skills = self.list_user_skills(user.id, Pagination::first_page()).await?;
        Ok((user, skills))
    }
}
