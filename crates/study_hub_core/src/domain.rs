//! crates/study_hub_core/src/domain.rs
//!
//! Defines the core records managed by the study hub: courses, flashcards,
//! quizzes and users, together with the payloads that create or change them.
//!
//! Records only reference each other through plain id strings. A flashcard's
//! `course_id` may name a course that never existed or has been deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ports::{PortError, PortResult};

//=========================================================================================
// Entity Kinds
//=========================================================================================

/// The four kinds of record, one per table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Course,
    Flashcard,
    Quiz,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Course => "Course",
            EntityKind::Flashcard => "Flashcard",
            EntityKind::Quiz => "Quiz",
            EntityKind::User => "User",
        };
        f.write_str(name)
    }
}

/// Implemented by every record stored in a table.
pub trait Entity: Clone + Serialize + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> &str;
}

/// Records that belong to a course through a `course_id` logical reference.
pub trait CourseScoped: Entity {
    fn course_id(&self) -> &str;
}

//=========================================================================================
// Records
//=========================================================================================

/// A course. `updated_at` stays `None` until the first successful update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: String,
    pub term: String,
    pub definition: String,
    pub course_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A multiple-choice question. `correct_answer` is not required to appear in `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub course_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A learner. `courses` starts empty; nothing in the hub enrolls a user yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub courses: Vec<String>,
    pub progress: String,
    pub goals: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Course {
    const KIND: EntityKind = EntityKind::Course;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Flashcard {
    const KIND: EntityKind = EntityKind::Flashcard;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for Quiz {
    const KIND: EntityKind = EntityKind::Quiz;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> &str {
        &self.id
    }
}

impl CourseScoped for Flashcard {
    fn course_id(&self) -> &str {
        &self.course_id
    }
}

impl CourseScoped for Quiz {
    fn course_id(&self) -> &str {
        &self.course_id
    }
}

//=========================================================================================
// Payloads
//=========================================================================================
// Missing and `null` fields deserialize as empty values so they fail validation
// with a `MissingField` error instead of being rejected by the transport.
//=========================================================================================

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct NewCourse {
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub description: String,
}

/// A partial update of a course. `None` leaves the stored field as it is.
#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct CourseChanges {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct NewFlashcard {
    #[serde(deserialize_with = "null_as_empty")]
    pub term: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub definition: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub course_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct NewQuiz {
    #[serde(deserialize_with = "null_as_empty")]
    pub question: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub options: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub correct_answer: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub course_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct NewUser {
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub progress: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub goals: String,
}

//=========================================================================================
// Validation
//=========================================================================================

fn require(operation: &'static str, field: &'static str, value: &str) -> PortResult<()> {
    if value.is_empty() {
        return Err(PortError::MissingField { operation, field });
    }
    Ok(())
}

impl NewCourse {
    pub fn validate(&self) -> PortResult<()> {
        require("createCourse", "name", &self.name)?;
        require("createCourse", "description", &self.description)
    }
}

impl NewFlashcard {
    pub fn validate(&self) -> PortResult<()> {
        require("createFlashcard", "term", &self.term)?;
        require("createFlashcard", "definition", &self.definition)?;
        require("createFlashcard", "courseId", &self.course_id)
    }
}

impl NewQuiz {
    /// Options may repeat and may be empty strings, but there must be at least one.
    pub fn validate(&self) -> PortResult<()> {
        require("createQuiz", "question", &self.question)?;
        if self.options.is_empty() {
            return Err(PortError::MissingField {
                operation: "createQuiz",
                field: "options",
            });
        }
        require("createQuiz", "correctAnswer", &self.correct_answer)?;
        require("createQuiz", "courseId", &self.course_id)
    }
}

impl NewUser {
    pub fn validate(&self) -> PortResult<()> {
        require("createUser", "name", &self.name)?;
        require("createUser", "email", &self.email)?;
        require("createUser", "progress", &self.progress)?;
        require("createUser", "goals", &self.goals)
    }
}

//=========================================================================================
// Partial Updates
//=========================================================================================

impl Course {
    /// Overlays the supplied fields and stamps `updated_at`.
    pub fn apply(&mut self, changes: CourseChanges, now: DateTime<Utc>) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        self.updated_at = Some(now);
    }
}
