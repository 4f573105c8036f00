//! crates/study_hub_core/src/service.rs
//!
//! The entity lifecycle manager. `StudyHub` owns one table per entity kind,
//! generates ids, stamps times, validates payloads and enforces the not-found
//! contract for every operation the hub exposes.
//!
//! Each read-modify-write sequence holds its table's write lock for its whole
//! duration, so concurrent callers never lose an update. Plain reads don't lock.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::{
    Course, CourseChanges, Entity, Flashcard, NewCourse, NewFlashcard, NewQuiz, NewUser, Quiz,
    User,
};
use crate::filter::list_by_parent;
use crate::ports::{Clock, IdGenerator, PortError, PortResult, Table};
use crate::system::{SystemClock, UuidGenerator};
use crate::table::{MemoryTable, TableBounds};

//=========================================================================================
// Tables
//=========================================================================================

/// The four tables of the hub, one per entity kind.
#[derive(Clone)]
pub struct Tables {
    pub courses: Arc<dyn Table<Course>>,
    pub flashcards: Arc<dyn Table<Flashcard>>,
    pub quizzes: Arc<dyn Table<Quiz>>,
    pub users: Arc<dyn Table<User>>,
}

impl Tables {
    /// Fresh, empty in-memory tables.
    pub fn in_memory(bounds: TableBounds) -> Self {
        Self {
            courses: Arc::new(MemoryTable::new(bounds)),
            flashcards: Arc::new(MemoryTable::new(bounds)),
            quizzes: Arc::new(MemoryTable::new(bounds)),
            users: Arc::new(MemoryTable::new(bounds)),
        }
    }
}

#[derive(Default)]
struct WriteLocks {
    courses: Mutex<()>,
    flashcards: Mutex<()>,
    quizzes: Mutex<()>,
    users: Mutex<()>,
}

//=========================================================================================
// StudyHub
//=========================================================================================

pub struct StudyHub {
    tables: Tables,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    locks: WriteLocks,
}

impl StudyHub {
    pub fn new(tables: Tables, clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            tables,
            clock,
            ids,
            locks: WriteLocks::default(),
        }
    }

    /// A hub on the system clock and random UUIDs.
    pub fn with_system_defaults(tables: Tables) -> Self {
        Self::new(tables, Arc::new(SystemClock::new()), Arc::new(UuidGenerator))
    }

    // --- Courses ---

    pub async fn create_course(&self, payload: NewCourse) -> PortResult<Course> {
        payload.validate()?;
        let _guard = self.locks.courses.lock().await;
        let course = Course {
            id: self.ids.next_id(),
            name: payload.name,
            description: payload.description,
            created_at: self.clock.now(),
            updated_at: None,
        };
        store(self.tables.courses.as_ref(), "createCourse", &course).await?;
        info!(course_id = %course.id, "Course created");
        Ok(course)
    }

    pub async fn get_course(&self, id: &str) -> PortResult<Course> {
        fetch(self.tables.courses.as_ref(), "getCourse", id).await
    }

    pub async fn get_all_courses(&self) -> PortResult<Vec<Course>> {
        self.tables.courses.values().await
    }

    pub async fn update_course(&self, id: &str, changes: CourseChanges) -> PortResult<Course> {
        let _guard = self.locks.courses.lock().await;
        let mut course = fetch(self.tables.courses.as_ref(), "updateCourse", id).await?;
        course.apply(changes, self.clock.now());
        store(self.tables.courses.as_ref(), "updateCourse", &course).await?;
        info!(course_id = %course.id, "Course updated");
        Ok(course)
    }

    /// Removes the course and returns it as it was. Flashcards and quizzes
    /// pointing at it are left in place.
    pub async fn delete_course(&self, id: &str) -> PortResult<Course> {
        let _guard = self.locks.courses.lock().await;
        let course = fetch(self.tables.courses.as_ref(), "deleteCourse", id).await?;
        self.tables.courses.remove(id).await.map_err(|e| {
            warn!(table = %self.tables.courses.id(), id, "Store write failed: {}", e);
            e.during("deleteCourse")
        })?;
        info!(course_id = %id, "Course deleted");
        Ok(course)
    }

    // --- Flashcards ---

    pub async fn create_flashcard(&self, payload: NewFlashcard) -> PortResult<Flashcard> {
        payload.validate()?;
        let _guard = self.locks.flashcards.lock().await;
        let now = self.clock.now();
        let flashcard = Flashcard {
            id: self.ids.next_id(),
            term: payload.term,
            definition: payload.definition,
            course_id: payload.course_id,
            created_at: now,
            updated_at: Some(now),
        };
        store(self.tables.flashcards.as_ref(), "createFlashcard", &flashcard).await?;
        info!(flashcard_id = %flashcard.id, course_id = %flashcard.course_id, "Flashcard created");
        Ok(flashcard)
    }

    pub async fn get_flashcard(&self, id: &str) -> PortResult<Flashcard> {
        fetch(self.tables.flashcards.as_ref(), "getFlashcard", id).await
    }

    pub async fn get_flashcards_for_course(&self, course_id: &str) -> PortResult<Vec<Flashcard>> {
        list_by_parent(self.tables.flashcards.as_ref(), course_id).await
    }

    // --- Quizzes ---

    pub async fn create_quiz(&self, payload: NewQuiz) -> PortResult<Quiz> {
        payload.validate()?;
        let _guard = self.locks.quizzes.lock().await;
        let now = self.clock.now();
        let quiz = Quiz {
            id: self.ids.next_id(),
            question: payload.question,
            options: payload.options,
            correct_answer: payload.correct_answer,
            course_id: payload.course_id,
            created_at: now,
            updated_at: Some(now),
        };
        store(self.tables.quizzes.as_ref(), "createQuiz", &quiz).await?;
        info!(quiz_id = %quiz.id, course_id = %quiz.course_id, "Quiz created");
        Ok(quiz)
    }

    pub async fn get_quiz(&self, id: &str) -> PortResult<Quiz> {
        fetch(self.tables.quizzes.as_ref(), "getQuiz", id).await
    }

    pub async fn get_quizzes_for_course(&self, course_id: &str) -> PortResult<Vec<Quiz>> {
        list_by_parent(self.tables.quizzes.as_ref(), course_id).await
    }

    // --- Users ---

    pub async fn create_user(&self, payload: NewUser) -> PortResult<User> {
        payload.validate()?;
        let _guard = self.locks.users.lock().await;
        let now = self.clock.now();
        let user = User {
            id: self.ids.next_id(),
            name: payload.name,
            email: payload.email,
            courses: Vec::new(),
            progress: payload.progress,
            goals: payload.goals,
            created_at: now,
            updated_at: Some(now),
        };
        store(self.tables.users.as_ref(), "createUser", &user).await?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    pub async fn get_user(&self, id: &str) -> PortResult<User> {
        fetch(self.tables.users.as_ref(), "getUser", id).await
    }

    pub async fn get_all_users(&self) -> PortResult<Vec<User>> {
        self.tables.users.values().await
    }

    /// Overwrites only the user's `goals`. `updated_at` is left untouched.
    pub async fn set_language_learning_goal(&self, user_id: &str, target: &str) -> PortResult<User> {
        let _guard = self.locks.users.lock().await;
        let mut user = fetch(self.tables.users.as_ref(), "setLanguageLearningGoal", user_id).await?;
        user.goals = target.to_string();
        store(self.tables.users.as_ref(), "setLanguageLearningGoal", &user).await?;
        info!(user_id = %user.id, goals = %user.goals, "Learning goal set");
        Ok(user)
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

async fn fetch<V: Entity>(table: &dyn Table<V>, operation: &'static str, id: &str) -> PortResult<V> {
    match table.get(id).await? {
        Some(record) => Ok(record),
        None => {
            debug!(operation, kind = %V::KIND, id, "Record not found");
            Err(PortError::NotFound {
                operation,
                kind: V::KIND,
                id: id.to_string(),
            })
        }
    }
}

async fn store<V: Entity>(
    table: &dyn Table<V>,
    operation: &'static str,
    record: &V,
) -> PortResult<()> {
    table.put(record.id(), record.clone()).await.map_err(|e| {
        warn!(operation, table = %table.id(), id = record.id(), "Store write failed: {}", e);
        e.during(operation)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use crate::domain::EntityKind;
    use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Ids of the form `id-1`, `id-2`, ...
    #[derive(Default)]
    struct SequentialIds(AtomicU64);

    impl IdGenerator for SequentialIds {
        fn next_id(&self) -> String {
            format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    /// A clock that only moves when told to.
    struct ManualClock(StdMutex<DateTime<Utc>>);

    impl ManualClock {
        fn new() -> Self {
            Self(StdMutex::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()))
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.0.lock().unwrap();
            *now = *now + Duration::seconds(seconds);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn hub() -> (StudyHub, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let hub = StudyHub::new(
            Tables::in_memory(TableBounds::default()),
            clock.clone(),
            Arc::new(SequentialIds::default()),
        );
        (hub, clock)
    }

    fn new_course(name: &str) -> NewCourse {
        NewCourse {
            name: name.to_string(),
            description: format!("{} for travellers", name),
        }
    }

    fn new_card(term: &str, course_id: &str) -> NewFlashcard {
        NewFlashcard {
            term: term.to_string(),
            definition: "a word".to_string(),
            course_id: course_id.to_string(),
        }
    }

    fn new_user() -> NewUser {
        NewUser {
            name: "Ana".to_string(),
            email: "a@x.com".to_string(),
            progress: "beginner".to_string(),
            goals: "A1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_course() {
        let (hub, _) = hub();
        let created = hub.create_course(new_course("Spanish")).await.unwrap();
        assert_eq!(created.id, "id-1");
        assert!(created.updated_at.is_none());

        let fetched = hub.get_course(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_invalid_payload_writes_nothing() {
        let (hub, _) = hub();
        let err = hub
            .create_course(NewCourse {
                name: "Spanish".to_string(),
                description: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortError::MissingField {
                operation: "createCourse",
                field: "description"
            }
        ));
        assert!(hub.get_all_courses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (hub, _) = hub();
        let missing = "no-such-id";

        let errors = vec![
            hub.get_course(missing).await.unwrap_err(),
            hub.update_course(missing, CourseChanges::default()).await.unwrap_err(),
            hub.delete_course(missing).await.unwrap_err(),
            hub.get_flashcard(missing).await.unwrap_err(),
            hub.get_quiz(missing).await.unwrap_err(),
            hub.get_user(missing).await.unwrap_err(),
            hub.set_language_learning_goal(missing, "B2").await.unwrap_err(),
        ];
        for err in errors {
            match err {
                PortError::NotFound { id, .. } => assert_eq!(id, missing),
                other => panic!("expected NotFound, got {:?}", other),
            }
        }

        let err = hub.get_course(missing).await.unwrap_err();
        assert_eq!(err.to_string(), "getCourse: Course with ID=no-such-id not found.");
    }

    #[tokio::test]
    async fn test_update_course_overlays_and_stamps() {
        let (hub, clock) = hub();
        let created = hub.create_course(new_course("Spanish")).await.unwrap();

        clock.advance(5);
        let updated = hub
            .update_course(
                &created.id,
                CourseChanges {
                    name: None,
                    description: Some("Advanced Spanish".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.name, "Spanish");
        assert_eq!(updated.description, "Advanced Spanish");
        let first_update = updated.updated_at.unwrap();
        assert!(first_update >= created.created_at);

        let again = hub
            .update_course(&created.id, CourseChanges::default())
            .await
            .unwrap();
        assert!(again.updated_at.unwrap() >= first_update);
        assert_eq!(hub.get_course(&created.id).await.unwrap(), again);
    }

    #[tokio::test]
    async fn test_delete_course_returns_prior_record() {
        let (hub, _) = hub();
        let keep = hub.create_course(new_course("French")).await.unwrap();
        let doomed = hub.create_course(new_course("German")).await.unwrap();
        let card = hub.create_flashcard(new_card("Hund", &doomed.id)).await.unwrap();

        let deleted = hub.delete_course(&doomed.id).await.unwrap();
        assert_eq!(deleted, doomed);
        assert!(matches!(
            hub.get_course(&doomed.id).await,
            Err(PortError::NotFound { .. })
        ));
        assert_eq!(hub.get_all_courses().await.unwrap(), vec![keep]);

        // No cascade: the flashcard still points at the deleted course.
        let dangling = hub.get_flashcards_for_course(&doomed.id).await.unwrap();
        assert_eq!(dangling, vec![card]);

        // Ids are not handed out again after deletion.
        let next = hub.create_course(new_course("Dutch")).await.unwrap();
        assert_ne!(next.id, doomed.id);
    }

    #[tokio::test]
    async fn test_children_listed_per_course() {
        let (hub, _) = hub();
        let spanish = hub.create_course(new_course("Spanish")).await.unwrap();
        let french = hub.create_course(new_course("French")).await.unwrap();
        let hola = hub.create_flashcard(new_card("hola", &spanish.id)).await.unwrap();
        let salut = hub.create_flashcard(new_card("salut", &french.id)).await.unwrap();

        assert_eq!(hub.get_flashcards_for_course(&spanish.id).await.unwrap(), vec![hola]);
        assert_eq!(hub.get_flashcards_for_course(&french.id).await.unwrap(), vec![salut]);
        assert!(hub.get_flashcards_for_course("unknown").await.unwrap().is_empty());

        let quiz = hub
            .create_quiz(NewQuiz {
                question: "¿Cómo estás?".to_string(),
                options: vec!["Bien".to_string(), "Mal".to_string()],
                correct_answer: "Regular".to_string(),
                course_id: spanish.id.clone(),
            })
            .await
            .unwrap();
        assert_eq!(quiz.updated_at, Some(quiz.created_at));
        assert_eq!(hub.get_quizzes_for_course(&spanish.id).await.unwrap(), vec![quiz.clone()]);
        assert!(hub.get_quizzes_for_course(&french.id).await.unwrap().is_empty());
        assert_eq!(hub.get_quiz(&quiz.id).await.unwrap(), quiz);
    }

    #[tokio::test]
    async fn test_flashcard_accepts_unknown_course() {
        let (hub, _) = hub();
        let card = hub.create_flashcard(new_card("perro", "ghost-course")).await.unwrap();
        assert_eq!(card.updated_at, Some(card.created_at));
        assert_eq!(hub.get_flashcard(&card.id).await.unwrap(), card);
    }

    #[tokio::test]
    async fn test_set_goal_changes_only_goals() {
        let (hub, clock) = hub();
        let user = hub.create_user(new_user()).await.unwrap();
        assert!(user.courses.is_empty());
        assert_eq!(user.updated_at, Some(user.created_at));

        clock.advance(60);
        let updated = hub.set_language_learning_goal(&user.id, "B1").await.unwrap();
        assert_eq!(updated.goals, "B1");
        assert_eq!(
            User {
                goals: "A1".to_string(),
                ..updated.clone()
            },
            user
        );
        assert_eq!(hub.get_user(&user.id).await.unwrap(), updated);
        assert_eq!(hub.get_all_users().await.unwrap(), vec![updated]);
    }

    /// Advances one second on every reading, so stamps order the writes.
    #[derive(Default)]
    struct TickingClock(AtomicI64);

    impl Clock for TickingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.0.fetch_add(1, Ordering::SeqCst);
            Utc.timestamp_opt(1_700_000_000 + tick, 0).unwrap()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_updates_are_serialized() {
        let hub = Arc::new(StudyHub::new(
            Tables::in_memory(TableBounds::default()),
            Arc::new(TickingClock::default()),
            Arc::new(SequentialIds::default()),
        ));
        let course = hub.create_course(new_course("Spanish")).await.unwrap();

        let mut name_writes = Vec::new();
        let mut description_writes = Vec::new();
        for n in 0..64 {
            let renamer = hub.clone();
            let id = course.id.clone();
            name_writes.push(tokio::spawn(async move {
                let changes = CourseChanges {
                    name: Some(format!("name-{}", n)),
                    description: None,
                };
                renamer.update_course(&id, changes).await
            }));
            let describer = hub.clone();
            let id = course.id.clone();
            description_writes.push(tokio::spawn(async move {
                let changes = CourseChanges {
                    name: None,
                    description: Some(format!("description-{}", n)),
                };
                describer.update_course(&id, changes).await
            }));
        }

        let mut names = Vec::new();
        for handle in name_writes {
            names.push(handle.await.unwrap().unwrap());
        }
        let mut descriptions = Vec::new();
        for handle in description_writes {
            descriptions.push(handle.await.unwrap().unwrap());
        }

        // Each update saw every earlier one, so the stored course carries the
        // name and the description of the latest write of each kind.
        let last_name = names.iter().max_by_key(|c| c.updated_at).unwrap();
        let last_description = descriptions.iter().max_by_key(|c| c.updated_at).unwrap();
        let stored = hub.get_course(&course.id).await.unwrap();
        assert_eq!(stored.name, last_name.name);
        assert_eq!(stored.description, last_description.description);
        assert_eq!(
            stored.updated_at,
            last_name.updated_at.max(last_description.updated_at)
        );
        assert_eq!(hub.get_all_courses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let hub = StudyHub::new(
            Tables::in_memory(TableBounds {
                max_key_size: 44,
                max_value_size: 64,
            }),
            Arc::new(ManualClock::new()),
            Arc::new(SequentialIds::default()),
        );
        let err = hub.create_user(new_user()).await.unwrap_err();
        assert!(matches!(
            err,
            PortError::StoreWrite {
                operation: "createUser",
                ..
            }
        ));
        assert!(err
            .to_string()
            .starts_with("createUser: store write failed for User with ID=id-1 on table #3: capacity exceeded"));
        assert!(hub.get_all_users().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_course_unchanged() {
        let (hub, clock) = hub();
        let course = hub.create_course(new_course("Spanish")).await.unwrap();
        clock.advance(5);
        let renamed = hub
            .update_course(
                &course.id,
                CourseChanges {
                    name: Some("Spanish I".to_string()),
                    description: None,
                },
            )
            .await
            .unwrap();

        clock.advance(5);
        let err = hub
            .update_course(
                &course.id,
                CourseChanges {
                    name: Some("Spanish II".to_string()),
                    description: Some("x".repeat(2000)),
                },
            )
            .await
            .unwrap_err();
        match &err {
            PortError::StoreWrite {
                operation, kind, id, ..
            } => {
                assert_eq!(*operation, "updateCourse");
                assert_eq!(*kind, EntityKind::Course);
                assert_eq!(id, &course.id);
            }
            other => panic!("expected StoreWrite, got {:?}", other),
        }
        assert!(err
            .to_string()
            .starts_with("updateCourse: store write failed for Course with ID=id-1 on table #0:"));

        assert_eq!(hub.get_course(&course.id).await.unwrap(), renamed);
    }

    #[tokio::test]
    async fn test_failed_goal_change_leaves_user_unchanged() {
        let (hub, clock) = hub();
        let user = hub.create_user(new_user()).await.unwrap();

        clock.advance(5);
        let err = hub
            .set_language_learning_goal(&user.id, &"C2 ".repeat(500))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortError::StoreWrite {
                operation: "setLanguageLearningGoal",
                kind: EntityKind::User,
                ..
            }
        ));
        assert!(err.to_string().contains(&format!("User with ID={}", user.id)));
        assert_eq!(hub.get_user(&user.id).await.unwrap(), user);
    }
}
