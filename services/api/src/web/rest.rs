//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification. Every handler is a thin shim over
//! one `StudyHub` operation.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use study_hub_core::domain::{
    Course, CourseChanges, Flashcard, NewCourse, NewFlashcard, NewQuiz, NewUser, Quiz, User,
};
use study_hub_core::ports::PortError;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_course_handler,
        get_all_courses_handler,
        get_course_handler,
        update_course_handler,
        delete_course_handler,
        get_flashcards_for_course_handler,
        get_quizzes_for_course_handler,
        create_flashcard_handler,
        get_flashcard_handler,
        create_quiz_handler,
        get_quiz_handler,
        create_user_handler,
        get_all_users_handler,
        get_user_handler,
        set_goal_handler,
    ),
    components(
        schemas(
            Course, Flashcard, Quiz, User,
            NewCourse, CourseChanges, NewFlashcard, NewQuiz, NewUser, SetGoalRequest
        )
    ),
    tags(
        (name = "Study Hub API", description = "Courses, flashcards, quizzes and learners.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds the API routes over the given state.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/courses", post(create_course_handler).get(get_all_courses_handler))
        .route(
            "/courses/{id}",
            get(get_course_handler)
                .put(update_course_handler)
                .delete(delete_course_handler),
        )
        .route("/courses/{id}/flashcards", get(get_flashcards_for_course_handler))
        .route("/courses/{id}/quizzes", get(get_quizzes_for_course_handler))
        .route("/flashcards", post(create_flashcard_handler))
        .route("/flashcards/{id}", get(get_flashcard_handler))
        .route("/quizzes", post(create_quiz_handler))
        .route("/quizzes/{id}", get(get_quiz_handler))
        .route("/users", post(create_user_handler).get(get_all_users_handler))
        .route("/users/{id}", get(get_user_handler))
        .route("/users/{id}/goals", put(set_goal_handler))
        .with_state(state)
}

//=========================================================================================
// API Payload Structs and Error Mapping
//=========================================================================================

/// The body of a learning-goal change.
#[derive(Deserialize, ToSchema)]
pub struct SetGoalRequest {
    pub target: String,
}

type HandlerResult<T> = Result<T, (StatusCode, String)>;

/// Maps a core error to a status code and its user-facing message.
fn port_error_response(e: PortError) -> (StatusCode, String) {
    let status = match &e {
        PortError::MissingField { .. } => StatusCode::BAD_REQUEST,
        PortError::NotFound { .. } => StatusCode::NOT_FOUND,
        PortError::StoreWrite { .. } => StatusCode::INSUFFICIENT_STORAGE,
        PortError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!("Study hub operation failed: {:?}", e);
    }
    (status, e.to_string())
}

//=========================================================================================
// Course Handlers
//=========================================================================================

/// Create a course.
#[utoipa::path(
    post,
    path = "/courses",
    request_body = NewCourse,
    responses(
        (status = 201, description = "Course created", body = Course),
        (status = 400, description = "A required field is missing"),
        (status = 507, description = "The store rejected the write")
    )
)]
pub async fn create_course_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewCourse>,
) -> HandlerResult<impl IntoResponse> {
    let course = state.hub.create_course(payload).await.map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(course)))
}

/// List every course.
#[utoipa::path(
    get,
    path = "/courses",
    responses((status = 200, description = "All courses", body = [Course]))
)]
pub async fn get_all_courses_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<Vec<Course>>> {
    let courses = state.hub.get_all_courses().await.map_err(port_error_response)?;
    Ok(Json(courses))
}

/// Fetch one course.
#[utoipa::path(
    get,
    path = "/courses/{id}",
    params(("id" = String, Path, description = "The course id.")),
    responses(
        (status = 200, description = "The course", body = Course),
        (status = 404, description = "No course with this id")
    )
)]
pub async fn get_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Json<Course>> {
    let course = state.hub.get_course(&id).await.map_err(port_error_response)?;
    Ok(Json(course))
}

/// Overlay the supplied fields onto a course.
#[utoipa::path(
    put,
    path = "/courses/{id}",
    params(("id" = String, Path, description = "The course id.")),
    request_body = CourseChanges,
    responses(
        (status = 200, description = "The updated course", body = Course),
        (status = 404, description = "No course with this id")
    )
)]
pub async fn update_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(changes): Json<CourseChanges>,
) -> HandlerResult<Json<Course>> {
    let course = state
        .hub
        .update_course(&id, changes)
        .await
        .map_err(port_error_response)?;
    Ok(Json(course))
}

/// Delete a course. Its flashcards and quizzes are kept.
#[utoipa::path(
    delete,
    path = "/courses/{id}",
    params(("id" = String, Path, description = "The course id.")),
    responses(
        (status = 200, description = "The course as it was before deletion", body = Course),
        (status = 404, description = "No course with this id")
    )
)]
pub async fn delete_course_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Json<Course>> {
    let course = state.hub.delete_course(&id).await.map_err(port_error_response)?;
    Ok(Json(course))
}

/// List the flashcards that reference a course id.
#[utoipa::path(
    get,
    path = "/courses/{id}/flashcards",
    params(("id" = String, Path, description = "The course id; need not exist.")),
    responses((status = 200, description = "Matching flashcards", body = [Flashcard]))
)]
pub async fn get_flashcards_for_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> HandlerResult<Json<Vec<Flashcard>>> {
    let flashcards = state
        .hub
        .get_flashcards_for_course(&course_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(flashcards))
}

/// List the quizzes that reference a course id.
#[utoipa::path(
    get,
    path = "/courses/{id}/quizzes",
    params(("id" = String, Path, description = "The course id; need not exist.")),
    responses((status = 200, description = "Matching quizzes", body = [Quiz]))
)]
pub async fn get_quizzes_for_course_handler(
    State(state): State<Arc<AppState>>,
    Path(course_id): Path<String>,
) -> HandlerResult<Json<Vec<Quiz>>> {
    let quizzes = state
        .hub
        .get_quizzes_for_course(&course_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(quizzes))
}

//=========================================================================================
// Flashcard and Quiz Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/flashcards",
    request_body = NewFlashcard,
    responses(
        (status = 201, description = "Flashcard created", body = Flashcard),
        (status = 400, description = "A required field is missing"),
        (status = 507, description = "The store rejected the write")
    )
)]
pub async fn create_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewFlashcard>,
) -> HandlerResult<impl IntoResponse> {
    let flashcard = state
        .hub
        .create_flashcard(payload)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(flashcard)))
}

#[utoipa::path(
    get,
    path = "/flashcards/{id}",
    params(("id" = String, Path, description = "The flashcard id.")),
    responses(
        (status = 200, description = "The flashcard", body = Flashcard),
        (status = 404, description = "No flashcard with this id")
    )
)]
pub async fn get_flashcard_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Json<Flashcard>> {
    let flashcard = state.hub.get_flashcard(&id).await.map_err(port_error_response)?;
    Ok(Json(flashcard))
}

#[utoipa::path(
    post,
    path = "/quizzes",
    request_body = NewQuiz,
    responses(
        (status = 201, description = "Quiz created", body = Quiz),
        (status = 400, description = "A required field is missing"),
        (status = 507, description = "The store rejected the write")
    )
)]
pub async fn create_quiz_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewQuiz>,
) -> HandlerResult<impl IntoResponse> {
    let quiz = state.hub.create_quiz(payload).await.map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

#[utoipa::path(
    get,
    path = "/quizzes/{id}",
    params(("id" = String, Path, description = "The quiz id.")),
    responses(
        (status = 200, description = "The quiz", body = Quiz),
        (status = 404, description = "No quiz with this id")
    )
)]
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Json<Quiz>> {
    let quiz = state.hub.get_quiz(&id).await.map_err(port_error_response)?;
    Ok(Json(quiz))
}

//=========================================================================================
// User Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "A required field is missing"),
        (status = 507, description = "The store rejected the write")
    )
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewUser>,
) -> HandlerResult<impl IntoResponse> {
    let user = state.hub.create_user(payload).await.map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/users",
    responses((status = 200, description = "All users", body = [User]))
)]
pub async fn get_all_users_handler(
    State(state): State<Arc<AppState>>,
) -> HandlerResult<Json<Vec<User>>> {
    let users = state.hub.get_all_users().await.map_err(port_error_response)?;
    Ok(Json(users))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "The user id.")),
    responses(
        (status = 200, description = "The user", body = User),
        (status = 404, description = "No user with this id")
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> HandlerResult<Json<User>> {
    let user = state.hub.get_user(&id).await.map_err(port_error_response)?;
    Ok(Json(user))
}

/// Set a user's language learning goal.
///
/// Only `goals` changes; `updatedAt` keeps its previous value.
#[utoipa::path(
    put,
    path = "/users/{id}/goals",
    params(("id" = String, Path, description = "The user id.")),
    request_body = SetGoalRequest,
    responses(
        (status = 200, description = "The user with the new goal", body = User),
        (status = 404, description = "No user with this id")
    )
)]
pub async fn set_goal_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<SetGoalRequest>,
) -> HandlerResult<Json<User>> {
    let user = state
        .hub
        .set_language_learning_goal(&user_id, &req.target)
        .await
        .map_err(port_error_response)?;
    Ok(Json(user))
}
