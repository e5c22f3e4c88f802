// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{auth, categories, student, teacher},
    state::AppState,
    utils::jwt::{auth_middleware, student_middleware, teacher_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, categories, teacher, student).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, engine, config).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(authenticated.clone()),
        );

    let category_routes = Router::new().route("/", get(categories::list_categories));

    // Auth runs first (outermost layer), then the role check
    let teacher_routes = Router::new()
        .route(
            "/exams",
            get(teacher::list_exams).post(teacher::create_exam),
        )
        .route(
            "/exams/{id}",
            get(teacher::get_exam)
                .put(teacher::update_exam)
                .delete(teacher::delete_exam),
        )
        .route("/categories", post(categories::create_category))
        .route("/analytics", get(teacher::analytics))
        .route("/students-analytics", get(teacher::students_analytics))
        .layer(middleware::from_fn(teacher_middleware))
        .layer(authenticated.clone());

    let student_routes = Router::new()
        .route("/exams", get(student::list_exams))
        .route("/exams/{id}", get(student::get_exam))
        .route("/exams/{id}/status", get(student::exam_status))
        .route("/exams/{id}/submit", post(student::submit_exam))
        .route("/results", get(student::list_results))
        .route("/results/{id}", get(student::get_result))
        .route("/analytics", get(student::analytics))
        .route("/analytics/details", get(student::analytics_details))
        .layer(middleware::from_fn(student_middleware))
        .layer(authenticated);

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/teacher", teacher_routes)
        .nest("/api/student", student_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
