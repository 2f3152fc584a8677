use actix_web::{web, HttpResponse};
use api_error::{ApiError, ApiResult};
use auth_filter::CallerIdentity;
use jwt_auth::Role;
use pagination::{PageQuery, PageResponse};
use sqlx::PgPool;
use tracing::info;
use validator::Validate;

use crate::db::courses;
use crate::models::{CourseRequest, CourseResponse, CourseStatus};
use crate::ownership;

pub async fn create(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    payload: web::Json<CourseRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_any(&[Role::Instructor, Role::Admin])?;
    let req = payload.into_inner();
    req.validate()?;

    let course = courses::create_course(
        &pool,
        &req.title,
        req.description.as_deref(),
        caller.user_id,
    )
    .await?;

    info!(course_id = course.id, instructor_id = caller.user_id, "course created");
    Ok(HttpResponse::Created().json(CourseResponse::from(course)))
}

/// Public read path. Serves anonymous catalogue reads and forwarded-token
/// ownership checks from the enrollment peer alike.
pub async fn get(pool: web::Data<PgPool>, path: web::Path<i64>) -> ApiResult<HttpResponse> {
    let course = courses::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;
    Ok(HttpResponse::Ok().json(CourseResponse::from(course)))
}

pub async fn list(
    pool: web::Data<PgPool>,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    let page = query.into_inner().clamped();
    let content = courses::list_published(&pool, page.limit(), page.offset()).await?;
    let total = courses::count_published(&pool).await?;
    let response = PageResponse::new(content, page, total).map(CourseResponse::from);
    Ok(HttpResponse::Ok().json(response))
}

pub async fn update(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    path: web::Path<i64>,
    payload: web::Json<CourseRequest>,
) -> ApiResult<HttpResponse> {
    let course = courses::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    ownership::require_course_owner(&course, &caller)?;

    let req = payload.into_inner();
    req.validate()?;

    let course =
        courses::update_course(&pool, course.id, &req.title, req.description.as_deref()).await?;
    info!(course_id = course.id, "course updated");
    Ok(HttpResponse::Ok().json(CourseResponse::from(course)))
}

pub async fn delete(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let course = courses::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    ownership::require_course_owner(&course, &caller)?;

    courses::delete_course(&pool, course.id).await?;
    info!(course_id = course.id, "course deleted");
    Ok(HttpResponse::NoContent().finish())
}

pub async fn publish(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let course = courses::find_by_id(&pool, path.into_inner())
        .await?
        .ok_or_else(|| ApiError::not_found("Course not found"))?;

    ownership::require_course_owner(&course, &caller)?;

    if course.status != CourseStatus::Draft {
        return Err(ApiError::conflict("Only draft courses can be published"));
    }

    let course = courses::set_status(&pool, course.id, CourseStatus::Published).await?;
    info!(course_id = course.id, "course published");
    Ok(HttpResponse::Ok().json(CourseResponse::from(course)))
}

pub async fn mine(
    pool: web::Data<PgPool>,
    caller: CallerIdentity,
    query: web::Query<PageQuery>,
) -> ApiResult<HttpResponse> {
    caller.require_any(&[Role::Instructor, Role::Admin])?;
    let page = query.into_inner().clamped();
    let content =
        courses::list_by_instructor(&pool, caller.user_id, page.limit(), page.offset()).await?;
    let total = courses::count_by_instructor(&pool, caller.user_id).await?;
    let response = PageResponse::new(content, page, total).map(CourseResponse::from);
    Ok(HttpResponse::Ok().json(response))
}
