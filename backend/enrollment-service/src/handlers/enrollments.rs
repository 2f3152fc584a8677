use actix_web::{web, HttpRequest, HttpResponse};
use api_error::{ApiError, ApiResult};
use auth_filter::{bearer_header, CallerIdentity};
use jwt_auth::Role;
use sqlx::PgPool;
use validator::Validate;

use crate::models::{
    EnrollRequest, EnrollmentListQuery, EnrollmentResponse, ProgressUpdateRequest,
};
use crate::services::EnrollmentService;

// PgPool is kept in app data for the health check only; all business access
// goes through EnrollmentService.
pub async fn health(pool: web::Data<PgPool>) -> HttpResponse {
    match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({ "status": "UP" })),
        Err(_) => HttpResponse::ServiceUnavailable()
            .json(serde_json::json!({ "status": "DOWN" })),
    }
}

pub async fn enroll(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    payload: web::Json<EnrollRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(Role::Student)?;
    let enrollment = service.enroll(caller.user_id, payload.course_id).await?;
    Ok(HttpResponse::Created().json(EnrollmentResponse::from(enrollment)))
}

pub async fn update_progress(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    path: web::Path<i64>,
    payload: web::Json<ProgressUpdateRequest>,
) -> ApiResult<HttpResponse> {
    caller.require_role(Role::Student)?;
    let req = payload.into_inner();
    req.validate()?;
    let enrollment = service
        .update_progress(path.into_inner(), caller.user_id, req.progress)
        .await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)))
}

pub async fn cancel(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    caller.require_role(Role::Student)?;
    service.cancel(path.into_inner(), caller.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn issue_certificate(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    caller.require_role(Role::Student)?;
    let enrollment = service
        .issue_certificate(path.into_inner(), caller.user_id)
        .await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)))
}

pub async fn my_enrollments(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    query: web::Query<EnrollmentListQuery>,
) -> ApiResult<HttpResponse> {
    caller.require_role(Role::Student)?;
    let q = query.into_inner();
    let page = service
        .my_enrollments(caller.user_id, q.status, q.page_query())
        .await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn get_enrollment(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let authorization = forwarded_credential(&req)?;
    let enrollment = service
        .get_enrollment(path.into_inner(), &caller, &authorization)
        .await?;
    Ok(HttpResponse::Ok().json(EnrollmentResponse::from(enrollment)))
}

pub async fn course_enrollments(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<EnrollmentListQuery>,
) -> ApiResult<HttpResponse> {
    let authorization = forwarded_credential(&req)?;
    let q = query.into_inner();
    let page = service
        .course_enrollments(path.into_inner(), &caller, &authorization, q.status, q.page_query())
        .await?;
    Ok(HttpResponse::Ok().json(page.map(EnrollmentResponse::from)))
}

pub async fn course_stats(
    service: web::Data<EnrollmentService>,
    caller: CallerIdentity,
    req: HttpRequest,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let authorization = forwarded_credential(&req)?;
    let stats = service
        .course_stats(path.into_inner(), &caller, &authorization)
        .await?;
    Ok(HttpResponse::Ok().json(stats))
}

// The CallerIdentity extractor has already proven a credential was sent, so a
// missing header here cannot happen in practice.
fn forwarded_credential(req: &HttpRequest) -> Result<String, ApiError> {
    bearer_header(req).ok_or_else(|| ApiError::unauthorized("Authentication required"))
}
