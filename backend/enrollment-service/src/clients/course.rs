//! HTTP client for the course peer.
//!
//! The same read path is hit from two call sites with different meanings: an
//! anonymous existence/publication check during enrollment, and an
//! ownership check performed with the caller's forwarded credential.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// The slice of a course this service cares about.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: i64,
    pub title: String,
    pub instructor_id: i64,
    pub status: String,
}

impl CourseSummary {
    pub fn is_published(&self) -> bool {
        self.status == "PUBLISHED"
    }
}

/// Peer failures, kept distinct so callers can map each to the right outcome.
/// `Unavailable` must never be collapsed into a permission decision.
#[derive(Debug, thiserror::Error)]
pub enum CourseClientError {
    #[error("course not found")]
    NotFound,
    #[error("course service rejected the request with status {0}")]
    Rejected(u16),
    #[error("course service unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CourseApi: Send + Sync {
    /// Anonymous read: existence and publication state.
    async fn get_course(&self, course_id: i64) -> Result<CourseSummary, CourseClientError>;

    /// Read on behalf of the caller, forwarding their `Authorization` header
    /// value unchanged.
    async fn get_course_as_caller(
        &self,
        course_id: i64,
        authorization: &str,
    ) -> Result<CourseSummary, CourseClientError>;
}

pub struct HttpCourseClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCourseClient {
    pub fn new(base_url: &str) -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch(
        &self,
        course_id: i64,
        authorization: Option<&str>,
    ) -> Result<CourseSummary, CourseClientError> {
        let url = format!("{}/api/courses/{}", self.base_url, course_id);
        let mut request = self.client.get(&url);
        if let Some(value) = authorization {
            request = request.header(AUTHORIZATION, value);
        }

        let response = request.send().await.map_err(|e| {
            warn!(course_id, error = %e, "course service unreachable");
            CourseClientError::Unavailable(e.to_string())
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(CourseClientError::NotFound),
            status if status.is_success() => response
                .json::<CourseSummary>()
                .await
                .map_err(|e| CourseClientError::Unavailable(format!("bad peer response: {e}"))),
            status => Err(CourseClientError::Rejected(status.as_u16())),
        }
    }
}

#[async_trait]
impl CourseApi for HttpCourseClient {
    async fn get_course(&self, course_id: i64) -> Result<CourseSummary, CourseClientError> {
        self.fetch(course_id, None).await
    }

    async fn get_course_as_caller(
        &self,
        course_id: i64,
        authorization: &str,
    ) -> Result<CourseSummary, CourseClientError> {
        self.fetch(course_id, Some(authorization)).await
    }
}
