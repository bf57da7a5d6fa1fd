use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use tracing::instrument;

use crate::models::verification::{VerificationOutcome, VerifyQuery};
use crate::notify::escape_html;
use crate::state::AppState;
use crate::verification::verify_email;

#[utoipa::path(
    get,
    path = "/verify-email",
    tag = "Verification",
    operation_id = "verifyEmail",
    summary = "Confirm an applicant email address",
    description = "Target of the link emailed after submission. Consumes the single-use token \
        and marks the applicant's email as verified. Returns a human-readable HTML page; the \
        status code tells the outcomes apart.",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Email verified", content_type = "text/html"),
        (status = 400, description = "Malformed token", content_type = "text/html"),
        (status = 404, description = "Unknown token", content_type = "text/html"),
        (status = 409, description = "Token already used", content_type = "text/html"),
        (status = 410, description = "Token expired", content_type = "text/html"),
        (status = 500, description = "Verification failed", content_type = "text/html"),
    ),
)]
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> Response {
    let outcome = match query {
        Ok(Query(q)) => verify_email(&state.db, &q.token).await,
        Err(_) => VerificationOutcome::Malformed,
    };

    let page = render_page(&state.config.site.name, outcome);
    (outcome.status(), Html(page)).into_response()
}

fn render_page(site_name: &str, outcome: VerificationOutcome) -> String {
    let site = escape_html(site_name);
    let title = if outcome.is_success() {
        "Email verified"
    } else {
        "Email verification"
    };
    format!(
        "<!DOCTYPE html>\
         <html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title} - {site}</title></head>\
         <body><main><h1>{site}</h1><p>{message}</p></main></body></html>",
        message = outcome.message(),
    )
}
