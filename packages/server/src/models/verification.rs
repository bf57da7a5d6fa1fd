use axum::http::StatusCode;

/// Result of following a verification link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    /// Empty, or not 64 hex characters.
    Malformed,
    NotFound,
    AlreadyUsed,
    Expired,
    /// Storage failure; the transaction was rolled back.
    Failed,
}

impl VerificationOutcome {
    pub fn status(self) -> StatusCode {
        match self {
            Self::Verified => StatusCode::OK,
            Self::Malformed => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::AlreadyUsed => StatusCode::CONFLICT,
            Self::Expired => StatusCode::GONE,
            Self::Failed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Verified => "Email verified. Your application is confirmed.",
            Self::Malformed => "Invalid verification token.",
            Self::NotFound => "Verification link is invalid or already used.",
            Self::AlreadyUsed => "This verification link has already been used.",
            Self::Expired => "This verification link has expired.",
            Self::Failed => "Verification failed. Please contact admissions.",
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Verified
    }
}

/// Query string of `GET /verify-email`.
#[derive(Debug, serde::Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    /// Raw token from the emailed link.
    #[serde(default)]
    pub token: String,
}
