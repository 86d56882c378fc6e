#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum MedMcpError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClientInit(reqwest::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP middleware error: {0}")]
    HttpMiddleware(#[from] reqwest_middleware::Error),

    #[error("API error from {api}: {message}")]
    Api { api: String, message: String },

    #[error("API JSON error from {api}: {source}")]
    ApiJson {
        api: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity} '{id}' not found.\n\n{suggestion}")]
    NotFound {
        entity: String,
        id: String,
        suggestion: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::MedMcpError;

    #[test]
    fn not_found_display_includes_suggestion() {
        let err = MedMcpError::NotFound {
            entity: "drug".to_string(),
            id: "tylenol".to_string(),
            suggestion: "Try the generic name: medmcp convert acetaminophen".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("drug 'tylenol' not found"));
        assert!(msg.contains("Try the generic name"));
    }

    #[test]
    fn api_error_display_includes_api_name() {
        let err = MedMcpError::Api {
            api: "openfda".to_string(),
            message: "HTTP 500".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("openfda"));
        assert!(msg.contains("HTTP 500"));
    }

    #[test]
    fn invalid_argument_display_is_prefixed() {
        let err = MedMcpError::InvalidArgument("batch size must be 25 or fewer".into());
        assert!(err.to_string().starts_with("Invalid argument:"));
    }
}
