use serde_json::json;
use thiserror::Error;

/// Fatal error taxonomy. Feasibility issues in a solution are not errors,
/// they surface as violation tags on the output document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Input(String),
    #[error("{0}")]
    Routing(String),
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Process exit code: 1 internal, 2 input, 3 routing.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Internal(_) => 1,
            Error::Input(_) => 2,
            Error::Routing(_) => 3,
        }
    }

    /// Single-object JSON document reported instead of a solution.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "code": self.exit_code(),
            "error": self.to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_taxonomy() {
        assert_eq!(Error::Internal("x".into()).exit_code(), 1);
        assert_eq!(Error::Input("x".into()).exit_code(), 2);
        assert_eq!(Error::Routing("x".into()).exit_code(), 3);
    }

    #[test]
    fn error_document_shape() {
        let doc = Error::Input("bad amount".into()).to_json();
        assert_eq!(doc["code"], 2);
        assert_eq!(doc["error"], "bad amount");
    }
}
