use thiserror::Error;

/// Pre-dispatch form validation failure. Caught at the component boundary
/// before any network call is issued.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },
}
