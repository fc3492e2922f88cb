use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;
use crate::errors::ValidationError;

/// Client-side draft for `POST /requests`. The backend derives the requester
/// from the session token, so the payload never carries a requester id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequest {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub type_key: String,
    pub approver_id: UserId,
}

impl NewRequest {
    /// Required-field presence check, run before dispatch. Whitespace-only
    /// values count as missing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        require("description", &self.description)?;
        require("type", &self.type_key)?;
        Ok(())
    }

    /// Trimmed copy ready for submission.
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            description: self.description.trim().to_owned(),
            type_key: self.type_key.trim().to_owned(),
            approver_id: self.approver_id,
        }
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::NewRequest;
    use crate::domain::user::UserId;
    use crate::errors::ValidationError;

    fn draft() -> NewRequest {
        NewRequest {
            title: "Despliegue pagos v2".to_owned(),
            description: "Ventana nocturna, sin impacto".to_owned(),
            type_key: "despliegue".to_owned(),
            approver_id: UserId(7),
        }
    }

    #[test]
    fn complete_draft_validates() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn whitespace_only_fields_are_missing() {
        let mut missing_title = draft();
        missing_title.title = "   ".to_owned();
        assert_eq!(
            missing_title.validate(),
            Err(ValidationError::MissingField { field: "title" })
        );

        let mut missing_type = draft();
        missing_type.type_key = String::new();
        assert_eq!(
            missing_type.validate(),
            Err(ValidationError::MissingField { field: "type" })
        );
    }

    #[test]
    fn normalized_trims_text_fields() {
        let mut padded = draft();
        padded.title = "  Despliegue  ".to_owned();
        assert_eq!(padded.normalized().title, "Despliegue");
    }

    #[test]
    fn type_key_serializes_under_wire_name() {
        let json = serde_json::to_string(&draft()).unwrap();
        assert!(json.contains(r#""type":"despliegue""#));
        assert!(json.contains(r#""approver_id":7"#));
    }
}
