use std::fmt;

use serde_json::{Map, Value};

use crate::CredentialError;

/// Database username/password pair decoded from a secret payload.
///
/// Lives only for the duration of one ingestion. `Debug` output is redacted and
/// the type deliberately implements neither `Clone` nor `Serialize`.
pub struct CredentialBundle {
    username: String,
    password: String,
}

impl CredentialBundle {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle").finish_non_exhaustive()
    }
}

/// Decodes a secret payload of the form `{"username": "...", "password": "..."}`.
///
/// Additional keys (RDS-managed secrets also carry `engine`, `host`, `port`,
/// `dbname`) are ignored. Both fields must be non-empty strings.
pub fn parse_secret_payload(payload: &str) -> Result<CredentialBundle, CredentialError> {
    let value: Value = serde_json::from_str(payload).map_err(|err| {
        CredentialError::SecretMalformed(format!(
            "payload is not valid JSON ({:?} error at line {}, column {})",
            err.classify(),
            err.line(),
            err.column()
        ))
    })?;

    let Value::Object(fields) = value else {
        return Err(CredentialError::SecretMalformed(
            "payload is not a JSON object".into(),
        ));
    };

    let username = required_string(&fields, "username")?;
    let password = required_string(&fields, "password")?;
    Ok(CredentialBundle::new(username, password))
}

fn required_string(fields: &Map<String, Value>, key: &str) -> Result<String, CredentialError> {
    match fields.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(CredentialError::SecretMalformed(format!(
            "`{key}` field is empty"
        ))),
        Some(_) => Err(CredentialError::SecretMalformed(format!(
            "`{key}` field is not a string"
        ))),
        None => Err(CredentialError::SecretMalformed(format!(
            "missing `{key}` field"
        ))),
    }
}
