use serde::{Deserialize, Serialize};

use crate::{
    domain::{ContactField, SubmissionId},
    error::ValidationError,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFields {
    pub name: String,
    pub email: String,
    pub message: String,
}

impl ContactFields {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            message: message.into(),
        }
    }

    pub fn get(&self, field: ContactField) -> &str {
        match field {
            ContactField::Name => &self.name,
            ContactField::Email => &self.email,
            ContactField::Message => &self.message,
        }
    }

    pub fn set(&mut self, field: ContactField, value: impl Into<String>) {
        let slot = match field {
            ContactField::Name => &mut self.name,
            ContactField::Email => &mut self.email,
            ContactField::Message => &mut self.message,
        };
        *slot = value.into();
    }

    pub fn clear(&mut self) {
        self.name.clear();
        self.email.clear();
        self.message.clear();
    }

    pub fn is_empty(&self) -> bool {
        ContactField::ALL
            .into_iter()
            .all(|field| self.get(field).is_empty())
    }

    /// Pre-submit check run by the presentation layer. The pipeline itself
    /// never calls this; it trusts whatever it is asked to deliver.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for field in ContactField::ALL {
            if self.get(field).trim().is_empty() {
                return Err(ValidationError::EmptyField(field));
            }
        }
        if !is_email_shaped(self.email.trim()) {
            return Err(ValidationError::MalformedEmail(self.email.clone()));
        }
        Ok(())
    }
}

fn is_email_shaped(raw: &str) -> bool {
    if raw.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}

/// One delivery attempt handed to a delivery strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSubmission {
    pub id: SubmissionId,
    pub fields: ContactFields,
}

/// Form body expected by the third-party relay endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RelayForm<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub message: &'a str,
    #[serde(rename = "_captcha", skip_serializing_if = "Option::is_none")]
    pub captcha: Option<&'static str>,
    #[serde(rename = "_next", skip_serializing_if = "Option::is_none")]
    pub next: Option<&'a str>,
}

impl<'a> RelayForm<'a> {
    pub fn new(fields: &'a ContactFields, disable_captcha: bool, next: Option<&'a str>) -> Self {
        Self {
            name: &fields.name,
            email: &fields.email,
            message: &fields.message,
            captcha: disable_captcha.then_some("false"),
            next,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
