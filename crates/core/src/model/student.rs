use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentInfoError {
    #[error("{field} is required")]
    Missing { field: &'static str },
}

/// Identity details a student enters before starting a quiz.
///
/// Values are opaque strings; only presence is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInfo {
    pub title: String,
    pub first_name: String,
    pub middle_initial: String,
    pub last_name: String,
    pub email: String,
}

impl StudentInfo {
    /// Builds student info, trimming each field.
    ///
    /// # Errors
    ///
    /// Returns `StudentInfoError::Missing` for the first empty field.
    pub fn new(
        title: impl Into<String>,
        first_name: impl Into<String>,
        middle_initial: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, StudentInfoError> {
        let info = Self {
            title: title.into().trim().to_string(),
            first_name: first_name.into().trim().to_string(),
            middle_initial: middle_initial.into().trim().to_string(),
            last_name: last_name.into().trim().to_string(),
            email: email.into().trim().to_string(),
        };
        info.check_present()?;
        Ok(info)
    }

    /// Checks that no field is empty.
    ///
    /// # Errors
    ///
    /// Returns `StudentInfoError::Missing` naming the first empty field.
    pub fn check_present(&self) -> Result<(), StudentInfoError> {
        for (field, value) in self.fields() {
            if value.trim().is_empty() {
                return Err(StudentInfoError::Missing { field });
            }
        }
        Ok(())
    }

    /// `"First Last"`, as shown on the results screen.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("title", &self.title),
            ("first name", &self.first_name),
            ("middle initial", &self.middle_initial),
            ("last name", &self.last_name),
            ("email", &self.email),
        ]
    }
}
