use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::Gender;

pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_MAX_AGE: u32 = 99;

/// Discovery query parameters
///
/// The requester id is never part of the parameters; it is passed
/// alongside them by the authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_age_range"))]
pub struct UserParameters {
    #[validate(range(min = 1))]
    #[serde(rename = "pageNumber", default = "default_page_number")]
    pub page_number: u32,
    #[validate(range(min = 1))]
    #[serde(rename = "pageSize", default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(rename = "minAge", default = "default_min_age")]
    pub min_age: u32,
    #[serde(rename = "maxAge", default = "default_max_age")]
    pub max_age: u32,
    #[serde(default)]
    pub likers: bool,
    #[serde(default)]
    pub likees: bool,
    #[serde(rename = "orderBy", default)]
    pub order_by: Option<String>,
}

impl Default for UserParameters {
    fn default() -> Self {
        Self {
            page_number: default_page_number(),
            page_size: None,
            gender: None,
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            likers: false,
            likees: false,
            order_by: None,
        }
    }
}

impl UserParameters {
    /// True when the age bounds differ from the 18..=99 defaults
    pub fn has_age_filter(&self) -> bool {
        self.min_age != DEFAULT_MIN_AGE || self.max_age != DEFAULT_MAX_AGE
    }
}

fn validate_age_range(params: &UserParameters) -> Result<(), ValidationError> {
    if params.min_age > params.max_age {
        return Err(ValidationError::new("min_age_exceeds_max_age"));
    }
    Ok(())
}

fn default_page_number() -> u32 {
    1
}

fn default_min_age() -> u32 {
    DEFAULT_MIN_AGE
}

fn default_max_age() -> u32 {
    DEFAULT_MAX_AGE
}

/// Named view over a user's messages
///
/// Unknown or missing selectors fall back to `Unread`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum MessageContainer {
    Inbox,
    Outbox,
    #[default]
    Unread,
}

impl MessageContainer {
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "inbox" => MessageContainer::Inbox,
            "outbox" => MessageContainer::Outbox,
            _ => MessageContainer::Unread,
        }
    }
}

impl From<String> for MessageContainer {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Message listing parameters
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MessageParameters {
    #[validate(range(min = 1))]
    #[serde(rename = "pageNumber", default = "default_page_number")]
    pub page_number: u32,
    #[validate(range(min = 1))]
    #[serde(rename = "pageSize", default)]
    pub page_size: Option<u32>,
    #[serde(rename = "messageContainer", default)]
    pub message_container: MessageContainer,
}

impl Default for MessageParameters {
    fn default() -> Self {
        Self::for_container(MessageContainer::Unread)
    }
}

impl MessageParameters {
    pub fn for_container(container: MessageContainer) -> Self {
        Self {
            page_number: default_page_number(),
            page_size: None,
            message_container: container,
        }
    }
}

/// Request to send a message
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewMessage {
    #[serde(rename = "recipientId")]
    pub recipient_id: i32,
    #[validate(length(min = 1))]
    pub content: String,
}

/// Editable profile fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub introduction: Option<String>,
    #[serde(rename = "lookingFor", default)]
    pub looking_for: Option<String>,
    #[serde(default)]
    pub interests: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_parsing_falls_back_to_unread() {
        assert_eq!(MessageContainer::parse("Inbox"), MessageContainer::Inbox);
        assert_eq!(MessageContainer::parse("outbox"), MessageContainer::Outbox);
        assert_eq!(MessageContainer::parse("Sent"), MessageContainer::Unread);
        assert_eq!(MessageContainer::default(), MessageContainer::Unread);
    }

    #[test]
    fn test_message_parameters_from_json() {
        let params: MessageParameters =
            serde_json::from_str(r#"{"messageContainer":"Outbox","pageSize":5}"#).unwrap();
        assert_eq!(params.message_container, MessageContainer::Outbox);
        assert_eq!(params.page_number, 1);
        assert_eq!(params.page_size, Some(5));

        let params: MessageParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params.message_container, MessageContainer::Unread);
    }

    #[test]
    fn test_user_parameters_defaults() {
        let params: UserParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params.min_age, 18);
        assert_eq!(params.max_age, 99);
        assert!(!params.has_age_filter());
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_inverted_age_range_rejected() {
        let params = UserParameters {
            min_age: 40,
            max_age: 30,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_page_number_rejected() {
        let params = MessageParameters {
            page_number: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
