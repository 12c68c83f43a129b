use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Gender values stored on a user row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }

    /// The gender discovery defaults to when the requester sets none
    pub fn opposite(&self) -> Self {
        match self {
            Gender::Male => Gender::Female,
            Gender::Female => Gender::Male,
        }
    }

    /// Parse the stored string form, case-insensitively
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

/// User profile as stored, with its photos attached
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    #[serde(rename = "knownAs")]
    pub known_as: String,
    pub gender: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: NaiveDate,
    pub created: DateTime<Utc>,
    #[serde(rename = "lastActive")]
    pub last_active: DateTime<Utc>,
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
    #[sqlx(skip)]
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl User {
    /// The photo flagged as main, if any
    pub fn main_photo(&self) -> Option<&Photo> {
        self.photos.iter().find(|p| p.is_main)
    }

    /// Helper to get the stored gender as an enum value
    pub fn gender(&self) -> Option<Gender> {
        Gender::parse(&self.gender)
    }

    /// Age in whole years on the given day
    pub fn age_on(&self, today: NaiveDate) -> i32 {
        let dob = self.date_of_birth;
        let mut age = today.year() - dob.year();
        if (today.month(), today.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        age
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Photo {
    pub id: i32,
    #[serde(rename = "userId")]
    pub user_id: i32,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "dateAdded")]
    pub date_added: DateTime<Utc>,
    #[serde(rename = "isMain")]
    pub is_main: bool,
}

/// Directed like edge, unique per (liker, likee) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct Like {
    #[serde(rename = "likerId")]
    pub liker_id: i32,
    #[serde(rename = "likeeId")]
    pub likee_id: i32,
}

/// A message between two users
///
/// Each party owns one deletion flag. The row stays until both are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: i32,
    #[serde(rename = "senderId")]
    pub sender_id: i32,
    #[serde(rename = "recipientId")]
    pub recipient_id: i32,
    pub content: String,
    #[serde(rename = "isRead")]
    pub is_read: bool,
    #[serde(rename = "dateRead")]
    pub date_read: Option<DateTime<Utc>>,
    #[serde(rename = "messageSent")]
    pub message_sent: DateTime<Utc>,
    #[serde(rename = "senderDeleted")]
    pub sender_deleted: bool,
    #[serde(rename = "recipientDeleted")]
    pub recipient_deleted: bool,
}

impl Message {
    pub fn involves(&self, user_id: i32) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }

    /// Set the deletion flag(s) owned by `user_id`
    ///
    /// A user who messaged themselves owns both flags.
    pub fn soft_delete_for(&mut self, user_id: i32) -> MessageDeletion {
        if self.sender_id == user_id {
            self.sender_deleted = true;
        }
        if self.recipient_id == user_id {
            self.recipient_deleted = true;
        }

        if self.sender_deleted && self.recipient_deleted {
            MessageDeletion::Purged
        } else {
            MessageDeletion::Hidden
        }
    }

    pub fn mark_read(&mut self, at: DateTime<Utc>) {
        self.is_read = true;
        self.date_read = Some(at);
    }
}

/// What a delete request did to the underlying row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageDeletion {
    /// Hidden from the caller, still visible to the other party
    Hidden,
    /// Both parties deleted it and the row was removed
    Purged,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message(sender_id: i32, recipient_id: i32) -> Message {
        Message {
            id: 1,
            sender_id,
            recipient_id,
            content: "hi".to_string(),
            is_read: false,
            date_read: None,
            message_sent: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            sender_deleted: false,
            recipient_deleted: false,
        }
    }

    #[test]
    fn test_gender_opposite() {
        assert_eq!(Gender::Male.opposite(), Gender::Female);
        assert_eq!(Gender::Female.opposite(), Gender::Male);
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("other"), None);
    }

    #[test]
    fn test_soft_delete_needs_both_parties() {
        let mut msg = message(1, 2);

        assert_eq!(msg.soft_delete_for(2), MessageDeletion::Hidden);
        assert!(msg.recipient_deleted);
        assert!(!msg.sender_deleted);

        assert_eq!(msg.soft_delete_for(1), MessageDeletion::Purged);
    }

    #[test]
    fn test_soft_delete_self_message_purges() {
        let mut msg = message(3, 3);
        assert_eq!(msg.soft_delete_for(3), MessageDeletion::Purged);
    }

    #[test]
    fn test_age_on_birthday_boundary() {
        let user = User {
            id: 1,
            username: "sam".to_string(),
            known_as: "Sam".to_string(),
            gender: "female".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(2000, 6, 15).unwrap(),
            created: Utc::now(),
            last_active: Utc::now(),
            introduction: None,
            looking_for: None,
            interests: None,
            city: None,
            country: None,
            photos: vec![],
        };

        assert_eq!(user.age_on(NaiveDate::from_ymd_opt(2020, 6, 14).unwrap()), 19);
        assert_eq!(user.age_on(NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()), 20);
    }
}
