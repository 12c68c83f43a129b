use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

use crate::core::discovery::UserQuery;
use crate::core::likes::LikeDirection;
use crate::core::messages::MessageScope;
use crate::core::paging::{PageRequest, PagedList};
use crate::models::{Like, Message, Photo, ProfileUpdate, User};

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// A message waiting for its id
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub message_sent: DateTime<Utc>,
}

/// One tracked mutation
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddLike(Like),
    AddMessage(PendingMessage),
    /// Write back read and deletion state
    UpdateMessage(Message),
    RemoveMessage(i32),
    TouchLastActive { user_id: i32, at: DateTime<Utc> },
    UpdateProfile { user_id: i32, update: ProfileUpdate },
}

/// Mutations collected during one operation and committed together
///
/// Built fresh per request; nothing is written until `persist`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_like(&mut self, like: Like) -> &mut Self {
        self.changes.push(Change::AddLike(like));
        self
    }

    pub fn add_message(&mut self, message: PendingMessage) -> &mut Self {
        self.changes.push(Change::AddMessage(message));
        self
    }

    pub fn update_message(&mut self, message: &Message) -> &mut Self {
        self.changes.push(Change::UpdateMessage(message.clone()));
        self
    }

    pub fn remove_message(&mut self, message_id: i32) -> &mut Self {
        self.changes.push(Change::RemoveMessage(message_id));
        self
    }

    pub fn touch_last_active(&mut self, user_id: i32, at: DateTime<Utc>) -> &mut Self {
        self.changes.push(Change::TouchLastActive { user_id, at });
        self
    }

    pub fn update_profile(&mut self, user_id: i32, update: ProfileUpdate) -> &mut Self {
        self.changes.push(Change::UpdateProfile { user_id, update });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

/// Outcome of a commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub rows_affected: u64,
    /// Ids assigned to added messages, in the order they were staged
    pub created_message_ids: Vec<i32>,
}

impl CommitReport {
    /// False when the commit wrote nothing
    pub fn wrote_anything(&self) -> bool {
        self.rows_affected > 0
    }
}

/// Storage collaborator for the discovery, like and messaging queries
#[async_trait]
pub trait DatingRepository: Send + Sync {
    /// A user with their photos attached
    async fn get_user(&self, id: i32) -> Result<Option<User>, RepositoryError>;

    async fn get_photo(&self, id: i32) -> Result<Option<Photo>, RepositoryError>;

    async fn get_main_photo_for_user(&self, user_id: i32) -> Result<Option<Photo>, RepositoryError>;

    /// The edge for "liker likes likee", if present
    async fn find_like(&self, liker_id: i32, likee_id: i32) -> Result<Option<Like>, RepositoryError>;

    /// Ids on the far side of `user_id`'s edges in one direction
    async fn like_ids(
        &self,
        user_id: i32,
        direction: LikeDirection,
    ) -> Result<HashSet<i32>, RepositoryError>;

    async fn users_page(
        &self,
        query: &UserQuery,
        page: PageRequest,
    ) -> Result<PagedList<User>, RepositoryError>;

    async fn find_message(&self, id: i32) -> Result<Option<Message>, RepositoryError>;

    async fn messages_page(
        &self,
        scope: &MessageScope,
        page: PageRequest,
    ) -> Result<PagedList<Message>, RepositoryError>;

    /// Every message in scope, newest first, unpaged
    async fn messages(&self, scope: &MessageScope) -> Result<Vec<Message>, RepositoryError>;

    /// Apply all changes atomically
    async fn persist(&self, changes: ChangeSet) -> Result<CommitReport, RepositoryError>;
}
