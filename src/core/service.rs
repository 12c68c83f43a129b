use chrono::Utc;
use std::collections::HashSet;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::config::PagingSettings;
use crate::core::discovery::UserQuery;
use crate::core::likes::LikeDirection;
use crate::core::messages::MessageScope;
use crate::core::paging::{PageRequest, PagedList};
use crate::models::{
    Gender, Like, Message, MessageDeletion, MessageParameters, NewMessage, Photo, ProfileUpdate,
    User, UserParameters,
};
use crate::services::repository::{ChangeSet, DatingRepository, PendingMessage, RepositoryError};

/// Errors surfaced to the caller of the dating operations
#[derive(Debug, Error)]
pub enum DatingError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DatingError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(msg) => DatingError::Conflict(msg),
            other => DatingError::Repository(other),
        }
    }
}

/// Discovery, like and messaging operations over a storage backend
///
/// Every operation takes the authenticated user id explicitly and runs
/// as one unit of work: reads go straight to the repository, writes are
/// collected in a fresh `ChangeSet` and committed once.
pub struct DatingService<R> {
    repository: R,
    paging: PagingSettings,
}

impl<R: DatingRepository> DatingService<R> {
    pub fn new(repository: R, paging: PagingSettings) -> Self {
        Self { repository, paging }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>, DatingError> {
        Ok(self.repository.get_user(id).await?)
    }

    pub async fn get_photo(&self, id: i32) -> Result<Option<Photo>, DatingError> {
        Ok(self.repository.get_photo(id).await?)
    }

    pub async fn get_main_photo_for_user(&self, user_id: i32) -> Result<Option<Photo>, DatingError> {
        Ok(self.repository.get_main_photo_for_user(user_id).await?)
    }

    /// Page of users for the requester to browse
    ///
    /// With no gender in the parameters the opposite of the requester's
    /// own gender is used.
    pub async fn resolve_user_discovery(
        &self,
        requester_id: i32,
        params: &UserParameters,
    ) -> Result<PagedList<User>, DatingError> {
        params.validate()?;

        let gender = match params.gender {
            Some(gender) => gender,
            None => self.default_gender_for(requester_id).await?,
        };

        let today = Utc::now().date_naive();
        let mut query = UserQuery::from_parameters(requester_id, gender, params, today);

        if params.likers {
            query = query.with_likers(self.likers_of(requester_id).await?);
        }

        if params.likees {
            query = query.with_likees(self.likees_of(requester_id).await?);
        }

        let page = PageRequest::resolve(params.page_number, params.page_size, &self.paging);
        let users = self.repository.users_page(&query, page).await?;

        tracing::info!(
            "Discovery for user {}: page {}/{} ({} of {} users)",
            requester_id,
            users.current_page,
            users.total_pages,
            users.len(),
            users.total_count
        );

        Ok(users)
    }

    async fn default_gender_for(&self, requester_id: i32) -> Result<Gender, DatingError> {
        let requester = self
            .repository
            .get_user(requester_id)
            .await?
            .ok_or_else(|| DatingError::NotFound(format!("user {}", requester_id)))?;

        Ok(requester.gender().map_or(Gender::Male, |g| g.opposite()))
    }

    pub async fn find_like(&self, liker_id: i32, likee_id: i32) -> Result<Option<Like>, DatingError> {
        Ok(self.repository.find_like(liker_id, likee_id).await?)
    }

    /// Ids of users who like `user_id`
    pub async fn likers_of(&self, user_id: i32) -> Result<HashSet<i32>, DatingError> {
        Ok(self.repository.like_ids(user_id, LikeDirection::Likers).await?)
    }

    /// Ids of users `user_id` likes
    pub async fn likees_of(&self, user_id: i32) -> Result<HashSet<i32>, DatingError> {
        Ok(self.repository.like_ids(user_id, LikeDirection::Likees).await?)
    }

    /// Record that `liker_id` likes `likee_id`
    pub async fn like_user(&self, liker_id: i32, likee_id: i32) -> Result<Like, DatingError> {
        if self.repository.find_like(liker_id, likee_id).await?.is_some() {
            return Err(DatingError::Conflict(format!(
                "user {} already likes user {}",
                liker_id, likee_id
            )));
        }

        if self.repository.get_user(likee_id).await?.is_none() {
            return Err(DatingError::NotFound(format!("user {}", likee_id)));
        }

        let like = Like { liker_id, likee_id };
        let mut changes = ChangeSet::new();
        changes.add_like(like);

        if !self.persist(changes).await? {
            return Err(DatingError::PersistenceFailure("failed to like the user".to_string()));
        }

        tracing::info!("Recorded like: {} -> {}", liker_id, likee_id);

        Ok(like)
    }

    pub async fn find_message(&self, id: i32) -> Result<Option<Message>, DatingError> {
        Ok(self.repository.find_message(id).await?)
    }

    /// Page of the user's inbox, outbox or unread messages, newest first
    pub async fn resolve_message_container(
        &self,
        user_id: i32,
        params: &MessageParameters,
    ) -> Result<PagedList<Message>, DatingError> {
        params.validate()?;

        let scope = MessageScope::container(user_id, params.message_container);
        let page = PageRequest::resolve(params.page_number, params.page_size, &self.paging);
        let messages = self.repository.messages_page(&scope, page).await?;

        tracing::debug!(
            "{:?} for user {}: {} of {} messages",
            params.message_container,
            user_id,
            messages.len(),
            messages.total_count
        );

        Ok(messages)
    }

    /// Conversation between the two users as `user_id` sees it
    pub async fn resolve_thread(
        &self,
        user_id: i32,
        counterpart_id: i32,
    ) -> Result<Vec<Message>, DatingError> {
        let scope = MessageScope::thread(user_id, counterpart_id);
        let thread = self.repository.messages(&scope).await?;

        tracing::debug!(
            "Thread {} <-> {}: {} messages",
            user_id,
            counterpart_id,
            thread.len()
        );

        Ok(thread)
    }

    pub async fn send_message(
        &self,
        sender_id: i32,
        new_message: &NewMessage,
    ) -> Result<Message, DatingError> {
        new_message.validate()?;

        if self.repository.get_user(sender_id).await?.is_none() {
            return Err(DatingError::NotFound(format!("user {}", sender_id)));
        }

        if self.repository.get_user(new_message.recipient_id).await?.is_none() {
            return Err(DatingError::NotFound(format!(
                "could not find user {}",
                new_message.recipient_id
            )));
        }

        let mut changes = ChangeSet::new();
        changes.add_message(PendingMessage {
            sender_id,
            recipient_id: new_message.recipient_id,
            content: new_message.content.clone(),
            message_sent: Utc::now(),
        });

        let report = self.repository.persist(changes).await?;
        let created = match report.created_message_ids.first() {
            Some(&id) if report.wrote_anything() => self.repository.find_message(id).await?,
            _ => None,
        };

        match created {
            Some(message) => {
                tracing::info!(
                    "Message {} sent: {} -> {}",
                    message.id,
                    sender_id,
                    message.recipient_id
                );
                Ok(message)
            }
            None => Err(DatingError::PersistenceFailure("creating message failed".to_string())),
        }
    }

    /// Delete the message from `user_id`'s point of view
    ///
    /// The row is removed once both parties have deleted it.
    pub async fn delete_message(
        &self,
        message_id: i32,
        user_id: i32,
    ) -> Result<MessageDeletion, DatingError> {
        let mut message = self.require_message(message_id).await?;

        if !message.involves(user_id) {
            return Err(DatingError::Unauthorized(format!(
                "user {} is not a party to message {}",
                user_id, message_id
            )));
        }

        let outcome = message.soft_delete_for(user_id);
        let mut changes = ChangeSet::new();
        match outcome {
            MessageDeletion::Purged => changes.remove_message(message_id),
            MessageDeletion::Hidden => changes.update_message(&message),
        };

        if !self.persist(changes).await? {
            return Err(DatingError::PersistenceFailure("error deleting the message".to_string()));
        }

        tracing::info!("Message {} deleted by user {} ({:?})", message_id, user_id, outcome);

        Ok(outcome)
    }

    /// Mark a message read; only its recipient may do so
    pub async fn mark_message_read(
        &self,
        message_id: i32,
        user_id: i32,
    ) -> Result<Message, DatingError> {
        let mut message = self.require_message(message_id).await?;

        if message.recipient_id != user_id {
            return Err(DatingError::Unauthorized(format!(
                "user {} is not the recipient of message {}",
                user_id, message_id
            )));
        }

        message.mark_read(Utc::now());
        let mut changes = ChangeSet::new();
        changes.update_message(&message);

        if !self.persist(changes).await? {
            return Err(DatingError::PersistenceFailure(format!(
                "marking message {} as read failed",
                message_id
            )));
        }

        Ok(message)
    }

    /// Stamp the user's last activity with the current time
    pub async fn touch_last_active(&self, user_id: i32) -> Result<bool, DatingError> {
        let mut changes = ChangeSet::new();
        changes.touch_last_active(user_id, Utc::now());

        let touched = self.persist(changes).await?;
        if !touched {
            tracing::warn!("Last active not updated for user {}", user_id);
        }

        Ok(touched)
    }

    pub async fn update_profile(
        &self,
        user_id: i32,
        update: ProfileUpdate,
    ) -> Result<(), DatingError> {
        if self.repository.get_user(user_id).await?.is_none() {
            return Err(DatingError::NotFound(format!("user {}", user_id)));
        }

        let mut changes = ChangeSet::new();
        changes.update_profile(user_id, update);

        if !self.persist(changes).await? {
            return Err(DatingError::PersistenceFailure(format!(
                "updating user {} failed on save",
                user_id
            )));
        }

        Ok(())
    }

    /// Commit the changes; false when nothing was written
    pub async fn persist(&self, changes: ChangeSet) -> Result<bool, DatingError> {
        let report = self.repository.persist(changes).await?;
        Ok(report.wrote_anything())
    }

    async fn require_message(&self, message_id: i32) -> Result<Message, DatingError> {
        self.repository
            .find_message(message_id)
            .await?
            .ok_or_else(|| DatingError::NotFound(format!("message {}", message_id)))
    }
}
