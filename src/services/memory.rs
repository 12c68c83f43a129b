use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::convert::Infallible;
use tokio::sync::RwLock;

use crate::core::discovery::UserQuery;
use crate::core::likes::{collect_ids, LikeDirection};
use crate::core::messages::MessageScope;
use crate::core::paging::{PageRequest, PagedList, SliceSource};
use crate::models::{Like, Message, Photo, User};
use crate::services::repository::{Change, ChangeSet, CommitReport, DatingRepository, RepositoryError};

#[derive(Debug, Clone, Default)]
struct StoreState {
    users: BTreeMap<i32, User>,
    photos: BTreeMap<i32, Photo>,
    likes: Vec<Like>,
    messages: BTreeMap<i32, Message>,
    /// Highest message id ever handed out; purged ids are never reused
    last_message_id: i32,
}

impl StoreState {
    fn with_photos(&self, user: &User) -> User {
        let mut user = user.clone();
        user.photos = self
            .photos
            .values()
            .filter(|p| p.user_id == user.id)
            .cloned()
            .collect();
        user
    }

    fn next_message_id(&mut self) -> i32 {
        self.last_message_id += 1;
        self.last_message_id
    }

    fn apply(&mut self, change: Change, report: &mut CommitReport) -> Result<(), RepositoryError> {
        let rows = match change {
            Change::AddLike(like) => {
                if self.likes.contains(&like) {
                    return Err(RepositoryError::Conflict(format!(
                        "like {} -> {} already exists",
                        like.liker_id, like.likee_id
                    )));
                }
                self.likes.push(like);
                1
            }
            Change::AddMessage(pending) => {
                let id = self.next_message_id();
                self.messages.insert(
                    id,
                    Message {
                        id,
                        sender_id: pending.sender_id,
                        recipient_id: pending.recipient_id,
                        content: pending.content,
                        is_read: false,
                        date_read: None,
                        message_sent: pending.message_sent,
                        sender_deleted: false,
                        recipient_deleted: false,
                    },
                );
                report.created_message_ids.push(id);
                1
            }
            Change::UpdateMessage(message) => match self.messages.get_mut(&message.id) {
                Some(stored) => {
                    stored.is_read = message.is_read;
                    stored.date_read = message.date_read;
                    stored.sender_deleted = message.sender_deleted;
                    stored.recipient_deleted = message.recipient_deleted;
                    1
                }
                None => 0,
            },
            Change::RemoveMessage(id) => u64::from(self.messages.remove(&id).is_some()),
            Change::TouchLastActive { user_id, at } => match self.users.get_mut(&user_id) {
                Some(user) => {
                    user.last_active = at;
                    1
                }
                None => 0,
            },
            Change::UpdateProfile { user_id, update } => match self.users.get_mut(&user_id) {
                Some(user) => {
                    user.introduction = update.introduction;
                    user.looking_for = update.looking_for;
                    user.interests = update.interests;
                    user.city = update.city;
                    user.country = update.country;
                    1
                }
                None => 0,
            },
        };

        report.rows_affected += rows;
        Ok(())
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// In-process store for tests, benchmarks and local development
///
/// Rows are kept in id order, which is the storage order ties fall
/// back to. Commits run against a copy that replaces the live state
/// only when every change applied.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user; any photos on it are stored as photo rows
    pub async fn insert_user(&self, mut user: User) {
        let mut state = self.state.write().await;
        for photo in user.photos.drain(..) {
            state.photos.insert(photo.id, photo);
        }
        state.users.insert(user.id, user);
    }

    pub async fn insert_photo(&self, photo: Photo) {
        self.state.write().await.photos.insert(photo.id, photo);
    }

    /// Seed a like edge, ignoring exact duplicates
    pub async fn insert_like(&self, like: Like) {
        let mut state = self.state.write().await;
        if !state.likes.contains(&like) {
            state.likes.push(like);
        }
    }

    /// Seed a message with its id and flags as given
    pub async fn insert_message(&self, message: Message) {
        let mut state = self.state.write().await;
        state.last_message_id = state.last_message_id.max(message.id);
        state.messages.insert(message.id, message);
    }

    pub async fn message_count(&self) -> usize {
        self.state.read().await.messages.len()
    }
}

#[async_trait]
impl DatingRepository for InMemoryStore {
    async fn get_user(&self, id: i32) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).map(|u| state.with_photos(u)))
    }

    async fn get_photo(&self, id: i32) -> Result<Option<Photo>, RepositoryError> {
        Ok(self.state.read().await.photos.get(&id).cloned())
    }

    async fn get_main_photo_for_user(&self, user_id: i32) -> Result<Option<Photo>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .photos
            .values()
            .find(|p| p.user_id == user_id && p.is_main)
            .cloned())
    }

    async fn find_like(&self, liker_id: i32, likee_id: i32) -> Result<Option<Like>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state
            .likes
            .iter()
            .find(|l| l.liker_id == liker_id && l.likee_id == likee_id)
            .copied())
    }

    async fn like_ids(
        &self,
        user_id: i32,
        direction: LikeDirection,
    ) -> Result<HashSet<i32>, RepositoryError> {
        let state = self.state.read().await;
        Ok(collect_ids(&state.likes, user_id, direction))
    }

    async fn users_page(
        &self,
        query: &UserQuery,
        page: PageRequest,
    ) -> Result<PagedList<User>, RepositoryError> {
        let matched = {
            let state = self.state.read().await;
            query.apply(state.users.values().map(|u| state.with_photos(u)))
        };

        Ok(infallible(PagedList::create(&SliceSource::new(&matched), page).await))
    }

    async fn find_message(&self, id: i32) -> Result<Option<Message>, RepositoryError> {
        Ok(self.state.read().await.messages.get(&id).cloned())
    }

    async fn messages_page(
        &self,
        scope: &MessageScope,
        page: PageRequest,
    ) -> Result<PagedList<Message>, RepositoryError> {
        let matched = {
            let state = self.state.read().await;
            scope.apply(state.messages.values())
        };

        Ok(infallible(PagedList::create(&SliceSource::new(&matched), page).await))
    }

    async fn messages(&self, scope: &MessageScope) -> Result<Vec<Message>, RepositoryError> {
        let state = self.state.read().await;
        Ok(scope.apply(state.messages.values()))
    }

    async fn persist(&self, changes: ChangeSet) -> Result<CommitReport, RepositoryError> {
        let mut report = CommitReport::default();
        if changes.is_empty() {
            return Ok(report);
        }

        let mut state = self.state.write().await;
        let mut draft = state.clone();
        for change in changes {
            draft.apply(change, &mut report)?;
        }
        *state = draft;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::repository::PendingMessage;
    use chrono::Utc;

    #[tokio::test]
    async fn test_failed_commit_leaves_state_untouched() {
        let store = InMemoryStore::new();
        store
            .insert_like(Like {
                liker_id: 1,
                likee_id: 2,
            })
            .await;

        let mut changes = ChangeSet::new();
        changes
            .add_message(PendingMessage {
                sender_id: 1,
                recipient_id: 2,
                content: "hello".to_string(),
                message_sent: Utc::now(),
            })
            .add_like(Like {
                liker_id: 1,
                likee_id: 2,
            });

        let result = store.persist(changes).await;

        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_added_messages_get_sequential_ids() {
        let store = InMemoryStore::new();
        let mut changes = ChangeSet::new();
        for content in ["a", "b"] {
            changes.add_message(PendingMessage {
                sender_id: 1,
                recipient_id: 2,
                content: content.to_string(),
                message_sent: Utc::now(),
            });
        }

        let report = store.persist(changes).await.unwrap();

        assert_eq!(report.created_message_ids, vec![1, 2]);
        assert_eq!(report.rows_affected, 2);
    }

    fn pending(content: &str) -> PendingMessage {
        PendingMessage {
            sender_id: 1,
            recipient_id: 2,
            content: content.to_string(),
            message_sent: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_removed_message_id_is_not_reused() {
        let store = InMemoryStore::new();
        let mut changes = ChangeSet::new();
        changes.add_message(pending("first"));
        let first = store.persist(changes).await.unwrap().created_message_ids[0];

        let mut changes = ChangeSet::new();
        changes.remove_message(first);
        assert!(store.persist(changes).await.unwrap().wrote_anything());

        let mut changes = ChangeSet::new();
        changes.add_message(pending("second"));
        let second = store.persist(changes).await.unwrap().created_message_ids[0];

        assert_ne!(first, second);
        assert!(store.find_message(first).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seeded_messages_advance_the_id_counter() {
        let store = InMemoryStore::new();
        let seeded = Message {
            id: 7,
            sender_id: 1,
            recipient_id: 2,
            content: "seeded".to_string(),
            is_read: false,
            date_read: None,
            message_sent: Utc::now(),
            sender_deleted: false,
            recipient_deleted: false,
        };
        store.insert_message(seeded).await;

        let mut changes = ChangeSet::new();
        changes.add_message(pending("next"));
        let report = store.persist(changes).await.unwrap();

        assert_eq!(report.created_message_ids, vec![8]);
    }

    #[tokio::test]
    async fn test_changes_to_missing_rows_write_nothing() {
        let store = InMemoryStore::new();
        let mut changes = ChangeSet::new();
        changes.remove_message(4).touch_last_active(8, Utc::now());

        let report = store.persist(changes).await.unwrap();

        assert!(!report.wrote_anything());
    }
}
