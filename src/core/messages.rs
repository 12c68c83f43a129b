use sqlx::{Postgres, QueryBuilder};
use std::cmp::Ordering;

use crate::models::{Message, MessageContainer};

/// The set of messages one user may see in a given view
///
/// Both the container views and the thread view are decided here so the
/// per-party deletion rules live in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageScope {
    Container {
        user_id: i32,
        container: MessageContainer,
    },
    /// Conversation between `viewer` and `counterpart`, seen by `viewer`
    Thread { viewer: i32, counterpart: i32 },
}

impl MessageScope {
    pub fn container(user_id: i32, container: MessageContainer) -> Self {
        MessageScope::Container { user_id, container }
    }

    pub fn thread(viewer: i32, counterpart: i32) -> Self {
        MessageScope::Thread {
            viewer,
            counterpart,
        }
    }

    pub fn admits(&self, m: &Message) -> bool {
        match *self {
            MessageScope::Container {
                user_id,
                container: MessageContainer::Inbox,
            } => m.recipient_id == user_id && !m.recipient_deleted,
            MessageScope::Container {
                user_id,
                container: MessageContainer::Outbox,
            } => m.sender_id == user_id && !m.sender_deleted,
            MessageScope::Container {
                user_id,
                container: MessageContainer::Unread,
            } => m.recipient_id == user_id && !m.recipient_deleted && !m.is_read,
            MessageScope::Thread {
                viewer,
                counterpart,
            } => {
                (m.recipient_id == viewer && m.sender_id == counterpart && !m.recipient_deleted)
                    || (m.recipient_id == counterpart
                        && m.sender_id == viewer
                        && !m.sender_deleted)
            }
        }
    }

    /// Append the WHERE clause matching `admits`
    pub fn push_filters(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match *self {
            MessageScope::Container {
                user_id,
                container: MessageContainer::Inbox,
            } => {
                qb.push(" WHERE recipient_id = ")
                    .push_bind(user_id)
                    .push(" AND recipient_deleted = FALSE");
            }
            MessageScope::Container {
                user_id,
                container: MessageContainer::Outbox,
            } => {
                qb.push(" WHERE sender_id = ")
                    .push_bind(user_id)
                    .push(" AND sender_deleted = FALSE");
            }
            MessageScope::Container {
                user_id,
                container: MessageContainer::Unread,
            } => {
                qb.push(" WHERE recipient_id = ")
                    .push_bind(user_id)
                    .push(" AND recipient_deleted = FALSE AND is_read = FALSE");
            }
            MessageScope::Thread {
                viewer,
                counterpart,
            } => {
                qb.push(" WHERE ((recipient_id = ")
                    .push_bind(viewer)
                    .push(" AND sender_id = ")
                    .push_bind(counterpart)
                    .push(" AND recipient_deleted = FALSE) OR (recipient_id = ")
                    .push_bind(counterpart)
                    .push(" AND sender_id = ")
                    .push_bind(viewer)
                    .push(" AND sender_deleted = FALSE))");
            }
        }
    }

    /// Newest first; `id` stands in for storage order on ties
    pub fn push_order(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" ORDER BY message_sent DESC, id ASC");
    }

    pub fn compare(a: &Message, b: &Message) -> Ordering {
        b.message_sent.cmp(&a.message_sent)
    }

    /// Filter and order an in-memory message set
    pub fn apply<'a, I>(&self, messages: I) -> Vec<Message>
    where
        I: IntoIterator<Item = &'a Message>,
    {
        let mut visible: Vec<Message> = messages
            .into_iter()
            .filter(|m| self.admits(m))
            .cloned()
            .collect();
        visible.sort_by(Self::compare);
        visible
    }
}
