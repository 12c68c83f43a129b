use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use std::time::Duration;

use crate::config::DatabaseSettings;
use crate::core::discovery::UserQuery;
use crate::core::likes::LikeDirection;
use crate::core::messages::MessageScope;
use crate::core::paging::{PageRequest, PageSource, PagedList};
use crate::models::{Like, Message, Photo, User};
use crate::services::repository::{Change, ChangeSet, CommitReport, DatingRepository, RepositoryError};

const USER_COLUMNS: &str = "id, username, known_as, gender, date_of_birth, created, last_active, \
                            introduction, looking_for, interests, city, country";

const PHOTO_COLUMNS: &str = "id, user_id, url, description, date_added, is_main";

const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, content, is_read, date_read, \
                               message_sent, sender_deleted, recipient_deleted";

/// PostgreSQL-backed store for users, photos, likes and messages
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, RepositoryError> {
        tracing::info!(
            "Connecting to PostgreSQL (max {} connections)",
            settings.max_connections.unwrap_or(10)
        );

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(10),
            settings.min_connections.unwrap_or(1),
            Duration::from_secs(settings.acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(settings.idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, RepositoryError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    async fn attach_photos(&self, users: &mut [User]) -> Result<(), RepositoryError> {
        if users.is_empty() {
            return Ok(());
        }

        let ids: Vec<i32> = users.iter().map(|u| u.id).collect();
        let query = format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE user_id = ANY($1) ORDER BY id");
        let photos: Vec<Photo> = sqlx::query_as(&query)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await?;

        for user in users.iter_mut() {
            user.photos = photos.iter().filter(|p| p.user_id == user.id).cloned().collect();
        }

        Ok(())
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_u64(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

struct UserPageSource<'a> {
    client: &'a PostgresClient,
    query: &'a UserQuery,
}

#[async_trait]
impl PageSource for UserPageSource<'_> {
    type Item = User;
    type Error = RepositoryError;

    async fn count(&self) -> Result<u64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        self.query.push_filters(&mut qb);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.client.pool).await?;
        Ok(to_u64(count))
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<User>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        self.query.push_filters(&mut qb);
        self.query.push_order(&mut qb);
        qb.push(" LIMIT ")
            .push_bind(to_i64(limit))
            .push(" OFFSET ")
            .push_bind(to_i64(offset));

        let mut users: Vec<User> = qb.build_query_as().fetch_all(&self.client.pool).await?;
        self.client.attach_photos(&mut users).await?;

        Ok(users)
    }
}

struct MessagePageSource<'a> {
    pool: &'a PgPool,
    scope: &'a MessageScope,
}

#[async_trait]
impl PageSource for MessagePageSource<'_> {
    type Item = Message;
    type Error = RepositoryError;

    async fn count(&self) -> Result<u64, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM messages");
        self.scope.push_filters(&mut qb);

        let count: i64 = qb.build_query_scalar().fetch_one(self.pool).await?;
        Ok(to_u64(count))
    }

    async fn fetch(&self, offset: u64, limit: u64) -> Result<Vec<Message>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {MESSAGE_COLUMNS} FROM messages"));
        self.scope.push_filters(&mut qb);
        self.scope.push_order(&mut qb);
        qb.push(" LIMIT ")
            .push_bind(to_i64(limit))
            .push(" OFFSET ")
            .push_bind(to_i64(offset));

        let messages: Vec<Message> = qb.build_query_as().fetch_all(self.pool).await?;
        Ok(messages)
    }
}

fn map_like_error(err: sqlx::Error, like: &Like) -> RepositoryError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => RepositoryError::Conflict(
            format!("like {} -> {} already exists", like.liker_id, like.likee_id),
        ),
        other => other.into(),
    }
}

async fn apply_change(
    conn: &mut PgConnection,
    change: Change,
    report: &mut CommitReport,
) -> Result<(), RepositoryError> {
    let rows = match change {
        Change::AddLike(like) => sqlx::query(
            "INSERT INTO likes (liker_id, likee_id) VALUES ($1, $2)",
        )
        .bind(like.liker_id)
        .bind(like.likee_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_like_error(e, &like))?
        .rows_affected(),

        Change::AddMessage(message) => {
            let id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO messages (sender_id, recipient_id, content, message_sent)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(message.sender_id)
            .bind(message.recipient_id)
            .bind(&message.content)
            .bind(message.message_sent)
            .fetch_one(&mut *conn)
            .await?;

            report.created_message_ids.push(id);
            1
        }

        Change::UpdateMessage(message) => sqlx::query(
            r#"
            UPDATE messages
            SET is_read = $2, date_read = $3, sender_deleted = $4, recipient_deleted = $5
            WHERE id = $1
            "#,
        )
        .bind(message.id)
        .bind(message.is_read)
        .bind(message.date_read)
        .bind(message.sender_deleted)
        .bind(message.recipient_deleted)
        .execute(&mut *conn)
        .await?
        .rows_affected(),

        Change::RemoveMessage(id) => sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected(),

        Change::TouchLastActive { user_id, at } => {
            sqlx::query("UPDATE users SET last_active = $2 WHERE id = $1")
                .bind(user_id)
                .bind(at)
                .execute(&mut *conn)
                .await?
                .rows_affected()
        }

        Change::UpdateProfile { user_id, update } => sqlx::query(
            r#"
            UPDATE users
            SET introduction = $2, looking_for = $3, interests = $4, city = $5, country = $6
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&update.introduction)
        .bind(&update.looking_for)
        .bind(&update.interests)
        .bind(&update.city)
        .bind(&update.country)
        .execute(&mut *conn)
        .await?
        .rows_affected(),
    };

    report.rows_affected += rows;
    Ok(())
}

#[async_trait]
impl DatingRepository for PostgresClient {
    async fn get_user(&self, id: i32) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user: Option<User> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match user {
            Some(user) => {
                let mut users = [user];
                self.attach_photos(&mut users).await?;
                let [user] = users;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    async fn get_photo(&self, id: i32) -> Result<Option<Photo>, RepositoryError> {
        let query = format!("SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1");
        let photo: Option<Photo> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    async fn get_main_photo_for_user(&self, user_id: i32) -> Result<Option<Photo>, RepositoryError> {
        let query = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE user_id = $1 AND is_main ORDER BY id LIMIT 1"
        );
        let photo: Option<Photo> = sqlx::query_as(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(photo)
    }

    async fn find_like(&self, liker_id: i32, likee_id: i32) -> Result<Option<Like>, RepositoryError> {
        let like: Option<Like> = sqlx::query_as(
            r#"
            SELECT liker_id, likee_id
            FROM likes
            WHERE liker_id = $1 AND likee_id = $2
            "#,
        )
        .bind(liker_id)
        .bind(likee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(like)
    }

    async fn like_ids(
        &self,
        user_id: i32,
        direction: LikeDirection,
    ) -> Result<HashSet<i32>, RepositoryError> {
        let query = format!(
            "SELECT {} FROM likes WHERE {} = $1",
            direction.select_column(),
            direction.filter_column()
        );

        let ids: Vec<i32> = sqlx::query_scalar(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("User {} has {} {:?}", user_id, ids.len(), direction);

        Ok(ids.into_iter().collect())
    }

    async fn users_page(
        &self,
        query: &UserQuery,
        page: PageRequest,
    ) -> Result<PagedList<User>, RepositoryError> {
        let source = UserPageSource {
            client: self,
            query,
        };
        PagedList::create(&source, page).await
    }

    async fn find_message(&self, id: i32) -> Result<Option<Message>, RepositoryError> {
        let query = format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = $1");
        let message: Option<Message> = sqlx::query_as(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(message)
    }

    async fn messages_page(
        &self,
        scope: &MessageScope,
        page: PageRequest,
    ) -> Result<PagedList<Message>, RepositoryError> {
        let source = MessagePageSource {
            pool: &self.pool,
            scope,
        };
        PagedList::create(&source, page).await
    }

    async fn messages(&self, scope: &MessageScope) -> Result<Vec<Message>, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {MESSAGE_COLUMNS} FROM messages"));
        scope.push_filters(&mut qb);
        scope.push_order(&mut qb);

        let messages: Vec<Message> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(messages)
    }

    async fn persist(&self, changes: ChangeSet) -> Result<CommitReport, RepositoryError> {
        let mut report = CommitReport::default();
        if changes.is_empty() {
            return Ok(report);
        }

        let mut tx = self.pool.begin().await?;
        for change in changes {
            apply_change(&mut *tx, change, &mut report).await?;
        }
        tx.commit().await?;

        tracing::debug!("Committed changes, {} rows affected", report.rows_affected);

        Ok(report)
    }
}
