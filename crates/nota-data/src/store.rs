//! Postgres-backed store for accounts, sessions, notes, and comments.

use chrono::{DateTime, Utc};
use nota_api_models::{
    Comment, CreateCommentRequest, CreateNoteRequest, Note, UpdateCommentRequest,
    UpdateNoteRequest, User,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::credentials;
use crate::error::{DataError, Result};

const POOL_MAX_CONNECTIONS: u32 = 8;

const INSERT_USER: &str = r"
    INSERT INTO users (id, username, email, password_hash, created_at)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (email) DO NOTHING
    RETURNING id, username, email, password_hash, avatar_url, bio, created_at
";

const SELECT_USER_BY_EMAIL: &str = r"
    SELECT id, username, email, password_hash, avatar_url, bio, created_at
    FROM users
    WHERE email = $1
";

const SELECT_USER_BY_ID: &str = r"
    SELECT id, username, email, password_hash, avatar_url, bio, created_at
    FROM users
    WHERE id = $1
";

const INSERT_SESSION: &str = r"
    INSERT INTO sessions (id, user_id, secret_hash, created_at, expires_at)
    VALUES ($1, $2, $3, $4, $5)
";

const SELECT_LIVE_SESSION: &str = r"
    SELECT user_id, secret_hash
    FROM sessions
    WHERE id = $1 AND expires_at > now()
";

const INSERT_NOTE: &str = r"
    INSERT INTO notes (id, title, content, summary, author_id, status, tags,
                       views_count, likes_count, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, 0, 0, $8, $8)
    RETURNING id, title, content, summary, author_id, status, tags,
              views_count, likes_count, created_at, updated_at
";

const OPEN_NOTE: &str = r"
    UPDATE notes
    SET views_count = views_count + 1
    WHERE id = $1
    RETURNING id, title, content, summary, author_id, status, tags,
              views_count, likes_count, created_at, updated_at
";

const COUNT_NOTES: &str = r"SELECT COUNT(*) FROM notes";

const LIST_NOTES: &str = r"
    SELECT id, title, content, summary, author_id, status, tags,
           views_count, likes_count, created_at, updated_at
    FROM notes
    ORDER BY created_at DESC
    LIMIT $1 OFFSET $2
";

const SELECT_NOTE_AUTHOR: &str = r"SELECT author_id FROM notes WHERE id = $1";

const UPDATE_NOTE: &str = r"
    UPDATE notes
    SET title = COALESCE($2, title),
        content = COALESCE($3, content),
        summary = COALESCE($4, summary),
        status = COALESCE($5, status),
        tags = COALESCE($6, tags),
        updated_at = $7
    WHERE id = $1
    RETURNING id, title, content, summary, author_id, status, tags,
              views_count, likes_count, created_at, updated_at
";

const DELETE_NOTE: &str = r"
    DELETE FROM notes
    WHERE id = $1
    RETURNING id, title, content, summary, author_id, status, tags,
              views_count, likes_count, created_at, updated_at
";

const LIKE_NOTE: &str = r"
    UPDATE notes
    SET likes_count = likes_count + 1,
        updated_at = $2
    WHERE id = $1
    RETURNING id, title, content, summary, author_id, status, tags,
              views_count, likes_count, created_at, updated_at
";

const UNLIKE_NOTE: &str = r"
    UPDATE notes
    SET likes_count = GREATEST(likes_count - 1, 0),
        updated_at = $2
    WHERE id = $1
    RETURNING id, title, content, summary, author_id, status, tags,
              views_count, likes_count, created_at, updated_at
";

const NOTE_EXISTS: &str = r"SELECT EXISTS (SELECT 1 FROM notes WHERE id = $1)";

const COMMENT_EXISTS: &str = r"SELECT EXISTS (SELECT 1 FROM comments WHERE id = $1)";

const INSERT_COMMENT: &str = r"
    INSERT INTO comments (id, content, note_id, author_id, parent_id, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $6)
    RETURNING id, content, note_id, author_id, parent_id, created_at, updated_at
";

const SELECT_COMMENT_BY_ID: &str = r"
    SELECT id, content, note_id, author_id, parent_id, created_at, updated_at
    FROM comments
    WHERE id = $1
";

const SELECT_COMMENT_AUTHOR: &str = r"SELECT author_id FROM comments WHERE id = $1";

const UPDATE_COMMENT: &str = r"
    UPDATE comments
    SET content = COALESCE($2, content),
        updated_at = $3
    WHERE id = $1
    RETURNING id, content, note_id, author_id, parent_id, created_at, updated_at
";

const DELETE_COMMENT: &str = r"
    DELETE FROM comments
    WHERE id = $1
    RETURNING id, content, note_id, author_id, parent_id, created_at, updated_at
";

const COUNT_NOTE_COMMENTS: &str = r"SELECT COUNT(*) FROM comments WHERE note_id = $1";

const LIST_NOTE_COMMENTS: &str = r"
    SELECT id, content, note_id, author_id, parent_id, created_at, updated_at
    FROM comments
    WHERE note_id = $1
    ORDER BY created_at ASC
    LIMIT $2 OFFSET $3
";

const PING: &str = r"SELECT 1";

fn map_query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DataError {
    move |source| DataError::QueryFailed { operation, source }
}

/// Outcome of registering a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The account was created.
    Created(User),
    /// Another account already uses the email address.
    EmailTaken,
}

/// Outcome of an owner-gated note mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteWriteOutcome {
    /// The mutation was applied to this note.
    Done(Note),
    /// No note exists with the requested id.
    NotFound,
    /// The caller does not own the note.
    Forbidden,
}

/// Outcome of an owner-gated comment mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentWriteOutcome {
    /// The mutation was applied to this comment.
    Done(Comment),
    /// No comment exists with the requested id.
    NotFound,
    /// The caller does not own the comment.
    Forbidden,
}

/// Outcome of posting a new comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentCreateOutcome {
    /// The comment was created.
    Created(Comment),
    /// The referenced note does not exist.
    MissingNote,
    /// The referenced parent comment does not exist.
    MissingParent,
}

/// A freshly opened bearer session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    /// Opaque bearer token presented by the client on later requests.
    pub token: String,
    /// Session expiry instant.
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    avatar_url: Option<String>,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id.to_string(),
            username: row.username,
            email: row.email,
            avatar_url: row.avatar_url,
            bio: row.bio,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct SessionRow {
    user_id: Uuid,
    secret_hash: String,
}

#[derive(Debug, Clone, FromRow)]
struct NoteRow {
    id: Uuid,
    title: String,
    content: String,
    summary: Option<String>,
    author_id: Uuid,
    status: String,
    tags: Option<Json<Value>>,
    views_count: i32,
    likes_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id.to_string(),
            title: row.title,
            content: row.content,
            summary: row.summary,
            author_id: row.author_id.to_string(),
            status: row.status,
            tags: row.tags.map(|Json(value)| value),
            views_count: row.views_count,
            likes_count: row.likes_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct CommentRow {
    id: Uuid,
    content: String,
    note_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id.to_string(),
            content: row.content,
            note_id: row.note_id.to_string(),
            author_id: row.author_id.to_string(),
            parent_id: row.parent_id.map(|id| id.to_string()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database-backed repository for the Nota domain.
#[derive(Clone)]
pub struct NotaStore {
    pool: PgPool,
}

impl NotaStore {
    /// Connect to the database and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the database is unreachable or migrations fail.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(POOL_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(map_query_err("connect to database"))?;
        Self::new(pool).await
    }

    /// Initialise the store over an existing pool, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migration execution fails.
    pub async fn new(pool: PgPool) -> Result<Self> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&pool)
            .await
            .map_err(|source| DataError::MigrationFailed { source })?;
        tracing::debug!("database migrations applied");
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Cheap connectivity probe for the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the database does not answer.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query(PING)
            .execute(&self.pool)
            .await
            .map_err(map_query_err("ping database"))?;
        Ok(())
    }

    /// Create an account unless the email address is already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if password hashing or the insert fails.
    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<RegisterOutcome> {
        let password_hash = credentials::hash_secret(password)?;
        let row = sqlx::query_as::<_, UserRow>(INSERT_USER)
            .bind(Uuid::new_v4())
            .bind(username)
            .bind(email)
            .bind(&password_hash)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("register user"))?;
        Ok(row.map_or(RegisterOutcome::EmailTaken, |row| {
            RegisterOutcome::Created(row.into())
        }))
    }

    /// Look up an account by email and check the password against its hash.
    ///
    /// Unknown emails and wrong passwords are both reported as `None` so the
    /// caller cannot distinguish them.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails or the stored hash is malformed.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let maybe = sqlx::query_as::<_, UserRow>(SELECT_USER_BY_EMAIL)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("fetch user by email"))?;
        if let Some(row) = maybe {
            if credentials::verify_secret(&row.password_hash, password)? {
                return Ok(Some(row.into()));
            }
        }
        Ok(None)
    }

    /// Fetch an account by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(SELECT_USER_BY_ID)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("fetch user by id"))?;
        Ok(row.map(User::from))
    }

    /// Mint a bearer session for the account.
    ///
    /// Only an argon2 hash of the session secret is persisted; the returned
    /// token is the sole copy of the secret.
    ///
    /// # Errors
    ///
    /// Returns an error if secret hashing or the insert fails.
    pub async fn open_session(&self, user_id: Uuid, ttl_secs: u64) -> Result<IssuedSession> {
        let session_id = Uuid::new_v4();
        let secret = credentials::generate_token(credentials::SESSION_SECRET_LEN);
        let secret_hash = credentials::hash_secret(&secret)?;
        let created_at = Utc::now();
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let ttl = chrono::Duration::try_seconds(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = created_at
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        sqlx::query(INSERT_SESSION)
            .bind(session_id)
            .bind(user_id)
            .bind(&secret_hash)
            .bind(created_at)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(map_query_err("open session"))?;

        Ok(IssuedSession {
            token: format!("{}.{secret}", session_id.simple()),
            expires_at,
        })
    }

    /// Resolve the account behind a bearer token.
    ///
    /// Returns `None` for malformed tokens, unknown or expired sessions, and
    /// secrets that fail verification.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup fails or the stored hash is malformed.
    pub async fn session_user(&self, token: &str) -> Result<Option<User>> {
        let Some((session_id, secret)) = parse_token(token) else {
            return Ok(None);
        };
        let maybe = sqlx::query_as::<_, SessionRow>(SELECT_LIVE_SESSION)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("fetch session"))?;
        if let Some(row) = maybe {
            if credentials::verify_secret(&row.secret_hash, secret)? {
                return self.user_by_id(row.user_id).await;
            }
        }
        Ok(None)
    }

    /// Create a note owned by the given author.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_note(
        &self,
        author_id: Uuid,
        request: &CreateNoteRequest,
    ) -> Result<Note> {
        let row = sqlx::query_as::<_, NoteRow>(INSERT_NOTE)
            .bind(Uuid::new_v4())
            .bind(&request.title)
            .bind(&request.content)
            .bind(request.summary.as_deref())
            .bind(author_id)
            .bind(request.status.as_deref().unwrap_or("published"))
            .bind(request.tags.as_ref().map(Json))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err("create note"))?;
        Ok(row.into())
    }

    /// Fetch a note for reading, recording the view.
    ///
    /// The view counter is bumped in the same statement that loads the note;
    /// `updated_at` is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn open_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query_as::<_, NoteRow>(OPEN_NOTE)
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("open note"))?;
        Ok(row.map(Note::from))
    }

    /// List notes newest-first together with the total count.
    ///
    /// # Errors
    ///
    /// Returns an error if either query fails.
    pub async fn list_notes(&self, limit: u64, offset: u64) -> Result<(Vec<Note>, u64)> {
        let total: i64 = sqlx::query_scalar(COUNT_NOTES)
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err("count notes"))?;
        let rows = sqlx::query_as::<_, NoteRow>(LIST_NOTES)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("list notes"))?;
        Ok((
            rows.into_iter().map(Note::from).collect(),
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    /// Apply a partial update to a note owned by the caller.
    ///
    /// Absent fields keep their stored values; `updated_at` is refreshed.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or the update fails.
    pub async fn update_note(
        &self,
        note_id: Uuid,
        author_id: Uuid,
        request: &UpdateNoteRequest,
    ) -> Result<NoteWriteOutcome> {
        match self.note_author(note_id).await? {
            None => Ok(NoteWriteOutcome::NotFound),
            Some(owner) if owner != author_id => Ok(NoteWriteOutcome::Forbidden),
            Some(_) => {
                let row = sqlx::query_as::<_, NoteRow>(UPDATE_NOTE)
                    .bind(note_id)
                    .bind(request.title.as_deref())
                    .bind(request.content.as_deref())
                    .bind(request.summary.as_deref())
                    .bind(request.status.as_deref())
                    .bind(request.tags.as_ref().map(Json))
                    .bind(Utc::now())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_query_err("update note"))?;
                Ok(row.map_or(NoteWriteOutcome::NotFound, |row| {
                    NoteWriteOutcome::Done(row.into())
                }))
            }
        }
    }

    /// Delete a note owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or the delete fails.
    pub async fn delete_note(&self, note_id: Uuid, author_id: Uuid) -> Result<NoteWriteOutcome> {
        match self.note_author(note_id).await? {
            None => Ok(NoteWriteOutcome::NotFound),
            Some(owner) if owner != author_id => Ok(NoteWriteOutcome::Forbidden),
            Some(_) => {
                let row = sqlx::query_as::<_, NoteRow>(DELETE_NOTE)
                    .bind(note_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_query_err("delete note"))?;
                Ok(row.map_or(NoteWriteOutcome::NotFound, |row| {
                    NoteWriteOutcome::Done(row.into())
                }))
            }
        }
    }

    /// Increment a note's like counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn like_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query_as::<_, NoteRow>(LIKE_NOTE)
            .bind(note_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("like note"))?;
        Ok(row.map(Note::from))
    }

    /// Decrement a note's like counter, never below zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn unlike_note(&self, note_id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query_as::<_, NoteRow>(UNLIKE_NOTE)
            .bind(note_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("unlike note"))?;
        Ok(row.map(Note::from))
    }

    /// Post a comment on a note, optionally replying to a parent comment.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or the insert fails.
    pub async fn create_comment(
        &self,
        author_id: Uuid,
        request: &CreateCommentRequest,
    ) -> Result<CommentCreateOutcome> {
        let Some(note_id) = parse_id(&request.note_id) else {
            return Ok(CommentCreateOutcome::MissingNote);
        };
        let parent_id = match request.parent_id.as_deref() {
            None => None,
            Some(raw) => match parse_id(raw) {
                Some(id) => Some(id),
                None => return Ok(CommentCreateOutcome::MissingParent),
            },
        };

        if !self.row_exists(NOTE_EXISTS, note_id, "check note exists").await? {
            return Ok(CommentCreateOutcome::MissingNote);
        }
        if let Some(parent) = parent_id {
            if !self
                .row_exists(COMMENT_EXISTS, parent, "check parent comment exists")
                .await?
            {
                return Ok(CommentCreateOutcome::MissingParent);
            }
        }

        let row = sqlx::query_as::<_, CommentRow>(INSERT_COMMENT)
            .bind(Uuid::new_v4())
            .bind(&request.content)
            .bind(note_id)
            .bind(author_id)
            .bind(parent_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err("create comment"))?;
        Ok(CommentCreateOutcome::Created(row.into()))
    }

    /// Fetch a comment by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails.
    pub async fn comment_by_id(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query_as::<_, CommentRow>(SELECT_COMMENT_BY_ID)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("fetch comment"))?;
        Ok(row.map(Comment::from))
    }

    /// Apply a partial update to a comment owned by the caller.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or the update fails.
    pub async fn update_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
        request: &UpdateCommentRequest,
    ) -> Result<CommentWriteOutcome> {
        match self.comment_author(comment_id).await? {
            None => Ok(CommentWriteOutcome::NotFound),
            Some(owner) if owner != author_id => Ok(CommentWriteOutcome::Forbidden),
            Some(_) => {
                let row = sqlx::query_as::<_, CommentRow>(UPDATE_COMMENT)
                    .bind(comment_id)
                    .bind(request.content.as_deref())
                    .bind(Utc::now())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_query_err("update comment"))?;
                Ok(row.map_or(CommentWriteOutcome::NotFound, |row| {
                    CommentWriteOutcome::Done(row.into())
                }))
            }
        }
    }

    /// Delete a comment owned by the caller.
    ///
    /// Replies cascade with their parent.
    ///
    /// # Errors
    ///
    /// Returns an error if a lookup or the delete fails.
    pub async fn delete_comment(
        &self,
        comment_id: Uuid,
        author_id: Uuid,
    ) -> Result<CommentWriteOutcome> {
        match self.comment_author(comment_id).await? {
            None => Ok(CommentWriteOutcome::NotFound),
            Some(owner) if owner != author_id => Ok(CommentWriteOutcome::Forbidden),
            Some(_) => {
                let row = sqlx::query_as::<_, CommentRow>(DELETE_COMMENT)
                    .bind(comment_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_query_err("delete comment"))?;
                Ok(row.map_or(CommentWriteOutcome::NotFound, |row| {
                    CommentWriteOutcome::Done(row.into())
                }))
            }
        }
    }

    /// List a note's comments oldest-first together with the total count.
    ///
    /// Unknown notes yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if either query fails.
    pub async fn comments_for_note(
        &self,
        note_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Comment>, u64)> {
        let total: i64 = sqlx::query_scalar(COUNT_NOTE_COMMENTS)
            .bind(note_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err("count note comments"))?;
        let rows = sqlx::query_as::<_, CommentRow>(LIST_NOTE_COMMENTS)
            .bind(note_id)
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .bind(i64::try_from(offset).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("list note comments"))?;
        Ok((
            rows.into_iter().map(Comment::from).collect(),
            u64::try_from(total).unwrap_or_default(),
        ))
    }

    async fn note_author(&self, note_id: Uuid) -> Result<Option<Uuid>> {
        sqlx::query_scalar(SELECT_NOTE_AUTHOR)
            .bind(note_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("fetch note author"))
    }

    async fn comment_author(&self, comment_id: Uuid) -> Result<Option<Uuid>> {
        sqlx::query_scalar(SELECT_COMMENT_AUTHOR)
            .bind(comment_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("fetch comment author"))
    }

    async fn row_exists(
        &self,
        sql: &'static str,
        id: Uuid,
        operation: &'static str,
    ) -> Result<bool> {
        sqlx::query_scalar(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_query_err(operation))
    }
}

fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::try_parse(raw.trim()).ok()
}

fn parse_token(token: &str) -> Option<(Uuid, &str)> {
    let (id_part, secret) = token.split_once('.')?;
    if secret.is_empty() {
        return None;
    }
    let session_id = Uuid::try_parse(id_part).ok()?;
    Some((session_id, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_tokens_split_into_session_id_and_secret() {
        let session_id = Uuid::new_v4();
        let token = format!("{}.abcDEF123", session_id.simple());
        let (parsed_id, secret) = parse_token(&token).expect("token parses");
        assert_eq!(parsed_id, session_id);
        assert_eq!(secret, "abcDEF123");
    }

    #[test]
    fn malformed_bearer_tokens_are_rejected() {
        assert!(parse_token("").is_none());
        assert!(parse_token("no-separator").is_none());
        assert!(parse_token("not-a-uuid.secret").is_none());
        let trailing_dot = format!("{}.", Uuid::new_v4().simple());
        assert!(parse_token(&trailing_dot).is_none());
    }

    #[test]
    fn entity_ids_parse_in_simple_and_hyphenated_form() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()), Some(id));
        assert_eq!(parse_id(&id.simple().to_string()), Some(id));
        assert_eq!(parse_id(" 1 "), None);
    }

    #[test]
    fn note_rows_convert_to_wire_notes() {
        let note_id = Uuid::new_v4();
        let author_id = Uuid::new_v4();
        let now = Utc::now();
        let row = NoteRow {
            id: note_id,
            title: "First".to_string(),
            content: "Body".to_string(),
            summary: None,
            author_id,
            status: "published".to_string(),
            tags: Some(Json(serde_json::json!(["rust"]))),
            views_count: 3,
            likes_count: 1,
            created_at: now,
            updated_at: now,
        };

        let note = Note::from(row);
        assert_eq!(note.id, note_id.to_string());
        assert_eq!(note.author_id, author_id.to_string());
        assert_eq!(note.tags, Some(serde_json::json!(["rust"])));
        assert_eq!(note.views_count, 3);
    }
}
