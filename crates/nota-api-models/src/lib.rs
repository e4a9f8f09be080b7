#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
//! Shared HTTP DTOs for the Nota public API.
//!
//! These types are the wire contract between the browser client and the
//! backend: field names, optionality, and types here are normative, so both
//! sides build against this crate and the mapping stays a single source of
//! truth. Absent optional fields are omitted from the JSON rather than
//! serialised as `null`.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page number when a listing request omits `page`.
pub const DEFAULT_PAGE: u64 = 1;
/// Default page size when a listing request omits `per_page`.
pub const DEFAULT_PER_PAGE: u64 = 10;
/// Upper bound applied to client-supplied `per_page` values.
pub const MAX_PER_PAGE: u64 = 100;

/// Public identity record for a registered account.
///
/// The persisted row also carries the password hash and an update timestamp;
/// neither ever crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Stable identifier for the account.
    pub id: String,
    /// Display name chosen at registration.
    pub username: String,
    /// Address used for login.
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional avatar image URL.
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional free-form profile text.
    pub bio: Option<String>,
    /// Timestamp when the account was created.
    pub created_at: DateTime<Utc>,
}

/// A published or draft note.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Stable identifier for the note.
    pub id: String,
    /// Title shown in listings.
    pub title: String,
    /// Full body of the note.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional short abstract shown in listings.
    pub summary: Option<String>,
    /// Identifier of the authoring [`User`].
    pub author_id: String,
    /// Free-form lifecycle tag such as `draft` or `published`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Open-shaped tag payload; the backend stores it verbatim.
    pub tags: Option<Value>,
    /// How many times the note has been read.
    pub views_count: i32,
    /// How many likes the note has accumulated.
    pub likes_count: i32,
    /// Timestamp when the note was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the latest modification, never before `created_at`.
    pub updated_at: DateTime<Utc>,
}

/// A reply attached to a note, optionally threaded under another comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    /// Stable identifier for the comment.
    pub id: String,
    /// Body of the comment.
    pub content: String,
    /// Identifier of the [`Note`] the comment belongs to.
    pub note_id: String,
    /// Identifier of the authoring [`User`].
    pub author_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Identifier of the parent comment when this is a threaded reply.
    pub parent_id: Option<String>,
    /// Timestamp when the comment was created.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the latest modification.
    pub updated_at: DateTime<Utc>,
}

/// JSON body accepted by `POST /api/auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Desired display name.
    pub username: String,
    /// Login address; must be unique across accounts.
    pub email: String,
    /// Plaintext password, hashed server-side before storage.
    pub password: String,
}

impl RegisterRequest {
    /// Reject structurally invalid registrations before they hit storage.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&'static str> {
        if self.username.trim().is_empty() {
            return Some("username must not be empty");
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Some("email must be a valid address");
        }
        if self.password.len() < 8 {
            return Some("password must be at least 8 characters");
        }
        None
    }
}

/// JSON body accepted by `POST /api/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    /// Address the account was registered with.
    pub email: String,
    /// Plaintext password to verify.
    pub password: String,
}

impl LoginRequest {
    /// Reject empty credentials without consulting storage.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&'static str> {
        if self.email.trim().is_empty() {
            return Some("email must not be empty");
        }
        if self.password.is_empty() {
            return Some("password must not be empty");
        }
        None
    }
}

/// JSON body accepted by `POST /api/notes`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateNoteRequest {
    /// Title for the new note.
    pub title: String,
    /// Full body of the new note.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional short abstract.
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Lifecycle tag; the backend defaults omitted values to `published`.
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Open-shaped tag payload stored verbatim.
    pub tags: Option<Value>,
}

impl CreateNoteRequest {
    /// Reject notes with no usable title or body.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            return Some("title must not be empty");
        }
        if self.content.trim().is_empty() {
            return Some("content must not be empty");
        }
        None
    }
}

/// JSON body accepted by `PUT /api/notes/{id}`.
///
/// Every field is optional: only supplied fields change, and an empty object
/// is a valid no-op patch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UpdateNoteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement title.
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement body.
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement abstract.
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement lifecycle tag.
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement tag payload.
    pub tags: Option<Value>,
}

impl UpdateNoteRequest {
    /// Reject patches that would blank out a required field.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&'static str> {
        if matches!(self.title.as_deref(), Some(title) if title.trim().is_empty()) {
            return Some("title must not be empty");
        }
        if matches!(self.content.as_deref(), Some(content) if content.trim().is_empty()) {
            return Some("content must not be empty");
        }
        None
    }

    /// Returns true when no fields were supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.summary.is_none()
            && self.status.is_none()
            && self.tags.is_none()
    }
}

/// JSON body accepted by `POST /api/comments`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateCommentRequest {
    /// Body of the new comment.
    pub content: String,
    /// Identifier of the note being commented on.
    pub note_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Identifier of the comment being replied to, for threaded replies.
    pub parent_id: Option<String>,
}

impl CreateCommentRequest {
    /// Reject comments with no usable body or target.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&'static str> {
        if self.content.trim().is_empty() {
            return Some("content must not be empty");
        }
        if self.note_id.trim().is_empty() {
            return Some("note_id must not be empty");
        }
        None
    }
}

/// JSON body accepted by `PUT /api/comments/{id}`.
///
/// Patch-shaped like [`UpdateNoteRequest`]: an empty object is valid and
/// changes nothing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct UpdateCommentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Replacement body.
    pub content: Option<String>,
}

impl UpdateCommentRequest {
    /// Reject patches that would blank out the body.
    #[must_use]
    pub fn reject_reason(&self) -> Option<&'static str> {
        if matches!(self.content.as_deref(), Some(content) if content.trim().is_empty()) {
            return Some("content must not be empty");
        }
        None
    }

    /// Returns true when no fields were supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_none()
    }
}

/// Response returned by the register and login endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    /// The authenticated account.
    pub user: User,
    /// Opaque bearer token for subsequent requests.
    pub token: String,
    /// Human-readable outcome description.
    pub message: String,
}

/// Generic envelope carrying either success data or an application error.
///
/// An envelope is a failure exactly when `error` is populated; `data` and
/// `error` are never both present. `status` mirrors the HTTP status code the
/// producer answered with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Success payload, absent on failure.
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Human-readable outcome description.
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Human-readable failure description, absent on success.
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// HTTP status code associated with the outcome.
    pub status: Option<u16>,
}

impl<T> ApiResponse<T> {
    /// Wrap a success payload.
    #[must_use]
    pub const fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            error: None,
            status: None,
        }
    }

    /// Build a data-free success envelope carrying only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            error: None,
            status: None,
        }
    }

    /// Build a failure envelope from an error description and HTTP status.
    #[must_use]
    pub fn failure(error: impl Into<String>, status: u16) -> Self {
        Self {
            data: None,
            message: None,
            error: Some(error.into()),
            status: Some(status),
        }
    }

    /// Attach the HTTP status code the producer answered with.
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns true when the envelope carries no application error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true when the envelope carries an application error.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Envelope returned by listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaginatedResponse<T> {
    /// The requested page of items.
    pub data: Vec<T>,
    /// Total number of items across all pages.
    pub total: u64,
    /// Effective page number served, starting at 1.
    pub page: u64,
    /// Effective page size served.
    pub per_page: u64,
}

impl<T> PaginatedResponse<T> {
    /// Assemble a page envelope from items and the effective query values.
    #[must_use]
    pub const fn new(data: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        Self {
            data,
            total,
            page,
            per_page,
        }
    }
}

/// Optional paging parameters accepted by listing endpoints.
///
/// Out-of-range values are clamped rather than rejected; the effective
/// values are echoed back in [`PaginatedResponse`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PaginationQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Requested page number, 1-based.
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Requested page size.
    pub per_page: Option<u64>,
}

impl PaginationQuery {
    /// Effective page number: at least 1, defaulting to [`DEFAULT_PAGE`].
    #[must_use]
    pub fn page_number(&self) -> u64 {
        self.page.unwrap_or(DEFAULT_PAGE).max(1)
    }

    /// Effective page size clamped to `1..=`[`MAX_PER_PAGE`].
    #[must_use]
    pub fn per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    /// Row offset for storage layers paging with LIMIT/OFFSET.
    #[must_use]
    pub fn offset(&self) -> u64 {
        (self.page_number() - 1) * self.per_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_user() -> User {
        User {
            id: "7c9e6679-7425-40de-944b-e07fc1f90ae7".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar_url: None,
            bio: Some("writes notes".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn example_note_parses_and_reserialises_identically() {
        let raw = json!({
            "id": "1",
            "title": "T",
            "content": "C",
            "author_id": "u1",
            "status": "draft",
            "views_count": 0,
            "likes_count": 0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });

        let note: Note = serde_json::from_value(raw.clone()).expect("example note parses");
        assert_eq!(note.id, "1");
        assert_eq!(note.status, "draft");
        assert!(note.summary.is_none());
        assert!(note.tags.is_none());
        assert!(note.updated_at >= note.created_at);
        assert!(note.views_count >= 0);
        assert!(note.likes_count >= 0);

        let reserialised = serde_json::to_value(&note).expect("note serialises");
        assert_eq!(reserialised, raw);
    }

    #[test]
    fn user_required_fields_survive_round_trip() {
        let user = sample_user();
        let encoded = serde_json::to_string(&user).expect("user serialises");
        let decoded: User = serde_json::from_str(&encoded).expect("user parses");
        assert_eq!(decoded, user);
        assert!(!decoded.id.is_empty());
        assert!(!decoded.username.is_empty());
        assert!(!decoded.email.is_empty());
    }

    #[test]
    fn absent_optional_fields_are_omitted_not_null() {
        let user = User {
            bio: None,
            ..sample_user()
        };
        let value = serde_json::to_value(&user).expect("user serialises");
        let object = value.as_object().expect("user is an object");
        assert!(!object.contains_key("avatar_url"));
        assert!(!object.contains_key("bio"));

        let comment = Comment {
            id: "c1".to_string(),
            content: "hello".to_string(),
            note_id: "n1".to_string(),
            author_id: "u1".to_string(),
            parent_id: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let value = serde_json::to_value(&comment).expect("comment serialises");
        assert!(!value.as_object().unwrap().contains_key("parent_id"));
    }

    #[test]
    fn comment_round_trip_preserves_thread_parent() {
        let comment = Comment {
            id: "c2".to_string(),
            content: "reply".to_string(),
            note_id: "n1".to_string(),
            author_id: "u2".to_string(),
            parent_id: Some("c1".to_string()),
            created_at: Utc.with_ymd_and_hms(2024, 2, 1, 8, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
        };
        let encoded = serde_json::to_string(&comment).expect("comment serialises");
        let decoded: Comment = serde_json::from_str(&encoded).expect("comment parses");
        assert_eq!(decoded, comment);
    }

    #[test]
    fn empty_object_is_a_valid_noop_patch() {
        let note_patch: UpdateNoteRequest = serde_json::from_str("{}").expect("empty note patch");
        assert!(note_patch.is_empty());
        assert!(note_patch.reject_reason().is_none());

        let comment_patch: UpdateCommentRequest =
            serde_json::from_str("{}").expect("empty comment patch");
        assert!(comment_patch.is_empty());
        assert!(comment_patch.reject_reason().is_none());
    }

    #[test]
    fn update_patches_reject_blanked_required_fields() {
        let patch = UpdateNoteRequest {
            title: Some("   ".to_string()),
            ..UpdateNoteRequest::default()
        };
        assert_eq!(patch.reject_reason(), Some("title must not be empty"));

        let patch = UpdateCommentRequest {
            content: Some(String::new()),
        };
        assert_eq!(patch.reject_reason(), Some("content must not be empty"));
    }

    #[test]
    fn register_request_rejects_bad_credentials() {
        let request = RegisterRequest {
            username: " ".to_string(),
            email: "ada@example.com".to_string(),
            password: "long-enough".to_string(),
        };
        assert_eq!(request.reject_reason(), Some("username must not be empty"));

        let request = RegisterRequest {
            username: "ada".to_string(),
            email: "not-an-address".to_string(),
            password: "long-enough".to_string(),
        };
        assert_eq!(request.reject_reason(), Some("email must be a valid address"));

        let request = RegisterRequest {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "short".to_string(),
        };
        assert_eq!(
            request.reject_reason(),
            Some("password must be at least 8 characters")
        );

        let request = RegisterRequest {
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "long-enough".to_string(),
        };
        assert!(request.reject_reason().is_none());
    }

    #[test]
    fn create_note_request_defaults_optionals_to_absent() {
        let request: CreateNoteRequest =
            serde_json::from_value(json!({"title": "T", "content": "C"}))
                .expect("minimal note request parses");
        assert!(request.summary.is_none());
        assert!(request.status.is_none());
        assert!(request.tags.is_none());
        assert!(request.reject_reason().is_none());
    }

    #[test]
    fn api_response_failure_is_distinguishable_from_success() {
        let failure: ApiResponse<Value> =
            serde_json::from_value(json!({"error": "not found", "status": 404}))
                .expect("failure envelope parses");
        assert!(failure.is_failure());
        assert!(!failure.is_success());
        assert!(failure.data.is_none());
        assert_eq!(failure.status, Some(404));

        let success: ApiResponse<Value> =
            serde_json::from_value(json!({"data": {"id": "1"}, "status": 200}))
                .expect("success envelope parses");
        assert!(success.is_success());
        assert!(!success.is_failure());
        assert_eq!(success.status, Some(200));
    }

    #[test]
    fn api_response_constructors_set_the_interpretation_fields() {
        let envelope = ApiResponse::success(json!({"ok": true})).with_status(200);
        assert!(envelope.is_success());
        assert_eq!(envelope.status, Some(200));

        let envelope: ApiResponse<Value> = ApiResponse::failure("Forbidden", 403);
        assert!(envelope.is_failure());
        assert_eq!(envelope.error.as_deref(), Some("Forbidden"));
        assert_eq!(envelope.status, Some(403));
        assert!(envelope.data.is_none());

        let envelope: ApiResponse<Value> = ApiResponse::message("Note deleted successfully");
        assert!(envelope.is_success());
        assert_eq!(envelope.message.as_deref(), Some("Note deleted successfully"));
    }

    #[test]
    fn paginated_response_respects_listing_bounds() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 12, 1, 3);
        assert!(page.data.len() as u64 <= page.total);
        assert!(page.page >= 1);
        assert!(page.per_page >= 1);

        let encoded = serde_json::to_value(&page).expect("page serialises");
        assert_eq!(encoded["data"], json!([1, 2, 3]));
        assert_eq!(encoded["total"], json!(12));
    }

    #[test]
    fn pagination_query_clamps_out_of_range_values() {
        let query = PaginationQuery::default();
        assert_eq!(query.page_number(), DEFAULT_PAGE);
        assert_eq!(query.per_page(), DEFAULT_PER_PAGE);
        assert_eq!(query.offset(), 0);

        let query = PaginationQuery {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(query.page_number(), 1);
        assert_eq!(query.per_page(), 1);

        let query = PaginationQuery {
            page: Some(3),
            per_page: Some(1000),
        };
        assert_eq!(query.page_number(), 3);
        assert_eq!(query.per_page(), MAX_PER_PAGE);
        assert_eq!(query.offset(), 2 * MAX_PER_PAGE);
    }
}
