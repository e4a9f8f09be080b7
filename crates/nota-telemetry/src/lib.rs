//! Telemetry primitives shared across the Nota workspace.
//!
//! This crate centralises logging, metrics, and request-id helpers so the API
//! surface and the application shell adopt a consistent observability story.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use thiserror::Error;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{Span, span::Entered};
use tracing_subscriber::{EnvFilter, fmt};

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Failures raised while wiring the observability stack.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global tracing subscriber could not be installed.
    #[error("failed to install tracing subscriber")]
    SubscriberInstall {
        /// Description reported by the subscriber registry.
        detail: String,
    },
    /// A Prometheus collector could not be registered.
    #[error("failed to register metrics collector")]
    MetricsRegister {
        /// Source registry error.
        source: prometheus::Error,
    },
    /// The metrics registry could not be encoded for exposition.
    #[error("failed to encode metrics exposition")]
    MetricsEncode {
        /// Source encoder error.
        source: prometheus::Error,
    },
    /// The encoded exposition buffer was not valid UTF-8.
    #[error("metrics exposition was not valid UTF-8")]
    MetricsUtf8 {
        /// Source conversion error.
        source: std::string::FromUtf8Error,
    },
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let _ = BUILD_SHA.set(config.build_sha.to_string());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));

    let install = |format: LogFormat| {
        let builder = fmt::fmt()
            .with_env_filter(env_filter.clone())
            .with_target(false)
            .with_thread_ids(false);

        match format {
            LogFormat::Json => builder.json().try_init(),
            LogFormat::Pretty => builder.pretty().try_init(),
        }
    };

    install(config.format).map_err(|err| TelemetryError::SubscriberInstall {
        detail: err.to_string(),
    })?;

    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    pub level: &'a str,
    pub format: LogFormat,
    pub build_sha: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Parse a format name from configuration, falling back to [`infer`].
    ///
    /// [`infer`]: LogFormat::infer
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::infer(),
        }
    }
}

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    #[must_use]
    pub fn new(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", phase = %phase, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Access the build SHA recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Capture request context on the active HTTP span.
pub fn set_request_context(span: &Span, request_id: impl Into<String>, route: impl Into<String>) {
    let request_id = request_id.into();
    let route = route.into();
    span.record("request_id", tracing::field::display(&request_id));
    span.record("route", tracing::field::display(&route));
}

/// Factory for the `x-request-id` generator layer.
#[must_use]
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

/// Layer that propagates an incoming `x-request-id` header.
#[must_use]
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

/// Prometheus-backed metrics registry shared across services.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    auth_failures_total: IntCounter,
    rate_limit_throttled_total: IntCounter,
    sessions_issued_total: IntCounter,
    notes_created_total: IntCounter,
    comments_created_total: IntCounter,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be
    /// registered.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total HTTP requests received"),
            &["route", "code"],
        )
        .map_err(|source| TelemetryError::MetricsRegister { source })?;
        let auth_failures_total = IntCounter::with_opts(Opts::new(
            "auth_failures_total",
            "Login and bearer-token checks that were rejected",
        ))
        .map_err(|source| TelemetryError::MetricsRegister { source })?;
        let rate_limit_throttled_total = IntCounter::with_opts(Opts::new(
            "api_rate_limit_throttled_total",
            "Requests rejected due to API rate limiting",
        ))
        .map_err(|source| TelemetryError::MetricsRegister { source })?;
        let sessions_issued_total = IntCounter::with_opts(Opts::new(
            "sessions_issued_total",
            "Bearer sessions issued by register and login",
        ))
        .map_err(|source| TelemetryError::MetricsRegister { source })?;
        let notes_created_total = IntCounter::with_opts(Opts::new(
            "notes_created_total",
            "Notes created through the API",
        ))
        .map_err(|source| TelemetryError::MetricsRegister { source })?;
        let comments_created_total = IntCounter::with_opts(Opts::new(
            "comments_created_total",
            "Comments created through the API",
        ))
        .map_err(|source| TelemetryError::MetricsRegister { source })?;

        for collector in [
            Box::new(http_requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(auth_failures_total.clone()),
            Box::new(rate_limit_throttled_total.clone()),
            Box::new(sessions_issued_total.clone()),
            Box::new(notes_created_total.clone()),
            Box::new(comments_created_total.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|source| TelemetryError::MetricsRegister { source })?;
        }

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                http_requests_total,
                auth_failures_total,
                rate_limit_throttled_total,
                sessions_issued_total,
                notes_created_total,
                comments_created_total,
            }),
        })
    }

    /// Increment the HTTP request counter for the given route and status code.
    pub fn inc_http_request(&self, route: &str, status: u16) {
        self.inner
            .http_requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Increment the authentication failure counter.
    pub fn inc_auth_failure(&self) {
        self.inner.auth_failures_total.inc();
    }

    /// Increment the API rate limiter throttle counter.
    pub fn inc_rate_limit_throttled(&self) {
        self.inner.rate_limit_throttled_total.inc();
    }

    /// Increment the issued session counter.
    pub fn inc_session_issued(&self) {
        self.inner.sessions_issued_total.inc();
    }

    /// Increment the created note counter.
    pub fn inc_note_created(&self) {
        self.inner.notes_created_total.inc();
    }

    /// Increment the created comment counter.
    pub fn inc_comment_created(&self) {
        self.inner.comments_created_total.inc();
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }
}
