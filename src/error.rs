//! Diagnostic error types for the wayscribe engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. The taxonomy deliberately separates the
//! two user-distinguishable failure modes of narrative generation — retrieval
//! failures (service unavailable, retryable) and malformed oracle output (try a
//! different query) — from the best-effort preference errors that the planner
//! absorbs without interrupting a journey.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the wayscribe engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the caller. Only the
/// classes the pipeline actually surfaces appear here: `LlmError` always
/// arrives wrapped in its pipeline's error ([`NarrativeError::Oracle`] or
/// [`PreferenceError::Oracle`]), and [`IndexError`] stays on the offline
/// build/load API.
#[derive(Debug, Error, Diagnostic)]
pub enum ScribeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Narrative(#[from] NarrativeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Preference(#[from] PreferenceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Generation oracle errors
// ---------------------------------------------------------------------------

/// Errors from the text-generation oracle client.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("generation oracle is not available at {url}")]
    #[diagnostic(
        code(scribe::llm::unavailable),
        help("Start Ollama with `ollama serve`, or point `base_url` at a reachable server.")
    )]
    Unavailable { url: String },

    #[error("generation request failed: {message}")]
    #[diagnostic(
        code(scribe::llm::request_failed),
        help("Check that the oracle server is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("generation request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(scribe::llm::timeout),
        help("Increase `generation_timeout_secs` or use a smaller model. This error is retryable.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("failed to parse oracle response: {message}")]
    #[diagnostic(
        code(scribe::llm::parse_error),
        help("The oracle server returned an unexpected response envelope.")
    )]
    ParseError { message: String },
}

// ---------------------------------------------------------------------------
// Retrieval errors (embedding oracle)
// ---------------------------------------------------------------------------

/// Errors from the embedding oracle.
///
/// All of these are fatal to the narrative request that triggered them: no
/// narrative can be grounded without a query embedding. They are retryable —
/// the knowledge base and the request itself are fine, the service is not.
#[derive(Debug, Error, Diagnostic)]
pub enum RetrievalError {
    #[error("embedding oracle is not available at {url}")]
    #[diagnostic(
        code(scribe::retrieval::unavailable),
        help("Start the embedding server, or point `base_url` at a reachable one.")
    )]
    Unavailable { url: String },

    #[error("embedding request failed: {message}")]
    #[diagnostic(
        code(scribe::retrieval::request_failed),
        help("Check that the embedding server is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("embedding request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(scribe::retrieval::timeout),
        help("Increase `embedding_timeout_secs`. This error is retryable.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("embedding oracle returned a malformed response: {message}")]
    #[diagnostic(
        code(scribe::retrieval::bad_response),
        help(
            "The server answered but the body held no usable vector. \
             An empty embedding is rejected rather than silently treated as zeros."
        )
    )]
    BadResponse { message: String },
}

// ---------------------------------------------------------------------------
// Context index errors
// ---------------------------------------------------------------------------

/// Errors building or loading the context index.
///
/// These only occur at build/load time. A missing or broken index at runtime
/// degrades to the empty context — `search` itself never fails.
#[derive(Debug, Error, Diagnostic)]
pub enum IndexError {
    #[error("failed to read index snapshot: {message}")]
    #[diagnostic(
        code(scribe::index::snapshot),
        help(
            "The snapshot file is missing or corrupt. Rebuild it from the chunk \
             corpus with the offline indexing tooling."
        )
    )]
    Snapshot { message: String },

    #[error("embedding dimension mismatch in index: expected {expected}, got {actual}")]
    #[diagnostic(
        code(scribe::index::dim_mismatch),
        help(
            "All chunk embeddings in one index must share a dimension. \
             Re-embed the corpus with a single model."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot build an index from zero entries")]
    #[diagnostic(
        code(scribe::index::empty),
        help("Provide at least one embedded chunk, or use `ContextIndex::unavailable()`.")
    )]
    Empty,
}

// ---------------------------------------------------------------------------
// Narrative errors
// ---------------------------------------------------------------------------

/// Errors from narrative generation.
#[derive(Debug, Error, Diagnostic)]
pub enum NarrativeError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] LlmError),

    #[error("oracle output does not conform to the narrative schema: {message}")]
    #[diagnostic(
        code(scribe::narrative::malformed_output),
        help(
            "The generated text could not be parsed into the four-field narrative \
             structure. There is no in-pipeline retry; the caller may re-issue the \
             request or suggest a different query."
        )
    )]
    MalformedOutput { message: String },

    #[error("narrative field `{field}` is empty")]
    #[diagnostic(
        code(scribe::narrative::empty_field),
        help("All four narrative fields must be non-empty. Treated the same as malformed output.")
    )]
    EmptyField { field: &'static str },
}

// ---------------------------------------------------------------------------
// Preference errors
// ---------------------------------------------------------------------------

/// Errors from the reflection updater.
///
/// Reflection is best-effort personalization: the planner facade logs these
/// and never surfaces them as a user-facing failure.
#[derive(Debug, Error, Diagnostic)]
pub enum PreferenceError {
    #[error("reflection oracle call failed")]
    #[diagnostic(
        code(scribe::preference::oracle),
        help("The generation oracle was unreachable or errored during reflection.")
    )]
    Oracle {
        #[source]
        source: LlmError,
    },

    #[error("reflection output rejected: {message}")]
    #[diagnostic(
        code(scribe::preference::update_rejected),
        help(
            "The oracle did not return a JSON object with exactly `likes` and \
             `dislikes` string lists. The profile was left untouched."
        )
    )]
    UpdateRejected { message: String },

    #[error("preference store write failed")]
    #[diagnostic(
        code(scribe::preference::store),
        help("The validated profile could not be persisted. The previous profile is intact.")
    )]
    Store {
        #[source]
        source: StoreError,
    },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

/// Errors from the durable key-value backends.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(scribe::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("redb transaction error: {message}")]
    #[diagnostic(
        code(scribe::store::redb),
        help(
            "The embedded database encountered a transaction error. \
             This may indicate corruption — try a fresh data directory."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(scribe::store::serde),
        help(
            "Failed to serialize or deserialize a stored document. This usually \
             means the stored format changed between versions."
        )
    )]
    Serialization { message: String },
}

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

/// Errors from the destination catalog.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("destination not found: {id}")]
    #[diagnostic(
        code(scribe::catalog::not_found),
        help("No destination with this id exists in the catalog. Verify the id is correct.")
    )]
    NotFound { id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Routing errors
// ---------------------------------------------------------------------------

/// Errors from the external routing collaborator.
#[derive(Debug, Error, Diagnostic)]
pub enum RouteError {
    #[error("coordinate is not finite: ({lon}, {lat})")]
    #[diagnostic(
        code(scribe::route::invalid_coordinate),
        help("Origin and destination coordinates must both be finite floats.")
    )]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("routing request failed: {message}")]
    #[diagnostic(
        code(scribe::route::request_failed),
        help("Check the routing API key and network reachability.")
    )]
    RequestFailed { message: String },

    #[error("routing request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(scribe::route::timeout),
        help("Increase `routing_timeout_secs`. This error is retryable.")
    )]
    Timeout { timeout_secs: u64 },

    #[error("could not parse routing response: {message}")]
    #[diagnostic(
        code(scribe::route::bad_response),
        help("The routing API answered with an unexpected document shape.")
    )]
    BadResponse { message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors loading the planner configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(
        code(scribe::config::io),
        help("Check that the path exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {message}")]
    #[diagnostic(
        code(scribe::config::parse),
        help("The file must be valid TOML matching the PlannerConfig schema.")
    )]
    Parse { path: String, message: String },
}

/// Convenience alias for functions returning wayscribe results.
pub type ScribeResult<T> = std::result::Result<T, ScribeError>;
