// errors.rs — error taxonomy
//
// Mirrors the base engine's `OrderError` (exchange.rs): a concrete enum per
// subsystem, propagated with `?`, never boxed as `dyn Error`. `VenueError`
// is the adapter's failure surface; `EngineError` covers the handful of
// conditions that are actually fatal to the process.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VenueError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: f64 },
    #[error("clock skew detected")]
    ClockSkew,
    #[error("precision rejected by venue")]
    Precision,
    #[error("position mode mismatch")]
    PositionMode,
    #[error("order not found")]
    NotFound,
    #[error("request signing failed: {0}")]
    Signing(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("missing API credentials for live trading")]
    MissingCredentials,
    #[error("symbol not found on venue")]
    SymbolNotFound,
    #[error("state store error: {0}")]
    StateStore(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}
