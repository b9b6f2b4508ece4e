use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `drivelink`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum DriveError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Vehicle cloud ───────────────────────────────────────────────────
    #[error("vehicle: {0}")]
    Vehicle(#[from] VehicleError),

    // ── Geocoding ───────────────────────────────────────────────────────
    #[error("geocode: {0}")]
    Geocode(#[from] GeocodeError),

    // ── Host persistence ────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Vehicle cloud errors ───────────────────────────────────────────────────

/// Failure reported by the vehicle session client.
///
/// `Remote` carries the machine-readable result code the vehicle cloud sent
/// back; the command queue inspects it to decide whether a retry is worth it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VehicleError {
    #[error("no authenticated vehicle session")]
    NoSession,

    #[error("login failed: {0}")]
    Login(String),

    #[error("remote rejected request (code {code}): {message}")]
    Remote { code: String, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("unsupported by this vehicle: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Other(String),
}

impl VehicleError {
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Remote result code, when the vehicle cloud supplied one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Remote { code, .. } => Some(code.as_str()),
            _ => None,
        }
    }

    /// True when the error carries one of the given remote result codes.
    pub fn has_code<S: AsRef<str>>(&self, codes: &[S]) -> bool {
        self.code()
            .is_some_and(|code| codes.iter().any(|c| c.as_ref() == code))
    }
}

// ─── Geocoding errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("no result for {0}")]
    NotFound(String),

    #[error("lookup failed: {0}")]
    Lookup(String),
}

// ─── Host store errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key {key} could not be written: {message}")]
    Write { key: String, message: String },

    #[error("key {key} holds malformed data: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, DriveError>;
