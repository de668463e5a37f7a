use kisch_sexpr::ParseError;

/// Errors raised while loading or editing a schematic.
///
/// Read-only queries (pin locations, connectivity) never return these: a
/// missing library entry or an empty wire set just yields empty results.
#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    #[error("Failed to parse schematic: {0}")]
    Parse(#[from] ParseError),

    #[error("Malformed schematic: {what}")]
    Malformed { what: String },

    #[error("Rotation {0} is not a multiple of 90 degrees")]
    InvalidRotation(f64),

    #[error("Library symbol '{lib_id}' not found in schematic. Available symbols: {known:?}")]
    LibraryNotFound { lib_id: String, known: Vec<String> },

    #[error("An element named '{key}' already exists")]
    KeyCollision { key: String },

    #[error("No element named '{key}'")]
    KeyNotFound { key: String },

    #[error("Invalid reference pattern: {0}")]
    InvalidRegex(#[from] regex::Error),
}

impl SchematicError {
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        SchematicError::Malformed { what: what.into() }
    }
}

pub type Result<T, E = SchematicError> = std::result::Result<T, E>;
