use thiserror::Error;

/// Catalogue load failures are always fatal (spec §7: Config errors abort
/// startup). Mirrors `repo/errors.rs`'s rich-message + stable-code shape.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogueError {
    #[error("missing catalogue file: {path}")]
    MissingFile { path: String },

    #[error("failed to read catalogue file {path}: {detail}")]
    ReadFailed { path: String, detail: String },

    #[error("invalid TOML in catalogue file {path}: {detail}")]
    ParseFailed { path: String, detail: String },

    #[error("catalogue schema violation in {path}: {detail}")]
    SchemaInvalid { path: String, detail: String },

    #[error("duplicate id {id:?} across catalogue section {section}")]
    DuplicateId { section: String, id: String },
}

impl CatalogueError {
    pub fn code(&self) -> &'static str {
        match self {
            CatalogueError::MissingFile { .. } => "catalogue.missing_file",
            CatalogueError::ReadFailed { .. } => "catalogue.read_failed",
            CatalogueError::ParseFailed { .. } => "catalogue.parse_failed",
            CatalogueError::SchemaInvalid { .. } => "catalogue.schema_invalid",
            CatalogueError::DuplicateId { .. } => "catalogue.duplicate_id",
        }
    }
}
