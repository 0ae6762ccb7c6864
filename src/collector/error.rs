use thiserror::Error;

/// A broken engine invariant. These abort extraction immediately.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InternalError {
    #[error("Internal error: no collector entity was created for {entity}")]
    MissingCollectorEntity { entity: String },

    #[error("Internal error: metadata for {declaration} was not computed")]
    MissingMetadata { declaration: String },

    #[error("Internal error: metadata for {declaration} has already been computed")]
    MetadataAlreadyFrozen { declaration: String },

    #[error("Internal error: cannot make {ancillary} ancillary to {main}: {reason}")]
    InvalidAncillaryLink {
        main: String,
        ancillary: String,
        reason: &'static str,
    },

    #[error("Internal error: the package exports two different entities named \"{name}\"")]
    DuplicateExportName { name: String },

    #[error("Internal error: emit name for \"{entity}\" was assigned twice")]
    NameAlreadyAssigned { entity: String },

    #[error("Internal error: analyze() was called more than once")]
    AlreadyAnalyzed,
}
