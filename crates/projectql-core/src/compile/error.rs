//! Errors produced by the Validator & Binder and Expression Builder. All
//! collected into a `Vec<CompileError>` rather than failing on the first
//! one found.

use crate::loc::SourceLocation;
use crate::schema::SchemaConflict;

#[derive(Clone, Debug, thiserror::Error)]
pub enum CompileError {
    #[error("Field '{field}' not found on type '{type_name}'")]
    UnknownField {
        type_name: String,
        field: String,
        location: SourceLocation,
    },

    #[error("Argument '{argument}' not found on field '{field}'")]
    UnknownArgument {
        field: String,
        argument: String,
        location: SourceLocation,
    },

    #[error("InvalidArgument: '{argument}' on field '{field}': {reason}")]
    InvalidArgument {
        field: String,
        argument: String,
        reason: String,
        location: SourceLocation,
    },

    #[error("MissingVariable: '${name}' has no value and no default")]
    MissingVariable {
        name: String,
        location: SourceLocation,
    },

    #[error("FragmentCycle: {0}")]
    FragmentCycle(String),

    #[error("Fragment '{0}' is spread but never defined")]
    UndefinedFragment(String),

    #[error("fragment '{0}' is defined more than once")]
    DuplicateFragment(String),

    #[error(
        "FieldConflict: selections for output name '{output_name}' refer to different fields or arguments"
    )]
    FieldConflict {
        output_name: String,
        location: SourceLocation,
    },

    #[error("inline fragment on type '{condition}' is not compatible with parent type '{parent}'")]
    IncompatibleFragment {
        condition: String,
        parent: String,
        location: SourceLocation,
    },

    #[error("Unauthorized")]
    Unauthorized { location: SourceLocation },

    #[error("operation '{0}' not found in document")]
    OperationNotFound(String),

    #[error("document defines more than one operation; an operationName is required")]
    AmbiguousOperation,

    #[error("subscriptions are not supported")]
    SubscriptionsUnsupported,

    #[error("InvalidCursor: {0}")]
    InvalidCursor(String),

    #[error(transparent)]
    SchemaConflict(#[from] SchemaConflict),
}

impl CompileError {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Self::UnknownField { location, .. }
            | Self::UnknownArgument { location, .. }
            | Self::InvalidArgument { location, .. }
            | Self::MissingVariable { location, .. }
            | Self::FieldConflict { location, .. }
            | Self::IncompatibleFragment { location, .. }
            | Self::Unauthorized { location } => location,
            Self::FragmentCycle(_)
            | Self::UndefinedFragment(_)
            | Self::DuplicateFragment(_)
            | Self::InvalidCursor(_)
            | Self::SchemaConflict(_)
            | Self::OperationNotFound(_)
            | Self::AmbiguousOperation
            | Self::SubscriptionsUnsupported => &SourceLocation::BuiltIn,
        }
    }
}
