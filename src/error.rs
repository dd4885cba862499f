use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
///
/// Every variant except the I/O and serialization wrappers is fatal to a
/// generation run: the run aborts and no partial document is produced.
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    InvalidArgument(String),
    SerializationError(String),
    /// A rule was given fewer parameters than it requires
    RuleArity {
        rule: String,
        field: String,
        required: usize,
    },
    /// A rule keyword has no registered handler
    UnknownRule { rule: String, field: String },
    /// A resource (or collection) cannot reveal the type it wraps
    MissingTypeAnnotation { type_name: String },
    /// A domain entity cannot produce sample instances
    MissingFactory { entity: String },
    /// Several modules define a type with the same short name
    AmbiguousType { type_name: String, sites: Vec<String> },
    /// A response type is none of the recognized response kinds
    UnsupportedResponseType { type_name: String },
    /// A sampled value has a kind the schema walker cannot describe
    UnsupportedValueType { name: String, value_type: String },
    /// An empty sequence gives nothing to infer an item schema from
    EmptySequenceUnsupported { name: String },
    /// A collaborator (factory, transform, error renderer) failed
    Collaborator(String),
    /// Wraps a fatal error with the route that triggered it
    Route { uri: String, source: Box<Error> },
}

impl Error {
    /// Attach the offending route URI to this error
    pub fn in_route(self, uri: &str) -> Self {
        match self {
            Error::Route { .. } => self,
            other => Error::Route {
                uri: uri.to_string(),
                source: Box::new(other),
            },
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO error: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "Parse error in {}: {}", file.display(), message)
            }
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::RuleArity {
                rule,
                field,
                required,
            } => write!(
                f,
                "Validation rule {} on field {} requires at least {} parameters",
                rule, field, required
            ),
            Error::UnknownRule { rule, field } => {
                write!(f, "Unknown validation rule {} on field {}", rule, field)
            }
            Error::MissingTypeAnnotation { type_name } => write!(
                f,
                "{} needs to declare the type it wraps in order to be documented, \
                 e.g. `fn new(user: User) -> Self` or `type Entity = User;`",
                type_name
            ),
            Error::MissingFactory { entity } => write!(
                f,
                "The entity {} needs a sample factory to be documented",
                entity
            ),
            Error::AmbiguousType { type_name, sites } => write!(
                f,
                "The type {} is defined in several modules ({}), rename one to document it",
                type_name,
                sites.join(", ")
            ),
            Error::UnsupportedResponseType { type_name } => write!(
                f,
                "The response type {} is not supported and can't be documented",
                type_name
            ),
            Error::UnsupportedValueType { name, value_type } => write!(
                f,
                "The value of {} has unsupported type {}",
                name, value_type
            ),
            Error::EmptySequenceUnsupported { name } => write!(
                f,
                "The sequence {} is empty, no item schema can be inferred",
                name
            ),
            Error::Collaborator(msg) => write!(f, "{}", msg),
            Error::Route { uri, source } => write!(f, "Route /{}: {}", uri.trim_start_matches('/'), source),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::Route { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(format!("JSON serialization error: {}", err))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::SerializationError(format!("YAML serialization error: {}", err))
    }
}
