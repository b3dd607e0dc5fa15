use std::path::PathBuf;

/// A structural problem in an access model, found during validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("workflow declares no states")]
    NoStates,

    #[error("state names must be non-empty and carry no surrounding whitespace")]
    EmptyStateName,

    #[error("state '{state}' is declared more than once")]
    DuplicateState { state: String },

    #[error("states '{first}' and '{second}' share progression index {index}")]
    DuplicateIndex {
        index: i64,
        first: String,
        second: String,
    },

    #[error("default state '{state}' is not a declared state")]
    UnknownDefaultState { state: String },

    #[error("default state cannot be the deleted sentinel '{state}'")]
    DeletedAsDefault { state: String },

    #[error("role name must not be empty")]
    EmptyRoleName,

    #[error("role '{role}' grants permissions at undeclared state '{state}'")]
    UnknownPermissionState { role: String, state: String },

    #[error("role '{role}' has a transition grant '{from}' -> '{to}' referencing an undeclared state")]
    UnknownTransitionState {
        role: String,
        from: String,
        to: String,
    },

    #[error("role '{role}' has a transition grant '{from}' -> '{to}' that is not a regression")]
    NotARegression {
        role: String,
        from: String,
        to: String,
    },

    #[error("role '{role}' has a transition grant '{from}' -> '{to}'; only a delete may enter '{to}'")]
    TransitionIntoDeleted {
        role: String,
        from: String,
        to: String,
    },
}

/// Errors raised while loading configuration files (access model, users).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("'{}' must be a .toml or .json file", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid access model in '{}': {source}", path.display())]
    InvalidModel {
        path: PathBuf,
        #[source]
        source: ModelError,
    },

    #[error("invalid user '{user_id}' in '{}': {reason}", path.display())]
    InvalidUser {
        path: PathBuf,
        user_id: String,
        reason: String,
    },

    #[error("could not render '{}': {message}", path.display())]
    Render { path: PathBuf, message: String },

    #[error("could not write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A change to the user directory that was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserAdminError {
    #[error("user id must not be blank")]
    BlankUserId,

    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("role '{0}' is not defined by the access model")]
    UnknownRole(String),

    #[error("create_queue '{0}' is not a usable state")]
    UnusableCreateQueue(String),

    #[error("'{user_id}' is already a member of '{role}'")]
    AlreadyMember { user_id: String, role: String },

    #[error("'{user_id}' is not a member of '{role}'")]
    NotAMember { user_id: String, role: String },
}
