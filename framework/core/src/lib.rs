mod credentials;
mod error;
mod execution_id;
mod validate;

pub mod prelude {
    pub use crate::credentials::Credentials;
    pub use crate::error::{ConfigurationError, HostFailure, PartialFailure, SessionError};
    pub use crate::execution_id::ExecutionId;
    pub use crate::validate::ensure_shell_safe;
}
