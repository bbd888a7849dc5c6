pub mod error;
pub mod utils;

pub use error::{
    AttemptFailure, NetworkErrorKind, RelayError, Result, ResultExt, StatusClass,
    StatusClassifier,
};
pub use utils::{log_filter_error, truncate_chars};
