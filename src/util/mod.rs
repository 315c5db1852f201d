//! Small helpers shared by the client and the terminal output.
//!
//! - **URL validation** for the configurable API base URL
//! - **Text**: display width, truncation, wrapping, control-char stripping
//! - **Time**: "3 hours ago" style timestamps

mod text;
mod time;
mod url_validator;

pub use text::{display_width, strip_control_chars, truncate_to_width, wrap_to_width};
pub use time::relative_time;
pub use url_validator::{validate_base_url, UrlValidationError};
