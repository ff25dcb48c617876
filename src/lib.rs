pub mod dispatch;
pub mod jobs;
pub mod logging;
pub mod prelude;
pub mod settings;
pub mod util;

// Re-exported for the field-building macros.
#[doc(hidden)]
pub use serde_json;
