//! Upload pipeline: validation, transfer client, and the drive engine.
//!
//! Submodules:
//! - `validation` - pre-flight content type and size policy
//! - `title` - default document titles derived from file names
//! - `client` - multipart HTTP transfer with streamed progress
//! - `engine` - command surface and the sequential drive loop
//! - `error` - upload failure taxonomy
//! - `constants` - timeouts, limits, and scheduling delays

mod client;
mod constants;
mod engine;
mod error;
mod title;
mod validation;

pub use client::{HttpClient, UploadRequest};
pub use constants::{DEFAULT_MAX_FILE_SIZE, PDF_CONTENT_TYPE};
pub use engine::{EngineOptions, EngineTuning, UploadEngine};
pub use error::UploadError;
pub use title::title_from_filename;
pub use validation::{UploadPolicy, detect_content_type};
