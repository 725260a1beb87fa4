//! Core types for kube-job-notifier.
//!
//! `kjn-core` holds everything the chat and metrics backends share:
//!
//! - [`JobInfo`]: the Job being reported, with suffix-normalised display name
//! - [`JobEvent`]: the lifecycle transition (start, success, failure)
//! - [`MessageTemplateParam`] and [`render`]: the human-readable message body
//! - [`NotifyError`]: the error kinds every notifier reports
//!
//! # Example
//!
//! ```rust
//! use kjn_core::{render, JobInfo, MessageTemplateParam};
//!
//! let job = JobInfo::new("etl-job-27x9k", "data");
//! let text = render(&MessageTemplateParam::from(&job)).unwrap();
//! assert_eq!(text, "*JobName*: etl-job\n*Namespace*: data\n");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod job;
pub mod message;

pub use error::{NotifyError, Result};
pub use job::{JobEvent, JobInfo};
pub use message::{render, MessageTemplateParam};
