//! Archive capture ingestion.
//!
//! ```text
//! archive/
//! ├── mod.rs        # Error type (this file)
//! ├── warc.rs       # WARC record framing, gzip aware
//! ├── extract.rs    # JSON resources -> MessageRecord
//! ├── email.rs      # MIME bodies -> text
//! └── html_text.rs  # HTML stripping / escaping
//! ```

pub mod email;
pub mod extract;
pub mod html_text;
pub mod warc;

use std::path::PathBuf;

use thiserror::Error;

pub use extract::{ExtractStats, Extractor, run_extract};
pub use warc::{WarcReader, WarcRecord};

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("read error at byte {offset}: {source}")]
    Io {
        offset: u64,
        source: std::io::Error,
    },

    #[error("malformed WARC record near byte {offset}: {reason}")]
    Malformed { offset: u64, reason: String },
}
