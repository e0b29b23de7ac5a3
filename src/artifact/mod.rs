//! Durable storage for the fitted preprocessor and model.
//!
//! Each artifact is one file:
//!
//! ```text
//! +--------+---------+------+------------------+
//! | SITEML | version | kind | bincode payload  |
//! | 6 B    | 1 B     | 1 B  | ...              |
//! +--------+---------+------+------------------+
//! ```

mod store;

pub use store::{Artifact, ArtifactError, ArtifactKind, ArtifactStore, FORMAT_VERSION, MAGIC};
