mod projects;

pub use projects::{PreparedSplit, SyntheticProjects};
