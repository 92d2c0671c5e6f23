pub mod articles;
pub mod comments;
pub mod stats;
pub mod status_changes;
pub mod users;
