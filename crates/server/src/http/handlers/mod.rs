pub mod articles;
pub mod audit;
pub mod comments;
pub mod users;
