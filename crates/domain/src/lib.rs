pub mod authz;
pub mod classifier;
pub mod commands;
mod error;
mod models;
pub mod thread;

pub use classifier::{Classifier, Verdict};
pub use error::{ModerationError, ModerationResult};
pub use models::{
    ActorRef, Article, ArticleActivity, ChangedBy, Comment, CommentStatus, CommentingStatus,
    DailyCount, HourlyCount, ModerationStats, Role, StatusChange, ThreadNode, User,
};
