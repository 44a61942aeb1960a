//! Entity modules, one per table.

pub mod attendance;
pub mod comment;
pub mod comment_mention;
pub mod event;
pub mod follower;
pub mod following;
pub mod like;
pub mod notification;
pub mod processed_activity;
pub mod reminder;
pub mod user;
pub mod user_keypair;

pub use attendance::Entity as Attendance;
pub use comment::Entity as Comment;
pub use comment_mention::Entity as CommentMention;
pub use event::Entity as Event;
pub use follower::Entity as Follower;
pub use following::Entity as Following;
pub use like::Entity as Like;
pub use notification::Entity as Notification;
pub use processed_activity::Entity as ProcessedActivity;
pub use reminder::Entity as Reminder;
pub use user::Entity as User;
pub use user_keypair::Entity as UserKeypair;
