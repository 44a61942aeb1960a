//! Repository layer: one narrow, hand-written query module per entity.
//!
//! Kept deliberately thin — no query builder abstraction spanning entities,
//! just `sea-orm` statements close to the shape of what callers need. Hot
//! paths (event listing, trending) get dedicated methods rather than a
//! generic filter DSL.

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

pub use attendance::AttendanceRepository;
pub use comment::CommentRepository;
pub use comment_mention::CommentMentionRepository;
pub use event::EventRepository;
pub use follower::FollowerRepository;
pub use following::FollowingRepository;
pub use like::LikeRepository;
pub use notification::NotificationRepository;
pub use processed_activity::ProcessedActivityRepository;
pub use reminder::ReminderRepository;
pub use user::UserRepository;
pub use user_keypair::UserKeypairRepository;
