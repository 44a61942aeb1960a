//! Business logic services.

#![allow(missing_docs)]

pub mod attendance;
pub mod comment;
pub mod delivery;
pub mod event;
pub mod follow;
pub mod mention;
pub mod like;
pub mod notification;
pub mod reminder;
pub mod trending;
pub mod user;
pub mod visibility;

pub use attendance::AttendanceService;
pub use comment::{CommentService, CreateCommentInput};
pub use delivery::{ActivityDelivery, DeliveryService, NoOpDelivery};
pub use event::{EventInput, EventService};
pub use follow::FollowService;
pub use like::LikeService;
pub use notification::NotificationService;
pub use reminder::ReminderService;
pub use trending::{TrendingEntry, TrendingService};
pub use user::{CreateUserInput, UpdateUserInput, UserService};
pub use visibility::{can_view, listable_where, viewer_follows_author, Viewer};
