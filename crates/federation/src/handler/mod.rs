//! `ActivityPub` request handlers.

#![allow(missing_docs)]

mod collections;
mod inbox;
mod user;
mod webfinger;

pub use collections::{
    CollectionState, CollectionQuery, OrderedCollection, OrderedCollectionPage, followers_handler,
    following_handler, outbox_handler,
};
pub use inbox::{inbox_handler, InboxState};
pub use user::{user_handler, UserApState};
pub use webfinger::{webfinger_handler, WebfingerLink, WebfingerResponse, WebfingerState};
