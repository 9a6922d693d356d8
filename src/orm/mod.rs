//! SeaORM entities

pub mod block_entries;
pub mod tags;
pub mod unblock_audit;
pub mod user_sessions;
pub mod users;
pub mod video_tags;
pub mod videos;
