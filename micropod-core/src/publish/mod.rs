pub mod feed;
pub mod publisher;
