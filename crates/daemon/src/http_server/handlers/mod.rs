pub mod account;
pub mod discord;
pub mod index;
mod not_found;
pub mod share_link;

pub use not_found::not_found_handler;
