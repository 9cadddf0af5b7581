pub mod client_ip;
pub mod image_utils;
pub mod slug;
pub mod token;
