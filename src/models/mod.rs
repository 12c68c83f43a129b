// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{Gender, Like, Message, MessageDeletion, Photo, User};
pub use requests::{MessageContainer, MessageParameters, NewMessage, ProfileUpdate, UserParameters};
pub use responses::PaginationHeader;
