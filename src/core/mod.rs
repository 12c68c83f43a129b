// Core query engine exports
pub mod discovery;
pub mod likes;
pub mod messages;
pub mod paging;
pub mod service;

pub use discovery::{BirthDateWindow, UserOrder, UserQuery};
pub use likes::{collect_ids, LikeDirection};
pub use messages::MessageScope;
pub use paging::{total_pages, PageRequest, PageSource, PagedList, SliceSource};
pub use service::{DatingError, DatingService};
