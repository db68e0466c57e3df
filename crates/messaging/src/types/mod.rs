mod errors;
mod requests;
mod responses;

pub use errors::ValidationError;
pub use requests::{CreateSelectedChatsRequest, Issue};
pub use responses::HostResponse;
