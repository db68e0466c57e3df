//! Native-messaging surface of the teamlink host: the length-prefixed JSON
//! frame codec, request validation, chat-name sanitation, and the dispatch
//! loop that drives the provisioning workflow.

pub mod codec;
pub mod dispatch;
pub mod host;
pub mod sanitize;
pub mod types;

pub use codec::{read_frame, write_frame, ProtocolError, MAX_FRAME_LEN};
pub use dispatch::{Dispatcher, ACTION_CREATE_SELECTED_CHATS};
pub use host::run_host_loop;
pub use sanitize::{sanitize_chat_name, DEFAULT_CHAT_NAME};
pub use types::{CreateSelectedChatsRequest, HostResponse, Issue, ValidationError};
