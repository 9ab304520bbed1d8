mod config;
mod error;
mod http;
mod picker;
mod transport;


pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use http::HttpTransport;
pub use picker::PickerClient;
pub use transport::Transport;
