use core::time::Duration;

/// Client-side coalescing settings.
///
/// The windows bound how long a call may wait before its batch is sent. They
/// are independent of the server's own windows; a page read may be coalesced
/// once here and once again on the server.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the picker server, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Ids per page; page `n` starts at offset `n * page_size`.
    pub page_size: usize,
    pub page_window: Duration,
    pub add_window: Duration,
    pub save_window: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_owned(),
            page_size: 50,
            page_window: Duration::from_millis(25),
            add_window: Duration::from_millis(50),
            save_window: Duration::from_millis(200),
        }
    }
}
