//! Well-known MQTT topic names for the crawler control plane.

/// Topic the crawler message service listens on for commands.
pub const CRAWLER_COMMAND_TOPIC: &str = "command/video_crawler";

/// Topic the crawler message service publishes status updates on.
pub const CRAWLER_STATUS_TOPIC: &str = "status/video_crawler";

/// Command payload that starts a crawl run.
pub const START_CRAWL: &str = "start_crawl";

/// Command payload that stops a crawl run.
pub const STOP_CRAWL: &str = "stop_crawl";
