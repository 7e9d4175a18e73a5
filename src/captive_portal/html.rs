//! Built-in copies of the portal pages, served when the filesystem has none.

pub const INDEX_HTML: &str = include_str!("../../data/index.html");

pub const WIFI_HTML: &str = include_str!("../../data/wifi.html");
