use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

/// Best-effort client labels derived from the user-agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub browser: String,
    pub os: String,
    pub device: String,
    pub user_agent: String,
}

/// Ordered (label, needles) tables, first match wins. Needles are lowercase.
/// Order matters: Edge and Opera agents also carry "chrome", Chrome agents
/// also carry "safari".
const BROWSERS: [(&str, &[&str]); 9] = [
    ("Edge", &["edg/", "edge/", "edga/", "edgios/"]),
    ("Opera", &["opr/", "opera"]),
    ("Samsung Internet", &["samsungbrowser"]),
    ("Chrome", &["chrome/", "crios/", "chromium/"]),
    ("Firefox", &["firefox/", "fxios/"]),
    ("Safari", &["safari/"]),
    ("Internet Explorer", &["msie ", "trident/"]),
    ("curl", &["curl/"]),
    ("Postman", &["postmanruntime"]),
];

const OPERATING_SYSTEMS: [(&str, &[&str]); 6] = [
    ("Windows", &["windows"]),
    ("Android", &["android"]),
    ("iOS", &["iphone", "ipad", "ipod"]),
    ("ChromeOS", &["cros "]),
    ("macOS", &["mac os x", "macintosh"]),
    ("Linux", &["linux"]),
];

const DEVICES: [(&str, &[&str]); 3] = [
    ("Bot", &["bot", "crawler", "spider", "slurp"]),
    ("Tablet", &["ipad", "tablet"]),
    ("Mobile", &["mobile", "iphone", "ipod", "android"]),
];

impl ClientInfo {
    /// Never fails; unrecognized agents are labeled [`UNKNOWN`]. A recognized
    /// OS without a mobile or bot marker counts as a desktop.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        let browser = first_match(&ua, &BROWSERS);
        let os = first_match(&ua, &OPERATING_SYSTEMS);

        let mut device = first_match(&ua, &DEVICES);
        if device == UNKNOWN && os != UNKNOWN {
            device = "Desktop";
        }

        Self {
            browser: browser.to_string(),
            os: os.to_string(),
            device: device.to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

fn first_match(ua: &str, table: &[(&'static str, &[&str])]) -> &'static str {
    for &(label, needles) in table {
        if needles.iter().any(|needle| ua.contains(needle)) {
            return label;
        }
    }
    UNKNOWN
}
