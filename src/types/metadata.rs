use serde::{Deserialize, Serialize};

/// Link-preview metadata extracted from a web page.
///
/// Every field may be empty. `image` is either empty or an absolute URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub image: String,
}
