use serde::Serialize;

/// A team as it appears in one match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamRef {
    pub name: String,
    /// Opaque 8-hex-character identifier assigned by fbref; stable
    /// across seasons. `None` when the page gave us no squad link.
    pub site_id: Option<String>,
    pub manager: Option<String>,
    pub captain: Option<String>,
}

impl TeamRef {
    pub fn named(name: impl Into<String>) -> Self {
        TeamRef {
            name: name.into(),
            ..TeamRef::default()
        }
    }
}

/// Check the `/^[0-9a-f]{8}$/` shape of an fbref squad/player id.
pub fn is_valid_site_id(id: &str) -> bool {
    id.len() == 8 && id.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}
