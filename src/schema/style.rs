use serde::{Deserialize, Serialize};
use std::fmt;

/// Newtype wrapper for style identifiers.
///
/// The built-in catalog numbers its styles 1 through 7; custom catalogs
/// may use any `u8` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StyleId(pub u8);

impl fmt::Display for StyleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for StyleId {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

/// One generated title, tagged with the style and entity it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedTitle {
    pub style: StyleId,
    pub entity: String,
    pub text: String,
}

impl fmt::Display for GeneratedTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<GeneratedTitle> for String {
    fn from(title: GeneratedTitle) -> Self {
        title.text
    }
}
