use bytes::Bytes;

/// Content resolved from a store, in the representation the caller asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Binary(Bytes),
    Text(String),
}

impl Content {
    /// Content as bytes; text is UTF-8 encoded.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Content::Binary(bytes) => bytes,
            Content::Text(text) => Bytes::from(text.into_bytes()),
        }
    }

    /// Content as text, if it was resolved as text.
    pub fn into_text(self) -> Option<String> {
        match self {
            Content::Binary(_) => None,
            Content::Text(text) => Some(text),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Content::Binary(bytes) => bytes.len(),
            Content::Text(text) => text.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
