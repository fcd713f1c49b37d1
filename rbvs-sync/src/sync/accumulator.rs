//! In-progress song identity
//!
//! Artist and title arrive as separate events in either order. Once both
//! are present the pair is taken out as a unit and the slots are cleared,
//! whatever happens to the match attempt afterwards.

/// Artist/title fragments received so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongAccumulator {
    artist: Option<String>,
    title: Option<String>,
}

/// A fully populated song identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongIdentity {
    pub artist: String,
    pub title: String,
}

impl SongAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the artist, replacing any previous value
    pub fn set_artist(&mut self, artist: impl Into<String>) {
        self.artist = Some(artist.into());
    }

    /// Store the title, replacing any previous value
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Both slots hold non-empty text
    pub fn is_complete(&self) -> bool {
        matches!(
            (&self.artist, &self.title),
            (Some(a), Some(t)) if !a.is_empty() && !t.is_empty()
        )
    }

    /// Take the pair if complete, leaving both slots empty
    pub fn take_complete(&mut self) -> Option<SongIdentity> {
        if !self.is_complete() {
            return None;
        }

        let artist = self.artist.take()?;
        let title = self.title.take()?;
        Some(SongIdentity { artist, title })
    }

    pub fn clear(&mut self) {
        self.artist = None;
        self.title = None;
    }
}
