/// Notifications for the UI shell. Delivery is fire-and-forget over an
/// unbounded channel; a dropped receiver is ignored.
#[derive(Debug, Clone, PartialEq)]
pub enum ReaderEvent {
    DocumentLoaded {
        document_id: String,
        pages: Vec<String>,
        sentence_count: usize,
        progress: usize,
    },
    /// The sentence currently being spoken.
    Highlight(String),
    ClearHighlight,
    /// Number of sentences reached so far (the progress bar value).
    Progress(usize),
    RateChanged(u32),
    VolumeChanged(f32),
    /// Playback ran to the end of the document.
    Finished,
    SpeechFailed(String),
    /// A user-facing message, shown the way a dialog would be.
    Notice(String),
}
