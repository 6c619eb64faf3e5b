/// `Envelope` is what travels through a hand-off queue.
///
/// End of stream is its own variant, so no payload value can ever be
/// mistaken for the termination marker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Envelope<T> {
    /// A payload from the producer side.
    Data(T),

    /// No more payloads will follow.
    EndOfStream,
}

impl<T> Envelope<T> {
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    #[must_use]
    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Data(value) => Some(value),
            Self::EndOfStream => None,
        }
    }
}

impl<T> From<T> for Envelope<T> {
    fn from(value: T) -> Self {
        Self::Data(value)
    }
}

#[cfg(test)]
mod test_envelope {
    use super::Envelope;

    #[test]
    fn payload_matching_an_old_sentinel_is_still_data() {
        let envelope = Envelope::from(String::from("shutdown"));
        assert!(!envelope.is_end());
        assert_eq!(envelope.into_data().as_deref(), Some("shutdown"));
    }

    #[test]
    fn end_of_stream_carries_no_data() {
        let envelope = Envelope::<u8>::EndOfStream;
        assert!(envelope.is_end());
        assert_eq!(envelope.into_data(), None);
    }
}
