use crate::catalog::Modality;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static VIDEO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(video|clip|footage|animation|animated?|movie|film|reel)\b").unwrap()
});

static IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(image|picture|photo|illustration|drawing|draw|paint(ing)?|sketch|logo|poster|artwork)\b",
    )
    .unwrap()
});

static SPEECH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(speech|voice|audio|speak|read (it )?aloud|narrat\w*|text[- ]to[- ]speech|tts|pronounc\w*)\b",
    )
    .unwrap()
});

/// Which modalities a message asks for. Text is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalitySignals {
    pub text: bool,
    pub image: bool,
    pub video: bool,
    pub speech: bool,
}

impl ModalitySignals {
    pub fn detect(message: &str) -> Self {
        Self {
            text: true,
            image: IMAGE.is_match(message),
            video: VIDEO.is_match(message),
            speech: SPEECH.is_match(message),
        }
    }

    pub fn count(&self) -> usize {
        [self.text, self.image, self.video, self.speech]
            .iter()
            .filter(|s| **s)
            .count()
    }

    /// multimodal > video > image > speech > text
    pub fn modality(&self) -> Modality {
        if self.count() > 2 || (self.video && self.image) {
            Modality::Multimodal
        } else if self.video {
            Modality::Video
        } else if self.image {
            Modality::Image
        } else if self.speech {
            Modality::Speech
        } else {
            Modality::Text
        }
    }
}

pub fn detect_modality(message: &str) -> (Modality, ModalitySignals) {
    let signals = ModalitySignals::detect(message);
    (signals.modality(), signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_question_is_text() {
        assert_eq!(detect_modality("What is the capital of France?").0, Modality::Text);
    }

    #[test]
    fn single_signals_map_to_their_modality() {
        assert_eq!(detect_modality("Draw a logo for my bakery").0, Modality::Image);
        assert_eq!(detect_modality("Make a short video of waves").0, Modality::Video);
        assert_eq!(detect_modality("Read this aloud in a calm voice").0, Modality::Speech);
    }

    #[test]
    fn video_and_image_together_are_multimodal() {
        let (modality, signals) = detect_modality("Turn this photo into a video");
        assert!(signals.video && signals.image);
        assert_eq!(modality, Modality::Multimodal);
    }

    #[test]
    fn image_and_speech_exceed_two_signals() {
        assert_eq!(
            detect_modality("Describe the picture and narrate it with audio").0,
            Modality::Multimodal
        );
    }
}
