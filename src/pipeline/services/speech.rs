use crate::error::SpeechError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnqueueMode {
    /// Cut off whatever is currently being spoken
    Interrupt,
    /// Queue after the current utterance
    Append,
}

/// Composed text ready for the speech synthesizer.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub frame_id: Uuid,
    pub text: String,
    pub mode: EnqueueMode,
}

/// Fire-and-forget sink for composed alerts. Implementations must not block.
pub trait SpeechChannel: Send + Sync {
    fn speak(&self, utterance: Utterance) -> Result<(), SpeechError>;

    fn name(&self) -> &'static str;
}

/// Forwards utterances to a playback task over a bounded channel.
pub struct ChannelSpeech {
    tx: mpsc::Sender<Utterance>,
}

impl ChannelSpeech {
    pub fn new(tx: mpsc::Sender<Utterance>) -> Self {
        Self { tx }
    }

    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Utterance>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self::new(tx), rx)
    }
}

impl SpeechChannel for ChannelSpeech {
    fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        let frame_id = utterance.frame_id;
        self.tx.try_send(utterance).map_err(|e| match e {
            TrySendError::Full(_) => SpeechError::QueueFull(frame_id),
            TrySendError::Closed(_) => SpeechError::Closed,
        })
    }

    fn name(&self) -> &'static str {
        "ChannelSpeech"
    }
}

/// Writes utterances to the log instead of a synthesizer.
pub struct LoggingSpeech;

impl SpeechChannel for LoggingSpeech {
    fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        info!(
            "Speaking ({:?}) for frame {}: {}",
            utterance.mode, utterance.frame_id, utterance.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LoggingSpeech"
    }
}

/// Keeps every utterance in memory (for testing and development)
#[derive(Clone, Default)]
pub struct RecordingSpeech {
    spoken: Arc<Mutex<Vec<Utterance>>>,
}

impl RecordingSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken
            .lock()
            .map(|spoken| spoken.clone())
            .unwrap_or_default()
    }
}

impl SpeechChannel for RecordingSpeech {
    fn speak(&self, utterance: Utterance) -> Result<(), SpeechError> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(utterance);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "RecordingSpeech"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utterance(text: &str) -> Utterance {
        Utterance {
            frame_id: Uuid::new_v4(),
            text: text.to_string(),
            mode: EnqueueMode::Interrupt,
        }
    }

    #[tokio::test]
    async fn channel_speech_does_not_wait_when_full() {
        let (speech, mut rx) = ChannelSpeech::channel(1);
        speech.speak(utterance("first")).unwrap();
        let dropped = utterance("second");
        let dropped_id = dropped.frame_id;

        match speech.speak(dropped) {
            Err(SpeechError::QueueFull(id)) => assert_eq!(id, dropped_id),
            other => panic!("expected a full queue, got {:?}", other),
        }
        assert_eq!(rx.recv().await.unwrap().text, "first");
    }

    #[test]
    fn channel_speech_reports_closed_receiver() {
        let (speech, rx) = ChannelSpeech::channel(4);
        drop(rx);
        assert!(matches!(speech.speak(utterance("hello")), Err(SpeechError::Closed)));
    }
}
