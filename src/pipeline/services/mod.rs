pub mod aggregator;
pub mod arbiter;
pub mod classifier;
pub mod composer;
pub mod confirmation;
pub mod cooldown;
pub mod overlay;
pub mod speech;
pub mod text_lookup;
pub mod text_reader;

pub use aggregator::FrameAggregator;
pub use arbiter::{PriorityArbiter, ScoredCandidate};
pub use classifier::{
    BoxError, BoxedClassifier, Classifier, ClassifierBuilder, ClassifierService, ScriptedClassifier,
};
pub use composer::MessageComposer;
pub use confirmation::ConfirmationTracker;
pub use cooldown::CooldownRegistry;
pub use overlay::{EngineSnapshot, OverlaySink, RecordingOverlay};
pub use speech::{ChannelSpeech, EnqueueMode, LoggingSpeech, RecordingSpeech, SpeechChannel, Utterance};
pub use text_lookup::{IngredientEntry, IngredientLookup, InMemoryIngredientLookup, resolve_observation};
pub use text_reader::TextReader;
