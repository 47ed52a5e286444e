use crate::common::Frame;
use crate::config::{ArbitrationMode, EngineConfig};
use crate::error::ConfigError;
use crate::pipeline::context::{ComposedState, FrameContext, IngestedState};
use crate::pipeline::domain::FrameInput;
use crate::pipeline::services::{
    ConfirmationTracker, CooldownRegistry, EngineSnapshot, FrameAggregator, MessageComposer,
    PriorityArbiter, TextReader, Utterance,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Detection-to-speech arbitration.
///
/// Owns every piece of cross-frame state (confirmation counters, cooldown
/// timestamps, previous winner, last text read). Only its own step function
/// touches that state, and it performs no I/O.
pub struct ArbitrationEngine {
    config: Arc<EngineConfig>,
    aggregator: FrameAggregator,
    confirmations: ConfirmationTracker,
    cooldowns: CooldownRegistry,
    arbiter: PriorityArbiter,
    composer: MessageComposer,
    reader: TextReader,
}

impl ArbitrationEngine {
    /// Refuses to build from an invalid configuration.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let config = Arc::new(config);

        Ok(Self {
            aggregator: FrameAggregator::new(config.clone()),
            confirmations: ConfirmationTracker::new(config.required_consecutive_frames),
            cooldowns: CooldownRegistry::new(config.cooldown()),
            arbiter: PriorityArbiter::new(config.clone()),
            composer: MessageComposer::new(config.clone()),
            reader: TextReader::new(config.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one frame through aggregation, confirmation, arbitration and phrasing.
    pub fn process(&mut self, context: FrameContext<IngestedState>) -> FrameContext<ComposedState> {
        let now = context.now();
        let frame_id = context.frame().frame_id();

        if context.input().is_empty() {
            debug!(
                "Frame {} ({}): no observations",
                context.frame().sequence(),
                context.state_name()
            );
        }

        let reading = match (self.config.arbitration_mode, context.input()) {
            (ArbitrationMode::TextReading, FrameInput::Lines(lines)) => self.reader.read(lines, now),
            (_, FrameInput::Lines(lines)) => {
                debug!("Ignoring {} text lines outside reading mode", lines.len());
                None
            }
            _ => None,
        };

        let candidates = self.aggregator.aggregate(context.input());
        let context = context.into_aggregated(candidates);

        self.confirmations
            .observe(context.candidates().iter().map(|c| &c.key), now);

        let winners = self.arbiter.arbitrate(
            context.candidates(),
            &mut self.confirmations,
            &mut self.cooldowns,
            now,
        );
        let context = context.into_arbitrated(winners);

        let utterance = self
            .composer
            .compose(context.winners())
            .or(reading)
            .map(|text| Utterance {
                frame_id,
                text,
                mode: self.config.enqueue_mode,
            });

        match &utterance {
            Some(utterance) => info!(
                "Frame {} selected {} winner(s): {}",
                context.frame().sequence(),
                context.winners().len(),
                utterance.text
            ),
            None => debug!("Frame {}: nothing to say", context.frame().sequence()),
        }

        context.into_composed(utterance)
    }

    /// Convenience wrapper for callers that only need the utterance.
    pub fn process_input(&mut self, frame: Frame, input: FrameInput) -> Option<Utterance> {
        self.process(FrameContext::new(frame, input)).into_utterance()
    }

    pub fn snapshot(&self, context: &FrameContext<ComposedState>) -> EngineSnapshot {
        EngineSnapshot {
            frame_id: Some(context.frame().frame_id()),
            sequence: context.frame().sequence(),
            candidate_regions: context.candidates().iter().map(|c| c.region).collect(),
            spoken: context
                .winners()
                .iter()
                .map(|w| w.candidate.key.clone())
                .collect(),
            tracked_keys: self.confirmations.tracked_keys(),
        }
    }

    /// Forget all confirmation, cooldown and previous-winner state.
    pub fn reset(&mut self) {
        self.confirmations.reset();
        self.cooldowns.reset();
        self.arbiter.reset();
        self.reader.reset();
        info!("Arbitration state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::{Detection, RecognizedText, Region, TextMatch};
    use crate::pipeline::services::EnqueueMode;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn obstacle_engine(required_frames: u32) -> ArbitrationEngine {
        ArbitrationEngine::new(
            EngineConfig::obstacle_narration()
                .with_required_frames(required_frames)
                .with_confidence_threshold(0.35)
                .with_region_of_interest(None, None)
                .with_repeat_winner_threshold(1),
        )
        .unwrap()
    }

    fn person_at(cx: f32) -> FrameInput {
        FrameInput::Detections(vec![Detection::new(
            "person",
            0.5,
            Region::new(cx, 0.5, 0.2, 0.2),
        )])
    }

    fn run(engine: &mut ArbitrationEngine, sequence: u64, ms: i64, input: FrameInput) -> Option<String> {
        engine
            .process_input(Frame::empty(sequence, at(ms)), input)
            .map(|u| u.text)
    }

    #[test]
    fn invalid_configuration_refuses_to_start() {
        assert!(ArbitrationEngine::new(EngineConfig::default().with_cooldown_ms(0)).is_err());
        assert!(ArbitrationEngine::new(EngineConfig::default().with_required_frames(0)).is_err());
    }

    #[test]
    fn person_far_left_after_three_frames() {
        let mut engine = obstacle_engine(3);

        assert_eq!(run(&mut engine, 1, 0, person_at(0.1)), None);
        assert_eq!(run(&mut engine, 2, 100, person_at(0.1)), None);
        let text = run(&mut engine, 3, 200, person_at(0.1)).expect("alert on third frame");
        assert!(text.contains("person"));
        assert!(text.contains("far left"));
    }

    #[test]
    fn gap_requires_fresh_confirmation() {
        let mut engine = obstacle_engine(3);

        assert_eq!(run(&mut engine, 1, 0, person_at(0.5)), None);
        assert_eq!(run(&mut engine, 2, 100, person_at(0.5)), None);
        assert_eq!(run(&mut engine, 3, 200, FrameInput::empty()), None);
        assert_eq!(run(&mut engine, 4, 300, person_at(0.5)), None);
        assert_eq!(run(&mut engine, 5, 400, person_at(0.5)), None);
        assert!(run(&mut engine, 6, 500, person_at(0.5)).is_some());
    }

    #[test]
    fn cooldown_holds_until_duration_elapses() {
        let mut engine = obstacle_engine(1);
        let cooldown = engine.config().cooldown().num_milliseconds();

        assert!(run(&mut engine, 1, 0, person_at(0.5)).is_some());
        let mut sequence = 2;
        let mut ms = 100;
        while ms < cooldown {
            assert_eq!(run(&mut engine, sequence, ms, person_at(0.5)), None, "spoke at {ms}ms");
            sequence += 1;
            ms += 100;
        }
        assert!(run(&mut engine, sequence, cooldown, person_at(0.5)).is_some());
    }

    #[test]
    fn higher_priority_candidate_wins_the_cycle() {
        let mut engine = obstacle_engine(1);
        let input = FrameInput::Detections(vec![
            Detection::new("chair", 0.9, Region::new(0.5, 0.5, 0.3, 0.3)),
            Detection::new("car", 0.9, Region::new(0.7, 0.5, 0.3, 0.3)),
        ]);
        let text = run(&mut engine, 1, 0, input).unwrap();
        assert!(text.starts_with("Clear car right"));
    }

    #[test]
    fn unimportant_category_is_never_spoken() {
        let mut engine = obstacle_engine(1);
        for sequence in 0..5 {
            let input = FrameInput::Detections(vec![Detection::new(
                "toaster",
                0.99,
                Region::new(0.5, 0.5, 0.3, 0.3),
            )]);
            assert_eq!(run(&mut engine, sequence, sequence as i64 * 100, input), None);
        }
    }

    #[test]
    fn static_scene_is_held_back_once_then_repeats() {
        let config = EngineConfig::obstacle_narration()
            .with_required_frames(1)
            .with_cooldown_ms(1)
            .with_region_of_interest(None, None)
            .with_repeat_winner_threshold(3);
        let mut engine = ArbitrationEngine::new(config).unwrap();

        let spoken: Vec<bool> = (1..=8)
            .map(|sequence| {
                run(&mut engine, sequence, sequence as i64 * 100, person_at(0.5)).is_some()
            })
            .collect();
        assert_eq!(spoken, vec![true, false, true, true, true, true, true, true]);
    }

    #[test]
    fn sugar_and_alcohol_reported_together() {
        let config = EngineConfig::ingredient_scan().with_required_frames(1);
        let mut engine = ArbitrationEngine::new(config).unwrap();
        let region = Region::new(0.5, 0.5, 0.6, 0.1);
        let input = FrameInput::Matches(vec![
            TextMatch {
                name: "Sugar".to_string(),
                annotation: Some("raises blood glucose".to_string()),
                region,
            },
            TextMatch {
                name: "Alcohol".to_string(),
                annotation: Some("avoid when driving".to_string()),
                region,
            },
        ]);

        let utterance = engine
            .process_input(Frame::empty(1, at(0)), input)
            .expect("both matches are eligible");
        assert_eq!(utterance.mode, EnqueueMode::Append);
        let sugar = utterance.text.find("Sugar: raises blood glucose").unwrap();
        let alcohol = utterance.text.find("Alcohol: avoid when driving").unwrap();
        assert!(sugar < alcohol);
    }

    #[test]
    fn printed_text_is_read_once_per_page() {
        let mut engine = ArbitrationEngine::new(EngineConfig::text_reading()).unwrap();
        let page = |text: &str| {
            FrameInput::Lines(vec![RecognizedText {
                text: text.to_string(),
                region: Region::new(0.5, 0.5, 0.9, 0.2),
            }])
        };

        let utterance = engine
            .process_input(Frame::empty(1, at(0)), page("Platform 9 departures"))
            .expect("new page is read");
        assert_eq!(utterance.text, "Platform 9 departures");
        assert_eq!(utterance.mode, EnqueueMode::Append);

        assert_eq!(run(&mut engine, 2, 5_000, page("Platform 9 departures")), None);
        assert_eq!(run(&mut engine, 3, 5_100, page("Ok")), None);
        assert_eq!(
            run(&mut engine, 4, 6_000, page("Gate closes ten minutes before")).as_deref(),
            Some("Gate closes ten minutes before")
        );
    }

    #[test]
    fn text_lines_outside_reading_mode_are_ignored() {
        let mut engine = obstacle_engine(1);
        let input = FrameInput::Lines(vec![RecognizedText {
            text: "Danger high voltage".to_string(),
            region: Region::new(0.5, 0.5, 0.5, 0.1),
        }]);
        assert_eq!(run(&mut engine, 1, 0, input), None);
    }

    #[test]
    fn reset_forgets_cooldowns_and_confirmations() {
        let mut engine = obstacle_engine(2);
        assert_eq!(run(&mut engine, 1, 0, person_at(0.5)), None);
        assert!(run(&mut engine, 2, 100, person_at(0.5)).is_some());

        engine.reset();
        assert_eq!(run(&mut engine, 3, 200, person_at(0.5)), None);
        assert!(run(&mut engine, 4, 300, person_at(0.5)).is_some());
    }

    #[test]
    fn snapshot_reflects_the_processed_frame() {
        let mut engine = ArbitrationEngine::new(
            EngineConfig::obstacle_narration()
                .with_required_frames(1)
                .with_region_of_interest(None, None)
                .with_arbitration_mode(ArbitrationMode::SingleWinner),
        )
        .unwrap();
        let context = engine.process(FrameContext::new(Frame::empty(7, at(0)), person_at(0.5)));
        let snapshot = engine.snapshot(&context);

        assert_eq!(snapshot.sequence, 7);
        assert_eq!(snapshot.candidate_regions.len(), 1);
        assert_eq!(snapshot.spoken.len(), 1);
        assert_eq!(snapshot.tracked_keys, 1);
        assert_eq!(context.metrics().candidate_count(), 1);
        assert_eq!(context.metrics().winner_count(), 1);
    }

    #[test]
    fn timestamps_come_from_the_frame() {
        let mut engine = obstacle_engine(1);
        assert!(run(&mut engine, 1, 0, person_at(0.5)).is_some());
        let just_before = engine.config().cooldown() - TimeDelta::milliseconds(1);
        assert_eq!(
            run(&mut engine, 2, just_before.num_milliseconds(), person_at(0.5)),
            None
        );
    }
}
