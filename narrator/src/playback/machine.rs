//! Narration state machine.
//!
//! `NarrationMachine` holds no resources. Each [`Event`] moves it to a new
//! state and yields the [`Effect`]s the runner must perform. Results of
//! asynchronous work come back as events tagged with the session
//! generation and chunk index that requested them; anything tagged for a
//! session that is no longer live is dropped.

use crate::error::NarrationError;
use crate::text::TextChunk;
use log::{debug, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Generating,
    Playing,
    Paused,
}

/// Observable narration state, published on every transition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NarrationSnapshot {
    pub phase: Phase,
    pub progress_percent: u8,
    pub error: Option<NarrationError>,
    /// Page being narrated, while a session is live
    pub page_number: Option<u32>,
    /// Chunk currently fetched or played
    pub chunk_index: Option<usize>,
    pub total_chunks: usize,
}

impl NarrationSnapshot {
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_generating(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn is_playing(&self) -> bool {
        self.phase == Phase::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }
}

/// Inputs to the machine: user requests and asynchronous results.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Play,
    Pause,
    Cleanup,
    DismissError,
    ChunksResolved {
        generation: u64,
        chunks: Vec<TextChunk>,
    },
    AudioReady {
        generation: u64,
        index: usize,
    },
    AudioEnded {
        generation: u64,
        index: usize,
    },
    Failed {
        generation: u64,
        index: usize,
        message: String,
    },
}

/// Side effects the runner performs on the machine's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Fetch chunks for the current page and answer with `ChunksResolved`
    ResolveChunks { generation: u64 },
    /// Request audio for one chunk and answer with `AudioReady` or `Failed`
    Synthesize { generation: u64, chunk: TextChunk },
    /// Construct and start the audio for the chunk that just arrived
    StartAudio {
        generation: u64,
        index: usize,
        page_number: u32,
    },
    PauseAudio { generation: u64, index: usize },
    ResumeAudio { generation: u64, index: usize },
    /// Stop and free the live audio resource, if any
    ReleaseAudio,
    /// Abort the in-flight page lookup and synthesis request, if any
    CancelSynthesis,
}

#[derive(Debug, Clone)]
struct Session {
    generation: u64,
    chunks: Vec<TextChunk>,
    current_index: usize,
}

impl Session {
    fn current_chunk(&self) -> Option<&TextChunk> {
        self.chunks.get(self.current_index)
    }
}

#[derive(Debug, Default)]
pub struct NarrationMachine {
    phase: Phase,
    session: Option<Session>,
    /// Generation of the chunk lookup started by the last `Play` from idle
    resolving: Option<u64>,
    progress_percent: u8,
    error: Option<NarrationError>,
    next_generation: u64,
}

/// `round(100 * index / total)`
fn progress_for(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((index as f64 * 100.0) / total as f64).round().min(100.0) as u8
}

impl NarrationMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error(&self) -> Option<&NarrationError> {
        self.error.as_ref()
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        NarrationSnapshot {
            phase: self.phase,
            progress_percent: self.progress_percent,
            error: self.error.clone(),
            page_number: self
                .session
                .as_ref()
                .and_then(|s| s.chunks.first())
                .map(|c| c.page_number),
            chunk_index: self.session.as_ref().map(|s| s.current_index),
            total_chunks: self.session.as_ref().map_or(0, |s| s.chunks.len()),
        }
    }

    /// Apply one event, returning the effects to perform in order.
    pub fn apply(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Play => self.on_play(),
            Event::Pause => self.on_pause(),
            Event::Cleanup => {
                self.reset();
                self.error = None;
                vec![Effect::CancelSynthesis, Effect::ReleaseAudio]
            }
            Event::DismissError => {
                self.error = None;
                Vec::new()
            }
            Event::ChunksResolved { generation, chunks } => {
                self.on_chunks_resolved(generation, chunks)
            }
            Event::AudioReady { generation, index } => self.on_audio_ready(generation, index),
            Event::AudioEnded { generation, index } => self.on_audio_ended(generation, index),
            Event::Failed {
                generation,
                index,
                message,
            } => self.on_failed(generation, index, message),
        }
    }

    fn on_play(&mut self) -> Vec<Effect> {
        match self.phase {
            Phase::Playing => self.on_pause(),
            Phase::Paused => match self.live_position() {
                Some((generation, index)) => {
                    self.phase = Phase::Playing;
                    vec![Effect::ResumeAudio { generation, index }]
                }
                None => Vec::new(),
            },
            Phase::Generating => {
                debug!("Play ignored while audio is being generated");
                Vec::new()
            }
            Phase::Idle => {
                let generation = self.next_generation;
                self.next_generation += 1;
                self.error = None;
                self.resolving = Some(generation);
                self.progress_percent = 0;
                self.phase = Phase::Generating;
                vec![Effect::ResolveChunks { generation }]
            }
        }
    }

    fn on_pause(&mut self) -> Vec<Effect> {
        match (self.phase, self.live_position()) {
            (Phase::Playing, Some((generation, index))) => {
                self.phase = Phase::Paused;
                vec![Effect::PauseAudio { generation, index }]
            }
            _ => Vec::new(),
        }
    }

    fn on_chunks_resolved(&mut self, generation: u64, chunks: Vec<TextChunk>) -> Vec<Effect> {
        if self.resolving != Some(generation) {
            debug!("Dropping chunks for stale generation {}", generation);
            return Vec::new();
        }
        self.resolving = None;

        if chunks.is_empty() {
            self.phase = Phase::Idle;
            self.progress_percent = 0;
            self.error = Some(NarrationError::NoTextAvailable);
            return Vec::new();
        }

        info!(
            "Narrating page {} in {} chunk(s)",
            chunks[0].page_number,
            chunks.len()
        );
        self.session = Some(Session {
            generation,
            chunks,
            current_index: 0,
        });
        self.request_current()
    }

    fn on_audio_ready(&mut self, generation: u64, index: usize) -> Vec<Effect> {
        if self.phase != Phase::Generating || !self.is_live(generation, index) {
            debug!("Dropping stale audio for chunk {} (generation {})", index, generation);
            return Vec::new();
        }

        let page_number = self
            .session
            .as_ref()
            .and_then(Session::current_chunk)
            .map_or(0, |c| c.page_number);

        self.phase = Phase::Playing;
        vec![
            Effect::ReleaseAudio,
            Effect::StartAudio {
                generation,
                index,
                page_number,
            },
        ]
    }

    fn on_audio_ended(&mut self, generation: u64, index: usize) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Playing | Phase::Paused) || !self.is_live(generation, index)
        {
            return Vec::new();
        }

        let mut effects = vec![Effect::ReleaseAudio];
        let finished = match self.session.as_mut() {
            Some(session) => {
                session.current_index += 1;
                session.current_index >= session.chunks.len()
            }
            None => true,
        };

        if finished {
            info!("Narration finished");
            self.reset();
        } else {
            effects.extend(self.request_current());
        }
        effects
    }

    fn on_failed(&mut self, generation: u64, index: usize, message: String) -> Vec<Effect> {
        if !self.is_live(generation, index) {
            debug!("Ignoring failure from stale generation {}: {}", generation, message);
            return Vec::new();
        }

        self.reset();
        self.error = Some(NarrationError::PlaybackFailed(message));
        vec![Effect::CancelSynthesis, Effect::ReleaseAudio]
    }

    /// Enter `Generating` and ask for the chunk at the current index.
    fn request_current(&mut self) -> Vec<Effect> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        let Some(chunk) = session.current_chunk() else {
            return Vec::new();
        };

        self.phase = Phase::Generating;
        self.progress_percent = progress_for(session.current_index, session.chunks.len());
        vec![Effect::Synthesize {
            generation: session.generation,
            chunk: chunk.clone(),
        }]
    }

    fn live_position(&self) -> Option<(u64, usize)> {
        self.session
            .as_ref()
            .filter(|s| s.current_chunk().is_some())
            .map(|s| (s.generation, s.current_index))
    }

    fn is_live(&self, generation: u64, index: usize) -> bool {
        self.live_position() == Some((generation, index))
    }

    /// Drop the session and return to idle. The error is left alone.
    fn reset(&mut self) {
        self.session = None;
        self.resolving = None;
        self.progress_percent = 0;
        self.phase = Phase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::segment;

    fn three_chunks() -> Vec<TextChunk> {
        segment("Chunk zero. Chunk one. Chunk two.", 1, 12)
    }

    /// Drive a machine from idle to the point where chunk 0 is requested.
    fn started(chunks: Vec<TextChunk>) -> (NarrationMachine, u64) {
        let mut machine = NarrationMachine::new();
        let effects = machine.apply(Event::Play);
        let generation = match effects.as_slice() {
            [Effect::ResolveChunks { generation }] => *generation,
            other => panic!("unexpected effects: {other:?}"),
        };
        machine.apply(Event::ChunksResolved { generation, chunks });
        (machine, generation)
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(progress_for(0, 3), 0);
        assert_eq!(progress_for(1, 3), 33);
        assert_eq!(progress_for(2, 3), 67);
        assert_eq!(progress_for(1, 8), 13);
        assert_eq!(progress_for(0, 0), 0);
    }

    #[test]
    fn test_initial_snapshot() {
        let snapshot = NarrationMachine::new().snapshot();
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.progress_percent, 0);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.total_chunks, 0);
    }

    #[test]
    fn test_play_from_idle_resolves_chunks() {
        let mut machine = NarrationMachine::new();
        let effects = machine.apply(Event::Play);
        assert_eq!(effects, vec![Effect::ResolveChunks { generation: 0 }]);
        assert_eq!(machine.phase(), Phase::Generating);
    }

    #[test]
    fn test_resolved_chunks_request_first_chunk() {
        let chunks = three_chunks();
        assert_eq!(chunks.len(), 3);

        let mut machine = NarrationMachine::new();
        machine.apply(Event::Play);
        let effects = machine.apply(Event::ChunksResolved {
            generation: 0,
            chunks: chunks.clone(),
        });

        assert_eq!(
            effects,
            vec![Effect::Synthesize {
                generation: 0,
                chunk: chunks[0].clone()
            }]
        );
        let snapshot = machine.snapshot();
        assert!(snapshot.is_generating());
        assert_eq!(snapshot.total_chunks, 3);
        assert_eq!(snapshot.chunk_index, Some(0));
        assert_eq!(snapshot.page_number, Some(1));
    }

    #[test]
    fn test_empty_chunks_is_no_text_error() {
        let mut machine = NarrationMachine::new();
        machine.apply(Event::Play);
        let effects = machine.apply(Event::ChunksResolved {
            generation: 0,
            chunks: Vec::new(),
        });

        assert!(effects.is_empty());
        assert_eq!(machine.phase(), Phase::Idle);
        assert_eq!(machine.error(), Some(&NarrationError::NoTextAvailable));
    }

    #[test]
    fn test_full_sequence_in_order() {
        let chunks = three_chunks();
        let (mut machine, generation) = started(chunks.clone());

        for index in 0..3 {
            let effects = machine.apply(Event::AudioReady { generation, index });
            assert_eq!(
                effects,
                vec![
                    Effect::ReleaseAudio,
                    Effect::StartAudio {
                        generation,
                        index,
                        page_number: 1
                    }
                ]
            );
            assert!(machine.snapshot().is_playing());

            let effects = machine.apply(Event::AudioEnded { generation, index });
            if index < 2 {
                assert_eq!(
                    effects,
                    vec![
                        Effect::ReleaseAudio,
                        Effect::Synthesize {
                            generation,
                            chunk: chunks[index + 1].clone()
                        }
                    ]
                );
                assert_eq!(
                    machine.snapshot().progress_percent,
                    progress_for(index + 1, 3)
                );
            } else {
                assert_eq!(effects, vec![Effect::ReleaseAudio]);
            }
        }

        let snapshot = machine.snapshot();
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.progress_percent, 0);
        assert_eq!(snapshot.total_chunks, 0);
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_play_toggles_pause_and_resume() {
        let (mut machine, generation) = started(three_chunks());
        machine.apply(Event::AudioReady {
            generation,
            index: 0,
        });

        assert_eq!(
            machine.apply(Event::Play),
            vec![Effect::PauseAudio {
                generation,
                index: 0
            }]
        );
        assert!(machine.snapshot().is_paused());
        assert_eq!(machine.snapshot().chunk_index, Some(0));

        assert_eq!(
            machine.apply(Event::Play),
            vec![Effect::ResumeAudio {
                generation,
                index: 0
            }]
        );
        assert!(machine.snapshot().is_playing());
    }

    #[test]
    fn test_pause_only_applies_while_playing() {
        let mut machine = NarrationMachine::new();
        assert!(machine.apply(Event::Pause).is_empty());

        machine.apply(Event::Play);
        assert!(machine.apply(Event::Pause).is_empty());
        assert_eq!(machine.phase(), Phase::Generating);
    }

    #[test]
    fn test_play_ignored_while_generating() {
        let (mut machine, _) = started(three_chunks());
        assert!(machine.apply(Event::Play).is_empty());
        assert!(machine.snapshot().is_generating());
    }

    #[test]
    fn test_cleanup_discards_session() {
        let (mut machine, generation) = started(three_chunks());
        machine.apply(Event::AudioReady {
            generation,
            index: 0,
        });
        machine.apply(Event::Pause);

        let effects = machine.apply(Event::Cleanup);
        assert_eq!(effects, vec![Effect::CancelSynthesis, Effect::ReleaseAudio]);

        let snapshot = machine.snapshot();
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.total_chunks, 0);
        assert_eq!(snapshot.chunk_index, None);
        assert_eq!(snapshot.progress_percent, 0);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut machine = NarrationMachine::new();
        machine.apply(Event::Cleanup);
        machine.apply(Event::Cleanup);
        assert_eq!(machine.snapshot(), NarrationSnapshot::default());
    }

    #[test]
    fn test_stale_audio_after_cleanup_is_dropped() {
        let (mut machine, generation) = started(three_chunks());
        machine.apply(Event::Cleanup);

        assert!(
            machine
                .apply(Event::AudioReady {
                    generation,
                    index: 0
                })
                .is_empty()
        );
        assert!(machine.snapshot().is_idle());
    }

    #[test]
    fn test_stale_audio_from_previous_session_is_dropped() {
        let (mut machine, old) = started(three_chunks());
        machine.apply(Event::Cleanup);
        machine.apply(Event::Play);
        let new = old + 1;
        machine.apply(Event::ChunksResolved {
            generation: new,
            chunks: three_chunks(),
        });

        assert!(
            machine
                .apply(Event::AudioReady {
                    generation: old,
                    index: 0
                })
                .is_empty()
        );
        assert!(machine.snapshot().is_generating());
        assert!(
            !machine
                .apply(Event::AudioReady {
                    generation: new,
                    index: 0
                })
                .is_empty()
        );
    }

    #[test]
    fn test_stale_chunks_after_cleanup_are_dropped() {
        let mut machine = NarrationMachine::new();
        machine.apply(Event::Play);
        machine.apply(Event::Cleanup);

        let effects = machine.apply(Event::ChunksResolved {
            generation: 0,
            chunks: three_chunks(),
        });
        assert!(effects.is_empty());
        assert_eq!(machine.snapshot().total_chunks, 0);
    }

    #[test]
    fn test_failure_discards_session_and_sets_error() {
        let (mut machine, generation) = started(three_chunks());
        machine.apply(Event::AudioReady {
            generation,
            index: 0,
        });
        machine.apply(Event::AudioEnded {
            generation,
            index: 0,
        });

        let effects = machine.apply(Event::Failed {
            generation,
            index: 1,
            message: "HTTP 500".into(),
        });
        assert_eq!(effects, vec![Effect::CancelSynthesis, Effect::ReleaseAudio]);

        let snapshot = machine.snapshot();
        assert!(snapshot.is_idle());
        assert_eq!(snapshot.total_chunks, 0);
        assert_eq!(
            snapshot.error,
            Some(NarrationError::PlaybackFailed("HTTP 500".into()))
        );
    }

    #[test]
    fn test_play_after_failure_restarts() {
        let (mut machine, generation) = started(three_chunks());
        machine.apply(Event::Failed {
            generation,
            index: 0,
            message: "boom".into(),
        });

        let effects = machine.apply(Event::Play);
        assert_eq!(
            effects,
            vec![Effect::ResolveChunks {
                generation: generation + 1
            }]
        );
        assert!(machine.error().is_none());
    }

    #[test]
    fn test_failure_for_wrong_chunk_is_ignored() {
        let (mut machine, generation) = started(three_chunks());
        let effects = machine.apply(Event::Failed {
            generation,
            index: 2,
            message: "late".into(),
        });
        assert!(effects.is_empty());
        assert!(machine.snapshot().is_generating());
    }

    #[test]
    fn test_dismiss_error() {
        let mut machine = NarrationMachine::new();
        machine.apply(Event::Play);
        machine.apply(Event::ChunksResolved {
            generation: 0,
            chunks: Vec::new(),
        });
        assert!(machine.error().is_some());

        assert!(machine.apply(Event::DismissError).is_empty());
        assert!(machine.error().is_none());
        assert_eq!(machine.phase(), Phase::Idle);
    }

    #[test]
    fn test_cleanup_clears_error() {
        let mut machine = NarrationMachine::new();
        machine.apply(Event::Play);
        machine.apply(Event::ChunksResolved {
            generation: 0,
            chunks: Vec::new(),
        });
        machine.apply(Event::Cleanup);
        assert_eq!(machine.snapshot(), NarrationSnapshot::default());
    }

    #[test]
    fn test_audio_end_while_paused_advances() {
        let (mut machine, generation) = started(three_chunks());
        machine.apply(Event::AudioReady {
            generation,
            index: 0,
        });
        machine.apply(Event::Pause);
        let effects = machine.apply(Event::AudioEnded {
            generation,
            index: 0,
        });
        assert!(matches!(effects.last(), Some(Effect::Synthesize { .. })));
        assert!(machine.snapshot().is_generating());
    }
}
