//! Narration controller.
//!
//! A single tokio task owns the state machine, the page extractor, the
//! in-flight synthesis request and the live audio clip. Control calls and
//! asynchronous results reach it as messages and are handled one at a time.

use super::machine::{Effect, Event, NarrationMachine, NarrationSnapshot};
use super::sink::{ActiveAudio, AudioSink, LoadedAudio};
use crate::config::NarratorConfig;
use crate::error::SinkError;
use crate::extract::{PageExtractor, PageSource, PageText};
use crate::text::TextChunk;
use log::{debug, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tts_client::{SpeechSynthesizer, SynthesisError, SynthesisRequest, SynthesizedAudio};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Requests from the owning handle.
#[derive(Debug)]
enum Command {
    Play,
    Pause,
    Cleanup,
    DismissError,
    Shutdown,
}

/// Results posted back by tasks the controller spawned.
#[derive(Debug)]
enum Message {
    PageRead {
        generation: u64,
        page: std::result::Result<PageText, String>,
    },
    Synthesized {
        generation: u64,
        index: usize,
        result: std::result::Result<SynthesizedAudio, String>,
    },
    AudioEnded {
        generation: u64,
        index: usize,
        completed: bool,
    },
}

/// Handle to a running narration controller.
///
/// Control calls return immediately; watch [`Narrator::subscribe`] for the
/// resulting state.
pub struct Narrator {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<NarrationSnapshot>,
    task: JoinHandle<()>,
}

/// Collects the controller's collaborators before spawning it.
pub struct NarratorBuilder {
    pages: Arc<dyn PageSource>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    extractor: PageExtractor,
    request_timeout: Duration,
}

impl NarratorBuilder {
    pub fn with_extractor(mut self, extractor: PageExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Chunk size, cache settings and timeout from the config.
    pub fn with_config(self, config: &NarratorConfig) -> Self {
        self.with_extractor(PageExtractor::from_config(config))
            .with_request_timeout(config.request_timeout())
    }

    /// Start the controller task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> Narrator {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let machine = NarrationMachine::new();
        let (state_tx, state_rx) = watch::channel(machine.snapshot());

        let runner = Runner {
            machine,
            extractor: self.extractor,
            pages: self.pages,
            synthesizer: self.synthesizer,
            sink: self.sink,
            request_timeout: self.request_timeout,
            messages: message_tx,
            state: state_tx,
            page_lookup: None,
            synthesis: None,
            pending: None,
            active: None,
        };
        let task = tokio::spawn(runner.run(command_rx, message_rx));

        Narrator {
            commands: command_tx,
            state: state_rx,
            task,
        }
    }
}

impl Narrator {
    pub fn builder(
        pages: Arc<dyn PageSource>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn AudioSink>,
    ) -> NarratorBuilder {
        NarratorBuilder {
            pages,
            synthesizer,
            sink,
            extractor: PageExtractor::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Start narrating the current page, or toggle pause/resume.
    pub fn play(&self) {
        self.send(Command::Play);
    }

    pub fn pause(&self) {
        self.send(Command::Pause);
    }

    /// Stop everything and forget the session. Call on page change.
    pub fn cleanup(&self) {
        self.send(Command::Cleanup);
    }

    pub fn dismiss_error(&self) {
        self.send(Command::DismissError);
    }

    pub fn snapshot(&self) -> NarrationSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NarrationSnapshot> {
        self.state.clone()
    }

    /// Clean up, clear the chunk cache and wait for the controller to exit.
    pub async fn shutdown(self) {
        self.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            warn!("Narration controller ended abnormally: {}", e);
        }
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Narration controller is no longer running");
        }
    }
}

/// Audio that arrived and waits for the machine to accept it.
struct PendingAudio {
    generation: u64,
    index: usize,
    audio: SynthesizedAudio,
}

struct Runner {
    machine: NarrationMachine,
    extractor: PageExtractor,
    pages: Arc<dyn PageSource>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    sink: Arc<dyn AudioSink>,
    request_timeout: Duration,
    messages: mpsc::UnboundedSender<Message>,
    state: watch::Sender<NarrationSnapshot>,
    page_lookup: Option<JoinHandle<()>>,
    synthesis: Option<JoinHandle<()>>,
    pending: Option<PendingAudio>,
    active: Option<ActiveAudio>,
}

impl Runner {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut messages: mpsc::UnboundedReceiver<Message>,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Play) => Event::Play,
                    Some(Command::Pause) => Event::Pause,
                    Some(Command::Cleanup) => Event::Cleanup,
                    Some(Command::DismissError) => Event::DismissError,
                    Some(Command::Shutdown) | None => break,
                },
                Some(message) = messages.recv() => self.translate(message),
            };
            self.handle(event).await;
        }

        self.handle(Event::Cleanup).await;
        self.extractor.clear_cache();
        debug!("Narration controller stopped");
    }

    fn translate(&mut self, message: Message) -> Event {
        match message {
            Message::PageRead { generation, page } => {
                let chunks = match page {
                    Ok(page) => self.extractor.extract(&page),
                    Err(e) => {
                        warn!("Failed to read the current page: {}", e);
                        Vec::new()
                    }
                };
                Event::ChunksResolved { generation, chunks }
            }
            Message::Synthesized {
                generation,
                index,
                result: Ok(audio),
            } => {
                self.pending = Some(PendingAudio {
                    generation,
                    index,
                    audio,
                });
                Event::AudioReady { generation, index }
            }
            Message::Synthesized {
                generation,
                index,
                result: Err(message),
            } => Event::Failed {
                generation,
                index,
                message,
            },
            Message::AudioEnded {
                generation,
                index,
                completed: true,
            } => Event::AudioEnded { generation, index },
            Message::AudioEnded {
                generation,
                index,
                completed: false,
            } => Event::Failed {
                generation,
                index,
                message: "playback ended unexpectedly".to_string(),
            },
        }
    }

    /// Apply an event and everything that follows from its effects.
    async fn handle(&mut self, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            debug!("Narration event: {:?}", event);
            for effect in self.machine.apply(event) {
                if let Some(next) = self.perform(effect).await {
                    queue.push_back(next);
                }
            }
            self.state.send_replace(self.machine.snapshot());
        }
        // Audio the machine did not start belongs to a dead session
        self.pending = None;
    }

    async fn perform(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::ResolveChunks { generation } => {
                self.start_page_lookup(generation);
                None
            }
            Effect::Synthesize { generation, chunk } => {
                self.start_synthesis(generation, chunk);
                None
            }
            Effect::StartAudio {
                generation,
                index,
                page_number,
            } => self.start_audio(generation, index, page_number).err(),
            Effect::PauseAudio { generation, index } => {
                self.control(generation, index, ActiveAudio::pause)
            }
            Effect::ResumeAudio { generation, index } => {
                self.control(generation, index, ActiveAudio::resume)
            }
            Effect::ReleaseAudio => {
                self.active = None;
                None
            }
            Effect::CancelSynthesis => {
                for task in [self.page_lookup.take(), self.synthesis.take()]
                    .into_iter()
                    .flatten()
                {
                    task.abort();
                }
                None
            }
        }
    }

    /// Read the current page off the actor loop so a slow supplier never
    /// holds up cleanup or shutdown.
    fn start_page_lookup(&mut self, generation: u64) {
        if let Some(previous) = self.page_lookup.take() {
            previous.abort();
        }

        let pages = Arc::clone(&self.pages);
        let messages = self.messages.clone();
        self.page_lookup = Some(tokio::spawn(async move {
            let page = pages.current_page().await.map_err(|e| format!("{:#}", e));
            let _ = messages.send(Message::PageRead { generation, page });
        }));
    }

    fn start_synthesis(&mut self, generation: u64, chunk: TextChunk) {
        if let Some(previous) = self.synthesis.take() {
            previous.abort();
        }

        let synthesizer = Arc::clone(&self.synthesizer);
        let messages = self.messages.clone();
        let timeout = self.request_timeout;
        let index = chunk.index;
        debug!(
            "Requesting audio for chunk {} ({} chars)",
            index,
            chunk.char_len()
        );

        self.synthesis = Some(tokio::spawn(async move {
            let request = SynthesisRequest::new(chunk.text);
            let result = match tokio::time::timeout(timeout, synthesizer.synthesize(request)).await
            {
                Ok(Ok(audio)) => Ok(audio),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(SynthesisError::Timeout {
                    seconds: timeout.as_secs(),
                }
                .to_string()),
            };
            let _ = messages.send(Message::Synthesized {
                generation,
                index,
                result,
            });
        }));
    }

    /// Load and start the pending clip, watching for its end.
    fn start_audio(&mut self, generation: u64, index: usize, page_number: u32) -> Result<(), Event> {
        let failed = |message: String| Event::Failed {
            generation,
            index,
            message,
        };

        let audio = match self.pending.take() {
            Some(p) if p.generation == generation && p.index == index => p.audio,
            _ => return Err(failed("audio is missing".to_string())),
        };

        let label = format!("page{:03}_chunk{:04}", page_number, index);
        let LoadedAudio { handle, ended } = self
            .sink
            .load(&audio, &label)
            .map_err(|e| failed(e.to_string()))?;

        let mut active = ActiveAudio::new(handle);
        active.play().map_err(|e| failed(e.to_string()))?;
        self.active = Some(active);

        let messages = self.messages.clone();
        tokio::spawn(async move {
            let completed = ended.await.is_ok();
            let _ = messages.send(Message::AudioEnded {
                generation,
                index,
                completed,
            });
        });
        Ok(())
    }

    fn control(
        &mut self,
        generation: u64,
        index: usize,
        action: fn(&mut ActiveAudio) -> Result<(), SinkError>,
    ) -> Option<Event> {
        let result = match self.active.as_mut() {
            Some(active) => action(active).map_err(|e| e.to_string()),
            None => Err("no audio is loaded".to_string()),
        };
        result.err().map(|message| Event::Failed {
            generation,
            index,
            message,
        })
    }
}
