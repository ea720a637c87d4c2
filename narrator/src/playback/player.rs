//! Audio sink that writes each chunk to disk and hands it to an external player.
//!
//! Pause and resume send `SIGSTOP`/`SIGCONT` straight to the player process.

use super::sink::{AudioHandle, AudioSink, LoadedAudio};
use crate::config::NarratorConfig;
use crate::error::SinkError;
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::sync::oneshot;
use tts_client::SynthesizedAudio;

/// Plays chunks through a command such as `ffplay -nodisp -autoexit`.
///
/// The file path is appended to the command. With an empty command the
/// files are only written and each clip ends as soon as it starts.
pub struct ExternalPlayerSink {
    player: Vec<String>,
    output_dir: PathBuf,
    /// Files in a user-chosen directory are kept after playback
    keep_files: bool,
    _temp_dir: Option<TempDir>,
}

impl ExternalPlayerSink {
    pub fn new(player: Vec<String>, output_dir: Option<PathBuf>) -> Result<Self, SinkError> {
        match output_dir {
            Some(dir) => {
                fs::create_dir_all(&dir)?;
                Ok(Self {
                    player,
                    output_dir: dir,
                    keep_files: true,
                    _temp_dir: None,
                })
            }
            None => {
                let temp_dir = tempfile::Builder::new().prefix("narrator-").tempdir()?;
                Ok(Self {
                    player,
                    output_dir: temp_dir.path().to_path_buf(),
                    keep_files: false,
                    _temp_dir: Some(temp_dir),
                })
            }
        }
    }

    pub fn from_config(config: &NarratorConfig) -> Result<Self, SinkError> {
        Self::new(config.player.clone(), config.output_dir.clone())
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl AudioSink for ExternalPlayerSink {
    fn load(&self, audio: &SynthesizedAudio, label: &str) -> Result<LoadedAudio, SinkError> {
        let path = self
            .output_dir
            .join(format!("{}.{}", label, audio.extension()));
        fs::write(&path, &audio.bytes)?;
        debug!("Wrote {} bytes to {}", audio.bytes.len(), path.display());

        let (ended_tx, ended_rx) = oneshot::channel();
        let handle = PlayerHandle {
            path,
            player: self.player.clone(),
            keep_file: self.keep_files,
            ended: Some(ended_tx),
            kill: None,
            pid: None,
            exited: Arc::new(AtomicBool::new(false)),
            stopped: false,
        };

        Ok(LoadedAudio {
            handle: Box::new(handle),
            ended: ended_rx,
        })
    }
}

struct PlayerHandle {
    path: PathBuf,
    player: Vec<String>,
    keep_file: bool,
    /// Taken when the player starts
    ended: Option<oneshot::Sender<()>>,
    kill: Option<oneshot::Sender<()>>,
    pid: Option<u32>,
    exited: Arc<AtomicBool>,
    stopped: bool,
}

impl PlayerHandle {
    /// Stop or continue the player process. A player that already exited
    /// (or never started) is left alone.
    fn job_control(&self, resume: bool) -> Result<(), SinkError> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        if self.exited.load(Ordering::SeqCst) {
            return Ok(());
        }

        match send_job_control(pid, resume) {
            Err(_) if self.exited.load(Ordering::SeqCst) => Ok(()),
            result => result,
        }
    }
}

#[cfg(unix)]
fn send_job_control(pid: u32, resume: bool) -> Result<(), SinkError> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let signal = if resume {
        Signal::SIGCONT
    } else {
        Signal::SIGSTOP
    };
    let raw = i32::try_from(pid)
        .map_err(|_| SinkError::Control(format!("invalid player pid {}", pid)))?;
    kill(Pid::from_raw(raw), signal)
        .map_err(|e| SinkError::Control(format!("{} to pid {}: {}", signal.as_str(), pid, e)))
}

#[cfg(not(unix))]
fn send_job_control(_pid: u32, _resume: bool) -> Result<(), SinkError> {
    Err(SinkError::Control(
        "pausing an external player is only supported on Unix".to_string(),
    ))
}

impl AudioHandle for PlayerHandle {
    fn play(&mut self) -> Result<(), SinkError> {
        if self.stopped {
            return Err(SinkError::Control("audio was already released".to_string()));
        }
        let Some(ended) = self.ended.take() else {
            return Ok(());
        };

        let Some((program, args)) = self.player.split_first() else {
            let _ = ended.send(());
            return Ok(());
        };

        let mut child = Command::new(program)
            .args(args)
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SinkError::PlayerStart {
                command: program.clone(),
                message: e.to_string(),
            })?;

        self.pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        self.kill = Some(kill_tx);
        let exited = Arc::clone(&self.exited);

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    exited.store(true, Ordering::SeqCst);
                    match status {
                        Ok(status) if status.success() => {
                            let _ = ended.send(());
                        }
                        Ok(status) => warn!("Player exited with {}", status),
                        Err(e) => warn!("Failed to wait for player: {}", e),
                    }
                }
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        debug!("Failed to kill player: {}", e);
                    }
                    exited.store(true, Ordering::SeqCst);
                }
            }
        });

        Ok(())
    }

    fn pause(&mut self) -> Result<(), SinkError> {
        self.job_control(false)
    }

    fn resume(&mut self) -> Result<(), SinkError> {
        self.job_control(true)
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        // Dropping the sender also wakes the watcher
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        self.ended = None;
        self.pid = None;

        if !self.keep_file {
            if let Err(e) = fs::remove_file(&self.path) {
                debug!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for PlayerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
