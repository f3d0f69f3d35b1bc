//! Voice-note pipeline: download, transcribe, ask the agent, synthesize,
//! deliver.
//!
//! Every failure ends the run with a chat message to the user. Presence is
//! reset to `Paused` on every exit, and the run's working directory is
//! removed when the run is dropped.

use std::{
    fmt,
    panic::AssertUnwindSafe,
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    futures::FutureExt,
    tracing::{debug, error, info, warn},
    voxrelay_agents::{AgentResponder, LlamaStackClient, canned_reply, fallback::GENERIC_REPLY},
    voxrelay_common::Jid,
    voxrelay_config::VoxrelayConfig,
    voxrelay_media::{RunWorkspace, file_stem_for},
    voxrelay_store::Store,
    voxrelay_voice::{PiperTts, SttProvider, TtsProvider, select_provider},
};

use crate::{
    deliver::OutboundDeliverer,
    session::MessagingSession,
    types::{InboundEvent, MessagePayload, PresenceState},
};

pub const DOWNLOAD_FAILED_REPLY: &str = "Sorry, I couldn't download your voice message.";
pub const NOT_UNDERSTOOD_REPLY: &str = "Sorry, I couldn't understand your voice message.";

/// Position of a run in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Downloading,
    Transcribing,
    AgentProcessing,
    Synthesizing,
    Delivering,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Downloading => "downloading",
            Self::Transcribing => "transcribing",
            Self::AgentProcessing => "agent-processing",
            Self::Synthesizing => "synthesizing",
            Self::Delivering => "delivering",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub message_id: String,
    /// `Done` or `Failed`.
    pub stage: Stage,
    /// Stage that was active when the run failed.
    pub failed_at: Option<Stage>,
    pub transcript: Option<String>,
    pub reply: Option<String>,
}

impl RunReport {
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }
}

/// State of one in-flight run. Dropping it removes the working directory.
struct PipelineRun {
    message_id: String,
    chat: Jid,
    stage: Stage,
    workspace: Option<RunWorkspace>,
    transcript: Option<String>,
    reply: Option<String>,
}

impl PipelineRun {
    fn new(event: &InboundEvent) -> Self {
        Self {
            message_id: event.id.clone(),
            chat: event.chat.clone(),
            stage: Stage::Downloading,
            workspace: None,
            transcript: None,
            reply: None,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(message_id = %self.message_id, stage = %stage, "pipeline stage");
        self.stage = stage;
    }

    fn finish(self, failed_at: Option<Stage>) -> RunReport {
        RunReport {
            message_id: self.message_id.clone(),
            stage: if failed_at.is_some() {
                Stage::Failed
            } else {
                Stage::Done
            },
            failed_at,
            transcript: self.transcript.clone(),
            reply: self.reply.clone(),
        }
    }
}

pub struct VoicePipeline {
    session: Arc<dyn MessagingSession>,
    stt: Arc<dyn SttProvider>,
    agent: Arc<dyn AgentResponder>,
    tts: Arc<dyn TtsProvider>,
    deliverer: OutboundDeliverer,
    work_root: PathBuf,
    debug_echo: bool,
}

impl VoicePipeline {
    #[must_use]
    pub fn new(
        session: Arc<dyn MessagingSession>,
        stt: Arc<dyn SttProvider>,
        agent: Arc<dyn AgentResponder>,
        tts: Arc<dyn TtsProvider>,
        deliverer: OutboundDeliverer,
        work_root: PathBuf,
    ) -> Self {
        Self {
            session,
            stt,
            agent,
            tts,
            deliverer,
            work_root,
            debug_echo: false,
        }
    }

    /// Wire the pipeline with the engines and agent named in `config`.
    pub fn from_config(
        session: Arc<dyn MessagingSession>,
        store: Arc<dyn Store>,
        config: &VoxrelayConfig,
    ) -> voxrelay_agents::Result<Self> {
        let stt = select_provider(&config.voice.stt);
        let tts: Arc<dyn TtsProvider> = Arc::new(PiperTts::new(
            &config.voice.tts.piper,
            config.voice.tts.ffmpeg_path.clone(),
        ));
        let agent: Arc<dyn AgentResponder> =
            Arc::new(LlamaStackClient::new(config.agent.clone())?);
        let deliverer =
            OutboundDeliverer::from_config(Arc::clone(&session), store, &config.delivery);

        if !stt.is_configured() {
            warn!(engine = stt.id(), "speech-to-text engine is not fully configured");
        }
        if !tts.is_configured() {
            warn!(engine = tts.id(), "text-to-speech engine is not fully configured");
        }

        Ok(Self::new(
            session,
            stt,
            agent,
            tts,
            deliverer,
            config.pipeline.work_root(),
        )
        .with_debug_echo(config.pipeline.debug_echo))
    }

    /// Also send the transcript and reply as text after a successful run.
    #[must_use]
    pub fn with_debug_echo(mut self, enabled: bool) -> Self {
        self.debug_echo = enabled;
        self
    }

    #[must_use]
    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    /// Process one voice note end to end. Never fails; the outcome is in the
    /// report and, for the user, in the chat.
    pub async fn run(&self, event: &InboundEvent) -> RunReport {
        let chat = &event.chat;
        info!(message_id = %event.id, chat = %chat, "voice pipeline started");

        if let Err(e) = self.session.set_presence(chat, PresenceState::Recording).await {
            warn!(chat = %chat, error = %e, "failed to set recording presence");
        }

        let report = match AssertUnwindSafe(self.run_stages(event))
            .catch_unwind()
            .await
        {
            Ok(report) => report,
            Err(_) => {
                error!(message_id = %event.id, "voice pipeline panicked");
                self.clear_presence(chat).await;
                if let Err(e) = self.deliverer.send_text(chat, GENERIC_REPLY).await {
                    warn!(message_id = %event.id, error = %e, "failed to send fallback reply");
                }
                RunReport {
                    message_id: event.id.clone(),
                    stage: Stage::Failed,
                    failed_at: None,
                    transcript: None,
                    reply: None,
                }
            },
        };

        // Failed runs cleared presence before their fallback message.
        if report.is_done() {
            self.clear_presence(chat).await;
        }

        info!(
            message_id = %report.message_id,
            stage = %report.stage,
            failed_at = ?report.failed_at,
            "voice pipeline finished"
        );
        report
    }

    async fn run_stages(&self, event: &InboundEvent) -> RunReport {
        let mut run = PipelineRun::new(event);

        // Download
        run.enter(Stage::Downloading);
        let input = match self.download(event, &mut run).await {
            Some(path) => path,
            None => return self.fail(run, DOWNLOAD_FAILED_REPLY).await,
        };

        // Transcribe
        run.enter(Stage::Transcribing);
        let transcript = match self.stt.transcribe(&input).await {
            Ok(t) if !t.trim().is_empty() => t.trim().to_string(),
            Ok(_) => {
                warn!(message_id = %run.message_id, "empty transcript");
                return self.fail(run, NOT_UNDERSTOOD_REPLY).await;
            },
            Err(e) => {
                warn!(message_id = %run.message_id, engine = self.stt.id(), error = %e, "transcription failed");
                return self.fail(run, NOT_UNDERSTOOD_REPLY).await;
            },
        };
        info!(message_id = %run.message_id, chars = transcript.len(), "transcribed voice note");
        run.transcript = Some(transcript.clone());

        // Agent
        run.enter(Stage::AgentProcessing);
        let reply = match self.agent.respond(&transcript).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(message_id = %run.message_id, error = %e, kind = ?e.kind(), "agent turn failed");
                let fallback = canned_reply(&transcript);
                return self.fail(run, &fallback).await;
            },
        };
        run.reply = Some(reply.clone());

        // Synthesize
        run.enter(Stage::Synthesizing);
        let Some(workspace) = run.workspace.as_ref() else {
            return self.fail(run, &reply).await;
        };
        let audio = match self.tts.synthesize(&reply, workspace.path()).await {
            Ok(path) => path,
            Err(e) => {
                warn!(message_id = %run.message_id, engine = self.tts.id(), error = %e, "synthesis failed");
                return self.fail(run, &reply).await;
            },
        };

        // Deliver
        run.enter(Stage::Delivering);
        if let Err(e) = self.deliverer.send_voice(&run.chat, &audio).await {
            warn!(message_id = %run.message_id, error = %e, "voice delivery failed");
            return self.fail(run, &reply).await;
        }

        if self.debug_echo {
            let echo = format!("🎤 You said: {transcript}\n\n🤖 Reply: {reply}");
            if let Err(e) = self.deliverer.send_text(&run.chat, &echo).await {
                warn!(message_id = %run.message_id, error = %e, "debug echo failed");
            }
        }

        run.enter(Stage::Done);
        run.finish(None)
    }

    /// Fetch the voice note into a fresh run workspace.
    async fn download(&self, event: &InboundEvent, run: &mut PipelineRun) -> Option<PathBuf> {
        let workspace = match RunWorkspace::create(&self.work_root, &event.id) {
            Ok(ws) => ws,
            Err(e) => {
                warn!(message_id = %event.id, error = %e, "failed to create run workspace");
                return None;
            },
        };

        let bytes = match self.session.download(event).await {
            Ok(bytes) if !bytes.is_empty() => bytes,
            Ok(_) => {
                warn!(message_id = %event.id, "downloaded voice note is empty");
                return None;
            },
            Err(e) => {
                warn!(message_id = %event.id, error = %e, "voice note download failed");
                return None;
            },
        };

        let name = format!("{}.{}", file_stem_for(&event.id), input_extension(event));
        let path = match workspace.write_file(&name, &bytes).await {
            Ok(path) => path,
            Err(e) => {
                warn!(message_id = %event.id, error = %e, "failed to write voice note");
                return None;
            },
        };
        debug!(message_id = %event.id, path = %path.display(), size = bytes.len(), "voice note saved");
        run.workspace = Some(workspace);
        Some(path)
    }

    async fn clear_presence(&self, chat: &Jid) {
        if let Err(e) = self.session.set_presence(chat, PresenceState::Paused).await {
            warn!(chat = %chat, error = %e, "failed to clear presence");
        }
    }

    /// Clear presence, then tell the user what went wrong.
    async fn fail(&self, mut run: PipelineRun, text: &str) -> RunReport {
        let failed_at = run.stage;
        run.enter(Stage::Failed);
        self.clear_presence(&run.chat).await;
        if let Err(e) = self.deliverer.send_text(&run.chat, text).await {
            warn!(message_id = %run.message_id, error = %e, "failed to send fallback reply");
        }
        run.finish(Some(failed_at))
    }
}

/// File extension for the downloaded note, from its declared MIME type.
fn input_extension(event: &InboundEvent) -> &'static str {
    let mime = match event.payload() {
        MessagePayload::Audio(audio) => audio.mime.to_ascii_lowercase(),
        _ => String::new(),
    };
    if mime.contains("mpeg") {
        "mp3"
    } else if mime.contains("mp4") || mime.contains("m4a") {
        "m4a"
    } else if mime.contains("wav") {
        "wav"
    } else if mime.contains("amr") {
        "amr"
    } else if mime.contains("aac") {
        "aac"
    } else {
        "ogg"
    }
}
