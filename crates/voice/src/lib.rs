//! Voice capabilities for voxrelay: Speech-to-Text (STT) and Text-to-Speech (TTS).
//!
//! Engines are local CLI tools (whisper.cpp, piper) or an OpenAI-compatible
//! transcription API, all working on files inside a caller-owned directory.

pub mod stt;
pub mod tts;

pub use {
    stt::{SttError, SttProvider, WhisperCliStt, WhisperStt, select_provider},
    tts::{PiperTts, TtsError, TtsProvider},
};
