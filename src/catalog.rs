//! Built-in narrators and soundscapes

use serde::Serialize;

use crate::error::{ReverieError, Result};

/// A narrator voice offered by the speech provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Identifier of the voice at the speech provider
    pub tts_voice_id: &'static str,
}

/// An ambient background track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Soundscape {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub url: &'static str,
}

pub const VOICES: &[Voice] = &[
    Voice {
        id: "charlotte",
        name: "Charlotte",
        description: "Serene & Gentle",
        tts_voice_id: "cgSgspJ2msm6clMCkdW9",
    },
    Voice {
        id: "dominic",
        name: "Dominic",
        description: "Deep & Grounded",
        tts_voice_id: "pNInz6obpgnuM076YoAt",
    },
];

pub const SOUNDSCAPES: &[Soundscape] = &[
    Soundscape {
        id: "expansive",
        name: "Expansive Ambient",
        description: "Ethereal Space & Clarity",
        url: "https://cdn.pixabay.com/audio/2022/01/18/audio_d0a13f69d2.mp3",
    },
    Soundscape {
        id: "dreamscape",
        name: "Dreamscape Ritual",
        description: "Deep Theta Wave Immersion",
        url: "https://cdn.pixabay.com/audio/2023/02/24/audio_34b693259a.mp3",
    },
];

/// Look up a voice by id (case-insensitive)
pub fn find_voice(id: &str) -> Result<&'static Voice> {
    VOICES
        .iter()
        .find(|v| v.id.eq_ignore_ascii_case(id.trim()))
        .ok_or_else(|| ReverieError::UnknownCatalogEntry {
            kind: "voice",
            id: id.to_string(),
        })
}

/// Look up a soundscape by id (case-insensitive)
pub fn find_soundscape(id: &str) -> Result<&'static Soundscape> {
    SOUNDSCAPES
        .iter()
        .find(|s| s.id.eq_ignore_ascii_case(id.trim()))
        .ok_or_else(|| ReverieError::UnknownCatalogEntry {
            kind: "soundscape",
            id: id.to_string(),
        })
}
