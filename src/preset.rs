//! Named synth patches, persisted as a JSON map from name to preset.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::command::{SynthCommand, Waveform};

pub const DEFAULT_PRESET_NAME: &str = "Default";

/// The full parameter set of the synth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthPreset {
    pub name: String,
    pub main_waveform: Waveform,
    pub sub_waveform: Waveform,
    pub attack: u8,
    pub decay: u8,
    pub sustain: u8,
    pub release: u8,
    pub filter: u8,
    pub detune: u8,
    pub vib_rate: u8,
    pub vib_depth: u8,
    pub octave: i32,
}

impl Default for SynthPreset {
    fn default() -> Self {
        SynthPreset {
            name: DEFAULT_PRESET_NAME.to_string(),
            main_waveform: Waveform::Saw,
            sub_waveform: Waveform::Square,
            attack: 50,
            decay: 100,
            sustain: 180,
            release: 100,
            filter: 255,
            detune: 0,
            vib_rate: 0,
            vib_depth: 0,
            octave: 3,
        }
    }
}

impl SynthPreset {
    pub fn named(name: &str) -> Self {
        SynthPreset {
            name: name.to_string(),
            ..SynthPreset::default()
        }
    }

    /// Commands that put the synth into this preset's state
    pub fn to_commands(&self) -> Vec<SynthCommand> {
        vec![
            SynthCommand::MainWave(self.main_waveform),
            SynthCommand::SubWave(self.sub_waveform),
            SynthCommand::Attack(self.attack),
            SynthCommand::Decay(self.decay),
            SynthCommand::Sustain(self.sustain),
            SynthCommand::Release(self.release),
            SynthCommand::Filter(self.filter),
            SynthCommand::Detune(self.detune),
            SynthCommand::VibRate(self.vib_rate),
            SynthCommand::VibDepth(self.vib_depth),
            SynthCommand::Octave(self.octave),
        ]
    }
}

/// Errors that can occur while storing presets
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Preset serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid preset name: '{0}'")]
    InvalidName(String),

    #[error("No preset named '{0}'")]
    NotFound(String),
}

/// File-backed collection of presets
#[derive(Debug)]
pub struct PresetStore {
    path: PathBuf,
    presets: BTreeMap<String, SynthPreset>,
}

impl PresetStore {
    /// Load presets from `path`.
    ///
    /// A missing, empty or unreadable file yields a store holding only the
    /// default preset, which is written back immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, PresetError> {
        let path = path.as_ref().to_path_buf();

        let loaded = match fs::read_to_string(&path) {
            Ok(json) if json.trim().is_empty() => None,
            Ok(json) => match serde_json::from_str::<BTreeMap<String, SynthPreset>>(&json) {
                Ok(presets) if !presets.is_empty() => Some(presets),
                Ok(_) => None,
                Err(e) => {
                    error!(path = %path.display(), "error loading presets: {}", e);
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                error!(path = %path.display(), "error reading presets: {}", e);
                None
            }
        };

        match loaded {
            Some(presets) => {
                info!(count = presets.len(), "loaded presets");
                Ok(Self { path, presets })
            }
            None => {
                let mut store = Self {
                    path,
                    presets: BTreeMap::new(),
                };
                store
                    .presets
                    .insert(DEFAULT_PRESET_NAME.to_string(), SynthPreset::default());
                debug!("created default preset");
                store.persist()?;
                Ok(store)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a preset under its own name and persist the store
    pub fn save_preset(&mut self, mut preset: SynthPreset) -> Result<(), PresetError> {
        let name = preset.name.trim().to_string();
        if name.is_empty() {
            return Err(PresetError::InvalidName(preset.name));
        }
        preset.name = name.clone();

        info!("saving preset: {}", name);
        self.presets.insert(name, preset);
        self.persist()
    }

    pub fn get(&self, name: &str) -> Option<&SynthPreset> {
        self.presets.get(name)
    }

    /// Like `get`, but a missing preset is an error
    pub fn require(&self, name: &str) -> Result<&SynthPreset, PresetError> {
        self.get(name)
            .ok_or_else(|| PresetError::NotFound(name.to_string()))
    }

    /// Preset names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn remove(&mut self, name: &str) -> Result<Option<SynthPreset>, PresetError> {
        let removed = self.presets.remove(name);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    fn persist(&self) -> Result<(), PresetError> {
        let json = serde_json::to_string_pretty(&self.presets)?;
        fs::write(&self.path, json)?;
        debug!(count = self.presets.len(), "saved presets");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_commands() {
        let commands: Vec<String> = SynthPreset::default()
            .to_commands()
            .iter()
            .map(|c| c.to_string())
            .collect();
        assert_eq!(
            commands,
            vec![
                "MAIN_WAVE:0",
                "SUB_WAVE:1",
                "ATTACK:50",
                "DECAY:100",
                "SUSTAIN:180",
                "RELEASE:100",
                "FILTER:255",
                "DETUNE:0",
                "VIB_RATE:0",
                "VIB_DEPTH:0",
                "OCTAVE:3",
            ]
        );
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let preset: SynthPreset =
            serde_json::from_str(r#"{"name": "Pad", "attack": 200, "main_waveform": "sine"}"#)
                .unwrap();
        assert_eq!(preset.name, "Pad");
        assert_eq!(preset.attack, 200);
        assert_eq!(preset.main_waveform, Waveform::Sine);
        assert_eq!(preset.release, 100);
    }
}
