use std::sync::mpsc;

use serde::{Deserialize, Serialize};

// Retriggering within this distance of the sounding pitch is ignored for
// voices that do not repeat.
const DEBOUNCE_HZ: f32 = 0.5;
// Oscillators idle at 1 Hz until their first note.
pub const IDLE_FREQUENCY: f32 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    Sawtooth,
    Square,
    Triangle,
}

impl Waveform {
    pub fn label(&self) -> &'static str {
        match self {
            Waveform::Sawtooth => "SAW",
            Waveform::Square => "SQUARE",
            Waveform::Triangle => "TRI",
        }
    }

    pub fn sample(&self, phase: f32) -> f32 {
        match self {
            Waveform::Sawtooth => 2.0 * (phase - 0.5),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
        }
    }
}

/// How a voice picks the decay time constant of each note.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum DecayPolicy {
    /// Always the same time constant, in seconds.
    Fixed(f32),
    /// The board-activity decay constant as is.
    Activity,
    /// The board-activity decay constant times a factor.
    ActivityScaled(f32),
}

impl DecayPolicy {
    pub fn resolve(&self, activity_decay: f32) -> f32 {
        match self {
            DecayPolicy::Fixed(seconds) => *seconds,
            DecayPolicy::Activity => activity_decay,
            DecayPolicy::ActivityScaled(factor) => activity_decay * factor,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub waveform: Waveform,
    pub repeat: bool,
    pub initial_gain: f32,
    /// Vibrato depth in Hz.
    pub mod_depth: f32,
    /// Vibrato rate in Hz.
    pub mod_rate: f32,
    /// Seconds spent rising before the decay starts.
    pub rise_time: f32,
    pub decay: DecayPolicy,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VoiceCommand {
    PlayNote { frequency: f32, decay: f32 },
    SetGain(f32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BankCommand {
    pub voice: usize,
    pub command: VoiceCommand,
}

pub type CommandSender = mpsc::Sender<BankCommand>;

/// Control side of one synth voice. Owns the parameters the mapper last set
/// and forwards every change to the renderer as a single message.
#[derive(Debug)]
pub struct Voice {
    index: usize,
    config: VoiceConfig,
    frequency: f32,
    gain: f32,
    last_decay: Option<f32>,
    triggers: u64,
    tx: CommandSender,
}

impl Voice {
    pub fn new(index: usize, config: VoiceConfig, tx: CommandSender) -> Self {
        Self {
            index,
            config,
            frequency: IDLE_FREQUENCY,
            gain: config.initial_gain,
            last_decay: None,
            triggers: 0,
            tx,
        }
    }

    /// Starts a note unless the voice does not repeat and is already at
    /// `frequency`. Returns whether the envelope was retriggered.
    pub fn play_note(&mut self, frequency: f32, decay: f32) -> bool {
        if !self.config.repeat && (frequency - self.frequency).abs() < DEBOUNCE_HZ {
            return false;
        }
        self.frequency = frequency;
        self.last_decay = Some(decay);
        self.triggers += 1;
        self.send(VoiceCommand::PlayNote { frequency, decay });
        true
    }

    pub fn set_gain(&mut self, value: f32) {
        self.gain = value;
        self.send(VoiceCommand::SetGain(value));
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn last_decay(&self) -> Option<f32> {
        self.last_decay
    }

    pub fn triggers(&self) -> u64 {
        self.triggers
    }

    fn send(&self, command: VoiceCommand) {
        // A closed channel means the bank was dropped (muted or no device);
        // the control state stays valid.
        let _ = self.tx.send(BankCommand {
            voice: self.index,
            command,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(repeat: bool) -> VoiceConfig {
        VoiceConfig {
            waveform: Waveform::Square,
            repeat,
            initial_gain: 0.04,
            mod_depth: 3.0,
            mod_rate: 8.0,
            rise_time: 0.01,
            decay: DecayPolicy::Activity,
        }
    }

    #[test]
    fn near_duplicate_is_debounced() {
        let (tx, rx) = mpsc::channel();
        let mut voice = Voice::new(3, config(false), tx);
        assert!(voice.play_note(220.0, 0.5));
        assert!(!voice.play_note(220.4, 0.5));
        assert!(!voice.play_note(219.6, 0.2));
        assert_eq!(voice.triggers(), 1);
        assert_eq!(voice.last_decay(), Some(0.5));
        let sent: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            sent,
            vec![BankCommand {
                voice: 3,
                command: VoiceCommand::PlayNote {
                    frequency: 220.0,
                    decay: 0.5
                }
            }]
        );
        assert!(voice.play_note(221.0, 0.5));
    }

    #[test]
    fn repeating_voice_always_retriggers() {
        let (tx, rx) = mpsc::channel();
        let mut voice = Voice::new(0, config(true), tx);
        assert!(voice.play_note(440.0, 0.5));
        assert!(voice.play_note(440.0, 0.5));
        assert!(voice.play_note(440.3, 0.5));
        assert_eq!(rx.try_iter().count(), 3);
    }

    #[test]
    fn set_gain_is_forwarded_and_kept() {
        let (tx, rx) = mpsc::channel();
        let mut voice = Voice::new(1, config(false), tx);
        assert_eq!(voice.gain(), 0.04);
        voice.set_gain(0.25);
        assert_eq!(voice.gain(), 0.25);
        assert_eq!(voice.frequency(), IDLE_FREQUENCY);
        assert_eq!(
            rx.try_recv().ok(),
            Some(BankCommand {
                voice: 1,
                command: VoiceCommand::SetGain(0.25)
            })
        );
    }

    #[test]
    fn muted_voice_keeps_working() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mut voice = Voice::new(0, config(false), tx);
        assert!(voice.play_note(110.0, 0.1));
        assert_eq!(voice.frequency(), 110.0);
    }

    #[test]
    fn decay_policies() {
        assert_eq!(DecayPolicy::Fixed(0.5).resolve(0.9), 0.5);
        assert_eq!(DecayPolicy::Activity.resolve(0.3), 0.3);
        assert!((DecayPolicy::ActivityScaled(0.001).resolve(0.4) - 0.0004).abs() < 1e-9);
    }

    #[test]
    fn waveforms_stay_in_range() {
        for waveform in [Waveform::Sawtooth, Waveform::Square, Waveform::Triangle] {
            for step in 0..100 {
                let value = waveform.sample(step as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&value), "{}", waveform.label());
            }
        }
    }
}
