use std::sync::mpsc;

use crate::envelope::{Envelope, Smoothed};
use crate::voice::{BankCommand, IDLE_FREQUENCY, Voice, VoiceCommand, VoiceConfig, Waveform};

// Master gain changes glide over a few milliseconds to avoid zipper noise.
const GAIN_SMOOTHING_SEC: f32 = 0.005;

/// Render side of one voice: oscillator, vibrato LFO, envelope and master gain.
pub struct OscillatorVoice {
    waveform: Waveform,
    frequency: f32,
    phase: f32,
    lfo_phase: f32,
    mod_depth: f32,
    mod_rate: f32,
    envelope: Envelope,
    master: Smoothed,
}

impl OscillatorVoice {
    fn new(config: &VoiceConfig) -> Self {
        Self {
            waveform: config.waveform,
            frequency: IDLE_FREQUENCY,
            phase: 0.0,
            lfo_phase: 0.0,
            mod_depth: config.mod_depth,
            mod_rate: config.mod_rate,
            envelope: Envelope::new(config.rise_time),
            master: Smoothed::new(config.initial_gain, GAIN_SMOOTHING_SEC),
        }
    }

    fn apply(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::PlayNote { frequency, decay } => {
                self.frequency = frequency;
                self.envelope.trigger(decay);
            }
            VoiceCommand::SetGain(gain) => self.master.set(gain),
        }
    }

    fn sample(&mut self, sample_rate: f32) -> f32 {
        let dt = 1.0 / sample_rate;
        self.lfo_phase = (self.lfo_phase + self.mod_rate * dt).fract();
        let vibrato = (self.lfo_phase * std::f32::consts::TAU).sin() * self.mod_depth;
        let phase_delta = ((self.frequency + vibrato) * dt).max(0.0);
        self.phase = (self.phase + phase_delta).fract();
        let envelope = self.envelope.advance(dt);
        let master = self.master.next(dt);
        self.waveform.sample(self.phase) * envelope * master
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn envelope(&self) -> f32 {
        self.envelope.value()
    }

    pub fn gain_target(&self) -> f32 {
        self.master.target()
    }
}

pub struct OscillatorBank {
    voices: Vec<OscillatorVoice>,
    rx: mpsc::Receiver<BankCommand>,
}

impl OscillatorBank {
    pub fn new(configs: &[VoiceConfig], rx: mpsc::Receiver<BankCommand>) -> Self {
        let voices = configs.iter().map(OscillatorVoice::new).collect();
        Self { voices, rx }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn voice(&self, index: usize) -> Option<&OscillatorVoice> {
        self.voices.get(index)
    }

    /// Applies every command queued since the last call.
    pub fn drain_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(BankCommand { voice, command }) = self.rx.try_recv() {
            if let Some(target) = self.voices.get_mut(voice) {
                target.apply(command);
                applied += 1;
            }
        }
        applied
    }

    pub fn fill_sample(&mut self, sample_rate: f32, out: &mut [f32]) {
        for (index, voice) in self.voices.iter_mut().enumerate() {
            if let Some(slot) = out.get_mut(index) {
                *slot = voice.sample(sample_rate);
            }
        }
    }
}

/// Control handles and the matching renderer for a set of voice configs.
pub fn voice_bank(configs: &[VoiceConfig]) -> (Vec<Voice>, OscillatorBank) {
    let (tx, rx) = mpsc::channel();
    let voices = configs
        .iter()
        .enumerate()
        .map(|(index, config)| Voice::new(index, *config, tx.clone()))
        .collect();
    (voices, OscillatorBank::new(configs, rx))
}
