// Sonification: turns each board generation into voice commands.
//
// Every behaviour runs on its own generation period from `Schedule`:
// - key change: pick a new root from the candidates and rebuild the registers
// - column keyboard: one voice per note of the column register, gain follows
//   the activity of the board columns mapped to that note
// - brightest: retrigger a voice on the most active column note
// - bass: quantized sqrt(active count)
// - age: quantized average age of the active cells
// - drum: short hit on the root, gated by overall activity

use std::sync::mpsc;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::analyzer::{column_profile, global_activity};
use crate::automaton::Board;
use crate::frequency::FrequencyTable;
use crate::oscillatorbank::OscillatorBank;
use crate::scale::{ScaleKind, ScaleSlice, ScaleTable, quantize};
use crate::voice::{DecayPolicy, Voice, VoiceConfig, Waveform};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behavior {
    KeyChange,
    Column,
    Brightest,
    Bass,
    Age,
    Drum,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Schedule {
    pub key_change: u64,
    pub column: u64,
    pub brightest: u64,
    pub bass: u64,
    pub age: u64,
    pub drum: u64,
    /// Minimum activity decay constant for a drum hit.
    pub drum_threshold: f32,
    /// Generations over which the column keyboard fades in.
    pub fade_in_generations: u64,
    pub initial_root: usize,
    pub key_candidates: Vec<usize>,
    pub brightest_voices: usize,
    pub age_domain: [f32; 2],
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            key_change: 192,
            column: 1,
            brightest: 4,
            bass: 8,
            age: 4,
            drum: 16,
            drum_threshold: 0.15,
            fade_in_generations: 100,
            initial_root: 0,
            key_candidates: vec![0, 2, 4, 6, 8],
            brightest_voices: 1,
            age_domain: [1.0, 3.0],
        }
    }
}

impl Schedule {
    pub fn period(&self, behavior: Behavior) -> u64 {
        match behavior {
            Behavior::KeyChange => self.key_change,
            Behavior::Column => self.column,
            Behavior::Brightest => self.brightest,
            Behavior::Bass => self.bass,
            Behavior::Age => self.age,
            Behavior::Drum => self.drum,
        }
    }

    pub fn is_due(&self, behavior: Behavior, generation: u64) -> bool {
        let skips_start = matches!(behavior, Behavior::KeyChange | Behavior::Drum);
        if skips_start && generation == 0 {
            return false;
        }
        let period = self.period(behavior);
        period != 0 && generation % period == 0
    }

    /// Column keyboard volume: a linear ramp from 0 to 1.
    pub fn fade_in(&self, generation: u64) -> f32 {
        if self.fade_in_generations == 0 || generation >= self.fade_in_generations {
            1.0
        } else {
            generation as f32 / self.fade_in_generations as f32
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScaleLayout {
    pub column: ScaleSlice,
    pub bass: ScaleSlice,
    pub age: ScaleSlice,
}

impl Default for ScaleLayout {
    fn default() -> Self {
        Self {
            column: ScaleSlice::new(ScaleKind::Major, 18, 7),
            bass: ScaleSlice::new(ScaleKind::Pentatonic, 8, 10),
            age: ScaleSlice::new(ScaleKind::Major, 12, 12),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VoiceBankConfig {
    pub column: VoiceConfig,
    pub brightest: VoiceConfig,
    pub bass: VoiceConfig,
    pub age: VoiceConfig,
    pub drum: VoiceConfig,
}

impl Default for VoiceBankConfig {
    fn default() -> Self {
        Self {
            column: VoiceConfig {
                waveform: Waveform::Sawtooth,
                repeat: true,
                initial_gain: 0.0,
                mod_depth: 1.0,
                mod_rate: 6.0,
                rise_time: 0.01,
                decay: DecayPolicy::Fixed(0.5),
            },
            brightest: VoiceConfig {
                waveform: Waveform::Triangle,
                repeat: false,
                initial_gain: 0.03,
                mod_depth: 1.0,
                mod_rate: 6.0,
                rise_time: 0.01,
                decay: DecayPolicy::Activity,
            },
            bass: VoiceConfig {
                waveform: Waveform::Square,
                repeat: false,
                initial_gain: 0.04,
                mod_depth: 3.0,
                mod_rate: 8.0,
                rise_time: 0.01,
                decay: DecayPolicy::Activity,
            },
            age: VoiceConfig {
                waveform: Waveform::Square,
                repeat: false,
                initial_gain: 0.01,
                mod_depth: 2.0,
                mod_rate: 6.0,
                rise_time: 0.01,
                decay: DecayPolicy::Activity,
            },
            drum: VoiceConfig {
                waveform: Waveform::Square,
                repeat: true,
                initial_gain: 0.06,
                mod_depth: 0.0,
                mod_rate: 6.0,
                rise_time: 0.01,
                decay: DecayPolicy::ActivityScaled(0.001),
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NoteEvent {
    pub frequency: f32,
    pub decay: f32,
    /// False when the voice ignored a repeat of its current pitch.
    pub retriggered: bool,
}

/// What one `step` did, for display and inspection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub generation: u64,
    pub active: usize,
    pub average_age: f32,
    pub decay_const: f32,
    pub root: usize,
    pub key_changed: bool,
    pub column_levels: Vec<f32>,
    pub brightest: Option<NoteEvent>,
    pub bass: Option<NoteEvent>,
    pub age: Option<NoteEvent>,
    pub drum: Option<NoteEvent>,
    pub drum_suppressed: bool,
}

pub struct SonificationMapper {
    schedule: Schedule,
    layout: ScaleLayout,
    scales: ScaleTable,
    root: usize,
    column_notes: Vec<f32>,
    bass_notes: Vec<f32>,
    age_notes: Vec<f32>,
    column_voices: Vec<Voice>,
    brightest_voices: Vec<Voice>,
    bass_voice: Voice,
    age_voice: Voice,
    drum_voice: Voice,
    key_changes: u64,
    rng: StdRng,
}

impl SonificationMapper {
    /// Builds the mapper with its voices and the renderer those voices drive.
    /// The column keyboard gets one voice per note of the column register at
    /// the initial root.
    pub fn new(
        schedule: Schedule,
        layout: ScaleLayout,
        voices: &VoiceBankConfig,
        rng: StdRng,
    ) -> (Self, OscillatorBank) {
        let scales = ScaleTable::build(&FrequencyTable::default());
        let root = schedule.initial_root;
        let column_count = layout.column.apply(&scales, root).len();

        let (tx, rx) = mpsc::channel();
        let mut configs = Vec::new();
        let mut spawn = |config: VoiceConfig| {
            let voice = Voice::new(configs.len(), config, tx.clone());
            configs.push(config);
            voice
        };
        let column_voices = (0..column_count).map(|_| spawn(voices.column)).collect();
        let brightest_voices = (0..schedule.brightest_voices)
            .map(|_| spawn(voices.brightest))
            .collect();
        let bass_voice = spawn(voices.bass);
        let age_voice = spawn(voices.age);
        let drum_voice = spawn(voices.drum);
        let bank = OscillatorBank::new(&configs, rx);

        let mut mapper = Self {
            schedule,
            layout,
            scales,
            root,
            column_notes: Vec::new(),
            bass_notes: Vec::new(),
            age_notes: Vec::new(),
            column_voices,
            brightest_voices,
            bass_voice,
            age_voice,
            drum_voice,
            key_changes: 0,
            rng,
        };
        mapper.select_root(root);
        (mapper, bank)
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn key_changes(&self) -> u64 {
        self.key_changes
    }

    pub fn column_notes(&self) -> &[f32] {
        &self.column_notes
    }

    pub fn column_voices(&self) -> &[Voice] {
        &self.column_voices
    }

    pub fn brightest_voices(&self) -> &[Voice] {
        &self.brightest_voices
    }

    pub fn bass_voice(&self) -> &Voice {
        &self.bass_voice
    }

    pub fn age_voice(&self) -> &Voice {
        &self.age_voice
    }

    pub fn drum_voice(&self) -> &Voice {
        &self.drum_voice
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn step(&mut self, board: &Board, generation: u64) -> TickReport {
        let activity = global_activity(board);
        let decay_const = (activity.active as f32 / board.len() as f32).sqrt();
        let mut report = TickReport {
            generation,
            active: activity.active,
            average_age: activity.average_age,
            decay_const,
            ..TickReport::default()
        };

        if self.schedule.is_due(Behavior::KeyChange, generation) {
            self.change_key(generation);
            report.key_changed = true;
        }
        report.root = self.root;

        let column_due = self.schedule.is_due(Behavior::Column, generation);
        let brightest_due = self.schedule.is_due(Behavior::Brightest, generation);
        if column_due || brightest_due {
            report.column_levels = self.column_levels(board);
        }
        if column_due {
            self.play_columns(&report.column_levels, generation, decay_const);
        }
        if brightest_due {
            report.brightest = self.play_brightest(&report.column_levels, decay_const);
        }

        if self.schedule.is_due(Behavior::Bass, generation) {
            let domain = (board.len() as f32).sqrt();
            let frequency = quantize(
                (activity.active as f32).sqrt(),
                0.0,
                domain,
                &self.bass_notes,
            );
            report.bass = Some(play(&mut self.bass_voice, frequency, decay_const));
        }

        if self.schedule.is_due(Behavior::Age, generation) {
            let [lo, hi] = self.schedule.age_domain;
            let frequency = quantize(activity.average_age, lo, hi, &self.age_notes);
            report.age = Some(play(&mut self.age_voice, frequency, decay_const));
        }

        if self.schedule.is_due(Behavior::Drum, generation) {
            if decay_const >= self.schedule.drum_threshold {
                let frequency = self.column_notes[0];
                report.drum = Some(play(&mut self.drum_voice, frequency, decay_const));
            } else {
                report.drum_suppressed = true;
            }
        }

        trace!(
            generation,
            active = activity.active,
            decay_const,
            root = self.root,
            "sonified generation"
        );
        report
    }

    fn change_key(&mut self, generation: u64) {
        let candidates = &self.schedule.key_candidates;
        if candidates.is_empty() {
            return;
        }
        let root = candidates[self.rng.gen_range(0..candidates.len())];
        debug!(generation, from = self.root, to = root, "key change");
        self.key_changes += 1;
        self.select_root(root);
    }

    fn select_root(&mut self, root: usize) {
        self.root = root;
        self.column_notes = self.layout.column.apply(&self.scales, root).to_vec();
        self.bass_notes = self.layout.bass.apply(&self.scales, root).to_vec();
        self.age_notes = self.layout.age.apply(&self.scales, root).to_vec();
    }

    /// Average active fraction of the board columns mapped to each column
    /// note. Notes split the board into contiguous, equal-width bands.
    fn column_levels(&self, board: &Board) -> Vec<f32> {
        let notes = self.playable_columns();
        let cols = board.cols();
        let profile = column_profile(board);
        (0..notes)
            .map(|note| {
                let start = note * cols / notes;
                let end = ((note + 1) * cols / notes).min(cols);
                // More notes than columns: share the band's first column.
                let band = if start < end {
                    start..end
                } else {
                    let col = start.min(cols - 1);
                    col..col + 1
                };
                let band = &profile[band];
                band.iter().sum::<f32>() / band.len() as f32
            })
            .collect()
    }

    fn playable_columns(&self) -> usize {
        self.column_notes.len().min(self.column_voices.len())
    }

    fn play_columns(&mut self, levels: &[f32], generation: u64, decay_const: f32) {
        let mix = self.schedule.fade_in(generation) / levels.len().max(1) as f32;
        for (note, voice) in self.column_voices.iter_mut().enumerate() {
            match levels.get(note) {
                Some(level) => {
                    let gain = (level + 1.0).ln() / std::f32::consts::LN_2;
                    voice.set_gain(gain * mix);
                    let decay = voice.config().decay.resolve(decay_const);
                    voice.play_note(self.column_notes[note], decay);
                }
                None => {
                    // Register shrank after a key change.
                    if voice.gain() != 0.0 {
                        voice.set_gain(0.0);
                    }
                }
            }
        }
    }

    fn play_brightest(&mut self, levels: &[f32], decay_const: f32) -> Option<NoteEvent> {
        let mut ranked: Vec<usize> = (0..levels.len()).collect();
        ranked.sort_by(|a, b| levels[*b].total_cmp(&levels[*a]));
        let mut first = None;
        for (voice, note) in self.brightest_voices.iter_mut().zip(ranked) {
            let event = play(voice, self.column_notes[note], decay_const);
            first.get_or_insert(event);
        }
        first
    }
}

fn play(voice: &mut Voice, frequency: f32, decay_const: f32) -> NoteEvent {
    let decay = voice.config().decay.resolve(decay_const);
    let retriggered = voice.play_note(frequency, decay);
    NoteEvent {
        frequency,
        decay,
        retriggered,
    }
}
