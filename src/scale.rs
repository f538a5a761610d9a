use serde::{Deserialize, Serialize};

use crate::frequency::{FrequencyTable, SEMITONES_PER_OCTAVE};

pub const ROOT_COUNT: usize = SEMITONES_PER_OCTAVE;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleKind {
    Major,
    Pentatonic,
    Wholetone,
    Chromatic,
    ChordMinor,
    ChordMajor,
    ChordMajor7,
    ChordMajorFlat7,
}

impl ScaleKind {
    pub const VALUES: [ScaleKind; 8] = [
        ScaleKind::Major,
        ScaleKind::Pentatonic,
        ScaleKind::Wholetone,
        ScaleKind::Chromatic,
        ScaleKind::ChordMinor,
        ScaleKind::ChordMajor,
        ScaleKind::ChordMajor7,
        ScaleKind::ChordMajorFlat7,
    ];

    pub const COUNT: usize = Self::VALUES.len();

    pub fn label(&self) -> &'static str {
        match self {
            ScaleKind::Major => "major",
            ScaleKind::Pentatonic => "pentatonic",
            ScaleKind::Wholetone => "wholetone",
            ScaleKind::Chromatic => "chromatic",
            ScaleKind::ChordMinor => "chord minor",
            ScaleKind::ChordMajor => "chord major",
            ScaleKind::ChordMajor7 => "chord major 7",
            ScaleKind::ChordMajorFlat7 => "chord major b7",
        }
    }

    /// Semitone offsets from the root, ascending, all below 12.
    pub fn intervals(&self) -> &'static [usize] {
        match self {
            ScaleKind::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScaleKind::Pentatonic => &[0, 2, 4, 7, 9],
            ScaleKind::Wholetone => &[0, 2, 4, 6, 8, 10],
            ScaleKind::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],
            ScaleKind::ChordMinor => &[0, 3, 7],
            ScaleKind::ChordMajor => &[0, 4, 7],
            ScaleKind::ChordMajor7 => &[0, 4, 7, 11],
            ScaleKind::ChordMajorFlat7 => &[0, 4, 7, 10],
        }
    }

    pub fn contains(&self, semitone: usize) -> bool {
        self.intervals().contains(&semitone)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Quantized note frequencies for every (root, scale kind) pair.
#[derive(Clone, Debug)]
pub struct ScaleTable {
    // Indexed by root, then by `ScaleKind::index`.
    scales: Vec<Vec<Vec<f32>>>,
}

impl ScaleTable {
    pub fn build(frequencies: &FrequencyTable) -> Self {
        let scales = (0..ROOT_COUNT)
            .map(|root| {
                ScaleKind::VALUES
                    .iter()
                    .map(|kind| build_scale(frequencies, root, *kind))
                    .collect()
            })
            .collect();
        Self { scales }
    }

    pub fn get(&self, root: usize, kind: ScaleKind) -> &[f32] {
        assert!(root < ROOT_COUNT, "root {root} outside 0..{ROOT_COUNT}");
        &self.scales[root][kind.index()]
    }
}

fn build_scale(frequencies: &FrequencyTable, root: usize, kind: ScaleKind) -> Vec<f32> {
    let mut notes = Vec::new();
    for window in (root..frequencies.len()).step_by(SEMITONES_PER_OCTAVE) {
        for semitone in 0..SEMITONES_PER_OCTAVE {
            let index = window + semitone;
            if index >= frequencies.len() {
                break;
            }
            if kind.contains(semitone) {
                notes.push(frequencies.get(index));
            }
        }
    }
    notes
}

/// A register of a scale: the full sequence minus `skip_low` entries at the
/// bottom and `skip_high` entries at the top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleSlice {
    pub kind: ScaleKind,
    pub skip_low: usize,
    pub skip_high: usize,
}

impl ScaleSlice {
    pub fn new(kind: ScaleKind, skip_low: usize, skip_high: usize) -> Self {
        Self {
            kind,
            skip_low,
            skip_high,
        }
    }

    /// Whether at least one note is left at `root`.
    pub fn fits(&self, table: &ScaleTable, root: usize) -> bool {
        table.get(root, self.kind).len().saturating_sub(self.skip_high) > self.skip_low
    }

    pub fn apply<'a>(&self, table: &'a ScaleTable, root: usize) -> &'a [f32] {
        let notes = table.get(root, self.kind);
        let end = notes.len().saturating_sub(self.skip_high);
        assert!(
            self.skip_low < end,
            "slice {:?} leaves no notes of {} at root {root}",
            self,
            self.kind.label()
        );
        &notes[self.skip_low..end]
    }
}

/// Maps `value` in `[lo, hi]` onto one of `notes` using equal-width buckets.
/// Values outside the domain clamp to the first or last note.
pub fn quantize(value: f32, lo: f32, hi: f32, notes: &[f32]) -> f32 {
    assert!(!notes.is_empty(), "cannot quantize onto an empty scale");
    let last = notes.len() - 1;
    let span = hi - lo;
    if !value.is_finite() || span <= 0.0 {
        return notes[0];
    }
    let position = (value - lo) / span * notes.len() as f32;
    if position <= 0.0 {
        return notes[0];
    }
    let index = (position.floor() as usize).min(last);
    notes[index]
}
