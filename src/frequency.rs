const REFERENCE_FREQ: f32 = 440.0;
// Index of A4 in a table that starts at C0.
const REFERENCE_INDEX: i32 = 57;

pub const SEMITONES_PER_OCTAVE: usize = 12;
pub const DEFAULT_OCTAVES: usize = 9;

/// Equal-tempered note frequencies, ascending, one entry per semitone from C0.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyTable {
    frequencies: Vec<f32>,
}

impl FrequencyTable {
    pub fn equal_tempered(octaves: usize) -> Self {
        let frequencies = (0..octaves * SEMITONES_PER_OCTAVE)
            .map(|index| semitone_to_frequency(index as i32 - REFERENCE_INDEX))
            .collect();
        Self { frequencies }
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn get(&self, index: usize) -> f32 {
        self.frequencies[index]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.frequencies
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::equal_tempered(DEFAULT_OCTAVES)
    }
}

pub fn semitone_to_frequency(semitones_from_a4: i32) -> f32 {
    let octave = semitones_from_a4 as f32 / SEMITONES_PER_OCTAVE as f32;
    REFERENCE_FREQ * 2.0f32.powf(octave)
}
