pub struct Mixer {
    pub master: f32,
}

impl Mixer {
    pub fn new(master: f32) -> Self {
        Self {
            master: master.clamp(0.0, 1.0),
        }
    }

    pub fn mix(&self, voice_samples: &[f32]) -> f32 {
        voice_samples.iter().sum::<f32>() * self.master
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_voices_under_master() {
        let mixer = Mixer::new(0.5);
        assert!((mixer.mix(&[0.2, 0.4, -0.2]) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn master_is_clamped() {
        assert_eq!(Mixer::new(3.0).master, 1.0);
        assert_eq!(Mixer::new(-1.0).mix(&[1.0]), 0.0);
    }
}
