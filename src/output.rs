use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use cpal::{
    FromSample, SampleFormat, SizedSample, Stream,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use tracing::{info, warn};

use crate::{mixer::Mixer, oscillatorbank::OscillatorBank};

const OUTPUT_LIMIT: f32 = 0.98;

pub type SharedPipeline = Arc<Mutex<SynthPipeline>>;

/// Everything the audio callback needs to turn voices into samples.
pub struct SynthPipeline {
    bank: OscillatorBank,
    mixer: Mixer,
    sample_rate: f32,
    voice_buffer: Vec<f32>,
}

impl SynthPipeline {
    pub fn new(bank: OscillatorBank, mixer: Mixer) -> Self {
        let voice_buffer = vec![0.0; bank.len()];
        Self {
            bank,
            mixer,
            sample_rate: 44_100.0,
            voice_buffer,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn set_sample_rate(&mut self, rate: f32) {
        self.sample_rate = rate.max(1.0);
    }

    pub fn next_sample(&mut self) -> f32 {
        self.bank
            .fill_sample(self.sample_rate, &mut self.voice_buffer);
        self.mixer
            .mix(&self.voice_buffer)
            .clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT)
    }

    /// Picks up pending voice commands, then renders `out.len()` mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        self.bank.drain_commands();
        for slot in out.iter_mut() {
            *slot = self.next_sample();
        }
    }
}

pub struct AudioEngine {
    _stream: Stream,
}

impl AudioEngine {
    pub fn start(pipeline: SharedPipeline) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default audio output"))?;
        let supported = device.default_output_config()?;
        let config = supported.config();
        let sample_rate = config.sample_rate.0 as f32;
        lock_pipeline(&pipeline).set_sample_rate(sample_rate);
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".into()),
            sample_rate,
            channels = config.channels,
            format = ?supported.sample_format(),
            "opening audio output"
        );
        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, pipeline)?,
            SampleFormat::I16 => build_stream::<i16>(&device, &config, pipeline)?,
            SampleFormat::U16 => build_stream::<u16>(&device, &config, pipeline)?,
            _ => build_stream::<f32>(&device, &config, pipeline)?,
        };
        stream.play()?;
        Ok(Self { _stream: stream })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    pipeline: SharedPipeline,
) -> Result<Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut mono = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |output: &mut [T], _| {
            fill_output_buffer(output, channels, &pipeline, &mut mono);
        },
        move |err| warn!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}

fn fill_output_buffer<T>(
    output: &mut [T],
    channels: usize,
    pipeline: &SharedPipeline,
    mono: &mut Vec<f32>,
) where
    T: SizedSample + FromSample<f32>,
{
    let frames = output.len() / channels.max(1);
    mono.resize(frames, 0.0);
    lock_pipeline(pipeline).render(mono);
    for (frame, sample) in output.chunks_mut(channels.max(1)).zip(mono.iter()) {
        let value = T::from_sample(*sample);
        for channel in frame {
            *channel = value;
        }
    }
}

// The pipeline holds no invariants a panic could break, so a poisoned lock
// is still safe to use.
fn lock_pipeline(pipeline: &SharedPipeline) -> MutexGuard<'_, SynthPipeline> {
    pipeline
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
