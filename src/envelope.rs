// Time constant of the rise toward full gain, in seconds.
const RISE_TIME_CONSTANT: f32 = 0.0001;
const SILENCE: f32 = 0.0001;

#[derive(Clone, Copy, Debug, PartialEq)]
enum EnvStage {
    Idle,
    Rise { remaining: f32 },
    Decay,
}

/// Percussive gain envelope: exponential approach to 1 for the rise time,
/// then exponential fall toward 0 with the note's decay time constant.
#[derive(Clone, Debug)]
pub struct Envelope {
    value: f32,
    stage: EnvStage,
    rise_time: f32,
    decay: f32,
}

impl Envelope {
    pub fn new(rise_time: f32) -> Self {
        Self {
            value: 0.0,
            stage: EnvStage::Idle,
            rise_time: rise_time.max(0.0),
            decay: 0.0,
        }
    }

    pub fn trigger(&mut self, decay: f32) {
        self.value = 0.0;
        self.decay = decay;
        self.stage = EnvStage::Rise {
            remaining: self.rise_time,
        };
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.stage, EnvStage::Idle)
    }

    pub fn advance(&mut self, dt: f32) -> f32 {
        match self.stage {
            EnvStage::Idle => {
                self.value = 0.0;
            }
            EnvStage::Rise { remaining } => {
                self.value = approach(self.value, 1.0, dt, RISE_TIME_CONSTANT);
                let remaining = remaining - dt;
                self.stage = if remaining <= 0.0 {
                    EnvStage::Decay
                } else {
                    EnvStage::Rise { remaining }
                };
            }
            EnvStage::Decay => {
                self.value = approach(self.value, 0.0, dt, self.decay);
                if self.value <= SILENCE {
                    self.value = 0.0;
                    self.stage = EnvStage::Idle;
                }
            }
        }
        self.value.clamp(0.0, 1.0)
    }
}

/// One step of an exponential approach toward `target`. A non-positive time
/// constant lands on the target immediately.
fn approach(value: f32, target: f32, dt: f32, time_constant: f32) -> f32 {
    if time_constant <= 0.0 {
        return target;
    }
    let step = 1.0 - (-dt / time_constant).exp();
    value + (target - value) * step
}

/// One-pole smoother used for parameters that must not jump.
#[derive(Clone, Debug)]
pub struct Smoothed {
    current: f32,
    target: f32,
    time_constant: f32,
}

impl Smoothed {
    pub fn new(value: f32, time_constant: f32) -> Self {
        Self {
            current: value,
            target: value,
            time_constant,
        }
    }

    pub fn set(&mut self, target: f32) {
        self.target = target;
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn next(&mut self, dt: f32) -> f32 {
        self.current = approach(self.current, self.target, dt, self.time_constant);
        self.current
    }
}
