use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Generative music from a toroidal life board")]
pub struct Args {
    /// Path to config TOML (written with defaults if missing)
    #[arg(long, default_value = "life-synth.toml")]
    pub config: String,

    /// Seed for the board and key changes
    #[arg(long)]
    pub seed: Option<u64>,

    /// Run without opening an audio device
    #[arg(long, default_value_t = false)]
    pub mute: bool,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["life-synth"]);
        assert_eq!(args.config, "life-synth.toml");
        assert_eq!(args.seed, None);
        assert!(!args.mute);
        assert!(!args.verbose);
    }

    #[test]
    fn flags() {
        let args = Args::parse_from(["life-synth", "--seed", "42", "--mute", "-v", "--config", "x.toml"]);
        assert_eq!(args.seed, Some(42));
        assert!(args.mute);
        assert!(args.verbose);
        assert_eq!(args.config, "x.toml");
    }
}
