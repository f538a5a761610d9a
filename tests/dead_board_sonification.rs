use life_synth::automaton::Board;
use life_synth::make_rng;
use life_synth::mapper::{ScaleLayout, Schedule, SonificationMapper, VoiceBankConfig};
use life_synth::mixer::Mixer;
use life_synth::output::SynthPipeline;

#[test]
fn dead_board_for_300_generations() {
    let (mut mapper, bank) = SonificationMapper::new(
        Schedule::default(),
        ScaleLayout::default(),
        &VoiceBankConfig::default(),
        make_rng(Some(2024)),
    );
    let mut pipeline = SynthPipeline::new(bank, Mixer::default());
    pipeline.set_sample_rate(48_000.0);
    let mut block = vec![0.0; 256];
    let board = Board::new(30, 80);

    let mut key_change_generations = Vec::new();
    let mut roots = Vec::new();
    let mut drum_checks = 0;
    for generation in 0..300u64 {
        let report = mapper.step(&board, generation);
        assert_eq!(report.active, 0);
        assert_eq!(report.average_age, 0.0);
        assert_eq!(report.decay_const, 0.0);
        roots.push(report.root);
        if report.key_changed {
            key_change_generations.push(generation);
        }
        if let Some(bass) = report.bass {
            assert_eq!(bass.decay, 0.0);
        }
        if let Some(age) = report.age {
            assert_eq!(age.decay, 0.0);
        }
        assert!(report.drum.is_none(), "drum fired at {generation}");
        if generation != 0 && generation % 16 == 0 {
            assert!(report.drum_suppressed);
            drum_checks += 1;
        }
        pipeline.render(&mut block);
        assert!(block.iter().all(|sample| sample.is_finite()));
    }

    assert_eq!(key_change_generations, vec![192]);
    assert_eq!(mapper.key_changes(), 1);
    // The root holds before the change and keeps the drawn key after it.
    assert!(roots[..192].iter().all(|root| *root == 0));
    assert!(roots[192..].iter().all(|root| *root == mapper.root()));
    assert_eq!(drum_checks, 18);
    assert_eq!(mapper.drum_voice().triggers(), 0);
    assert_eq!(mapper.bass_voice().last_decay(), Some(0.0));
    assert_eq!(mapper.age_voice().last_decay(), Some(0.0));
    assert!(Schedule::default().key_candidates.contains(&mapper.root()));
}

#[test]
fn root_moves_once_to_the_only_candidate() {
    let (mut mapper, _bank) = SonificationMapper::new(
        Schedule {
            key_candidates: vec![6],
            ..Schedule::default()
        },
        ScaleLayout::default(),
        &VoiceBankConfig::default(),
        make_rng(Some(7)),
    );
    let board = Board::new(30, 80);
    let roots: Vec<usize> = (0..300)
        .map(|generation| mapper.step(&board, generation).root)
        .collect();
    assert!(roots[..192].iter().all(|root| *root == 0));
    assert!(roots[192..].iter().all(|root| *root == 6));
    let changes = roots.windows(2).filter(|pair| pair[0] != pair[1]).count();
    assert_eq!(changes, 1);
    assert_eq!(mapper.root(), 6);
}

#[test]
fn same_seed_same_keys() {
    let run = |seed| {
        let (mut mapper, _bank) = SonificationMapper::new(
            Schedule {
                key_change: 8,
                ..Schedule::default()
            },
            ScaleLayout::default(),
            &VoiceBankConfig::default(),
            make_rng(Some(seed)),
        );
        let board = Board::new(8, 8);
        (0..200)
            .map(|generation| mapper.step(&board, generation).root)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(5), run(5));
}
