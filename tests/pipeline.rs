use u_arrange::models::{NoteEvent, Score, Voice};
use u_arrange::pipeline::{Reducer, ReductionConfig, SolveMode};
use u_arrange::segmentation::PhraseCache;
use u_arrange::solver::{AnnealConfig, ExhaustiveSolver, ResultStore, SimulatedAnnealingSolver};
use u_arrange::ArrangeError;

/// A voice with notes in every measure: a rising figure, then a held note.
fn voice(base: f64, measures: u32, figure: &[f64]) -> Voice {
    let mut v = Voice::new().with_name(format!("part {base}"));
    for m in 1..=measures {
        let t = f64::from(m - 1) * 4.0;
        let step = figure[(m as usize - 1) % figure.len()];
        v.push(NoteEvent::new(base + step, t, 1.0, m));
        v.push(NoteEvent::new(base + step + 2.0, t + 1.0, 1.0, m));
        v.push(NoteEvent::new(base, t + 2.0, 2.0, m));
    }
    v
}

fn quartet() -> Score {
    Score::new(6)
        .with_voice(voice(72.0, 6, &[0.0, 2.0, 4.0]))
        .with_voice(voice(67.0, 6, &[5.0, 0.0]))
        .with_voice(voice(60.0, 6, &[1.0]))
}

#[test]
fn test_full_reduction_with_exhaustive_solver() {
    // Three voices onto three tracks: every measure is covered by exactly
    // three jobs, so taking all of them is the unique zero-penalty optimum.
    let config = ReductionConfig::default().with_tracks(3).with_num_measures(4);
    let mut reducer = Reducer::new(config, ExhaustiveSolver::new());
    let score = quartet();
    let reduction = reducer.reduce("quartet", &score).unwrap();

    assert_eq!(reduction.phrases.len(), 3);
    assert!(reduction
        .phrases
        .iter()
        .flatten()
        .all(|p| p.len() <= 4 && p.end_measure <= 4));

    let best = reduction.report.best_entropy().unwrap();
    assert!(best.feasible);
    assert_eq!(best.selected.len(), reduction.jobs.len());
    let total: f64 = reduction.jobs.iter().map(|j| j.weight).sum();
    assert!((best.entropy - total).abs() < 1e-9);
    assert!((best.sample.energy + total).abs() < 1e-9);

    let schedule = reduction.best_entropy.as_ref().unwrap();
    assert!(schedule.is_complete());
    assert!(!schedule.has_overlaps());
    for track in schedule.measure_plan() {
        let measures: Vec<i32> = track.iter().map(|r| r.measure).collect();
        assert_eq!(measures, vec![1, 2, 3, 4]);
    }
}

#[test]
fn test_every_sample_energy_matches_model() {
    let config = ReductionConfig::default().with_num_measures(4);
    let mut reducer = Reducer::new(config, ExhaustiveSolver::new());
    let reduction = reducer.reduce("quartet", &quartet()).unwrap();
    for s in &reduction.samples {
        let direct = reduction.model.energy(&s.assignment);
        assert!((s.energy - direct).abs() < 1e-6);
    }
    // Feasible samples always schedule without loss.
    for s in reduction.report.samples.iter().filter(|s| s.feasible) {
        let selected = reduction.jobs.subset(&s.selected);
        let schedule = u_arrange::scheduler::ScheduleBuilder::new(2).build(&selected);
        assert!(schedule.is_complete());
    }
}

#[test]
fn test_annealer_returns_consistent_report() {
    let config = ReductionConfig::default()
        .with_num_measures(4)
        .with_anneal(AnnealConfig::default().with_num_reads(16).with_num_sweeps(200).with_seed(5));
    let mut reducer = Reducer::with_annealer(config);
    let reduction = reducer.reduce("quartet", &quartet()).unwrap();

    assert!(!reduction.samples.is_empty());
    let costs: Vec<f64> = reduction.report.samples.iter().map(|s| s.cost).collect();
    assert!(costs.windows(2).all(|w| w[0] <= w[1]));
    if let Some(schedule) = &reduction.best_entropy {
        assert!(schedule.is_complete());
        assert!(!schedule.has_overlaps());
    }
}

#[test]
fn test_save_then_load_result() {
    let dir = tempfile::tempdir().unwrap();
    let store = ResultStore::new(dir.path().join("results"));
    let config = ReductionConfig::default().with_num_measures(4);

    let mut solving =
        Reducer::new(config.clone(), ExhaustiveSolver::new()).with_store(store.clone());
    let solved = solving.reduce("quartet", &quartet()).unwrap();
    assert!(store.contains("quartet"));

    let mut loading = Reducer::new(config, SimulatedAnnealingSolver::default())
        .with_store(store)
        .with_mode(SolveMode::Load);
    let loaded = loading.reduce("quartet", &quartet()).unwrap();
    assert_eq!(loaded.samples, solved.samples);
    assert_eq!(
        loaded.report.best_entropy().map(|s| s.selected.clone()),
        solved.report.best_entropy().map(|s| s.selected.clone())
    );
}

#[test]
fn test_load_without_saved_result() {
    let dir = tempfile::tempdir().unwrap();
    let mut reducer = Reducer::new(ReductionConfig::default(), ExhaustiveSolver::new())
        .with_store(ResultStore::new(dir.path()))
        .with_mode(SolveMode::Load);
    let err = reducer
        .reduce("unknown", &quartet().truncated(4))
        .unwrap_err();
    assert!(matches!(err, ArrangeError::MissingResult(_)));
}

#[test]
fn test_phrase_cache_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let cache = PhraseCache::new(dir.path());
    let config = ReductionConfig::default().with_num_measures(4);
    let mut reducer = Reducer::new(config, ExhaustiveSolver::new()).with_cache(cache.clone());

    let first = reducer.reduce("quartet", &quartet()).unwrap();
    let entries = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(entries, 3);
    let second = reducer.reduce("quartet", &quartet()).unwrap();
    assert_eq!(first.phrases, second.phrases);
}

#[test]
fn test_missing_score_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Score::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ArrangeError::MissingScore(_)));
}

#[test]
fn test_score_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quartet.json");
    let score = quartet();
    score.to_json_file(&path).unwrap();
    assert_eq!(Score::from_json_file(&path).unwrap(), score);
}
