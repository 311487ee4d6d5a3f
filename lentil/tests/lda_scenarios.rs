use approx::assert_abs_diff_eq;
use lentil::em::{run_em, EmSchedule, EmSteps};
use lentil::simulate::{simulate_lda_counts, SimArgs};
use lentil::{ErrorKind, InteractionMatrix, LdaConfig, LdaError, LdaPosterior, LdaRecommender};
use matrix_util::common_io::{create_temp_dir_file, remove_file};
use matrix_util::dmatrix_io::DMatrix;
use matrix_util::mtx_io::write_mtx_triplets;
use matrix_util::traits::DimIoOps;

fn diagonal_2x2() -> anyhow::Result<InteractionMatrix> {
    Ok(InteractionMatrix::from_triplets(
        2,
        2,
        &[(0, 0, 1.0), (1, 1, 1.0)],
    )?)
}

fn config(num_topics: usize, num_rounds: usize, burn_in: usize) -> LdaConfig {
    LdaConfig {
        num_topics,
        num_rounds,
        burn_in,
        show_progress: false,
        ..Default::default()
    }
}

fn assert_invariants(model: &LdaRecommender, total_mass: usize) {
    let stats = model.topic_counts().expect("sampling state");
    assert!(stats.is_consistent());
    assert_eq!(stats.num_tokens(), total_mass);
    assert_eq!(stats.user_topic.sum(), total_mass as f64);
    assert_eq!(stats.topic_item.sum(), total_mass as f64);
}

fn assert_normalized(posterior: &LdaPosterior) {
    for row in posterior.theta.row_iter() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
    for row in posterior.phi.row_iter() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn one_sweep_keeps_both_tokens() -> anyhow::Result<()> {
    let mut model = LdaRecommender::new(diagonal_2x2()?, config(2, 1, 0));

    model.setup()?;
    assert_invariants(&model, 2);

    let round = model.run_round()?;
    assert!(round.accumulated);
    assert_invariants(&model, 2);
    Ok(())
}

#[test]
fn short_run_finalizes_to_distributions() -> anyhow::Result<()> {
    let mut model = LdaRecommender::new(diagonal_2x2()?, config(2, 5, 2));

    let summary = model.train()?;
    assert_eq!(summary.trace.len(), 5);
    assert_eq!(summary.num_accumulated(), 3);

    let posterior = model.posterior()?;
    assert_eq!(posterior.theta.shape(), (2, 2));
    assert_eq!(posterior.phi.shape(), (2, 2));
    assert_normalized(posterior);

    let score = model.predict(0, 0)?;
    assert!(score > 0.0 && score <= 1.0);
    Ok(())
}

#[test]
fn finalize_without_readout_is_a_lifecycle_error() -> anyhow::Result<()> {
    let cfg = config(2, 3, 3);
    let schedule = EmSchedule {
        num_rounds: cfg.num_rounds,
        burn_in: cfg.burn_in,
        thin: cfg.thin,
        show_progress: false,
        verbose: false,
    };

    let mut model = LdaRecommender::new(diagonal_2x2()?, cfg);
    let summary = run_em(&mut model, &schedule)?;
    assert_eq!(summary.num_accumulated(), 0);

    let err = model.finalize().err();
    assert_eq!(err, Some(LdaError::NoAccumulatedStatistics));
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Lifecycle));
    assert!(!model.is_finalized());
    Ok(())
}

#[test]
fn predict_before_training_is_a_lifecycle_error() -> anyhow::Result<()> {
    let mut model = LdaRecommender::new(diagonal_2x2()?, config(2, 5, 2));
    assert_eq!(model.predict(0, 0).err(), Some(LdaError::NotFinalized));

    model.setup()?;
    model.run_round()?;
    let err = model.predict(0, 0).err();
    assert_eq!(err, Some(LdaError::NotFinalized));
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Lifecycle));
    Ok(())
}

#[test]
fn configuration_errors_come_first() -> anyhow::Result<()> {
    let mut model = LdaRecommender::new(diagonal_2x2()?, config(0, 5, 2));
    let err = model.train().err();
    assert_eq!(err, Some(LdaError::InvalidTopicCount(0)));
    assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Configuration));

    let empty = InteractionMatrix::from_triplets(3, 3, &[])?;
    let mut model = LdaRecommender::new(empty, config(2, 5, 2));
    assert_eq!(model.train().err(), Some(LdaError::EmptyInteractions));
    Ok(())
}

#[test]
fn same_seed_same_run() -> anyhow::Result<()> {
    let sim = simulate_lda_counts(&SimArgs {
        users: 30,
        items: 20,
        topics: 3,
        depth: 20,
        ..Default::default()
    })?;

    let run = || -> anyhow::Result<Vec<usize>> {
        let mut model = LdaRecommender::new(sim.train.clone(), config(3, 2, 0));
        model.setup()?;
        model.e_step()?;
        Ok(model
            .topic_counts()
            .map(|s| s.assignments.clone())
            .unwrap_or_default())
    };

    let first = run()?;
    assert_eq!(first.len(), sim.train.total_mass());
    assert_eq!(first, run()?);
    Ok(())
}

#[test]
fn counts_are_conserved_over_many_rounds() -> anyhow::Result<()> {
    let sim = simulate_lda_counts(&SimArgs {
        users: 25,
        items: 15,
        topics: 2,
        depth: 12,
        ..Default::default()
    })?;
    let mass = sim.train.total_mass();

    for parallel_sweep in [false, true] {
        let mut model = LdaRecommender::new(
            sim.train.clone(),
            LdaConfig {
                parallel_sweep,
                ..config(4, 20, 5)
            },
        );
        model.setup()?;
        for _ in 0..20 {
            model.run_round()?;
            assert_invariants(&model, mass);
            let priors = model.priors().expect("sampling state");
            assert!(priors.alpha.iter().all(|&a| a > 0.0 && a.is_finite()));
            assert!(priors.beta.iter().all(|&b| b > 0.0 && b.is_finite()));
        }
        let posterior = model.finalize()?;
        assert_normalized(posterior);
    }
    Ok(())
}

#[test]
fn fit_improves_likelihood_on_simulated_data() -> anyhow::Result<()> {
    let sim = simulate_lda_counts(&SimArgs {
        users: 60,
        items: 30,
        topics: 3,
        depth: 40,
        alpha: 0.1,
        beta: 0.1,
        ..Default::default()
    })?;

    let mut model = LdaRecommender::new(sim.train, config(3, 60, 30));
    let summary = model.train()?;

    let first = summary.trace[0].log_likelihood;
    let last = summary.last().map(|r| r.log_likelihood).unwrap_or(first);
    assert!(last > first, "{} -> {}", first, last);
    Ok(())
}

#[test]
fn persisted_model_predicts_the_same() -> anyhow::Result<()> {
    let sim = simulate_lda_counts(&SimArgs {
        users: 10,
        items: 8,
        topics: 2,
        depth: 10,
        ..Default::default()
    })?;

    let mut model = LdaRecommender::new(sim.train, config(2, 6, 2));
    model.train()?;
    let posterior = model.into_posterior()?;

    let prefix = create_temp_dir_file("lda")?;
    let prefix = prefix.to_str().ok_or(anyhow::anyhow!("path"))?;
    posterior.to_files(prefix)?;

    let loaded = LdaPosterior::from_files(prefix)?;
    assert_eq!(loaded.theta.shape(), posterior.theta.shape());
    assert_eq!(loaded.phi.shape(), posterior.phi.shape());
    assert_eq!(loaded.train.to_triplets(), posterior.train.to_triplets());

    for u in 0..posterior.num_users() {
        for i in 0..posterior.num_items() {
            assert_abs_diff_eq!(loaded.predict(u, i)?, posterior.predict(u, i)?, epsilon = 1e-9);
        }
    }

    for suffix in [".theta.tsv.gz", ".phi.tsv.gz", ".alpha.tsv.gz", ".beta.tsv.gz", ".train.mtx.gz"] {
        remove_file(&(prefix.to_string() + suffix))?;
    }
    Ok(())
}

fn configuration_error(err: &anyhow::Error) -> Option<ErrorKind> {
    err.downcast_ref::<LdaError>()
        .filter(|e| matches!(e, LdaError::DimensionMismatch { .. }))
        .map(|e| e.kind())
}

#[test]
fn declared_dimensions_must_cover_the_file() -> anyhow::Result<()> {
    let file = create_temp_dir_file(".mtx.gz")?;
    let file = file.to_str().ok_or(anyhow::anyhow!("path"))?;
    write_mtx_triplets(&[(0, 0, 1_u32), (3, 4, 2)], 4, 5, file)?;

    let x = InteractionMatrix::from_mtx_file(file, Some((6, 5)))?;
    assert_eq!((x.nrows(), x.ncols()), (6, 5));

    let err = InteractionMatrix::from_mtx_file(file, Some((3, 5)))
        .err()
        .ok_or(anyhow::anyhow!("3 users cannot hold a 4-row file"))?;
    assert_eq!(configuration_error(&err), Some(ErrorKind::Configuration));

    let err = InteractionMatrix::from_mtx_file(file, Some((4, 2)))
        .err()
        .ok_or(anyhow::anyhow!("2 items cannot hold a 5-column file"))?;
    assert_eq!(configuration_error(&err), Some(ErrorKind::Configuration));

    remove_file(file)?;
    Ok(())
}

#[test]
fn persisted_theta_and_phi_must_agree_on_topics() -> anyhow::Result<()> {
    let sim = simulate_lda_counts(&SimArgs {
        users: 10,
        items: 8,
        topics: 2,
        depth: 10,
        ..Default::default()
    })?;

    let mut model = LdaRecommender::new(sim.train, config(2, 3, 1));
    model.train()?;

    let prefix = create_temp_dir_file("lda")?;
    let prefix = prefix.to_str().ok_or(anyhow::anyhow!("path"))?;
    model.posterior()?.to_files(prefix)?;

    // three topics in theta against two in phi
    let theta = DMatrix::<f64>::from_element(10, 3, 1.0 / 3.0);
    theta.write_with_dims(&(prefix.to_string() + ".theta.tsv.gz"))?;

    let err = LdaPosterior::from_files(prefix)
        .err()
        .ok_or(anyhow::anyhow!("theta and phi disagree"))?;
    assert_eq!(configuration_error(&err), Some(ErrorKind::Configuration));

    for suffix in [".theta.tsv.gz", ".phi.tsv.gz", ".alpha.tsv.gz", ".beta.tsv.gz", ".train.mtx.gz"] {
        remove_file(&(prefix.to_string() + suffix))?;
    }
    Ok(())
}
