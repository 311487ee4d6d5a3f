use crate::common::setup_run;
use clap::{Parser, ValueEnum};
use fnv::FnvHashSet as HashSet;
use lentil::{InteractionMatrix, LdaPosterior};
use log::info;
use matrix_util::common_io::{read_lines_of_words, write_lines};
use rayon::prelude::*;
use rec_eval::{MetricRegistry, RecommendedList};

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum EvalMode {
    Ranking,
    Rating,
}

#[derive(Parser, Debug, Clone)]
pub struct EvalArgs {
    #[arg(required = true,
          help = "Model prefix given to `fit --out`")]
    model: Box<str>,

    #[arg(long, short = 't', required = true,
          help = "Held-out interactions (.mtx or .mtx.gz)")]
    test_file: Box<str>,

    #[arg(long, value_enum, default_value = "ranking",
          help = "Ranking (top-N lists) or rating (per-cell scores)")]
    mode: EvalMode,

    #[arg(long, short = 'n', default_value_t = 10,
          help = "Length of recommendation lists")]
    top_n: usize,

    #[arg(long, short = 'm', value_delimiter(','),
          help = "Metrics to report (comma separated)",
          long_help = "Metrics to report (comma separated).\n\
                       Ranking: precision, recall, auc, ndcg, ap, rr, hit, icov, dpcf\n\
                       Rating: rmse, mse, mae, value_unfairness, absolute_unfairness\n\
                       Default: every registered metric of the mode.")]
    metrics: Option<Vec<Box<str>>>,

    #[arg(long,
          help = "File of protected user indices (one per line)",
          long_help = "File of protected user indices, one 0-based index per line.\n\
                       Enables the fairness metrics.")]
    protected_file: Option<Box<str>>,

    #[arg(long, help = "Number of threads (default: all logical CPUs)")]
    threads: Option<usize>,

    #[arg(long, short,
          help = "Output file prefix; writes {out}.metrics.tsv (default: stdout)")]
    out: Option<Box<str>>,

    #[arg(long, short,
          help = "Enable verbose logging (sets RUST_LOG=info)")]
    verbose: bool,
}

pub fn run_evaluate(args: &EvalArgs) -> anyhow::Result<()> {
    setup_run(args.verbose, args.threads)?;

    let model = LdaPosterior::from_files(&args.model)?;
    info!(
        "model: {} users, {} items, {} topics",
        model.num_users(),
        model.num_items(),
        model.num_topics()
    );

    let test = InteractionMatrix::from_mtx_file(
        &args.test_file,
        Some((model.num_users(), model.num_items())),
    )?;

    let ground_truth = RecommendedList::from_triplets(
        test.nrows(),
        test.iter_nonzero().map(|(u, i, c)| (u, i, c as f64)),
    );

    let mut registry = match args.mode {
        EvalMode::Ranking => MetricRegistry::ranking(args.top_n, model.num_items()),
        EvalMode::Rating => MetricRegistry::rating(),
    };

    if let Some(file) = args.protected_file.as_ref() {
        let protected = read_lines_of_words(file, -1)?
            .lines
            .into_iter()
            .filter_map(|words| words.first().map(|w| w.parse::<usize>()))
            .collect::<Result<HashSet<usize>, _>>()?;
        registry = registry.with_fairness(protected, args.top_n);
    }

    let names: Vec<String> = match args.metrics.as_ref() {
        Some(names) => names.iter().map(|x| x.to_string()).collect(),
        None => default_metrics(&args.mode, args.protected_file.is_some()),
    };

    let predictions = match args.mode {
        EvalMode::Ranking => {
            let lists = (0..model.num_users())
                .into_par_iter()
                .map(|u| model.recommend(u, args.top_n, Some(&model.train)))
                .collect::<Result<Vec<_>, _>>()?;
            RecommendedList::from_lists(lists)
        }
        EvalMode::Rating => {
            let triplets = test
                .iter_nonzero()
                .map(|(u, i, _)| Ok((u, i, model.predict(u, i)?)))
                .collect::<anyhow::Result<Vec<_>>>()?;
            RecommendedList::from_triplets(model.num_users(), triplets)
        }
    };

    let values = registry.evaluate_all(&names, &ground_truth, &predictions)?;

    let lines: Vec<Box<str>> = values
        .iter()
        .map(|(name, value)| format!("{}\t{}", name, value).into_boxed_str())
        .collect();

    match args.out.as_ref() {
        Some(out) => {
            let file = out.to_string() + ".metrics.tsv";
            write_lines(&lines, &file)?;
            info!("wrote {}", file);
        }
        None => write_lines(&lines, "stdout")?,
    }
    Ok(())
}

fn default_metrics(mode: &EvalMode, fairness: bool) -> Vec<String> {
    let mut names = match mode {
        EvalMode::Ranking => vec!["precision", "recall", "auc", "ndcg", "ap", "rr", "hit", "icov"],
        EvalMode::Rating => vec!["rmse", "mse", "mae"],
    };
    if fairness {
        match mode {
            EvalMode::Ranking => names.push("dpcf"),
            EvalMode::Rating => names.extend(["value_unfairness", "absolute_unfairness"]),
        }
    }
    names.into_iter().map(|x| x.to_string()).collect()
}
