//! Batch conversion

use crate::BatchArgs;
use anyhow::{bail, Context, Result};
use hdrstack_ops::AssetPipeline;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::{info, trace};

/// Expands every pattern, sorted and deduplicated.
fn collect_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let paths = glob::glob(pattern).with_context(|| format!("Invalid pattern: {}", pattern))?;
        files.extend(paths.filter_map(|r| r.ok()).filter(|p| p.is_file()));
    }
    files.sort();
    files.dedup();
    Ok(files)
}

/// Output path of every input; two inputs sharing one output are an error.
fn plan_outputs(pipeline: &AssetPipeline, files: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut owners: HashMap<PathBuf, &Path> = HashMap::new();
    let mut outputs = Vec::with_capacity(files.len());
    for input in files {
        let output = pipeline.output_path(input, Some(output_dir));
        if let Some(first) = owners.insert(output.clone(), input) {
            bail!(
                "{} and {} would both write {}",
                first.display(),
                input.display(),
                output.display()
            );
        }
        outputs.push(output);
    }
    Ok(outputs)
}

/// Runs `f` over `items` on at most `workers` dedicated threads.
///
/// Results come back in input order. Asset workers are plain threads, so
/// a worker waiting on pixel work never picks up a second asset.
fn run_bounded<T, R, F>(items: &[T], workers: usize, f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let next = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();
    std::thread::scope(|scope| {
        for _ in 0..workers.clamp(1, items.len().max(1)) {
            let tx = tx.clone();
            let (next, f) = (&next, &f);
            scope.spawn(move || {
                loop {
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    let Some(item) = items.get(i) else { break };
                    if tx.send((i, f(item))).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut out: Vec<(usize, R)> = rx.into_iter().collect();
    out.sort_by_key(|(i, _)| *i);
    out.into_iter().map(|(_, r)| r).collect()
}

pub fn run(args: BatchArgs, jobs: Option<usize>) -> Result<()> {
    trace!(patterns = ?args.input, "batch::run");

    let files = collect_inputs(&args.input)?;
    if files.is_empty() {
        bail!("No files match: {}", args.input.join(" "));
    }

    let settings = super::load_settings(&args.settings, jobs)?;
    let pipeline = AssetPipeline::new(&settings).context("Invalid color settings")?;
    let outputs = plan_outputs(&pipeline, &files, &args.output_dir)?;
    super::ensure_dir(&args.output_dir)?;

    let workers = settings.worker_count();
    let pixels = rayon::ThreadPoolBuilder::new()
        .thread_name(|i| format!("hdrstack-pixels-{}", i))
        .build()
        .context("Failed to configure thread pool")?;

    info!(files = files.len(), workers, "Starting batch conversion");

    let work: Vec<(&PathBuf, &PathBuf)> = files.iter().zip(&outputs).collect();
    let results = run_bounded(&work, workers, |(input, output)| {
        pixels.install(|| pipeline.process_path(input, None, Some(output.as_path())))
    });

    let mut success = 0;
    let mut failed = 0;
    for ((input, _), result) in work.iter().zip(results) {
        match result {
            Ok(report) => {
                success += 1;
                print!("{}", report);
            }
            Err(e) => {
                failed += 1;
                eprintln!("Error: {}: {}", input.display(), e);
            }
        }
    }

    info!(success, failed, "Batch conversion complete");
    println!("Processed: {} success, {} failed", success, failed);

    if failed > 0 {
        bail!("{} files failed", failed);
    }
    Ok(())
}
