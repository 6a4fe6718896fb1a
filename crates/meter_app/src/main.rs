//! Demo binary: simulated workers reporting into the meter manager.
//!
//! Each simulated worker is one job; it announces itself, advances step by
//! step, reports finished, then signals one job completion.

mod logging;
mod render;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use meter_core::{OutputSink, WorkerId, WorkerMsg};
use meter_engine::{Mailbox, MeterError, MeterManager, MeterManagerOptions};

#[derive(Parser, Debug)]
#[command(name = "meter_app", about = "Aggregated progress bars for simulated workers")]
struct CliArgs {
    /// Number of jobs tracked by the aggregate meter; defaults to one per
    /// simulated worker.
    #[arg(long)]
    jobs: Option<u64>,
    /// Number of simulated workers (one job each).
    #[arg(long, default_value_t = 4)]
    workers: u64,
    /// Steps each simulated worker performs.
    #[arg(long, default_value_t = 20)]
    steps: u64,
    /// Draw bars on stdout instead of stderr.
    #[arg(long)]
    stdout: bool,
    /// Log at debug level.
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    logging::initialize(args.verbose);

    let sink = if args.stdout {
        OutputSink::Stdout
    } else {
        OutputSink::Stderr
    };
    let renderer = Arc::new(render::IndicatifRenderer::new(sink));
    let jobs = args.jobs.unwrap_or(args.workers);
    let known_workers: Vec<WorkerId> = (1..=args.workers).collect();
    let mut manager = MeterManager::new(
        jobs,
        renderer,
        MeterManagerOptions {
            sink,
            known_workers,
            ..Default::default()
        },
    )?;
    manager.start();

    let mut producers = Vec::new();
    for worker_id in 1..=args.workers {
        let worker_mailbox = manager.worker_mailbox();
        let completion_mailbox = manager.completion_mailbox();
        let steps = args.steps;
        producers.push(tokio::spawn(async move {
            simulate_worker(worker_mailbox, completion_mailbox, worker_id, steps).await
        }));
    }

    for producer in producers {
        match producer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("simulated worker stopped early: {err}"),
            Err(err) => log::error!("simulated worker panicked: {err}"),
        }
    }

    manager.shutdown().await;

    let (completed, total) = manager.aggregate_counts();
    println!("Jobs complete: {completed} / {total}");
    Ok(())
}

async fn simulate_worker(
    worker_mailbox: Mailbox<WorkerMsg>,
    completion_mailbox: Mailbox<bool>,
    worker_id: WorkerId,
    steps: u64,
) -> Result<(), MeterError> {
    worker_mailbox
        .send(WorkerMsg::Start {
            worker_id,
            total_steps: steps,
            description: format!("worker {worker_id}"),
        })
        .await?;

    for step in 1..=steps {
        // Stagger workers so the bars advance visibly out of lockstep.
        tokio::time::sleep(Duration::from_millis(40 + worker_id * 15)).await;
        worker_mailbox
            .send(WorkerMsg::StepUpdate {
                worker_id,
                step_delta: 1,
                info: format!("step {step}"),
            })
            .await?;
    }

    worker_mailbox
        .send(WorkerMsg::Finished {
            worker_id,
            description: format!("worker {worker_id} done"),
        })
        .await?;
    completion_mailbox.send(true).await?;
    Ok(())
}
