use std::sync::{Arc, Mutex};
use std::time::Duration;

use meter_core::{MeterHandle, MeterRenderer, OutputSink, SilentRenderer, WorkerMsg};
use meter_engine::{
    MeterError, MeterManager, MeterManagerOptions, AGGREGATE_REFRESH_INTERVAL,
};
use pretty_assertions::assert_eq;
use tokio::time::timeout;

const TEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
enum RenderCall {
    Created { description: String },
    Advanced { amount: u64, label: String },
    Completed { label: String },
}

#[derive(Default)]
struct RecordingRenderer {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl RecordingRenderer {
    fn take(&self) -> Vec<RenderCall> {
        self.calls.lock().unwrap().drain(..).collect()
    }
}

impl MeterRenderer for RecordingRenderer {
    fn create(
        &self,
        _total_steps: u64,
        description: &str,
        _sink: OutputSink,
        _display_offset: usize,
    ) -> Arc<dyn MeterHandle> {
        self.calls.lock().unwrap().push(RenderCall::Created {
            description: description.to_string(),
        });
        Arc::new(RecordingHandle {
            calls: self.calls.clone(),
        })
    }
}

struct RecordingHandle {
    calls: Arc<Mutex<Vec<RenderCall>>>,
}

impl MeterHandle for RecordingHandle {
    fn advance(&self, amount: u64, label: &str) {
        self.calls.lock().unwrap().push(RenderCall::Advanced {
            amount,
            label: label.to_string(),
        });
    }

    fn force_complete(&self, label: &str) {
        self.calls.lock().unwrap().push(RenderCall::Completed {
            label: label.to_string(),
        });
    }
}

fn new_manager(job_count: u64) -> Result<MeterManager, MeterError> {
    MeterManager::new(
        job_count,
        Arc::new(SilentRenderer),
        MeterManagerOptions::default(),
    )
}

async fn shutdown_within_timeout(manager: &mut MeterManager) {
    timeout(TEST_TIMEOUT, manager.shutdown())
        .await
        .expect("shutdown timed out");
}

#[tokio::test]
async fn construction_validates_job_count() {
    meter_logging::initialize_for_tests();
    let err = match new_manager(0) {
        Ok(_) => panic!("zero job count must not construct"),
        Err(err) => err,
    };
    assert_eq!(err, MeterError::InvalidJobCount { job_count: 0 });

    let manager = new_manager(3).expect("positive job count");
    assert_eq!(manager.aggregate_counts(), (0, 3));
    assert!(!manager.is_complete());
    assert_eq!(manager.fraction(), 0.0);
}

#[tokio::test]
async fn tracks_worker_and_job_progress_end_to_end() {
    let mut manager = new_manager(3).unwrap();
    manager.start();
    let workers = manager.worker_mailbox();
    let completions = manager.completion_mailbox();

    workers
        .send(WorkerMsg::Start {
            worker_id: 1,
            total_steps: 5,
            description: "W".to_string(),
        })
        .await
        .unwrap();
    for _ in 0..4 {
        workers
            .send(WorkerMsg::StepUpdate {
                worker_id: 1,
                step_delta: 1,
                info: String::new(),
            })
            .await
            .unwrap();
    }
    completions.send(true).await.unwrap();

    // Stop closes the worker mailbox; shutdown awaits the drain.
    workers.send(WorkerMsg::Stop).await.unwrap();
    shutdown_within_timeout(&mut manager).await;

    let status = manager.worker_status(1).expect("worker seen via Start");
    assert_eq!(status.completed_steps, 4);
    assert_eq!(status.total_steps, 5);
    assert_eq!(manager.aggregate_counts(), (1, 3));
    assert!(workers.is_closed());
    assert!(completions.is_closed());
}

#[tokio::test]
async fn step_overflow_clamps_to_total() {
    let mut manager = new_manager(1).unwrap();
    manager.start();
    let workers = manager.worker_mailbox();

    workers
        .send(WorkerMsg::Start {
            worker_id: 1,
            total_steps: 3,
            description: "W".to_string(),
        })
        .await
        .unwrap();
    workers
        .send(WorkerMsg::StepUpdate {
            worker_id: 1,
            step_delta: 5,
            info: String::new(),
        })
        .await
        .unwrap();
    shutdown_within_timeout(&mut manager).await;

    // Clamped to the total, not to completed + delta.
    let status = manager.worker_status(1).unwrap();
    assert_eq!(status.completed_steps, 3);
    assert_eq!(status.fraction, 1.0);
}

#[tokio::test]
async fn updates_without_start_are_dropped() {
    let mut manager = new_manager(1).unwrap();
    manager.start();
    let workers = manager.worker_mailbox();

    workers
        .send(WorkerMsg::StepUpdate {
            worker_id: 9,
            step_delta: 1,
            info: String::new(),
        })
        .await
        .unwrap();
    workers
        .send(WorkerMsg::Finished {
            worker_id: 9,
            description: "done".to_string(),
        })
        .await
        .unwrap();
    shutdown_within_timeout(&mut manager).await;

    assert_eq!(manager.worker_status(9), None);
}

#[tokio::test]
async fn stop_closes_worker_mailbox() {
    let mut manager = new_manager(1).unwrap();
    manager.start();
    let workers = manager.worker_mailbox();

    workers.send(WorkerMsg::Stop).await.unwrap();
    timeout(TEST_TIMEOUT, async {
        while !workers.is_closed() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener never closed the mailbox");

    assert_eq!(
        workers.try_send(WorkerMsg::Stop),
        Err(MeterError::MailboxClosed)
    );
    // The listener already exited; shutdown still accounts for it.
    shutdown_within_timeout(&mut manager).await;
}

#[tokio::test]
async fn surplus_completion_signals_clamp_at_total() {
    let mut manager = new_manager(3).unwrap();
    manager.start();
    let completions = manager.completion_mailbox();

    for _ in 0..5 {
        completions.send(true).await.unwrap();
    }
    shutdown_within_timeout(&mut manager).await;

    assert_eq!(manager.aggregate_counts(), (3, 3));
    assert!(manager.is_complete());
}

#[tokio::test]
async fn surplus_completion_render_stays_in_step_with_counter() {
    let renderer = Arc::new(RecordingRenderer::default());
    let mut manager =
        MeterManager::new(3, renderer.clone(), MeterManagerOptions::default()).unwrap();
    manager.start();
    let completions = manager.completion_mailbox();

    for _ in 0..5 {
        completions.send(true).await.unwrap();
    }
    shutdown_within_timeout(&mut manager).await;

    // The bar advanced exactly as far as the clamped counter, no further.
    assert_eq!(manager.aggregate_counts(), (3, 3));
    let rendered: u64 = renderer
        .take()
        .iter()
        .map(|call| match call {
            RenderCall::Advanced { amount, .. } => *amount,
            _ => 0,
        })
        .sum();
    assert_eq!(rendered, 3);
}

#[tokio::test(start_paused = true)]
async fn refresher_rerenders_aggregate_on_interval() {
    let renderer = Arc::new(RecordingRenderer::default());
    let mut manager =
        MeterManager::new(3, renderer.clone(), MeterManagerOptions::default()).unwrap();
    manager.start();

    // Let the detached first-frame refresh fire, then discard it.
    tokio::time::sleep(Duration::from_secs(1)).await;
    renderer.take();

    tokio::time::sleep(AGGREGATE_REFRESH_INTERVAL + Duration::from_secs(1)).await;

    // One zero-advance re-render at the current value; the counter itself
    // is untouched.
    assert_eq!(
        renderer.take(),
        vec![RenderCall::Advanced {
            amount: 0,
            label: "Jobs: 0 / 3".to_string(),
        }]
    );
    assert_eq!(manager.aggregate_counts(), (0, 3));

    shutdown_within_timeout(&mut manager).await;
}
