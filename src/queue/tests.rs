use super::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
struct RecordingHandler {
    session_missing: AtomicBool,
    panic_on_execute: AtomicBool,
    scripted: Mutex<VecDeque<Result<(), VehicleError>>>,
    executed: Mutex<Vec<(CommandKind, Instant)>>,
    outcomes: Mutex<Vec<(CommandKind, CommandOutcome)>>,
    relogins: AtomicUsize,
    aborted: AtomicBool,
}

impl RecordingHandler {
    fn script(&self, results: impl IntoIterator<Item = Result<(), VehicleError>>) {
        self.scripted.lock().unwrap().extend(results);
    }

    fn executed_kinds(&self) -> Vec<CommandKind> {
        self.executed.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }

    fn executed_at(&self) -> Vec<Instant> {
        self.executed.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    fn outcomes(&self) -> Vec<(CommandKind, CommandOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }
}

impl CommandHandler for RecordingHandler {
    fn has_session(&self) -> bool {
        !self.session_missing.load(Ordering::SeqCst)
    }

    fn execute<'a>(&'a self, command: &'a Command) -> BoxFuture<'a, Result<(), VehicleError>> {
        Box::pin(async move {
            if self.panic_on_execute.load(Ordering::SeqCst) {
                panic!("vehicle client blew up");
            }
            self.executed
                .lock()
                .unwrap()
                .push((command.kind(), Instant::now()));
            self.scripted.lock().unwrap().pop_front().unwrap_or(Ok(()))
        })
    }

    fn reauthenticate(&self) -> BoxFuture<'_, Result<(), VehicleError>> {
        Box::pin(async move {
            self.relogins.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn on_start(&self, _command: &Command) {}

    fn on_outcome(&self, command: &Command, outcome: &CommandOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .push((command.kind(), outcome.clone()));
    }

    fn on_abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }
}

fn queue_for(handler: &Arc<RecordingHandler>) -> CommandQueue {
    let handler: Arc<dyn CommandHandler> = handler.clone();
    let queue = CommandQueue::new(QueueConfig::default(), Arc::downgrade(&handler));
    queue.enable();
    queue
}

async fn settle() {
    time::sleep(Duration::from_secs(600)).await;
}

#[tokio::test(start_paused = true)]
async fn executes_in_submission_order() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    assert!(queue.enqueue(Command::Lock));
    assert!(queue.enqueue(Command::Unlock));
    assert!(queue.enqueue(Command::StartCharge));
    assert!(queue.enqueue(Command::poll()));
    settle().await;

    assert_eq!(
        handler.executed_kinds(),
        vec![
            CommandKind::Lock,
            CommandKind::Unlock,
            CommandKind::StartCharge,
            CommandKind::Poll
        ]
    );
    assert!(!queue.is_running());
    assert!(queue.is_empty());
}

#[tokio::test(start_paused = true)]
async fn lock_then_poll_is_paced_by_post_wait() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);
    let t0 = Instant::now();

    queue.enqueue(Command::Lock);
    queue.enqueue(Command::poll());
    settle().await;

    assert_eq!(
        handler.executed_kinds(),
        vec![CommandKind::Lock, CommandKind::Poll]
    );
    let at = handler.executed_at();
    assert_eq!(at[0], t0);
    assert_eq!(at[1], t0 + Duration::from_secs(5));
    assert_eq!(queue.last_executed(), Some(CommandKind::Poll));
}

#[tokio::test(start_paused = true)]
async fn user_command_gets_confirmation_poll() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);
    let t0 = Instant::now();

    queue.enqueue(Command::StartClimate(Default::default()));
    settle().await;

    assert_eq!(
        handler.executed_kinds(),
        vec![CommandKind::StartClimate, CommandKind::Poll]
    );
    assert_eq!(handler.executed_at()[1], t0 + Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn poll_alone_does_not_chain_another_poll() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    queue.enqueue(Command::forced_poll());
    settle().await;

    assert_eq!(handler.executed_kinds(), vec![CommandKind::Poll]);
}

#[tokio::test(start_paused = true)]
async fn overflow_drops_new_commands() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    // The consumer has not been polled yet, so nothing drains in between.
    for _ in 0..10 {
        assert!(queue.enqueue(Command::poll()));
    }
    assert!(!queue.enqueue(Command::Lock));
    assert_eq!(queue.len(), 10);

    settle().await;
    let kinds = handler.executed_kinds();
    assert_eq!(kinds.len(), 10);
    assert!(kinds.iter().all(|k| *k == CommandKind::Poll));
}

#[tokio::test(start_paused = true)]
async fn retry_code_waits_relogs_and_retries_once() {
    let handler = Arc::new(RecordingHandler::default());
    handler.script([Err(VehicleError::remote("4004", "duplicate request")), Ok(())]);
    let queue = queue_for(&handler);
    let t0 = Instant::now();

    queue.enqueue(Command::Lock);
    settle().await;

    let at = handler.executed_at();
    assert_eq!(
        handler.executed_kinds(),
        vec![CommandKind::Lock, CommandKind::Lock, CommandKind::Poll]
    );
    assert_eq!(at[1], t0 + Duration::from_secs(60));
    assert_eq!(handler.relogins.load(Ordering::SeqCst), 1);
    assert_eq!(
        handler.outcomes()[0],
        (CommandKind::Lock, CommandOutcome::Succeeded { retried: true })
    );
}

#[tokio::test(start_paused = true)]
async fn second_retry_failure_is_final() {
    let handler = Arc::new(RecordingHandler::default());
    let busy = VehicleError::remote("5091", "rate limited");
    handler.script([Err(busy.clone()), Err(busy.clone())]);
    let queue = queue_for(&handler);

    queue.enqueue(Command::Unlock);
    settle().await;

    let outcomes = handler.outcomes();
    assert_eq!(outcomes[0], (CommandKind::Unlock, CommandOutcome::Failed(busy)));
    let unlocks = handler
        .executed_kinds()
        .into_iter()
        .filter(|k| *k == CommandKind::Unlock)
        .count();
    assert_eq!(unlocks, 2);
}

#[tokio::test(start_paused = true)]
async fn other_failures_are_not_retried() {
    let handler = Arc::new(RecordingHandler::default());
    let error = VehicleError::remote("9999", "vehicle asleep");
    handler.script([Err(error.clone())]);
    let queue = queue_for(&handler);

    queue.enqueue(Command::Lock);
    settle().await;

    assert_eq!(
        handler.outcomes(),
        vec![
            (CommandKind::Lock, CommandOutcome::Failed(error)),
            (CommandKind::Poll, CommandOutcome::Succeeded { retried: false }),
        ]
    );
    assert_eq!(handler.relogins.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_session_skips_execution() {
    let handler = Arc::new(RecordingHandler::default());
    handler.session_missing.store(true, Ordering::SeqCst);
    let queue = queue_for(&handler);

    queue.enqueue(Command::Lock);
    settle().await;

    assert!(handler.executed_kinds().is_empty());
    assert_eq!(
        handler.outcomes(),
        vec![(CommandKind::Lock, CommandOutcome::SessionAbsent)]
    );
    assert_eq!(queue.last_executed(), None);
    assert!(!queue.is_running());
}

#[tokio::test(start_paused = true)]
async fn skipped_command_keeps_earlier_confirmation_due() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    queue.enqueue(Command::Unlock);
    settle().await;
    handler.session_missing.store(true, Ordering::SeqCst);
    queue.enqueue(Command::Lock);
    settle().await;

    assert_eq!(
        handler.outcomes(),
        vec![
            (CommandKind::Unlock, CommandOutcome::Succeeded { retried: false }),
            (CommandKind::Poll, CommandOutcome::Succeeded { retried: false }),
            (CommandKind::Lock, CommandOutcome::SessionAbsent),
        ]
    );
    assert_eq!(queue.last_executed(), Some(CommandKind::Poll));
}

#[tokio::test(start_paused = true)]
async fn stop_charge_suppresses_follow_up_poll() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    queue.enqueue(Command::StopCharge);
    settle().await;

    assert_eq!(handler.executed_kinds(), vec![CommandKind::StopCharge]);
}

#[tokio::test(start_paused = true)]
async fn explicit_poll_after_stop_charge_still_runs() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    queue.enqueue(Command::StopCharge);
    queue.enqueue(Command::poll());
    settle().await;

    assert_eq!(
        handler.executed_kinds(),
        vec![CommandKind::StopCharge, CommandKind::Poll]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_stop_charge_does_not_start_cooldown() {
    let handler = Arc::new(RecordingHandler::default());
    handler.script([Err(VehicleError::Transport("reset".into()))]);
    let queue = queue_for(&handler);

    queue.enqueue(Command::StopCharge);
    settle().await;

    assert_eq!(
        handler.executed_kinds(),
        vec![CommandKind::StopCharge, CommandKind::Poll]
    );
}

#[tokio::test(start_paused = true)]
async fn disabled_queue_rejects_commands() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);
    queue.disable();

    assert!(!queue.enqueue(Command::Lock));
    settle().await;
    assert!(handler.executed_kinds().is_empty());
    assert!(!queue.is_running());
}

#[tokio::test(start_paused = true)]
async fn flush_discards_pending_commands() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);

    queue.enqueue(Command::Lock);
    queue.enqueue(Command::Unlock);
    queue.enqueue(Command::poll());
    assert_eq!(queue.flush(), 3);
    settle().await;

    assert!(handler.executed_kinds().is_empty());
    assert!(!queue.is_running());
}

#[tokio::test(start_paused = true)]
async fn panicking_consumer_resets_running_flag() {
    let handler = Arc::new(RecordingHandler::default());
    handler.panic_on_execute.store(true, Ordering::SeqCst);
    let queue = queue_for(&handler);

    queue.enqueue(Command::Lock);
    settle().await;

    assert!(!queue.is_running());
    assert!(handler.aborted.load(Ordering::SeqCst));

    // A fresh consumer starts on the next enqueue.
    handler.panic_on_execute.store(false, Ordering::SeqCst);
    queue.enqueue(Command::poll());
    settle().await;
    assert_eq!(handler.executed_kinds(), vec![CommandKind::Poll]);
}

#[tokio::test(start_paused = true)]
async fn dropped_handler_stops_consumer() {
    let handler = Arc::new(RecordingHandler::default());
    let queue = queue_for(&handler);
    drop(handler);

    queue.enqueue(Command::Lock);
    settle().await;
    assert!(!queue.is_running());
}
