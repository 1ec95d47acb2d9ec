use std::sync::Arc;
use std::time::Duration;

use skipper_common::TimerPolicy;
use skipper_engine::snapshot::SnapshotHost;
use skipper_engine::{Scheduler, Trigger, TriggerOutcome};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

mod support;
use support::DetachedClicks;

const PERIOD: Duration = Duration::from_millis(300);

fn form_host() -> Arc<SnapshotHost> {
    Arc::new(SnapshotHost::parse(
        r#"<html><body><input type="radio" id="rb40"><input type="radio" id="rb41"></body></html>"#,
    ))
}

#[tokio::test(start_paused = true)]
async fn single_policy_keeps_one_timer() {
    let host = form_host();
    let scheduler = Scheduler::new(host.clone(), PERIOD, TimerPolicy::Single);

    assert_eq!(scheduler.trigger(Trigger::Ready), TriggerOutcome::Started { timers: 1 });
    assert_eq!(
        scheduler.trigger(Trigger::Mutation { batches: 3 }),
        TriggerOutcome::AlreadyRunning
    );
    assert_eq!(scheduler.active_timers(), 1);

    sleep(Duration::from_millis(950)).await;
    assert_eq!(scheduler.passes(), 3, "fires at 300, 600 and 900 ms");
    assert_eq!(host.actions().len(), 6, "two radios checked per pass");
}

#[tokio::test(start_paused = true)]
async fn accumulate_policy_starts_a_timer_per_trigger() {
    let scheduler = Scheduler::new(form_host(), PERIOD, TimerPolicy::Accumulate);

    scheduler.trigger(Trigger::Ready);
    assert_eq!(
        scheduler.trigger(Trigger::Mutation { batches: 2 }),
        TriggerOutcome::Started { timers: 3 }
    );
    assert_eq!(scheduler.active_timers(), 3);

    sleep(Duration::from_millis(350)).await;
    assert_eq!(scheduler.passes(), 3);
}

#[tokio::test(start_paused = true)]
async fn stopped_scheduler_refuses_triggers() {
    let scheduler = Scheduler::new(form_host(), PERIOD, TimerPolicy::Single);
    scheduler.trigger(Trigger::Ready);
    sleep(Duration::from_millis(310)).await;
    assert_eq!(scheduler.passes(), 1);

    scheduler.stop();
    assert_eq!(scheduler.active_timers(), 0);
    assert_eq!(scheduler.trigger(Trigger::Ready), TriggerOutcome::Stopped);

    sleep(Duration::from_millis(1000)).await;
    assert_eq!(scheduler.passes(), 1);
}

#[tokio::test(start_paused = true)]
async fn drive_waits_for_load_then_starts_once() {
    let host = form_host();
    host.set_loaded(false);
    let scheduler = Scheduler::new(host.clone(), PERIOD, TimerPolicy::Single);
    let cancel = CancellationToken::new();

    let script = async {
        sleep(Duration::from_millis(250)).await;
        assert_eq!(scheduler.active_timers(), 0, "no passes before load");

        host.set_loaded(true);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(scheduler.active_timers(), 1);

        host.push_mutation_batches(4);
        sleep(Duration::from_millis(150)).await;
        assert_eq!(scheduler.active_timers(), 1, "mutations reuse the running timer");

        cancel.cancel();
    };

    tokio::join!(
        scheduler.drive(host.as_ref(), Duration::from_millis(100), cancel.clone()),
        script
    );
}

#[tokio::test(start_paused = true)]
async fn drive_with_accumulate_adds_a_timer_per_batch() {
    let host = form_host();
    let scheduler = Scheduler::new(host.clone(), PERIOD, TimerPolicy::Accumulate);
    let cancel = CancellationToken::new();

    let script = async {
        sleep(Duration::from_millis(50)).await;
        assert_eq!(scheduler.active_timers(), 1, "already loaded at attach time");

        host.push_mutation_batches(2);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(scheduler.active_timers(), 3);

        cancel.cancel();
    };

    tokio::join!(
        scheduler.drive(host.as_ref(), Duration::from_millis(100), cancel.clone()),
        script
    );
}

#[tokio::test(start_paused = true)]
async fn failing_passes_keep_the_timer_running() {
    let host = Arc::new(DetachedClicks::new(
        r#"<html><body><input type="button" class="detail" title="انجام ارزشیابی" onclick="OnDetailClick(this);"></body></html>"#,
        0,
    ));
    let scheduler = Scheduler::new(host.clone(), PERIOD, TimerPolicy::Single);

    scheduler.trigger(Trigger::Ready);
    sleep(Duration::from_millis(950)).await;

    assert_eq!(scheduler.passes(), 3, "every tick ran although each pass failed");
    assert_eq!(scheduler.active_timers(), 1);
    assert!(host.inner.actions().is_empty());
}
