use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::*;
use crate::arbiter::{Capability, ContextArbiter};
use crate::device::SwapOutcome;
use crate::testing::{
    mock_view, settle, wait_until, Event, MockPlatform, Probe, RecordingRenderer,
};

fn renderer_calls(events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| {
            matches!(
                e,
                Event::GotContext(_) | Event::SurfaceChanged(..) | Event::DrawFrame
            )
        })
        .cloned()
        .collect()
}

fn got_context(probe: &Probe) -> usize {
    probe.count(|e| matches!(e, Event::GotContext(_)))
}

#[test]
fn on_demand_resize_draws_once_before_returning() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, false);

    view.surface_created(1);
    view.size_changed(640, 480);

    let calls = renderer_calls(&probe.events());
    assert_eq!(calls.len(), 3, "{calls:?}");
    assert!(matches!(calls[0], Event::GotContext(_)));
    assert_eq!(calls[1], Event::SurfaceChanged(640, 480));
    assert_eq!(calls[2], Event::DrawFrame);
    assert_eq!(view.status().phase(), RenderPhase::Ready);

    settle();
    assert_eq!(probe.draws(), 1);
}

#[test]
fn surface_created_then_destroyed_never_draws() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::Continuous, true);

    view.surface_created(1);
    view.surface_destroyed();
    settle();

    assert_eq!(probe.draws(), 0);
    assert_eq!(probe.count(|e| matches!(e, Event::SurfaceCreated { .. })), 0);
    let status = view.status();
    assert!(status.waiting_for_surface);
    assert!(!status.has_drawable_surface);
}

#[test]
fn on_demand_waits_for_requests_and_coalesces_them() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(64, 64);
    settle();
    assert_eq!(probe.draws(), 1);

    // Hold the render thread inside a task while two requests pile up.
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    view.post_task(move || {
        started_tx.send(()).unwrap();
        release_rx.recv().unwrap();
    });
    started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

    view.request_render();
    view.request_render();
    release_tx.send(()).unwrap();

    assert!(wait_until(|| probe.draws() == 2));
    settle();
    assert_eq!(probe.draws(), 2);

    view.request_render();
    assert!(wait_until(|| probe.draws() == 3));
}

#[test]
fn continuous_mode_draws_until_switched_to_on_demand() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::Continuous, true);
    view.surface_created(1);
    view.size_changed(32, 32);

    assert!(wait_until(|| probe.draws() >= 5));

    view.set_render_mode(RenderMode::OnDemand);
    assert_eq!(view.render_mode(), RenderMode::OnDemand);
    settle();
    let stopped_at = probe.draws();
    settle();
    assert_eq!(probe.draws(), stopped_at);

    view.request_render();
    assert!(wait_until(|| probe.draws() == stopped_at + 1));
}

#[test]
fn pause_and_resume_report_the_last_request() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(16, 16);

    for pause in [true, true, false, true, false, false, true] {
        if pause {
            view.pause();
        } else {
            view.resume();
        }
        assert_eq!(view.status().paused, pause);
    }
}

#[test]
fn exit_tears_everything_down() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::Continuous, true);
    view.surface_created(1);
    view.size_changed(48, 48);
    assert!(wait_until(|| probe.draws() > 0));

    for _ in 0..4 {
        view.post_task(|| std::thread::sleep(Duration::from_millis(1)));
    }
    view.size_changed(96, 48);
    view.request_render();
    view.request_exit_and_wait();

    let status = view.status();
    assert!(status.exited);
    assert!(!status.has_context);
    assert!(!status.has_drawable_surface);
    assert_eq!(status.phase(), RenderPhase::Exited);
    assert_eq!(probe.live_contexts(), 0);
    assert_eq!(
        probe.count(|e| matches!(e, Event::DisplayOpened)),
        probe.count(|e| matches!(e, Event::DisplayClosed))
    );

    // Exit is idempotent.
    view.request_exit_and_wait();
}

#[test]
fn pause_on_single_context_driver_releases_and_resume_rebuilds_in_order() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, false);
    view.surface_created(1);
    view.size_changed(640, 480);

    view.pause();
    let status = view.status();
    assert!(!status.has_context);
    assert!(!status.has_drawable_surface);
    assert_eq!(probe.count(|e| matches!(e, Event::DisplayClosed)), 1);

    let before = probe.events().len();
    view.resume();
    assert!(wait_until(|| probe.draws() == 2));

    let calls = renderer_calls(&probe.events()[before..]);
    assert_eq!(calls.len(), 3, "{calls:?}");
    assert!(matches!(calls[0], Event::GotContext(_)));
    assert_eq!(calls[1], Event::SurfaceChanged(640, 480));
    assert_eq!(calls[2], Event::DrawFrame);
}

#[test]
fn capable_driver_preserves_context_across_pause() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.set_preserve_context_on_pause(true);
    assert!(view.preserve_context_on_pause());
    view.surface_created(1);
    view.size_changed(30, 20);

    view.pause();
    let status = view.status();
    assert!(status.has_context);
    assert!(!status.has_drawable_surface);
    assert_eq!(probe.count(|e| matches!(e, Event::DisplayClosed)), 0);

    view.resume();
    assert!(wait_until(|| probe.draws() == 2));
    assert_eq!(got_context(&probe), 1);
    assert_eq!(probe.count(|e| matches!(e, Event::SurfaceChanged(30, 20))), 2);
}

#[test]
fn single_context_driver_ignores_preserve_request() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, false);
    view.set_preserve_context_on_pause(true);
    view.surface_created(1);
    view.size_changed(30, 20);

    view.pause();
    assert!(!view.status().has_context);
}

#[test]
fn capable_driver_without_preserve_keeps_display_only() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(30, 20);

    view.pause();
    assert!(!view.status().has_context);
    assert_eq!(probe.count(|e| matches!(e, Event::DisplayClosed)), 0);

    view.resume();
    assert!(wait_until(|| probe.draws() == 2));
    assert_eq!(probe.count(|e| matches!(e, Event::DisplayOpened)), 1);
}

#[test]
fn context_loss_recreates_context_and_surface() {
    let probe = Probe::new();
    probe.script(|s| s.swap_outcomes.push_back(SwapOutcome::ContextLost));
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(100, 50);
    assert_eq!(probe.draws(), 1);

    view.request_render();
    assert!(wait_until(|| probe.draws() == 2));

    assert_eq!(got_context(&probe), 2);
    assert_eq!(probe.count(|e| matches!(e, Event::SurfaceChanged(100, 50))), 2);
    assert_eq!(probe.count(|e| matches!(e, Event::ContextDestroyed(_))), 1);
    assert!(view.take_exit_error().is_none());
}

#[test]
fn bad_surface_waits_for_a_new_surface() {
    let probe = Probe::new();
    probe.script(|s| s.swap_outcomes.push_back(SwapOutcome::SurfaceBad));
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(10, 10);

    let status = view.status();
    assert!(status.surface_is_bad);
    assert!(status.has_context);

    view.request_render();
    settle();
    assert_eq!(probe.draws(), 1);

    view.surface_destroyed();
    assert!(!view.status().surface_is_bad);
    // The request made while the surface was bad is still pending.
    view.surface_created(2);
    assert!(wait_until(|| probe.draws() == 2));
    settle();
    assert_eq!(probe.draws(), 2);
    assert_eq!(
        probe.count(|e| matches!(e, Event::SurfaceCreated { window: 2, .. })),
        1
    );
    assert_eq!(got_context(&probe), 1);
}

#[test]
fn failed_surface_creation_is_retried_when_surface_is_resignalled() {
    let probe = Probe::new();
    probe.script(|s| s.fail_surface_creation = 1);
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(8, 8);

    let status = view.status();
    assert!(status.surface_is_bad);
    assert!(!status.has_drawable_surface);
    assert!(status.has_context);
    assert_eq!(probe.draws(), 0);

    view.surface_created(1);
    view.request_render_and_wait();
    assert_eq!(probe.draws(), 1);
    assert!(!view.status().surface_is_bad);
}

#[test]
fn context_creation_failure_ends_the_thread() {
    let probe = Probe::new();
    probe.script(|s| s.fail_context_creation = true);
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(4, 4);

    assert!(wait_until(|| view.status().exited));
    let err = view.take_exit_error().expect("exit error");
    assert!(format!("{err:#}").contains("failed to create graphics context"));
    assert!(view.take_exit_error().is_none());

    assert_eq!(probe.live_contexts(), 0);
    assert_eq!(probe.count(|e| matches!(e, Event::DisplayClosed)), 1);
    assert_eq!(probe.draws(), 0);

    // Calls after a failure are ignored rather than blocking.
    view.pause();
    view.resume();
}

#[test]
fn two_views_take_turns_on_a_single_context_driver() {
    let probe = Probe::new();
    let arbiter = Arc::new(ContextArbiter::with_capability(false));
    let spawn = || {
        ViewBuilder::new(MockPlatform::new(probe.clone()))
            .render_mode(RenderMode::OnDemand)
            .arbiter(arbiter.clone())
            .spawn(RecordingRenderer(probe.clone()))
            .unwrap()
    };
    let a = spawn();
    let b = spawn();

    a.surface_created(1);
    a.size_changed(32, 32);
    assert!(a.status().has_context);

    b.surface_created(2);
    b.size_changed(32, 32);
    assert!(b.status().has_context);
    assert!(wait_until(|| !a.status().has_context));
    assert_eq!(probe.draws(), 2);

    a.request_render_and_wait();
    assert_eq!(probe.draws(), 3);
    assert!(a.status().has_context);

    assert_eq!(probe.max_live_contexts(), 1);
}

#[test]
fn idle_views_do_not_trade_the_context() {
    let probe = Probe::new();
    let arbiter = Arc::new(ContextArbiter::with_capability(false));
    let spawn = || {
        ViewBuilder::new(MockPlatform::new(probe.clone()))
            .render_mode(RenderMode::OnDemand)
            .arbiter(arbiter.clone())
            .spawn(RecordingRenderer(probe.clone()))
            .unwrap()
    };
    let a = spawn();
    let b = spawn();

    a.surface_created(1);
    a.size_changed(32, 32);
    b.surface_created(2);
    b.size_changed(32, 32);
    a.request_render_and_wait();

    let created = probe.count(|e| matches!(e, Event::ContextCreated(_)));
    settle();
    settle();
    assert_eq!(probe.count(|e| matches!(e, Event::ContextCreated(_))), created);
    assert_eq!(probe.draws(), 3);

    assert!(a.status().has_context);
    assert!(!b.status().has_context);
    assert!(arbiter.owner().is_some());
    assert_eq!(probe.max_live_contexts(), 1);
}

#[test]
fn continuous_drawing_resumes_after_forced_release() {
    for multi_context in [false, true] {
        let probe = Probe::new();
        let view = mock_view(&probe, RenderMode::Continuous, multi_context);
        view.surface_created(1);
        view.size_changed(24, 24);
        assert!(wait_until(|| probe.draws() > 0));

        view.request_release_context();
        assert!(wait_until(|| got_context(&probe) == 2));

        let drawn = probe.draws();
        assert!(wait_until(|| probe.draws() > drawn + 5));
        assert!(view.status().has_context);
        assert_eq!(probe.max_live_contexts(), 1);
    }
}

#[test]
fn renderer_panic_tears_down_and_is_reported() {
    let probe = Probe::new();
    probe.script(|s| s.panic_on_draw = true);
    let mut view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(8, 8);

    assert!(wait_until(|| view.status().exited));
    assert_eq!(probe.draws(), 1);
    assert_eq!(probe.live_contexts(), 0);
    assert_eq!(
        probe.count(|e| matches!(e, Event::DisplayOpened)),
        probe.count(|e| matches!(e, Event::DisplayClosed))
    );

    let err = view.take_exit_error().expect("exit error");
    assert!(format!("{err:#}").contains("panicked"), "{err:#}");

    // The renderer went down with the thread.
    assert!(view.detach().is_err());
    assert!(!view.is_attached());
    assert!(view.attach().is_err());
}

#[test]
fn exit_from_the_render_thread_is_refused() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    let handle = view.handle();
    let slot = Arc::new(Mutex::new(Some(view)));

    let (tx, rx) = mpsc::channel();
    let task_slot = slot.clone();
    handle.post_task(move || {
        let guard = task_slot.lock();
        let Some(view) = guard.as_ref() else {
            return;
        };
        let refused =
            panic::catch_unwind(AssertUnwindSafe(|| view.request_exit_and_wait())).is_err();
        tx.send(refused).unwrap();
    });
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());

    let view = slot.lock().take().unwrap();
    assert!(!view.status().exited);
    view.request_exit_and_wait();
    assert!(view.status().exited);
}

#[test]
fn resize_from_the_render_thread_does_not_wait_for_itself() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(16, 16);
    assert_eq!(probe.draws(), 1);

    let handle = view.handle();
    let slot = Arc::new(Mutex::new(Some(view)));
    let (tx, rx) = mpsc::channel();
    let task_slot = slot.clone();
    handle.post_task(move || {
        if let Some(view) = task_slot.lock().as_ref() {
            view.size_changed(32, 32);
        }
        tx.send(()).unwrap();
    });
    rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert!(wait_until(|| probe.draws() == 2));
    assert_eq!(probe.count(|e| matches!(e, Event::SurfaceChanged(32, 32))), 1);

    let view = slot.lock().take().unwrap();
    assert_eq!(view.status().size.width, 32);
}

#[test]
fn tasks_run_in_order_on_the_render_thread() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    let seen = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let seen = seen.clone();
        view.post_task(move || {
            let name = std::thread::current().name().map(str::to_owned);
            seen.lock().push((i, name));
        });
    }

    assert!(wait_until(|| seen.lock().len() == 3));
    let seen = seen.lock();
    let order: Vec<_> = seen.iter().map(|(i, _)| *i).collect();
    assert_eq!(order, vec![0, 1, 2]);
    for (_, name) in seen.iter() {
        let name = name.as_deref().unwrap_or_default();
        assert!(name.starts_with("vellum-render-"), "{name}");
    }
}

#[test]
fn handle_requests_frames_from_another_thread() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(12, 12);

    let handle = view.handle();
    std::thread::spawn(move || handle.request_render())
        .join()
        .unwrap();

    assert!(wait_until(|| probe.draws() == 2));
    assert_eq!(view.handle().status(), view.status());
}

#[test]
fn forced_release_recreates_context_lazily() {
    let probe = Probe::new();
    let view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(12, 12);

    view.request_release_context();
    assert!(wait_until(|| !view.status().has_context));
    assert_eq!(probe.live_contexts(), 0);

    view.request_render_and_wait();
    assert_eq!(probe.draws(), 2);
    assert_eq!(got_context(&probe), 2);
}

#[test]
fn first_context_probes_the_driver() {
    let probe = Probe::new();
    probe.script(|s| s.driver = Some("Q3Dimension MSM7500 01.02".to_string()));
    let arbiter = Arc::new(ContextArbiter::default());
    let view = ViewBuilder::new(MockPlatform::new(probe.clone()))
        .render_mode(RenderMode::OnDemand)
        .arbiter(arbiter.clone())
        .spawn(RecordingRenderer(probe.clone()))
        .unwrap();

    assert_eq!(arbiter.capability(), Capability::Unprobed);
    view.surface_created(1);
    view.size_changed(5, 5);

    assert_eq!(arbiter.capability(), Capability::Probed { multi_context: false });
    assert!(arbiter.should_release_on_pause());
}

#[test]
fn detach_and_attach_keep_the_renderer() {
    let probe = Probe::new();
    let mut view = mock_view(&probe, RenderMode::OnDemand, true);
    view.surface_created(1);
    view.size_changed(20, 20);

    let factory = MockPlatform::new(probe.clone());
    let surfaces = crate::device::Platform::default_surface_factory(&factory);
    assert!(view.set_surface_factory(surfaces.clone()).is_err());

    view.detach().unwrap();
    assert!(!view.is_attached());
    assert!(view.status().exited);
    assert_eq!(probe.live_contexts(), 0);
    view.set_surface_factory(surfaces).unwrap();

    view.attach().unwrap();
    assert!(view.is_attached());
    assert!(!view.status().exited);
    view.surface_created(1);
    view.size_changed(20, 20);

    assert_eq!(probe.draws(), 2);
    assert_eq!(got_context(&probe), 2);
}
