//! Lifecycle notifications driving version-gated client fixes.

use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};
use shimframe::{
    Lifecycle,
    MainQueue,
    MainQueueReceiver,
    ProtocolVersion,
    fixes::{ClientFix, ClientReloadHooks, FixCoordinator, FixRegistry},
};

#[derive(Default)]
struct RecordingHooks {
    calls: Mutex<Vec<String>>,
}

impl RecordingHooks {
    fn take(&self) -> Vec<String> { std::mem::take(&mut *self.calls.lock().expect("lock")) }

    fn record(&self, call: impl Into<String>) { self.calls.lock().expect("lock").push(call.into()); }
}

impl ClientReloadHooks for RecordingHooks {
    fn clear_font_caches(&self) { self.record("fonts"); }

    fn rebuild_shape_caches(&self) { self.record("shapes"); }

    fn reset_item_grid(&self) { self.record("grid"); }

    fn on_game_loaded(&self, fixes: &[ClientFix]) { self.record(format!("loaded {fixes:?}")); }
}

struct World {
    lifecycle: Lifecycle,
    hooks: Arc<RecordingHooks>,
    main: MainQueueReceiver,
}

#[fixture]
fn world() -> World {
    let lifecycle = Lifecycle::new(ProtocolVersion::R1_20_5);
    let hooks = Arc::new(RecordingHooks::default());
    let (queue, main) = MainQueue::new();
    lifecycle.register(Arc::new(FixCoordinator::new(
        FixRegistry::builtin(),
        Arc::clone(&hooks) as Arc<dyn ClientReloadHooks>,
        Arc::new(queue),
        lifecycle.version_cell(),
    )));
    World {
        lifecycle,
        hooks,
        main,
    }
}

#[rstest]
fn version_change_refreshes_caches_on_main_loop(mut world: World) {
    let old = world.lifecycle.change_version(ProtocolVersion::R1_8);

    assert_eq!(old, ProtocolVersion::R1_20_5);
    assert!(world.hooks.take().is_empty(), "hooks must wait for main loop");
    assert_eq!(world.main.run_pending(), 1);
    assert_eq!(world.hooks.take(), vec!["fonts", "shapes"]);
}

#[rstest]
fn classic_versions_also_reset_the_item_grid(mut world: World) {
    world.lifecycle.change_version(ProtocolVersion::C0_28_TO_C0_30);
    world.main.run_pending();
    assert_eq!(world.hooks.take(), vec!["fonts", "shapes", "grid"]);
}

#[rstest]
fn unchanged_version_is_not_reported(mut world: World) {
    world.lifecycle.change_version(ProtocolVersion::R1_20_5);
    assert_eq!(world.main.run_pending(), 0);
}

#[rstest]
fn game_load_reports_active_fixes(world: World) {
    world.lifecycle.change_version(ProtocolVersion::R1_10);
    world.hooks.take();

    world.lifecycle.game_loaded();

    assert_eq!(
        world.hooks.take(),
        vec![format!(
            "loaded {:?}",
            [
                ClientFix::NegativeItemCount,
                ClientFix::FootstepParticle,
                ClientFix::EntityDimensions
            ]
        )]
    );
}

#[rstest]
#[tokio::test]
async fn main_loop_drains_until_handles_drop(world: World) {
    let World {
        lifecycle,
        hooks,
        mut main,
    } = world;
    lifecycle.change_version(ProtocolVersion::R1_8);
    lifecycle.change_version(ProtocolVersion::BEDROCK_LATEST);
    drop(lifecycle);

    main.run().await;

    assert_eq!(hooks.take(), vec!["fonts", "shapes", "fonts", "shapes"]);
}
