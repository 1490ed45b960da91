//! Walk around a tiled floor with mouse look and WASD
//!
//! Usage: `tickloop [config.ron | config.json]`. Click to capture the
//! pointer, Escape to release it.

use tickloop::core::Animator;
use tickloop::prelude::*;

/// Spins its member about Z
struct Beacon {
    speed: f32,
}

impl Animator for Beacon {
    fn advance(&mut self, delta: f32, transform: &mut Transform) {
        transform.rotation = Quat::from_rotation_z(self.speed * delta) * transform.rotation;
    }
}

/// Demo game with a player body on a floor grid
struct DemoGame {
    player: Option<BodyId>,
    since_report: f32,
}

impl DemoGame {
    fn new() -> Self {
        Self {
            player: None,
            since_report: 0.0,
        }
    }
}

impl Game for DemoGame {
    fn init(&mut self, ctx: &mut EngineContext) {
        log::info!("Initializing demo game");

        let description =
            SceneDescription::floor_grid(16, 16).with_body("player", Vec3::new(3.0, 3.0, 5.0));
        ctx.scene = description.build(&ctx.config, &mut ctx.world);
        ctx.scene.add_animated(
            "beacon",
            Transform::from_position(Vec3::new(0.0, 0.0, 4.0)),
            Box::new(Beacon { speed: 1.0 }),
        );

        self.player = ctx.scene.get("player").and_then(|member| member.kind.body());
        if let Some(player) = self.player {
            ctx.controls.bind(player);
        }
        ctx.controls.rebind(KeyCode::KeyE, InputAction::MoveUp);
        ctx.controls.rebind(KeyCode::KeyQ, InputAction::MoveDown);
        log::info!("Fly up with {:?}", ctx.controls.keys_for(InputAction::MoveUp));
        ctx.debug.enabled = log::log_enabled!(log::Level::Debug);

        log::info!("Demo game initialized");
    }

    fn render(&mut self, ctx: &mut EngineContext, frame: &RenderFrame) {
        self.since_report += frame.delta;
        if self.since_report < 1.0 {
            return;
        }
        self.since_report = 0.0;

        if let Some(player) = ctx.scene.get("player") {
            let grounded = self
                .player
                .and_then(|id| ctx.world.body(id))
                .is_some_and(|body| body.contacts().bottom().is_some());
            log::info!(
                "player at {:.2} facing {:.2} (grounded: {grounded}, pointer: {:?})",
                player.transform.position,
                player.transform.forward(),
                ctx.controls.pointer_lock()
            );
            let eye = player.transform.position;
            if let Some(target) = ctx.scene.pick(&ctx.world, eye, ctx.controls.rotation(), 50.0) {
                log::info!("looking at {}", target.name);
            }
        }
        for line in ctx.debug.get_all_lines() {
            log::debug!("{line}");
        }
    }

    fn shutdown(&mut self, ctx: &mut EngineContext) {
        log::info!(
            "Shutting down after {} physics steps",
            ctx.world.steps()
        );
    }
}

fn main() {
    let simulation = match std::env::args().nth(1) {
        Some(path) if path.ends_with(".json") => SimulationConfig::load_json(&path),
        Some(path) => SimulationConfig::load_ron(&path),
        None => Ok(SimulationConfig::default()),
    };
    let simulation = match simulation {
        Ok(simulation) => simulation,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return;
        }
    };

    let config = EngineConfig::default()
        .with_title("tickloop")
        .with_size(1280, 720)
        .with_simulation(simulation);

    let game = DemoGame::new();
    let engine = Engine::new(config, game);

    if let Err(e) = engine.run() {
        eprintln!("Engine error: {}", e);
    }
}
