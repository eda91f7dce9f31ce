//! sim-harness: run the simulation headless from the command line.
//!
//! Usage:
//!   sim-harness run --frames 600 --dt 0.016 --config arena.json
//!   sim-harness defaults > arena.json

use std::path::PathBuf;
use std::process;

use glam::{Quat, Vec3};

use skirmish_core::components::*;
use skirmish_core::config::SimConfig;
use skirmish_core::enums::{DamageType, EntityKind, MotionKind};
use skirmish_core::events::CombatEffect;
use skirmish_core::types::{EntityId, PlayerId};
use skirmish_sim::combat::authority::CallbackAuthority;
use skirmish_sim::combat::KillRecord;
use skirmish_sim::world::World;
use skirmish_sim::SimulationEngine;

fn main() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => cmd_run(&args[2..]),
        "defaults" => cmd_defaults(),
        "help" | "--help" | "-h" => print_usage(),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!(
        "sim-harness: SKIRMISH headless simulation runner\n\
         \n\
         Commands:\n\
         \n\
         run       Run the demo arena. Prints one JSON line per frame with\n\
                   collision or combat events, then the final snapshot\n\
         \n\
           --config <path>  JSON config (optional, default: built-in)\n\
           --frames <N>     Frames to run (default: 600)\n\
           --dt <secs>      Frame duration (default: 1/60)\n\
           --seed <N>       Override the config seed\n\
         \n\
         defaults  Print the default config as JSON\n\
         \n\
         Examples:\n\
         \n\
           sim-harness defaults > arena.json\n\
           RUST_LOG=debug sim-harness run --config arena.json --frames 1200\n"
    );
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn parse_flag<T: std::str::FromStr>(args: &[String], name: &str, default: T) -> T {
    match flag(args, name) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            eprintln!("Error: invalid value for {name}: {raw}");
            process::exit(1);
        }),
    }
}

fn cmd_defaults() {
    match serde_json::to_string_pretty(&SimConfig::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

fn cmd_run(args: &[String]) {
    let mut config = match flag(args, "--config").map(PathBuf::from) {
        Some(path) => match SimConfig::load(&path) {
            Ok(config) => {
                log::info!("loaded config from {}", path.display());
                config
            }
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        },
        None => SimConfig::default(),
    };
    config.seed = parse_flag(args, "--seed", config.seed);
    let frames: u32 = parse_flag(args, "--frames", 600);
    let dt: f64 = parse_flag(args, "--dt", config.schedule.fixed_dt);
    if !dt.is_finite() || dt <= 0.0 {
        eprintln!("Error: --dt must be positive");
        process::exit(1);
    }

    let mut engine = SimulationEngine::new(config)
        .with_authority(CallbackAuthority::new(|target, amount, player| {
            log::info!("-> server: {amount:.1} damage on {target} from {player:?}");
        }))
        .with_kill_hook(|_: &World, kill: &KillRecord| {
            log::info!("kill credit: {:?} for {}", kill.killer_player, kill.victim);
        });
    let arena = Arena::spawn(&mut engine);

    let mut totals = Totals::default();
    for frame in 0..frames {
        arena.script(&mut engine, frame);
        let report = engine.frame(dt);
        totals.record(&report.combat);
        totals.contacts += report.collisions.len();
        if !report.collisions.is_empty() || !report.combat.is_empty() {
            print_json_line(&report);
        }
        if frame % 60 == 0 {
            log::info!(
                "t={:.2}s fixed_steps={} contacts={} effects={}",
                report.time.now(),
                report.fixed_steps,
                report.collisions.len(),
                report.combat.len()
            );
        }
    }

    log::info!(
        "done: {} applied, {} forwarded, {} rejected, {} deaths, {} contact events",
        totals.applied,
        totals.forwarded,
        totals.rejected,
        totals.deaths,
        totals.contacts
    );
    print_json_line(&engine.snapshot());
}

fn print_json_line<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}

#[derive(Default)]
struct Totals {
    applied: usize,
    forwarded: usize,
    rejected: usize,
    deaths: usize,
    contacts: usize,
}

impl Totals {
    fn record(&mut self, effects: &[CombatEffect]) {
        for effect in effects {
            match effect {
                CombatEffect::DamageApplied { .. } => self.applied += 1,
                CombatEffect::DamageForwarded { .. } => self.forwarded += 1,
                CombatEffect::Rejected { .. } => self.rejected += 1,
                CombatEffect::Died { .. } => self.deaths += 1,
                _ => {}
            }
        }
    }
}

/// A small demo arena: a local player with a summon, a wall, melee
/// enemies, a remote player replica and a server-owned boss.
struct Arena {
    player: EntityId,
    summon: EntityId,
    enemies: Vec<EntityId>,
    remote: EntityId,
    boss: EntityId,
}

impl Arena {
    fn spawn(engine: &mut SimulationEngine) -> Self {
        let me = PlayerId(1);
        let capsule = ColliderShape::Capsule {
            radius: 0.4,
            half_height: 0.5,
        };

        let player = engine.spawn((
            Transform::default(),
            EntityKind::Player,
            Movement::new(6.0),
            Collider::new(capsule),
            Health::new(150.0).with_regen(2.0),
            Shield::new(50.0, 10.0, 3.0),
            Ownership {
                player: Some(me),
                ..Default::default()
            },
            Respawn::after(3.0),
        ));
        let summon = engine.spawn((
            Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)),
            EntityKind::Summon,
            Movement::new(5.0),
            Collider::new(ColliderShape::Sphere { radius: 0.3 }),
            Health::new(40.0),
            Ownership {
                player: Some(me),
                owner: Some(player),
                summoned: true,
            },
        ));
        engine.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, 8.0)),
            EntityKind::Prop,
            Collider::fixed(ColliderShape::Box {
                half_extents: Vec3::new(6.0, 1.5, 0.5),
            }),
        ));

        let enemies = (0..4)
            .map(|i| {
                let angle = i as f32 * std::f32::consts::FRAC_PI_2;
                engine.spawn((
                    Transform::from_position(Vec3::new(angle.cos() * 6.0, 0.0, angle.sin() * 6.0)),
                    EntityKind::Enemy,
                    Movement::new(3.0),
                    Collider::new(capsule),
                    Health::new(60.0),
                ))
            })
            .collect();

        let remote = engine.spawn((
            Transform::from_position(Vec3::new(4.0, 0.0, -4.0)),
            EntityKind::Player,
            Collider::replica(capsule),
            Health::new(150.0),
            AuthorityDelegated,
        ));
        let boss = engine.spawn((
            Transform::from_position(Vec3::new(-6.0, 0.0, -6.0)),
            EntityKind::Enemy,
            Collider::new(ColliderShape::Cylinder {
                radius: 1.2,
                half_height: 1.5,
            }),
            Health::new(2000.0),
            AuthorityDelegated,
        ));

        Self {
            player,
            summon,
            enemies,
            remote,
            boss,
        }
    }

    /// Per-frame gameplay: enemies chase the player, the player attacks in
    /// bursts, the remote player sends server states.
    fn script(&self, engine: &mut SimulationEngine, frame: u32) {
        let now = engine.time().now();
        let player_pos = engine
            .world()
            .transform(self.player)
            .map_or(Vec3::ZERO, |t| t.position);

        for &enemy in &self.enemies {
            if engine.world().is_dead(enemy) || !engine.world().contains(enemy) {
                continue;
            }
            let Some(pos) = engine.world().transform(enemy).map(|t| t.position) else {
                continue;
            };
            let to_player = (player_pos - pos).normalize_or_zero();
            if let Some(mut movement) = engine.world_mut().get_mut::<Movement>(enemy) {
                movement.acceleration = to_player * 8.0;
                movement.friction = 2.0;
            }
            if pos.distance(player_pos) < 1.2 && frame % 30 == 0 {
                engine.queue_damage(self.player, 8.0, Some(enemy), None, None);
            }
        }

        if frame % 20 == 0 {
            let target = self.enemies[(frame / 20) as usize % self.enemies.len()];
            engine.queue_damage(target, 12.0, Some(self.player), Some(DamageType::Poison), Some(PlayerId(1)));
            engine.queue_damage(self.boss, 25.0, Some(self.summon), Some(DamageType::Bleed), Some(PlayerId(1)));
        }
        if frame % 90 == 45 {
            let target = self.enemies[(frame / 90) as usize % self.enemies.len()];
            engine.apply_corrupted(target, 4.0);
        }
        if frame % 240 == 120 {
            engine.start_motion(self.player, MotionKind::Dash, Vec3::X, 3.0, 0.2);
        }
        if frame % 6 == 0 {
            let pos = Vec3::new(4.0 + (now as f32).sin() * 2.0, 0.0, -4.0);
            engine.add_server_state(self.remote, pos, Quat::IDENTITY, now);
        }
        if frame % 120 == 60 {
            // Server confirms a chunk of the boss fight.
            engine.apply_confirmed_damage(self.remote, 5.0, Some(self.boss), None);
        }
        if engine.world().is_dead(self.player) {
            engine.revive(self.player);
        }
    }
}
