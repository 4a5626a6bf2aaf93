//! Activity scheduler, sleep cycle and activity unit tests

#[cfg(test)]
mod tests {
    use avatar_autopilot::activity::{find_by_fragment, lateral_candidates, Activity};
    use avatar_autopilot::arbiter::{Arbiter, Role};
    use avatar_autopilot::config::AgentConfig;
    use avatar_autopilot::context::AgentContext;
    use avatar_autopilot::scheduler::{ActivityScheduler, Cycle, SchedulerState};
    use avatar_autopilot::sim::{Scenario, SimWorld, WorldCommand};
    use avatar_autopilot::sleep::{attempt_sleep, placement_candidates, SleepOutcome};
    use avatar_autopilot::types::{Block, BlockPos, Face, GameMode, Item};
    use avatar_autopilot::world::{WorldEvent, WorldInterface};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn setup(
        scenario: Scenario,
        config: AgentConfig,
    ) -> (Arc<SimWorld>, AgentContext, mpsc::Receiver<WorldEvent>) {
        let (world, events) = SimWorld::new(scenario);
        world.spawn();
        let ctx = AgentContext::new(world.clone(), Arc::new(config), Arbiter::spawn());
        (world, ctx, events)
    }

    /// Forward sim events to the context fan-out (the supervisor's job), and
    /// end the night after `after`.
    fn run_night(
        world: Arc<SimWorld>,
        ctx: &AgentContext,
        mut events: mpsc::Receiver<WorldEvent>,
        after: Duration,
    ) {
        let fanout = ctx.events.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let _ = fanout.send(event);
            }
        });
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            world.advance_clock(20);
        });
    }

    fn night_config() -> AgentConfig {
        AgentConfig {
            auto_sleep: true,
            ..Default::default()
        }
    }

    // -----------------------------------------------------------------------
    // Activity selection
    // -----------------------------------------------------------------------

    #[test]
    fn exploration_is_picked_most_often() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut counts: HashMap<Activity, usize> = HashMap::new();
        for _ in 0..6_000 {
            *counts.entry(Activity::pick(&mut rng)).or_default() += 1;
        }
        // Weights 3:1:1:1 → explore ≈ 3000, others ≈ 1000.
        assert!((2_700..=3_300).contains(&counts[&Activity::Explore]));
        for other in [Activity::Build, Activity::Idle, Activity::Interact] {
            assert!((800..=1_200).contains(&counts[&other]), "{:?}", counts);
        }
    }

    #[test]
    fn only_explore_and_idle_are_preemptible() {
        assert!(Activity::Explore.is_preemptible());
        assert!(Activity::Idle.is_preemptible());
        assert!(!Activity::Build.is_preemptible());
        assert!(!Activity::Interact.is_preemptible());
    }

    // -----------------------------------------------------------------------
    // Scheduler cycle
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn daytime_cycle_runs_one_activity() {
        let (_world, ctx, _events) = setup(Scenario::default(), AgentConfig::default());
        let arbiter = ctx.arbiter.clone();
        let mut scheduler = ActivityScheduler::new(ctx);

        assert!(matches!(scheduler.cycle().await, Cycle::Ran(_)));
        assert_eq!(scheduler.state(), SchedulerState::Selecting);

        let snap = arbiter.snapshot().await.unwrap();
        assert!(snap.holder.is_none());
        assert_eq!(snap.activity_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_suspends_during_combat() {
        let (world, ctx, _events) = setup(Scenario::default(), AgentConfig::default());
        let _combat = ctx.arbiter.acquire(Role::Combat).await.unwrap().unwrap();
        let mut scheduler = ActivityScheduler::new(ctx);

        assert_eq!(scheduler.cycle().await, Cycle::Suspended);
        assert_eq!(scheduler.state(), SchedulerState::Suspended);
        assert!(world.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_contended_while_filler_holds_control() {
        let (_world, ctx, _events) = setup(Scenario::default(), AgentConfig::default());
        let _filler = ctx.arbiter.acquire(Role::Filler).await.unwrap().unwrap();
        let mut scheduler = ActivityScheduler::new(ctx);

        assert_eq!(scheduler.cycle().await, Cycle::Contended);
    }

    #[tokio::test(start_paused = true)]
    async fn night_cycle_sleeps_in_existing_bed() {
        let bed = BlockPos::new(2, 65, 0);
        let (world, ctx, events) = setup(
            Scenario {
                time_of_day: 14_000,
                blocks: vec![Block::new("red_bed", bed)],
                ..Default::default()
            },
            night_config(),
        );
        run_night(world.clone(), &ctx, events, Duration::from_secs(30));
        let arbiter = ctx.arbiter.clone();
        let mut scheduler = ActivityScheduler::new(ctx);

        assert_eq!(scheduler.cycle().await, Cycle::Slept(SleepOutcome::Slept));
        assert!(world.commands().contains(&WorldCommand::UseBed(bed)));
        assert!(!world.is_sleeping());

        let snap = arbiter.snapshot().await.unwrap();
        assert!(!snap.sleeping);
        assert!(snap.holder.is_none());
    }

    async fn sleep_cut_short_by(event: WorldEvent) {
        let bed = BlockPos::new(2, 65, 0);
        let (world, ctx, mut events) = setup(
            Scenario {
                time_of_day: 14_000,
                blocks: vec![Block::new("red_bed", bed)],
                ..Default::default()
            },
            night_config(),
        );
        let fanout = ctx.events.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let _ = fanout.send(event);
            }
        });
        let sim = world.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            sim.emit(event);
        });

        assert_eq!(attempt_sleep(&ctx).await, SleepOutcome::Interrupted);
        assert!(world.commands().contains(&WorldCommand::UseBed(bed)));

        let snap = ctx.arbiter.snapshot().await.unwrap();
        assert!(!snap.sleeping);
        assert!(snap.holder.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn death_in_bed_interrupts_sleep() {
        sleep_cut_short_by(WorldEvent::Died).await;
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_in_bed_interrupts_sleep() {
        sleep_cut_short_by(WorldEvent::Disconnected).await;
    }

    #[tokio::test(start_paused = true)]
    async fn night_cycle_places_a_provisioned_bed() {
        let (world, ctx, events) = setup(
            Scenario {
                time_of_day: 14_000,
                ..Default::default()
            },
            night_config(),
        );
        run_night(world.clone(), &ctx, events, Duration::from_secs(30));
        let mut scheduler = ActivityScheduler::new(ctx);

        assert_eq!(scheduler.cycle().await, Cycle::Slept(SleepOutcome::Slept));
        let commands = world.commands();
        assert!(commands.contains(&WorldCommand::RequestItem {
            name: "red_bed".into(),
            count: 1
        }));
        assert!(commands.iter().any(|c| matches!(c, WorldCommand::Place { block, .. } if block == "red_bed")));
        assert!(commands.iter().any(|c| matches!(c, WorldCommand::UseBed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn night_without_bed_or_privilege_stays_awake() {
        let (world, ctx, _events) = setup(
            Scenario {
                time_of_day: 14_000,
                game_mode: GameMode::Survival,
                ..Default::default()
            },
            night_config(),
        );
        let arbiter = ctx.arbiter.clone();
        let mut scheduler = ActivityScheduler::new(ctx);

        assert_eq!(scheduler.cycle().await, Cycle::Slept(SleepOutcome::NoBed));
        assert!(!world.commands().iter().any(|c| matches!(c, WorldCommand::UseBed(_))));
        assert!(!arbiter.snapshot().await.unwrap().sleeping);
    }

    #[tokio::test(start_paused = true)]
    async fn night_without_auto_sleep_keeps_scheduling() {
        let (_world, ctx, _events) = setup(
            Scenario {
                time_of_day: 14_000,
                ..Default::default()
            },
            AgentConfig::default(),
        );
        let mut scheduler = ActivityScheduler::new(ctx);
        assert!(matches!(scheduler.cycle().await, Cycle::Ran(_)));
    }

    // -----------------------------------------------------------------------
    // Placement geometry
    // -----------------------------------------------------------------------

    #[test]
    fn bed_candidates_spiral_down_and_skip_own_cell() {
        let floor = BlockPos::new(10, 65, -3);
        let candidates = placement_candidates(floor);

        assert_eq!(candidates.len(), 4 * 25 - 1);
        assert_eq!(candidates[0], floor.offset(-2, -1, -2));
        assert!(!candidates.contains(&floor.offset(0, -1, 0)));
        assert!(candidates.contains(&floor.offset(0, -2, 0)));
        assert_eq!(*candidates.last().unwrap(), floor.offset(2, -4, 2));
    }

    #[test]
    fn build_candidates_are_lateral_neighbours() {
        let floor = BlockPos::new(0, 65, 0);
        let candidates = lateral_candidates(floor);

        assert_eq!(candidates.len(), 4);
        for c in &candidates {
            assert_eq!(c.reference, c.target.below());
            assert_eq!(c.face, Face::UP);
            assert_eq!(c.target.y, floor.y);
            assert_eq!((c.target.x - floor.x).abs() + (c.target.z - floor.z).abs(), 1);
        }
    }

    #[test]
    fn fragment_lookup_matches_substrings() {
        let items = vec![Item::new("oak_log", 12), Item::new("cobblestone", 40)];
        assert_eq!(find_by_fragment(&items, "log").map(|i| i.count), Some(12));
        assert_eq!(find_by_fragment(&items, "stone").map(|i| i.name.as_str()), Some("cobblestone"));
        assert!(find_by_fragment(&items, "diamond").is_none());
    }

    // -----------------------------------------------------------------------
    // Activities against the simulated world
    // -----------------------------------------------------------------------

    fn placed_and_dug(commands: &[WorldCommand]) -> (Vec<BlockPos>, Vec<BlockPos>) {
        let placed = commands
            .iter()
            .filter_map(|c| match c {
                WorldCommand::Place { target, block, .. } if block == "dirt" => Some(*target),
                _ => None,
            })
            .collect();
        let dug = commands
            .iter()
            .filter_map(|c| match c {
                WorldCommand::Dig(pos) => Some(*pos),
                _ => None,
            })
            .collect();
        (placed, dug)
    }

    #[tokio::test(start_paused = true)]
    async fn build_removes_every_block_it_places() {
        // Digging permission only shapes path planning; built blocks are
        // always taken back.
        let config = AgentConfig {
            building_enabled: true,
            ..Default::default()
        };
        let (world, ctx, _events) = setup(Scenario::default(), config);
        let grant = ctx
            .arbiter
            .acquire(Role::Activity { preemptible: false })
            .await
            .unwrap()
            .unwrap();

        Activity::Build.run(&ctx, &grant, &mut None).await.unwrap();

        let commands = world.commands();
        let (placed, dug) = placed_and_dug(&commands);
        assert!((1..=3).contains(&placed.len()));
        assert_eq!(placed, dug);
        for target in placed {
            assert!(world.block_at(target).unwrap().is_air());
        }
        assert!(commands.contains(&WorldCommand::RequestItem {
            name: "dirt".into(),
            count: 1
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn build_tries_other_faces_after_a_refusal() {
        let floor = BlockPos::new(0, 65, 0);
        let open = floor.offset(0, 0, -1);
        let config = AgentConfig {
            building_enabled: true,
            ..Default::default()
        };
        let (world, ctx, _events) = setup(
            Scenario {
                protected: vec![floor.offset(1, 0, 0), floor.offset(-1, 0, 0), floor.offset(0, 0, 1)],
                ..Default::default()
            },
            config,
        );
        let grant = ctx
            .arbiter
            .acquire(Role::Activity { preemptible: false })
            .await
            .unwrap()
            .unwrap();

        for _ in 0..4 {
            Activity::Build.run(&ctx, &grant, &mut None).await.unwrap();
        }

        let (placed, dug) = placed_and_dug(&world.commands());
        assert!(placed.len() >= 4);
        assert!(placed.iter().all(|&target| target == open));
        assert_eq!(placed, dug);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_behaviors_resolve_to_idle() {
        let chest = BlockPos::new(10, 65, 0);
        let (_world, ctx, _events) = setup(Scenario::default(), AgentConfig::default());
        assert_eq!(Activity::Build.resolve(&ctx), Activity::Idle);
        assert_eq!(Activity::Interact.resolve(&ctx), Activity::Idle);
        assert_eq!(Activity::Explore.resolve(&ctx), Activity::Explore);
        assert_eq!(Activity::Idle.resolve(&ctx), Activity::Idle);

        let mut config = AgentConfig {
            building_enabled: true,
            ..Default::default()
        };
        config.chest_interaction.enabled = true;
        let (_world, ctx, _events) = setup(Scenario::default(), config.clone());
        assert_eq!(Activity::Build.resolve(&ctx), Activity::Build);
        // Enabled, but nothing in range.
        assert_eq!(Activity::Interact.resolve(&ctx), Activity::Idle);

        let (_world, ctx, _events) = setup(
            Scenario {
                blocks: vec![Block::new("chest", chest)],
                ..Default::default()
            },
            config,
        );
        assert_eq!(Activity::Interact.resolve(&ctx), Activity::Interact);
    }

    #[tokio::test(start_paused = true)]
    async fn interact_visits_chest_and_always_closes() {
        let mut config = AgentConfig::default();
        config.chest_interaction.enabled = true;
        config.chest_interaction.deposit_items.insert("dirt".into(), 8);
        config.chest_interaction.withdraw_items.insert("log".into(), 4);
        let chest = BlockPos::new(10, 65, 0);
        let (world, ctx, _events) = setup(
            Scenario {
                inventory: vec![Item::new("dirt", 5)],
                containers: vec![avatar_autopilot::sim::SimContainer {
                    position: chest,
                    name: "chest".into(),
                    items: vec![Item::new("oak_log", 2)],
                }],
                ..Default::default()
            },
            config,
        );
        let grant = ctx
            .arbiter
            .acquire(Role::Activity { preemptible: false })
            .await
            .unwrap()
            .unwrap();

        Activity::Interact.run(&ctx, &grant, &mut None).await.unwrap();

        let commands = world.commands();
        assert!(commands.contains(&WorldCommand::OpenContainer(chest)));
        assert_eq!(commands.last(), Some(&WorldCommand::CloseContainer));
        assert!(!world.is_container_open());
        for c in &commands {
            match c {
                WorldCommand::Deposit { item, amount } => {
                    assert_eq!(item, "dirt");
                    assert_eq!(*amount, 5);
                }
                WorldCommand::Withdraw { item, amount } => {
                    assert_eq!(item, "oak_log");
                    assert_eq!(*amount, 2);
                }
                _ => {}
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn explore_captures_anchor_and_stays_in_range() {
        let (world, ctx, _events) = setup(Scenario::default(), AgentConfig::default());
        let grant = ctx
            .arbiter
            .acquire(Role::Activity { preemptible: true })
            .await
            .unwrap()
            .unwrap();
        let spawn = world.position().unwrap();
        let mut anchor = None;

        Activity::Explore.run(&ctx, &grant, &mut anchor).await.unwrap();

        assert_eq!(anchor, Some(spawn));
        let moves: Vec<_> = world
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                WorldCommand::MoveToward(target) => Some(target),
                _ => None,
            })
            .collect();
        assert!((2..=6).contains(&moves.len()));
        for target in moves {
            assert!(target.horizontal_distance_to(&spawn) <= 20.0 + 2.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn explore_yields_to_combat() {
        let (world, ctx, _events) = setup(Scenario::default(), AgentConfig::default());
        let grant = ctx
            .arbiter
            .acquire(Role::Activity { preemptible: true })
            .await
            .unwrap()
            .unwrap();
        let _combat = ctx.arbiter.acquire(Role::Combat).await.unwrap().unwrap();

        Activity::Explore.run(&ctx, &grant, &mut None).await.unwrap();
        assert!(!world
            .commands()
            .iter()
            .any(|c| matches!(c, WorldCommand::MoveToward(_))));
    }
}
