//! Simulated world unit tests

#[cfg(test)]
mod tests {
    use avatar_autopilot::error::WorldError;
    use avatar_autopilot::sim::{Scenario, SimWorld, WorldCommand, COMMAND_LOG_CAPACITY};
    use avatar_autopilot::types::{Block, BlockPos, Control, EquipSlot, Face, GameMode, Item, Vec3};
    use avatar_autopilot::world::{WorldEvent, WorldInterface};

    fn bed_scenario(time_of_day: u32) -> Scenario {
        Scenario {
            time_of_day,
            blocks: vec![Block::new("white_bed", BlockPos::new(1, 65, 0))],
            ..Default::default()
        }
    }

    #[test]
    fn nothing_is_known_before_spawn() {
        let (world, _events) = SimWorld::new(Scenario::default());
        assert!(world.position().is_none());
        assert!(world.game_mode().is_none());
        assert!(world.block_at(BlockPos::new(0, 64, 0)).is_none());
    }

    #[tokio::test]
    async fn spawn_announces_and_places_avatar() {
        let (world, mut events) = SimWorld::new(Scenario::default());
        world.spawn();
        assert_eq!(events.recv().await, Some(WorldEvent::Spawned));
        assert_eq!(world.position(), Some(Vec3::new(0.5, 65.0, 0.5)));
        assert_eq!(world.block_at(BlockPos::new(0, 64, 0)).unwrap().name, "grass_block");
        assert!(world.block_at(BlockPos::new(0, 65, 0)).unwrap().is_air());
    }

    #[tokio::test]
    async fn beds_only_work_at_night() {
        let (world, _events) = SimWorld::new(bed_scenario(6_000));
        world.spawn();
        let bed = BlockPos::new(1, 65, 0);
        assert!(matches!(
            world.use_bed(bed).await,
            Err(WorldError::Rejected { action: "sleep", .. })
        ));

        world.set_time_of_day(18_000);
        world.use_bed(bed).await.unwrap();
        assert!(world.is_sleeping());
    }

    #[tokio::test]
    async fn clock_wakes_a_sleeper_at_morning() {
        let (world, mut events) = SimWorld::new(bed_scenario(18_000));
        world.spawn();
        world.use_bed(BlockPos::new(1, 65, 0)).await.unwrap();

        world.advance_clock(20);
        assert!(!world.is_sleeping());
        assert_eq!(world.time_of_day(), Some(0));

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert!(seen.contains(&WorldEvent::Wake));
    }

    #[tokio::test]
    async fn provisioning_requires_creative() {
        let (world, _events) = SimWorld::new(Scenario {
            game_mode: GameMode::Survival,
            ..Default::default()
        });
        world.spawn();
        assert!(world.request_item("dirt", 4).await.is_err());

        world.set_game_mode(GameMode::Creative);
        let item = world.request_item("dirt", 4).await.unwrap().unwrap();
        assert_eq!(item, Item::new("dirt", 4));
    }

    #[tokio::test]
    async fn gamemode_command_respects_permission() {
        let (world, _events) = SimWorld::new(Scenario {
            game_mode: GameMode::Survival,
            mode_changes_allowed: false,
            ..Default::default()
        });
        world.spawn();
        world.send_command("/gamemode creative").await.unwrap();
        assert_eq!(world.game_mode(), Some(GameMode::Survival));
    }

    #[tokio::test]
    async fn protected_cells_refuse_placement() {
        let target = BlockPos::new(1, 65, 0);
        let (world, _events) = SimWorld::new(Scenario {
            protected: vec![target],
            ..Default::default()
        });
        world.spawn();
        world.give("dirt", 4);
        world.equip(&Item::new("dirt", 4), EquipSlot::Hand).await.unwrap();

        let refused = world.place_block(target.below(), Face::UP).await;
        assert!(matches!(refused, Err(WorldError::Rejected { .. })));
        assert!(world.block_at(target).unwrap().is_air());

        let open = BlockPos::new(-1, 65, 0);
        world.place_block(open.below(), Face::UP).await.unwrap();
        assert_eq!(world.block_at(open).unwrap().name, "dirt");
    }

    #[test]
    fn command_log_keeps_only_the_latest() {
        let (world, _events) = SimWorld::new(Scenario::default());
        world.spawn();
        for i in 0..COMMAND_LOG_CAPACITY + 10 {
            world.set_control(Control::Jump, i % 2 == 0);
        }

        let commands = world.commands();
        assert_eq!(commands.len(), COMMAND_LOG_CAPACITY);
        // The first ten (starting with a press) were dropped.
        assert_eq!(
            commands.first(),
            Some(&WorldCommand::Control {
                control: Control::Jump,
                on: true
            })
        );
        assert_eq!(
            commands.last(),
            Some(&WorldCommand::Control {
                control: Control::Jump,
                on: false
            })
        );
    }
}
