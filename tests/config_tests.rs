//! Configuration and scenario loading unit tests

#[cfg(test)]
mod tests {
    use avatar_autopilot::config::AgentConfig;
    use avatar_autopilot::error::AgentError;
    use avatar_autopilot::sim::Scenario;
    use avatar_autopilot::types::{EntityFlags, GameMode};
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "avatar-autopilot-{}-{}",
            std::process::id(),
            name
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    // -----------------------------------------------------------------------
    // Agent config
    // -----------------------------------------------------------------------

    #[test]
    fn defaults_match_documented_values() {
        let config = AgentConfig::default();
        assert_eq!(config.block_type, "dirt");
        assert_eq!(config.explore_radius, 20.0);
        assert_eq!(config.required_mode, GameMode::Creative);
        assert!(!config.combat_settings.enabled);
        assert_eq!(config.combat_settings.engagement_distance, 8.0);
        assert_eq!(config.timings.threat_scan(), Duration::from_secs(1));
        assert_eq!(config.timings.keepalive_threshold(), Duration::from_secs(45));
        assert_eq!(config.timings.max_reconnect_attempts, 10);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = std::env::temp_dir().join("avatar-autopilot-does-not-exist.json");
        let config = assert_ok!(AgentConfig::load(Some(path.as_path())));
        assert_eq!(config.bed_search_radius, 16.0);
        assert!(config.mode_enforcement);
    }

    #[test]
    fn camel_case_json_file_loads() {
        let path = write_temp(
            "config.json",
            r#"{
                "buildingEnabled": true,
                "blockType": "cobblestone",
                "exploreRadius": 35,
                "autoSleep": true,
                "requiredMode": "survival",
                "chestInteraction": {
                    "enabled": true,
                    "depositItems": { "dirt": 16 }
                },
                "combatSettings": { "enabled": true, "engagementDistance": 6 },
                "timings": { "maxReconnectAttempts": 4 }
            }"#,
        );

        let config = assert_ok!(AgentConfig::load(Some(path.as_path())));
        std::fs::remove_file(&path).ok();

        assert!(config.building_enabled);
        assert_eq!(config.block_type, "cobblestone");
        assert_eq!(config.explore_radius, 35.0);
        assert!(config.auto_sleep);
        assert_eq!(config.required_mode, GameMode::Survival);
        assert!(config.chest_interaction.enabled);
        assert_eq!(config.chest_interaction.search_radius, 32.0);
        assert_eq!(config.chest_interaction.deposit_items.get("dirt"), Some(&16));
        assert!(config.combat_settings.enabled);
        assert_eq!(config.combat_settings.engagement_distance, 6.0);
        assert_eq!(config.combat_settings.detection_radius, 16.0);
        assert_eq!(config.timings.max_reconnect_attempts, 4);
        assert_eq!(config.timings.reconnect_delay_ms, 5_000);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let path = write_temp("broken.json", "{ \"exploreRadius\": ");
        let result = AgentConfig::load(Some(path.as_path()));
        std::fs::remove_file(&path).ok();
        assert!(matches!(assert_err!(result), AgentError::Config(_)));
    }

    // -----------------------------------------------------------------------
    // Scenario
    // -----------------------------------------------------------------------

    #[test]
    fn scenario_json_fills_defaults() {
        let scenario = Scenario::from_json(
            r#"{
                "timeOfDay": 14000,
                "gameMode": "survival",
                "entities": [
                    { "id": 3, "species": "enderman", "position": { "x": 4.0, "y": 65.0, "z": 0.0 }, "flags": "ALERT" }
                ],
                "inventory": [ { "name": "dirt", "count": 12 } ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.time_of_day, 14_000);
        assert_eq!(scenario.game_mode, GameMode::Survival);
        assert_eq!(scenario.ground_level, 64);
        assert!(scenario.mode_changes_allowed);

        let enderman = &scenario.entities[0];
        assert_eq!(enderman.health, 20.0);
        assert_eq!(enderman.entity.flags, EntityFlags::ALERT);
        assert!(enderman.entity.alive);
        assert_eq!(scenario.inventory[0].count, 12);
    }

    #[test]
    fn scenario_errors_are_typed() {
        assert!(matches!(
            Scenario::from_json("[1, 2"),
            Err(AgentError::Scenario(_))
        ));
        let missing = std::env::temp_dir().join("avatar-autopilot-missing-scenario.json");
        assert!(matches!(
            Scenario::load(&missing),
            Err(AgentError::Read { .. })
        ));
    }
}
