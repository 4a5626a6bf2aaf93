//! Reconnection supervisor unit tests

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use avatar_autopilot::config::AgentConfig;
    use avatar_autopilot::error::{AgentError, WorldError, WorldResult};
    use avatar_autopilot::sim::{Scenario, SimConnector, SimWorld};
    use avatar_autopilot::supervisor::{ReconnectState, Supervisor};
    use avatar_autopilot::world::{Connection, Connector, WorldEvent};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Connector with a fixed behavior per attempt.
    struct ScriptedConnector {
        connects: Arc<AtomicU32>,
        fail_with: Option<WorldError>,
        spawn: bool,
    }

    impl ScriptedConnector {
        fn failing(error: WorldError) -> (Self, Arc<AtomicU32>) {
            let connects = Arc::new(AtomicU32::new(0));
            let connector = Self {
                connects: connects.clone(),
                fail_with: Some(error),
                spawn: false,
            };
            (connector, connects)
        }

        /// Connects, optionally spawns, then drops the connection straight away.
        fn flapping(spawn: bool) -> (Self, Arc<AtomicU32>) {
            let connects = Arc::new(AtomicU32::new(0));
            let connector = Self {
                connects: connects.clone(),
                fail_with: None,
                spawn,
            };
            (connector, connects)
        }
    }

    #[async_trait]
    impl Connector for ScriptedConnector {
        async fn connect(&self) -> WorldResult<Connection> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            let (world, events) = SimWorld::new(Scenario::default());
            world.emit(WorldEvent::Connected);
            if self.spawn {
                world.spawn();
            }
            world.emit(WorldEvent::Kicked("flapping".into()));
            Ok(Connection { world, events })
        }
    }

    fn config(max_attempts: u32) -> Arc<AgentConfig> {
        let mut config = AgentConfig::default();
        config.timings.max_reconnect_attempts = max_attempts;
        config.timings.reconnect_delay_ms = 1_000;
        Arc::new(config)
    }

    // -----------------------------------------------------------------------
    // Reconnect counter
    // -----------------------------------------------------------------------

    #[test]
    fn reconnect_state_exhausts_at_ceiling() {
        let mut state = ReconnectState::new(3);
        assert_eq!(state.record_disconnect().unwrap(), 1);
        assert_eq!(state.record_disconnect().unwrap(), 2);
        match state.record_disconnect() {
            Err(AgentError::ReconnectExhausted { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn reconnect_state_resets() {
        let mut state = ReconnectState::new(2);
        state.record_disconnect().unwrap();
        state.reset();
        assert_eq!(state.attempts(), 0);
        assert_eq!(state.record_disconnect().unwrap(), 1);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_disconnects() {
        let (connector, connects) =
            ScriptedConnector::failing(WorldError::Connection("refused".into()));
        let mut supervisor = Supervisor::new(connector, config(3), CancellationToken::new());

        match supervisor.run().await {
            Err(AgentError::ReconnectExhausted { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected exhaustion, got {:?}", other),
        }
        assert_eq!(connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn authentication_failure_is_fatal_immediately() {
        let (connector, connects) =
            ScriptedConnector::failing(WorldError::Authentication("bad token".into()));
        let mut supervisor = Supervisor::new(connector, config(10), CancellationToken::new());

        assert!(matches!(
            supervisor.run().await,
            Err(AgentError::Authentication(_))
        ));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_before_spawn_counts_toward_limit() {
        let (connector, connects) = ScriptedConnector::flapping(false);
        let mut supervisor = Supervisor::new(connector, config(2), CancellationToken::new());

        assert!(matches!(
            supervisor.run().await,
            Err(AgentError::ReconnectExhausted { attempts: 2 })
        ));
        assert_eq!(connects.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_spawn_resets_the_counter() {
        let (connector, connects) = ScriptedConnector::flapping(true);
        let shutdown = CancellationToken::new();
        let mut supervisor = Supervisor::new(connector, config(2), shutdown.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            shutdown.cancel();
        });

        assert!(supervisor.run().await.is_ok());
        assert!(connects.load(Ordering::SeqCst) > 2);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_ends_a_live_session_cleanly() {
        let shutdown = CancellationToken::new();
        let mut supervisor = Supervisor::new(
            SimConnector::new(Scenario::default()),
            config(3),
            shutdown.clone(),
        );

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            shutdown.cancel();
        });

        assert!(supervisor.run().await.is_ok());
        assert_eq!(supervisor.reconnect_state().attempts(), 0);

        let snap = supervisor.arbiter().snapshot().await.unwrap();
        assert!(snap.holder.is_none());
    }
}
