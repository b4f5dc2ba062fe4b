//! Property: after any sequence of join/leave events, the scope file holds
//! exactly the in-memory scope.

use async_trait::async_trait;
use beacon_core::{
    Agent, AgentRole, Community, CommunityDirectory, DeliveryOutcome, DeliveryStrategy,
    NotificationRecord, PlatformEvent, ScopeSet, ScopeStore,
};
use proptest::prelude::*;
use std::sync::Arc;

struct Unreachable;

#[async_trait]
impl DeliveryStrategy for Unreachable {
    fn is_ready(&self) -> bool {
        true
    }

    async fn dispatch(&mut self, _record: NotificationRecord) -> DeliveryOutcome {
        DeliveryOutcome::Failed("not under test".to_string())
    }
}

struct NoCommunities;

#[async_trait]
impl CommunityDirectory for NoCommunities {
    async fn live_communities(&self) -> ScopeSet {
        ScopeSet::new()
    }
}

#[derive(Debug, Clone)]
enum Change {
    Joined(u8),
    Left(u8),
}

fn change() -> impl Strategy<Value = Change> {
    prop_oneof![
        (0u8..6).prop_map(Change::Joined),
        (0u8..6).prop_map(Change::Left),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn persisted_scope_matches_memory(changes in prop::collection::vec(change(), 0..24)) {
        let dir = tempfile::tempdir().unwrap();
        let store = ScopeStore::for_agent(dir.path(), "Monitor");

        let (in_memory, persisted) = tokio_test::block_on(async {
            let mut agent = Agent::new(
                AgentRole::Observer,
                "Monitor",
                store.clone(),
                Unreachable,
                Arc::new(NoCommunities),
            );
            agent.load_scope().await.unwrap();

            for change in &changes {
                let event = match change {
                    Change::Joined(n) => {
                        PlatformEvent::CommunityJoined(Community::new(n.to_string(), "c"))
                    }
                    Change::Left(n) => {
                        PlatformEvent::CommunityLeft(Community::new(n.to_string(), "c"))
                    }
                };
                agent.handle(event.into()).await;
            }

            let persisted = store.load().await.unwrap();
            (agent.scope().clone(), persisted)
        });

        prop_assert_eq!(in_memory, persisted);
    }
}
