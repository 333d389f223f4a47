//! Client event ids for named engine events.

use crate::catalog::Catalog;
use crate::error::Result;
use crate::protocol::Directive;
use crate::transport::Transport;
use crate::types::ClientEventId;
use std::collections::HashMap;
use tracing::debug;

/// Assigns each event name a client id the first time it is used.
///
/// Ids are assigned in order starting at 0 and never reassigned.
#[derive(Debug, Default)]
pub struct EventIdMapper {
    ids: HashMap<String, ClientEventId>,
}

impl EventIdMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id already assigned to `name`, if any.
    pub fn get(&self, name: &str) -> Option<ClientEventId> {
        self.ids
            .get(&crate::catalog::normalize_event_name(name))
            .copied()
    }

    /// Id for `name`, mapping it on the engine first if needed.
    pub fn map_event_id<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        catalog: &Catalog,
        name: &str,
    ) -> Result<ClientEventId> {
        let normalized = catalog.validate_event(name);
        if let Some(id) = self.ids.get(&normalized) {
            return Ok(*id);
        }

        let id = ClientEventId(self.ids.len() as u32);
        let directive = Directive::MapClientEventToSimEvent {
            event_id: id,
            event_name: normalized.clone(),
        };
        transport.send(&directive.encode()?)?;
        debug!(event = %normalized, id = id.0, "mapped client event");

        self.ids.insert(normalized, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    fn setup() -> (Catalog, MemoryTransport) {
        let mut transport = MemoryTransport::new().without_handshake();
        transport.open("test").unwrap();
        (Catalog::builtin().unwrap(), transport)
    }

    #[test]
    fn test_spellings_share_one_id() {
        let (catalog, mut transport) = setup();
        let mut mapper = EventIdMapper::new();

        let a = mapper
            .map_event_id(&mut transport, &catalog, "Kohlsman_Inc")
            .unwrap();
        let b = mapper
            .map_event_id(&mut transport, &catalog, "KOHLSMAN_INC")
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(a, ClientEventId(0));
        assert_eq!(
            transport.sent(),
            vec![Directive::MapClientEventToSimEvent {
                event_id: ClientEventId(0),
                event_name: "KOHLSMAN_INC".into(),
            }]
        );
    }

    #[test]
    fn test_ids_are_sequential() {
        let (catalog, mut transport) = setup();
        let mut mapper = EventIdMapper::new();

        for (i, name) in ["GEAR_UP", "gear down", "AP-MASTER"].iter().enumerate() {
            let id = mapper.map_event_id(&mut transport, &catalog, name).unwrap();
            assert_eq!(id, ClientEventId(i as u32));
        }
        assert_eq!(mapper.len(), 3);
        assert_eq!(mapper.get("ap_master"), Some(ClientEventId(2)));
    }

    #[test]
    fn test_unknown_event_is_still_mapped() {
        let (catalog, mut transport) = setup();
        let mut mapper = EventIdMapper::new();
        let id = mapper
            .map_event_id(&mut transport, &catalog, "CUSTOM_THING")
            .unwrap();
        assert_eq!(id, ClientEventId(0));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_send_failure_assigns_nothing() {
        let (catalog, mut transport) = setup();
        transport.fail_sends("gone");
        let mut mapper = EventIdMapper::new();
        assert!(mapper.map_event_id(&mut transport, &catalog, "GEAR_UP").is_err());
        assert!(mapper.is_empty());
    }
}
