//! Connection context and public client surface.
//!
//! A [`SimConnection`] owns the transport together with everything scoped
//! to one engine session: the definition registry, event id map, receivers
//! and subscriptions. Nothing outlives the connection.
//!
//! ```ignore
//! use simlink::{ConnectionConfig, MemoryTransport, SimConnection, VariableSpec};
//!
//! let mut sc = SimConnection::open(MemoryTransport::new(), ConnectionConfig::default())?;
//! let altitude = sc.get_datum("PLANE ALTITUDE", Some("meters"), None)?;
//!
//! let sub = sc.subscribe_with_callback(
//!     &["INDICATED ALTITUDE".into(), "AIRSPEED INDICATED".into()],
//!     SubscribeOptions::default(),
//!     |data| println!("{:?}", data),
//! )?;
//! while sc.receive(Some(Duration::from_secs(1)))? {}
//! sc.unsubscribe(sub)?;
//! ```

use crate::catalog::Catalog;
use crate::changedict::SimData;
use crate::config::ConnectionConfig;
use crate::definition::{DataDefinition, DefinitionRegistry, VariableSpec};
use crate::dispatch::{install_default_receivers, Dispatcher, ReceiverId, RecvFilter, ServerInfo, SessionState};
use crate::error::{DecodeError, Result, SimError};
use crate::events::EventIdMapper;
use crate::protocol::{Directive, Message, Recv, RecvId};
use crate::transport::Transport;
use crate::types::{
    ClientEventId, Period, RequestFlags, RequestId, Revision, SimValue,
    EVENT_FLAG_GROUPID_IS_PRIORITY, GROUP_PRIORITY_HIGHEST, OBJECT_ID_USER,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Called with a subscription's data after each update.
pub type SubscriptionCallback = Box<dyn FnMut(&SimData) + Send>;

/// How the engine should deliver data for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub period: Period,
    pub flags: RequestFlags,
    /// Periods to skip before the first update.
    pub origin: u32,
    /// Periods between updates.
    pub interval: u32,
    /// Updates before the engine stops sending, 0 = forever.
    pub limit: u32,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            period: Period::Second,
            flags: RequestFlags::CHANGED | RequestFlags::TAGGED,
            origin: 0,
            interval: 1,
            limit: 0,
        }
    }
}

impl SubscribeOptions {
    /// A single untagged update.
    pub fn once() -> Self {
        Self {
            period: Period::Once,
            flags: RequestFlags::DEFAULT,
            limit: 1,
            ..Self::default()
        }
    }

    pub fn period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }

    pub fn flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn origin(mut self, origin: u32) -> Self {
        self.origin = origin;
        self
    }

    pub fn interval(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Handle to an active subscription.
///
/// The data stays readable after unsubscribing through any clone of
/// [`Subscription::data`].
#[derive(Debug)]
pub struct Subscription {
    request_id: RequestId,
    definition: Arc<DataDefinition>,
    data: Arc<RwLock<SimData>>,
}

impl Subscription {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn definition(&self) -> &Arc<DataDefinition> {
        &self.definition
    }

    /// Shared, continuously updated values.
    pub fn data(&self) -> Arc<RwLock<SimData>> {
        Arc::clone(&self.data)
    }

    /// Copy of the current values.
    pub fn snapshot(&self) -> SimData {
        self.data.read().clone()
    }

    pub fn get(&self, name: &str) -> Option<SimValue> {
        self.data.read().get(name).cloned()
    }

    pub fn latest(&self) -> Revision {
        self.data.read().latest()
    }

    /// Values written after `revision`, oldest write first.
    pub fn changed_since(&self, revision: Revision) -> Vec<(String, SimValue)> {
        self.data.read().changed_since_owned(revision)
    }

    /// Resolved units per variable name.
    pub fn units(&self) -> Vec<(String, String)> {
        self.definition
            .units()
            .into_iter()
            .map(|(name, units)| (name.to_string(), units.to_string()))
            .collect()
    }
}

struct ActiveSubscription {
    receiver: ReceiverId,
    data: Arc<RwLock<SimData>>,
    callback: Option<SubscriptionCallback>,
}

/// A client session with the engine.
pub struct SimConnection<T: Transport> {
    transport: T,
    config: ConnectionConfig,
    catalog: Catalog,
    registry: DefinitionRegistry,
    events: EventIdMapper,
    dispatcher: Dispatcher,
    session: Arc<SessionState>,
    subscriptions: HashMap<RequestId, ActiveSubscription>,
    next_request: u32,
    notify_tx: Sender<RequestId>,
    notify_rx: Receiver<RequestId>,
    open: bool,
}

impl<T: Transport> SimConnection<T> {
    /// Open a session, loading the catalog named by `config`.
    pub fn open(transport: T, config: ConnectionConfig) -> Result<Self> {
        let catalog = config.load_catalog()?;
        Self::open_with_catalog(transport, config, catalog)
    }

    pub fn open_with_catalog(mut transport: T, config: ConnectionConfig, catalog: Catalog) -> Result<Self> {
        transport.open(&config.client_name)?;
        info!(client = %config.client_name, "connection opened");

        let session = Arc::new(SessionState::new());
        let mut dispatcher = Dispatcher::new(config.poll_interval);
        if config.default_receivers {
            install_default_receivers(&mut dispatcher, Arc::clone(&session));
        }
        let (notify_tx, notify_rx) = unbounded();

        Ok(Self {
            transport,
            registry: DefinitionRegistry::new(config.default_epsilon),
            config,
            catalog,
            events: EventIdMapper::new(),
            dispatcher,
            session,
            subscriptions: HashMap::new(),
            next_request: 0,
            notify_tx,
            notify_rx,
            open: true,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn definitions(&self) -> &DefinitionRegistry {
        &self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Versions reported by the engine, once its `Open` record arrived.
    pub fn server_info(&self) -> Option<ServerInfo> {
        self.session.server_info()
    }

    /// Whether the engine sent `Quit`.
    pub fn has_quit(&self) -> bool {
        self.session.has_quit()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(SimError::Closed)
        }
    }

    fn send(&mut self, directive: &Directive) -> Result<()> {
        self.transport.send(&directive.encode()?)?;
        Ok(())
    }

    /// Register a receiver for raw records of `filter`.
    pub fn add_receiver<F>(&mut self, filter: impl Into<RecvFilter>, handler: F) -> ReceiverId
    where
        F: FnMut(&Message<'_>) -> std::result::Result<bool, DecodeError> + Send + 'static,
    {
        self.dispatcher.add_receiver(filter, handler)
    }

    pub fn remove_receiver(&mut self, id: ReceiverId) -> bool {
        self.dispatcher.remove_receiver(id)
    }

    /// Poll for records and dispatch them, then run subscription callbacks.
    ///
    /// See [`Dispatcher::receive`] for the timeout semantics.
    pub fn receive(&mut self, timeout: Option<Duration>) -> Result<bool> {
        self.ensure_open()?;
        let result = self.dispatcher.receive(&mut self.transport, timeout);
        self.run_callbacks();
        result
    }

    fn run_callbacks(&mut self) {
        while let Ok(request_id) = self.notify_rx.try_recv() {
            let Some(active) = self.subscriptions.get_mut(&request_id) else {
                continue;
            };
            if let Some(callback) = active.callback.as_mut() {
                // No lock is held while the callback runs.
                let snapshot = active.data.read().clone();
                callback(&snapshot);
            }
        }
    }

    /// Subscribe to updates of `specs`.
    pub fn subscribe(&mut self, specs: &[VariableSpec], options: SubscribeOptions) -> Result<Subscription> {
        self.subscribe_inner(specs, options, None)
    }

    /// Subscribe and call `callback` with a copy of the subscription's data
    /// after every update. Callbacks run at the end of
    /// [`SimConnection::receive`] with no lock held.
    pub fn subscribe_with_callback<F>(
        &mut self,
        specs: &[VariableSpec],
        options: SubscribeOptions,
        callback: F,
    ) -> Result<Subscription>
    where
        F: FnMut(&SimData) + Send + 'static,
    {
        self.subscribe_inner(specs, options, Some(Box::new(callback)))
    }

    fn subscribe_inner(
        &mut self,
        specs: &[VariableSpec],
        options: SubscribeOptions,
        callback: Option<SubscriptionCallback>,
    ) -> Result<Subscription> {
        self.ensure_open()?;
        let definition = self
            .registry
            .create_or_reuse(&mut self.transport, &self.catalog, specs, false)?;
        let request_id = RequestId(self.next_request);
        self.next_request += 1;
        let data = Arc::new(RwLock::new(SimData::new()));

        let receiver = {
            let definition = Arc::clone(&definition);
            let data = Arc::clone(&data);
            let notify = self.notify_tx.clone();
            self.dispatcher.add_receiver(RecvId::SimObjectData, move |message| {
                let Recv::SimObjectData(record) = &message.body else {
                    return Ok(false);
                };
                if record.request_id != request_id {
                    return Ok(false);
                }
                if record.define_id != definition.id() {
                    return Err(DecodeError::InvalidField(format!(
                        "request {} answered with definition {}, expected {}",
                        request_id,
                        record.define_id,
                        definition.id()
                    )));
                }
                let written = definition.decode_into(record, &mut *data.write())?;
                debug!(request = %request_id, values = written, "updated subscription");
                // The receiving end lives as long as the connection.
                let _ = notify.send(request_id);
                Ok(true)
            })
        };

        let request = Directive::RequestDataOnSimObject {
            request_id,
            define_id: definition.id(),
            object_id: OBJECT_ID_USER,
            period: options.period,
            flags: options.flags,
            origin: options.origin,
            interval: options.interval,
            limit: options.limit,
        };
        if let Err(err) = self.send(&request) {
            self.dispatcher.remove_receiver(receiver);
            return Err(err);
        }

        self.subscriptions.insert(
            request_id,
            ActiveSubscription {
                receiver,
                data: Arc::clone(&data),
                callback,
            },
        );
        Ok(Subscription {
            request_id,
            definition,
            data,
        })
    }

    fn forget(&mut self, request_id: RequestId) -> bool {
        match self.subscriptions.remove(&request_id) {
            Some(active) => self.dispatcher.remove_receiver(active.receiver),
            None => false,
        }
    }

    /// Stop a subscription: the engine is asked to stop sending and the
    /// subscription's receiver is removed.
    ///
    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> Result<bool> {
        self.ensure_open()?;
        if !self.forget(subscription.request_id) {
            return Ok(false);
        }
        let stop = Directive::RequestDataOnSimObject {
            request_id: subscription.request_id,
            define_id: subscription.definition.id(),
            object_id: OBJECT_ID_USER,
            period: Period::Never,
            flags: RequestFlags::DEFAULT,
            origin: 0,
            interval: 0,
            limit: 0,
        };
        self.send(&stop)?;
        Ok(true)
    }

    /// Read `specs` once, waiting up to `timeout` (default
    /// `config.snapshot_timeout`). Returns empty data on timeout.
    pub fn get_snapshot(&mut self, specs: &[VariableSpec], timeout: Option<Duration>) -> Result<SimData> {
        let subscription = self.subscribe_inner(specs, SubscribeOptions::once(), None)?;
        let deadline = Instant::now() + timeout.unwrap_or(self.config.snapshot_timeout);

        let outcome = loop {
            if !subscription.data.read().is_empty() {
                break Ok(());
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break Ok(());
            }
            match self.receive(Some(remaining)) {
                Ok(true) => {}
                Ok(false) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        self.forget(subscription.request_id);
        outcome?;
        Ok(subscription.snapshot())
    }

    /// Read one variable once. `None` if nothing arrived in time.
    pub fn get_datum(
        &mut self,
        name: &str,
        units: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Option<SimValue>> {
        let mut spec = VariableSpec::new(name);
        spec.units = units.map(str::to_string);
        let data = self.get_snapshot(&[spec], timeout)?;
        Ok(data.get(name).cloned())
    }

    /// Write values; every spec must carry a value.
    pub fn set_values(&mut self, specs: &[VariableSpec]) -> Result<()> {
        self.ensure_open()?;
        let values = specs
            .iter()
            .map(|spec| {
                spec.value.clone().ok_or_else(|| {
                    SimError::InvalidArgument(format!("no value given for {}", spec.name))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let definition = self
            .registry
            .create_or_reuse(&mut self.transport, &self.catalog, specs, true)?;
        let data = definition.pack_values(&values)?;
        debug!(definition = %definition.id(), bytes = data.len(), "setting data");

        self.send(&Directive::SetDataOnSimObject {
            define_id: definition.id(),
            object_id: OBJECT_ID_USER,
            flags: 0,
            array_count: 0,
            unit_size: data.len() as u32,
            data,
        })
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<SimValue>, units: Option<&str>) -> Result<()> {
        let mut spec = VariableSpec::new(name).value(value);
        spec.units = units.map(str::to_string);
        self.set_values(&[spec])
    }

    /// Trigger a named engine event with a data argument.
    pub fn send_event(&mut self, name: &str, data: u32) -> Result<ClientEventId> {
        self.ensure_open()?;
        let event_id = self
            .events
            .map_event_id(&mut self.transport, &self.catalog, name)?;
        self.send(&Directive::TransmitClientEvent {
            object_id: OBJECT_ID_USER,
            event_id,
            data,
            group_id: GROUP_PRIORITY_HIGHEST,
            flags: EVENT_FLAG_GROUPID_IS_PRIORITY,
        })?;
        Ok(event_id)
    }

    /// Close the session. Subscriptions end with it.
    pub fn close(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let request_ids: Vec<RequestId> = self.subscriptions.keys().copied().collect();
        for request_id in request_ids {
            self.forget(request_id);
        }
        self.transport.close()?;
        info!("connection closed");
        Ok(())
    }
}

impl<T: Transport> Drop for SimConnection<T> {
    fn drop(&mut self) {
        if self.open {
            let _ = self.close();
        }
    }
}
