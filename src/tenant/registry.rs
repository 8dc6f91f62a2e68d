//! Construct-or-reuse cache of tenant handles.
//!
//! Each prefix maps to either a pending construction, shared by every caller
//! that arrives while it is in flight, or a ready handle. A failed
//! construction removes its own entry so the next lookup starts over.

use super::handle::{TenantHandle, TenantStats};
use super::prefix::Prefix;
use crate::config::JanitorConfig;
use crate::db::BackendConnector;
use crate::error::RegistryError;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type Construction = Shared<BoxFuture<'static, Result<Arc<TenantHandle>, RegistryError>>>;

enum Slot {
    Pending {
        generation: u64,
        construction: Construction,
    },
    Ready(Arc<TenantHandle>),
}

#[derive(Default)]
struct Slots {
    entries: HashMap<Prefix, Slot>,
    order: Vec<Prefix>,
    next_generation: u64,
}

pub struct TenantRegistry {
    connector: Arc<dyn BackendConnector>,
    janitor: JanitorConfig,
    slots: Arc<Mutex<Slots>>,
    constructions: AtomicU64,
}

impl TenantRegistry {
    pub fn new(connector: Arc<dyn BackendConnector>, janitor: JanitorConfig) -> Self {
        Self {
            connector,
            janitor,
            slots: Arc::new(Mutex::new(Slots::default())),
            constructions: AtomicU64::new(0),
        }
    }

    /// Resolve the handle for `prefix`, building it on first use.
    ///
    /// Concurrent callers for a prefix that is still being built await the
    /// same construction and receive the same `Arc`, or the same error.
    pub async fn get(&self, prefix: &str) -> Result<Arc<TenantHandle>, RegistryError> {
        let prefix = Prefix::parse(prefix)?;

        let (generation, construction) = {
            let mut slots = self.lock();
            match slots.entries.get(&prefix) {
                Some(Slot::Ready(handle)) => return Ok(Arc::clone(handle)),
                Some(Slot::Pending {
                    generation,
                    construction,
                }) => (*generation, construction.clone()),
                None => {
                    let generation = slots.next_generation;
                    slots.next_generation += 1;
                    let construction = self.construct(prefix.clone(), generation);
                    slots.entries.insert(
                        prefix.clone(),
                        Slot::Pending {
                            generation,
                            construction: construction.clone(),
                        },
                    );
                    slots.order.push(prefix.clone());
                    (generation, construction)
                }
            }
        };

        let result = construction.await;
        settle(&self.slots, &prefix, generation, &result);
        result
    }

    /// Prefixes in first-insertion order, pending constructions included.
    pub fn keys(&self) -> Vec<String> {
        self.lock()
            .order
            .iter()
            .map(|prefix| prefix.to_string())
            .collect()
    }

    /// Number of ready handles.
    pub fn size(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    /// Construction attempts started since the registry was created.
    pub fn constructions(&self) -> u64 {
        self.constructions.load(Ordering::Relaxed)
    }

    pub fn get_stats(&self) -> BTreeMap<String, TenantStats> {
        self.ready_handles()
            .into_iter()
            .map(|handle| (handle.prefix().to_string(), handle.get_stats()))
            .collect()
    }

    /// Stop every ready handle's janitor. Handles stay cached.
    pub fn close(&self) {
        let handles = self.ready_handles();
        tracing::info!(tenants = handles.len(), "closing tenant registry");
        for handle in handles {
            handle.close();
        }
    }

    fn ready_handles(&self) -> Vec<Arc<TenantHandle>> {
        let slots = self.lock();
        slots
            .order
            .iter()
            .filter_map(|prefix| match slots.entries.get(prefix) {
                Some(Slot::Ready(handle)) => Some(Arc::clone(handle)),
                _ => None,
            })
            .collect()
    }

    /// Start building the handle on its own task. The task publishes its
    /// outcome itself, so the entry settles even if every caller goes away.
    fn construct(&self, prefix: Prefix, generation: u64) -> Construction {
        self.constructions.fetch_add(1, Ordering::Relaxed);
        let connector = Arc::clone(&self.connector);
        let janitor = self.janitor.clone();
        let slots = Arc::clone(&self.slots);
        let name = prefix.to_string();

        let task = tokio::spawn(async move {
            tracing::debug!(prefix = %prefix, "constructing tenant handle");
            let result = match connector.connect(&prefix).await {
                Ok(executor) => Ok(Arc::new(TenantHandle::new(
                    prefix.clone(),
                    executor,
                    &janitor,
                ))),
                Err(source) => Err(RegistryError::Construction {
                    prefix: prefix.to_string(),
                    source: Arc::new(source),
                }),
            };
            settle(&slots, &prefix, generation, &result);
            result
        });

        async move {
            task.await.unwrap_or_else(|join_error| {
                Err(RegistryError::Interrupted {
                    prefix: name,
                    reason: join_error.to_string(),
                })
            })
        }
        .boxed()
        .shared()
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        lock_slots(&self.slots)
    }
}

fn lock_slots(slots: &Mutex<Slots>) -> MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Publish the outcome of construction `generation`. Only the attempt that
/// created the entry may change it; later calls are no-ops.
fn settle(
    slots: &Mutex<Slots>,
    prefix: &Prefix,
    generation: u64,
    result: &Result<Arc<TenantHandle>, RegistryError>,
) {
    let mut slots = lock_slots(slots);
    let current = matches!(
        slots.entries.get(prefix),
        Some(Slot::Pending { generation: g, .. }) if *g == generation
    );
    if !current {
        return;
    }

    match result {
        Ok(handle) => {
            slots
                .entries
                .insert(prefix.clone(), Slot::Ready(Arc::clone(handle)));
        }
        Err(error) => {
            tracing::warn!(prefix = %prefix, %error, "tenant handle construction failed");
            slots.entries.remove(prefix);
            slots.order.retain(|existing| existing != prefix);
        }
    }
}

impl std::fmt::Debug for TenantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantRegistry")
            .field("keys", &self.keys())
            .field("size", &self.size())
            .field("janitor", &self.janitor)
            .finish_non_exhaustive()
    }
}
