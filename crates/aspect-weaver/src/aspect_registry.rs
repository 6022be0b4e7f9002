// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use aspect_model::error::AspectError;
use aspect_pointcut::Pointcut;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::{
    advice::Advice,
    aspect::{Aspect, AspectInstance},
    error::RegistrationError,
    order::{Order, Precedence},
};

/// An enabled aspect.
pub struct RegisteredAspect {
    id: String,
    order: Order,
    instance: AspectInstance,
}

impl RegisteredAspect {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn type_name(&self) -> &'static str {
        self.instance.type_name()
    }

    pub fn downcast<A: Aspect>(&self) -> Option<Arc<A>> {
        self.instance.downcast()
    }
}

impl fmt::Debug for RegisteredAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredAspect")
            .field("id", &self.id)
            .field("order", &self.order)
            .field("type_name", &self.type_name())
            .finish()
    }
}

/// The outcome of a registration: the aspect and its advices, bound and ready to be indexed.
pub(crate) struct Registration {
    pub aspect: Arc<RegisteredAspect>,
    pub advices: Vec<Advice>,
    /// An aspect with the same id was enabled before and has been replaced.
    pub replaced: bool,
}

#[derive(Default)]
pub struct AspectRegistry {
    aspects: RwLock<IndexMap<String, Arc<RegisteredAspect>>>,
    default_ids: Mutex<HashMap<&'static str, usize>>,
    aspect_seq: AtomicU64,
    advice_seq: AtomicU64,
}

impl AspectRegistry {
    pub(crate) fn register(
        &self,
        mut instance: AspectInstance,
        strict_ids: bool,
    ) -> Result<Registration, RegistrationError> {
        let options = instance.options.take().ok_or_else(|| {
            AspectError::new(instance.type_name(), format!("{} is not an aspect", instance.type_name()))
        })?;

        let id = match options.id {
            Some(id) => id,
            None => self.default_id(instance.type_name()),
        };
        let aspect_order = options.order.unwrap_or_default();
        let aspect_seq = self.aspect_seq.fetch_add(1, Ordering::Relaxed);

        let advices = std::mem::take(&mut instance.advices)
            .into_iter()
            .map(|definition| {
                let pointcut = Pointcut::parse(definition.phase, &definition.expression).map_err(
                    |source| RegistrationError::Pointcut {
                        aspect: id.clone(),
                        advice: definition.name.clone(),
                        expression: definition.expression.clone(),
                        source,
                    },
                )?;

                let precedence = Precedence {
                    aspect_order,
                    aspect_seq,
                    advice_order: definition.order.unwrap_or_default(),
                    advice_seq: self.advice_seq.fetch_add(1, Ordering::Relaxed),
                };

                Ok::<_, RegistrationError>(Advice::new(
                    definition.name,
                    pointcut,
                    id.clone(),
                    precedence,
                    definition.body,
                ))
            })
            .collect::<Result<Vec<_>, RegistrationError>>()?;

        let aspect = Arc::new(RegisteredAspect {
            id: id.clone(),
            order: aspect_order,
            instance,
        });

        let mut aspects = self.aspects.write();
        let replaced = match aspects.get(&id) {
            Some(_) if strict_ids => return Err(RegistrationError::DuplicateId(id)),
            Some(existing) => {
                warn!(
                    aspect = %id,
                    previous = existing.type_name(),
                    replacement = aspect.type_name(),
                    "An aspect with this id is already enabled, replacing it"
                );
                true
            }
            None => false,
        };
        aspects.insert(id, aspect.clone());

        Ok(Registration {
            aspect,
            advices,
            replaced,
        })
    }

    pub fn remove(&self, id: &str) -> Option<Arc<RegisteredAspect>> {
        self.aspects.write().shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Arc<RegisteredAspect>> {
        self.aspects.read().get(id).cloned()
    }

    /// Ids of the enabled aspects, in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.aspects.read().keys().cloned().collect()
    }

    fn default_id(&self, type_name: &'static str) -> String {
        let mut default_ids = self.default_ids.lock();
        let count = default_ids.entry(type_name).or_insert(0);
        let id = format!("{type_name}#{count}");
        *count += 1;
        id
    }
}
