//! Transaction wrapper with a queue of effects that run only after commit
//!
//! A write that must trigger follow-up work (consumption posting when a plan
//! is marked done) queues a [`DeferredEffect`] instead of running it inline.
//! [`UnitOfWork::commit`] hands the queue back only once `COMMIT` succeeded;
//! dropping the unit of work rolls the transaction back and discards the queue.

use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::AppResult;

/// Work to run after the enclosing transaction is durable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredEffect {
    /// `capacity` is the plan's remaining capacity when it entered `done`
    PostConsumption { plan_id: Uuid, capacity: i32 },
}

pub struct UnitOfWork {
    tx: Transaction<'static, Postgres>,
    effects: Vec<DeferredEffect>,
}

impl UnitOfWork {
    pub async fn begin(db: &PgPool) -> AppResult<Self> {
        Ok(Self {
            tx: db.begin().await?,
            effects: Vec::new(),
        })
    }

    /// Connection bound to the open transaction
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    pub fn defer(&mut self, effect: DeferredEffect) {
        self.effects.push(effect);
    }

    /// Commit and release the queued effects in the order they were queued
    pub async fn commit(self) -> AppResult<Vec<DeferredEffect>> {
        self.tx.commit().await?;
        Ok(self.effects)
    }
}
