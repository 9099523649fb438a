//! Stabilization run daemons to maintain dht.
//!
//! One round walks the steps of [StabilizeStep] in order. Every step that talks to a
//! remote node waits for its answer, or its timeout, before the next one starts.

use std::sync::Arc;

use crate::dht::successor::SuccessorReader;
use crate::dht::Liveness;
use crate::dht::RingState;
use crate::error::Result;
use crate::message::Probe;
use crate::transport::RingTransport;

/// Steps of a stabilization round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizeStep {
    /// 0: check the predecessor is alive, clear it otherwise. Unset or self is skipped.
    CheckPredecessor,
    /// 1: check the successor is alive, replace it from the successor list otherwise.
    CheckSuccessor,
    /// 2: ask the successor for its predecessor and adopt it if it sits in between.
    Probe,
    /// 3: pull the successor list of the successor.
    UpdateSuccessorList,
    /// 4: refresh fingers 1 to M.
    FixFingers,
    /// 5: wait for the next round.
    Sleep,
}

impl StabilizeStep {
    /// The step following `self`. [StabilizeStep::Sleep] wraps around.
    pub fn next(self) -> Self {
        match self {
            Self::CheckPredecessor => Self::CheckSuccessor,
            Self::CheckSuccessor => Self::Probe,
            Self::Probe => Self::UpdateSuccessorList,
            Self::UpdateSuccessorList => Self::FixFingers,
            Self::FixFingers => Self::Sleep,
            Self::Sleep => Self::CheckPredecessor,
        }
    }
}

/// The stabilization runner.
#[derive(Clone)]
pub struct Stabilizer {
    transport: Arc<RingTransport>,
    ring: Arc<RingState>,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(ring: Arc<RingState>, transport: Arc<RingTransport>) -> Self {
        Self { transport, ring }
    }

    /// Run stabilization once, from step 0 up to the sleep.
    pub async fn stabilize(&self) -> Result<()> {
        self.ring.ensure_in_ring()?;
        let mut step = StabilizeStep::CheckPredecessor;
        while step != StabilizeStep::Sleep {
            step = self.step(step).await;
        }
        Ok(())
    }

    /// Run a single step and return the one to run next.
    /// Failures are logged, the machine always advances.
    pub async fn step(&self, step: StabilizeStep) -> StabilizeStep {
        tracing::debug!("STABILIZATION {:?} start", step);
        let result = match step {
            StabilizeStep::CheckPredecessor => self.check_predecessor().await.map(|_| ()),
            StabilizeStep::CheckSuccessor => self.check_successor().await.map(|_| ()),
            StabilizeStep::Probe => self.probe_successor().await,
            StabilizeStep::UpdateSuccessorList => self.update_successor_list().await,
            StabilizeStep::FixFingers => self.fix_fingers().await,
            StabilizeStep::Sleep => Ok(()),
        };
        if let Err(e) = result {
            tracing::error!("[stabilize] Failed on {:?}: {}", step, e);
        }
        tracing::debug!("STABILIZATION {:?} end", step);
        step.next()
    }

    /// Step 0.
    pub async fn check_predecessor(&self) -> Result<Liveness> {
        let Some(pred) = self.ring.predecessor()? else {
            return Ok(Liveness::Skipped);
        };
        if pred.id == self.ring.id() {
            return Ok(Liveness::Skipped);
        }
        match self
            .transport
            .alive(&pred.name, Probe::CheckPredecessor)
            .await
        {
            Ok(()) => Ok(Liveness::Alive),
            Err(e) => {
                tracing::warn!("predecessor {} failed liveness check: {}", pred, e);
                self.ring.set_dead_predecessor()?;
                Ok(Liveness::Dead)
            }
        }
    }

    /// Step 1.
    pub async fn check_successor(&self) -> Result<Liveness> {
        let succ = self.ring.successor()?;
        if succ.id == self.ring.id() {
            return Ok(Liveness::Skipped);
        }
        match self
            .transport
            .alive(&succ.name, Probe::CheckSuccessor)
            .await
        {
            Ok(()) => Ok(Liveness::Alive),
            Err(e) => {
                tracing::warn!("successor {} failed liveness check: {}", succ, e);
                let next = self.ring.replace_dead_successor()?;
                if next.id != self.ring.id() {
                    if let Err(e) = self.update_successor_list().await {
                        tracing::warn!("failed to pull successor list of {}: {}", next, e);
                    }
                }
                Ok(Liveness::Dead)
            }
        }
    }

    /// Step 2.
    pub async fn probe_successor(&self) -> Result<()> {
        let me = self.ring.endpoint();
        let succ = self.ring.successor()?;
        let candidate = if succ.id == me.id {
            self.ring.predecessor()?
        } else {
            if let Err(e) = self.transport.alive(&succ.name, Probe::Stabilize).await {
                tracing::warn!("successor {} failed liveness check: {}", succ, e);
                return Ok(());
            }
            self.transport.stabilize_p1(&succ.name, &me.name).await?
        };
        if let Some(x) = candidate {
            if x.id != me.id && x.id.in_open(me.id, succ.id) {
                self.ring.adopt_successor(x)?;
            }
        }
        Ok(())
    }

    /// Step 3.
    pub async fn update_successor_list(&self) -> Result<()> {
        let succ = self.ring.successor()?;
        if succ.id == self.ring.id() {
            return Ok(());
        }
        let remote = self
            .transport
            .successor_list(&succ.name, self.ring.space())
            .await?;
        self.ring.update_successor_list(&succ, &remote)?;
        tracing::debug!(
            "{} successor list {:?}",
            self.ring.endpoint(),
            self.ring
                .successors()
                .list()?
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
        );
        Ok(())
    }

    /// Step 4.
    ///
    /// Before finger `i` is resolved the successor is pinged; if it does not answer the
    /// round stops here and step 1 repairs it next round. A finger whose lookup fails keeps
    /// its previous value.
    pub async fn fix_fingers(&self) -> Result<()> {
        let me = self.ring.id();
        let bits = usize::from(self.ring.space().bits());
        for index in 1..=bits {
            let succ = self.ring.successor()?;
            if succ.id != me {
                if let Err(e) = self
                    .transport
                    .alive(&succ.name, Probe::FixFingers(index))
                    .await
                {
                    tracing::warn!("stop fixing fingers at {}: {}", index, e);
                    return Ok(());
                }
            }
            let start = self.ring.space().finger_start(me, index)?;
            match self.transport.lookup(&self.ring, start).await {
                Ok(owner) => self.ring.set_finger(index, owner)?,
                Err(e) => tracing::warn!("failed to fix finger {} ({}): {}", index, start, e),
            }
        }
        Ok(())
    }
}

mod stabilizer {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_timer::Delay;

    use super::*;

    impl Stabilizer {
        /// Run stabilization in a loop, sleeping `interval` between rounds (step 5).
        /// Returns once the node is no longer in ring.
        pub async fn wait(self: Arc<Self>, interval: Duration) {
            loop {
                Delay::new(interval).await;
                if !self.ring.is_in_ring() {
                    tracing::info!("{} stops stabilization", self.ring.endpoint());
                    return;
                }
                self.stabilize()
                    .await
                    .unwrap_or_else(|e| tracing::error!("failed to stabilize {:?}", e))
            }
        }
    }
}
