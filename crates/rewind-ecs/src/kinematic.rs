//! Built-in movement component.

use serde::{Deserialize, Serialize};

use rewind_math::prelude::*;

use crate::codec::{CodecError, StateReader, StateWriter};
use crate::collider::Collision;
use crate::component::{Capabilities, Component, EntityContext};

/// Integrates a velocity every tick and pushes its entity out of solid
/// contacts when they begin.
///
/// Resolution happens on hit *Enter* only; a contact that persists is
/// reported as Stay and left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KinematicBody {
    /// Units per second.
    pub velocity: FVec3,
    /// Added to `velocity` every second.
    pub acceleration: FVec3,
    /// Zero the velocity component along the hit normal on resolve.
    pub stop_on_hit: bool,
    /// Total separation applied since spawn.
    pub pushed: FVec2,
}

impl KinematicBody {
    pub const NAME: &'static str = "kinematic_body";

    pub fn new(velocity: FVec3) -> Self {
        Self {
            velocity,
            ..Self::default()
        }
    }

    pub fn stop_on_hit(mut self) -> Self {
        self.stop_on_hit = true;
        self
    }
}

impl Component for KinematicBody {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TICK | Capabilities::HIT | Capabilities::STATE
    }

    fn tick(&mut self, ctx: &mut EntityContext<'_>) {
        self.velocity += self.acceleration * ctx.dt;
        ctx.core.transform.translate(self.velocity * ctx.dt);
    }

    fn on_hit_enter(&mut self, hit: &Collision, ctx: &mut EntityContext<'_>) {
        if hit.separation == FVec2::ZERO {
            return;
        }
        ctx.core.transform.translate(FVec3::from(hit.separation));
        self.pushed += hit.separation;
        if self.stop_on_hit {
            let n = FVec3::from(hit.normal);
            let into = self.velocity.dot(n);
            if into.is_negative() {
                self.velocity -= n * into;
            }
        }
    }

    fn save(&self, out: &mut StateWriter) -> Result<(), CodecError> {
        out.write(self)
    }

    fn load(&mut self, input: &mut StateReader<'_>) -> Result<(), CodecError> {
        *self = input.read()?;
        Ok(())
    }
}
