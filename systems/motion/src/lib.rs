#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Presentation-side animation of agent steps.
//!
//! Every accepted step turns the agent toward its direction of travel and
//! then slides it between cell centers. Animation time only advances through
//! `TimeAdvanced` events, so turn resolution never waits on it.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use pursuit_core::{AgentId, CellCoord, Direction, Event, GridLayout};
use tracing::trace;

/// Durations of the animation phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionConfig {
    /// Time spent turning to face the next cell.
    pub rotation_duration: Duration,
    /// Time spent sliding into the next cell.
    pub translation_duration: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            rotation_duration: Duration::from_millis(150),
            translation_duration: Duration::from_millis(250),
        }
    }
}

/// Phase an agent's animation is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MotionPhase {
    /// Resting at a cell center.
    Idle,
    /// Turning in place.
    Rotating,
    /// Sliding toward the next cell.
    Translating,
}

/// Interpolated presentation state of an agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    /// World position of the agent.
    pub position: Vec2,
    /// Clockwise heading in degrees with north at zero.
    pub heading_degrees: f32,
}

/// Animation state machine for every agent on the grid.
#[derive(Debug, Default)]
pub struct Motion {
    config: MotionConfig,
    tracks: BTreeMap<AgentId, Track>,
}

impl Motion {
    /// Creates a motion system with the provided phase durations.
    #[must_use]
    pub fn new(config: MotionConfig) -> Self {
        Self {
            config,
            tracks: BTreeMap::new(),
        }
    }

    /// Consumes world events and advances the animations.
    pub fn handle(&mut self, events: &[Event], layout: &GridLayout) {
        for event in events {
            match event {
                Event::GridConfigured { .. } => self.tracks.clear(),
                Event::AgentSpawned {
                    agent,
                    cell,
                    facing,
                } => {
                    let _ = self
                        .tracks
                        .insert(*agent, Track::at_rest(layout.center_of(*cell), *facing));
                }
                Event::AgentStepped {
                    agent,
                    from,
                    to,
                    direction,
                } => {
                    if let Some(track) = self.tracks.get_mut(agent) {
                        track.begin_step(layout, *from, *to, *direction);
                        trace!(agent = agent.get(), phase = ?track.phase, "step animation started");
                    }
                }
                Event::TimeAdvanced { dt } => {
                    for track in self.tracks.values_mut() {
                        track.advance(*dt, &self.config);
                    }
                }
                _ => {}
            }
        }
    }

    /// Current pose of the agent.
    #[must_use]
    pub fn pose(&self, agent: AgentId) -> Option<Pose> {
        self.tracks
            .get(&agent)
            .map(|track| track.pose(&self.config))
    }

    /// Current animation phase of the agent.
    #[must_use]
    pub fn phase(&self, agent: AgentId) -> Option<MotionPhase> {
        self.tracks.get(&agent).map(|track| track.phase)
    }

    /// Reports whether every agent rests at a cell center.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.tracks
            .values()
            .all(|track| track.phase == MotionPhase::Idle)
    }
}

#[derive(Clone, Copy, Debug)]
struct Track {
    origin: Vec2,
    destination: Vec2,
    start_heading: f32,
    end_heading: f32,
    phase: MotionPhase,
    elapsed: Duration,
}

impl Track {
    fn at_rest(position: Vec2, facing: Direction) -> Self {
        let heading = facing.heading_degrees();
        Self {
            origin: position,
            destination: position,
            start_heading: heading,
            end_heading: heading,
            phase: MotionPhase::Idle,
            elapsed: Duration::ZERO,
        }
    }

    fn begin_step(
        &mut self,
        layout: &GridLayout,
        from: CellCoord,
        to: CellCoord,
        direction: Direction,
    ) {
        // An in-flight step snaps to its end before the next one starts.
        self.settle();

        self.origin = layout.center_of(from);
        self.destination = layout.center_of(to);
        self.start_heading = self.end_heading;
        self.end_heading = direction.heading_degrees();
        self.elapsed = Duration::ZERO;
        self.phase = if self.start_heading == self.end_heading {
            MotionPhase::Translating
        } else {
            MotionPhase::Rotating
        };
    }

    fn settle(&mut self) {
        self.origin = self.destination;
        self.start_heading = self.end_heading;
        self.phase = MotionPhase::Idle;
        self.elapsed = Duration::ZERO;
    }

    fn advance(&mut self, dt: Duration, config: &MotionConfig) {
        let mut remaining = dt;
        loop {
            let duration = match self.phase {
                MotionPhase::Idle => return,
                MotionPhase::Rotating => config.rotation_duration,
                MotionPhase::Translating => config.translation_duration,
            };

            let left = duration.saturating_sub(self.elapsed);
            if remaining < left {
                self.elapsed += remaining;
                return;
            }
            remaining -= left;
            self.elapsed = Duration::ZERO;

            match self.phase {
                MotionPhase::Rotating => {
                    self.start_heading = self.end_heading;
                    self.phase = MotionPhase::Translating;
                }
                _ => {
                    self.settle();
                    return;
                }
            }
        }
    }

    fn pose(&self, config: &MotionConfig) -> Pose {
        match self.phase {
            MotionPhase::Idle => Pose {
                position: self.destination,
                heading_degrees: self.end_heading,
            },
            MotionPhase::Rotating => {
                let t = progress(self.elapsed, config.rotation_duration);
                Pose {
                    position: self.origin,
                    heading_degrees: interpolate_heading(self.start_heading, self.end_heading, t),
                }
            }
            MotionPhase::Translating => {
                let t = progress(self.elapsed, config.translation_duration);
                Pose {
                    position: self.origin.lerp(self.destination, t),
                    heading_degrees: self.end_heading,
                }
            }
        }
    }
}

fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / duration.as_secs_f32()).clamp(0.0, 1.0)
}

/// Turns along the shorter arc.
fn interpolate_heading(from: f32, to: f32, t: f32) -> f32 {
    let delta = (to - from + 540.0).rem_euclid(360.0) - 180.0;
    (from + delta * t).rem_euclid(360.0)
}
