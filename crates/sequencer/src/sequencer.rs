use std::time::Instant;

use choreography::Timeline;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sceneconfig::SceneConfig;
use tracing::{debug, info};

use crate::particles::ParticleSet;
use crate::readiness::ReadinessGate;
use crate::scene::Scene;
use crate::stage::Stage;
use crate::stages::{script_for, ExitRule, Resources, StageScript};
use crate::SequencerError;

/// Drives the fixed stage order over a single [`Scene`].
pub struct Sequencer {
    config: SceneConfig,
    scene: Scene,
    rng: StdRng,
    current: Stage,
    script: Box<dyn StageScript>,
    gate: ReadinessGate,
    timeline: Option<Timeline<Scene>>,
    /// Seconds left before a completed stage hands over.
    exit_wait: Option<f32>,
}

impl Sequencer {
    pub fn new(config: &SceneConfig) -> Self {
        Self::with_particles(config, ParticleSet::default())
    }

    pub fn with_particles(config: &SceneConfig, particles: ParticleSet) -> Self {
        let current = Stage::Point;
        Self {
            config: config.clone(),
            scene: Scene::new(particles),
            rng: StdRng::seed_from_u64(config.sequence.seed),
            current,
            script: script_for(current, config),
            gate: ReadinessGate::new(),
            timeline: None,
            exit_wait: None,
        }
    }

    pub fn current_stage(&self) -> Stage {
        self.current
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// The current stage has run its setup.
    pub fn is_stage_active(&self) -> bool {
        self.gate.has_fired()
    }

    /// Advances the sequence by `dt` seconds.
    ///
    /// A stage whose prerequisites are missing stays pending and the previous
    /// stage's state remains on screen. Setup runs on the first tick they
    /// hold; its timeline starts playing on the following tick.
    pub fn tick(&mut self, dt: f32, resources: &Resources) -> Result<(), SequencerError> {
        self.scene.time += dt;

        if !self.gate.has_fired() {
            return self.try_activate(resources);
        }

        self.script.frame(&mut self.scene, dt, &mut self.rng);
        let Some(timeline) = self.timeline.as_mut() else {
            return Ok(());
        };
        timeline.advance(&mut self.scene, dt);

        let finished = match self.script.exit() {
            ExitRule::Progress(threshold) => timeline.progress() >= threshold,
            // the wait starts counting on the tick after completion
            ExitRule::CompleteThenWait(wait) => match self.exit_wait.as_mut() {
                Some(remaining) => {
                    *remaining -= dt;
                    *remaining <= 0.0
                }
                None => {
                    if timeline.is_complete() {
                        self.exit_wait = Some(wait.as_secs_f32());
                    }
                    false
                }
            },
            ExitRule::Terminal => false,
        };
        if !finished {
            return Ok(());
        }

        timeline.cancel();
        debug!(
            stage = %self.current,
            played = timeline.elapsed(),
            progress = timeline.progress(),
            "timeline cancelled"
        );
        let next = self
            .current
            .next()
            .ok_or(SequencerError::NoNextStage(self.current))?;
        self.advance(next)?;
        self.try_activate(resources)
    }

    fn try_activate(&mut self, resources: &Resources) -> Result<(), SequencerError> {
        self.script.prepare(&mut self.rng);
        if !self.gate.poll(self.script.is_ready(resources)) {
            return Ok(());
        }
        let started = Instant::now();
        let timeline = self
            .script
            .setup(&mut self.scene, resources, &mut self.rng)?;
        debug!(
            stage = %self.current,
            draw_count = self.scene.particles.draw_count(),
            entries = timeline.len(),
            duration = timeline.total_duration(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "stage set up"
        );
        self.timeline = Some(timeline);
        Ok(())
    }

    /// Moves to `next`, which must directly follow the current stage.
    fn advance(&mut self, next: Stage) -> Result<(), SequencerError> {
        if self.current.next() != Some(next) {
            return Err(SequencerError::OutOfOrder {
                from: self.current,
                to: next,
            });
        }
        info!(from = %self.current, to = %next, "stage transition");
        self.current = next;
        self.script = script_for(next, &self.config);
        self.gate = ReadinessGate::new();
        self.timeline = None;
        self.exit_wait = None;
        Ok(())
    }
}
