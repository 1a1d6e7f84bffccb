use crate::render::{with_alpha, Canvas, Color, Point, GOLD, RED, WHITE};

pub const PALETTE: [Color; 3] = [RED, GOLD, WHITE];

/// Velocity range per axis, in pixels per second.
const MAX_SPEED: f32 = 60.0;
/// Shrink rate in pixels of radius per second.
const SIZE_DECAY: f32 = 3.0;
/// Life lost per second. Life doubles as the particle's opacity.
const LIFE_DECAY: f32 = 120.0;
const INITIAL_LIFE: f32 = 255.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub position: (f32, f32),
    pub velocity: (f32, f32),
    pub size: f32,
    pub color: Color,
    pub life: f32,
}

impl Particle {
    pub fn is_alive(&self) -> bool {
        self.life > 0.0 && self.size > 0.0
    }
}

/// Owns every live particle and the seeded RNG that spawns them.
#[derive(Debug)]
pub struct ParticleSystem {
    particles: Vec<Particle>,
    rng: fastrand::Rng,
}

impl ParticleSystem {
    pub fn new(seed: u64) -> Self {
        Self {
            particles: Vec::new(),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Creates a particle at `(x, y)` with random velocity, size and colour.
    /// The particle is not added to the system.
    pub fn spawn(&mut self, x: f32, y: f32) -> Particle {
        let mut speed = || (self.rng.f32() * 2.0 - 1.0) * MAX_SPEED;
        let velocity = (speed(), speed());
        Particle {
            position: (x, y),
            velocity,
            size: self.rng.u32(1..=4) as f32,
            color: PALETTE[self.rng.usize(..PALETTE.len())],
            life: INITIAL_LIFE,
        }
    }

    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Adds `count` particles at random positions inside `width` x `height`.
    pub fn emit_burst(&mut self, count: usize, width: u32, height: u32) {
        for _ in 0..count {
            let x = self.rng.f32() * width as f32;
            let y = self.rng.f32() * height as f32;
            let particle = self.spawn(x, y);
            self.particles.push(particle);
        }
    }

    /// Integrates one tick of `dt` seconds and drops particles whose life or
    /// size ran out.
    pub fn advance(&mut self, dt: f32) {
        for particle in &mut self.particles {
            particle.position.0 += particle.velocity.0 * dt;
            particle.position.1 += particle.velocity.1 * dt;
            particle.size -= SIZE_DECAY * dt;
            particle.life -= LIFE_DECAY * dt;
        }
        self.particles.retain(Particle::is_alive);
    }

    /// Draws every particle as a disc whose opacity is its remaining life.
    pub fn render(&self, canvas: &mut Canvas) {
        canvas.paint(|p| {
            for particle in &self.particles {
                let alpha = particle.life.clamp(0.0, 255.0) as u8;
                let (x, y) = particle.position;
                p.fill_circle(
                    Point::new(f64::from(x), f64::from(y)),
                    f64::from(particle.size),
                    with_alpha(particle.color, alpha),
                );
            }
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TICK: f32 = 1.0 / 60.0;

    #[test]
    fn spawned_particles_fit_the_palette() {
        let mut system = ParticleSystem::new(1);
        for _ in 0..100 {
            let p = system.spawn(10.0, 20.0);
            assert!(PALETTE.contains(&p.color));
            assert!((1.0..=4.0).contains(&p.size));
            assert!(p.velocity.0.abs() <= MAX_SPEED && p.velocity.1.abs() <= MAX_SPEED);
            assert_eq!(p.life, 255.0);
        }
    }

    #[test]
    fn life_and_size_strictly_decrease() {
        let mut system = ParticleSystem::new(2);
        system.emit_burst(20, 100, 100);
        let before: Vec<_> = system.iter().cloned().collect();
        system.advance(TICK);
        for (old, new) in before.iter().zip(system.iter()) {
            assert!(new.life < old.life);
            assert!(new.size < old.size);
        }
    }

    #[test]
    fn per_tick_decay_matches_sixty_hertz_rates() {
        let mut system = ParticleSystem::new(3);
        system.push(Particle {
            position: (0.0, 0.0),
            velocity: (60.0, -30.0),
            size: 2.0,
            color: RED,
            life: 255.0,
        });
        system.advance(TICK);
        let p = system.iter().next().unwrap();
        assert!((p.life - 253.0).abs() < 1e-3);
        assert!((p.size - 1.95).abs() < 1e-4);
        assert!((p.position.0 - 1.0).abs() < 1e-4);
        assert!((p.position.1 + 0.5).abs() < 1e-4);
    }

    #[test]
    fn dead_particles_are_culled_before_render() {
        let mut system = ParticleSystem::new(4);
        system.push(Particle {
            position: (5.0, 5.0),
            velocity: (0.0, 0.0),
            size: 3.0,
            color: WHITE,
            life: 1.0,
        });
        system.push(Particle {
            position: (5.0, 5.0),
            velocity: (0.0, 0.0),
            size: 0.01,
            color: GOLD,
            life: 200.0,
        });
        system.advance(TICK);
        assert!(system.is_empty());

        let mut canvas = Canvas::new(10, 10);
        system.render(&mut canvas);
        assert!(canvas.data().iter().all(|byte| *byte == 0));
    }

    #[test]
    fn fading_particles_draw_translucent() {
        let mut system = ParticleSystem::new(6);
        system.push(Particle {
            position: (10.0, 10.0),
            velocity: (0.0, 0.0),
            size: 4.0,
            color: WHITE,
            life: 128.0,
        });
        let mut canvas = Canvas::new(20, 20);
        canvas.fill(crate::render::BLACK);
        system.render(&mut canvas);
        let centre = canvas.pixel(10, 10);
        assert!((120..=136).contains(&centre[0]), "{centre:?}");
        assert_eq!(canvas.pixel(0, 0), crate::render::BLACK);
    }

    #[test]
    fn every_particle_dies_eventually() {
        let mut system = ParticleSystem::new(5);
        system.emit_burst(50, 1280, 720);
        // Size 4 shrinks at 3 px/s, so nothing survives past 4/3 s.
        for _ in 0..81 {
            system.advance(TICK);
        }
        assert!(system.is_empty());
    }

    #[test]
    fn same_seed_same_particles() {
        let mut a = ParticleSystem::new(42);
        let mut b = ParticleSystem::new(42);
        a.emit_burst(5, 640, 360);
        b.emit_burst(5, 640, 360);
        assert!(a.iter().eq(b.iter()));
    }
}
