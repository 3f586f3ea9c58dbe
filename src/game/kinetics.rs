//! Kinetic platform evaluation
//!
//! Maps a platform definition and elapsed match time to the rectangle that is
//! both drawn and collided against at that instant. Pure in `t`.

use serde::Serialize;

use super::geometry::Rect;
use super::maps::{Axis, Kinetics, Platform};

/// A platform's rectangle at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EffectivePlatform {
    pub rect: Rect,
    /// Invisible toggle platforms are not solid
    pub visible: bool,
}

/// Evaluate `platform` at `t` seconds of match time
pub fn effective(platform: &Platform, t: f32) -> EffectivePlatform {
    let base = platform.rect;
    match platform.kinetics {
        Kinetics::Static => EffectivePlatform {
            rect: base,
            visible: true,
        },
        Kinetics::Moving {
            axis,
            amplitude,
            angular_speed,
            phase,
        } => {
            let offset = (angular_speed * t + phase).sin() * amplitude;
            let rect = match axis {
                Axis::X => base.translated(offset, 0.0),
                Axis::Y => base.translated(0.0, offset),
            };
            EffectivePlatform {
                rect,
                visible: true,
            }
        }
        Kinetics::Toggle {
            period,
            duty_cycle,
            offset,
        } => EffectivePlatform {
            rect: base,
            visible: toggle_visible(t, period, duty_cycle, offset),
        },
        Kinetics::Rotate {
            angular_speed,
            radius,
            phase,
        } => {
            let angle = angular_speed * t + phase;
            EffectivePlatform {
                rect: base.translated(angle.cos() * radius, angle.sin() * radius),
                visible: true,
            }
        }
    }
}

fn toggle_visible(t: f32, period: f32, duty_cycle: f32, offset: f32) -> bool {
    if period <= 0.0 {
        return true;
    }
    (t + offset).rem_euclid(period) < duty_cycle * period
}

/// Solid rectangles of a platform set at `t`
pub fn solid_rects(platforms: &[Platform], t: f32) -> Vec<Rect> {
    platforms
        .iter()
        .map(|p| effective(p, t))
        .filter(|e| e.visible)
        .map(|e| e.rect)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    const EPS: f32 = 1e-3;

    fn base() -> Rect {
        Rect::new(100.0, 200.0, 50.0, 10.0)
    }

    #[test]
    fn static_platform_passes_through() {
        let p = Platform::fixed(100.0, 200.0, 50.0, 10.0);
        for t in [0.0, 1.5, 99.0] {
            let e = effective(&p, t);
            assert_eq!(e.rect, base());
            assert!(e.visible);
        }
    }

    #[test]
    fn moving_platform_oscillates_on_its_axis() {
        let p = Platform::kinetic(
            base(),
            Kinetics::Moving {
                axis: Axis::X,
                amplitude: 40.0,
                angular_speed: 1.0,
                phase: 0.0,
            },
        );
        let peak = effective(&p, FRAC_PI_2);
        assert!((peak.rect.x - 140.0).abs() < EPS);
        assert_eq!(peak.rect.y, 200.0);

        let trough = effective(&p, 3.0 * FRAC_PI_2);
        assert!((trough.rect.x - 60.0).abs() < EPS);
    }

    #[test]
    fn vertical_moving_platform_honours_phase() {
        let p = Platform::kinetic(
            base(),
            Kinetics::Moving {
                axis: Axis::Y,
                amplitude: 10.0,
                angular_speed: 2.0,
                phase: FRAC_PI_2,
            },
        );
        let e = effective(&p, 0.0);
        assert_eq!(e.rect.x, 100.0);
        assert!((e.rect.y - 210.0).abs() < EPS);
    }

    #[test]
    fn toggle_platform_follows_duty_cycle() {
        let p = Platform::kinetic(
            base(),
            Kinetics::Toggle {
                period: 2.0,
                duty_cycle: 0.25,
                offset: 0.0,
            },
        );
        assert!(effective(&p, 0.0).visible);
        assert!(effective(&p, 0.49).visible);
        assert!(!effective(&p, 0.5).visible);
        assert!(!effective(&p, 1.9).visible);
        assert!(effective(&p, 2.1).visible);
    }

    #[test]
    fn toggle_offset_shifts_the_window() {
        let p = Platform::kinetic(
            base(),
            Kinetics::Toggle {
                period: 2.0,
                duty_cycle: 0.5,
                offset: 1.0,
            },
        );
        assert!(!effective(&p, 0.0).visible);
        assert!(effective(&p, 1.0).visible);
    }

    #[test]
    fn rotating_platform_orbits_its_rest_position() {
        let p = Platform::kinetic(
            base(),
            Kinetics::Rotate {
                angular_speed: 1.0,
                radius: 20.0,
                phase: 0.0,
            },
        );
        let start = effective(&p, 0.0);
        assert!((start.rect.x - 120.0).abs() < EPS);
        assert!((start.rect.y - 200.0).abs() < EPS);

        let half = effective(&p, PI);
        assert!((half.rect.x - 80.0).abs() < EPS);
        assert!((half.rect.y - 200.0).abs() < EPS);

        for t in [0.3, 1.7, 4.2] {
            let e = effective(&p, t);
            let dx = e.rect.x - 100.0;
            let dy = e.rect.y - 200.0;
            assert!(((dx * dx + dy * dy).sqrt() - 20.0).abs() < EPS);
        }
    }

    #[test]
    fn solid_rects_skip_hidden_toggles() {
        let platforms = [
            Platform::fixed(0.0, 0.0, 10.0, 10.0),
            Platform::kinetic(
                base(),
                Kinetics::Toggle {
                    period: 1.0,
                    duty_cycle: 0.5,
                    offset: 0.0,
                },
            ),
        ];
        assert_eq!(solid_rects(&platforms, 0.1).len(), 2);
        assert_eq!(solid_rects(&platforms, 0.7).len(), 1);
    }
}
