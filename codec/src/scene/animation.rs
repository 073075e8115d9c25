//! Animation clips and keyframe sampling

use glam::{Quat, Vec3, Vec4};
use std::ops::{Add, Mul};

use crate::model::{Interpolation, TargetPath};

/// Keyframe values of one track
///
/// With [`Interpolation::CubicSpline`] every key holds three values in the
/// order in-tangent, value, out-tangent. Weight tracks store
/// `morph target count` values per key (times three for cubic splines).
#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
    Weights(Vec<f32>),
}

impl TrackValues {
    pub fn path(&self) -> TargetPath {
        match self {
            Self::Translation(_) => TargetPath::Translation,
            Self::Rotation(_) => TargetPath::Rotation,
            Self::Scale(_) => TargetPath::Scale,
            Self::Weights(_) => TargetPath::Weights,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Translation(v) | Self::Scale(v) => v.len(),
            Self::Rotation(v) => v.len(),
            Self::Weights(v) => v.len(),
        }
    }
}

/// Value of a track at one point in time
#[derive(Debug, Clone, PartialEq)]
pub enum TrackSample {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
    Weights(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationTrack {
    /// Target node index in the scene tree
    pub node: usize,
    pub interpolation: Interpolation,
    /// Keyframe times in seconds, ascending
    pub times: Vec<f32>,
    pub values: TrackValues,
}

impl AnimationTrack {
    pub fn path(&self) -> TargetPath {
        self.values.path()
    }

    /// Values stored per keyframe
    fn values_per_key(&self) -> usize {
        match self.interpolation {
            Interpolation::CubicSpline => 3,
            _ => 1,
        }
    }

    /// Morph weights per keyframe value (1 for transform tracks)
    pub fn width(&self) -> usize {
        let keys = self.times.len() * self.values_per_key();
        match &self.values {
            TrackValues::Weights(values) if keys > 0 => values.len() / keys,
            _ => 1,
        }
    }

    /// Whether the value count matches the key count
    pub fn is_consistent(&self) -> bool {
        let keys = self.times.len() * self.values_per_key();
        match &self.values {
            TrackValues::Weights(values) => keys > 0 && values.len() % keys == 0,
            other => other.len() == keys,
        }
    }

    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Keyframe times are finite and ascending
    pub fn has_valid_times(&self) -> bool {
        self.times.iter().all(|t| t.is_finite()) && self.times.windows(2).all(|w| w[0] <= w[1])
    }

    /// Sample the track; times outside the keyframe range clamp to the ends
    pub fn sample(&self, time: f32) -> Option<TrackSample> {
        if !time.is_finite() || self.times.is_empty() || !self.is_consistent() {
            return None;
        }
        let key = locate(&self.times, time);
        let per_key = self.values_per_key();
        let interpolation = self.interpolation;

        Some(match &self.values {
            TrackValues::Translation(values) => TrackSample::Translation(interpolate(
                key,
                interpolation,
                |i, slot| values[i * per_key + slot],
                Vec3::lerp,
            )),
            TrackValues::Scale(values) => TrackSample::Scale(interpolate(
                key,
                interpolation,
                |i, slot| values[i * per_key + slot],
                Vec3::lerp,
            )),
            TrackValues::Rotation(values) => {
                let rotation = interpolate(
                    key,
                    interpolation,
                    |i, slot| Vec4::from(values[i * per_key + slot]),
                    |a, b, t| Vec4::from(Quat::from_vec4(a).slerp(Quat::from_vec4(b), t)),
                );
                TrackSample::Rotation(Quat::from_vec4(rotation).normalize())
            }
            TrackValues::Weights(values) => {
                let width = self.width();
                let weights = (0..width)
                    .map(|w| {
                        interpolate(
                            key,
                            interpolation,
                            |i, slot| values[(i * per_key + slot) * width + w],
                            |a: f32, b: f32, t| a + (b - a) * t,
                        )
                    })
                    .collect();
                TrackSample::Weights(weights)
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationClip {
    pub name: Option<String>,
    pub tracks: Vec<AnimationTrack>,
}

impl AnimationClip {
    /// Last keyframe time over all tracks
    pub fn duration(&self) -> f32 {
        self.tracks
            .iter()
            .map(AnimationTrack::duration)
            .fold(0.0, f32::max)
    }

    /// Tracks animating `node`
    pub fn tracks_for(&self, node: usize) -> impl Iterator<Item = &AnimationTrack> {
        self.tracks.iter().filter(move |track| track.node == node)
    }
}

/// Surrounding keyframes of a time and the blend factor between them
#[derive(Debug, Clone, Copy, PartialEq)]
struct KeySpan {
    prev: usize,
    next: usize,
    t: f32,
    dt: f32,
}

fn locate(times: &[f32], time: f32) -> KeySpan {
    let last = times.len() - 1;
    if last == 0 || time <= times[0] {
        return KeySpan { prev: 0, next: 0, t: 0.0, dt: 0.0 };
    }
    if time >= times[last] {
        return KeySpan { prev: last, next: last, t: 0.0, dt: 0.0 };
    }
    // Unordered or NaN keys can put the split point at either end
    let next = times.partition_point(|&key| key <= time).clamp(1, last);
    let prev = next - 1;
    let dt = times[next] - times[prev];
    let t = if dt > 0.0 { (time - times[prev]) / dt } else { 0.0 };
    KeySpan { prev, next, t, dt }
}

// Cubic spline slots within a key
const IN_TANGENT: usize = 0;
const VALUE: usize = 1;
const OUT_TANGENT: usize = 2;

fn interpolate<T, V, L>(key: KeySpan, interpolation: Interpolation, value: V, lerp: L) -> T
where
    T: Copy + Add<Output = T> + Mul<f32, Output = T>,
    V: Fn(usize, usize) -> T,
    L: Fn(T, T, f32) -> T,
{
    match interpolation {
        Interpolation::Step => value(key.prev, 0),
        Interpolation::Linear => {
            if key.prev == key.next {
                value(key.prev, 0)
            } else {
                lerp(value(key.prev, 0), value(key.next, 0), key.t)
            }
        }
        Interpolation::CubicSpline => {
            if key.prev == key.next {
                return value(key.prev, VALUE);
            }
            let t = key.t;
            let t2 = t * t;
            let t3 = t2 * t;
            let p0 = value(key.prev, VALUE);
            let m0 = value(key.prev, OUT_TANGENT) * key.dt;
            let p1 = value(key.next, VALUE);
            let m1 = value(key.next, IN_TANGENT) * key.dt;
            p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
                + m0 * (t3 - 2.0 * t2 + t)
                + p1 * (-2.0 * t3 + 3.0 * t2)
                + m1 * (t3 - t2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation_track(interpolation: Interpolation, values: Vec<Vec3>) -> AnimationTrack {
        AnimationTrack {
            node: 0,
            interpolation,
            times: vec![0.0, 1.0],
            values: TrackValues::Translation(values),
        }
    }

    #[test]
    fn test_linear_midpoint() {
        let track = translation_track(Interpolation::Linear, vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]);
        assert_eq!(
            track.sample(0.5),
            Some(TrackSample::Translation(Vec3::new(1.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn test_step_holds_previous() {
        let track = translation_track(Interpolation::Step, vec![Vec3::ZERO, Vec3::ONE]);
        assert_eq!(track.sample(0.99), Some(TrackSample::Translation(Vec3::ZERO)));
        assert_eq!(track.sample(1.0), Some(TrackSample::Translation(Vec3::ONE)));
    }

    #[test]
    fn test_clamps_outside_range() {
        let track = translation_track(Interpolation::Linear, vec![Vec3::ZERO, Vec3::ONE]);
        assert_eq!(track.sample(-5.0), Some(TrackSample::Translation(Vec3::ZERO)));
        assert_eq!(track.sample(5.0), Some(TrackSample::Translation(Vec3::ONE)));
        assert_eq!(track.duration(), 1.0);
    }

    #[test]
    fn test_non_finite_time_samples_nothing() {
        let track = translation_track(Interpolation::Linear, vec![Vec3::ZERO, Vec3::ONE]);
        assert_eq!(track.sample(f32::NAN), None);
        assert_eq!(track.sample(f32::INFINITY), None);
    }

    #[test]
    fn test_nan_keyframe_does_not_panic() {
        let track = AnimationTrack {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![f32::NAN, 1.0, 2.0],
            values: TrackValues::Translation(vec![Vec3::ZERO, Vec3::ONE, Vec3::ONE]),
        };
        assert!(!track.has_valid_times());
        assert!(track.sample(0.5).is_some());

        let single = AnimationTrack {
            node: 0,
            interpolation: Interpolation::Step,
            times: vec![f32::NAN],
            values: TrackValues::Translation(vec![Vec3::ONE]),
        };
        assert_eq!(single.sample(0.5), Some(TrackSample::Translation(Vec3::ONE)));
    }

    #[test]
    fn test_rotation_slerp() {
        let end = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        let track = AnimationTrack {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, 1.0],
            values: TrackValues::Rotation(vec![Quat::IDENTITY, end]),
        };
        let Some(TrackSample::Rotation(rotation)) = track.sample(0.5) else {
            panic!("expected rotation sample");
        };
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(rotation.abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_cubic_spline_with_flat_tangents() {
        // in, value, out per key; zero tangents reduce to smoothstep
        let values = vec![
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::ZERO,
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::ZERO,
        ];
        let track = translation_track(Interpolation::CubicSpline, values);
        assert_eq!(track.sample(0.0), Some(TrackSample::Translation(Vec3::ZERO)));
        assert_eq!(
            track.sample(0.5),
            Some(TrackSample::Translation(Vec3::new(2.0, 0.0, 0.0)))
        );
        assert_eq!(
            track.sample(1.0),
            Some(TrackSample::Translation(Vec3::new(4.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn test_weights_track() {
        let track = AnimationTrack {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, 2.0],
            values: TrackValues::Weights(vec![0.0, 1.0, 1.0, 0.0]),
        };
        assert_eq!(track.width(), 2);
        assert_eq!(track.sample(1.0), Some(TrackSample::Weights(vec![0.5, 0.5])));
    }

    #[test]
    fn test_inconsistent_track_has_no_samples() {
        let track = translation_track(Interpolation::Linear, vec![Vec3::ZERO]);
        assert!(!track.is_consistent());
        assert_eq!(track.sample(0.5), None);
    }

    #[test]
    fn test_clip_duration() {
        let mut clip = AnimationClip::default();
        clip.tracks.push(translation_track(Interpolation::Linear, vec![Vec3::ZERO, Vec3::ONE]));
        let mut longer = translation_track(Interpolation::Linear, vec![Vec3::ZERO, Vec3::ONE]);
        longer.times = vec![0.0, 3.0];
        longer.node = 1;
        clip.tracks.push(longer);
        assert_eq!(clip.duration(), 3.0);
        assert_eq!(clip.tracks_for(1).count(), 1);
    }
}
