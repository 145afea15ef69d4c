//! Animation payloads: keyframed channels

use glam::{Quat, Vec4};

/// Animated property of a channel target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelProperty {
    Translation,
    Rotation,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f32,
    /// xyz for translation/scale, xyzw quaternion for rotation
    pub value: Vec4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    pub target_node: usize,
    pub property: ChannelProperty,
    pub keyframes: Vec<Keyframe>,
}

impl AnimationChannel {
    /// Value at `time` interpolated between keyframes `a` and `b`
    fn interpolate(&self, a: &Keyframe, b: &Keyframe, time: f32) -> Vec4 {
        let span = b.time - a.time;
        let t = if span > 0.0 {
            ((time - a.time) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        match self.property {
            ChannelProperty::Rotation => {
                let qa = Quat::from_vec4(a.value).normalize();
                let qb = Quat::from_vec4(b.value).normalize();
                Vec4::from(qa.slerp(qb, t))
            }
            _ => a.value.lerp(b.value, t),
        }
    }

    /// Keyframes left after dropping every key reconstructible within
    /// `tolerance` by interpolating its kept neighbours.
    ///
    /// First and last keys are always kept.
    pub fn reduced(&self, tolerance: f32) -> Vec<Keyframe> {
        let keys = &self.keyframes;
        if keys.len() <= 2 {
            return keys.clone();
        }

        let mut kept = vec![keys[0]];
        let mut anchor = 0;
        for candidate in 1..keys.len() - 1 {
            // Keys between anchor and the next one must stay within tolerance
            // if the candidate is dropped.
            let next = &keys[candidate + 1];
            let dropped_ok = (anchor + 1..=candidate).all(|i| {
                let predicted = self.interpolate(&keys[anchor], next, keys[i].time);
                distance(self.property, predicted, keys[i].value) <= tolerance
            });
            if !dropped_ok {
                kept.push(keys[candidate]);
                anchor = candidate;
            }
        }
        kept.push(keys[keys.len() - 1]);
        kept
    }
}

fn distance(property: ChannelProperty, a: Vec4, b: Vec4) -> f32 {
    match property {
        // q and -q encode the same rotation
        ChannelProperty::Rotation => (a - b).length().min((a + b).length()),
        _ => (a - b).length(),
    }
}

/// A decoded animation clip
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationData {
    pub name: Option<String>,
    pub duration: f32,
    pub channels: Vec<AnimationChannel>,
    /// Set once keyframe reduction has run
    pub compressed: bool,
}

impl AnimationData {
    pub fn keyframe_count(&self) -> usize {
        self.channels.iter().map(|c| c.keyframes.len()).sum()
    }

    /// Get the estimated size of this clip in bytes (time + 4 floats per key)
    pub fn estimated_size(&self) -> usize {
        self.keyframe_count() * 5 * std::mem::size_of::<f32>()
            + self.channels.len() * std::mem::size_of::<AnimationChannel>()
    }

    /// Clip with every channel reduced to `tolerance`
    pub fn reduced(&self, tolerance: f32) -> AnimationData {
        AnimationData {
            name: self.name.clone(),
            duration: self.duration,
            channels: self
                .channels
                .iter()
                .map(|c| AnimationChannel {
                    target_node: c.target_node,
                    property: c.property,
                    keyframes: c.reduced(tolerance),
                })
                .collect(),
            compressed: true,
        }
    }
}
