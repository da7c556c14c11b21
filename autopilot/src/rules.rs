//! Marker geometry rules.
//!
//! Each table is an ordered list of (predicate, effect) pairs over the
//! heights (`z`) of markers 1..4. Tables are evaluated top to bottom and a
//! matching rule overwrites whatever an earlier rule set on the same channel,
//! so the last match wins. The yaw pair is the exception: it is an if/else,
//! first match wins, and any yaw match skips the tilt table entirely.

use log::trace;
use telemetry::MARKER_COUNT;

use crate::decision::Tuning;

/// Marker heights, index 0 is marker 1.
pub type Heights = [f64; MARKER_COUNT];

type Predicate = fn(&Heights, &Tuning) -> bool;

/// What a rule sets when it fires. Values are unit directions; the engine
/// scales them with the tuning magnitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// +1 forward, -1 backward
    Surge(f64),
    /// +1 right, -1 left
    Sway(f64),
    /// +1 ascend, -1 descend
    Lift(f64),
    /// +1 yaw right, -1 yaw left
    Yaw(f64),
    /// +1 nose down, -1 nose up
    TiltX(f64),
    /// +1 roll left, -1 roll right
    TiltZ(f64),
}

pub struct Rule {
    pub name: &'static str,
    pub when: Predicate,
    pub effect: Effect,
}

impl Rule {
    fn fires(&self, z: &Heights, tuning: &Tuning) -> bool {
        let fired = (self.when)(z, tuning);
        if fired {
            trace!("Rule {:?} fired", self.name);
        }
        fired
    }
}

/// Unit intent per channel after all tables have run.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    pub surge: f64,
    pub sway: f64,
    pub lift: f64,
    pub yaw: f64,
    pub tilt_x: f64,
    pub tilt_z: f64,
}

impl Intent {
    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::Surge(v) => self.surge = v,
            Effect::Sway(v) => self.sway = v,
            Effect::Lift(v) => self.lift = v,
            Effect::Yaw(v) => self.yaw = v,
            Effect::TiltX(v) => self.tilt_x = v,
            Effect::TiltZ(v) => self.tilt_z = v,
        }
    }
}

// `a` sits clearly below `b`
fn below(a: f64, b: f64, margin: f64) -> bool {
    a + margin < b
}

fn odd_below_even(z: &Heights, t: &Tuning) -> bool {
    below(z[0], z[1], t.translation_margin) && below(z[2], z[3], t.translation_margin)
}

fn even_below_odd(z: &Heights, t: &Tuning) -> bool {
    below(z[1], z[0], t.translation_margin) && below(z[3], z[2], t.translation_margin)
}

fn first_pair_below(z: &Heights, t: &Tuning) -> bool {
    below(z[0], z[2], t.translation_margin) && below(z[1], z[3], t.translation_margin)
}

fn second_pair_below(z: &Heights, t: &Tuning) -> bool {
    below(z[2], z[0], t.translation_margin) && below(z[3], z[1], t.translation_margin)
}

fn raised(z: &Heights, t: &Tuning) -> bool {
    z[0] > t.ascend_height
}

fn grounded(z: &Heights, _: &Tuning) -> bool {
    z[0] == 0.0
}

fn twisted_left(z: &Heights, t: &Tuning) -> bool {
    z[2] + t.yaw_margin <= z[0] && z[3] + t.yaw_margin <= z[1]
}

fn twisted_right(z: &Heights, t: &Tuning) -> bool {
    z[0] + t.yaw_margin <= z[2] && z[1] + t.yaw_margin <= z[3]
}

#[rustfmt::skip]
pub const TRANSLATION_RULES: [Rule; 4] = [
    Rule { name: "forward", when: odd_below_even, effect: Effect::Surge(1.0) },
    Rule { name: "backward", when: even_below_odd, effect: Effect::Surge(-1.0) },
    Rule { name: "right", when: first_pair_below, effect: Effect::Sway(1.0) },
    Rule { name: "left", when: second_pair_below, effect: Effect::Sway(-1.0) },
];

#[rustfmt::skip]
pub const LIFT_RULES: [Rule; 2] = [
    Rule { name: "ascend", when: raised, effect: Effect::Lift(1.0) },
    Rule { name: "descend", when: grounded, effect: Effect::Lift(-1.0) },
];

#[rustfmt::skip]
pub const YAW_RULES: [Rule; 2] = [
    Rule { name: "yaw left", when: twisted_left, effect: Effect::Yaw(-1.0) },
    Rule { name: "yaw right", when: twisted_right, effect: Effect::Yaw(1.0) },
];

#[rustfmt::skip]
pub const TILT_RULES: [Rule; 4] = [
    Rule { name: "pitch forward", when: odd_below_even, effect: Effect::TiltX(1.0) },
    Rule { name: "pitch back", when: even_below_odd, effect: Effect::TiltX(-1.0) },
    Rule { name: "roll right", when: first_pair_below, effect: Effect::TiltZ(-1.0) },
    Rule { name: "roll left", when: second_pair_below, effect: Effect::TiltZ(1.0) },
];

/// Run every table against the marker heights.
pub fn evaluate(z: &Heights, tuning: &Tuning) -> Intent {
    let mut intent = Intent::default();

    for rule in TRANSLATION_RULES.iter().chain(LIFT_RULES.iter()) {
        if rule.fires(z, tuning) {
            intent.apply(rule.effect);
        }
    }

    match YAW_RULES.iter().find(|rule| rule.fires(z, tuning)) {
        Some(rule) => intent.apply(rule.effect),
        None => {
            for rule in TILT_RULES.iter() {
                if rule.fires(z, tuning) {
                    intent.apply(rule.effect);
                }
            }
        }
    }

    intent
}
