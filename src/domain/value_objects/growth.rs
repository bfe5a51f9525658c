//! Growth traits and life stages
//!
//! The Hero develops along five value dimensions; resolved dilemmas move
//! them and advance age. Stage boundaries and themes mirror the live
//! game's developmental table.

use serde::{Deserialize, Serialize};

/// The five-value developmental vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GrowthTraits {
    pub empathy: i32,
    pub integrity: i32,
    pub courage: i32,
    pub responsibility: i32,
    pub independence: i32,
}

impl GrowthTraits {
    pub fn add(&self, delta: &GrowthTraits) -> GrowthTraits {
        GrowthTraits {
            empathy: self.empathy + delta.empathy,
            integrity: self.integrity + delta.integrity,
            courage: self.courage + delta.courage,
            responsibility: self.responsibility + delta.responsibility,
            independence: self.independence + delta.independence,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == GrowthTraits::default()
    }

    /// Build a trait delta from a base growth value and the dilemma's tags.
    ///
    /// Tagged dimensions move by the (clamped) base; an untagged dilemma
    /// falls back to responsibility so a choice never scores as nothing.
    pub fn from_tags(base: i32, tags: &[String]) -> GrowthTraits {
        let base = base.clamp(-2, 2);
        let has = |name: &str| tags.iter().any(|t| t.eq_ignore_ascii_case(name));
        let bump = |flag: bool| if flag { base } else { 0 };

        let delta = GrowthTraits {
            empathy: bump(has("empathy")),
            integrity: bump(has("integrity")),
            courage: bump(has("courage")),
            responsibility: bump(has("responsibility")),
            independence: bump(has("independence")),
        };
        if delta.is_zero() {
            GrowthTraits {
                responsibility: base,
                ..GrowthTraits::default()
            }
        } else {
            delta
        }
    }

    /// Compact summary used in feedback voice lines, e.g. `E+1 I+0 Cg-1 R+2 In+0`.
    pub fn summary(&self) -> String {
        format!(
            "E{:+} I{:+} Cg{:+} R{:+} In{:+}",
            self.empathy, self.integrity, self.courage, self.responsibility, self.independence
        )
    }
}

/// Life stages by age bracket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Child,
    Preteen,
    Teen,
    YoungAdult,
    Adult,
    Mature,
    Senior,
}

impl Stage {
    pub fn for_age(age: u32) -> Stage {
        match age {
            0..=9 => Stage::Child,
            10..=12 => Stage::Preteen,
            13..=17 => Stage::Teen,
            18..=24 => Stage::YoungAdult,
            25..=39 => Stage::Adult,
            40..=59 => Stage::Mature,
            _ => Stage::Senior,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Stage::Child => "Childhood",
            Stage::Preteen => "Preteen",
            Stage::Teen => "Teenager",
            Stage::YoungAdult => "Young Adult",
            Stage::Adult => "Adult",
            Stage::Mature => "Mature",
            Stage::Senior => "Senior",
        }
    }

    /// Moral themes the dilemma generator leans on for this stage.
    pub fn themes(&self) -> &'static [&'static str] {
        match self {
            Stage::Child => &["sharing", "fairness", "friendship"],
            Stage::Preteen => &["honesty", "rules", "responsibility"],
            Stage::Teen => &["peer pressure", "independence", "identity"],
            Stage::YoungAdult => &["work ethics", "relationships", "social justice"],
            Stage::Adult => &["family duty", "work-life balance", "community"],
            Stage::Mature => &["legacy", "leadership", "meaning"],
            Stage::Senior => &["sharing wisdom", "heritage", "life review"],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Growth value for an answered dilemma, from its difficulty and how well
/// the answer matched: `base * match * (0.7 + 0.6 * difficulty)`, rounded
/// and clamped to -2..=5.
pub fn calculate_growth(difficulty: f32, match_score: f32, base: i32) -> i32 {
    let difficulty_factor = 0.7 + 0.6 * difficulty.clamp(0.0, 1.0);
    let raw = base as f32 * match_score.clamp(0.0, 1.0) * difficulty_factor;
    (raw.round() as i32).clamp(-2, 5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_brackets() {
        assert_eq!(Stage::for_age(8), Stage::Child);
        assert_eq!(Stage::for_age(10), Stage::Preteen);
        assert_eq!(Stage::for_age(17), Stage::Teen);
        assert_eq!(Stage::for_age(18), Stage::YoungAdult);
        assert_eq!(Stage::for_age(39), Stage::Adult);
        assert_eq!(Stage::for_age(59), Stage::Mature);
        assert_eq!(Stage::for_age(60), Stage::Senior);
        assert_eq!(Stage::for_age(120), Stage::Senior);
    }

    #[test]
    fn test_growth_formula() {
        // Easy question, perfect match: 4 * 1.0 * 1.0 = 4
        assert_eq!(calculate_growth(0.5, 1.0, 4), 4);
        // Hard question, perfect match: 4 * 1.0 * 1.3 = 5.2 -> clamp 5
        assert_eq!(calculate_growth(1.0, 1.0, 4), 5);
        // No match yields zero, not negative
        assert_eq!(calculate_growth(0.5, 0.0, 4), 0);
    }

    #[test]
    fn test_traits_from_tags_falls_back_to_responsibility() {
        let delta = GrowthTraits::from_tags(2, &["adventure".to_string()]);
        assert_eq!(delta.responsibility, 2);
        assert_eq!(delta.empathy, 0);

        let tagged = GrowthTraits::from_tags(2, &["empathy".to_string(), "courage".to_string()]);
        assert_eq!(tagged.empathy, 2);
        assert_eq!(tagged.courage, 2);
        assert_eq!(tagged.responsibility, 0);
    }

    #[test]
    fn test_traits_add() {
        let a = GrowthTraits {
            empathy: 1,
            ..GrowthTraits::default()
        };
        let b = GrowthTraits {
            empathy: 2,
            courage: -1,
            ..GrowthTraits::default()
        };
        let sum = a.add(&b);
        assert_eq!(sum.empathy, 3);
        assert_eq!(sum.courage, -1);
    }
}
