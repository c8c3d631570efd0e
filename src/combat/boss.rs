//! Boss model: hit points, rage and the skill table.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SkillError;

/// Identifier of a boss skill.
///
/// The discriminant order is the agent's action index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillId {
    NormalAttack,
    HorizontalShot,
    VerticalShot,
    Heal,
    Ultimate,
}

impl SkillId {
    /// Number of distinct skills (and agent actions).
    pub const COUNT: usize = 5;

    /// Returns all skills in action-index order.
    pub fn all() -> [SkillId; Self::COUNT] {
        [
            SkillId::NormalAttack,
            SkillId::HorizontalShot,
            SkillId::VerticalShot,
            SkillId::Heal,
            SkillId::Ultimate,
        ]
    }

    /// Action index of this skill.
    pub fn index(&self) -> usize {
        match self {
            SkillId::NormalAttack => 0,
            SkillId::HorizontalShot => 1,
            SkillId::VerticalShot => 2,
            SkillId::Heal => 3,
            SkillId::Ultimate => 4,
        }
    }

    /// Inverse of [`SkillId::index`].
    pub fn from_index(index: usize) -> Option<SkillId> {
        Self::all().get(index).copied()
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkillId::NormalAttack => "normal_attack",
            SkillId::HorizontalShot => "horizontal_shot",
            SkillId::VerticalShot => "vertical_shot",
            SkillId::Heal => "heal",
            SkillId::Ultimate => "ultimate",
        };
        f.write_str(name)
    }
}

/// One entry of the boss skill table.
///
/// Invariant: `cooldown <= cooldown_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossSkill {
    pub id: SkillId,
    /// Damage dealt per hit (per charge for line shots).
    pub damage: u32,
    /// Rounds left before the skill is ready again.
    pub cooldown: u32,
    pub cooldown_max: u32,
    /// Line shots pass through blocking units.
    pub unblockable: bool,
}

impl BossSkill {
    pub fn new(id: SkillId, damage: u32, cooldown_max: u32, unblockable: bool) -> Self {
        Self {
            id,
            damage,
            cooldown: 0,
            cooldown_max,
            unblockable,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown == 0
    }
}

/// Static boss parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    pub max_hp: u32,
    pub max_rage: u32,
    /// Hit points restored by `heal` (capped at `max_hp`).
    pub heal_amount: u32,
    /// Rage required and consumed by `ultimate`.
    pub ultimate_rage_cost: u32,
    /// Rage gained by every successful non-ultimate cast.
    pub rage_per_cast: u32,
    pub skills: Vec<BossSkill>,
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            max_hp: 50,
            max_rage: 3,
            heal_amount: 10,
            ultimate_rage_cost: 3,
            rage_per_cast: 1,
            skills: vec![
                BossSkill::new(SkillId::NormalAttack, 2, 0, false),
                BossSkill::new(SkillId::HorizontalShot, 2, 2, false),
                BossSkill::new(SkillId::VerticalShot, 2, 2, false),
                BossSkill::new(SkillId::Heal, 0, 3, false),
                BossSkill::new(SkillId::Ultimate, 3, 0, true),
            ],
        }
    }
}

/// The autonomous adversary.
///
/// Persists across rounds within an episode; [`Boss::reset`] restores it at
/// the start of each new episode.
#[derive(Debug, Clone)]
pub struct Boss {
    config: BossConfig,
    hp: u32,
    rage: u32,
    skills: BTreeMap<SkillId, BossSkill>,
}

impl Boss {
    pub fn new(config: BossConfig) -> Self {
        let skills = config
            .skills
            .iter()
            .map(|skill| (skill.id, skill.clone()))
            .collect();
        Self {
            hp: config.max_hp,
            rage: 0,
            skills,
            config,
        }
    }

    /// Restores full hp, zero rage and clears every cooldown.
    pub fn reset(&mut self) {
        self.hp = self.config.max_hp;
        self.rage = 0;
        for skill in self.skills.values_mut() {
            skill.cooldown = 0;
        }
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.config.max_hp
    }

    pub fn rage(&self) -> u32 {
        self.rage
    }

    pub fn max_rage(&self) -> u32 {
        self.config.max_rage
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Fraction of max hp remaining, `0.0` when max hp is zero.
    pub fn hp_fraction(&self) -> f64 {
        if self.config.max_hp == 0 {
            0.0
        } else {
            self.hp as f64 / self.config.max_hp as f64
        }
    }

    /// Table entry for `id`, if the boss has that skill.
    pub fn skill(&self, id: SkillId) -> Option<&BossSkill> {
        self.skills.get(&id)
    }

    /// Current cooldown of `id`, zero for skills missing from the table.
    pub fn cooldown(&self, id: SkillId) -> u32 {
        self.skill(id).map_or(0, |s| s.cooldown)
    }

    /// Applies player damage. Returns `true` if the boss is defeated.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        self.hp = self.hp.saturating_sub(amount);
        !self.is_alive()
    }

    /// Decrements every cooldown by one, floored at zero.
    pub fn decrement_cooldowns(&mut self) {
        for skill in self.skills.values_mut() {
            skill.cooldown = skill.cooldown.saturating_sub(1);
        }
    }

    /// Skills whose cooldown is zero, in action-index order.
    ///
    /// Resource gates are not checked here; see [`Boss::check_castable`].
    pub fn ready_skills(&self) -> Vec<SkillId> {
        self.skills
            .values()
            .filter(|s| s.is_ready())
            .map(|s| s.id)
            .collect()
    }

    /// Checks cooldown and resource gates for `id`.
    pub fn check_castable(&self, id: SkillId) -> Result<(), SkillError> {
        let skill = self.skill(id).ok_or(SkillError::Unknown(id))?;
        if !skill.is_ready() {
            return Err(SkillError::OnCooldown {
                skill: id,
                remaining: skill.cooldown,
            });
        }
        if id == SkillId::Ultimate && self.rage < self.config.ultimate_rage_cost {
            return Err(SkillError::InsufficientRage {
                have: self.rage,
                need: self.config.ultimate_rage_cost,
            });
        }
        Ok(())
    }

    /// Commits a cast: resets the cooldown and adjusts rage. `heal` also
    /// restores hit points.
    pub fn cast(&mut self, id: SkillId) -> Result<&BossSkill, SkillError> {
        self.check_castable(id)?;

        match id {
            SkillId::Ultimate => {
                self.rage = self.rage.saturating_sub(self.config.ultimate_rage_cost);
            }
            _ => {
                self.rage = (self.rage + self.config.rage_per_cast).min(self.config.max_rage);
            }
        }
        if id == SkillId::Heal {
            self.hp = (self.hp + self.config.heal_amount).min(self.config.max_hp);
        }

        let skill = self.skills.get_mut(&id).ok_or(SkillError::Unknown(id))?;
        skill.cooldown = skill.cooldown_max;
        Ok(skill)
    }

    #[cfg(test)]
    pub(crate) fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.config.max_hp);
    }

    #[cfg(test)]
    pub(crate) fn set_rage(&mut self, rage: u32) {
        self.rage = rage.min(self.config.max_rage);
    }
}
