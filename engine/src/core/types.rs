//! Serializable descriptions of scenarios and goal-plan trees.
//!
//! These are the shapes read from scenario files. [`crate::core::tree::GoalTree`]
//! turns a [`GoalDef`] into the arena the engine executes.

use serde::{Deserialize, Serialize};

use crate::core::literal::Literal;

/// A world plus the top-level goals an agent is asked to achieve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub literals: Vec<LiteralDecl>,
    pub goals: Vec<GoalDef>,
}

/// Declared environment fact with its initial truth value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralDecl {
    pub name: String,
    pub value: bool,
    /// Agent's initial belief that the fact is true. Defaults to certainty about `value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<f64>,
    /// Chance that a change to this fact is perceived. Defaults to 1.0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDef {
    pub name: String,
    #[serde(default)]
    pub condition: Vec<Literal>,
    pub plans: Vec<PlanDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDef {
    pub name: String,
    #[serde(default)]
    pub context: Vec<Literal>,
    pub body: Vec<StepDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepDef {
    Action(ActionDef),
    Goal(GoalDef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub name: String,
    #[serde(default)]
    pub pre: Vec<Literal>,
    #[serde(default)]
    pub post: Vec<Literal>,
}
