//! Semantic scenario checks not expressible via JSON Schema.

use std::collections::HashSet;

use crate::core::literal::{Literal, validate_name};
use crate::core::types::{GoalDef, Scenario, StepDef};

/// Check scenario invariants:
/// - Literal declarations are unique, well-named and carry probabilities in `[0,1]`
/// - Goal, plan and action names are unique across the scenario
/// - Every goal has a plan and every plan a non-empty body
/// - Every referenced literal is declared
pub fn validate_invariants(scenario: &Scenario) -> Vec<String> {
    let mut errors = Vec::new();
    let mut declared = HashSet::new();
    for decl in &scenario.literals {
        if validate_name(&decl.name).is_err() {
            errors.push(format!("literal '{}': invalid name", decl.name));
        }
        if !declared.insert(decl.name.as_str()) {
            errors.push(format!("duplicate literal '{}'", decl.name));
        }
        for (field, value) in [("probability", decl.probability), ("vision", decl.vision)] {
            match value {
                Some(v) if !(0.0..=1.0).contains(&v) => errors.push(format!(
                    "literal '{}': {} {} outside [0,1]",
                    decl.name, field, v
                )),
                _ => {}
            }
        }
    }

    let mut checker = TreeChecker {
        declared,
        seen: HashSet::new(),
        errors,
    };
    for goal in &scenario.goals {
        checker.goal(goal, &goal.name);
    }
    checker.errors
}

struct TreeChecker<'a> {
    declared: HashSet<&'a str>,
    seen: HashSet<&'a str>,
    errors: Vec<String>,
}

impl<'a> TreeChecker<'a> {
    fn goal(&mut self, goal: &'a GoalDef, path: &str) {
        self.name(&goal.name, path);
        self.literals(&goal.condition, path, "condition");
        if goal.plans.is_empty() {
            self.errors.push(format!("{}: goal has no plans", path));
        }
        for plan in &goal.plans {
            let plan_path = format!("{}/{}", path, plan.name);
            self.name(&plan.name, &plan_path);
            self.literals(&plan.context, &plan_path, "context");
            if plan.body.is_empty() {
                self.errors.push(format!("{}: plan body is empty", plan_path));
            }
            for step in &plan.body {
                match step {
                    StepDef::Action(action) => {
                        let action_path = format!("{}/{}", plan_path, action.name);
                        self.name(&action.name, &action_path);
                        self.literals(&action.pre, &action_path, "pre");
                        self.literals(&action.post, &action_path, "post");
                    }
                    StepDef::Goal(sub) => {
                        let sub_path = format!("{}/{}", plan_path, sub.name);
                        self.goal(sub, &sub_path);
                    }
                }
            }
        }
    }

    fn name(&mut self, name: &'a str, path: &str) {
        if !self.seen.insert(name) {
            self.errors
                .push(format!("duplicate node name '{}' at {}", name, path));
        }
    }

    fn literals(&mut self, literals: &[Literal], path: &str, field: &str) {
        for literal in literals {
            if !self.declared.contains(literal.name()) {
                self.errors.push(format!(
                    "{}: {} uses undeclared literal '{}'",
                    path,
                    field,
                    literal.name()
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{LiteralDecl, PlanDef};
    use crate::test_support::{action, decl, goal, plan, scenario, subgoal};

    #[test]
    fn valid_scenario_has_no_errors() {
        let s = scenario(
            vec![decl("p", false), decl("q", false)],
            vec![goal(
                "g",
                vec![plan("pl", &[], vec![action("a", &["p+"], &["q+"])])],
            )],
        );
        assert!(validate_invariants(&s).is_empty());
    }

    #[test]
    fn reports_structural_and_literal_errors() {
        let mut s = scenario(
            vec![
                decl("p", false),
                decl("p", true),
                LiteralDecl {
                    name: "r".into(),
                    value: true,
                    probability: Some(1.2),
                    vision: None,
                },
            ],
            vec![
                goal(
                    "dup",
                    vec![plan(
                        "pl",
                        &[],
                        vec![
                            action("dup", &["missing+"], &[]),
                            subgoal(goal("empty", Vec::new())),
                        ],
                    )],
                ),
                goal(
                    "g2",
                    vec![PlanDef {
                        name: "hollow".into(),
                        context: Vec::new(),
                        body: Vec::new(),
                    }],
                ),
            ],
        );
        s.name = Some("broken".into());

        let errors = validate_invariants(&s);
        assert!(errors.iter().any(|e| e.contains("duplicate literal 'p'")));
        assert!(errors.iter().any(|e| e.contains("probability 1.2")));
        assert!(errors.iter().any(|e| e.contains("duplicate node name 'dup'")));
        assert!(errors.iter().any(|e| e.contains("undeclared literal 'missing'")));
        assert!(errors.iter().any(|e| e.contains("dup/pl/empty: goal has no plans")));
        assert!(errors.iter().any(|e| e.contains("g2/hollow: plan body is empty")));
    }
}
