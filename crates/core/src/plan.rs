//! ActionPlan and PlannedToolCall — what a turn intends to execute.
//!
//! A plan is an ordered list of tool calls plus a dependency map. Two
//! calls may run concurrently only if neither depends on the other and
//! both are flagged `parallel`. A call's fallback is an owned, boxed
//! alternate call; chains may nest but each call has at most one direct
//! fallback, so the structure is acyclic by construction.

use crate::error::PlanError;
use crate::value::ArgMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How a plan's steps are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStrategy {
    /// Strictly in declared order, no concurrency.
    Sequential,
    /// Every dependency-free step is eligible to run concurrently.
    Parallel,
    /// Concurrency as declared per step (default).
    #[default]
    Adaptive,
}

/// A single planned tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedToolCall {
    /// Step id, unique within the plan (e.g., "s1")
    pub id: String,

    /// Name of the capability to invoke
    pub tool: String,

    /// Schema-validated arguments
    #[serde(default)]
    pub arguments: ArgMap,

    /// Ordering hint inside sequential segments (higher runs first)
    #[serde(default)]
    pub priority: u8,

    /// Eligible to run concurrently with independent siblings
    #[serde(default)]
    pub parallel: bool,

    /// Failure of this call does not fail the plan
    #[serde(default)]
    pub optional: bool,

    /// Alternate call tried only if this call fails and is non-optional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<Box<PlannedToolCall>>,
}

impl PlannedToolCall {
    pub fn new(id: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            arguments: ArgMap::new(),
            priority: 0,
            parallel: false,
            optional: false,
            fallback: None,
        }
    }

    pub fn with_arguments(mut self, arguments: ArgMap) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn parallel(mut self) -> Self {
        self.parallel = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_fallback(mut self, fallback: PlannedToolCall) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Depth of the fallback chain below this call.
    pub fn fallback_depth(&self) -> usize {
        match &self.fallback {
            Some(f) => 1 + f.fallback_depth(),
            None => 0,
        }
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.tool.trim().is_empty() {
            return Err(PlanError::EmptyToolName(self.id.clone()));
        }
        if let Some(fallback) = &self.fallback {
            fallback.validate()?;
        }
        Ok(())
    }
}

/// An ordered, partially parallel execution plan for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionPlan {
    /// Scheduling strategy
    pub strategy: PlanStrategy,

    /// Ordered tool calls
    pub steps: Vec<PlannedToolCall>,

    /// Step id → ids it depends on
    #[serde(default)]
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Overall plan confidence in [0,1]
    pub confidence: f32,

    /// Whole-plan alternatives, used only if the plan must be redone
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<ActionPlan>,
}

impl ActionPlan {
    pub fn new(strategy: PlanStrategy) -> Self {
        Self {
            strategy,
            steps: Vec::new(),
            dependencies: BTreeMap::new(),
            confidence: 0.0,
            alternatives: Vec::new(),
        }
    }

    pub fn push_step(&mut self, step: PlannedToolCall) {
        self.steps.push(step);
    }

    /// Record that `step` must run after `dependency`.
    pub fn depends_on(&mut self, step: impl Into<String>, dependency: impl Into<String>) {
        self.dependencies
            .entry(step.into())
            .or_default()
            .push(dependency.into());
    }

    /// Set plan confidence, clamped to [0,1].
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, id: &str) -> Option<&PlannedToolCall> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Dependencies of a step (empty slice when none declared).
    pub fn deps_of(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Enforce the plan construction contract.
    ///
    /// Checks unique step ids, resolvable dependency references, absence of
    /// dependency cycles, and per-call validity. A plan failing validation
    /// must never reach the executor.
    pub fn validate(&self) -> Result<(), PlanError> {
        let mut ids = BTreeSet::new();
        for step in &self.steps {
            step.validate()?;
            if !ids.insert(step.id.as_str()) {
                return Err(PlanError::DuplicateStepId(step.id.clone()));
            }
        }

        for (step, deps) in &self.dependencies {
            if !ids.contains(step.as_str()) {
                return Err(PlanError::UnknownDependency {
                    step: step.clone(),
                    dependency: step.clone(),
                });
            }
            for dep in deps {
                if !ids.contains(dep.as_str()) {
                    return Err(PlanError::UnknownDependency {
                        step: step.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        // Cycle check: DFS with tri-state marking over the dependency map.
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Unvisited,
            InProgress,
            Done,
        }
        let mut marks: BTreeMap<&str, Mark> =
            ids.iter().map(|id| (*id, Mark::Unvisited)).collect();

        fn visit<'a>(
            id: &'a str,
            deps: &'a BTreeMap<String, Vec<String>>,
            marks: &mut BTreeMap<&'a str, Mark>,
        ) -> Result<(), PlanError> {
            match marks.get(id).copied() {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::InProgress) => {
                    return Err(PlanError::DependencyCycle(id.to_string()));
                }
                _ => {}
            }
            marks.insert(id, Mark::InProgress);
            if let Some(children) = deps.get(id) {
                for child in children {
                    visit(child, deps, marks)?;
                }
            }
            marks.insert(id, Mark::Done);
            Ok(())
        }

        let all_ids: Vec<&str> = ids.iter().copied().collect();
        for id in all_ids {
            visit(id, &self.dependencies, &mut marks)?;
        }

        for alternative in &self.alternatives {
            alternative.validate()?;
        }

        Ok(())
    }
}
