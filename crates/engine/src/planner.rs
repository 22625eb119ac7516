//! Action planner — turns a reasoning record into an executable plan.
//!
//! Planning is deterministic: actionable reasoning steps carry a small
//! directive grammar and everything else is narration. Two calls end up
//! parallel-eligible only if both are flagged `parallel` and neither
//! depends on the other; otherwise declared order rules.
//!
//! Directive grammar (one per reasoning step):
//!
//! ```text
//! use <tool> {"arg": ...} [parallel] [optional] [after s1,s2] [fallback <tool> {"arg": ...}]
//! ```

use reactor_core::config::ReactConfig;
use reactor_core::error::Error;
use reactor_core::plan::{ActionPlan, PlanStrategy, PlannedToolCall};
use reactor_core::thought::Thought;
use reactor_core::value::{ArgMap, arg_map_from_json};
use tracing::{debug, warn};

/// Converts a [`Thought`] into a validated [`ActionPlan`].
pub struct ActionPlanner {
    strategy: PlanStrategy,
    enable_fallback: bool,
}

impl ActionPlanner {
    pub fn new(config: &ReactConfig) -> Self {
        Self {
            strategy: config.strategy,
            enable_fallback: config.enable_fallback,
        }
    }

    /// Build the plan for one thought.
    ///
    /// Narration steps are skipped; a thought with no directives yields an
    /// empty plan, which the synthesizer reads as a terminate signal. When
    /// fallbacks are enabled, every non-optional call without a declared
    /// fallback gets a same-call retry so a single transient failure never
    /// aborts the turn on its own.
    pub fn plan(&self, thought: &Thought) -> Result<ActionPlan, Error> {
        let mut plan = ActionPlan::new(self.strategy);

        for (index, line) in thought.steps.iter().enumerate() {
            let id = format!("s{}", index + 1);
            match parse_directive(&id, line) {
                Some(directive) => {
                    for dep in &directive.after {
                        plan.depends_on(id.clone(), dep.clone());
                    }
                    plan.push_step(directive.call);
                }
                None => {
                    debug!(step = %line, "skipping narration step");
                }
            }
        }

        match self.strategy {
            PlanStrategy::Sequential => {
                for step in &mut plan.steps {
                    step.parallel = false;
                }
            }
            PlanStrategy::Parallel => {
                let deps = plan.dependencies.clone();
                for step in &mut plan.steps {
                    if deps.get(&step.id).map_or(true, Vec::is_empty) {
                        step.parallel = true;
                    }
                }
            }
            PlanStrategy::Adaptive => {}
        }

        if self.enable_fallback {
            for step in &mut plan.steps {
                if !step.optional && step.fallback.is_none() {
                    let retry = PlannedToolCall::new(format!("{}_retry", step.id), &step.tool)
                        .with_arguments(step.arguments.clone());
                    step.fallback = Some(Box::new(retry));
                }
            }
        }

        let plan = plan.with_confidence(thought.confidence);
        plan.validate()?;
        Ok(plan)
    }
}

struct Directive {
    call: PlannedToolCall,
    after: Vec<String>,
}

/// Parse one reasoning step. Returns `None` for narration.
fn parse_directive(id: &str, line: &str) -> Option<Directive> {
    let line = strip_list_marker(line.trim());
    let rest = line.strip_prefix("use ")?;

    let (tool, rest) = split_word(rest)?;
    let (arguments, rest) = match scan_json_object(rest) {
        Some((json, tail)) => {
            let args = serde_json::from_str::<serde_json::Value>(json)
                .ok()
                .and_then(arg_map_from_json);
            match args {
                Some(args) => (args, tail),
                None => {
                    warn!(tool, "directive arguments are not a JSON object, skipping step");
                    return None;
                }
            }
        }
        None => (ArgMap::new(), rest),
    };

    let mut call = PlannedToolCall::new(id, tool).with_arguments(arguments);
    let mut after = Vec::new();

    // Everything past "fallback" belongs to the fallback clause.
    let (flags, fallback) = match split_keyword(rest, "fallback") {
        Some((before, fb)) => (before, Some(fb)),
        None => (rest, None),
    };

    let mut tokens = flags.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        match token {
            "parallel" => call.parallel = true,
            "optional" => call.optional = true,
            "after" => {
                if let Some(ids) = tokens.next() {
                    after.extend(
                        ids.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(String::from),
                    );
                }
            }
            other => {
                debug!(token = other, "ignoring unknown directive token");
            }
        }
    }

    if let Some(fb) = fallback {
        match parse_fallback(id, fb) {
            Some(fb_call) => call.fallback = Some(Box::new(fb_call)),
            None => warn!(step = id, "unparseable fallback clause ignored"),
        }
    }

    Some(Directive { call, after })
}

fn parse_fallback(primary_id: &str, clause: &str) -> Option<PlannedToolCall> {
    let (tool, rest) = split_word(clause.trim())?;
    let arguments = match scan_json_object(rest) {
        Some((json, _)) => serde_json::from_str::<serde_json::Value>(json)
            .ok()
            .and_then(arg_map_from_json)?,
        None => ArgMap::new(),
    };
    Some(PlannedToolCall::new(format!("{primary_id}_fb"), tool).with_arguments(arguments))
}

fn strip_list_marker(line: &str) -> &str {
    let line = line
        .strip_prefix("- ")
        .or_else(|| line.strip_prefix("* "))
        .unwrap_or(line);
    // Numbered markers like "1. " or "2) "
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}

fn split_word(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    match s.find(char::is_whitespace) {
        Some(pos) => Some((&s[..pos], &s[pos..])),
        None => Some((s, "")),
    }
}

/// Split `s` at the first standalone occurrence of `keyword`, outside any
/// JSON object.
fn split_keyword<'a>(s: &'a str, keyword: &str) -> Option<(&'a str, &'a str)> {
    let mut depth = 0usize;
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            _ if depth == 0 => {
                let rest = &s[i..];
                if rest.starts_with(keyword) {
                    let before_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
                    let after = rest[keyword.len()..].chars().next();
                    let after_ok = after.is_none_or(|c| c.is_whitespace());
                    if before_ok && after_ok {
                        return Some((&s[..i], &s[i + keyword.len()..]));
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Scan the first balanced JSON object in `s`, string- and escape-aware.
/// Returns the object slice and the remainder after it.
fn scan_json_object(s: &str) -> Option<(&str, &str)> {
    let start = s.find('{')?;
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[start..=i], &s[i + 1..]));
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reactor_core::plan::PlanStrategy;

    fn planner(strategy: PlanStrategy, enable_fallback: bool) -> ActionPlanner {
        ActionPlanner::new(&ReactConfig {
            strategy,
            enable_fallback,
            ..Default::default()
        })
    }

    fn thought_with_steps(steps: &[&str]) -> Thought {
        Thought::new("working on it")
            .with_steps(steps.iter().map(|s| s.to_string()).collect())
            .with_confidence(0.8)
    }

    #[test]
    fn directive_with_args_and_flags() {
        let thought = thought_with_steps(&[
            r#"use run_tests {"suite": "unit"} parallel"#,
            r#"use read_file {"path": "src/lib.rs"} parallel"#,
            r#"use apply_patch {"diff": "..."} after s1,s2"#,
        ]);
        let plan = planner(PlanStrategy::Adaptive, false).plan(&thought).unwrap();

        assert_eq!(plan.steps.len(), 3);
        assert!(plan.steps[0].parallel);
        assert!(plan.steps[1].parallel);
        assert!(!plan.steps[2].parallel);
        assert_eq!(plan.deps_of("s3"), ["s1", "s2"]);
        assert_eq!(
            plan.steps[0].arguments["suite"].as_str(),
            Some("unit")
        );
        assert!((plan.confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn narration_steps_are_skipped() {
        let thought = thought_with_steps(&[
            "First I should understand the failure",
            r#"use run_tests {"suite": "unit"}"#,
            "Then decide what to patch",
        ]);
        let plan = planner(PlanStrategy::Adaptive, false).plan(&thought).unwrap();
        assert_eq!(plan.steps.len(), 1);
        // Ids follow the reasoning-step position, not the directive count.
        assert_eq!(plan.steps[0].id, "s2");
    }

    #[test]
    fn declared_fallback_is_parsed() {
        let thought = thought_with_steps(&[
            r#"use run_tests {"suite": "unit"} fallback run_tests_verbose {"suite": "unit", "verbose": true}"#,
        ]);
        let plan = planner(PlanStrategy::Adaptive, false).plan(&thought).unwrap();
        let fb = plan.steps[0].fallback.as_ref().unwrap();
        assert_eq!(fb.tool, "run_tests_verbose");
        assert_eq!(fb.arguments["verbose"].as_bool(), Some(true));
    }

    #[test]
    fn retry_fallback_injected_when_enabled() {
        let thought = thought_with_steps(&[
            r#"use run_tests {"suite": "unit"}"#,
            r#"use lint {} optional"#,
        ]);
        let plan = planner(PlanStrategy::Adaptive, true).plan(&thought).unwrap();

        let fb = plan.steps[0].fallback.as_ref().unwrap();
        assert_eq!(fb.tool, "run_tests");
        assert_eq!(fb.arguments, plan.steps[0].arguments);
        // Optional steps never get an injected fallback.
        assert!(plan.steps[1].fallback.is_none());
    }

    #[test]
    fn sequential_strategy_clears_parallel() {
        let thought = thought_with_steps(&[
            r#"use a {} parallel"#,
            r#"use b {} parallel"#,
        ]);
        let plan = planner(PlanStrategy::Sequential, false).plan(&thought).unwrap();
        assert!(plan.steps.iter().all(|s| !s.parallel));
    }

    #[test]
    fn parallel_strategy_marks_independent_steps() {
        let thought = thought_with_steps(&[
            r#"use a {}"#,
            r#"use b {}"#,
            r#"use c {} after s1"#,
        ]);
        let plan = planner(PlanStrategy::Parallel, false).plan(&thought).unwrap();
        assert!(plan.steps[0].parallel);
        assert!(plan.steps[1].parallel);
        assert!(!plan.steps[2].parallel);
    }

    #[test]
    fn unknown_dependency_is_a_plan_error() {
        let thought = thought_with_steps(&[r#"use a {} after s9"#]);
        let err = planner(PlanStrategy::Adaptive, false)
            .plan(&thought)
            .unwrap_err();
        assert!(matches!(err, Error::Plan(_)));
    }

    #[test]
    fn empty_thought_yields_empty_plan() {
        let thought = thought_with_steps(&[]);
        let plan = planner(PlanStrategy::Adaptive, true).plan(&thought).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn list_markers_are_stripped() {
        let thought = thought_with_steps(&[
            r#"- use a {"k": 1}"#,
            r#"2. use b {}"#,
        ]);
        let plan = planner(PlanStrategy::Adaptive, false).plan(&thought).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].tool, "a");
        assert_eq!(plan.steps[1].tool, "b");
    }

    #[test]
    fn keyword_inside_json_is_not_a_clause() {
        let thought = thought_with_steps(&[
            r#"use grep {"pattern": "fallback handling"}"#,
        ]);
        let plan = planner(PlanStrategy::Adaptive, false).plan(&thought).unwrap();
        assert!(plan.steps[0].fallback.is_none());
        assert_eq!(
            plan.steps[0].arguments["pattern"].as_str(),
            Some("fallback handling")
        );
    }

    #[test]
    fn scan_json_handles_nested_and_strings() {
        let (json, rest) =
            scan_json_object(r#" {"a": {"b": "x } y"}, "c": [1, 2]} parallel"#).unwrap();
        assert_eq!(json, r#"{"a": {"b": "x } y"}, "c": [1, 2]}"#);
        assert_eq!(rest.trim(), "parallel");
    }
}
