//! Agents and the complete M-ary tree they live in.
//!
//! The tree is stored breadth-first in one vector, so an agent's number is
//! its index: the parent of `i` is `(i - 1) / degree` and its children are
//! `degree * i + 1 ..= degree * i + degree`.

use super::context::RunContext;
use super::swap_log::{SolutionSnapshot, SwapLog, SwapRecord};
use crate::data::DataSet;
use crate::engines::evaluation::Objective;
use crate::error::{MemeticoError, Result};
use crate::models::{Candidate, MemeticModel};
use crate::types::ModelKind;
use chrono::Utc;
use std::ops::Range;

/// A tree position holding its best solution and a working solution
#[derive(Debug, Clone)]
pub struct Agent {
    pub number: usize,
    pub depth: usize,
    pub pocket: Candidate,  // best known solution here
    pub current: Candidate, // working solution
}

impl Agent {
    fn random(number: usize, depth: usize, kind: ModelKind, iv_count: usize, ctx: &mut RunContext) -> Result<Self> {
        Ok(Self {
            number,
            depth,
            pocket: Candidate::random(kind, iv_count, ctx)?,
            current: Candidate::random(kind, iv_count, ctx)?,
        })
    }
}

/// What agent operations need besides the tree itself
pub struct AgentScope<'s> {
    pub data: &'s DataSet,
    pub objective: &'s Objective,
    pub log: &'s mut dyn SwapLog,
    pub ctx: &'s mut RunContext,
}

#[derive(Debug, Clone)]
pub struct AgentTree {
    agents: Vec<Agent>,
    degree: usize,
    max_depth: usize,
    kind: ModelKind,
    iv_count: usize,
}

impl AgentTree {
    pub fn new(
        degree: usize,
        max_depth: usize,
        kind: ModelKind,
        iv_count: usize,
        ctx: &mut RunContext,
    ) -> Result<Self> {
        if degree == 0 {
            return Err(MemeticoError::Configuration(
                "Agent degree is not set before constructing agents".to_string(),
            ));
        }

        let mut agents = Vec::new();
        let mut level_size = 1usize;
        for depth in 0..=max_depth {
            for _ in 0..level_size {
                let number = agents.len();
                agents.push(Agent::random(number, depth, kind, iv_count, ctx)?);
            }
            level_size = level_size.checked_mul(degree).ok_or_else(|| {
                MemeticoError::Configuration(format!(
                    "Agent tree of degree {} and depth {} is too large",
                    degree, max_depth
                ))
            })?;
        }
        log::debug!("Built {} agents (degree {}, depth {})", agents.len(), degree, max_depth);

        Ok(Self {
            agents,
            degree,
            max_depth,
            kind,
            iv_count,
        })
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, index: usize) -> &Agent {
        &self.agents[index]
    }

    pub fn agent_mut(&mut self, index: usize) -> &mut Agent {
        &mut self.agents[index]
    }

    pub fn root(&self) -> &Agent {
        &self.agents[0]
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        if index == 0 {
            None
        } else {
            Some((index - 1) / self.degree)
        }
    }

    /// Child indices; empty for leaves
    pub fn children(&self, index: usize) -> Range<usize> {
        if self.is_leaf(index) {
            return 0..0;
        }
        let first = self.degree * index + 1;
        first..first + self.degree
    }

    pub fn is_leaf(&self, index: usize) -> bool {
        self.agents[index].depth == self.max_depth
    }

    /// Swap pocket and current when current is strictly fitter.
    ///
    /// With `do_eval` both models are scored on the full dataset first.
    pub fn exchange(&mut self, index: usize, do_eval: bool, scope: &mut AgentScope<'_>) -> bool {
        let agent = &mut self.agents[index];
        if do_eval {
            scope.objective.evaluate(&mut agent.current, scope.data, &[]);
            scope.objective.evaluate(&mut agent.pocket, scope.data, &[]);
        }
        if agent.current.fitness() >= agent.pocket.fitness() {
            return false;
        }

        let names = scope.data.ivs();
        let old = snapshot(&agent.pocket, names);
        std::mem::swap(&mut agent.pocket, &mut agent.current);
        let new = snapshot(&agent.pocket, names);
        scope.log.record(SwapRecord {
            timestamp: Utc::now(),
            generation: scope.ctx.generation,
            agent: agent.number,
            old,
            new,
        });
        true
    }

    /// Pull the fittest child pocket up when it beats this agent's pocket.
    ///
    /// Returns whether anything moved.
    pub fn bubble(&mut self, index: usize, scope: &mut AgentScope<'_>) -> bool {
        let best_child = self.children(index).min_by(|&a, &b| {
            self.agents[a]
                .pocket
                .fitness()
                .partial_cmp(&self.agents[b].pocket.fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let child = match best_child {
            Some(child) => child,
            None => return false,
        };
        if self.agents[child].pocket.fitness() >= self.agents[index].pocket.fitness() {
            return false;
        }

        let (upper, lower) = self.agents.split_at_mut(child);
        std::mem::swap(&mut upper[index].pocket, &mut lower[0].pocket);
        self.exchange(child, false, scope);
        true
    }

    /// Replace current with a fresh random model, then exchange
    pub fn renew(&mut self, index: usize, scope: &mut AgentScope<'_>) -> Result<bool> {
        self.agents[index].current = Candidate::random(self.kind, self.iv_count, scope.ctx)?;
        Ok(self.exchange(index, true, scope))
    }

    /// Fresh random model of the tree's kind
    pub fn random_model(&self, ctx: &mut RunContext) -> Result<Candidate> {
        Candidate::random(self.kind, self.iv_count, ctx)
    }
}

fn snapshot(model: &Candidate, names: &[String]) -> SolutionSnapshot {
    SolutionSnapshot {
        model: model.to_named_string(names),
        fitness: model.fitness(),
        error: model.error(),
    }
}
