//! The generational control loop over an agent tree.

use super::agent::{AgentScope, AgentTree};
use super::context::RunContext;
use super::diversity::{replace_first, similar_pairs, Replacement, Slot};
use super::local_search;
use super::progress::ProgressCallback;
use super::swap_log::{DiscardSwapLog, SwapLog};
use crate::config::AppConfig;
use crate::data::DataSet;
use crate::engines::evaluation::Objective;
use crate::error::{MemeticoError, Result};
use crate::models::{determine_depth, Candidate, MemeticModel, MutationOutcome};
use crate::types::{DiversityType, DynamicDepth};
use std::time::{Duration, Instant};

/// Fresh models drawn per replacement while looking for one at least as
/// far from the survivor as the model it replaces
const REPLACEMENT_DRAWS: usize = 4;

/// Outcome of [`Population::run`]
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub best: String,
    pub fitness: f64,
    pub error: f64,
    pub generations_run: usize,
    pub elapsed: Duration,
    pub timed_out: bool, // stopped by max_time_secs
}

pub struct Population<'a> {
    tree: AgentTree,
    data: &'a DataSet,
    objective: Objective,
    ctx: RunContext,
    log: Box<dyn SwapLog + 'a>,
    best_soln: Candidate,
    stale_count: usize,
    stale_times: usize,
}

impl<'a> Population<'a> {
    /// Population seeded from `config.evolution.seed`, discarding swaps
    pub fn new(data: &'a DataSet, config: AppConfig) -> Result<Self> {
        let ctx = RunContext::new(config)?;
        Self::with_context(data, ctx, Box::new(DiscardSwapLog))
    }

    /// Build every agent, score them and settle the tree into heap order
    pub fn with_context(data: &'a DataSet, mut ctx: RunContext, log: Box<dyn SwapLog + 'a>) -> Result<Self> {
        if data.sample_count() == 0 {
            return Err(MemeticoError::Validation("Dataset has no samples".to_string()));
        }
        let tree = AgentTree::new(
            ctx.config.population.degree,
            ctx.config.population.depth,
            ctx.config.model.kind,
            data.iv_count(),
            &mut ctx,
        )?;
        let objective = Objective::new(ctx.config.local_search.objective, ctx.config.model.penalty);
        #[cfg(feature = "gpu")]
        let objective = objective.accelerated(data);
        let best_soln = tree.root().pocket.clone();

        let mut population = Self {
            tree,
            data,
            objective,
            ctx,
            log,
            best_soln,
            stale_count: 0,
            stale_times: 0,
        };
        population.exchange_all(true);
        population.settle();
        population.best_soln = population.root_pocket().clone();
        population.ctx.pocket_depth = population.best_soln.depth();
        Ok(population)
    }

    fn with_scope<R>(&mut self, f: impl FnOnce(&mut AgentTree, &mut AgentScope<'_>) -> R) -> R {
        let Population {
            tree,
            data,
            objective,
            ctx,
            log,
            ..
        } = self;
        let mut scope = AgentScope {
            data: *data,
            objective: &*objective,
            log: log.as_mut(),
            ctx,
        };
        f(tree, &mut scope)
    }

    pub fn tree(&self) -> &AgentTree {
        &self.tree
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn root_pocket(&self) -> &Candidate {
        &self.tree.root().pocket
    }

    pub fn best_soln(&self) -> &Candidate {
        &self.best_soln
    }

    pub fn stale_count(&self) -> usize {
        self.stale_count
    }

    pub fn stale_times(&self) -> usize {
        self.stale_times
    }

    /// Every pocket in arena order, then every current
    pub fn to_soln_list(&self) -> Vec<&Candidate> {
        Slot::all(self.tree.len())
            .into_iter()
            .map(|slot| slot.model(&self.tree))
            .collect()
    }

    /// Score every pocket and current on the full dataset
    pub fn evaluate(&mut self) {
        for agent in 0..self.tree.len() {
            let agent = self.tree.agent_mut(agent);
            self.objective.evaluate(&mut agent.pocket, self.data, &[]);
            self.objective.evaluate(&mut agent.current, self.data, &[]);
        }
    }

    /// Exchange at every agent, returning the number of swaps
    pub fn exchange_all(&mut self, do_eval: bool) -> usize {
        self.with_scope(|tree, scope| {
            (0..tree.len())
                .filter(|&i| tree.exchange(i, do_eval, scope))
                .count()
        })
    }

    /// One bottom-up bubble pass over the whole tree.
    ///
    /// A pocket displaced downward is not compared with its new children in
    /// the same pass. When an agent and one of its descendants both improve,
    /// the old parent pocket can end up above a better pocket until a later
    /// pass.
    pub fn bubble(&mut self) -> usize {
        self.with_scope(|tree, scope| {
            (0..tree.len())
                .rev()
                .filter(|&i| !tree.is_leaf(i) && tree.bubble(i, scope))
                .count()
        })
    }

    /// Repeat bubble passes until every parent pocket is at least as fit as
    /// its children's pockets.
    pub fn settle(&mut self) {
        for _ in 0..=self.tree.len() {
            if self.bubble() == 0 {
                return;
            }
        }
        log::debug!("Tree did not settle within {} passes", self.tree.len() + 1);
    }

    /// Mutate and recombine top-down.
    ///
    /// Child `i` of an agent becomes the recombination of the agent's pocket
    /// with the current of child `i - 1` (wrapping around).
    pub fn evolve(&mut self) -> Result<()> {
        let mutate_rate = self.ctx.config.evolution.mutate_rate;
        let resize_on_hard = self.ctx.config.model.dynamic_depth == DynamicDepth::AdaptiveMutation;

        for index in 0..self.tree.len() {
            if self.ctx.random.chance(mutate_rate)? {
                let agent = self.tree.agent_mut(index);
                let pocket_fitness = agent.pocket.fitness();
                let outcome = agent.current.mutate(pocket_fitness, &mut self.ctx)?;
                if outcome == MutationOutcome::Hard && resize_on_hard {
                    let depth = determine_depth(&mut self.ctx)?;
                    agent.current.set_depth(depth, &mut self.ctx)?;
                }
            }

            let children = self.tree.children(index);
            if children.is_empty() {
                continue;
            }
            let siblings: Vec<Candidate> = children
                .clone()
                .map(|child| self.tree.agent(child).current.clone())
                .collect();
            let parent = self.tree.agent(index).pocket.clone();
            for (k, child) in children.enumerate() {
                let sibling = &siblings[(k + siblings.len() - 1) % siblings.len()];
                let current = &mut self.tree.agent_mut(child).current;
                current.recombine(&parent, sibling, None, &mut self.ctx)?;
            }
        }
        Ok(())
    }

    /// Local search at every agent, leaves first
    pub fn local_search(&mut self) -> Result<()> {
        for index in (0..self.tree.len()).rev() {
            self.local_search_agent(index)?;
        }
        Ok(())
    }

    /// Refine one agent's current and pocket on random data subsets.
    ///
    /// A refined model is kept only if it is strictly fitter on the full
    /// dataset. A better pocket is bubbled up the ancestor chain.
    pub fn local_search_agent(&mut self, index: usize) -> Result<()> {
        let config = self.ctx.config.local_search.clone();
        let data = self.data;
        let objective = self.objective.clone();

        let agent = self.tree.agent_mut(index);
        objective.evaluate(&mut agent.current, data, &[]);
        objective.evaluate(&mut agent.pocket, data, &[]);

        let mut pocket_improved = false;
        for _ in 0..config.runs {
            let selected = data.subset(config.data_pct, &mut self.ctx.random)?;
            for slot in [Slot::Current(index), Slot::Pocket(index)] {
                let model = slot.model_mut(&mut self.tree);
                let mut trial = model.clone();
                local_search::optimise(&mut trial, data, &selected, &objective, &config, &mut self.ctx.random)?;
                objective.evaluate(&mut trial, data, &[]);
                if trial.fitness() < model.fitness() {
                    *model = trial;
                    pocket_improved |= matches!(slot, Slot::Pocket(_));
                }
            }
        }

        pocket_improved |= self.with_scope(|tree, scope| tree.exchange(index, false, scope));
        if pocket_improved {
            let mut child = index;
            while let Some(parent) = self.tree.parent(child) {
                if !self.with_scope(|tree, scope| tree.bubble(parent, scope)) {
                    break;
                }
                child = parent;
            }
        }
        Ok(())
    }

    /// Replace `count` near-duplicate models (at most every model in the
    /// tree) with fresh random ones, returning how many were replaced.
    pub fn distinct(&mut self, count: usize) -> Result<usize> {
        Ok(self.distinct_replacements(count)?.len())
    }

    /// [`Self::distinct`], reporting each refilled slot.
    ///
    /// Pairs are visited most similar first. A second sweep picks up models
    /// whose every partner was chosen as the victim in the first. A refill
    /// is redrawn up to `REPLACEMENT_DRAWS` times until it is no closer to
    /// the survivor than the victim was; the farthest draw is kept.
    pub fn distinct_replacements(&mut self, count: usize) -> Result<Vec<Replacement>> {
        let slots = Slot::all(self.tree.len());
        let target = count.min(slots.len());
        if target == 0 {
            return Ok(Vec::new());
        }
        let pairs = similar_pairs(&self.tree, &slots, &self.objective, self.data);
        let mut replaced = vec![false; slots.len()];
        let mut replacements = Vec::with_capacity(target);

        for pair in pairs.iter().chain(pairs.iter()) {
            if replacements.len() >= target {
                break;
            }
            let (victim, survivor) = match (replaced[pair.first], replaced[pair.second]) {
                (true, true) => continue,
                (true, false) => (pair.second, pair.first),
                (false, true) => (pair.first, pair.second),
                (false, false) => {
                    let first = slots[pair.first].model(&self.tree);
                    let second = slots[pair.second].model(&self.tree);
                    if replace_first(first, second, &mut self.ctx.random)? {
                        (pair.first, pair.second)
                    } else {
                        (pair.second, pair.first)
                    }
                }
            };

            let before = self.objective.compare(
                slots[victim].model(&self.tree),
                slots[survivor].model(&self.tree),
                self.data,
            );
            let (fresh, after) = self.draw_replacement(slots[survivor], before)?;
            log::debug!(
                "Replacing {:?} (distance {:.3e} -> {:.3e}) with {}",
                slots[victim],
                before,
                after,
                fresh
            );
            *slots[victim].model_mut(&mut self.tree) = fresh;
            replaced[victim] = true;
            replacements.push(Replacement {
                slot: slots[victim],
                before,
                after,
            });
        }

        self.exchange_all(false);
        self.settle();
        Ok(replacements)
    }

    fn draw_replacement(&mut self, survivor: Slot, min_distance: f64) -> Result<(Candidate, f64)> {
        let mut best: Option<(Candidate, f64)> = None;
        for _ in 0..REPLACEMENT_DRAWS {
            let mut fresh = self.tree.random_model(&mut self.ctx)?;
            self.objective.evaluate(&mut fresh, self.data, &[]);
            let distance = self.objective.compare(&fresh, survivor.model(&self.tree), self.data);
            if best.as_ref().map_or(true, |(_, farthest)| distance > *farthest) {
                best = Some((fresh, distance));
            }
            if distance >= min_distance {
                break;
            }
        }
        best.ok_or_else(|| MemeticoError::Configuration("No replacement drawn".to_string()))
    }

    /// Count a generation without root improvement; on reaching the stale
    /// limit, renew the root and optionally inject diversity.
    pub fn stale(&mut self) -> Result<()> {
        self.stale_count += 1;
        if self.stale_count < self.ctx.config.evolution.stale_reset {
            return Ok(());
        }

        log::debug!(
            "Stale for {} generations, renewing root (reset {})",
            self.stale_count,
            self.stale_times + 1
        );
        self.with_scope(|tree, scope| tree.renew(0, scope))?;
        let count = self.ctx.config.evolution.diversity_count;
        match self.ctx.config.evolution.diversity {
            DiversityType::Stale => {
                self.distinct(count)?;
            }
            DiversityType::StaleExtended => {
                self.distinct(count.saturating_mul(self.stale_times + 1))?;
            }
            DiversityType::None | DiversityType::Every => {}
        }
        self.stale_count = 0;
        self.stale_times += 1;
        Ok(())
    }

    /// Record the root pocket as the best solution when it improves on it
    pub fn set_best_soln(&mut self) -> bool {
        let depth = self.root_pocket().depth();
        if depth != self.ctx.pocket_depth {
            log::debug!("Pocket depth {} -> {}", self.ctx.pocket_depth, depth);
            self.ctx.pocket_depth = depth;
        }
        if self.root_pocket().fitness() < self.best_soln.fitness() {
            self.best_soln = self.root_pocket().clone();
            return true;
        }
        false
    }

    /// One full generation
    pub fn generation(&mut self) -> Result<()> {
        let root_before = self.root_pocket().fitness();

        self.evolve()?;
        if self.ctx.generation % self.ctx.config.evolution.local_search_interval == 0 {
            self.local_search()?;
        } else {
            self.evaluate();
            self.exchange_all(false);
        }
        self.bubble();

        if self.ctx.config.evolution.diversity == DiversityType::Every {
            self.distinct(self.ctx.config.evolution.diversity_count)?;
        }

        if self.root_pocket().fitness() < root_before {
            self.stale_count = 0;
        } else {
            self.stale()?;
        }
        self.set_best_soln();
        Ok(())
    }

    pub fn run<C: ProgressCallback>(&mut self, mut callback: C) -> Result<RunSummary> {
        let started = Instant::now();
        let max_time = Duration::from_secs(self.ctx.config.evolution.max_time_secs);
        let generations = self.ctx.config.evolution.generations;
        let mut generations_run = 0;
        let mut timed_out = false;

        log::info!(
            "Starting run: {} agents, {} generations, {} samples",
            self.tree.len(),
            generations,
            self.data.sample_count()
        );

        for generation in 0..generations {
            if started.elapsed() >= max_time {
                log::warn!(
                    "Stopping after {} generations, time limit of {}s reached",
                    generations_run,
                    max_time.as_secs()
                );
                timed_out = true;
                break;
            }

            self.ctx.generation = generation;
            callback.on_generation_start(generation);
            self.generation()?;
            generations_run += 1;

            let root_fitness = self.root_pocket().fitness();
            log::info!(
                "Generation {}: root {:.6}, best {:.6}, stale {}",
                generation,
                root_fitness,
                self.best_soln.fitness(),
                self.stale_count
            );
            callback.on_generation_complete(generation, root_fitness, self.best_soln.fitness());
        }

        self.log.flush();
        let summary = RunSummary {
            best: self.best_soln.to_named_string(self.data.ivs()),
            fitness: self.best_soln.fitness(),
            error: self.best_soln.error(),
            generations_run,
            elapsed: started.elapsed(),
            timed_out,
        };
        log::info!("Run finished: {} ({:.6})", summary.best, summary.fitness);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::generation::progress::SilentProgressCallback;
    use crate::models::{Element, Regression, UNKNOWN_FITNESS};
    use crate::types::{LocalSearchKind, ModelKind};
    use crate::utils::random::{Randomness, SeededReal, SequenceSource};

    fn data() -> DataSet {
        let rows: Vec<Vec<f64>> = (1..=12).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y = (1..=12).map(|i| 4.0 * i as f64 - 3.0).collect();
        DataSet::from_rows(vec!["a".to_string(), "b".to_string()], rows, y).unwrap()
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.population.degree = 2;
        config.population.depth = 2;
        config.model.frac_depth = 1;
        config.local_search.nelder_mead_moves = 20;
        config.local_search.runs = 1;
        config.evolution.generations = 3;
        config
    }

    fn regression(values: [f64; 3], active: [bool; 3]) -> Candidate {
        let params = values.iter().zip(active).map(|(v, a)| Element::new(*v, a)).collect();
        Candidate::Regression(Regression::from_elements(params).unwrap())
    }

    fn flags(model: &Candidate) -> Vec<bool> {
        (0..model.param_count()).map(|p| model.get_active(p)).collect()
    }

    fn violations(population: &Population<'_>) -> usize {
        let tree = population.tree();
        (1..tree.len())
            .filter(|&i| {
                let parent = tree.parent(i).unwrap();
                tree.agent(parent).pocket.fitness() > tree.agent(i).pocket.fitness()
            })
            .count()
    }

    fn assert_heap_order(population: &Population<'_>) {
        let tree = population.tree();
        for i in 1..tree.len() {
            let parent = tree.parent(i).unwrap();
            assert!(tree.agent(parent).pocket.fitness() <= tree.agent(i).pocket.fitness());
        }
    }

    #[test]
    fn test_construction_settles_tree() {
        let data = data();
        let population = Population::new(&data, config()).unwrap();
        assert_heap_order(&population);
        assert_eq!(population.best_soln(), population.root_pocket());
        for agent in population.tree().agents() {
            assert!(agent.pocket.fitness() <= agent.current.fitness());
        }
    }

    #[test]
    fn test_soln_list_order() {
        let data = data();
        let population = Population::new(&data, config()).unwrap();
        let list = population.to_soln_list();
        assert_eq!(list.len(), 2 * population.tree().len());
        assert_eq!(list[0], population.root_pocket());
        assert_eq!(list[population.tree().len()], &population.tree().root().current);
    }

    #[test]
    fn test_distinct_replaces_requested_count() {
        let data = data();
        let mut population = Population::new(&data, config()).unwrap();
        assert_eq!(population.distinct(0).unwrap(), 0);
        assert_eq!(population.distinct(5).unwrap(), 5);
        let members = population.to_soln_list().len();
        assert_eq!(population.distinct(members + 10).unwrap(), members);
    }

    #[test]
    fn test_stale_reset_renews_root() {
        let data = data();
        let mut config = config();
        config.evolution.stale_reset = 2;
        let mut population = Population::new(&data, config).unwrap();
        population.stale().unwrap();
        assert_eq!(population.stale_count(), 1);
        population.stale().unwrap();
        assert_eq!(population.stale_count(), 0);
        assert_eq!(population.stale_times(), 1);
    }

    #[test]
    fn test_regression_population_runs() {
        let data = data();
        let mut config = config();
        config.model.kind = ModelKind::Regression;
        config.evolution.diversity = DiversityType::Every;
        config.evolution.local_search_interval = 2;
        let mut population = Population::new(&data, config).unwrap();
        let start = population.best_soln().fitness();
        let summary = population.run(SilentProgressCallback).unwrap();
        assert_eq!(summary.generations_run, 3);
        assert!(!summary.timed_out);
        assert!(summary.fitness <= start);
        assert!(population.best_soln().fitness() <= start);
    }

    #[test]
    fn test_children_recombine_with_previous_sibling() {
        let data = data();
        let mut config = config();
        config.model.kind = ModelKind::Regression;
        config.population.degree = 3;
        config.population.depth = 1;
        config.evolution.mutate_rate = 0.0;
        let mut population = Population::new(&data, config).unwrap();
        assert_eq!(population.tree().children(0), 1..4);

        population.tree.agent_mut(0).pocket = regression([1.0, 2.0, 3.0], [true, true, true]);
        population.tree.agent_mut(1).current = regression([5.0, 5.0, 5.0], [true, false, false]);
        population.tree.agent_mut(2).current = regression([6.0, 6.0, 6.0], [false, true, false]);
        population.tree.agent_mut(3).current = regression([7.0, 7.0, 7.0], [false, false, true]);
        // every int draw is 0: Union for the method, no shift for the blend
        population.ctx.random =
            Randomness::from_sources(Box::new(SequenceSource::new(vec![0i64; 64], 5)), Box::new(SeededReal::new(5)));

        population.evolve().unwrap();

        let tree = population.tree();
        assert_eq!(flags(&tree.agent(1).current), vec![false, false, true]);
        assert_eq!(flags(&tree.agent(2).current), vec![true, false, false]);
        assert_eq!(flags(&tree.agent(3).current), vec![false, true, false]);
        assert_eq!(tree.agent(1).current.get_value(2), 3.0);
        assert_eq!(tree.agent(2).current.get_value(0), 1.0);
        assert_eq!(tree.agent(3).current.get_value(1), 2.0);
    }

    #[test]
    fn test_local_search_bubbles_improvement_to_root() {
        let data = data();
        let mut config = config();
        config.model.kind = ModelKind::Regression;
        config.local_search.method = LocalSearchKind::None;
        let mut population = Population::new(&data, config).unwrap();
        assert!(population.root_pocket().fitness() > 0.0);

        let leaf = population.tree().len() - 1;
        assert!(population.tree().is_leaf(leaf));
        // y = 4a - 3 exactly
        let exact = regression([4.0, 0.0, -3.0], [true, false, true]);
        population.tree.agent_mut(leaf).current = exact.clone();

        population.local_search_agent(leaf).unwrap();

        assert_eq!(population.root_pocket().fitness(), 0.0);
        assert_eq!(population.root_pocket().to_string(), exact.to_string());
        assert_heap_order(&population);
    }

    #[test]
    fn test_single_bubble_pass_lags_one_level() {
        let data = data();
        let mut population = Population::new(&data, config()).unwrap();
        let root = population.root_pocket().fitness();
        assert!(root > 0.0 && root < UNKNOWN_FITNESS);
        assert_eq!(violations(&population), 0);

        // agent 1 and its child 3 both improve, agent 1 by more
        let mut better = population.root_pocket().clone();
        better.set_fitness(root * 0.25);
        let mut good = population.root_pocket().clone();
        good.set_fitness(root * 0.5);
        population.tree.agent_mut(1).pocket = better;
        population.tree.agent_mut(3).pocket = good;

        assert_eq!(population.bubble(), 1);
        assert_eq!(population.root_pocket().fitness(), root * 0.25);
        assert_eq!(violations(&population), 1);
        assert_eq!(population.tree().agent(1).pocket.fitness(), root);

        assert_eq!(population.bubble(), 1);
        assert_eq!(violations(&population), 0);
        assert_eq!(population.tree().agent(1).pocket.fitness(), root * 0.5);
    }

    #[test]
    fn test_distinct_does_not_shrink_distances() {
        let data = data();
        let mut population = Population::new(&data, config()).unwrap();
        let template = population.root_pocket().clone();
        assert!(template.fitness() < UNKNOWN_FITNESS);
        for i in 0..population.tree().len() {
            let agent = population.tree.agent_mut(i);
            agent.pocket = template.clone();
            agent.current = template.clone();
        }

        let report = population.distinct_replacements(4).unwrap();
        assert_eq!(report.len(), 4);
        for replacement in &report {
            assert_eq!(replacement.before, 0.0);
            assert!(replacement.after >= replacement.before);
        }
        let min_before = report.iter().map(|r| r.before).fold(f64::INFINITY, f64::min);
        let min_after = report.iter().map(|r| r.after).fold(f64::INFINITY, f64::min);
        assert!(min_after >= min_before);

        let slots: Vec<Slot> = report.iter().map(|r| r.slot).collect();
        for (i, slot) in slots.iter().enumerate() {
            assert!(!slots[i + 1..].contains(slot));
        }
    }

    #[test]
    fn test_extended_diversity_saturates_count() {
        let data = data();
        let mut config = config();
        config.evolution.diversity = DiversityType::StaleExtended;
        config.evolution.diversity_count = usize::MAX;
        config.evolution.stale_reset = 1;
        let mut population = Population::new(&data, config).unwrap();
        population.stale().unwrap();
        population.stale().unwrap();
        assert_eq!(population.stale_times(), 2);
        assert_heap_order(&population);
    }

    #[cfg(feature = "gpu")]
    #[test]
    fn test_accelerated_population_matches_sequential() {
        use crate::engines::evaluation::accelerated::TOLERANCE;

        let data = data();
        let mut config = config();
        config.model.kind = ModelKind::ContinuedFraction;
        config.local_search.objective = crate::types::ObjectiveKind::Mse;
        let mut population = Population::new(&data, config).unwrap();
        assert!(population.objective().is_accelerated());
        population.run(SilentProgressCallback).unwrap();

        let sequential = Objective::new(population.objective().kind, population.objective().penalty);
        let mut best = population.best_soln().clone();
        let expected = sequential.evaluate(&mut best, &data, &[]);
        let actual = population.best_soln().fitness();
        assert!((expected - actual).abs() <= TOLERANCE * expected.abs().max(1.0));
    }
}
