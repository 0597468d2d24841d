//! Coefficient refinement with a Nelder-Mead simplex.
//!
//! Only the values at a model's active positions move; active flags are
//! never touched.

use crate::config::LocalSearchConfig;
use crate::data::DataSet;
use crate::engines::evaluation::Objective;
use crate::error::Result;
use crate::models::MemeticModel;
use crate::types::LocalSearchKind;
use crate::utils::random::Randomness;
use std::cmp::Ordering;

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// A simplex vertex and its fitness
#[derive(Debug, Clone)]
struct Vertex {
    point: Vec<f64>,
    fitness: f64,
}

/// Refine `model` on the `selected` samples, returning its resulting fitness.
///
/// The best point found is written back only when it beats the starting
/// fitness; otherwise the model is left as it was.
pub fn optimise<M: MemeticModel + ?Sized>(
    model: &mut M,
    data: &DataSet,
    selected: &[usize],
    objective: &Objective,
    config: &LocalSearchConfig,
    random: &mut Randomness,
) -> Result<f64> {
    let restart = match config.method {
        LocalSearchKind::None => return Ok(model.fitness()),
        LocalSearchKind::NelderMead => false,
        LocalSearchKind::NelderMeadRestart => true,
    };

    let positions = model.active_positions();
    let start_fitness = objective.evaluate(model, data, selected);
    let start_error = model.error();
    let start: Vec<f64> = positions.iter().map(|&p| model.get_value(p)).collect();
    if positions.is_empty() {
        return Ok(start_fitness);
    }

    let mut search = Simplex {
        model: &mut *model,
        positions: &positions,
        data,
        selected,
        objective,
    };
    let best = search.minimise(&start, start_fitness, config, restart, random)?;

    if best.fitness < start_fitness {
        search.apply(&best.point);
        Ok(best.fitness)
    } else {
        for (&pos, &value) in positions.iter().zip(&start) {
            model.set_value(pos, value);
        }
        model.set_fitness(start_fitness);
        model.set_error(start_error);
        Ok(start_fitness)
    }
}

struct Simplex<'a, M: MemeticModel + ?Sized> {
    model: &'a mut M,
    positions: &'a [usize],
    data: &'a DataSet,
    selected: &'a [usize],
    objective: &'a Objective,
}

impl<'a, M: MemeticModel + ?Sized> Simplex<'a, M> {
    /// Write `point` into the model and score it
    fn apply(&mut self, point: &[f64]) -> f64 {
        for (&pos, &value) in self.positions.iter().zip(point) {
            self.model.set_value(pos, value);
        }
        self.objective.evaluate(&mut *self.model, self.data, self.selected)
    }

    fn vertex(&mut self, point: Vec<f64>) -> Vertex {
        let fitness = self.apply(&point);
        Vertex { point, fitness }
    }

    fn initial(&mut self, centre: &Vertex, random: &mut Randomness) -> Result<Vec<Vertex>> {
        let mut vertices = vec![centre.clone()];
        for i in 0..centre.point.len() {
            let mut point = centre.point.clone();
            let scale = point[i].abs().max(1.0);
            point[i] += random.real(-1.0, 1.0)? * scale;
            vertices.push(self.vertex(point));
        }
        Ok(vertices)
    }

    fn minimise(
        &mut self,
        start: &[f64],
        start_fitness: f64,
        config: &LocalSearchConfig,
        restart: bool,
        random: &mut Randomness,
    ) -> Result<Vertex> {
        let centre = Vertex {
            point: start.to_vec(),
            fitness: start_fitness,
        };
        let mut vertices = self.initial(&centre, random)?;
        let mut best = centre;
        let mut stale = 0;
        let mut moves = 0;

        while moves < config.nelder_mead_moves {
            vertices.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(Ordering::Equal));
            if vertices[0].fitness < best.fitness {
                best = vertices[0].clone();
                stale = 0;
            }
            if stale >= config.nelder_mead_stale {
                if !restart {
                    break;
                }
                vertices = self.initial(&best, random)?;
                stale = 0;
                continue;
            }

            self.step(&mut vertices);
            moves += 1;
            stale += 1;
        }

        vertices.sort_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap_or(Ordering::Equal));
        if vertices[0].fitness < best.fitness {
            best = vertices[0].clone();
        }
        Ok(best)
    }

    /// One reflect / expand / contract / shrink move on a sorted simplex
    fn step(&mut self, vertices: &mut [Vertex]) {
        let n = vertices.len() - 1;
        let dims = vertices[0].point.len();
        let mut centroid = vec![0.0; dims];
        for vertex in &vertices[..n] {
            for (c, v) in centroid.iter_mut().zip(&vertex.point) {
                *c += v / n as f64;
            }
        }
        let towards = |from: &[f64], to: &[f64], coefficient: f64| -> Vec<f64> {
            from.iter().zip(to).map(|(f, t)| f + coefficient * (t - f)).collect()
        };

        let worst = vertices[n].clone();
        let reflected = self.vertex(towards(&centroid, &worst.point, -REFLECTION));

        if reflected.fitness < vertices[0].fitness {
            let expanded = self.vertex(towards(&centroid, &reflected.point, EXPANSION));
            vertices[n] = if expanded.fitness < reflected.fitness {
                expanded
            } else {
                reflected
            };
        } else if reflected.fitness < vertices[n - 1].fitness {
            vertices[n] = reflected;
        } else {
            let contracted = self.vertex(towards(&centroid, &worst.point, CONTRACTION));
            if contracted.fitness < worst.fitness {
                vertices[n] = contracted;
            } else {
                let best = vertices[0].point.clone();
                for vertex in vertices.iter_mut().skip(1) {
                    let point = towards(&best, &vertex.point, SHRINK);
                    *vertex = self.vertex(point);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Element, Regression};
    use crate::types::ObjectiveKind;

    fn data() -> DataSet {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = (0..10).map(|i| 3.0 * i as f64 - 7.0).collect();
        DataSet::from_rows(vec!["x".to_string()], rows, y).unwrap()
    }

    fn model() -> Regression {
        Regression::from_elements(vec![Element::new(1.0, true), Element::new(1.0, true)]).unwrap()
    }

    #[test]
    fn test_nelder_mead_improves_fit() {
        let data = data();
        let objective = Objective::new(ObjectiveKind::Mse, 0.0);
        let config = LocalSearchConfig {
            nelder_mead_moves: 400,
            nelder_mead_stale: 40,
            ..LocalSearchConfig::default()
        };
        let mut random = Randomness::seeded(7);
        let mut model = model();
        let before = objective.evaluate(&mut model, &data, &[]);

        let after = optimise(&mut model, &data, &[], &objective, &config, &mut random).unwrap();
        assert!(after < before);
        assert_eq!(model.fitness(), after);
        assert!(after < 1.0);
    }

    #[test]
    fn test_active_flags_untouched() {
        let data = data();
        let objective = Objective::new(ObjectiveKind::Mse, 0.35);
        let mut random = Randomness::seeded(3);
        let mut model =
            Regression::from_elements(vec![Element::new(5.0, false), Element::new(1.0, true)]).unwrap();

        optimise(&mut model, &data, &[], &objective, &LocalSearchConfig::default(), &mut random).unwrap();
        assert!(!model.get_active(0));
        assert_eq!(model.get_value(0), 5.0);
        assert!(model.get_active(1));
    }

    #[test]
    fn test_never_worse_than_start() {
        let data = data();
        let objective = Objective::new(ObjectiveKind::Mae, 0.0);
        let mut random = Randomness::seeded(11);
        let mut model =
            Regression::from_elements(vec![Element::new(3.0, true), Element::new(-7.0, true)]).unwrap();

        let config = LocalSearchConfig {
            method: LocalSearchKind::NelderMeadRestart,
            ..LocalSearchConfig::default()
        };
        let fitness = optimise(&mut model, &data, &[], &objective, &config, &mut random).unwrap();
        assert_eq!(fitness, 0.0);
        assert_eq!(model.get_value(0), 3.0);
        assert_eq!(model.get_value(1), -7.0);
    }

    #[test]
    fn test_none_leaves_model_alone() {
        let data = data();
        let objective = Objective::new(ObjectiveKind::Mse, 0.0);
        let mut random = Randomness::seeded(1);
        let mut model = model();
        objective.evaluate(&mut model, &data, &[]);
        let before = model.clone();
        let config = LocalSearchConfig {
            method: LocalSearchKind::None,
            ..LocalSearchConfig::default()
        };
        let fitness = optimise(&mut model, &data, &[], &objective, &config, &mut random).unwrap();
        assert_eq!(fitness, before.fitness());
        assert_eq!(model, before);
    }
}
