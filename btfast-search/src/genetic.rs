//! Genetic search over a parameter grid (spec §4.9): roulette-wheel
//! selection against fitness-proportional probabilities, elitism, uniform
//! or single-point crossover, and gene-replacement mutation sourced from
//! the search space itself rather than arbitrary integers.

use btfast_core::params::Parameters;
use btfast_core::rng::RngHierarchy;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, SearchError};
use crate::result::FitnessMetric;

/// One chromosome: a parameter assignment plus its evaluated fitness.
#[derive(Debug, Clone)]
pub struct Individual {
    pub parameters: Parameters,
    pub fitness: f64,
}

/// Uniform crossover picks each gene independently from either parent;
/// single-point picks a split index and takes a contiguous run from each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    Uniform,
    SinglePoint,
}

#[derive(Debug, Clone)]
pub struct GaConfig {
    pub population_size: usize,
    pub elite_num: usize,
    pub mutation_rate: f64,
    pub crossover: Crossover,
    pub fitness_metric: FitnessMetric,
    pub max_generations: usize,
    pub stagnant_generations_limit: usize,
    pub seed: u64,
}

impl Default for GaConfig {
    fn default() -> Self {
        GaConfig {
            population_size: 20,
            elite_num: 2,
            mutation_rate: 0.1,
            crossover: Crossover::Uniform,
            fitness_metric: FitnessMetric::default(),
            max_generations: 50,
            stagnant_generations_limit: 10,
            seed: 0,
        }
    }
}

/// A generation's chromosome pool, sorted descending by fitness after each
/// `evaluate` call.
pub struct Population {
    pub individuals: Vec<Individual>,
}

impl Population {
    /// Sample `config.population_size` distinct assignments from
    /// `search_space` (population_size even and <= |search_space|, per
    /// spec). Fitness is left at 0 until the caller evaluates.
    pub fn initialize(
        search_space: &[Parameters],
        config: &GaConfig,
        rng: &mut impl Rng,
    ) -> Result<Self> {
        if config.population_size == 0 || config.population_size % 2 != 0 {
            return Err(SearchError::Configuration(format!(
                "population_size must be a positive even number, got {}",
                config.population_size
            )));
        }
        if config.population_size > search_space.len() {
            return Err(SearchError::Configuration(format!(
                "population_size {} exceeds search space size {}",
                config.population_size,
                search_space.len()
            )));
        }

        let mut indices: Vec<usize> = (0..search_space.len()).collect();
        indices.shuffle(rng);
        let individuals = indices
            .into_iter()
            .take(config.population_size)
            .map(|i| Individual { parameters: search_space[i].clone(), fitness: 0.0 })
            .collect();

        Ok(Population { individuals })
    }

    /// Sort descending by fitness; the first `elite_num` are this
    /// generation's elites.
    pub fn sort_by_fitness_desc(&mut self) {
        self.individuals
            .sort_by(|a, b| b.fitness.partial_cmp(&a.fitness).unwrap());
    }

    pub fn best_fitness(&self) -> f64 {
        self.individuals.iter().map(|i| i.fitness).fold(f64::MIN, f64::max)
    }

    /// `v_i = (f_i - min f) / (max f - min f)`, `p_i = v_i / sum(v)`. Fatal
    /// if total fitness is zero (spec §4.9 step 2) — a degenerate
    /// population every individual scored identically or at zero can't be
    /// ranked by roulette wheel.
    fn selection_probabilities(&self) -> Result<Vec<f64>> {
        let fitnesses: Vec<f64> = self.individuals.iter().map(|i| i.fitness).collect();
        let min = fitnesses.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = fitnesses.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        let values: Vec<f64> = if (max - min).abs() < f64::EPSILON {
            vec![1.0; fitnesses.len()]
        } else {
            fitnesses.iter().map(|f| (f - min) / (max - min)).collect()
        };

        let total: f64 = values.iter().sum();
        if total == 0.0 {
            return Err(SearchError::RuntimeDegenerate(
                "genetic search: total fitness is zero".to_string(),
            ));
        }
        Ok(values.iter().map(|v| v / total).collect())
    }

    fn roulette_select(&self, probabilities: &[f64], rng: &mut impl Rng) -> usize {
        let r: f64 = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (i, p) in probabilities.iter().enumerate() {
            cumulative += p;
            if r <= cumulative {
                return i;
            }
        }
        probabilities.len() - 1
    }

    /// Pick two distinct parent indices by roulette wheel, retrying the
    /// second draw up to `population_size` times if it matches the first.
    fn select_distinct_parents(&self, probabilities: &[f64], rng: &mut impl Rng) -> (usize, usize) {
        let p1 = self.roulette_select(probabilities, rng);
        let mut p2 = self.roulette_select(probabilities, rng);
        let mut attempts = 0;
        while p2 == p1 && attempts < self.individuals.len() {
            p2 = self.roulette_select(probabilities, rng);
            attempts += 1;
        }
        (p1, p2)
    }

    /// Run one generation: keep the top `elite_num` unchanged, fill the
    /// rest by selection + crossover + mutation. Requires `evaluate` to
    /// have already set each individual's fitness for the *current*
    /// generation; the returned population's fitness fields are stale
    /// until the caller re-evaluates.
    pub fn evolve(&mut self, search_space: &[Parameters], config: &GaConfig, rng: &mut impl Rng) -> Result<()> {
        self.sort_by_fitness_desc();
        let probabilities = self.selection_probabilities()?;

        let mut next_gen: Vec<Individual> = self.individuals[..config.elite_num].to_vec();

        while next_gen.len() < self.individuals.len() {
            let (i1, i2) = self.select_distinct_parents(&probabilities, rng);
            let mut child = crossover(
                &self.individuals[i1].parameters,
                &self.individuals[i2].parameters,
                config.crossover,
                rng,
            );
            if rng.gen::<f64>() < config.mutation_rate {
                mutate(&mut child, search_space, rng);
            }
            next_gen.push(Individual { parameters: child, fitness: 0.0 });
        }

        self.individuals = next_gen;
        Ok(())
    }
}

fn crossover(parent1: &Parameters, parent2: &Parameters, kind: Crossover, rng: &mut impl Rng) -> Parameters {
    let keys: Vec<&String> = parent1.keys().collect();
    match kind {
        Crossover::Uniform => keys
            .into_iter()
            .map(|k| {
                let from_parent1: bool = rng.gen();
                let v = if from_parent1 { parent1[k] } else { parent2[k] };
                (k.clone(), v)
            })
            .collect(),
        Crossover::SinglePoint => {
            let split = rng.gen_range(0..=keys.len());
            keys.into_iter()
                .enumerate()
                .map(|(i, k)| {
                    let v = if i < split { parent1[k] } else { parent2[k] };
                    (k.clone(), v)
                })
                .collect()
        }
    }
}

/// Pick a random gene index and replace its value with that gene's value
/// from a random search-space member, retrying up to `2*|chromosome|`
/// times to force an actual value change (spec §4.9 step 6).
fn mutate(child: &mut Parameters, search_space: &[Parameters], rng: &mut impl Rng) {
    if search_space.is_empty() {
        return;
    }
    let keys: Vec<String> = child.keys().cloned().collect();
    if keys.is_empty() {
        return;
    }
    let gene = &keys[rng.gen_range(0..keys.len())];
    let original = child[gene];

    let max_attempts = 2 * keys.len();
    for _ in 0..max_attempts {
        let donor = &search_space[rng.gen_range(0..search_space.len())];
        if let Some(&candidate) = donor.get(gene) {
            if candidate != original {
                child.insert(gene.clone(), candidate);
                return;
            }
        }
    }
}

/// Run the full GA: evaluate -> evolve, for up to `config.max_generations`
/// generations, exiting early when the best fitness hasn't improved for
/// `config.stagnant_generations_limit` consecutive generations. `evaluate`
/// runs one full backtest and returns the configured fitness metric.
pub fn run<E>(
    search_space: &[Parameters],
    config: &GaConfig,
    rng_hierarchy: &RngHierarchy,
    mut evaluate: E,
) -> Result<Vec<Individual>>
where
    E: FnMut(&Parameters) -> Result<f64>,
{
    let mut rng = rng_hierarchy.rng_for("ga", 0);
    let mut population = Population::initialize(search_space, config, &mut rng)?;

    let mut best_fitness = f64::MIN;
    let mut stagnant_generations = 0usize;

    for generation in 0..config.max_generations {
        for individual in population.individuals.iter_mut() {
            individual.fitness = evaluate(&individual.parameters)?;
        }
        population.sort_by_fitness_desc();

        let current_best = population.best_fitness();
        if current_best > best_fitness {
            best_fitness = current_best;
            stagnant_generations = 0;
        } else {
            stagnant_generations += 1;
        }
        if stagnant_generations >= config.stagnant_generations_limit {
            tracing::debug!(generation, best_fitness, "genetic search early-exit: fitness stagnant");
            break;
        }

        if generation + 1 < config.max_generations {
            let mut gen_rng = rng_hierarchy.rng_for("ga", generation as u64 + 1);
            population.evolve(search_space, config, &mut gen_rng)?;
        }
    }

    Ok(population.individuals)
}
