//! Token accounting of the deployment manager. Tokens are grams of CO2eq the
//! solver may spend, earned by traffic that could be moved to cleaner regions.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::constants::{CARBON_INTENSITY_TO_INVOCATION_SECOND_ESTIMATE, FORGETTING_TIME_DAYS, MIGRATION_COST_ESTIMATE, SOLVE_HOUR_OPTIONS};
use crate::domain::deployment_algorithms::deployment_algorithm_type::DeploymentAlgorithmType;
use crate::domain::simulation::statistics::mean;
use crate::domain::utils::time::parse_day;

/// Algorithm and number of daily solves the budget pays for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolvePlan {
    pub algorithm: DeploymentAlgorithmType,
    pub number_of_solves: u32,
    pub cost: f64,
}

/// Invocations on the days from `since` (default: `FORGETTING_TIME_DAYS` ago) up to `now`.
/// Malformed day keys are ignored.
pub fn invocations_since(daily_invocation_counts: &BTreeMap<String, u64>, since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
    let since = since.unwrap_or_else(|| now - Duration::days(FORGETTING_TIME_DAYS)).date_naive();
    let until = now.date_naive();

    daily_invocation_counts
        .iter()
        .filter_map(|(day, count)| parse_day(day).ok().map(|day| (day, *count)))
        .filter(|(day, _)| *day >= since && *day <= until)
        .map(|(_, count)| count)
        .sum()
}

/// Population standard deviation of the intensities, scaled to gCO2eq per invocation-second.
pub fn potential_carbon_savings_per_invocation_s(carbon_intensities: &[f64]) -> f64 {
    if carbon_intensities.len() < 2 {
        return 0.0;
    }
    let m = mean(carbon_intensities);
    let variance = carbon_intensities.iter().map(|ci| (ci - m).powi(2)).sum::<f64>() / carbon_intensities.len() as f64;
    variance.sqrt() * CARBON_INTENSITY_TO_INVOCATION_SECOND_ESTIMATE
}

pub fn positive_tokens(potential_savings_per_invocation_s: f64, average_runtime_s: f64, invocations: u64) -> f64 {
    potential_savings_per_invocation_s * average_runtime_s * invocations as f64
}

/// Carbon the solver and the following migration are expected to emit.
pub fn solve_cost(per_instance_estimate: f64, instance_count: usize, number_of_solves: u32, system_carbon_intensity: f64) -> f64 {
    let n = instance_count as f64;
    n * number_of_solves as f64 * per_instance_estimate * system_carbon_intensity + n * MIGRATION_COST_ESTIMATE
}

/// Most powerful algorithm first, then the most solves per day, that `tokens` can pay for.
pub fn choose_plan(tokens: f64, instance_count: usize, system_carbon_intensity: f64) -> Option<SolvePlan> {
    for algorithm in DeploymentAlgorithmType::BUDGETED {
        let Some(estimate) = algorithm.carbon_per_instance_estimate() else {
            continue;
        };
        for &number_of_solves in SOLVE_HOUR_OPTIONS.iter().rev() {
            let cost = solve_cost(estimate, instance_count, number_of_solves, system_carbon_intensity);
            if cost <= tokens {
                return Some(SolvePlan { algorithm, number_of_solves, cost });
            }
        }
    }
    None
}

/// Price of the cheapest plan: one coarse-grained solve.
pub fn minimum_cost(instance_count: usize, system_carbon_intensity: f64) -> f64 {
    let estimate = DeploymentAlgorithmType::CoarseGrained.carbon_per_instance_estimate().unwrap_or_default();
    solve_cost(estimate, instance_count, 1, system_carbon_intensity)
}

/// Seconds until the next check after a shortfall of `deficit` tokens: between
/// half and twice the base cooldown, growing with the deficit.
pub fn deficit_cooldown_s(deficit: f64, base_cooldown_s: i64) -> i64 {
    let factor = 3.0 / (1.0 + (-0.02 * deficit.max(0.0)).exp()) - 1.0;
    (factor * base_cooldown_s as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        COARSE_GRAINED_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE, DEFAULT_MONITOR_COOLDOWN,
        STOCHASTIC_HEURISTIC_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE,
    };
    use chrono::TimeZone;

    #[test]
    fn test_invocations_since_respects_horizon() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let counts: BTreeMap<String, u64> =
            [("2024-01-01", 1000), ("2024-03-01", 5), ("2024-03-30", 7), ("2024-03-31", 3), ("garbage", 99)].iter().map(|(d, c)| (d.to_string(), *c)).collect();

        assert_eq!(invocations_since(&counts, None, now), 15);
        assert_eq!(invocations_since(&counts, Some(Utc.with_ymd_and_hms(2024, 3, 30, 18, 0, 0).unwrap()), now), 10);
    }

    #[test]
    fn test_savings_use_spread_of_intensities() {
        assert_eq!(potential_carbon_savings_per_invocation_s(&[300.0]), 0.0);
        assert!((potential_carbon_savings_per_invocation_s(&[100.0, 300.0]) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_choose_plan_prefers_stochastic_and_more_solves() {
        // 2 instances at 100 gCO2eq/kWh: migration alone is 0.02 tokens
        let rich = choose_plan(1_000.0, 2, 100.0).unwrap();
        assert_eq!(rich.algorithm, DeploymentAlgorithmType::StochasticHeuristic);
        assert_eq!(rich.number_of_solves, 24);

        let stochastic_once = solve_cost(STOCHASTIC_HEURISTIC_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE, 2, 1, 100.0);
        let coarse_once = solve_cost(COARSE_GRAINED_DEPLOYMENT_ALGORITHM_CARBON_PER_INSTANCE_INVOCATION_ESTIMATE, 2, 1, 100.0);
        let poor = choose_plan((stochastic_once + coarse_once) / 2.0, 2, 100.0).unwrap();
        assert_eq!(poor.algorithm, DeploymentAlgorithmType::CoarseGrained);
        assert!(poor.cost <= (stochastic_once + coarse_once) / 2.0);

        assert_eq!(choose_plan(0.0, 2, 100.0), None);
        assert_eq!(minimum_cost(2, 100.0), coarse_once);
    }

    #[test]
    fn test_deficit_cooldown_scales_between_half_and_double() {
        assert_eq!(deficit_cooldown_s(0.0, DEFAULT_MONITOR_COOLDOWN), DEFAULT_MONITOR_COOLDOWN / 2);
        let large = deficit_cooldown_s(10_000.0, DEFAULT_MONITOR_COOLDOWN);
        assert_eq!(large, 2 * DEFAULT_MONITOR_COOLDOWN);
        assert!(deficit_cooldown_s(50.0, 100) > deficit_cooldown_s(10.0, 100));
    }
}
