//! Property-based tests for `PowerBalancer`'s numeric invariants (spec §8, properties 2 and 6).

use powercap_core::config::BalancerConfig;
use powercap_core::PowerBalancer;
use proptest::prelude::*;

fn config() -> BalancerConfig {
    BalancerConfig { stability_factor: 1.5, wait_interval_sec: 0.0, min_num_samples: 2, reduction_step_fraction: 0.3 }
}

proptest! {
    /// Property 2: `POWER_PACKAGE_MIN <= power_limit <= power_cap <= POWER_PACKAGE_MAX` at all
    /// times, for any sequence of reduction samples and any target.
    #[test]
    fn power_limit_never_leaves_the_platform_bounds(
        min_power in 10.0_f64..100.0,
        cap_slack in 0.0_f64..300.0,
        target in 0.1_f64..20.0,
        samples in prop::collection::vec(0.0_f64..40.0, 1..30),
    ) {
        let cap = min_power + cap_slack;
        let mut balancer = PowerBalancer::new(min_power, cap, 0.01, &config());
        balancer.target_runtime(target);

        for sample in samples {
            balancer.is_target_met(sample);
            prop_assert!(balancer.power_limit() >= min_power - 1e-9);
            prop_assert!(balancer.power_limit() <= balancer.cap() + 1e-9);
        }
    }

    /// Property 6: `power_slack >= 0` for every sample, since `power_limit` never exceeds `cap`.
    #[test]
    fn power_slack_is_never_negative(
        min_power in 10.0_f64..100.0,
        cap_slack in 0.0_f64..300.0,
        target in 0.1_f64..20.0,
        samples in prop::collection::vec(0.0_f64..40.0, 1..30),
    ) {
        let cap = min_power + cap_slack;
        let mut balancer = PowerBalancer::new(min_power, cap, 0.01, &config());
        balancer.target_runtime(target);

        for sample in samples {
            balancer.is_target_met(sample);
            prop_assert!(balancer.power_slack() >= -1e-9);
        }
    }

    /// Property 8 (reset law): after `power_cap`, the balancer reports the fresh cap as both its
    /// cap and its limit, with no residual stability/search state, regardless of what came before.
    #[test]
    fn power_cap_resets_to_a_fresh_state_from_any_prior_history(
        min_power in 10.0_f64..100.0,
        cap_slack in 0.0_f64..300.0,
        target in 0.1_f64..20.0,
        samples in prop::collection::vec(0.0_f64..40.0, 0..20),
        new_cap_slack in 0.0_f64..300.0,
    ) {
        let cap = min_power + cap_slack;
        let mut balancer = PowerBalancer::new(min_power, cap, 0.01, &config());
        balancer.target_runtime(target);
        for sample in samples {
            balancer.is_target_met(sample);
        }

        let new_cap = min_power + new_cap_slack;
        balancer.power_cap(new_cap);
        prop_assert_eq!(balancer.cap(), new_cap);
        prop_assert_eq!(balancer.power_limit(), new_cap);
        prop_assert_eq!(balancer.runtime_sample(), 0.0);
    }
}
