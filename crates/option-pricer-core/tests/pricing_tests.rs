use option_pricer_core::greeks::GreeksEngine;
use option_pricer_core::models::binomial::{BinomialConfig, BinomialTreePricer};
use option_pricer_core::models::black_scholes::{self, BlackScholesPricer};
use option_pricer_core::models::monte_carlo::{MonteCarloConfig, MonteCarloPricer};
use option_pricer_core::models::OptionPricer;
use option_pricer_core::{linspace, OptionType, PricingError, PricingParameters};

fn reference(option_type: OptionType) -> PricingParameters {
    PricingParameters {
        spot: 100.0,
        strike: 100.0,
        time_to_maturity: 1.0,
        risk_free_rate: 0.05,
        volatility: 0.20,
        option_type,
    }
}

fn sample_params() -> Vec<PricingParameters> {
    let mut out = Vec::new();
    for spot in [70.0, 95.0, 100.0, 130.0] {
        for t in [0.1, 1.0, 3.0] {
            for (r, sigma) in [(-0.05, 0.1), (0.0, 0.3), (0.08, 0.6)] {
                out.push(PricingParameters {
                    spot,
                    strike: 100.0,
                    time_to_maturity: t,
                    risk_free_rate: r,
                    volatility: sigma,
                    option_type: OptionType::Call,
                });
            }
        }
    }
    out
}

fn seeded_mc() -> MonteCarloPricer {
    MonteCarloPricer::new(MonteCarloConfig {
        num_simulations: 100_000,
        num_steps: 10,
        seed: Some(2024),
        antithetic: true,
    })
    .unwrap()
}

// ===========================================================================
// Reference values
// ===========================================================================

#[test]
fn test_black_scholes_reference_values() {
    let call = BlackScholesPricer.price(&reference(OptionType::Call)).unwrap();
    let put = BlackScholesPricer.price(&reference(OptionType::Put)).unwrap();
    assert!((call - 10.4506).abs() < 1e-4, "call {call}");
    assert!((put - 5.5735).abs() < 1e-4, "put {put}");
}

// ===========================================================================
// Put-call parity
// ===========================================================================

#[test]
fn test_put_call_parity_black_scholes_exact() {
    for p in sample_params() {
        let call = BlackScholesPricer.price(&p).unwrap();
        let put = BlackScholesPricer.price(&p.with_option_type(OptionType::Put)).unwrap();
        let forward = p.spot - p.strike * (-p.risk_free_rate * p.time_to_maturity).exp();
        assert!(
            ((call - put) - forward).abs() < 1e-9,
            "parity broken at {p:?}: c - p = {}, expected {forward}",
            call - put
        );
    }
}

#[test]
fn test_put_call_parity_monte_carlo() {
    let mc = seeded_mc();
    let call = mc.price(&reference(OptionType::Call)).unwrap();
    let put = mc.price(&reference(OptionType::Put)).unwrap();
    let forward = 100.0 - 100.0 * (-0.05f64).exp();
    assert!(
        ((call - put) - forward).abs() < 0.005 * call,
        "c - p = {}, expected {forward}",
        call - put
    );
}

#[test]
fn test_put_call_parity_binomial() {
    let tree = BinomialTreePricer::new(BinomialConfig::default()).unwrap();
    for p in sample_params() {
        let call = tree.price(&p).unwrap();
        let put = tree.price(&p.with_option_type(OptionType::Put)).unwrap();
        let forward = p.spot - p.strike * (-p.risk_free_rate * p.time_to_maturity).exp();
        assert!(((call - put) - forward).abs() < 0.1, "parity at {p:?}");
    }
}

// ===========================================================================
// American vs European
// ===========================================================================

#[test]
fn test_american_never_below_european() {
    let eu = BinomialTreePricer::new(BinomialConfig {
        num_steps: 100,
        american: false,
    })
    .unwrap();
    let am = BinomialTreePricer::new(BinomialConfig {
        num_steps: 100,
        american: true,
    })
    .unwrap();
    for p in sample_params() {
        for option_type in [OptionType::Call, OptionType::Put] {
            let p = p.with_option_type(option_type);
            let e = eu.price(&p).unwrap();
            let a = am.price(&p).unwrap();
            assert!(a >= e - 1e-10, "american {a} < european {e} at {p:?}");
        }
    }
}

// ===========================================================================
// Monotonicity
// ===========================================================================

#[test]
fn test_monotonic_in_spot_and_volatility() {
    let base = reference(OptionType::Call);
    let spots = linspace(50.0, 150.0, 21);
    let vols = linspace(0.05, 0.8, 16);

    let calls: Vec<f64> = spots
        .iter()
        .map(|&s| BlackScholesPricer.price(&base.with_spot(s)).unwrap())
        .collect();
    let puts: Vec<f64> = spots
        .iter()
        .map(|&s| {
            BlackScholesPricer
                .price(&base.with_spot(s).with_option_type(OptionType::Put))
                .unwrap()
        })
        .collect();
    assert!(calls.windows(2).all(|w| w[1] >= w[0]));
    assert!(puts.windows(2).all(|w| w[1] <= w[0]));

    for option_type in [OptionType::Call, OptionType::Put] {
        let by_vol: Vec<f64> = vols
            .iter()
            .map(|&v| {
                BlackScholesPricer
                    .price(&base.with_volatility(v).with_option_type(option_type))
                    .unwrap()
            })
            .collect();
        assert!(by_vol.windows(2).all(|w| w[1] >= w[0]), "{option_type} in vol");
    }
}

// ===========================================================================
// Convergence
// ===========================================================================

#[test]
fn test_binomial_converges_to_black_scholes() {
    let params = reference(OptionType::Call);
    let bs = BlackScholesPricer.price(&params).unwrap();
    let tree = BinomialTreePricer::new(BinomialConfig::default()).unwrap();
    let analysis = tree.get_convergence_analysis(&params, &[10, 500]).unwrap();
    let coarse = (analysis.prices[0] - bs).abs();
    let fine = (analysis.final_price - bs).abs();
    assert!(fine < coarse);
    assert!(fine / bs < 0.01);
}

#[test]
fn test_monte_carlo_converges_to_black_scholes() {
    let params = reference(OptionType::Call);
    let bs = BlackScholesPricer.price(&params).unwrap();
    let analysis = seeded_mc()
        .get_convergence_analysis(&params, &[1_000, 100_000])
        .unwrap();
    assert!((analysis.final_price - bs).abs() / bs < 0.01);
}

// ===========================================================================
// Greeks bounds
// ===========================================================================

#[test]
fn test_greek_bounds() {
    for p in sample_params() {
        let call = GreeksEngine.calculate_all_greeks(&p).unwrap();
        let put = GreeksEngine
            .calculate_all_greeks(&p.with_option_type(OptionType::Put))
            .unwrap();
        assert!((0.0..=1.0).contains(&call.delta));
        assert!((-1.0..=0.0).contains(&put.delta));
        assert!(call.gamma >= 0.0 && call.vega >= 0.0);
        assert!((call.gamma - put.gamma).abs() < 1e-12);
        assert!((call.vega - put.vega).abs() < 1e-12);
    }
}

// ===========================================================================
// Validation
// ===========================================================================

#[test]
fn test_negative_spot_named() {
    let err = black_scholes::price(-1.0, 100.0, 1.0, 0.05, 0.2, "call").unwrap_err();
    match err {
        PricingError::InvalidParameter { field, .. } => assert_eq!(field, "spot"),
        other => panic!("Expected InvalidParameter, got {other:?}"),
    }
}

#[test]
fn test_unknown_option_type_named() {
    let err = black_scholes::price(100.0, 100.0, 1.0, 0.05, 0.2, "straddle").unwrap_err();
    match err {
        PricingError::InvalidParameter { field, .. } => assert_eq!(field, "option_type"),
        other => panic!("Expected InvalidParameter, got {other:?}"),
    }
}

#[test]
fn test_every_pricer_validates() {
    let bad = reference(OptionType::Call).with_time(0.0);
    let pricers: Vec<Box<dyn OptionPricer>> = vec![
        Box::new(BlackScholesPricer),
        Box::new(seeded_mc()),
        Box::new(BinomialTreePricer::new(BinomialConfig::default()).unwrap()),
    ];
    for pricer in &pricers {
        let err = pricer.price(&bad).unwrap_err();
        assert_eq!(err.field(), Some("time_to_maturity"), "{}", pricer.model_info().name);
    }
}
