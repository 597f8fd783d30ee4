use ht_kinetics::{
    CoolingHistory, HardnessEstimate, PhaseFractions, TransformationParameters, predict,
};
use proptest::prelude::*;

/// Piecewise cooling curve: a peak followed by random non-increasing drops,
/// with occasional reheats.
fn cooling_path() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (
        700.0f64..1000.0,
        prop::collection::vec((0.05f64..20.0, -60.0f64..5.0), 2..200),
    )
        .prop_map(|(peak, steps)| {
            let mut times = vec![0.0];
            let mut temps = vec![peak];
            for (dt, d_temp) in steps {
                let t = times[times.len() - 1] + dt;
                let temp = (temps[temps.len() - 1] + d_temp).max(-20.0);
                times.push(t);
                temps.push(temp);
            }
            (times, temps)
        })
}

fn grade_params() -> impl Strategy<Value = TransformationParameters> {
    prop_oneof![
        Just(TransformationParameters::default()),
        Just(TransformationParameters::for_grade("S355J2G3").unwrap()),
        Just(TransformationParameters::for_grade("AISI 4130").unwrap()),
        Just(TransformationParameters::for_grade("AISI 4340").unwrap()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn fractions_are_bounded_and_sum_to_one(
        (times, temps) in cooling_path(),
        params in grade_params(),
    ) {
        let history = CoolingHistory::new(&times, &temps).unwrap();
        let result = predict(&history, &params).unwrap();
        let f = result.fractions;
        for v in [f.ferrite, f.pearlite, f.bainite, f.martensite, f.retained_austenite] {
            prop_assert!((0.0..=1.0).contains(&v), "{f:?}");
        }
        prop_assert!((f.sum() - 1.0).abs() < 1e-6, "{f:?}");
        prop_assert!(result.minimum_c <= result.austenitizing_c);
    }

    #[test]
    fn hardness_rises_with_martensite(
        m1 in 0.0f64..1.0,
        m2 in 0.0f64..1.0,
        t85 in 1.0f64..200.0,
        params in grade_params(),
    ) {
        let (lo, hi) = if m1 <= m2 { (m1, m2) } else { (m2, m1) };
        // Martensite replaces a ferrite/bainite/austenite mix in fixed proportion.
        let mix = |m: f64| PhaseFractions {
            ferrite: 0.5 * (1.0 - m),
            bainite: 0.3 * (1.0 - m),
            retained_austenite: 0.2 * (1.0 - m),
            martensite: m,
            ..PhaseFractions::default()
        };
        let comp = params.composition.as_ref();
        let a = HardnessEstimate::new(&mix(lo), comp, Some(t85));
        let b = HardnessEstimate::new(&mix(hi), comp, Some(t85));
        prop_assert!(b.hv + 1e-9 >= a.hv);
    }
}
