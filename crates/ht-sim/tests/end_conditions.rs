use ht_project::EndCondition;
use ht_sim::{EndMonitor, PhaseEnd};
use ht_solver::{StepDecision, StepView};
use nalgebra::DVector;
use proptest::prelude::*;

fn observe(m: &mut EndMonitor, t: f64, field: &DVector<f64>, ambient: f64) -> StepDecision {
    m.observe(&StepView {
        step: 1,
        time_s: t,
        dt_s: 1.0,
        field,
        previous: field,
        ambient_c: ambient,
        center_index: 0,
        surface_index: field.len() - 1,
    })
}

proptest! {
    #[test]
    fn fixed_duration_never_stops_early(
        temps in prop::collection::vec(-50.0f64..1200.0, 3..20),
        ambient in 0.0f64..900.0,
    ) {
        let mut m = EndMonitor::new(EndCondition::FixedDuration, 100.0);
        let field = DVector::from_vec(temps);
        prop_assert_eq!(observe(&mut m, 1.0, &field, ambient), StepDecision::Continue);
        prop_assert_eq!(m.outcome(), PhaseEnd::Duration);
    }

    #[test]
    fn equilibrium_stops_only_when_settled(
        center in 0.0f64..900.0,
        surface in 0.0f64..900.0,
        ambient in 0.0f64..900.0,
        eps in 0.1f64..50.0,
    ) {
        let mut m = EndMonitor::new(EndCondition::Equilibrium { epsilon_c: eps }, 100.0);
        let field = DVector::from_vec(vec![center, (center + surface) / 2.0, surface]);
        let settled = (surface - center).abs() < eps && (center - ambient).abs() < eps;
        let decision = observe(&mut m, 5.0, &field, ambient);
        prop_assert_eq!(decision == StepDecision::Stop, settled);
    }
}
