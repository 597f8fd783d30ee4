use ht_material::{PropertyModel, grade};
use proptest::prelude::*;

proptest! {
    #[test]
    fn curve_values_stay_within_table_bounds(
        points in prop::collection::vec((1.0f64..50.0, 10.0f64..60.0), 1..12),
        t in -200.0f64..1500.0,
    ) {
        let mut temperatures = Vec::with_capacity(points.len());
        let mut values = Vec::with_capacity(points.len());
        let mut t_acc = 0.0;
        for (step, v) in &points {
            t_acc += step;
            temperatures.push(t_acc);
            values.push(*v);
        }
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let model = PropertyModel::curve(temperatures, values);
        model.check_shape("k").unwrap();
        let v = model.evaluate(t);
        prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
    }
}

#[test]
fn catalog_conductivity_falls_with_temperature() {
    let mat = grade("AISI 4130").unwrap();
    let cold = mat.properties_at(20.0).unwrap();
    let hot = mat.properties_at(800.0).unwrap();
    assert!(cold.k > hot.k);
    assert_eq!(cold.rho, 7850.0);
}
