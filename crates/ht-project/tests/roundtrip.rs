use ht_mesh::{Geometry, InnerSurface};
use ht_project::*;

fn ring_config() -> SimulationConfig {
    let mut config = SimulationConfig::new(
        "bearing ring",
        Geometry::Ring {
            inner_radius: 0.04,
            outer_radius: 0.06,
            length: 0.03,
            inner_surface: InnerSurface::Exposed,
        },
        MaterialDef::catalog("AISI 4340"),
    );
    if let Some(PhaseConfig::Quenching(q)) = config.phase_mut(PhaseKind::Quenching) {
        q.media = QuenchMedia::Oil;
        q.agitation = Agitation::Strong;
    }
    if let Some(PhaseConfig::Tempering(t)) = config.phase_mut(PhaseKind::Tempering) {
        t.enabled = true;
        t.ramp = Some(FurnaceRamp {
            start_temperature_c: 100.0,
            rate_c_per_min: 5.0,
        });
    }
    config
}

#[test]
fn roundtrip_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.yaml");
    let config = ring_config();
    save_yaml(&path, &config).unwrap();
    assert_eq!(load_config(&path).unwrap(), config);
}

#[test]
fn roundtrip_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.json");
    let config = ring_config();
    save_json(&path, &config).unwrap();
    assert_eq!(load_config(&path).unwrap(), config);
}

#[test]
fn minimal_yaml_takes_defaults() {
    let yaml = r#"
name: quench bar
geometry:
  shape: cylinder
  radius: 0.025
  length: 0.2
material:
  source: catalog
  grade: AISI 4130
"#;
    let config: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
    validate_config(&config).unwrap();
    assert_eq!(config.version, LATEST_VERSION);
    assert_eq!(config.phases, default_phases());
    assert_eq!(config.initial_temperature_c, 850.0);
    assert_eq!(config.start_temperature_c(), 25.0);
    let Some(PhaseConfig::Quenching(q)) = config.phase(PhaseKind::Quenching) else {
        panic!("quenching missing");
    };
    assert!((q.effective_htc() - 4800.0).abs() < 1e-9);
    let kinds: Vec<PhaseKind> = config.enabled_phases().map(PhaseConfig::kind).collect();
    assert_eq!(
        kinds,
        vec![PhaseKind::Heating, PhaseKind::Transfer, PhaseKind::Quenching]
    );
}

#[test]
fn tagged_phase_list() {
    let yaml = r#"
name: oil quench from 860
geometry: { shape: plate, thickness: 0.02, width: 0.1, length: 0.1 }
material: { source: catalog, grade: s355 }
initial_temperature_c: 860
phases:
  - kind: quenching
    media: oil
    agitation: none
    end_condition: { kind: equilibrium, epsilon_c: 5.0 }
  - kind: tempering
    enabled: true
    temperature_c: 600
"#;
    let config: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
    validate_config(&config).unwrap();
    assert_eq!(config.start_temperature_c(), 860.0);
    let Some(PhaseConfig::Quenching(q)) = config.phase(PhaseKind::Quenching) else {
        panic!("quenching missing");
    };
    assert_eq!(q.effective_htc(), 800.0);
    assert_eq!(
        q.end_condition,
        EndCondition::Equilibrium { epsilon_c: 5.0 }
    );
    let Some(PhaseConfig::Tempering(t)) = config.phase(PhaseKind::Tempering) else {
        panic!("tempering missing");
    };
    assert_eq!(t.hold_s, 7200.0);
    assert_eq!(t.cool_down, CoolDownConfig::default());
}

#[test]
fn invalid_document_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(
        &path,
        "name: bad\ngeometry: { shape: cylinder, radius: -1.0, length: 0.1 }\nmaterial: { source: catalog, grade: AISI 4130 }\n",
    )
    .unwrap();
    assert!(matches!(
        load_yaml(&path),
        Err(ProjectError::Validation(ValidationError::Geometry(_)))
    ));
}
